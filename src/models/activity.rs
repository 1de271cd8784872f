//! Activity feed entries.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::TaskStatus;

/// Immutable log entry describing something a user did.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Activity {
    pub id: String,
    pub user_id: String,
    pub action: String,
    pub timestamp: DateTime<Utc>,
}

/// Activity row as sent to the remote store, before it has an id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewActivity {
    pub user_id: String,
    pub action: String,
    pub timestamp: DateTime<Utc>,
}

impl NewActivity {
    pub fn into_activity(self, id: String) -> Activity {
        Activity {
            id,
            user_id: self.user_id,
            action: self.action,
            timestamp: self.timestamp,
        }
    }
}

/// Past-tense description of a store mutation, rendered into `Activity::action`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    LeadAdded(String),
    LeadUpdated(String),
    LeadDeleted(String),
    LeadStatusChanged { name: String, status: String },
    TaskCreated(String),
    TaskUpdated(String),
    TaskDeleted(String),
    TaskStatusChanged { title: String, status: TaskStatus },
    UserAdded(String),
    UserUpdated(String),
    UserDeleted(String),
    OwnProfileUpdated,
    SettingsUpdated,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::LeadAdded(name) => write!(f, "added a new lead: {}", name),
            Action::LeadUpdated(name) => write!(f, "updated lead: {}", name),
            Action::LeadDeleted(name) => write!(f, "deleted lead: {}", name),
            Action::LeadStatusChanged { name, status } => {
                write!(f, "updated lead status for {} to {}", name, status)
            }
            Action::TaskCreated(title) => write!(f, "created a new task: {}", title),
            Action::TaskUpdated(title) => write!(f, "updated task: \"{}\"", title),
            Action::TaskDeleted(title) => write!(f, "deleted task: \"{}\"", title),
            Action::TaskStatusChanged { title, status } => {
                write!(f, "updated task status for \"{}\" to {}", title, status)
            }
            Action::UserAdded(name) => write!(f, "added a new user: {}", name),
            Action::UserUpdated(name) => write!(f, "updated user profile: {}", name),
            Action::UserDeleted(name) => write!(f, "deleted user: {}", name),
            Action::OwnProfileUpdated => f.write_str("updated their profile information"),
            Action::SettingsUpdated => f.write_str("updated system settings"),
        }
    }
}
