//! Lead model and its create/patch request types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::require;
use crate::errors::AppError;

/// A sales prospect moving through the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Lead {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub source: String,
    /// One of the configured pipeline stages.
    pub status: String,
    /// User id of the owner
    pub assigned_to: String,
    #[serde(default)]
    pub purpose: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deal_value: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub last_contacted: DateTime<Utc>,
}

/// Fields supplied by the caller when creating a lead.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewLead {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub source: String,
    pub status: String,
    pub assigned_to: String,
    #[serde(default)]
    pub purpose: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub deal_value: Option<f64>,
}

impl NewLead {
    pub fn validate(&self) -> Result<(), AppError> {
        require(&[&self.name, &self.email], "Name and Email are required.")
    }

    /// Stamp the lead with an id and both timestamps set to `now`.
    pub fn into_lead(self, id: String, now: DateTime<Utc>) -> Lead {
        Lead {
            id,
            name: self.name,
            email: self.email,
            phone: self.phone,
            source: self.source,
            status: self.status,
            assigned_to: self.assigned_to,
            purpose: self.purpose,
            notes: self.notes,
            deal_value: self.deal_value,
            created_at: now,
            last_contacted: now,
        }
    }
}

/// Partial update of a lead row. `None` leaves the column untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeadChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub source: Option<String>,
    pub status: Option<String>,
    pub assigned_to: Option<String>,
    pub purpose: Option<String>,
    pub notes: Option<String>,
    pub deal_value: Option<Option<f64>>,
    pub last_contacted: Option<DateTime<Utc>>,
}

impl LeadChanges {
    /// A change set touching only the pipeline status.
    pub fn status(status: impl Into<String>) -> Self {
        Self {
            status: Some(status.into()),
            ..Self::default()
        }
    }

    pub fn apply(&self, lead: &mut Lead) {
        if let Some(v) = &self.name {
            lead.name = v.clone();
        }
        if let Some(v) = &self.email {
            lead.email = v.clone();
        }
        if let Some(v) = &self.phone {
            lead.phone = v.clone();
        }
        if let Some(v) = &self.source {
            lead.source = v.clone();
        }
        if let Some(v) = &self.status {
            lead.status = v.clone();
        }
        if let Some(v) = &self.assigned_to {
            lead.assigned_to = v.clone();
        }
        if let Some(v) = &self.purpose {
            lead.purpose = v.clone();
        }
        if let Some(v) = &self.notes {
            lead.notes = v.clone();
        }
        if let Some(v) = self.deal_value {
            lead.deal_value = v;
        }
        if let Some(v) = self.last_contacted {
            lead.last_contacted = v;
        }
    }
}

/// Full field set, used for whole-record updates.
impl From<&Lead> for LeadChanges {
    fn from(lead: &Lead) -> Self {
        Self {
            name: Some(lead.name.clone()),
            email: Some(lead.email.clone()),
            phone: Some(lead.phone.clone()),
            source: Some(lead.source.clone()),
            status: Some(lead.status.clone()),
            assigned_to: Some(lead.assigned_to.clone()),
            purpose: Some(lead.purpose.clone()),
            notes: Some(lead.notes.clone()),
            deal_value: Some(lead.deal_value),
            last_contacted: Some(lead.last_contacted),
        }
    }
}
