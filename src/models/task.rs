//! Task model.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::require;
use crate::errors::AppError;

/// Task urgency, ordered from lowest to highest.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TaskPriority {
    Low,
    Medium,
    High,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "Low",
            TaskPriority::Medium => "Medium",
            TaskPriority::High => "High",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Low" => Some(TaskPriority::Low),
            "Medium" => Some(TaskPriority::Medium),
            "High" => Some(TaskPriority::High),
            _ => None,
        }
    }
}

/// Progress state of a task.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    Pending,
    #[serde(rename = "On Process")]
    OnProcess,
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "Pending",
            TaskStatus::OnProcess => "On Process",
            TaskStatus::Completed => "Completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Pending" => Some(TaskStatus::Pending),
            "On Process" => Some(TaskStatus::OnProcess),
            "Completed" => Some(TaskStatus::Completed),
            _ => None,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A follow-up item tied to a lead.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub lead_id: String,
    pub assigned_to: String,
    pub due_date: NaiveDate,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied by the caller when creating a task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub lead_id: String,
    pub assigned_to: String,
    pub due_date: NaiveDate,
    pub priority: TaskPriority,
    pub status: TaskStatus,
}

impl NewTask {
    pub fn validate(&self) -> Result<(), AppError> {
        require(&[&self.title], "Title and Due Date are required.")
    }

    pub fn into_task(self, id: String, now: DateTime<Utc>) -> Task {
        Task {
            id,
            title: self.title,
            lead_id: self.lead_id,
            assigned_to: self.assigned_to,
            due_date: self.due_date,
            priority: self.priority,
            status: self.status,
            created_at: now,
        }
    }
}

/// Partial update of a task row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub lead_id: Option<String>,
    pub assigned_to: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub priority: Option<TaskPriority>,
    pub status: Option<TaskStatus>,
}

impl TaskChanges {
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn apply(&self, task: &mut Task) {
        if let Some(v) = &self.title {
            task.title = v.clone();
        }
        if let Some(v) = &self.lead_id {
            task.lead_id = v.clone();
        }
        if let Some(v) = &self.assigned_to {
            task.assigned_to = v.clone();
        }
        if let Some(v) = self.due_date {
            task.due_date = v;
        }
        if let Some(v) = self.priority {
            task.priority = v;
        }
        if let Some(v) = self.status {
            task.status = v;
        }
    }
}

impl From<&Task> for TaskChanges {
    fn from(task: &Task) -> Self {
        Self {
            title: Some(task.title.clone()),
            lead_id: Some(task.lead_id.clone()),
            assigned_to: Some(task.assigned_to.clone()),
            due_date: Some(task.due_date),
            priority: Some(task.priority),
            status: Some(task.status),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn on_process_uses_spaced_wire_name() {
        let json = serde_json::to_string(&TaskStatus::OnProcess).unwrap();
        assert_eq!(json, "\"On Process\"");
        assert_eq!(TaskStatus::parse("On Process"), Some(TaskStatus::OnProcess));
        assert_eq!(TaskStatus::OnProcess.to_string(), "On Process");
    }

    #[test]
    fn priorities_are_ordered() {
        assert!(TaskPriority::Low < TaskPriority::Medium);
        assert!(TaskPriority::Medium < TaskPriority::High);
    }

    #[test]
    fn due_date_is_a_plain_calendar_date() {
        let task: NewTask = serde_json::from_value(serde_json::json!({
            "title": "Call back",
            "lead_id": "l1",
            "assigned_to": "u1",
            "due_date": "2024-10-20",
            "priority": "High",
            "status": "Pending"
        }))
        .unwrap();
        assert_eq!(task.due_date, NaiveDate::from_ymd_opt(2024, 10, 20).unwrap());
    }
}
