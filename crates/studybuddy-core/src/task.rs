//! Task model for StudyBuddy.
//!
//! A task is a single study item with a deadline, a priority, a time
//! estimate, and a completion status. Tasks optionally carry Google
//! Calendar sync fields linking them to a remote event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// Task priority.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(ValidationError::InvalidValue {
                field: "priority",
                message: format!("unknown priority '{other}'"),
            }),
        }
    }
}

/// Task completion status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Todo,
    Doing,
    Done,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Todo => "todo",
            Status::Doing => "doing",
            Status::Done => "done",
        }
    }
}

impl Default for Status {
    fn default() -> Self {
        Status::Todo
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "todo" => Ok(Status::Todo),
            "doing" => Ok(Status::Doing),
            "done" => Ok(Status::Done),
            other => Err(ValidationError::InvalidValue {
                field: "status",
                message: format!("unknown status '{other}'"),
            }),
        }
    }
}

/// A study task.
///
/// Serialized camelCase to match the REST API payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique identifier (uuid v4), immutable after creation.
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub deadline: DateTime<Utc>,
    pub priority: Priority,
    pub estimate_minutes: i64,
    pub status: Status,
    /// Linked Google Calendar event, if the task has been synced.
    pub google_event_id: Option<String>,
    pub google_calendar_id: Option<String>,
    /// Timestamp of the last successful sync with Google Calendar.
    pub last_synced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for creating a task.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub deadline: DateTime<Utc>,
    #[serde(default)]
    pub priority: Priority,
    pub estimate_minutes: i64,
    #[serde(default)]
    pub status: Status,
}

impl NewTask {
    /// Validate creation invariants: non-blank title, positive estimate.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::Required("title"));
        }
        if self.estimate_minutes <= 0 {
            return Err(ValidationError::InvalidValue {
                field: "estimateMinutes",
                message: "must be greater than 0".to_string(),
            });
        }
        Ok(())
    }
}

/// Partial update payload. Absent fields are left untouched; an empty
/// description clears the stored one.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub deadline: Option<DateTime<Utc>>,
    pub priority: Option<Priority>,
    pub estimate_minutes: Option<i64>,
    pub status: Option<Status>,
}

impl TaskPatch {
    /// Validate the fields that are present.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(title) = &self.title {
            if title.trim().is_empty() {
                return Err(ValidationError::Required("title"));
            }
        }
        if let Some(estimate) = self.estimate_minutes {
            if estimate <= 0 {
                return Err(ValidationError::InvalidValue {
                    field: "estimateMinutes",
                    message: "must be greater than 0".to_string(),
                });
            }
        }
        Ok(())
    }
}
