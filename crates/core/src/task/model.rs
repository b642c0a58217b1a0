//! Task model definitions

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Error;

/// Task status
///
/// Persisted as its display label, which is also what status filters match against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    #[serde(rename = "Not Started")]
    NotStarted,
    #[serde(rename = "In Progress")]
    InProgress,
    Complete,
    Lock,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "Not Started",
            Self::InProgress => "In Progress",
            Self::Complete => "Complete",
            Self::Lock => "Lock",
        }
    }

    pub fn is_locked(self) -> bool {
        matches!(self, Self::Lock)
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        Self::NotStarted
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: TaskStatus,
    pub author_id: i64,
    pub task_category_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Caller-supplied task fields
///
/// Used both for creation and for a full edit. The store assigns the id and
/// the engine owns the timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(default)]
    pub status: TaskStatus,
    pub author_id: i64,
    pub task_category_id: i64,
}

impl TaskInput {
    /// Create input with the given name and default everything else
    pub fn new(name: impl Into<String>, author_id: i64, task_category_id: i64) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            description: String::new(),
            start_date: now,
            end_date: now,
            status: TaskStatus::default(),
            author_id,
            task_category_id,
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the status
    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    pub(crate) fn validate(&self) -> crate::Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::validation("name is a required field"));
        }
        Ok(())
    }

    /// Overwrite every caller-editable field of `task`
    pub(crate) fn apply_to(self, task: &mut Task) {
        task.name = self.name;
        task.description = self.description;
        task.start_date = self.start_date;
        task.end_date = self.end_date;
        task.status = self.status;
        task.author_id = self.author_id;
        task.task_category_id = self.task_category_id;
    }
}

/// A task row ready for insertion; the store fills in the id
#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    pub input: TaskInput,
    pub created_at: DateTime<Utc>,
}

impl NewTask {
    pub fn new(input: TaskInput) -> Self {
        Self {
            input,
            created_at: Utc::now(),
        }
    }

    pub fn into_task(self, id: i64) -> Task {
        let input = self.input;
        Task {
            id,
            name: input.name,
            description: input.description,
            start_date: input.start_date,
            end_date: input.end_date,
            status: input.status,
            author_id: input.author_id,
            task_category_id: input.task_category_id,
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_labels_roundtrip_through_serde() {
        let json = serde_json::to_string(&TaskStatus::InProgress).unwrap();
        assert_eq!(json, "\"In Progress\"");
        let parsed: TaskStatus = serde_json::from_str("\"Not Started\"").unwrap();
        assert_eq!(parsed, TaskStatus::NotStarted);
    }

    #[test]
    fn test_input_requires_name() {
        let input = TaskInput::new("   ", 1, 1);
        assert!(matches!(input.validate(), Err(Error::Validation(_))));
        assert!(TaskInput::new("Write docs", 1, 1).validate().is_ok());
    }

    #[test]
    fn test_new_task_sets_both_timestamps() {
        let task = NewTask::new(TaskInput::new("Test task", 3, 4)).into_task(7);
        assert_eq!(task.id, 7);
        assert_eq!(task.created_at, task.updated_at);
        assert_eq!(task.status, TaskStatus::NotStarted);
        assert_eq!(task.author_id, 3);
        assert_eq!(task.task_category_id, 4);
    }
}
