use crate::ValidationError;
use chrono::{DateTime, TimeDelta, Utc};
use std::fmt;
use uuid::Uuid;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How far past creation a task falls due when no due date is given.
pub fn default_due_in() -> TimeDelta {
    TimeDelta::hours(24)
}

/// Lifecycle state of a task. Persisted as its integer code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(into = "u8", try_from = "u8")
)]
pub enum TaskStatus {
    #[default]
    Pending = 0,
    Complete = 1,
    Cancelled = 2,
}

impl TaskStatus {
    pub fn name(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "Pending",
            TaskStatus::Complete => "Complete",
            TaskStatus::Cancelled => "Cancelled",
        }
    }

    pub fn code(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<TaskStatus> for u8 {
    fn from(status: TaskStatus) -> Self {
        status.code()
    }
}

impl TryFrom<u8> for TaskStatus {
    type Error = ValidationError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(TaskStatus::Pending),
            1 => Ok(TaskStatus::Complete),
            2 => Ok(TaskStatus::Cancelled),
            other => Err(ValidationError::UnknownStatus(other)),
        }
    }
}

/// A unit of work belonging to exactly one task list.
///
/// The owning list is referenced by id only; nothing checks that the list exists.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Task {
    pub id: Uuid,
    pub list_id: Uuid,
    pub title: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub description: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub status: TaskStatus,
    pub due_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Creates a pending task with an empty description and a freshly generated id.
    /// Returns an error if the title is blank.
    pub fn new(
        list_id: Uuid,
        title: impl Into<String>,
        due_date: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }

        let now = Utc::now();
        Ok(Task {
            id: Uuid::new_v4(),
            list_id,
            title,
            description: String::new(),
            status: TaskStatus::Pending,
            due_date,
            created_at: now,
            updated_at: now,
        })
    }

    /// Creates a task that falls due [`default_due_in`] from now.
    pub fn due_tomorrow(list_id: Uuid, title: impl Into<String>) -> Result<Self, ValidationError> {
        Self::new(list_id, title, Utc::now() + default_due_in())
    }

    /// Marks the task as modified now.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
