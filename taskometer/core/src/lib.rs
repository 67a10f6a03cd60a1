//! Core domain models for Taskometer: task lists, the index that enumerates them, and tasks.
pub mod task;
pub mod task_list;

pub use task::{Task, TaskStatus};
pub use task_list::{TaskList, TaskListIndex};

use thiserror::Error;

/// Client input that cannot form a valid domain object.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Task list name must not be empty")]
    EmptyListName,
    #[error("Task title must not be empty")]
    EmptyTitle,
    #[error("Unknown task status code {0}")]
    UnknownStatus(u8),
}
