//! Task repository.
//!
//! Each task is its own JSON document at `tasks/<list_id>/<task_id>`. There is no
//! per-list index of tasks; listing a list enumerates the keys under its prefix
//! and fetches every document.

use crate::storage::{BlobStore, StorageError};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use taskometer_core::{Task, ValidationError};
use uuid::Uuid;

pub mod api;

/// Root of every task key.
pub const TASK_PREFIX: &str = "tasks";

/// Key prefix under which all tasks of a list are stored.
pub fn task_prefix(list_id: &Uuid) -> String {
    format!("{TASK_PREFIX}/{list_id}")
}

/// Key of a single task document.
pub fn task_key(list_id: &Uuid, task_id: &Uuid) -> String {
    format!("{TASK_PREFIX}/{list_id}/{task_id}")
}

fn task_id_from_key(key: &str) -> Option<Uuid> {
    key.rsplit('/')
        .next()
        .and_then(|segment| Uuid::parse_str(segment).ok())
}

/// Error type for TaskService operations.
#[derive(Debug, thiserror::Error)]
pub enum TaskServiceError {
    /// The requested task is not valid.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The object store failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    /// A task could not be encoded for storage.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub struct TaskService<'a> {
    store: &'a dyn BlobStore,
}

impl TaskService<'_> {
    pub fn new(store: &dyn BlobStore) -> TaskService<'_> {
        TaskService { store }
    }

    /// Creates a new pending task in a list.
    ///
    /// # Arguments
    ///
    /// * `list_id` - The list the task belongs to. Its existence is not checked.
    /// * `title` - The title of the task. Must not be blank.
    /// * `due_date` - When the task falls due; a day from now if `None`.
    ///
    /// # Returns
    ///
    /// A `Result` containing the created `Task` if successful, or an error otherwise.
    #[tracing::instrument(skip(self))]
    pub async fn create_task(
        &self,
        list_id: Uuid,
        title: String,
        due_date: Option<DateTime<Utc>>,
    ) -> Result<Task, TaskServiceError> {
        let task = match due_date {
            Some(due_date) => Task::new(list_id, title, due_date)?,
            None => Task::due_tomorrow(list_id, title)?,
        };
        self.write_task(&task).await?;
        tracing::info!("Created task {} in list {}", task.id, list_id);
        Ok(task)
    }

    /// Stores the task, overwriting any previous version, and returns it with a
    /// refreshed `updated_at`.
    #[tracing::instrument(skip(self, task), fields(task_id = %task.id, list_id = %task.list_id))]
    pub async fn save_task(&self, mut task: Task) -> Result<Task, TaskServiceError> {
        task.touch();
        self.write_task(&task).await?;
        Ok(task)
    }

    /// Retrieves a single task.
    ///
    /// Returns `Ok(None)` both when no task is stored under the key and when the
    /// stored document cannot be parsed.
    #[tracing::instrument(skip(self))]
    pub async fn get_task(
        &self,
        list_id: Uuid,
        task_id: Uuid,
    ) -> Result<Option<Task>, TaskServiceError> {
        let key = task_key(&list_id, &task_id);
        match self.store.get(&key).await {
            Ok(blob) => match serde_json::from_slice::<Task>(&blob.bytes) {
                Ok(task) => Ok(Some(task)),
                Err(err) => {
                    tracing::warn!("Ignoring malformed task document {}: {}", key, err);
                    Ok(None)
                }
            },
            Err(StorageError::NotFound(_)) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Retrieves every task stored under a list, in the store's listing order.
    ///
    /// Keys that do not end in a task id, and tasks that disappear or turn out
    /// unreadable between listing and fetching, are skipped. Any storage failure
    /// fails the whole listing.
    #[tracing::instrument(skip(self))]
    pub async fn list_tasks(&self, list_id: Uuid) -> Result<Vec<Task>, TaskServiceError> {
        let keys = self.store.list(&task_prefix(&list_id)).await?;

        let mut tasks = Vec::with_capacity(keys.len());
        for key in keys {
            let Some(task_id) = task_id_from_key(&key) else {
                tracing::warn!("Skipping unexpected key {} under list {}", key, list_id);
                continue;
            };

            match self.get_task(list_id, task_id).await? {
                Some(task) => tasks.push(task),
                None => tracing::warn!(
                    "Task {} was listed but could not be read, skipping",
                    task_id
                ),
            }
        }

        Ok(tasks)
    }

    /// Deletes a task. Deleting a task that does not exist succeeds.
    #[tracing::instrument(skip(self))]
    pub async fn delete_task(&self, list_id: Uuid, task_id: Uuid) -> Result<(), TaskServiceError> {
        self.store.delete(&task_key(&list_id, &task_id)).await?;
        Ok(())
    }

    async fn write_task(&self, task: &Task) -> Result<(), TaskServiceError> {
        let body = Bytes::from(serde_json::to_vec(task)?);
        self.store
            .put(&task_key(&task.list_id, &task.id), body)
            .await?;
        Ok(())
    }
}
