//! Task list index.
//!
//! Every task list lives in one JSON document at [`INDEX_KEY`], mapping list id to
//! list. Mutations read the whole document, change it in memory and write it back
//! with a conditional put on the version that was read, retrying when another
//! writer got there first.

use crate::storage::{BlobStore, ObjectVersion, StorageError, WriteCondition};
use bytes::Bytes;
use taskometer_core::{TaskList, TaskListIndex, ValidationError};

pub mod api;

/// Key of the document that indexes every task list.
pub const INDEX_KEY: &str = "task-lists.json";

/// How many read-modify-write rounds `save_list` attempts before giving up.
pub const MAX_WRITE_ATTEMPTS: usize = 5;

/// Error type for TaskListService operations.
#[derive(Debug, thiserror::Error)]
pub enum TaskListServiceError {
    /// The requested task list is not valid.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The object store failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    /// The stored index document is not well-formed.
    #[error("Malformed task list index: {0}")]
    Serialization(#[from] serde_json::Error),
    /// Concurrent writers kept changing the index until we ran out of attempts.
    #[error("Task list index kept changing, gave up after {0} attempts")]
    Conflict(usize),
}

pub struct TaskListService<'a> {
    store: &'a dyn BlobStore,
}

impl TaskListService<'_> {
    pub fn new(store: &dyn BlobStore) -> TaskListService<'_> {
        TaskListService { store }
    }

    /// Retrieves the index of all task lists, creating an empty one if none is stored yet.
    #[tracing::instrument(skip(self))]
    pub async fn get_index(&self) -> Result<TaskListIndex, TaskListServiceError> {
        let (index, _) = self.load_index().await?;
        Ok(index)
    }

    /// Creates a task list with the given name and records it in the index.
    ///
    /// # Arguments
    ///
    /// * `name` - Display name of the list. Must not be blank.
    ///
    /// # Returns
    ///
    /// A `Result` containing the created `TaskList` if successful, or an error otherwise.
    #[tracing::instrument(skip(self))]
    pub async fn create_list(&self, name: String) -> Result<TaskList, TaskListServiceError> {
        let list = TaskList::new(name)?;
        self.save_list(&list).await?;
        tracing::info!("Created task list {}", list.id);
        Ok(list)
    }

    /// Inserts or overwrites the entry for `list.id` in the index.
    ///
    /// The write is conditional on the index version that was read. When another
    /// writer changed the index in between, the whole read-modify-write is
    /// repeated, up to [`MAX_WRITE_ATTEMPTS`] times.
    #[tracing::instrument(skip(self, list), fields(list_id = %list.id))]
    pub async fn save_list(&self, list: &TaskList) -> Result<(), TaskListServiceError> {
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let (mut index, version) = self.load_index().await?;
            index.insert(list.clone());

            match self
                .store
                .put_if(INDEX_KEY, encode_index(&index)?, WriteCondition::Matches(version))
                .await
            {
                Ok(_) => return Ok(()),
                Err(StorageError::PreconditionFailed(_)) => {
                    tracing::warn!(attempt, "Task list index changed while saving, retrying");
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(TaskListServiceError::Conflict(MAX_WRITE_ATTEMPTS))
    }

    async fn load_index(&self) -> Result<(TaskListIndex, ObjectVersion), TaskListServiceError> {
        match self.store.get(INDEX_KEY).await {
            Ok(blob) => Ok((serde_json::from_slice(&blob.bytes)?, blob.version)),
            Err(StorageError::NotFound(_)) => self.initialize_index().await,
            Err(err) => Err(err.into()),
        }
    }

    async fn initialize_index(
        &self,
    ) -> Result<(TaskListIndex, ObjectVersion), TaskListServiceError> {
        let index = TaskListIndex::new();
        match self
            .store
            .put_if(INDEX_KEY, encode_index(&index)?, WriteCondition::DoesNotExist)
            .await
        {
            Ok(version) => {
                tracing::info!("Successfully initialized {}", INDEX_KEY);
                Ok((index, version))
            }
            // Someone else initialized it first; use theirs.
            Err(StorageError::AlreadyExists(_) | StorageError::PreconditionFailed(_)) => {
                let blob = self.store.get(INDEX_KEY).await?;
                Ok((serde_json::from_slice(&blob.bytes)?, blob.version))
            }
            Err(err) => Err(err.into()),
        }
    }
}

fn encode_index(index: &TaskListIndex) -> Result<Bytes, serde_json::Error> {
    serde_json::to_vec_pretty(index).map(Bytes::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{Blob, MockBlobStore, ObjectStoreBlobStore};
    use std::sync::Arc;

    fn version(tag: &str) -> ObjectVersion {
        ObjectVersion {
            e_tag: Some(tag.to_string()),
            version: None,
        }
    }

    fn blob_of(index: &TaskListIndex, tag: &str) -> Blob {
        Blob {
            bytes: encode_index(index).unwrap(),
            version: version(tag),
        }
    }

    #[tokio::test]
    async fn initializes_empty_index_when_missing() {
        let store = ObjectStoreBlobStore::in_memory();
        let service = TaskListService::new(&store);

        let index = service.get_index().await.unwrap();

        assert!(index.is_empty());
        let stored = store.get(INDEX_KEY).await.unwrap();
        assert_eq!(&stored.bytes[..], b"{}");
    }

    #[tokio::test]
    async fn created_list_appears_in_index() {
        let store = ObjectStoreBlobStore::in_memory();
        let service = TaskListService::new(&store);

        let list = service.create_list("Groceries".to_string()).await.unwrap();
        let index = service.get_index().await.unwrap();

        assert_eq!(index.len(), 1);
        assert_eq!(index.get(&list.id), Some(&list));
    }

    #[tokio::test]
    async fn rejects_blank_list_name_without_writing() {
        let mut store = MockBlobStore::new();
        store.expect_get().never();
        store.expect_put_if().never();
        let service = TaskListService::new(&store);

        let result = service.create_list("  ".to_string()).await;

        assert!(matches!(
            result,
            Err(TaskListServiceError::Validation(ValidationError::EmptyListName))
        ));
    }

    #[tokio::test]
    async fn retries_when_index_changes_between_read_and_write() {
        let existing = TaskList::new("Existing").unwrap();
        let existing_index: TaskListIndex = std::iter::once(existing.clone()).collect();

        let mut store = MockBlobStore::new();
        let mut reads = 0;
        store.expect_get().times(2).returning(move |_| {
            reads += 1;
            if reads == 1 {
                Ok(blob_of(&TaskListIndex::new(), "1"))
            } else {
                Ok(blob_of(&existing_index, "2"))
            }
        });
        let mut writes = 0;
        store
            .expect_put_if()
            .times(2)
            .returning(move |key, body, condition| {
                writes += 1;
                assert_eq!(key, INDEX_KEY);
                if writes == 1 {
                    assert_eq!(condition, WriteCondition::Matches(version("1")));
                    return Err(StorageError::PreconditionFailed(key.to_string()));
                }
                assert_eq!(condition, WriteCondition::Matches(version("2")));
                let written: TaskListIndex = serde_json::from_slice(&body).unwrap();
                assert_eq!(written.len(), 2);
                Ok(version("3"))
            });
        let service = TaskListService::new(&store);

        let list = TaskList::new("New").unwrap();
        service.save_list(&list).await.unwrap();
    }

    #[tokio::test]
    async fn gives_up_after_repeated_conflicts() {
        let mut store = MockBlobStore::new();
        store
            .expect_get()
            .times(MAX_WRITE_ATTEMPTS)
            .returning(|_| Ok(blob_of(&TaskListIndex::new(), "1")));
        store
            .expect_put_if()
            .times(MAX_WRITE_ATTEMPTS)
            .returning(|key, _, _| Err(StorageError::PreconditionFailed(key.to_string())));
        let service = TaskListService::new(&store);

        let result = service.save_list(&TaskList::new("Busy").unwrap()).await;

        assert!(matches!(
            result,
            Err(TaskListServiceError::Conflict(MAX_WRITE_ATTEMPTS))
        ));
    }

    #[tokio::test]
    async fn reads_index_written_by_concurrent_initializer() {
        let mut store = MockBlobStore::new();
        let mut reads = 0;
        store.expect_get().times(2).returning(move |key| {
            reads += 1;
            if reads == 1 {
                Err(StorageError::NotFound(key.to_string()))
            } else {
                Ok(blob_of(
                    &std::iter::once(TaskList::new("Theirs").unwrap()).collect(),
                    "7",
                ))
            }
        });
        store
            .expect_put_if()
            .times(1)
            .returning(|key, _, _| Err(StorageError::AlreadyExists(key.to_string())));
        let service = TaskListService::new(&store);

        let index = service.get_index().await.unwrap();

        assert_eq!(index.len(), 1);
    }

    #[tokio::test]
    async fn reports_malformed_index() {
        let mut store = MockBlobStore::new();
        store.expect_get().returning(|_| {
            Ok(Blob {
                bytes: Bytes::from_static(b"not json"),
                version: ObjectVersion::default(),
            })
        });
        let service = TaskListService::new(&store);

        let result = service.get_index().await;

        assert!(matches!(
            result,
            Err(TaskListServiceError::Serialization(_))
        ));
    }

    #[tokio::test]
    async fn propagates_backend_failure() {
        let mut store = MockBlobStore::new();
        store.expect_get().returning(|_| {
            Err(StorageError::Backend(object_store::Error::Generic {
                store: "test",
                source: "connection refused".into(),
            }))
        });
        let service = TaskListService::new(&store);

        let result = service.get_index().await;

        assert!(matches!(result, Err(TaskListServiceError::Storage(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_list_creation_keeps_every_list() {
        let store: Arc<dyn BlobStore> = Arc::new(ObjectStoreBlobStore::in_memory());
        TaskListService::new(store.as_ref()).get_index().await.unwrap();

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    TaskListService::new(store.as_ref())
                        .create_list(format!("List {i}"))
                        .await
                })
            })
            .collect();

        let mut created = Vec::new();
        for handle in handles {
            created.push(handle.await.unwrap().unwrap());
        }

        let index = TaskListService::new(store.as_ref())
            .get_index()
            .await
            .unwrap();
        assert_eq!(index.len(), 4);
        assert!(created.iter().all(|list| index.contains(&list.id)));
    }
}
