//! Object store adapter.
//!
//! Byte-level persistence of named blobs in a single bucket. Nothing in here
//! knows about JSON or tasks; callers own their key layout and encoding.
//!
//! Reads return an [`ObjectVersion`] that can be handed back to
//! [`BlobStore::put_if`] so a read-modify-write only lands if nobody else
//! wrote the object in between.

use crate::config::{Config, StorageBackend};
use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;
use object_store::aws::{AmazonS3Builder, S3ConditionalPut};
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::{ObjectStore, PutMode, PutOptions, PutPayload, PutResult, UpdateVersion};
use std::sync::Arc;

/// Errors that can occur while talking to the object store.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// No object is stored under the key.
    #[error("Object {0} not found")]
    NotFound(String),
    /// A create-only write found an object already stored under the key.
    #[error("Object {0} already exists")]
    AlreadyExists(String),
    /// A conditional write found the object changed since it was read.
    #[error("Object {0} was modified since it was read")]
    PreconditionFailed(String),
    /// Any other failure reported by the backend (network, auth, missing bucket...).
    #[error("Storage backend error: {0}")]
    Backend(#[from] object_store::Error),
}

impl StorageError {
    fn from_backend(key: &str, err: object_store::Error) -> Self {
        match err {
            object_store::Error::NotFound { .. } => StorageError::NotFound(key.to_string()),
            object_store::Error::AlreadyExists { .. } => {
                StorageError::AlreadyExists(key.to_string())
            }
            object_store::Error::Precondition { .. } => {
                StorageError::PreconditionFailed(key.to_string())
            }
            other => StorageError::Backend(other),
        }
    }
}

/// Opaque version tag of a stored object, as reported by the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectVersion {
    pub e_tag: Option<String>,
    pub version: Option<String>,
}

impl From<PutResult> for ObjectVersion {
    fn from(result: PutResult) -> Self {
        Self {
            e_tag: result.e_tag,
            version: result.version,
        }
    }
}

/// Contents of an object together with the version they were read at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub bytes: Bytes,
    pub version: ObjectVersion,
}

/// Precondition for [`BlobStore::put_if`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteCondition {
    /// Only write if nothing is stored under the key yet.
    DoesNotExist,
    /// Only write if the stored object is still at this version.
    Matches(ObjectVersion),
}

/// Named byte blobs in a single bucket.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Reads the object stored under `key`.
    async fn get(&self, key: &str) -> Result<Blob, StorageError>;

    /// Writes `body` under `key`, replacing whatever was there.
    async fn put(&self, key: &str, body: Bytes) -> Result<ObjectVersion, StorageError>;

    /// Writes `body` under `key` only if `condition` holds.
    ///
    /// Fails with [`StorageError::AlreadyExists`] or
    /// [`StorageError::PreconditionFailed`] when it does not.
    async fn put_if(
        &self,
        key: &str,
        body: Bytes,
        condition: WriteCondition,
    ) -> Result<ObjectVersion, StorageError>;

    /// Lists every key below the directory-style `prefix`, in the backend's listing order.
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError>;

    /// Deletes the object under `key`. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// Verifies that the bucket exists and is reachable with the configured credentials.
    async fn check_bucket(&self) -> Result<(), StorageError>;
}

/// [`BlobStore`] backed by any [`object_store::ObjectStore`], such as Amazon S3 or the
/// process-local in-memory store.
#[derive(Debug, Clone)]
pub struct ObjectStoreBlobStore {
    inner: Arc<dyn ObjectStore>,
}

impl ObjectStoreBlobStore {
    pub fn new(inner: Arc<dyn ObjectStore>) -> Self {
        Self { inner }
    }

    /// Creates a store that keeps every object in process memory.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemory::new()))
    }

    /// Builds the store selected by the configuration.
    ///
    /// For S3, credentials and any setting not present in `config` are resolved from
    /// the standard `AWS_*` environment variables.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        match config.storage_backend {
            StorageBackend::Memory => {
                tracing::warn!("Using in-memory storage; data will not survive a restart");
                Ok(Self::in_memory())
            }
            StorageBackend::S3 => {
                let bucket_name = config.bucket_name.as_deref().ok_or_else(|| {
                    anyhow::anyhow!("BUCKET_NAME must be set for the s3 storage backend")
                })?;

                let mut builder = AmazonS3Builder::from_env()
                    .with_bucket_name(bucket_name)
                    .with_conditional_put(S3ConditionalPut::ETagMatch)
                    .with_allow_http(config.aws_allow_http);
                if let Some(region) = &config.aws_region {
                    builder = builder.with_region(region);
                }
                if let Some(endpoint) = &config.aws_endpoint {
                    builder = builder.with_endpoint(endpoint);
                }

                tracing::info!("Using S3 bucket {}", bucket_name);
                Ok(Self::new(Arc::new(builder.build()?)))
            }
        }
    }
}

#[async_trait]
impl BlobStore for ObjectStoreBlobStore {
    #[tracing::instrument(skip(self))]
    async fn get(&self, key: &str) -> Result<Blob, StorageError> {
        let result = self
            .inner
            .get(&Path::from(key))
            .await
            .map_err(|err| StorageError::from_backend(key, err))?;

        let version = ObjectVersion {
            e_tag: result.meta.e_tag.clone(),
            version: result.meta.version.clone(),
        };
        let bytes = result
            .bytes()
            .await
            .map_err(|err| StorageError::from_backend(key, err))?;

        Ok(Blob { bytes, version })
    }

    #[tracing::instrument(skip(self, body), fields(len = body.len()))]
    async fn put(&self, key: &str, body: Bytes) -> Result<ObjectVersion, StorageError> {
        self.inner
            .put(&Path::from(key), PutPayload::from(body))
            .await
            .map(ObjectVersion::from)
            .map_err(|err| StorageError::from_backend(key, err))
    }

    #[tracing::instrument(skip(self, body), fields(len = body.len()))]
    async fn put_if(
        &self,
        key: &str,
        body: Bytes,
        condition: WriteCondition,
    ) -> Result<ObjectVersion, StorageError> {
        let mode = match condition {
            WriteCondition::DoesNotExist => PutMode::Create,
            WriteCondition::Matches(version) => PutMode::Update(UpdateVersion {
                e_tag: version.e_tag,
                version: version.version,
            }),
        };

        self.inner
            .put_opts(&Path::from(key), PutPayload::from(body), PutOptions::from(mode))
            .await
            .map(ObjectVersion::from)
            .map_err(|err| StorageError::from_backend(key, err))
    }

    #[tracing::instrument(skip(self))]
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let prefix_path = Path::from(prefix);
        self.inner
            .list(Some(&prefix_path))
            .map_ok(|meta| meta.location.to_string())
            .try_collect::<Vec<String>>()
            .await
            .map_err(|err| StorageError::from_backend(prefix, err))
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        match self.inner.delete(&Path::from(key)).await {
            Ok(()) | Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(err) => Err(StorageError::from_backend(key, err)),
        }
    }

    #[tracing::instrument(skip(self))]
    async fn check_bucket(&self) -> Result<(), StorageError> {
        self.inner.list_with_delimiter(None).await?;
        Ok(())
    }
}
