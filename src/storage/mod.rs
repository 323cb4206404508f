//! Storage backends for assetpush

pub mod local;
pub mod s3;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::policy::UploadPolicy;
use crate::types::{BatchDeleteResult, ListPage};
use crate::uri::Location;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

#[cfg(test)]
use mockall::automock;

pub use local::LocalBackend;
pub use s3::S3Backend;

/// Remote operations the upload and purge flows depend on.
///
/// Implemented by the real backends and by test doubles.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Bucket this store writes to; upload policies are minted against it
    fn bucket(&self) -> String;

    /// Upload one local file under `key`
    async fn put_file(&self, policy: &UploadPolicy, key: &str, local_path: &Path) -> Result<()>;

    /// Fetch one page of keys under `prefix`, starting after `marker`
    async fn list_by_prefix(&self, prefix: &str, marker: &str, limit: usize) -> Result<ListPage>;

    /// Delete up to [`crate::types::MAX_DELETE_BATCH`] keys in one call
    async fn batch_delete(&self, keys: &[String]) -> Result<BatchDeleteResult>;
}

/// Storage backend enum for unified access to different storage systems
#[derive(Clone)]
pub enum StorageBackend {
    Local(LocalBackend),
    S3(S3Backend),
}

impl StorageBackend {
    /// Create a local backend
    pub fn local(root: PathBuf, bucket: impl Into<String>) -> Self {
        StorageBackend::Local(LocalBackend::new(root, bucket))
    }

    /// Create an S3 backend
    pub async fn s3(bucket: String, config: &Config) -> Result<Self> {
        Ok(StorageBackend::S3(
            S3Backend::new(bucket, &config.credentials).await?,
        ))
    }

    /// Open the backend for a destination
    pub async fn open(location: &Location, config: &Config) -> Result<Self> {
        match location {
            Location::Local(path) => {
                let label = if config.bucket.is_empty() {
                    "local".to_string()
                } else {
                    config.bucket.clone()
                };
                Ok(Self::local(path.clone(), label))
            }
            Location::S3 { bucket, .. } => {
                if bucket.is_empty() {
                    return Err(Error::config("no bucket configured"));
                }
                Self::s3(bucket.clone(), config).await
            }
        }
    }

    /// Get the name of this backend (for logging)
    pub fn name(&self) -> &'static str {
        match self {
            StorageBackend::Local(_) => "local",
            StorageBackend::S3(_) => "s3",
        }
    }
}

#[async_trait]
impl ObjectStore for StorageBackend {
    fn bucket(&self) -> String {
        match self {
            StorageBackend::Local(b) => b.bucket(),
            StorageBackend::S3(b) => b.bucket(),
        }
    }

    async fn put_file(&self, policy: &UploadPolicy, key: &str, local_path: &Path) -> Result<()> {
        match self {
            StorageBackend::Local(b) => b.put_file(policy, key, local_path).await,
            StorageBackend::S3(b) => b.put_file(policy, key, local_path).await,
        }
    }

    async fn list_by_prefix(&self, prefix: &str, marker: &str, limit: usize) -> Result<ListPage> {
        match self {
            StorageBackend::Local(b) => b.list_by_prefix(prefix, marker, limit).await,
            StorageBackend::S3(b) => b.list_by_prefix(prefix, marker, limit).await,
        }
    }

    async fn batch_delete(&self, keys: &[String]) -> Result<BatchDeleteResult> {
        match self {
            StorageBackend::Local(b) => b.batch_delete(keys).await,
            StorageBackend::S3(b) => b.batch_delete(keys).await,
        }
    }
}
