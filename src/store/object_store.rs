//! Byte-oriented object storage.
//!
//! The pipeline only needs put/get/delete-by-prefix keyed by string paths;
//! everything else (replication, durability, real S3) belongs to whatever
//! implements the trait. The in-memory implementation backs tests and
//! single-process deployments.

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("no object stored under key '{0}'")]
    NotFound(String),

    #[error("object storage unavailable: {0}")]
    Unavailable(String),

    #[error("retrieval URL has expired")]
    UrlExpired,

    #[error("retrieval URL is malformed or its signature does not verify")]
    UrlInvalid,
}

/// Blocking-free object store keyed by string paths.
///
/// `put` is an idempotent overwrite. Callers apply their own timeouts;
/// implementations do not retry internally — one failed call surfaces
/// immediately and the caller decides.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, key: &str, bytes: Bytes) -> Result<(), StorageError>;

    async fn get(&self, key: &str) -> Result<Bytes, StorageError>;

    /// Remove every object whose key starts with `prefix`. Returns the
    /// number of objects removed; removing nothing is not an error.
    async fn delete_prefix(&self, prefix: &str) -> Result<u64, StorageError>;
}

/// Concurrent in-memory object store.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: DashMap<String, Bytes>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(&self, key: &str, bytes: Bytes) -> Result<(), StorageError> {
        self.objects.insert(key.to_string(), bytes);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Bytes, StorageError> {
        self.objects
            .get(key)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<u64, StorageError> {
        let before = self.objects.len();
        self.objects.retain(|key, _| !key.starts_with(prefix));
        Ok((before - self.objects.len()) as u64)
    }
}
