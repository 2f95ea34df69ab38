//! In-process storage backend
//!
//! Keeps objects in a map keyed by `(bucket, key)`. Used for trial runs
//! (`STORAGE_BACKEND=memory`) and as the storage double in tests, which is why
//! it counts every call it receives.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::{ImageStore, StorageBackend, StorageCredentials, StorageError, StorageResult, StoredObject};
use crate::session::Metadata;

/// A stored object with its metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryObject {
    pub data: Bytes,
    pub metadata: Metadata,
    pub last_modified: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: Mutex<BTreeMap<(String, String), MemoryObject>>,
    credentials: Mutex<Option<StorageCredentials>>,
    calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an object directly, bypassing call accounting.
    pub fn insert(&self, bucket: &str, key: &str, data: impl Into<Bytes>, last_modified: DateTime<Utc>) {
        let object = MemoryObject {
            data: data.into(),
            metadata: Metadata::new(),
            last_modified,
        };
        self.lock_objects()
            .insert((bucket.to_string(), key.to_string()), object);
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<MemoryObject> {
        self.lock_objects()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    /// Keys stored in `bucket`, in key order.
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.lock_objects()
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, key)| key.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock_objects().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of trait calls received so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn record_call(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    fn lock_objects(&self) -> std::sync::MutexGuard<'_, BTreeMap<(String, String), MemoryObject>> {
        self.objects.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn store(&self, bucket: &str, key: &str, data: Bytes, metadata: &Metadata) {
        let object = MemoryObject {
            data,
            metadata: metadata.clone(),
            last_modified: Utc::now(),
        };
        self.lock_objects()
            .insert((bucket.to_string(), key.to_string()), object);
    }
}

#[async_trait]
impl ImageStore for MemoryStore {
    async fn put_bytes(&self, bucket: &str, key: &str, data: Bytes, metadata: &Metadata) -> StorageResult<()> {
        self.record_call();
        log::info!("memory store: put {} bytes at {}/{}", data.len(), bucket, key);
        self.store(bucket, key, data, metadata);
        Ok(())
    }

    async fn put_file(&self, bucket: &str, key: &str, path: &Path, metadata: &Metadata) -> StorageResult<()> {
        self.record_call();
        let data = fs_err::tokio::read(path).await?;
        log::info!("memory store: put file {} at {}/{}", path.display(), bucket, key);
        self.store(bucket, key, Bytes::from(data), metadata);
        Ok(())
    }

    async fn download_to_file(&self, bucket: &str, key: &str, dest: &Path) -> StorageResult<u64> {
        self.record_call();
        let object = self
            .object(bucket, key)
            .ok_or_else(|| StorageError::NotFound(key.to_string()))?;

        if let Some(parent) = dest.parent() {
            fs_err::tokio::create_dir_all(parent).await?;
        }
        fs_err::tokio::write(dest, &object.data).await?;
        Ok(object.data.len() as u64)
    }

    async fn list(&self, bucket: &str, prefix: Option<&str>) -> StorageResult<Vec<StoredObject>> {
        self.record_call();
        let prefix = prefix.unwrap_or("");
        let objects = self
            .lock_objects()
            .iter()
            .filter(|((b, key), _)| b == bucket && key.starts_with(prefix))
            .map(|((_, key), object)| StoredObject {
                key: key.clone(),
                last_modified: object.last_modified,
                size: object.data.len() as u64,
            })
            .collect();
        Ok(objects)
    }

    async fn set_credentials(&self, credentials: StorageCredentials) -> StorageResult<()> {
        self.record_call();
        *self
            .credentials
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(credentials);
        Ok(())
    }

    async fn credentials(&self) -> Option<StorageCredentials> {
        self.credentials
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn backend(&self) -> StorageBackend {
        StorageBackend::Memory
    }
}
