//! Object storage collaborator
//!
//! The bot only needs four operations from storage: put bytes, put a local
//! file, download to a local file, and list keys with their modification
//! time. Credentials can be replaced while the process runs.
//!
//! Backends:
//! - `s3`: AWS S3 or any S3-compatible endpoint (`storage-s3` feature)
//! - `memory`: process-local map, for trial runs and tests

pub mod factory;
pub mod memory;
#[cfg(feature = "storage-s3")]
pub mod s3;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use secrecy::SecretString;
use std::path::Path;
use thiserror::Error;

use crate::session::Metadata;

pub use factory::{create_store, StorageBackend};
pub use memory::MemoryStore;
#[cfg(feature = "storage-s3")]
pub use s3::S3Store;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Listing failed: {0}")]
    ListFailed(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Storage configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// An object as reported by a listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub key: String,
    pub last_modified: DateTime<Utc>,
    pub size: u64,
}

/// Static credentials supplied at startup or through `set_aws`
#[derive(Debug, Clone)]
pub struct StorageCredentials {
    pub access_key_id: String,
    pub secret_access_key: SecretString,
}

impl StorageCredentials {
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: SecretString::from(secret_access_key.into()),
        }
    }
}

/// Storage abstraction used by the upload and retrieval pipelines
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Writes `data` to `bucket/key` with `metadata` attached.
    async fn put_bytes(&self, bucket: &str, key: &str, data: Bytes, metadata: &Metadata) -> StorageResult<()>;

    /// Writes the contents of a local file to `bucket/key`.
    async fn put_file(&self, bucket: &str, key: &str, path: &Path, metadata: &Metadata) -> StorageResult<()>;

    /// Downloads `bucket/key` into `dest`, returning the byte count.
    async fn download_to_file(&self, bucket: &str, key: &str, dest: &Path) -> StorageResult<u64>;

    /// Lists every object in `bucket`, optionally restricted to a key prefix.
    async fn list(&self, bucket: &str, prefix: Option<&str>) -> StorageResult<Vec<StoredObject>>;

    /// Replaces the credentials used for all later calls.
    async fn set_credentials(&self, credentials: StorageCredentials) -> StorageResult<()>;

    /// Credentials set explicitly (environment or `set_aws`), if any.
    async fn credentials(&self) -> Option<StorageCredentials>;

    fn backend(&self) -> StorageBackend;
}

/// Content type for a key, derived from its extension.
pub fn content_type_for(key: &str) -> &'static str {
    match crate::naming::extension_of(key).as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "application/octet-stream",
    }
}
