use std::sync::Arc;
use strum::{Display, EnumString};

#[cfg(feature = "storage-s3")]
use super::S3Store;
use super::{ImageStore, MemoryStore, StorageCredentials, StorageError, StorageResult};
use crate::core::config;

/// Storage backend selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum StorageBackend {
    S3,
    Memory,
}

/// Static credentials from ACCESS_KEY_ID / SECRET_ACCESS_KEY, when both are set.
pub fn credentials_from_env() -> Option<StorageCredentials> {
    match (config::ACCESS_KEY_ID.as_deref(), config::SECRET_ACCESS_KEY.as_deref()) {
        (Some(id), Some(secret)) => Some(StorageCredentials::new(id, secret)),
        _ => None,
    }
}

/// Create a storage backend based on configuration
pub async fn create_store() -> StorageResult<Arc<dyn ImageStore>> {
    let backend: StorageBackend = config::STORAGE_BACKEND
        .parse()
        .map_err(|_| StorageError::Config(format!("Unknown STORAGE_BACKEND: {}", config::STORAGE_BACKEND.as_str())))?;

    match backend {
        #[cfg(feature = "storage-s3")]
        StorageBackend::S3 => {
            let store = S3Store::new(
                config::AWS_REGION.clone(),
                config::S3_ENDPOINT_URL.clone(),
                credentials_from_env(),
            )
            .await?;
            Ok(Arc::new(store))
        }

        #[cfg(not(feature = "storage-s3"))]
        StorageBackend::S3 => Err(StorageError::Config(
            "S3 storage backend not available (storage-s3 feature not enabled)".to_string(),
        )),

        StorageBackend::Memory => {
            log::warn!("Using in-memory storage; uploads are lost on restart");
            let store = MemoryStore::new();
            if let Some(credentials) = credentials_from_env() {
                store.set_credentials(credentials).await?;
            }
            Ok(Arc::new(store))
        }
    }
}
