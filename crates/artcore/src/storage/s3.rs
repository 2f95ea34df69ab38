use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_config::{BehaviorVersion, SdkConfig};
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;
use secrecy::ExposeSecret;
use std::collections::HashMap;
use std::path::Path;
use tokio::sync::RwLock;

use super::{
    content_type_for, ImageStore, StorageBackend, StorageCredentials, StorageError, StorageResult, StoredObject,
};
use crate::session::Metadata;

/// Provider name reported to the SDK for static credentials
const CREDENTIALS_PROVIDER: &str = "artsaver";

/// S3 storage implementation
///
/// The client is rebuilt whenever credentials change; calls already in flight
/// keep the client they started with.
pub struct S3Store {
    sdk_config: SdkConfig,
    endpoint_url: Option<String>,
    client: RwLock<Client>,
    credentials: RwLock<Option<StorageCredentials>>,
}

impl S3Store {
    /// Create a new S3Store
    ///
    /// # Arguments
    /// * `region` - AWS region (or region identifier for S3-compatible providers)
    /// * `endpoint_url` - Optional custom endpoint for S3-compatible providers
    ///   (e.g., "http://localhost:9000" for MinIO)
    /// * `credentials` - Static credentials; `None` uses the default AWS chain
    pub async fn new(
        region: String,
        endpoint_url: Option<String>,
        credentials: Option<StorageCredentials>,
    ) -> StorageResult<Self> {
        let region_provider = RegionProviderChain::first_try(aws_config::Region::new(region));

        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(region_provider)
            .load()
            .await;

        let client = Self::build_client(&sdk_config, endpoint_url.as_deref(), credentials.as_ref());

        Ok(Self {
            sdk_config,
            endpoint_url,
            client: RwLock::new(client),
            credentials: RwLock::new(credentials),
        })
    }

    fn build_client(
        sdk_config: &SdkConfig,
        endpoint_url: Option<&str>,
        credentials: Option<&StorageCredentials>,
    ) -> Client {
        let mut builder = aws_sdk_s3::config::Builder::from(sdk_config);

        if let Some(endpoint) = endpoint_url {
            // MinIO and friends need path-style addressing
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        if let Some(creds) = credentials {
            builder = builder.credentials_provider(Credentials::new(
                creds.access_key_id.clone(),
                creds.secret_access_key.expose_secret().to_string(),
                None,
                None,
                CREDENTIALS_PROVIDER,
            ));
        }

        Client::from_conf(builder.build())
    }

    async fn client(&self) -> Client {
        self.client.read().await.clone()
    }
}

#[async_trait]
impl ImageStore for S3Store {
    async fn put_bytes(&self, bucket: &str, key: &str, data: Bytes, metadata: &Metadata) -> StorageResult<()> {
        let size = data.len();
        let start = std::time::Instant::now();

        self.client()
            .await
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(data))
            .content_type(content_type_for(key))
            .set_metadata(Some(to_header_map(metadata)))
            .send()
            .await
            .map_err(|e| {
                log::error!(
                    "S3 upload failed: bucket={} key={} size={} error={}",
                    bucket,
                    key,
                    size,
                    DisplayErrorContext(&e)
                );
                StorageError::UploadFailed(DisplayErrorContext(&e).to_string())
            })?;

        log::info!(
            "S3 upload successful: bucket={} key={} size={} duration_ms={:.1}",
            bucket,
            key,
            size,
            start.elapsed().as_secs_f64() * 1000.0
        );
        Ok(())
    }

    async fn put_file(&self, bucket: &str, key: &str, path: &Path, metadata: &Metadata) -> StorageResult<()> {
        let start = std::time::Instant::now();
        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| StorageError::UploadFailed(format!("Failed to read {}: {}", path.display(), e)))?;

        self.client()
            .await
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .content_type(content_type_for(key))
            .set_metadata(Some(to_header_map(metadata)))
            .send()
            .await
            .map_err(|e| {
                log::error!(
                    "S3 file upload failed: bucket={} key={} path={} error={}",
                    bucket,
                    key,
                    path.display(),
                    DisplayErrorContext(&e)
                );
                StorageError::UploadFailed(DisplayErrorContext(&e).to_string())
            })?;

        log::info!(
            "S3 file upload successful: bucket={} key={} path={} duration_ms={:.1}",
            bucket,
            key,
            path.display(),
            start.elapsed().as_secs_f64() * 1000.0
        );
        Ok(())
    }

    async fn download_to_file(&self, bucket: &str, key: &str, dest: &Path) -> StorageResult<u64> {
        let start = std::time::Instant::now();

        let output = self
            .client()
            .await
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().map(|se| se.is_no_such_key()).unwrap_or(false) {
                    StorageError::NotFound(key.to_string())
                } else {
                    log::error!(
                        "S3 download failed: bucket={} key={} error={}",
                        bucket,
                        key,
                        DisplayErrorContext(&e)
                    );
                    StorageError::DownloadFailed(DisplayErrorContext(&e).to_string())
                }
            })?;

        let data = output
            .body
            .collect()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?
            .into_bytes();

        if let Some(parent) = dest.parent() {
            fs_err::tokio::create_dir_all(parent).await?;
        }
        fs_err::tokio::write(dest, &data).await?;

        log::info!(
            "S3 download successful: bucket={} key={} size={} duration_ms={:.1}",
            bucket,
            key,
            data.len(),
            start.elapsed().as_secs_f64() * 1000.0
        );
        Ok(data.len() as u64)
    }

    async fn list(&self, bucket: &str, prefix: Option<&str>) -> StorageResult<Vec<StoredObject>> {
        let mut pages = self
            .client()
            .await
            .list_objects_v2()
            .bucket(bucket)
            .set_prefix(prefix.filter(|p| !p.is_empty()).map(str::to_string))
            .into_paginator()
            .send();

        let mut objects = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| {
                log::error!(
                    "S3 listing failed: bucket={} prefix={:?} error={}",
                    bucket,
                    prefix,
                    DisplayErrorContext(&e)
                );
                StorageError::ListFailed(DisplayErrorContext(&e).to_string())
            })?;

            for object in page.contents() {
                let Some(key) = object.key() else { continue };
                let last_modified = object
                    .last_modified()
                    .and_then(|dt| chrono::DateTime::from_timestamp(dt.secs(), dt.subsec_nanos()))
                    .unwrap_or_default();
                objects.push(StoredObject {
                    key: key.to_string(),
                    last_modified,
                    size: object.size().and_then(|s| u64::try_from(s).ok()).unwrap_or(0),
                });
            }
        }

        log::info!("S3 listing: bucket={} prefix={:?} objects={}", bucket, prefix, objects.len());
        Ok(objects)
    }

    async fn set_credentials(&self, credentials: StorageCredentials) -> StorageResult<()> {
        let client = Self::build_client(&self.sdk_config, self.endpoint_url.as_deref(), Some(&credentials));
        *self.client.write().await = client;
        *self.credentials.write().await = Some(credentials);
        log::info!("S3 credentials rotated");
        Ok(())
    }

    async fn credentials(&self) -> Option<StorageCredentials> {
        self.credentials.read().await.clone()
    }

    fn backend(&self) -> StorageBackend {
        StorageBackend::S3
    }
}

/// S3 user metadata travels in HTTP headers, so values are kept to printable ASCII.
fn to_header_map(metadata: &Metadata) -> HashMap<String, String> {
    metadata
        .iter()
        .map(|(key, value)| {
            let value: String = value
                .chars()
                .map(|c| if c.is_ascii() && !c.is_ascii_control() { c } else { '?' })
                .collect();
            (key.clone(), value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_header_map_replaces_non_ascii() {
        let mut metadata = Metadata::new();
        metadata.insert("Comments".to_string(), "café\nnight".to_string());
        let headers = to_header_map(&metadata);
        assert_eq!(headers["Comments"], "caf??night");
    }
}
