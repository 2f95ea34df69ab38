//! Upload pipeline
//!
//! Turns an `UploadRequest` into one stored object. The pipeline never reads
//! the shared session: the caller passes the bucket and prompt flag it
//! snapshotted when the operation started.

use bytes::Bytes;
use reqwest::Client;
use std::path::PathBuf;
use std::sync::Arc;

use crate::core::config;
use crate::core::error::AppResult;
use crate::fetch::fetch_bytes;
use crate::naming::{sanitize_prompt, splice_prompt};
use crate::session::Metadata;
use crate::storage::ImageStore;

/// Where the bytes of an upload come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadSource {
    /// Fetched with a single HTTP GET
    Url(String),
    /// A file already staged on local disk
    LocalFile(PathBuf),
}

/// A single upload, immutable once built
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub source: UploadSource,
    pub destination_key: String,
    pub prompt: Option<String>,
    pub metadata: Metadata,
}

impl UploadRequest {
    pub fn new(source: UploadSource, destination_key: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            source,
            destination_key: destination_key.into(),
            prompt: None,
            metadata,
        }
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }
}

/// Bucket and final key of a stored object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    pub bucket: String,
    pub key: String,
}

/// Computes the final key and metadata for a request.
///
/// With prompt inclusion on and a usable prompt, the sanitized prompt is
/// recorded in full under the `Comments` field and, capped, spliced into the
/// filename. The
/// request's own metadata snapshot is left untouched.
pub fn prepare(request: &UploadRequest, prompt_include: bool) -> (String, Metadata) {
    let mut metadata = request.metadata.clone();

    let prompt = request
        .prompt
        .as_deref()
        .filter(|_| prompt_include)
        .and_then(sanitize_prompt);

    match prompt {
        Some(prompt) => {
            let key = splice_prompt(&request.destination_key, &prompt);
            metadata.insert(config::prompt::METADATA_FIELD.to_string(), prompt);
            (key, metadata)
        }
        None => (request.destination_key.clone(), metadata),
    }
}

/// Fetches sources and writes them to storage
#[derive(Clone)]
pub struct UploadPipeline {
    store: Arc<dyn ImageStore>,
    http: Client,
}

impl UploadPipeline {
    pub fn new(store: Arc<dyn ImageStore>, http: Client) -> Self {
        Self { store, http }
    }

    pub fn store(&self) -> &Arc<dyn ImageStore> {
        &self.store
    }

    pub fn http(&self) -> &Client {
        &self.http
    }

    /// Runs one upload into `bucket`.
    ///
    /// # Arguments
    ///
    /// * `bucket` - Destination bucket, already checked by the caller
    /// * `request` - Source, destination key, optional prompt and metadata snapshot
    /// * `prompt_include` - Prompt-inclusion flag as it was when the operation started
    ///
    /// # Errors
    ///
    /// A failed fetch aborts before storage is contacted. No retries are made.
    pub async fn run(&self, bucket: &str, request: UploadRequest, prompt_include: bool) -> AppResult<UploadOutcome> {
        let (key, metadata) = prepare(&request, prompt_include);
        log::info!("Uploading to {}/{} from {:?}", bucket, key, request.source);

        match &request.source {
            UploadSource::Url(url) => {
                let data: Bytes = fetch_bytes(&self.http, url).await?;
                self.store.put_bytes(bucket, &key, data, &metadata).await?;
            }
            UploadSource::LocalFile(path) => {
                self.store.put_file(bucket, &key, path, &metadata).await?;
            }
        }

        Ok(UploadOutcome {
            bucket: bucket.to_string(),
            key,
        })
    }
}
