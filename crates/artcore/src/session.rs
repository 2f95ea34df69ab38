//! Session state: bucket, path prefix, default metadata and feature flags
//!
//! One `Session` lives for the whole process. It is shared behind a
//! `tokio::sync::RwLock`; operations clone a snapshot when they start so a
//! concurrent `set_bucket` cannot split a single upload across two buckets.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::core::config;
use crate::core::error::{AppError, AppResult};

/// Default metadata attached to every stored object
pub type Metadata = BTreeMap<String, String>;

/// Session shared between the dispatcher and the event listener
pub type SharedSession = Arc<RwLock<Session>>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Session {
    pub bucket: Option<String>,
    pub path: String,
    pub metadata: Metadata,
    pub auto_upload: bool,
    pub prompt_include: bool,
}

impl Session {
    /// Builds the startup session from the process environment.
    pub fn from_env() -> Self {
        Self {
            bucket: config::S3_BUCKET_NAME.clone(),
            path: config::S3_PATH.clone(),
            metadata: Metadata::new(),
            auto_upload: *config::AUTO_UPLOAD,
            prompt_include: *config::PROMPT_INCLUDE,
        }
    }

    pub fn shared(self) -> SharedSession {
        Arc::new(RwLock::new(self))
    }

    /// Replaces bucket and path together.
    pub fn set_bucket(&mut self, bucket: impl Into<String>, path: impl Into<String>) {
        let bucket = bucket.into();
        self.bucket = if bucket.is_empty() { None } else { Some(bucket) };
        self.path = path.into();
    }

    pub fn set_path(&mut self, path: impl Into<String>) {
        self.path = path.into();
    }

    /// Inserts or replaces one default metadata entry.
    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.metadata.insert(key.into(), value.into());
    }

    /// Flips auto-upload and returns the new value.
    pub fn toggle_auto_upload(&mut self) -> bool {
        self.auto_upload = !self.auto_upload;
        self.auto_upload
    }

    /// Flips prompt inclusion and returns the new value.
    pub fn toggle_prompt_include(&mut self) -> bool {
        self.prompt_include = !self.prompt_include;
        self.prompt_include
    }

    /// The configured bucket, or `AppError::BucketUnset`.
    pub fn require_bucket(&self) -> AppResult<&str> {
        self.bucket.as_deref().ok_or(AppError::BucketUnset)
    }

    /// Human-readable description of the current location.
    pub fn location_report(&self) -> String {
        match (self.bucket.as_deref(), self.path.is_empty()) {
            (Some(bucket), false) => format!("Current S3 location is: {}/{}", bucket, self.path),
            (Some(bucket), true) => format!("Current S3 bucket is: {}, path is empty", bucket),
            (None, _) => "No S3 bucket or path has been set.".to_string(),
        }
    }

    /// Metadata rendered as a JSON object for reports.
    pub fn metadata_report(&self) -> String {
        serde_json::to_string(&self.metadata).unwrap_or_else(|_| "{}".to_string())
    }
}
