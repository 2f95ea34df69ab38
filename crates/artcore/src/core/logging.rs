//! Logging initialization and startup diagnostics
//!
//! This module provides:
//! - Logger initialization (console + file)
//! - Storage configuration check logged at startup

use anyhow::Result;
use simplelog::*;
use std::fs::File;

use crate::core::config;
use crate::core::utils::mask_secret;

/// Initialize logger for both console and file output
///
/// Chatty transport crates (hyper, rustls, h2) are filtered out so the log
/// keeps to bot activity.
///
/// # Arguments
/// * `log_file_path` - Path to the log file
pub fn init_logger(log_file_path: &str) -> Result<()> {
    let log_file = File::create(log_file_path).map_err(|e| anyhow::anyhow!("Failed to create log file: {}", e))?;

    let config = ConfigBuilder::new()
        .add_filter_ignore_str("hyper")
        .add_filter_ignore_str("h2")
        .add_filter_ignore_str("rustls")
        .add_filter_ignore_str("tungstenite")
        .build();

    CombinedLogger::init(vec![
        TermLogger::new(LevelFilter::Info, config.clone(), TerminalMode::Mixed, ColorChoice::Auto),
        WriteLogger::new(LevelFilter::Info, config, log_file),
    ])
    .map_err(|e| anyhow::anyhow!("Failed to initialize logger: {}", e))?;

    Ok(())
}

/// Logs the storage configuration at application startup
///
/// Credentials are masked; a missing bucket is reported as a warning since
/// uploads stay disabled until `set_bucket` runs.
pub fn log_storage_configuration() {
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    log::info!("Storage Configuration Check");
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    log::info!("Backend: {}", config::STORAGE_BACKEND.as_str());
    log::info!("Region: {}", config::AWS_REGION.as_str());
    match config::S3_ENDPOINT_URL.as_deref() {
        Some(endpoint) => log::info!("Endpoint: {} (path-style addressing)", endpoint),
        None => log::info!("Endpoint: AWS default"),
    }

    match (config::ACCESS_KEY_ID.as_deref(), config::SECRET_ACCESS_KEY.as_deref()) {
        (Some(key), Some(secret)) => {
            log::info!("ACCESS_KEY_ID: {}", mask_secret(key, 4));
            log::info!("SECRET_ACCESS_KEY: {}", mask_secret(secret, 4));
        }
        (Some(_), None) | (None, Some(_)) => {
            log::warn!("Only one of ACCESS_KEY_ID / SECRET_ACCESS_KEY is set; falling back to the AWS credential chain");
        }
        (None, None) => log::info!("Credentials: AWS credential chain (env, profile, instance role)"),
    }

    match config::S3_BUCKET_NAME.as_deref() {
        Some(bucket) => log::info!("Bucket: {} (path: {:?})", bucket, config::S3_PATH.as_str()),
        None => log::warn!(
            "S3_BUCKET_NAME not set - uploads are rejected until {}set_bucket is used",
            config::COMMAND_PREFIX.as_str()
        ),
    }

    log::info!(
        "AUTO_UPLOAD: {}, PROMPT_INCLUDE: {}",
        *config::AUTO_UPLOAD,
        *config::PROMPT_INCLUDE
    );
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
}
