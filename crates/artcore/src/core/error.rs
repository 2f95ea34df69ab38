use thiserror::Error;

use crate::core::config;
use crate::fetch::FetchError;
use crate::storage::StorageError;

/// Centralized error types for the application
///
/// Handlers convert every variant into a single chat reply; nothing here is
/// allowed to take the process down.
///
/// # Example
///
/// ```no_run
/// use artcore::core::error::AppError;
///
/// fn handle_error(err: AppError) {
///     eprintln!("Error: {}", err);
/// }
/// ```
#[derive(Error, Debug)]
pub enum AppError {
    /// An operation needs a bucket but none is configured
    #[error("Please set the S3 bucket first using {}set_bucket", config::COMMAND_PREFIX.as_str())]
    BucketUnset,

    /// Fetching source bytes failed
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Storage collaborator errors
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// URL parsing errors
    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;
