use once_cell::sync::Lazy;
use std::env;
use std::time::Duration;

/// Reads an environment variable, treating blank values as unset.
fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Parses a feature flag value.
///
/// Accepts `1`, `true`, `yes`, `on` (case-insensitive) as enabled; everything
/// else, including an empty string, is disabled.
pub fn parse_flag(raw: &str) -> bool {
    matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

/// Discord bot token
/// Read from BOT_TOKEN or DISCORD_TOKEN environment variable
pub static BOT_TOKEN: Lazy<String> = Lazy::new(|| {
    non_empty_var("BOT_TOKEN")
        .or_else(|| non_empty_var("DISCORD_TOKEN"))
        .unwrap_or_default()
});

/// Storage access key id
/// Read from ACCESS_KEY_ID; when unset the ambient AWS credential chain is used
pub static ACCESS_KEY_ID: Lazy<Option<String>> = Lazy::new(|| non_empty_var("ACCESS_KEY_ID"));

/// Storage secret access key
/// Read from SECRET_ACCESS_KEY
pub static SECRET_ACCESS_KEY: Lazy<Option<String>> = Lazy::new(|| non_empty_var("SECRET_ACCESS_KEY"));

/// Initial bucket
/// Read from S3_BUCKET_NAME. Unset means uploads are rejected until `set_bucket` runs.
pub static S3_BUCKET_NAME: Lazy<Option<String>> = Lazy::new(|| non_empty_var("S3_BUCKET_NAME"));

/// Initial path prefix inside the bucket
/// Read from S3_PATH
/// Default: empty
pub static S3_PATH: Lazy<String> = Lazy::new(|| env::var("S3_PATH").unwrap_or_default());

/// Storage region
/// Read from AWS_REGION
/// Default: us-east-1
pub static AWS_REGION: Lazy<String> =
    Lazy::new(|| non_empty_var("AWS_REGION").unwrap_or_else(|| "us-east-1".to_string()));

/// Custom endpoint for S3-compatible providers (MinIO, DigitalOcean Spaces, ...)
/// Read from S3_ENDPOINT_URL
pub static S3_ENDPOINT_URL: Lazy<Option<String>> = Lazy::new(|| non_empty_var("S3_ENDPOINT_URL"));

/// Storage backend selector
/// Read from STORAGE_BACKEND: "s3" or "memory"
/// Default: s3
pub static STORAGE_BACKEND: Lazy<String> =
    Lazy::new(|| non_empty_var("STORAGE_BACKEND").unwrap_or_else(|| "s3".to_string()));

/// Embed the generation prompt into stored filenames
/// Read from PROMPT_INCLUDE
pub static PROMPT_INCLUDE: Lazy<bool> =
    Lazy::new(|| env::var("PROMPT_INCLUDE").map(|v| parse_flag(&v)).unwrap_or(false));

/// Upload image-bot posts without asking
/// Read from AUTO_UPLOAD
pub static AUTO_UPLOAD: Lazy<bool> = Lazy::new(|| env::var("AUTO_UPLOAD").map(|v| parse_flag(&v)).unwrap_or(false));

/// Prefix for text commands
/// Read from COMMAND_PREFIX
/// Default: !
pub static COMMAND_PREFIX: Lazy<String> =
    Lazy::new(|| non_empty_var("COMMAND_PREFIX").unwrap_or_else(|| "!".to_string()));

/// Scratch directory for attachment staging and downloaded images
/// Read from TEMP_FILES_DIR
/// Default: ./tmp
pub static TEMP_FILES_DIR: Lazy<String> =
    Lazy::new(|| non_empty_var("TEMP_FILES_DIR").unwrap_or_else(|| "./tmp".to_string()));

/// Log file path
/// Read from LOG_FILE_PATH
/// Default: artsaver.log
pub static LOG_FILE_PATH: Lazy<String> =
    Lazy::new(|| non_empty_var("LOG_FILE_PATH").unwrap_or_else(|| "artsaver.log".to_string()));

/// Owner configuration
pub mod owners {
    use once_cell::sync::Lazy;
    use std::env;

    pub fn parse_owner_ids(raw: &str) -> Vec<u64> {
        raw.split([',', ' ', '\n', '\t'])
            .filter_map(|part| part.trim().parse::<u64>().ok())
            .collect()
    }

    /// Extra owner user IDs (comma-separated), added to the application owner
    /// Read from OWNER_IDS environment variable
    pub static OWNER_IDS: Lazy<Vec<u64>> = Lazy::new(|| {
        env::var("OWNER_IDS")
            .ok()
            .map(|raw| parse_owner_ids(&raw))
            .unwrap_or_default()
    });
}

/// Network configuration
pub mod network {
    use super::Duration;

    /// Request timeout for source fetches (in seconds)
    pub const REQUEST_TIMEOUT_SECS: u64 = 120;

    /// Connect timeout (in seconds)
    pub const CONNECT_TIMEOUT_SECS: u64 = 30;

    pub const USER_AGENT: &str = concat!("artsaver/", env!("CARGO_PKG_VERSION"));

    pub fn timeout() -> Duration {
        Duration::from_secs(REQUEST_TIMEOUT_SECS)
    }

    pub fn connect_timeout() -> Duration {
        Duration::from_secs(CONNECT_TIMEOUT_SECS)
    }
}

/// Retrieval configuration
pub mod retrieval {
    /// Maximum number of images offered by `get_image` without a filename
    pub const RECENT_IMAGES_LIMIT: usize = 10;

    /// Key suffixes treated as images
    pub const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png"];
}

/// Prompt embedding configuration
pub mod prompt {
    /// Maximum length (in characters) of the prompt placed in a filename
    pub const MAX_PROMPT_LEN: usize = 80;

    /// Everything from the first delimiter on is dropped (mention, speed tag, ...)
    pub const DELIMITER: &str = " - ";

    /// Metadata field that receives the sanitized prompt
    pub const METADATA_FIELD: &str = "Comments";
}

/// Image-bot detection and upload prompt
pub mod listener {
    /// Case-insensitive fragment identifying the image-generation bot
    pub const IMAGE_BOT_NAME: &str = "midjourney";

    /// Messages inspected before the prompt message when the upload button is pressed
    pub const HISTORY_SCAN_LIMIT: u8 = 10;

    /// Extension assumed when an attachment or link carries none
    pub const DEFAULT_EXTENSION: &str = "jpg";
}

/// Chat-platform message limits
pub mod limits {
    /// Maximum characters per message
    pub const MESSAGE_LIMIT: usize = 2000;

    /// Maximum characters in a button label
    pub const BUTTON_LABEL_LIMIT: usize = 80;

    /// Maximum characters in a button custom id
    pub const CUSTOM_ID_LIMIT: usize = 100;

    /// Buttons per action row
    pub const BUTTONS_PER_ROW: usize = 5;
}
