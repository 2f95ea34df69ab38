//! Object key naming
//!
//! Keys are always `path + "/" + filename`. Generated filenames are
//! timestamps (`YYYYMMDD_HHMMSS.<ext>`); with prompt inclusion on, the
//! sanitized prompt is placed in front of the filename component.

use chrono::{DateTime, TimeZone};
use std::path::{Component, Path, PathBuf};

use crate::core::config;
use crate::core::utils::truncate_chars;

/// Timestamp-based filename, e.g. `20240315_142501.png`.
pub fn timestamped_filename<Tz: TimeZone>(now: &DateTime<Tz>, extension: &str) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let extension = extension.trim_start_matches('.');
    let extension = if extension.is_empty() {
        config::listener::DEFAULT_EXTENSION
    } else {
        extension
    };
    format!("{}.{}", now.format("%Y%m%d_%H%M%S"), extension)
}

/// Destination key for a filename under a path prefix.
pub fn compose_key(path: &str, filename: &str) -> String {
    format!("{}/{}", path, filename)
}

/// Extension of a filename or URL path, without the dot and lowercased.
pub fn extension_of(name: &str) -> Option<String> {
    let name = name.split(['?', '#']).next().unwrap_or(name);
    let last = name.rsplit('/').next().unwrap_or(name);
    let (stem, ext) = last.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Whether a key ends with a recognized image extension.
///
/// Case-sensitive: `a.PNG` is not listed.
pub fn is_image_key(key: &str) -> bool {
    config::retrieval::IMAGE_EXTENSIONS
        .iter()
        .any(|ext| key.ends_with(ext))
}

/// Reduces a generation prompt to a filename-safe fragment.
///
/// Keeps the text before the first `" - "` delimiter, drops asterisks and
/// turns whitespace and path separators into hyphens. The result is not
/// length-capped; `splice_prompt` caps the part placed in the key. Returns
/// `None` when nothing is left.
pub fn sanitize_prompt(text: &str) -> Option<String> {
    let head = text.split(config::prompt::DELIMITER).next().unwrap_or(text);

    let cleaned: String = head
        .trim()
        .chars()
        .filter(|c| *c != '*')
        .map(|c| if c.is_whitespace() || c == '/' || c == '\\' { '-' } else { c })
        .collect();

    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

/// Places a sanitized prompt, capped at `MAX_PROMPT_LEN` characters, in front
/// of the filename component of `key`.
pub fn splice_prompt(key: &str, prompt: &str) -> String {
    let prompt = truncate_chars(prompt, config::prompt::MAX_PROMPT_LEN);
    match key.rfind('/') {
        Some(idx) => format!("{}{}_{}", &key[..=idx], prompt, &key[idx + 1..]),
        None => format!("{}_{}", prompt, key),
    }
}

/// Local path for `key` under `root`, keeping only normal path components.
///
/// `..`, root and prefix components are dropped so a key can never escape
/// the scratch directory.
pub fn scratch_path(root: &Path, key: &str) -> PathBuf {
    let mut path = root.to_path_buf();
    for component in Path::new(key).components() {
        if let Component::Normal(part) = component {
            path.push(part);
        }
    }
    path
}

/// Final path component of a key, used as the attachment filename.
pub fn file_name_of(key: &str) -> &str {
    key.rsplit('/').find(|part| !part.is_empty()).unwrap_or(key)
}
