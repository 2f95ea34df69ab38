//! Artcore - core of the artsaver bot
//!
//! Saves images posted by an image-generation bot into S3 and answers the
//! bot's text commands. Nothing in this crate depends on the chat platform;
//! the `artbot` crate feeds it platform events and renders its replies.
//!
//! # Module Structure
//!
//! - `core`: Configuration, errors, logging, and common utilities
//! - `session`: Bucket, path, metadata and flags shared by all handlers
//! - `storage`: Object storage trait with S3 and in-memory backends
//! - `fetch`, `upload`, `retrieval`: Moving image bytes in and out of storage
//! - `commands`, `dispatcher`, `listener`: Command parsing and event handling

pub mod commands;
pub mod core;
pub mod dispatcher;
pub mod fetch;
pub mod listener;
pub mod naming;
pub mod retrieval;
pub mod session;
pub mod storage;
pub mod upload;

// Re-export commonly used types for convenience
pub use core::{config, AppError, AppResult};
pub use dispatcher::{Attachment, Button, ButtonAction, Dispatcher, DispatcherSettings, Invocation, Reply};
pub use listener::{find_image_bot, is_image_post, last_image_post, route_post, MemberInfo, Post, PostRoute};
pub use session::{Metadata, Session, SharedSession};
pub use storage::{create_store, ImageStore, MemoryStore, StorageBackend, StorageCredentials};
pub use upload::UploadPipeline;
