//! Image-bot event handling
//!
//! The bot crate resolves the image bot once on connect and feeds every
//! inbound message through `is_image_post`. Qualifying posts are either
//! uploaded straight away or answered with an "Upload Last Image" button.

use chrono::Local;

use crate::core::config;
use crate::core::error::{AppError, AppResult};
use crate::core::utils::truncate_chars;
use crate::dispatcher::{upload_reply, Attachment, Button, ButtonAction, Dispatcher, Reply};
use crate::naming::{compose_key, extension_of, timestamped_filename};
use crate::upload::{UploadOutcome, UploadRequest, UploadSource};

/// Upload prompt shown under an image-bot post
pub const UPLOAD_PROMPT: &str = "Would you like to upload the last image?";
pub const UPLOAD_BUTTON_LABEL: &str = "Upload Last Image";
/// Sent before the button-triggered upload starts
pub const UPLOADING_NOTICE: &str = "uploading image...";
pub const NO_RECENT_IMAGE: &str = "No recent image found";

/// A guild member as seen during the startup scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberInfo {
    pub id: u64,
    pub name: String,
    pub display_name: Option<String>,
    pub is_bot: bool,
}

/// First bot member whose name contains the image-bot marker (case-insensitive).
pub fn find_image_bot<'a>(members: impl IntoIterator<Item = &'a MemberInfo>) -> Option<u64> {
    members
        .into_iter()
        .find(|member| {
            member.is_bot
                && std::iter::once(member.name.as_str())
                    .chain(member.display_name.as_deref())
                    .any(|name| name.to_lowercase().contains(config::listener::IMAGE_BOT_NAME))
        })
        .map(|member| member.id)
}

/// An inbound message, reduced to what the listener looks at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    pub author_id: u64,
    pub author_is_bot: bool,
    pub content: String,
    pub attachments: Vec<Attachment>,
}

/// Whether `post` comes from the image bot and carries an image.
///
/// Always false while no image bot has been found.
pub fn is_image_post(post: &Post, image_bot: Option<u64>) -> bool {
    image_bot == Some(post.author_id) && post.attachments.iter().any(Attachment::is_image)
}

/// What the bot does with an inbound message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostRoute {
    /// An image-bot post: auto-upload or offer the upload button
    ImagePost,
    /// A human message that may hold a text command
    Command,
    /// Any other bot's message
    Ignore,
}

/// Routes a post. Bots other than the image bot never run commands.
pub fn route_post(post: &Post, image_bot: Option<u64>) -> PostRoute {
    if is_image_post(post, image_bot) {
        PostRoute::ImagePost
    } else if post.author_is_bot {
        PostRoute::Ignore
    } else {
        PostRoute::Command
    }
}

/// Reply for an upload button press whose channel history could not be read.
pub fn history_error_reply(error: &dyn std::fmt::Display) -> Reply {
    Reply::text(format!("Error reading the channel history: {}", error))
}

/// Most recent bot-authored message with an attachment.
///
/// `history` holds the messages before the upload prompt, newest first; only
/// the first `HISTORY_SCAN_LIMIT` are inspected.
pub fn last_image_post(history: &[Post]) -> Option<&Post> {
    history
        .iter()
        .take(usize::from(config::listener::HISTORY_SCAN_LIMIT))
        .find(|post| post.author_is_bot && !post.attachments.is_empty())
}

impl Dispatcher {
    /// Handles a post that passed `is_image_post`.
    pub async fn on_image_post(&self, post: &Post) -> Vec<Reply> {
        let session = self.snapshot().await;
        if !session.auto_upload {
            return vec![Reply::Choices {
                text: UPLOAD_PROMPT.to_string(),
                buttons: vec![Button::new(UPLOAD_BUTTON_LABEL, ButtonAction::UploadLast)],
            }];
        }

        log::info!("Auto-uploading image from message {:?}", truncate_chars(&post.content, 40));
        match self.upload_post(post).await {
            Ok(outcome) => vec![Reply::text(format!(
                "Image {} uploaded as {} in the bucket {}!",
                truncate_chars(&post.content, 15),
                outcome.key,
                outcome.bucket
            ))],
            Err(AppError::BucketUnset) => vec![Reply::text(AppError::BucketUnset.to_string())],
            Err(e) => vec![upload_reply(Err(e))],
        }
    }

    /// Uploads the post found by `last_image_post` after the upload button was pressed.
    pub async fn upload_last_image(&self, post: &Post) -> Vec<Reply> {
        match self.upload_post(post).await {
            Err(AppError::BucketUnset) => vec![Reply::text(AppError::BucketUnset.to_string())],
            result => vec![upload_reply(result)],
        }
    }

    /// Handles an image selection button: downloads that exact key.
    pub async fn on_fetch_button(&self, key: &str) -> Vec<Reply> {
        let session = self.snapshot().await;
        match session.require_bucket() {
            Ok(bucket) => vec![self.fetch_reply(bucket, key, key).await],
            Err(e) => vec![Reply::text(e.to_string())],
        }
    }

    /// Uploads the first image attachment of `post` under a timestamped key,
    /// with the message text as prompt.
    async fn upload_post(&self, post: &Post) -> AppResult<UploadOutcome> {
        let session = self.snapshot().await;
        let bucket = session.require_bucket()?;

        let attachment = post
            .attachments
            .iter()
            .find(|a| a.is_image())
            .or_else(|| post.attachments.first())
            .ok_or_else(|| AppError::Validation("message has no attachment".to_string()))?;

        let extension = extension_of(&attachment.filename)
            .or_else(|| extension_of(&attachment.url))
            .unwrap_or_default();
        let key = compose_key(&session.path, &timestamped_filename(&Local::now(), &extension));
        let request = UploadRequest::new(UploadSource::Url(attachment.url.clone()), key, session.metadata.clone())
            .with_prompt(post.content.as_str());

        self.pipeline.run(bucket, request, session.prompt_include).await
    }
}
