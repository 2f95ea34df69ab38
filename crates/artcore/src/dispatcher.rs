//! Command dispatcher
//!
//! Every handler answers with one or more `Reply` values. The bot crate turns
//! them into chat messages; nothing in here knows about the chat platform.
//! Failures are converted into a single text reply and never escape.

use chrono::Local;
use indoc::formatdoc;
use itertools::Itertools;
use secrecy::{ExposeSecret, SecretString};
use std::path::{Path, PathBuf};
use url::Url;

use crate::commands::{self, Command, CommandName};
use crate::core::config;
use crate::core::error::AppResult;
use crate::core::utils::{mask_secret, truncate_chars};
use crate::naming::{compose_key, extension_of, file_name_of, scratch_path, timestamped_filename};
use crate::retrieval::{download_image, list_images, most_recent};
use crate::session::{Session, SharedSession};
use crate::storage::StorageCredentials;
use crate::upload::{UploadOutcome, UploadPipeline, UploadRequest, UploadSource};

/// Reply sent when a non-owner invokes an owner-only command
pub const NOT_OWNER_REPLY: &str = "This command can only be used by the bot owner.";

/// A file attached to an inbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub url: String,
    pub filename: String,
    pub content_type: Option<String>,
}

impl Attachment {
    pub fn new(url: impl Into<String>, filename: impl Into<String>, content_type: Option<&str>) -> Self {
        Self {
            url: url.into(),
            filename: filename.into(),
            content_type: content_type.map(str::to_string),
        }
    }

    pub fn is_image(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.to_ascii_lowercase().starts_with("image/"))
    }
}

/// Context of one command invocation
#[derive(Debug, Clone, Default)]
pub struct Invocation {
    pub caller_is_owner: bool,
    pub attachments: Vec<Attachment>,
}

impl Invocation {
    pub fn new(caller_is_owner: bool) -> Self {
        Self {
            caller_is_owner,
            attachments: Vec::new(),
        }
    }

    pub fn with_attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = attachments;
        self
    }
}

/// What a button does when pressed; encoded into the button's custom id
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ButtonAction {
    UploadLast,
    FetchImage { key: String },
}

impl ButtonAction {
    const UPLOAD_LAST_ID: &'static str = "upload_last";
    const FETCH_IMAGE_PREFIX: &'static str = "get_image:";

    pub fn custom_id(&self) -> String {
        match self {
            ButtonAction::UploadLast => Self::UPLOAD_LAST_ID.to_string(),
            ButtonAction::FetchImage { key } => format!("{}{}", Self::FETCH_IMAGE_PREFIX, key),
        }
    }

    pub fn parse(custom_id: &str) -> Option<Self> {
        if custom_id == Self::UPLOAD_LAST_ID {
            return Some(ButtonAction::UploadLast);
        }
        custom_id
            .strip_prefix(Self::FETCH_IMAGE_PREFIX)
            .filter(|key| !key.is_empty())
            .map(|key| ButtonAction::FetchImage { key: key.to_string() })
    }

    /// Whether the encoded id fits the platform's custom id limit.
    pub fn fits(&self) -> bool {
        self.custom_id().chars().count() <= config::limits::CUSTOM_ID_LIMIT
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub action: ButtonAction,
}

impl Button {
    pub fn new(label: &str, action: ButtonAction) -> Self {
        Self {
            label: truncate_chars(label, config::limits::BUTTON_LABEL_LIMIT).to_string(),
            action,
        }
    }
}

/// One outbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    File {
        caption: String,
        path: PathBuf,
        filename: String,
    },
    Choices {
        text: String,
        buttons: Vec<Button>,
    },
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Reply::Text(text.into())
    }
}

/// Process-level settings the dispatcher needs besides the session
#[derive(Debug, Clone)]
pub struct DispatcherSettings {
    pub scratch_dir: PathBuf,
    pub prefix: String,
    pub bot_token: SecretString,
}

impl DispatcherSettings {
    pub fn from_env() -> Self {
        Self {
            scratch_dir: PathBuf::from(config::TEMP_FILES_DIR.as_str()),
            prefix: config::COMMAND_PREFIX.clone(),
            bot_token: SecretString::from(config::BOT_TOKEN.clone()),
        }
    }
}

/// Routes parsed commands and image-bot events to their handlers
pub struct Dispatcher {
    pub(crate) session: SharedSession,
    pub(crate) pipeline: UploadPipeline,
    pub(crate) settings: DispatcherSettings,
}

impl Dispatcher {
    pub fn new(session: SharedSession, pipeline: UploadPipeline, settings: DispatcherSettings) -> Self {
        Self {
            session,
            pipeline,
            settings,
        }
    }

    pub fn session(&self) -> &SharedSession {
        &self.session
    }

    pub fn settings(&self) -> &DispatcherSettings {
        &self.settings
    }

    /// Copy of the session taken at the start of an operation.
    pub(crate) async fn snapshot(&self) -> Session {
        self.session.read().await.clone()
    }

    /// Parses and runs a text message.
    ///
    /// Returns `None` when the message is not a command.
    pub async fn handle_text(&self, text: &str, invocation: &Invocation) -> Option<Vec<Reply>> {
        let parsed = commands::parse(text, &self.settings.prefix)?;
        let replies = match parsed {
            Ok(command) => self.dispatch(command, invocation).await,
            Err(e) => {
                log::debug!("Rejected command {:?}: {}", text, e);
                vec![Reply::text(e.to_string())]
            }
        };
        Some(replies)
    }

    /// Runs one command.
    ///
    /// Owner-only commands are refused before their handler runs.
    pub async fn dispatch(&self, command: Command, invocation: &Invocation) -> Vec<Reply> {
        let name = command.name();
        if name.owner_only() && !invocation.caller_is_owner {
            log::warn!("Refused owner-only command {} from non-owner", name.as_str());
            return vec![Reply::text(NOT_OWNER_REPLY)];
        }

        log::info!("Running command {}", name.as_str());
        match self.execute(command, invocation).await {
            Ok(replies) => replies,
            Err(e) => {
                log::warn!("Command {} failed: {}", name.as_str(), e);
                vec![Reply::text(e.to_string())]
            }
        }
    }

    async fn execute(&self, command: Command, invocation: &Invocation) -> AppResult<Vec<Reply>> {
        match command {
            Command::Help => Ok(vec![Reply::text(self.help_text())]),
            Command::Upload { target } => self.upload(target, invocation).await,
            Command::SetBucket { bucket, path } => {
                let mut session = self.session.write().await;
                session.set_bucket(bucket, path);
                let text = match (session.bucket.as_deref(), session.path.is_empty()) {
                    (Some(bucket), false) => format!("S3 bucket and path set to {}/{}", bucket, session.path),
                    (bucket, _) => format!("S3 bucket set to {}", bucket.unwrap_or_default()),
                };
                Ok(vec![Reply::text(text)])
            }
            Command::SetPath { path } => {
                let mut session = self.session.write().await;
                session.set_path(path);
                Ok(vec![Reply::text(format!("S3 path set to {}", session.path))])
            }
            Command::Bucket => Ok(vec![Reply::text(self.snapshot().await.location_report())]),
            Command::SetMetadata { key, value } => {
                let text = format!("Metadata set: {} = {}", key, value);
                self.session.write().await.set_metadata(key, value);
                Ok(vec![Reply::text(text)])
            }
            Command::SetAws {
                access_key_id,
                secret_access_key,
            } => {
                let credentials = StorageCredentials {
                    access_key_id,
                    secret_access_key,
                };
                self.pipeline.store().set_credentials(credentials).await?;
                Ok(vec![Reply::text("AWS credentials configured.")])
            }
            Command::ToggleAutoUpload => {
                let value = self.session.write().await.toggle_auto_upload();
                Ok(vec![Reply::text(format!("AUTO_UPLOAD set to {}", value))])
            }
            Command::TogglePromptInclude => {
                let value = self.session.write().await.toggle_prompt_include();
                Ok(vec![Reply::text(format!("PROMPT_INCLUDE set to {}", value))])
            }
            Command::ListImages => self.list_images().await,
            Command::GetImage { filename } => self.get_image(filename).await,
            Command::Config => self.config_report().await,
        }
    }

    fn help_text(&self) -> String {
        let prefix = &self.settings.prefix;
        let lines = CommandName::all()
            .map(|name| format!("`{}{}` - {}", prefix, name.usage(), name.description()))
            .join("\n");
        format!("**Help**\nList of commands:\n{}", lines)
    }

    async fn upload(&self, target: Option<String>, invocation: &Invocation) -> AppResult<Vec<Reply>> {
        let session = self.snapshot().await;
        let bucket = session.require_bucket()?.to_string();
        let now = Local::now();

        if let Some(link) = target.as_deref().filter(|t| is_link(t)) {
            let link = Url::parse(link)?;
            let extension = extension_of(link.path())
                .filter(|ext| is_image_extension(ext))
                .unwrap_or_else(|| config::listener::DEFAULT_EXTENSION.to_string());
            let key = compose_key(&session.path, &timestamped_filename(&now, &extension));
            let request = UploadRequest::new(UploadSource::Url(link.to_string()), key, session.metadata.clone());
            let result = self.pipeline.run(&bucket, request, session.prompt_include).await;
            return Ok(vec![upload_reply(result)]);
        }

        let Some(attachment) = invocation.attachments.first() else {
            return Ok(vec![Reply::text("Please provide a valid image or image link.")]);
        };

        let filename = match target {
            Some(name) => name,
            None => timestamped_filename(&now, &extension_of(&attachment.filename).unwrap_or_default()),
        };
        let key = compose_key(&session.path, &filename);
        let staged = scratch_path(
            &self.settings.scratch_dir.join("staging"),
            &format!("{}_{}", now.format("%Y%m%d%H%M%S%f"), file_name_of(&filename)),
        );

        let result = self
            .stage_and_upload(&bucket, attachment, &staged, key, &session)
            .await;
        remove_staged(&staged).await;

        Ok(vec![upload_reply(result)])
    }

    async fn stage_and_upload(
        &self,
        bucket: &str,
        attachment: &Attachment,
        staged: &Path,
        key: String,
        session: &Session,
    ) -> AppResult<UploadOutcome> {
        crate::fetch::fetch_to_file(self.pipeline.http(), &attachment.url, staged).await?;
        let request = UploadRequest::new(UploadSource::LocalFile(staged.to_path_buf()), key, session.metadata.clone());
        self.pipeline.run(bucket, request, session.prompt_include).await
    }

    async fn list_images(&self) -> AppResult<Vec<Reply>> {
        let session = self.snapshot().await;
        let bucket = session.require_bucket()?;

        // whole bucket, regardless of the configured path
        let images = list_images(self.pipeline.store().as_ref(), bucket, None).await?;
        if images.is_empty() {
            return Ok(vec![Reply::text("No images found in the bucket.")]);
        }

        let keys = images.iter().map(|o| o.key.as_str()).join("\n");
        Ok(vec![Reply::text(format!("images in the bucket:\n{}", keys))])
    }

    async fn get_image(&self, filename: Option<String>) -> AppResult<Vec<Reply>> {
        let session = self.snapshot().await;
        let bucket = session.require_bucket()?;

        let Some(filename) = filename else {
            let prefix = Some(session.path.as_str()).filter(|p| !p.is_empty());
            let images = list_images(self.pipeline.store().as_ref(), bucket, prefix).await?;
            let recent = most_recent(images, config::retrieval::RECENT_IMAGES_LIMIT);
            if recent.is_empty() {
                return Ok(vec![Reply::text("No images found in the bucket.")]);
            }
            return Ok(vec![image_choices(recent.iter().map(|o| o.key.as_str()))]);
        };

        let key = compose_key(&session.path, &filename);
        Ok(vec![self.fetch_reply(bucket, &key, &filename).await])
    }

    /// Downloads `key` and answers with it as an attachment, or with the error.
    pub(crate) async fn fetch_reply(&self, bucket: &str, key: &str, caption_name: &str) -> Reply {
        match download_image(self.pipeline.store().as_ref(), bucket, key, &self.settings.scratch_dir).await {
            Ok(path) => Reply::File {
                caption: format!("File Name: **{}**", caption_name),
                path,
                filename: file_name_of(key).to_string(),
            },
            Err(e) => {
                log::error!("Fetching {}/{} failed: {}", bucket, key, e);
                Reply::text(format!("Error fetching the image: {}", e))
            }
        }
    }

    async fn config_report(&self) -> AppResult<Vec<Reply>> {
        let session = self.snapshot().await;
        let credentials = self.pipeline.store().credentials().await;
        let (access_key, secret_key) = match &credentials {
            Some(creds) => (
                mask_secret(&creds.access_key_id, 4),
                mask_secret(creds.secret_access_key.expose_secret(), 4),
            ),
            None => ("(AWS credential chain)".to_string(), "(AWS credential chain)".to_string()),
        };

        let report = formatdoc! {"
            ```
            Current settings for the Art Saver bot:
            BOT_TOKEN: {token}
            AWS_ACCESS_KEY_ID: {access_key}
            AWS_SECRET_ACCESS_KEY: {secret_key}
            Storage backend: {backend}
            S3 Bucket: {bucket}
            S3 Path: {path}
            Image Metadata: {metadata}
            Auto Upload: {auto_upload}
            Include Prompt: {prompt_include}
            ```",
            token = mask_secret(self.settings.bot_token.expose_secret(), 5),
            access_key = access_key,
            secret_key = secret_key,
            backend = self.pipeline.store().backend(),
            bucket = session.bucket.as_deref().unwrap_or("(not set)"),
            path = session.path,
            metadata = session.metadata_report(),
            auto_upload = session.auto_upload,
            prompt_include = session.prompt_include,
        };
        Ok(vec![Reply::text(report)])
    }
}

/// Selection menu for stored images.
///
/// Keys too long to fit in a button id are listed in the text instead.
fn image_choices<'a>(keys: impl Iterator<Item = &'a str>) -> Reply {
    let (buttons, overflow): (Vec<Button>, Vec<&str>) =
        keys.fold((Vec::new(), Vec::new()), |(mut buttons, mut overflow), key| {
            let action = ButtonAction::FetchImage { key: key.to_string() };
            if action.fits() {
                buttons.push(Button::new(key, action));
            } else {
                overflow.push(key);
            }
            (buttons, overflow)
        });

    let mut text = "Select an image:".to_string();
    if !overflow.is_empty() {
        text.push_str("\nNames too long for a button (use get_image <filename>):\n");
        text.push_str(&overflow.join("\n"));
    }
    Reply::Choices { text, buttons }
}

/// Confirmation or error text for a finished upload.
pub(crate) fn upload_reply(result: AppResult<UploadOutcome>) -> Reply {
    match result {
        Ok(outcome) => Reply::text(format!(
            "Image uploaded as {} in the bucket {}!",
            outcome.key, outcome.bucket
        )),
        Err(e) => {
            log::error!("Upload failed: {}", e);
            Reply::text(format!("Error uploading the image: {}", e))
        }
    }
}

fn is_link(text: &str) -> bool {
    text.starts_with("http://") || text.starts_with("https://")
}

fn is_image_extension(ext: &str) -> bool {
    matches!(ext, "jpg" | "jpeg" | "png" | "webp" | "gif")
}

async fn remove_staged(path: &Path) {
    if let Err(e) = fs_err::tokio::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            log::warn!("Failed to delete staged file {}: {}", path.display(), e);
        }
    }
}
