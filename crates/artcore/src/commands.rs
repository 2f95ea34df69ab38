//! Text command parsing
//!
//! A message is a command when it starts with the configured prefix followed
//! by a known command name. Arguments are whitespace-separated; double quotes
//! group words into one argument.

use secrecy::SecretString;
use strum::{EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};
use thiserror::Error;

/// Command names as typed after the prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, IntoStaticStr, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum CommandName {
    Help,
    Upload,
    SetBucket,
    SetPath,
    #[strum(to_string = "bucket", serialize = "path")]
    Bucket,
    SetMetadata,
    SetAws,
    ToggleAutoUpload,
    TogglePromptInclude,
    ListImages,
    GetImage,
    Config,
}

impl CommandName {
    pub fn as_str(self) -> &'static str {
        self.into()
    }

    /// Argument synopsis shown in help and usage errors.
    pub fn usage(self) -> &'static str {
        match self {
            CommandName::Help => "help",
            CommandName::Upload => "upload [name_or_link]",
            CommandName::SetBucket => "set_bucket <bucket_name> [path]",
            CommandName::SetPath => "set_path <path>",
            CommandName::Bucket => "bucket",
            CommandName::SetMetadata => "set_metadata <key> <value>",
            CommandName::SetAws => "set_aws <access_key_id> <secret_access_key>",
            CommandName::ToggleAutoUpload => "toggle_auto_upload",
            CommandName::TogglePromptInclude => "toggle_prompt_include",
            CommandName::ListImages => "list_images",
            CommandName::GetImage => "get_image [filename]",
            CommandName::Config => "config",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            CommandName::Help => "List available commands.",
            CommandName::Upload => {
                "Upload an image to the S3 bucket. Attach the image and optionally provide a name, or pass an image link."
            }
            CommandName::SetBucket => "Set the S3 bucket and optionally the path.",
            CommandName::SetPath => "Set the S3 path.",
            CommandName::Bucket => "Display the current S3 bucket and path (alias: path).",
            CommandName::SetMetadata => "Set a default metadata value for uploaded files.",
            CommandName::SetAws => "Set AWS credentials (owner only).",
            CommandName::ToggleAutoUpload => "Toggle the AUTO_UPLOAD setting.",
            CommandName::TogglePromptInclude => "Toggle the PROMPT_INCLUDE setting.",
            CommandName::ListImages => "List all images in the S3 bucket.",
            CommandName::GetImage => "Choose an image from the current location to download.",
            CommandName::Config => "Display current settings (owner only).",
        }
    }

    pub fn owner_only(self) -> bool {
        matches!(self, CommandName::SetAws | CommandName::Config)
    }

    pub fn all() -> impl Iterator<Item = CommandName> {
        CommandName::iter()
    }
}

/// A parsed command with its validated arguments
#[derive(Debug, Clone)]
pub enum Command {
    Help,
    Upload { target: Option<String> },
    SetBucket { bucket: String, path: String },
    SetPath { path: String },
    Bucket,
    SetMetadata { key: String, value: String },
    SetAws { access_key_id: String, secret_access_key: SecretString },
    ToggleAutoUpload,
    TogglePromptInclude,
    ListImages,
    GetImage { filename: Option<String> },
    Config,
}

impl Command {
    pub fn name(&self) -> CommandName {
        match self {
            Command::Help => CommandName::Help,
            Command::Upload { .. } => CommandName::Upload,
            Command::SetBucket { .. } => CommandName::SetBucket,
            Command::SetPath { .. } => CommandName::SetPath,
            Command::Bucket => CommandName::Bucket,
            Command::SetMetadata { .. } => CommandName::SetMetadata,
            Command::SetAws { .. } => CommandName::SetAws,
            Command::ToggleAutoUpload => CommandName::ToggleAutoUpload,
            Command::TogglePromptInclude => CommandName::TogglePromptInclude,
            Command::ListImages => CommandName::ListImages,
            Command::GetImage { .. } => CommandName::GetImage,
            Command::Config => CommandName::Config,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("Missing argument `{argument}`. Usage: `{prefix}{usage}`")]
    MissingArgument {
        argument: &'static str,
        prefix: String,
        usage: &'static str,
    },

    #[error("Unclosed quote in command arguments")]
    UnclosedQuote,
}

/// Splits an argument string on whitespace, keeping double-quoted runs together.
pub fn tokenize(input: &str) -> Result<Vec<String>, CommandError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_token = false;

    for c in input.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                has_token = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if has_token {
                    tokens.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            c => {
                current.push(c);
                has_token = true;
            }
        }
    }

    if in_quotes {
        return Err(CommandError::UnclosedQuote);
    }
    if has_token {
        tokens.push(current);
    }
    Ok(tokens)
}

/// Parses a message into a command.
///
/// Returns `None` when the text is not addressed to the bot: no prefix, or an
/// unknown command name. Known commands with bad arguments yield
/// `Some(Err(..))` so the caller can answer with the usage line.
pub fn parse(text: &str, prefix: &str) -> Option<Result<Command, CommandError>> {
    let body = text.trim_start().strip_prefix(prefix)?;
    let (name, rest) = match body.find(char::is_whitespace) {
        Some(idx) => (&body[..idx], &body[idx..]),
        None => (body, ""),
    };
    let name: CommandName = name.parse().ok()?;

    Some(tokenize(rest).and_then(|args| build(name, args, prefix)))
}

fn build(name: CommandName, args: Vec<String>, prefix: &str) -> Result<Command, CommandError> {
    let mut args = args.into_iter();
    let required = |argument: &'static str, args: &mut std::vec::IntoIter<String>| {
        args.next().ok_or_else(|| CommandError::MissingArgument {
            argument,
            prefix: prefix.to_string(),
            usage: name.usage(),
        })
    };

    let command = match name {
        CommandName::Help => Command::Help,
        CommandName::Upload => Command::Upload { target: args.next() },
        CommandName::SetBucket => Command::SetBucket {
            bucket: required("bucket_name", &mut args)?,
            path: args.next().unwrap_or_default(),
        },
        CommandName::SetPath => Command::SetPath {
            path: args.next().unwrap_or_default(),
        },
        CommandName::Bucket => Command::Bucket,
        CommandName::SetMetadata => {
            let key = required("key", &mut args)?;
            let value = required("value", &mut args)?;
            // trailing words belong to the value
            let value = std::iter::once(value).chain(args).collect::<Vec<_>>().join(" ");
            Command::SetMetadata { key, value }
        }
        CommandName::SetAws => Command::SetAws {
            access_key_id: required("access_key_id", &mut args)?,
            secret_access_key: SecretString::from(required("secret_access_key", &mut args)?),
        },
        CommandName::ToggleAutoUpload => Command::ToggleAutoUpload,
        CommandName::TogglePromptInclude => Command::TogglePromptInclude,
        CommandName::ListImages => Command::ListImages,
        CommandName::GetImage => Command::GetImage { filename: args.next() },
        CommandName::Config => Command::Config,
    };
    Ok(command)
}
