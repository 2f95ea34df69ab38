use anyhow::{Context as _, Result};
use dotenvy::dotenv;
use tokio::signal;

use artcore::core::{config, init_logger, log_storage_configuration};
use artcore::dispatcher::DispatcherSettings;
use artcore::fetch::http_client;
use artcore::storage::create_store;
use artcore::{Dispatcher, Session, StorageBackend, UploadPipeline};

mod cli;
mod discord;

use cli::{Cli, Commands};
use discord::HandlerDeps;

/// Main entry point for the Discord bot
///
/// Parses CLI arguments and dispatches to the selected subcommand.
///
/// # Errors
/// Returns an error if initialization fails (logging, storage, client creation).
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    // Load environment variables from .env if present, before any config is read
    let _ = dotenv();

    std::panic::set_hook(Box::new(|panic_info| {
        log::error!("Panic caught: {:?}", panic_info);
        if let Some(location) = panic_info.location() {
            log::error!("Panic at {}:{}:{}", location.file(), location.line(), location.column());
        }
    }));

    init_logger(&config::LOG_FILE_PATH)?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_bot().await,
        Commands::CheckConfig => check_config(),
    }
}

/// Logs the resolved configuration and reports what would stop the bot from starting.
fn check_config() -> Result<()> {
    log_storage_configuration();

    let mut problems = Vec::new();
    if config::BOT_TOKEN.is_empty() {
        problems.push("BOT_TOKEN (or DISCORD_TOKEN) is not set".to_string());
    }
    if config::STORAGE_BACKEND.parse::<StorageBackend>().is_err() {
        problems.push(format!("STORAGE_BACKEND {:?} is not one of: s3, memory", config::STORAGE_BACKEND.as_str()));
    }

    log::info!("Command prefix: {:?}", config::COMMAND_PREFIX.as_str());
    log::info!("Scratch directory: {}", config::TEMP_FILES_DIR.as_str());
    log::info!("Extra owners from OWNER_IDS: {}", config::owners::OWNER_IDS.len());

    if problems.is_empty() {
        log::info!("Configuration OK");
        Ok(())
    } else {
        for problem in &problems {
            log::error!("{}", problem);
        }
        Err(anyhow::anyhow!("{} configuration problem(s) found", problems.len()))
    }
}

async fn run_bot() -> Result<()> {
    log::info!("Starting bot...");
    log_storage_configuration();

    if config::BOT_TOKEN.is_empty() {
        return Err(anyhow::anyhow!("BOT_TOKEN environment variable not set"));
    }

    let store = create_store().await.context("Failed to create storage backend")?;
    log::info!("Storage backend ready: {}", store.backend());

    let pipeline = UploadPipeline::new(store, http_client().context("Failed to build HTTP client")?);
    let dispatcher = Dispatcher::new(Session::from_env().shared(), pipeline, DispatcherSettings::from_env());
    let deps = HandlerDeps::new(dispatcher, config::owners::OWNER_IDS.iter().copied());

    let mut client = discord::create_client(&config::BOT_TOKEN, deps).await?;

    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            log::info!("Received Ctrl+C, shutting down");
            shard_manager.shutdown_all().await;
        }
    });

    client
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("Discord client error: {}", e))
}
