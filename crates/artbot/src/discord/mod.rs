//! Discord integration
//!
//! Owns everything serenity-specific: the client, the event handler, owner
//! resolution and rendering of core replies.

pub mod convert;
pub mod handler;

use anyhow::Result;
use serenity::all::GatewayIntents;
use serenity::Client;
use std::collections::HashSet;
use std::sync::{Arc, OnceLock};
use tokio::sync::RwLock;

use artcore::Dispatcher;

pub use handler::Handler;

/// Gateway intents: guild and DM messages with content, plus the member list
/// for the image-bot scan.
pub fn intents() -> GatewayIntents {
    GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT
        | GatewayIntents::GUILD_MEMBERS
}

/// Dependencies shared by all event callbacks
pub struct HandlerDeps {
    pub dispatcher: Dispatcher,
    /// Resolved once on the first ready event; `None` disables image detection.
    pub image_bot: OnceLock<Option<u64>>,
    owners: RwLock<HashSet<u64>>,
}

impl HandlerDeps {
    pub fn new(dispatcher: Dispatcher, owners: impl IntoIterator<Item = u64>) -> Self {
        Self {
            dispatcher,
            image_bot: OnceLock::new(),
            owners: RwLock::new(owners.into_iter().collect()),
        }
    }

    pub fn image_bot(&self) -> Option<u64> {
        self.image_bot.get().copied().flatten()
    }

    pub async fn is_owner(&self, user_id: u64) -> bool {
        self.owners.read().await.contains(&user_id)
    }

    pub async fn add_owners(&self, ids: impl IntoIterator<Item = u64>) {
        self.owners.write().await.extend(ids);
    }

    pub async fn owner_count(&self) -> usize {
        self.owners.read().await.len()
    }
}

/// Builds the serenity client with the artsaver event handler.
pub async fn create_client(token: &str, deps: HandlerDeps) -> Result<Client> {
    let handler = Handler::new(Arc::new(deps));
    Client::builder(token, intents())
        .event_handler(handler)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create Discord client: {}", e))
}
