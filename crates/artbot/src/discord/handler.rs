use serenity::all::{
    ComponentInteraction, Context, CreateInteractionResponse, EventHandler, GetMessages, GuildId, Interaction,
    Message, Ready, UserId,
};
use serenity::async_trait;
use serenity::http::Http;
use std::sync::Arc;

use artcore::config;
use artcore::listener::{history_error_reply, NO_RECENT_IMAGE, UPLOADING_NOTICE};
use artcore::{find_image_bot, last_image_post, route_post, ButtonAction, Invocation, MemberInfo, Post, PostRoute, Reply};

use super::convert::{send_replies, to_member_info, to_post};
use super::HandlerDeps;

/// Members requested per page during the image-bot scan
const MEMBER_PAGE_SIZE: u64 = 1000;

pub struct Handler {
    deps: Arc<HandlerDeps>,
}

impl Handler {
    pub fn new(deps: Arc<HandlerDeps>) -> Self {
        Self { deps }
    }

    /// Adds the application owner (or every team member) to the owner set.
    async fn resolve_owners(&self, http: &Http) {
        match http.get_current_application_info().await {
            Ok(info) => {
                let mut ids: Vec<u64> = info.owner.iter().map(|owner| owner.id.get()).collect();
                if let Some(team) = &info.team {
                    ids.extend(team.members.iter().map(|member| member.user.id.get()));
                }
                self.deps.add_owners(ids).await;
                log::info!("Owners resolved: {} user(s) may run owner-only commands", self.deps.owner_count().await);
            }
            Err(e) => log::warn!("Failed to fetch application info, owners limited to OWNER_IDS: {}", e),
        }
    }

    /// Scans guilds in order and returns the first image bot found.
    async fn scan_for_image_bot(&self, http: &Http, guilds: &[GuildId]) -> Option<u64> {
        for guild_id in guilds {
            match guild_members(http, *guild_id).await {
                Ok(members) => {
                    if let Some(id) = find_image_bot(&members) {
                        return Some(id);
                    }
                }
                Err(e) => log::warn!("Failed to list members of guild {}: {}", guild_id, e),
            }
        }
        None
    }

    async fn handle_component(&self, ctx: &Context, component: &ComponentInteraction) {
        let Some(action) = ButtonAction::parse(&component.data.custom_id) else {
            log::debug!("Ignoring unknown component {}", component.data.custom_id);
            return;
        };

        if let Err(e) = component
            .create_response(&ctx.http, CreateInteractionResponse::Acknowledge)
            .await
        {
            log::warn!("Failed to acknowledge interaction: {}", e);
        }

        let channel = component.channel_id;
        let replies = match action {
            ButtonAction::UploadLast => {
                let history = channel
                    .messages(
                        &ctx.http,
                        GetMessages::new()
                            .before(component.message.id)
                            .limit(config::listener::HISTORY_SCAN_LIMIT),
                    )
                    .await;

                match history {
                    Ok(history) => {
                        let own_id = ctx.cache.current_user().id;
                        let posts: Vec<Post> = history
                            .iter()
                            .filter(|msg| msg.author.id != own_id)
                            .map(to_post)
                            .collect();

                        match last_image_post(&posts) {
                            Some(post) => {
                                send_replies(&ctx.http, channel, vec![Reply::text(UPLOADING_NOTICE)]).await;
                                self.deps.dispatcher.upload_last_image(post).await
                            }
                            None => vec![Reply::text(NO_RECENT_IMAGE)],
                        }
                    }
                    Err(e) => {
                        log::error!("Failed to read history of channel {}: {}", channel, e);
                        vec![history_error_reply(&e)]
                    }
                }
            }
            ButtonAction::FetchImage { key } => self.deps.dispatcher.on_fetch_button(&key).await,
        };

        send_replies(&ctx.http, channel, replies).await;
    }
}

/// Every member of a guild, following the pagination cursor.
async fn guild_members(http: &Http, guild_id: GuildId) -> serenity::Result<Vec<MemberInfo>> {
    let mut members = Vec::new();
    let mut after: Option<UserId> = None;

    loop {
        let page = guild_id.members(http, Some(MEMBER_PAGE_SIZE), after).await?;
        let page_len = page.len();
        after = page.last().map(|member| member.user.id);
        members.extend(page.iter().map(to_member_info));

        if (page_len as u64) < MEMBER_PAGE_SIZE {
            break;
        }
    }

    Ok(members)
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        log::info!("{} has connected to Discord ({} guilds)", ready.user.name, ready.guilds.len());

        self.resolve_owners(&ctx.http).await;

        // Only the first ready event resolves the image bot
        if self.deps.image_bot.get().is_none() {
            let guilds: Vec<GuildId> = ready.guilds.iter().map(|guild| guild.id).collect();
            let found = self.scan_for_image_bot(&ctx.http, &guilds).await;
            match found {
                Some(id) => log::info!("Image bot found: {}", id),
                None => log::warn!("No image bot found; image detection stays off until restart"),
            }
            if self.deps.image_bot.set(found).is_err() {
                log::debug!("Image bot already resolved by a concurrent ready event");
            }
        }
    }

    async fn message(&self, ctx: Context, msg: Message) {
        let own_id = ctx.cache.current_user().id;
        if msg.author.id == own_id {
            return;
        }

        let post = to_post(&msg);
        let replies = match route_post(&post, self.deps.image_bot()) {
            PostRoute::ImagePost => Some(self.deps.dispatcher.on_image_post(&post).await),
            PostRoute::Command => {
                let invocation = Invocation::new(self.deps.is_owner(post.author_id).await)
                    .with_attachments(post.attachments.clone());
                self.deps.dispatcher.handle_text(&post.content, &invocation).await
            }
            PostRoute::Ignore => None,
        };

        if let Some(replies) = replies {
            send_replies(&ctx.http, msg.channel_id, replies).await;
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        if let Interaction::Component(component) = interaction {
            self.handle_component(&ctx, &component).await;
        }
    }
}
