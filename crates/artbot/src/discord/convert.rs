//! Conversions between serenity models and artcore values

use artcore::config::limits::{BUTTONS_PER_ROW, MESSAGE_LIMIT};
use artcore::core::utils::split_message;
use artcore::{Attachment, Button, MemberInfo, Post, Reply};
use serenity::all::{
    ButtonStyle, ChannelId, CreateActionRow, CreateAttachment, CreateButton, CreateMessage, Member, Message,
};
use serenity::http::Http;

pub fn to_attachment(attachment: &serenity::all::Attachment) -> Attachment {
    Attachment::new(
        &attachment.url,
        &attachment.filename,
        attachment.content_type.as_deref(),
    )
}

pub fn to_post(msg: &Message) -> Post {
    Post {
        author_id: msg.author.id.get(),
        author_is_bot: msg.author.bot,
        content: msg.content.clone(),
        attachments: msg.attachments.iter().map(to_attachment).collect(),
    }
}

pub fn to_member_info(member: &Member) -> MemberInfo {
    MemberInfo {
        id: member.user.id.get(),
        name: member.user.name.clone(),
        display_name: Some(member.display_name().to_string()),
        is_bot: member.user.bot,
    }
}

/// Buttons laid out in rows of `BUTTONS_PER_ROW`.
pub fn button_rows(buttons: &[Button]) -> Vec<CreateActionRow> {
    buttons
        .chunks(BUTTONS_PER_ROW)
        .map(|row| {
            CreateActionRow::Buttons(
                row.iter()
                    .map(|button| {
                        CreateButton::new(button.action.custom_id())
                            .label(button.label.as_str())
                            .style(ButtonStyle::Primary)
                    })
                    .collect(),
            )
        })
        .collect()
}

/// Sends replies in order. A failed send is logged and the rest still go out.
pub async fn send_replies(http: &Http, channel: ChannelId, replies: Vec<Reply>) {
    for reply in replies {
        if let Err(e) = send_reply(http, channel, reply).await {
            log::error!("Failed to send reply to channel {}: {}", channel, e);
        }
    }
}

async fn send_reply(http: &Http, channel: ChannelId, reply: Reply) -> serenity::Result<()> {
    match reply {
        Reply::Text(text) => {
            for chunk in split_message(&text, MESSAGE_LIMIT) {
                channel.say(http, chunk).await?;
            }
        }
        Reply::File { caption, path, filename } => {
            let mut attachment = CreateAttachment::path(&path).await?;
            attachment.filename = filename;
            channel
                .send_message(http, CreateMessage::new().content(caption).add_file(attachment))
                .await?;
        }
        Reply::Choices { text, buttons } => {
            let mut chunks = split_message(&text, MESSAGE_LIMIT);
            let last = chunks.pop().unwrap_or_default();
            for chunk in chunks {
                channel.say(http, chunk).await?;
            }
            let mut message = CreateMessage::new().content(last);
            if !buttons.is_empty() {
                message = message.components(button_rows(&buttons));
            }
            channel.send_message(http, message).await?;
        }
    }
    Ok(())
}
