//! Discord gateway adapter built on serenity.
//!
//! [`DiscordMessage`] and [`DiscordReply`] implement the chat contract over
//! the Discord HTTP API; [`Handler`] forwards incoming messages to a
//! [`MediaBot`].

use crate::chat::{ChatMessage, Embed, Reply, StatusReply};
use crate::error::DeliveryError;
use crate::orchestrator::MediaBot;
use async_trait::async_trait;
use serenity::all::{
    Context, CreateAllowedMentions, CreateAttachment, CreateEmbed, CreateMessage, EditAttachments,
    EditMessage, EventHandler, GatewayIntents, Http, Message, Ready, UserId,
};
use std::path::Path;
use std::sync::{Arc, OnceLock};

/// Intents the bot needs: guild and direct messages with their content
pub fn intents() -> GatewayIntents {
    GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT
}

fn to_discord_embed(embed: &Embed) -> CreateEmbed {
    let mut built = CreateEmbed::new()
        .title(&embed.title)
        .colour(embed.color.rgb());
    if let Some(description) = &embed.description {
        built = built.description(description);
    }
    if let Some(url) = &embed.thumbnail_url {
        built = built.thumbnail(url);
    }
    built
}

async fn load_attachment(path: &Path) -> Result<CreateAttachment, DeliveryError> {
    CreateAttachment::path(path)
        .await
        .map_err(|e| DeliveryError::Attachment {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

/// An incoming Discord message
pub struct DiscordMessage {
    http: Arc<Http>,
    message: Message,
    author_display_name: String,
}

impl DiscordMessage {
    /// Wrap `message` for replies over `http`
    pub fn new(http: Arc<Http>, message: Message) -> Self {
        let author_display_name = message.author.display_name().to_string();
        Self {
            http,
            message,
            author_display_name,
        }
    }
}

#[async_trait]
impl ChatMessage for DiscordMessage {
    fn content(&self) -> &str {
        &self.message.content
    }

    fn author_display_name(&self) -> &str {
        &self.author_display_name
    }

    async fn reply(&self, reply: Reply) -> Result<Box<dyn StatusReply>, DeliveryError> {
        let mut builder = CreateMessage::new()
            .reference_message(&self.message)
            .allowed_mentions(CreateAllowedMentions::new().replied_user(false));
        if let Some(content) = &reply.content {
            builder = builder.content(content);
        }
        if let Some(embed) = &reply.embed {
            builder = builder.embed(to_discord_embed(embed));
        }
        if let Some(path) = &reply.attachment {
            builder = builder.add_file(load_attachment(path).await?);
        }

        let sent = self
            .message
            .channel_id
            .send_message(&self.http, builder)
            .await
            .map_err(|e| match &reply.attachment {
                Some(path) => DeliveryError::Attachment {
                    path: path.clone(),
                    reason: e.to_string(),
                },
                None => DeliveryError::Send(e.to_string()),
            })?;

        Ok(Box::new(DiscordReply {
            http: Arc::clone(&self.http),
            message: sent,
        }))
    }
}

/// A reply the bot posted on Discord
pub struct DiscordReply {
    http: Arc<Http>,
    message: Message,
}

#[async_trait]
impl StatusReply for DiscordReply {
    async fn edit(&mut self, reply: Reply) -> Result<(), DeliveryError> {
        let mut builder = EditMessage::new();
        if let Some(content) = &reply.content {
            builder = builder.content(content);
        }
        if let Some(embed) = &reply.embed {
            builder = builder.embed(to_discord_embed(embed));
        }
        if let Some(path) = &reply.attachment {
            builder =
                builder.attachments(EditAttachments::new().add(load_attachment(path).await?));
        }

        self.message
            .edit(&self.http, builder)
            .await
            .map_err(|e| match &reply.attachment {
                Some(path) => DeliveryError::Attachment {
                    path: path.clone(),
                    reason: e.to_string(),
                },
                None => DeliveryError::Edit(e.to_string()),
            })
    }

    async fn delete(self: Box<Self>) -> Result<(), DeliveryError> {
        self.message
            .delete(&self.http)
            .await
            .map_err(|e| DeliveryError::Delete(e.to_string()))
    }
}

/// serenity event handler feeding messages to the bot
pub struct Handler {
    bot: MediaBot,
    own_id: OnceLock<UserId>,
}

impl Handler {
    /// Create a handler for `bot`
    pub fn new(bot: MediaBot) -> Self {
        Self {
            bot,
            own_id: OnceLock::new(),
        }
    }

    fn should_ignore(&self, message: &Message) -> bool {
        message.author.bot || self.own_id.get() == Some(&message.author.id)
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        let _ = self.own_id.set(ready.user.id);
        tracing::info!(user = %ready.user.name, guilds = ready.guilds.len(), "Connected to Discord");
    }

    async fn message(&self, ctx: Context, message: Message) {
        if self.should_ignore(&message) {
            return;
        }

        let bot = self.bot.clone();
        let chat: Arc<dyn ChatMessage> = Arc::new(DiscordMessage::new(ctx.http.clone(), message));
        // Handled off the gateway task so slow downloads never delay other events
        tokio::spawn(async move {
            let reports = bot.handle_message(chat).await;
            if !reports.is_empty() {
                tracing::debug!(tasks = reports.len(), "Message handled");
            }
        });
    }
}
