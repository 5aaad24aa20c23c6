//! Chat gateway contract.
//!
//! The orchestrator only needs an incoming message it can read and reply to,
//! and a handle to the reply it can edit or delete. Platform adapters (see the
//! `discord` module) implement these traits; tests use in-memory doubles.

use crate::error::DeliveryError;
use crate::progress::progress_bar;
use async_trait::async_trait;
use std::path::PathBuf;

/// Animated thumbnail shown while a download is in progress
pub const LOADING_THUMBNAIL_URL: &str = "https://media.tenor.com/qYSjiwLs2zgAAAAj/fries-spin.gif";

/// Embed accent colour
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmbedColor {
    /// In progress
    Info,
    /// Delivered
    Success,
    /// Failed
    Error,
}

impl EmbedColor {
    /// 24-bit RGB value
    pub fn rgb(&self) -> u32 {
        match self {
            EmbedColor::Info => 0x3498DB,
            EmbedColor::Success => 0x2ECC71,
            EmbedColor::Error => 0xE74C3C,
        }
    }
}

/// Rich card attached to a reply
#[derive(Clone, Debug, PartialEq)]
pub struct Embed {
    /// Card title
    pub title: String,
    /// Card body
    pub description: Option<String>,
    /// Accent colour
    pub color: EmbedColor,
    /// Thumbnail image URL
    pub thumbnail_url: Option<String>,
}

impl Embed {
    /// Status card shown while downloading
    pub fn downloading(title: &str, source_display_name: &str, fraction: f64) -> Self {
        Self {
            title: format!("Downloading {title} using {source_display_name}"),
            description: Some(format!("Progress\n{}", progress_bar(fraction))),
            color: EmbedColor::Info,
            thumbnail_url: Some(LOADING_THUMBNAIL_URL.to_string()),
        }
    }

    /// Card accompanying a delivered video
    pub fn posted(title: &str, author_display_name: &str) -> Self {
        Self {
            title: format!("{title} posted by {author_display_name}"),
            description: None,
            color: EmbedColor::Success,
            thumbnail_url: None,
        }
    }

    /// Card replacing the status when something went wrong
    pub fn failure(message: &str) -> Self {
        Self {
            title: "An error occurred".to_string(),
            description: Some(format!(
                "An error occurred while processing the video\n{message}"
            )),
            color: EmbedColor::Error,
            thumbnail_url: None,
        }
    }
}

/// Content of a reply or of an edit to one
///
/// `None` fields are left untouched on edit.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Reply {
    /// Plain text body
    pub content: Option<String>,
    /// Rich card
    pub embed: Option<Embed>,
    /// File to upload with the message
    pub attachment: Option<PathBuf>,
}

impl Reply {
    /// Text-only reply
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    /// Embed-only reply
    pub fn embed(embed: Embed) -> Self {
        Self {
            embed: Some(embed),
            ..Self::default()
        }
    }

    /// Add a text body
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Add a file upload
    pub fn with_attachment(mut self, path: impl Into<PathBuf>) -> Self {
        self.attachment = Some(path.into());
        self
    }
}

/// A message received from the chat platform
#[async_trait]
pub trait ChatMessage: Send + Sync {
    /// Raw message text
    fn content(&self) -> &str;

    /// Name of the author as shown in the channel
    fn author_display_name(&self) -> &str;

    /// Reply to this message without pinging the author
    async fn reply(&self, reply: Reply) -> Result<Box<dyn StatusReply>, DeliveryError>;
}

/// A reply the bot sent and may still change
#[async_trait]
pub trait StatusReply: Send + Sync {
    /// Replace parts of the reply
    async fn edit(&mut self, reply: Reply) -> Result<(), DeliveryError>;

    /// Remove the reply
    async fn delete(self: Box<Self>) -> Result<(), DeliveryError>;
}
