//! Result router: turns a task's outcome into exactly one user-visible result.
//!
//! | Outcome | Action |
//! |---|---|
//! | `Success`, below inline limit | attach file to the status reply |
//! | `Success`, up to hosting ceiling | copy to public dir, reply with its URL |
//! | `Rejected{NoMedia}` | nothing |
//! | other `Rejected`, `Failed` | replace the status with a failure card |
//!
//! The router never retries and never deletes the temporary file; the
//! orchestrator does that once routing has finished.

use crate::chat::{ChatMessage, Embed, Reply, StatusReply};
use crate::config::LimitsConfig;
use crate::error::DeliveryError;
use crate::hosting::PublicStore;
use crate::source::SourceHandler;
use crate::types::{Delivery, DownloadOutcome, RejectReason};
use std::path::Path;

/// Where a downloaded file of a given size goes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SizeClass {
    /// Attach directly
    Inline,
    /// Copy to the public directory and link
    Host,
    /// Over the hosting ceiling
    TooLarge,
}

/// Classify a file size against the configured thresholds
pub fn classify_size(size_bytes: u64, limits: &LimitsConfig) -> SizeClass {
    if size_bytes < limits.max_inline_upload_bytes {
        SizeClass::Inline
    } else if size_bytes <= limits.max_hosting_bytes {
        SizeClass::Host
    } else {
        SizeClass::TooLarge
    }
}

/// Delivers outcomes to the chat and the public directory
#[derive(Clone, Debug)]
pub struct ResultRouter {
    store: PublicStore,
    limits: LimitsConfig,
}

impl ResultRouter {
    /// Create a router publishing into `store`
    pub fn new(store: PublicStore, limits: LimitsConfig) -> Self {
        Self { store, limits }
    }

    /// Public store used for hosted videos
    pub fn store(&self) -> &PublicStore {
        &self.store
    }

    /// Deliver `outcome` in reply to `message`
    ///
    /// `status` is the task's "downloading" reply, if one was sent. It is
    /// always edited or deleted here so it never stays stale.
    pub async fn route(
        &self,
        outcome: &DownloadOutcome,
        source: &SourceHandler,
        message: &dyn ChatMessage,
        mut status: Option<Box<dyn StatusReply>>,
    ) -> Delivery {
        match outcome {
            DownloadOutcome::Success {
                path,
                size_bytes,
                source_url,
                title,
                author_display_name,
            } => {
                let posted = Embed::posted(title, author_display_name);
                match classify_size(*size_bytes, &self.limits) {
                    SizeClass::Inline => {
                        tracing::info!(source = source.name(), url = %source_url, bytes = size_bytes, "Sending video inline");
                        let reply = Reply::embed(posted).with_attachment(path.clone());
                        match deliver(message, &mut status, reply).await {
                            Ok(()) => Delivery::Inline,
                            Err(e) => self.undelivered(message, status, source_url, e).await,
                        }
                    }
                    SizeClass::Host => {
                        self.host(path, source, source_url, posted, message, status)
                            .await
                    }
                    SizeClass::TooLarge => {
                        report(message, status, source_url, RejectReason::TooLarge.describe())
                            .await
                    }
                }
            }
            DownloadOutcome::Rejected { reason, source_url } if reason.is_silent() => {
                tracing::debug!(url = %source_url, %reason, "Dropping link without media");
                if let Some(reply) = status
                    && let Err(e) = reply.delete().await
                {
                    tracing::warn!(url = %source_url, error = %e, "Failed to delete status reply");
                }
                Delivery::Silent
            }
            DownloadOutcome::Rejected { reason, source_url } => {
                tracing::info!(url = %source_url, %reason, "Download rejected");
                report(message, status, source_url, reason.describe()).await
            }
            DownloadOutcome::Failed { error, source_url } => {
                tracing::error!(url = %source_url, error = %error, "Download failed");
                report(message, status, source_url, error).await
            }
        }
    }

    async fn host(
        &self,
        path: &Path,
        source: &SourceHandler,
        source_url: &str,
        posted: Embed,
        message: &dyn ChatMessage,
        mut status: Option<Box<dyn StatusReply>>,
    ) -> Delivery {
        let hosted = match self.store.publish(path, source.name()).await {
            Ok(hosted) => hosted,
            Err(e) => {
                tracing::error!(url = %source_url, error = %e, "Failed to publish video");
                return report(
                    message,
                    status,
                    source_url,
                    &format!("Could not host the video: {e}"),
                )
                .await;
            }
        };

        tracing::info!(source = source.name(), url = %source_url, public_url = %hosted.url, "Sending hosted link");
        let reply = Reply::embed(posted).with_content(hosted.url.clone());
        match deliver(message, &mut status, reply).await {
            Ok(()) => Delivery::Hosted { url: hosted.url },
            Err(e) => self.undelivered(message, status, source_url, e).await,
        }
    }

    /// Log a failed delivery and make one attempt to replace the stale status
    async fn undelivered(
        &self,
        message: &dyn ChatMessage,
        mut status: Option<Box<dyn StatusReply>>,
        source_url: &str,
        error: DeliveryError,
    ) -> Delivery {
        tracing::error!(url = %source_url, error = %error, "Failed to deliver video");

        let failure = Reply::embed(Embed::failure(&format!("Could not send the video: {error}")));
        if let Err(e) = deliver(message, &mut status, failure).await {
            tracing::warn!(url = %source_url, error = %e, "Failed to report delivery failure");
        }

        Delivery::Undelivered {
            error: error.to_string(),
        }
    }
}

/// Edit the status reply if there is one, otherwise send a fresh reply
async fn deliver(
    message: &dyn ChatMessage,
    status: &mut Option<Box<dyn StatusReply>>,
    reply: Reply,
) -> Result<(), DeliveryError> {
    match status {
        Some(existing) => existing.edit(reply).await,
        None => message.reply(reply).await.map(|_| ()),
    }
}

/// Show a failure card for `source_url`
async fn report(
    message: &dyn ChatMessage,
    mut status: Option<Box<dyn StatusReply>>,
    source_url: &str,
    text: &str,
) -> Delivery {
    match deliver(message, &mut status, Reply::embed(Embed::failure(text))).await {
        Ok(()) => Delivery::Reported {
            message: text.to_string(),
        },
        Err(e) => {
            tracing::error!(url = %source_url, error = %e, "Failed to report download failure");
            Delivery::Undelivered {
                error: e.to_string(),
            }
        }
    }
}
