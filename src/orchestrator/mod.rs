//! Message orchestration split into focused submodules.
//!
//! The `MediaBot` struct and its methods are organized by concern:
//! - [`task`] - Per-URL lifecycle (metadata, policy, download, delivery, cleanup)
//! - [`lifecycle`] - Shutdown coordination
//! - [`temp_file`] - Scoped temporary file ownership

mod lifecycle;
mod task;
mod temp_file;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

pub use temp_file::TempFile;

use crate::chat::ChatMessage;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::fetcher::{MediaFetcher, YtDlpFetcher};
use crate::hosting::PublicStore;
use crate::router::ResultRouter;
use crate::source::SourceHandler;
use crate::types::{Event, TaskReport};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Semaphore, broadcast};
use tokio::task::JoinSet;

/// Capacity of the event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// A URL claimed by a source handler
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClaimedLink {
    /// Index into the bot's handler list
    pub handler: usize,
    /// The matched URL
    pub url: String,
}

/// Chat media bot (cloneable - all shared state is Arc-wrapped)
#[derive(Clone)]
pub struct MediaBot {
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Enabled source handlers, in claim order
    pub(crate) sources: Arc<Vec<SourceHandler>>,
    /// Metadata lookup and download backend
    pub(crate) fetcher: Arc<dyn MediaFetcher>,
    /// Outcome delivery
    pub(crate) router: Arc<ResultRouter>,
    /// Bounds the number of tasks fetching or downloading at once
    pub(crate) concurrent_limit: Arc<Semaphore>,
    /// Total permits in `concurrent_limit`, reclaimed at shutdown
    pub(crate) download_slots: u32,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: broadcast::Sender<Event>,
    /// Cleared during shutdown so new messages are ignored
    pub(crate) accepting_new: Arc<AtomicBool>,
}

impl MediaBot {
    /// Create a bot backed by yt-dlp
    ///
    /// The yt-dlp binary is taken from configuration or discovered in PATH.
    pub fn new(config: Config) -> Result<Self> {
        let fetcher = YtDlpFetcher::from_config(
            &config.fetcher,
            config.limits.max_inline_upload_bytes,
        )?;
        tracing::info!(binary = ?fetcher.binary_path(), format = fetcher.format(), "Using yt-dlp");
        Self::with_fetcher(config, Arc::new(fetcher))
    }

    /// Create a bot with a custom media fetcher
    pub fn with_fetcher(config: Config, fetcher: Arc<dyn MediaFetcher>) -> Result<Self> {
        config.validate()?;
        let download_slots = u32::try_from(config.limits.max_concurrent_downloads)
            .map_err(|_| Error::config("max_concurrent_downloads", "does not fit in u32"))?;

        let sources = SourceHandler::enabled(&config.sources)?;
        let router = ResultRouter::new(
            PublicStore::from_config(&config.storage),
            config.limits.clone(),
        );
        let (event_tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        tracing::info!(
            sources = ?sources.iter().map(SourceHandler::name).collect::<Vec<_>>(),
            fetcher = fetcher.name(),
            max_concurrent = config.limits.max_concurrent_downloads,
            "Media bot ready"
        );

        Ok(Self {
            concurrent_limit: Arc::new(Semaphore::new(config.limits.max_concurrent_downloads)),
            download_slots,
            config: Arc::new(config),
            sources: Arc::new(sources),
            fetcher,
            router: Arc::new(router),
            event_tx,
            accepting_new: Arc::new(AtomicBool::new(true)),
        })
    }

    /// Subscribe to task lifecycle events
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Enabled source handlers
    pub fn sources(&self) -> &[SourceHandler] {
        &self.sources
    }

    /// Whether new messages are being processed
    pub fn is_accepting(&self) -> bool {
        self.accepting_new.load(Ordering::SeqCst)
    }

    /// Find the links in `text` that some handler claims
    ///
    /// Handlers are consulted in order; the same URL is never claimed twice.
    /// At most `max_urls_per_message` links are returned.
    pub fn claim_links(&self, text: &str) -> Vec<ClaimedLink> {
        let mut claimed: Vec<ClaimedLink> = Vec::new();
        for (handler, source) in self.sources.iter().enumerate() {
            for url in source.extract(text) {
                if claimed.iter().all(|link| link.url != url) {
                    claimed.push(ClaimedLink { handler, url });
                }
            }
        }

        let cap = self.config.limits.max_urls_per_message;
        if claimed.len() > cap {
            tracing::debug!(found = claimed.len(), cap, "Too many links in message, ignoring the rest");
            claimed.truncate(cap);
        }
        claimed
    }

    /// Process every supported link in `message`
    ///
    /// Each link gets an independent task; a slow or failing link never
    /// blocks another. Returns once every task has delivered its result and
    /// removed its temporary file. Messages with no supported link produce
    /// no tasks and no replies.
    pub async fn handle_message(&self, message: Arc<dyn ChatMessage>) -> Vec<TaskReport> {
        if !self.is_accepting() {
            tracing::debug!("Shutting down, ignoring message");
            return Vec::new();
        }

        let links = self.claim_links(message.content());
        if links.is_empty() {
            return Vec::new();
        }

        tracing::info!(
            author = message.author_display_name(),
            links = links.len(),
            "Processing message"
        );

        let mut tasks = JoinSet::new();
        for link in links {
            let bot = self.clone();
            let message = Arc::clone(&message);
            tasks.spawn(async move { bot.run_task(link, message).await });
        }

        let mut reports = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(report) => reports.push(report),
                Err(e) => tracing::error!(error = %e, "Download task panicked"),
            }
        }
        reports
    }
}
