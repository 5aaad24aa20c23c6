//! # native-vids
//!
//! Chat bot library that watches messages for links to supported video
//! sites and re-posts the media natively.
//!
//! ## How a message is handled
//!
//! 1. Every enabled [`SourceHandler`] extracts the links it recognises
//! 2. Each link becomes an independent task: metadata lookup, policy check,
//!    download with a live progress reply
//! 3. The downloaded file is attached (small), copied to a public directory
//!    and linked (medium), or refused (too large)
//! 4. The temporary file is removed on every path
//!
//! Links without media are dropped silently; refusals and failures replace
//! the progress reply with an error card.
//!
//! ## Quick Start
//!
//! ```no_run
//! use native_vids::{Config, MediaBot};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let bot = MediaBot::new(config)?;
//!
//!     // Subscribe to events
//!     let mut events = bot.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     // Hand incoming chat messages to `bot.handle_message(...)`
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Chat gateway traits and reply building blocks
pub mod chat;
/// Configuration types
pub mod config;
/// Discord adapter
#[cfg(feature = "discord")]
pub mod discord;
/// Error types
pub mod error;
/// Media fetching (yt-dlp)
pub mod fetcher;
/// Public hosting of medium-sized videos
pub mod hosting;
/// Message handling and per-link tasks
pub mod orchestrator;
/// Download policy
pub mod policy;
/// Download progress tracking
pub mod progress;
/// Outcome delivery
pub mod router;
/// Source handlers and link extraction
pub mod source;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use chat::{ChatMessage, Embed, Reply, StatusReply};
pub use config::Config;
pub use error::{DeliveryError, Error, FetchError, Result};
pub use fetcher::{MediaFetcher, YtDlpFetcher};
pub use hosting::PublicStore;
pub use orchestrator::MediaBot;
pub use policy::{DownloadPolicy, SourcePolicy};
pub use source::SourceHandler;
pub use types::{
    Delivery, DownloadOutcome, Event, MediaMetadata, RejectReason, Status, TaskId, TaskReport,
};

/// How long shutdown waits for running tasks
pub const SHUTDOWN_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

/// Resolve once the process is asked to stop (SIGTERM or SIGINT)
#[cfg(unix)]
pub async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration may fail in restricted environments (containers, tests)
    match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => tracing::info!("Received SIGTERM"),
                _ = sigint.recv() => tracing::info!("Received SIGINT"),
            }
        }
        (Ok(mut only), Err(e)) | (Err(e), Ok(mut only)) => {
            tracing::warn!(error = %e, "Could not register both signal handlers, waiting on the other");
            only.recv().await;
            tracing::info!("Received termination signal");
        }
        (Err(e), Err(_)) => {
            tracing::error!(error = %e, "Could not register signal handlers, using ctrl_c fallback");
            tokio::signal::ctrl_c().await.ok();
        }
    }
}

/// Resolve once the process is asked to stop (Ctrl+C)
#[cfg(not(unix))]
pub async fn wait_for_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
    }
}
