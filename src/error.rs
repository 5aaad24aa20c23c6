//! Error types for native-vids
//!
//! Errors are grouped by the collaborator that produced them:
//! - [`FetchError`] for the media fetcher (metadata lookup and download)
//! - [`DeliveryError`] for the chat gateway (reply, edit, delete)
//! - [`Error`] as the crate-level error wrapping both plus configuration and I/O
//!
//! Download tasks never surface these to the message handler. They are
//! converted into a [`DownloadOutcome`](crate::types::DownloadOutcome) at the
//! per-task boundary.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for native-vids operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for native-vids
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "MAX_DURATION")
        key: Option<String>,
    },

    /// Media fetcher error
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Chat delivery error
    #[error("delivery error: {0}")]
    Delivery(#[from] DeliveryError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Static file server error
    #[error("server error: {0}")]
    Server(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Shorthand for a configuration error tied to a specific key
    pub fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }
}

/// Errors reported by a [`MediaFetcher`](crate::fetcher::MediaFetcher)
#[derive(Debug, Error)]
pub enum FetchError {
    /// The URL resolved but carries no downloadable media
    ///
    /// This is the common case for arbitrary links and is dropped silently.
    #[error("no media found: {0}")]
    NoMedia(String),

    /// The extraction tool could not be located
    #[error("tool not found: {0}")]
    ToolNotFound(String),

    /// The extraction tool exited unsuccessfully
    #[error("extraction failed (exit code {code:?}): {stderr}")]
    Execution {
        /// Process exit code, if the process exited normally
        code: Option<i32>,
        /// Last meaningful line(s) of stderr
        stderr: String,
    },

    /// The tool's output could not be understood
    #[error("failed to parse fetcher output: {0}")]
    Parse(String),

    /// The tool did not finish within the configured timeout
    #[error("fetcher timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// I/O error while talking to the tool
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FetchError {
    /// Whether this error is the expected "nothing to download here" condition
    pub fn is_no_media(&self) -> bool {
        matches!(self, FetchError::NoMedia(_))
    }
}

/// Errors reported by the chat gateway when delivering replies
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// Sending a new reply failed
    #[error("failed to send reply: {0}")]
    Send(String),

    /// Editing an existing reply failed
    #[error("failed to edit reply: {0}")]
    Edit(String),

    /// Deleting a reply failed
    #[error("failed to delete reply: {0}")]
    Delete(String),

    /// The file could not be attached
    #[error("failed to attach {}: {reason}", .path.display())]
    Attachment {
        /// File that was being attached
        path: PathBuf,
        /// The reason the attachment failed
        reason: String,
    },
}
