//! Core types for native-vids

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Unique identifier for a download task
///
/// Also used as the temporary file stem, so it is filesystem safe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub uuid::Uuid);

impl TaskId {
    /// Create a new random TaskId
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Hyphen-free representation used for file names
    pub fn file_stem(&self) -> String {
        self.0.simple().to_string()
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// Download task status
///
/// ```text
/// Created -> FetchingMetadata -> Rejected
///                             -> PolicyDenied -> Rejected
///                             -> Downloading -> Downloaded -> InlineReady | HostReady | Rejected
///                                            -> Failed
/// ```
///
/// `FetchingMetadata` and `Downloaded` may also move to `Failed` on unexpected errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Task created, temporary path allocated
    Created,
    /// Waiting on metadata from the fetcher
    FetchingMetadata,
    /// Metadata failed the download policy
    PolicyDenied,
    /// Download in progress
    Downloading,
    /// File on disk, size not yet classified
    Downloaded,
    /// Small enough to attach inline
    InlineReady,
    /// Too large to attach, small enough to host
    HostReady,
    /// Expected refusal (no media, too long, too large, age limit)
    Rejected,
    /// Unexpected error
    Failed,
}

impl Status {
    /// Whether the task has reached an end state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Status::InlineReady | Status::HostReady | Status::Rejected | Status::Failed
        )
    }

    /// Whether `next` is a legal successor of `self`
    pub fn can_transition_to(&self, next: Status) -> bool {
        use Status::*;
        matches!(
            (self, next),
            (Created, FetchingMetadata)
                | (Created, Failed)
                | (FetchingMetadata, Rejected)
                | (FetchingMetadata, PolicyDenied)
                | (FetchingMetadata, Downloading)
                | (FetchingMetadata, Failed)
                | (PolicyDenied, Rejected)
                | (Downloading, Downloaded)
                | (Downloading, Failed)
                | (Downloaded, InlineReady)
                | (Downloaded, HostReady)
                | (Downloaded, Rejected)
                | (Downloaded, Failed)
        )
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Status::Created => "created",
            Status::FetchingMetadata => "fetching_metadata",
            Status::PolicyDenied => "policy_denied",
            Status::Downloading => "downloading",
            Status::Downloaded => "downloaded",
            Status::InlineReady => "inline_ready",
            Status::HostReady => "host_ready",
            Status::Rejected => "rejected",
            Status::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Why a task was refused without an unexpected error
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// The link carries no downloadable media
    NoMedia,
    /// Duration at or above the configured maximum
    TooLong,
    /// Downloaded file exceeds the hosting ceiling
    TooLarge,
    /// The source only accepts adult-rated media and this one is not
    AgeLimitNotMet,
}

impl RejectReason {
    /// Whether this rejection is dropped without telling the user
    pub fn is_silent(&self) -> bool {
        matches!(self, RejectReason::NoMedia)
    }

    /// Human-readable explanation shown in the failure reply
    pub fn describe(&self) -> &'static str {
        match self {
            RejectReason::NoMedia => "No media found",
            RejectReason::TooLong => "The video is too long",
            RejectReason::TooLarge => "The video is too large",
            RejectReason::AgeLimitNotMet => "This source only downloads age-restricted videos",
        }
    }
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.describe())
    }
}

/// Metadata reported by the media fetcher before any download
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaMetadata {
    /// Video title
    pub title: String,
    /// Duration in seconds, if the extractor knows it
    #[serde(default)]
    pub duration_secs: Option<f64>,
    /// Minimum viewer age (0 when unrated)
    #[serde(default)]
    pub age_limit: u32,
}

/// Tagged result of a finished task, handed to the result router
#[derive(Clone, Debug, PartialEq)]
pub enum DownloadOutcome {
    /// A file is on disk and within the hosting ceiling
    Success {
        /// Temporary file holding the video
        path: PathBuf,
        /// File size in bytes
        size_bytes: u64,
        /// The URL the video came from
        source_url: String,
        /// Video title
        title: String,
        /// Display name of the message author
        author_display_name: String,
    },
    /// Expected refusal
    Rejected {
        /// Why
        reason: RejectReason,
        /// The URL that was refused
        source_url: String,
    },
    /// Unexpected error
    Failed {
        /// Error description
        error: String,
        /// The URL that failed
        source_url: String,
    },
}

impl DownloadOutcome {
    /// The URL this outcome belongs to
    pub fn source_url(&self) -> &str {
        match self {
            DownloadOutcome::Success { source_url, .. }
            | DownloadOutcome::Rejected { source_url, .. }
            | DownloadOutcome::Failed { source_url, .. } => source_url,
        }
    }
}

/// What the result router did with an outcome
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Delivery {
    /// File attached to a reply
    Inline,
    /// File copied to the public directory and linked
    Hosted {
        /// Public URL of the copy
        url: String,
    },
    /// Failure or rejection reported to the user
    Reported {
        /// Text shown to the user
        message: String,
    },
    /// Dropped without a reply (no media)
    Silent,
    /// The chat gateway refused the delivery
    Undelivered {
        /// Delivery error description
        error: String,
    },
}

/// Summary of one task, returned from [`MediaBot::handle_message`](crate::MediaBot::handle_message)
#[derive(Clone, Debug, PartialEq)]
pub struct TaskReport {
    /// Task identifier
    pub task_id: TaskId,
    /// Source handler name
    pub source: String,
    /// URL the task worked on
    pub url: String,
    /// Final state
    pub status: Status,
    /// How the outcome was delivered
    pub delivery: Delivery,
}

/// Event emitted during a task's lifecycle
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A URL was claimed by a source handler
    TaskStarted {
        /// Task ID
        task_id: TaskId,
        /// Source handler name
        source: String,
        /// URL being processed
        url: String,
    },

    /// The task moved to a new state
    StateChanged {
        /// Task ID
        task_id: TaskId,
        /// New state
        status: Status,
    },

    /// Download progress update
    Progress {
        /// Task ID
        task_id: TaskId,
        /// Fraction downloaded (0.0 to 1.0)
        fraction: f64,
    },

    /// The task finished and its temporary file is gone
    TaskFinished {
        /// Task ID
        task_id: TaskId,
        /// How the outcome was delivered
        delivery: Delivery,
    },
}
