//! Media fetching
//!
//! The orchestrator talks to a [`MediaFetcher`] and never to yt-dlp directly:
//!
//! - [`YtDlpFetcher`]: production implementation driving the `yt-dlp` binary
//!
//! Any implementation that reports missing media as
//! [`FetchError::NoMedia`](crate::error::FetchError::NoMedia) can be swapped in.

mod parser;
mod traits;
mod ytdlp;

pub use traits::{MediaFetcher, ProgressCallback};
pub use ytdlp::{YtDlpFetcher, default_format};
