//! The media fetcher contract

use crate::error::FetchError;
use crate::types::MediaMetadata;
use async_trait::async_trait;
use std::path::Path;

/// Progress callback: `(downloaded_bytes, total_bytes)`, total `None` when unknown
pub type ProgressCallback<'a> = &'a (dyn Fn(u64, Option<u64>) + Send + Sync);

/// Resolves media URLs and downloads them to local files
///
/// Implementations must report links without media as
/// [`FetchError::NoMedia`] so callers can drop them silently.
///
/// # Examples
///
/// ```no_run
/// use native_vids::fetcher::{MediaFetcher, YtDlpFetcher};
/// use std::path::Path;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let fetcher = YtDlpFetcher::from_path().ok_or("yt-dlp not found")?;
///
/// let metadata = fetcher.fetch_metadata("https://v.redd.it/abc123").await?;
/// if metadata.duration_secs.unwrap_or(0.0) < 600.0 {
///     fetcher
///         .download("https://v.redd.it/abc123", Path::new("/tmp/abc.mp4"), &|done: u64, total: Option<u64>| {
///             println!("{done}/{total:?}");
///         })
///         .await?;
/// }
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Look up title, duration and age rating without downloading
    async fn fetch_metadata(&self, url: &str) -> Result<MediaMetadata, FetchError>;

    /// Download the media at `url` to exactly `dest`
    async fn download(
        &self,
        url: &str,
        dest: &Path,
        on_progress: ProgressCallback<'_>,
    ) -> Result<(), FetchError>;

    /// Name of the implementation (for logging)
    fn name(&self) -> &'static str;
}
