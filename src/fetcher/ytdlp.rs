//! yt-dlp backed media fetcher

use super::parser::{PROGRESS_TEMPLATE, classify_failure, parse_metadata, parse_progress_line};
use super::traits::{MediaFetcher, ProgressCallback};
use crate::config::FetcherConfig;
use crate::error::FetchError;
use crate::types::MediaMetadata;
use async_trait::async_trait;
use std::ffi::OsString;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;

/// Media fetcher that shells out to the `yt-dlp` binary
///
/// # Examples
///
/// ```no_run
/// use native_vids::fetcher::YtDlpFetcher;
/// use std::path::PathBuf;
///
/// // Explicit binary
/// let fetcher = YtDlpFetcher::new(PathBuf::from("/usr/local/bin/yt-dlp"));
///
/// // Or auto-discover from PATH
/// let fetcher = YtDlpFetcher::from_path().expect("yt-dlp not found in PATH");
/// ```
#[derive(Debug, Clone)]
pub struct YtDlpFetcher {
    binary_path: PathBuf,
    cookie_file: Option<PathBuf>,
    format: String,
    timeout: Option<Duration>,
}

impl YtDlpFetcher {
    /// Create a fetcher for an explicit binary with default options
    pub fn new(binary_path: PathBuf) -> Self {
        Self {
            binary_path,
            cookie_file: None,
            format: default_format(8 * 1024 * 1024),
            timeout: None,
        }
    }

    /// Attempt to find yt-dlp in PATH
    pub fn from_path() -> Option<Self> {
        which::which("yt-dlp").ok().map(Self::new)
    }

    /// Build a fetcher from configuration
    ///
    /// `max_inline_upload_bytes` steers the default format towards files that
    /// can be attached directly.
    pub fn from_config(
        config: &FetcherConfig,
        max_inline_upload_bytes: u64,
    ) -> Result<Self, FetchError> {
        let binary_path = match &config.ytdlp_path {
            Some(path) => path.clone(),
            None => which::which("yt-dlp")
                .map_err(|e| FetchError::ToolNotFound(format!("yt-dlp not found in PATH: {e}")))?,
        };

        Ok(Self {
            binary_path,
            cookie_file: config.cookie_file.clone(),
            format: config
                .format
                .clone()
                .unwrap_or_else(|| default_format(max_inline_upload_bytes)),
            timeout: config.process_timeout,
        })
    }

    /// Path of the binary in use
    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }

    /// Format selector passed to `-f`
    pub fn format(&self) -> &str {
        &self.format
    }

    fn base_args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["--no-playlist".into(), "--no-warnings".into()];
        if let Some(cookies) = &self.cookie_file {
            args.push("--cookies".into());
            args.push(cookies.into());
        }
        args
    }

    fn metadata_args(&self, url: &str) -> Vec<OsString> {
        let mut args = self.base_args();
        args.push("--dump-single-json".into());
        args.push("--skip-download".into());
        args.push(url.into());
        args
    }

    fn download_args(&self, url: &str, dest: &Path) -> Vec<OsString> {
        let mut args = self.base_args();
        args.extend([
            "-f".into(),
            self.format.clone().into(),
            "--merge-output-format".into(),
            "mp4".into(),
            "--newline".into(),
            "--progress-template".into(),
            PROGRESS_TEMPLATE.into(),
            "-o".into(),
            dest.into(),
            url.into(),
        ]);
        args
    }
}

/// Prefer streams that fit under the inline limit, else take the best available
pub fn default_format(max_inline_upload_bytes: u64) -> String {
    format!(
        "bv*[filesize<{max}]+ba/b[filesize<{max}]/bv*+ba/b",
        max = max_inline_upload_bytes
    )
}

async fn with_timeout<T>(
    timeout: Option<Duration>,
    fut: impl Future<Output = Result<T, FetchError>>,
) -> Result<T, FetchError> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| FetchError::Timeout(limit))?,
        None => fut.await,
    }
}

#[async_trait]
impl MediaFetcher for YtDlpFetcher {
    async fn fetch_metadata(&self, url: &str) -> Result<MediaMetadata, FetchError> {
        let args = self.metadata_args(url);
        tracing::debug!(binary = ?self.binary_path, ?args, "Running yt-dlp metadata lookup");

        let output = with_timeout(self.timeout, async {
            Command::new(&self.binary_path)
                .args(&args)
                .stdin(Stdio::null())
                .kill_on_drop(true)
                .output()
                .await
                .map_err(FetchError::from)
        })
        .await?;

        if !output.status.success() {
            return Err(classify_failure(output.status.code(), &output.stderr));
        }

        parse_metadata(&output.stdout)
    }

    async fn download(
        &self,
        url: &str,
        dest: &Path,
        on_progress: ProgressCallback<'_>,
    ) -> Result<(), FetchError> {
        let args = self.download_args(url, dest);
        tracing::debug!(binary = ?self.binary_path, ?args, "Running yt-dlp download");

        with_timeout(self.timeout, async {
            let mut child = Command::new(&self.binary_path)
                .args(&args)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true)
                .spawn()?;

            let stdout = child
                .stdout
                .take()
                .ok_or_else(|| FetchError::Parse("yt-dlp stdout was not captured".into()))?;
            let stderr = child
                .stderr
                .take()
                .ok_or_else(|| FetchError::Parse("yt-dlp stderr was not captured".into()))?;

            // Drain stderr concurrently so a chatty process cannot block on a full pipe
            let stderr_reader = tokio::spawn(async move {
                let mut buf = Vec::new();
                let _ = BufReader::new(stderr).read_to_end(&mut buf).await;
                buf
            });

            let mut lines = BufReader::new(stdout).lines();
            while let Some(line) = lines.next_line().await? {
                match parse_progress_line(&line) {
                    Some((downloaded, total)) => on_progress(downloaded, total),
                    None => tracing::trace!(line = %line, "Yt-dlp output"),
                }
            }

            let status = child.wait().await?;
            let stderr = stderr_reader.await.unwrap_or_default();

            if !status.success() {
                return Err(classify_failure(status.code(), &stderr));
            }
            Ok::<(), FetchError>(())
        })
        .await
    }

    fn name(&self) -> &'static str {
        "yt-dlp"
    }
}
