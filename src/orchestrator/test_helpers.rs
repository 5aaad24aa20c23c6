//! Shared in-memory doubles for the fetcher and the chat gateway.

use crate::chat::{ChatMessage, Reply, StatusReply};
use crate::config::Config;
use crate::error::{DeliveryError, FetchError};
use crate::fetcher::{MediaFetcher, ProgressCallback};
use crate::orchestrator::MediaBot;
use crate::types::MediaMetadata;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

/// How the fake fetcher answers for one URL
#[derive(Clone, Debug)]
pub(crate) enum Scripted {
    /// Metadata lookup reports no media
    NoMedia,
    /// Metadata lookup fails unexpectedly
    MetadataError(String),
    /// Metadata succeeds, download fails after `delay`
    DownloadError {
        metadata: MediaMetadata,
        delay: Duration,
        error: String,
    },
    /// Metadata succeeds, download writes `size` bytes after `delay`
    Video {
        metadata: MediaMetadata,
        size: u64,
        delay: Duration,
    },
}

impl Scripted {
    /// A short video of `size` bytes that downloads instantly
    pub(crate) fn video(title: &str, duration_secs: f64, size: u64) -> Self {
        Scripted::Video {
            metadata: MediaMetadata {
                title: title.to_string(),
                duration_secs: Some(duration_secs),
                age_limit: 0,
            },
            size,
            delay: Duration::ZERO,
        }
    }
}

/// Media fetcher driven by per-URL scripts
#[derive(Default)]
pub(crate) struct FakeFetcher {
    scripts: HashMap<String, Scripted>,
    downloads: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl FakeFetcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with(mut self, url: &str, script: Scripted) -> Self {
        self.scripts.insert(url.to_string(), script);
        self
    }

    /// URLs `download` was called for, in call order
    pub(crate) fn downloads(&self) -> Vec<String> {
        self.downloads.lock().unwrap().clone()
    }

    /// Highest number of concurrent downloads seen
    pub(crate) fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn script(&self, url: &str) -> Scripted {
        self.scripts.get(url).cloned().unwrap_or(Scripted::NoMedia)
    }
}

#[async_trait]
impl MediaFetcher for FakeFetcher {
    async fn fetch_metadata(&self, url: &str) -> Result<MediaMetadata, FetchError> {
        match self.script(url) {
            Scripted::NoMedia => Err(FetchError::NoMedia(format!("ERROR: {url}: No media found"))),
            Scripted::MetadataError(error) => Err(FetchError::Execution {
                code: Some(1),
                stderr: error,
            }),
            Scripted::DownloadError { metadata, .. } | Scripted::Video { metadata, .. } => {
                Ok(metadata)
            }
        }
    }

    async fn download(
        &self,
        url: &str,
        dest: &Path,
        on_progress: ProgressCallback<'_>,
    ) -> Result<(), FetchError> {
        self.downloads.lock().unwrap().push(url.to_string());
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(running, Ordering::SeqCst);

        let result = match self.script(url) {
            Scripted::Video { size, delay, .. } => {
                // Partial file first so cleanup is observable mid-download
                tokio::fs::write(dest, b"partial").await?;
                on_progress(size / 2, Some(size));
                tokio::time::sleep(delay).await;
                let file = tokio::fs::File::create(dest).await?;
                file.set_len(size).await?;
                on_progress(size, Some(size));
                Ok(())
            }
            Scripted::DownloadError { delay, error, .. } => {
                tokio::fs::write(dest, b"partial").await?;
                tokio::time::sleep(delay).await;
                Err(FetchError::Execution {
                    code: Some(1),
                    stderr: error,
                })
            }
            other => panic!("download called for {url} scripted as {other:?}"),
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// One observable chat-side effect
#[derive(Clone, Debug)]
pub(crate) enum ChatOp {
    Sent {
        reply_id: usize,
        reply: Reply,
        attachment_existed: bool,
    },
    Edited {
        reply_id: usize,
        reply: Reply,
        attachment_existed: bool,
    },
    Deleted {
        reply_id: usize,
    },
}

#[derive(Default)]
struct ChatLog {
    ops: Mutex<Vec<ChatOp>>,
    next_id: AtomicUsize,
    fail_attachments: AtomicBool,
    fail_sends: AtomicBool,
    fail_progress_edits: AtomicBool,
    progress_edit_delay: Mutex<Duration>,
}

impl ChatLog {
    fn check_attachment(&self, reply: &Reply) -> Result<bool, DeliveryError> {
        let Some(path) = &reply.attachment else {
            return Ok(false);
        };
        if self.fail_attachments.load(Ordering::SeqCst) {
            return Err(DeliveryError::Attachment {
                path: path.clone(),
                reason: "request entity too large".into(),
            });
        }
        Ok(path.exists())
    }
}

/// Whether `reply` is a mid-download status update
pub(crate) fn is_progress_update(reply: &Reply) -> bool {
    reply.attachment.is_none()
        && reply
            .embed
            .as_ref()
            .is_some_and(|e| e.title.starts_with("Downloading "))
}

/// Incoming message that records every reply, edit and delete
#[derive(Clone)]
pub(crate) struct RecordingMessage {
    content: String,
    author: String,
    log: Arc<ChatLog>,
}

impl RecordingMessage {
    pub(crate) fn new(content: &str, author: &str) -> Self {
        Self {
            content: content.to_string(),
            author: author.to_string(),
            log: Arc::new(ChatLog::default()),
        }
    }

    /// A status reply that already exists, without recording a send
    pub(crate) fn status_reply(&self) -> Box<dyn StatusReply> {
        Box::new(RecordingReply {
            id: self.log.next_id.fetch_add(1, Ordering::SeqCst),
            log: Arc::clone(&self.log),
        })
    }

    pub(crate) fn ops(&self) -> Vec<ChatOp> {
        self.log.ops.lock().unwrap().clone()
    }

    /// Make every reply or edit carrying a file fail
    pub(crate) fn fail_attachments(&self) {
        self.log.fail_attachments.store(true, Ordering::SeqCst);
    }

    /// Make every new reply fail
    pub(crate) fn fail_sends(&self) {
        self.log.fail_sends.store(true, Ordering::SeqCst);
    }

    /// Make every progress edit of a status reply fail
    pub(crate) fn fail_progress_edits(&self) {
        self.log.fail_progress_edits.store(true, Ordering::SeqCst);
    }

    /// Make every progress edit take `delay` before it lands
    pub(crate) fn slow_progress_edits(&self, delay: Duration) {
        *self.log.progress_edit_delay.lock().unwrap() = delay;
    }
}

#[async_trait]
impl ChatMessage for RecordingMessage {
    fn content(&self) -> &str {
        &self.content
    }

    fn author_display_name(&self) -> &str {
        &self.author
    }

    async fn reply(&self, reply: Reply) -> Result<Box<dyn StatusReply>, DeliveryError> {
        if self.log.fail_sends.load(Ordering::SeqCst) {
            return Err(DeliveryError::Send("missing permissions".into()));
        }
        let attachment_existed = self.log.check_attachment(&reply)?;
        let reply_id = self.log.next_id.fetch_add(1, Ordering::SeqCst);
        self.log.ops.lock().unwrap().push(ChatOp::Sent {
            reply_id,
            reply,
            attachment_existed,
        });
        Ok(Box::new(RecordingReply {
            id: reply_id,
            log: Arc::clone(&self.log),
        }))
    }
}

struct RecordingReply {
    id: usize,
    log: Arc<ChatLog>,
}

#[async_trait]
impl StatusReply for RecordingReply {
    async fn edit(&mut self, reply: Reply) -> Result<(), DeliveryError> {
        if is_progress_update(&reply) {
            let delay = *self.log.progress_edit_delay.lock().unwrap();
            tokio::time::sleep(delay).await;
            if self.log.fail_progress_edits.load(Ordering::SeqCst) {
                return Err(DeliveryError::Edit("rate limited".into()));
            }
        }
        let attachment_existed = self.log.check_attachment(&reply)?;
        self.log.ops.lock().unwrap().push(ChatOp::Edited {
            reply_id: self.id,
            reply,
            attachment_existed,
        });
        Ok(())
    }

    async fn delete(self: Box<Self>) -> Result<(), DeliveryError> {
        self.log
            .ops
            .lock()
            .unwrap()
            .push(ChatOp::Deleted { reply_id: self.id });
        Ok(())
    }
}

/// Config rooted in a fresh temp dir with small, fast limits
///
/// Inline below 8 bytes, hosted up to 100 bytes, 10 minute maximum.
pub(crate) fn test_config() -> (Config, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.storage.temp_dir = dir.path().join("tmp");
    config.storage.public_dir = dir.path().join("public");
    config.storage.public_base_url = "http://localhost:8000".into();
    config.limits.max_inline_upload_bytes = 8;
    config.limits.max_hosting_bytes = 100;
    config.limits.max_duration = Duration::from_secs(600);
    config.fetcher.progress_interval = Duration::from_millis(10);
    (config, dir)
}

/// Bot over `fetcher` with [`test_config`]
pub(crate) fn create_test_bot(fetcher: Arc<FakeFetcher>) -> (MediaBot, TempDir) {
    let (config, dir) = test_config();
    let bot = MediaBot::with_fetcher(config, fetcher).unwrap();
    (bot, dir)
}

/// Files left under a directory (recursively), for leak checks
pub(crate) fn files_under(dir: &Path) -> Vec<std::path::PathBuf> {
    let mut found = Vec::new();
    let Ok(entries) = std::fs::read_dir(dir) else {
        return found;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            found.extend(files_under(&path));
        } else {
            found.push(path);
        }
    }
    found
}
