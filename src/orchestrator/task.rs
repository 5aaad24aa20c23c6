//! Per-URL task lifecycle.

use super::temp_file::TempFile;
use super::{ClaimedLink, MediaBot};
use crate::chat::{ChatMessage, Embed, Reply, StatusReply};
use crate::error::{Error, FetchError};
use crate::policy::DownloadPolicy;
use crate::progress::ProgressTracker;
use crate::router::{SizeClass, classify_size};
use crate::source::SourceHandler;
use crate::types::{
    DownloadOutcome, Event, MediaMetadata, RejectReason, Status, TaskId, TaskReport,
};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;

/// Status of one task plus the channel its transitions are announced on
struct TaskState {
    id: TaskId,
    status: Status,
    event_tx: broadcast::Sender<Event>,
}

impl TaskState {
    fn new(id: TaskId, event_tx: broadcast::Sender<Event>) -> Self {
        Self {
            id,
            status: Status::Created,
            event_tx,
        }
    }

    fn transition(&mut self, next: Status) {
        if !self.status.can_transition_to(next) {
            tracing::warn!(task_id = %self.id, from = %self.status, to = %next, "Unexpected status transition");
        }
        tracing::debug!(task_id = %self.id, from = %self.status, to = %next, "Task status changed");
        self.status = next;
        self.event_tx
            .send(Event::StateChanged {
                task_id: self.id,
                status: next,
            })
            .ok();
    }
}

/// Everything a task borrows while producing its outcome
struct TaskContext<'a> {
    source: &'a SourceHandler,
    url: &'a str,
    message: &'a dyn ChatMessage,
    state: TaskState,
    temp: TempFile,
    status_reply: Option<Box<dyn StatusReply>>,
}

impl MediaBot {
    /// Run one claimed link to completion
    ///
    /// Phases:
    /// 1. Wait for a download slot
    /// 2. Fetch metadata and apply the download policy
    /// 3. Post a status reply and download with live progress
    /// 4. Classify the file by size
    /// 5. Route the outcome, then remove the temporary file
    ///
    /// Never returns an error: every failure becomes a routed outcome.
    pub(crate) async fn run_task(&self, link: ClaimedLink, message: Arc<dyn ChatMessage>) -> TaskReport {
        let source = &self.sources[link.handler];
        let task_id = TaskId::new();
        let temp_path = self
            .config
            .temp_dir()
            .join(source.name())
            .join(format!("{}.mp4", task_id.file_stem()));

        self.event_tx
            .send(Event::TaskStarted {
                task_id,
                source: source.name().to_string(),
                url: link.url.clone(),
            })
            .ok();
        tracing::info!(task_id = %task_id, source = source.name(), url = %link.url, "Task started");

        let mut ctx = TaskContext {
            source,
            url: &link.url,
            message: message.as_ref(),
            state: TaskState::new(task_id, self.event_tx.clone()),
            temp: TempFile::new(temp_path),
            status_reply: None,
        };

        // Held through delivery so a slot covers the task's whole disk footprint
        let permit = self.concurrent_limit.acquire().await;

        let outcome = match &permit {
            Ok(_) => match self.produce_outcome(&mut ctx).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!(task_id = %task_id, url = %link.url, error = %e, "Task failed");
                    ctx.state.transition(Status::Failed);
                    ctx.temp.remove().await;
                    DownloadOutcome::Failed {
                        error: e.to_string(),
                        source_url: link.url.clone(),
                    }
                }
            },
            Err(_) => {
                ctx.state.transition(Status::Failed);
                DownloadOutcome::Failed {
                    error: "the bot is shutting down".to_string(),
                    source_url: link.url.clone(),
                }
            }
        };

        let delivery = self
            .router
            .route(&outcome, source, ctx.message, ctx.status_reply.take())
            .await;

        ctx.temp.remove().await;
        drop(permit);

        tracing::info!(
            task_id = %task_id,
            url = %link.url,
            status = %ctx.state.status,
            delivery = ?delivery,
            "Task finished"
        );
        self.event_tx
            .send(Event::TaskFinished {
                task_id,
                delivery: delivery.clone(),
            })
            .ok();

        let status = ctx.state.status;
        TaskReport {
            task_id,
            source: source.name().to_string(),
            url: link.url,
            status,
            delivery,
        }
    }

    /// Metadata, policy, download and size classification
    ///
    /// Expected refusals come back as `Ok(Rejected)`; `Err` means an
    /// unexpected failure.
    async fn produce_outcome(&self, ctx: &mut TaskContext<'_>) -> Result<DownloadOutcome, Error> {
        let url = ctx.url;
        let rejected = |reason| DownloadOutcome::Rejected {
            reason,
            source_url: url.to_string(),
        };

        ctx.state.transition(Status::FetchingMetadata);
        let metadata = match self.fetcher.fetch_metadata(ctx.url).await {
            Ok(metadata) => metadata,
            Err(FetchError::NoMedia(detail)) => {
                tracing::debug!(url = %ctx.url, detail = %detail, "No media at link");
                ctx.state.transition(Status::Rejected);
                return Ok(rejected(RejectReason::NoMedia));
            }
            Err(e) => return Err(e.into()),
        };

        let policy = DownloadPolicy::new(self.config.limits.max_duration, ctx.source.policy());
        if let Err(reason) = policy.evaluate(&metadata) {
            tracing::info!(
                url = %ctx.url,
                title = %metadata.title,
                duration = ?metadata.duration_secs,
                age_limit = metadata.age_limit,
                %reason,
                "Download policy refused video"
            );
            ctx.state.transition(Status::PolicyDenied);
            ctx.state.transition(Status::Rejected);
            return Ok(rejected(reason));
        }

        ctx.state.transition(Status::Downloading);
        if let Some(dir) = ctx.temp.path().parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        self.download(ctx, &metadata).await?;
        ctx.state.transition(Status::Downloaded);

        let size_bytes = tokio::fs::metadata(ctx.temp.path()).await?.len();
        match classify_size(size_bytes, &self.config.limits) {
            SizeClass::TooLarge => {
                tracing::info!(url = %ctx.url, size_bytes, "Downloaded file exceeds hosting ceiling");
                ctx.temp.remove().await;
                ctx.state.transition(Status::Rejected);
                return Ok(rejected(RejectReason::TooLarge));
            }
            SizeClass::Inline => ctx.state.transition(Status::InlineReady),
            SizeClass::Host => ctx.state.transition(Status::HostReady),
        }

        Ok(DownloadOutcome::Success {
            path: ctx.temp.path().to_path_buf(),
            size_bytes,
            source_url: ctx.url.to_string(),
            title: metadata.title,
            author_display_name: ctx.message.author_display_name().to_string(),
        })
    }

    /// Download to the temp path, editing the status reply as progress arrives
    ///
    /// Edits happen at most once per `progress_interval` and only when the
    /// fraction has moved. Status reply failures are logged and never abort
    /// the download, and a slow edit never stalls it.
    async fn download(
        &self,
        ctx: &mut TaskContext<'_>,
        metadata: &MediaMetadata,
    ) -> Result<(), FetchError> {
        let display_name = ctx.source.display_name();
        ctx.status_reply = match ctx
            .message
            .reply(Reply::embed(Embed::downloading(&metadata.title, display_name, 0.0)))
            .await
        {
            Ok(reply) => Some(reply),
            Err(e) => {
                tracing::warn!(url = %ctx.url, error = %e, "Failed to post status reply");
                None
            }
        };

        let tracker = ProgressTracker::new();
        let on_progress = |downloaded: u64, total: Option<u64>| tracker.record(downloaded, total);
        let download = self.fetcher.download(ctx.url, ctx.temp.path(), &on_progress);
        tokio::pin!(download);

        let mut ticker = tokio::time::interval(self.config.fetcher.progress_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker.tick().await;

        let mut shown = 0.0;
        loop {
            tokio::select! {
                result = &mut download => return result,
                _ = ticker.tick() => {
                    let fraction = tracker.fraction();
                    if fraction <= shown {
                        continue;
                    }
                    shown = fraction;

                    self.event_tx
                        .send(Event::Progress {
                            task_id: ctx.state.id,
                            fraction,
                        })
                        .ok();

                    let Some(reply) = ctx.status_reply.as_mut() else {
                        continue;
                    };
                    // The download keeps being polled while the edit is in flight;
                    // an edit still pending when it finishes is dropped
                    let update = Reply::embed(Embed::downloading(&metadata.title, display_name, fraction));
                    tokio::select! {
                        result = &mut download => return result,
                        edited = reply.edit(update) => {
                            if let Err(e) = edited {
                                tracing::warn!(url = %ctx.url, error = %e, "Failed to update progress");
                            }
                        }
                    }
                }
            }
        }
    }
}
