//! Shutdown coordination.

use super::MediaBot;
use std::sync::atomic::Ordering;
use std::time::Duration;

impl MediaBot {
    /// Gracefully shut down the bot
    ///
    /// 1. Stops accepting new messages
    /// 2. Waits up to `timeout` for running tasks to deliver and clean up
    /// 3. Closes the download slots so stragglers fail fast
    ///
    /// Returns `true` if every task finished within the timeout.
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        tracing::info!("Initiating graceful shutdown");
        self.accepting_new.store(false, Ordering::SeqCst);

        let all_slots = self.concurrent_limit.acquire_many(self.download_slots);
        let drained = match tokio::time::timeout(timeout, all_slots).await {
            Ok(Ok(_all_slots)) => {
                tracing::info!("All tasks finished");
                true
            }
            Ok(Err(_)) => {
                tracing::debug!("Download slots already closed");
                true
            }
            Err(_) => {
                tracing::warn!(?timeout, "Timeout waiting for tasks, proceeding with shutdown");
                false
            }
        };

        self.concurrent_limit.close();
        tracing::info!("Graceful shutdown complete");
        drained
    }
}
