//! Download progress tracking.
//!
//! The fetcher reports byte counts from its own callback while the task
//! reads the fraction to refresh the status reply. The fraction lives in a
//! single atomic so neither side needs a lock.

use std::sync::atomic::{AtomicU64, Ordering};

/// Number of cells in a rendered progress bar
pub const PROGRESS_BAR_CELLS: usize = 20;

/// Monotonic download fraction in `0.0..=1.0`, stored as `f64` bits
#[derive(Debug, Default)]
pub struct ProgressTracker {
    bits: AtomicU64,
}

impl ProgressTracker {
    /// Start at zero
    pub fn new() -> Self {
        Self {
            bits: AtomicU64::new(0f64.to_bits()),
        }
    }

    /// Record a byte count reported by the fetcher
    ///
    /// Ignored when the total is unknown or zero. The stored fraction never
    /// decreases, so a late or out-of-order report cannot move the bar back.
    pub fn record(&self, downloaded_bytes: u64, total_bytes: Option<u64>) {
        let total = match total_bytes {
            Some(total) if total > 0 => total,
            _ => return,
        };
        let fraction = (downloaded_bytes as f64 / total as f64).clamp(0.0, 1.0);

        // fetch_update only fails when the closure returns None
        let _ = self
            .bits
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (fraction > f64::from_bits(current)).then(|| fraction.to_bits())
            });
    }

    /// Current fraction
    pub fn fraction(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Acquire))
    }
}

/// Render a fixed-width text bar such as `[#####---------------]`
pub fn progress_bar(fraction: f64) -> String {
    let filled = ((fraction.clamp(0.0, 1.0) * PROGRESS_BAR_CELLS as f64) as usize)
        .min(PROGRESS_BAR_CELLS);
    format!(
        "[{}{}]",
        "#".repeat(filled),
        "-".repeat(PROGRESS_BAR_CELLS - filled)
    )
}
