//! Download policy: decides from metadata alone whether a video is fetched.
//!
//! Evaluation is pure. Every source shares the duration ceiling; a source may
//! add an age requirement on top through its [`SourcePolicy`].

use crate::types::{MediaMetadata, RejectReason};
use std::time::Duration;

/// Extra per-source rules layered on top of the duration ceiling
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SourcePolicy {
    /// Only accept media rated at least this age (e.g. `Some(18)`)
    pub min_age_limit: Option<u32>,
}

impl SourcePolicy {
    /// No extra rules
    pub const fn open() -> Self {
        Self {
            min_age_limit: None,
        }
    }

    /// Only accept media with `age_limit >= min_age`
    pub const fn age_restricted(min_age: u32) -> Self {
        Self {
            min_age_limit: Some(min_age),
        }
    }
}

/// Policy for a single source, combining the shared ceiling with the source's rules
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DownloadPolicy {
    max_duration: Duration,
    source: SourcePolicy,
}

impl DownloadPolicy {
    /// Create a policy from the deployment's duration ceiling and a source's rules
    pub fn new(max_duration: Duration, source: SourcePolicy) -> Self {
        Self {
            max_duration,
            source,
        }
    }

    /// Check metadata, returning the first rule it breaks
    ///
    /// An unknown duration counts as zero and an unrated video as age 0.
    pub fn evaluate(&self, metadata: &MediaMetadata) -> Result<(), RejectReason> {
        let duration = metadata.duration_secs.unwrap_or(0.0);
        if duration.is_nan() || duration >= self.max_duration.as_secs_f64() {
            return Err(RejectReason::TooLong);
        }

        match self.source.min_age_limit {
            Some(min_age) if metadata.age_limit < min_age => Err(RejectReason::AgeLimitNotMet),
            _ => Ok(()),
        }
    }

    /// Whether the metadata passes every rule
    pub fn accepts(&self, metadata: &MediaMetadata) -> bool {
        self.evaluate(metadata).is_ok()
    }
}
