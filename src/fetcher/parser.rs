//! Parsers for yt-dlp output

use crate::error::FetchError;
use crate::types::MediaMetadata;
use serde::Deserialize;

/// Prefix emitted by our `--progress-template`
pub(crate) const PROGRESS_PREFIX: &str = "progress:";

/// Template producing `progress:<downloaded>:<total>:<estimate>` lines on stdout
pub(crate) const PROGRESS_TEMPLATE: &str = "download:progress:%(progress.downloaded_bytes)s:%(progress.total_bytes)s:%(progress.total_bytes_estimate)s";

/// stderr fragments meaning "this link has nothing to download"
const NO_MEDIA_MARKERS: &[&str] = &[
    "no media found",
    "no video could be found",
    "there's no video in this",
];

#[derive(Debug, Deserialize)]
struct RawInfo {
    title: Option<String>,
    duration: Option<f64>,
    age_limit: Option<u32>,
}

/// Parse the JSON document printed by `--dump-single-json`
pub(crate) fn parse_metadata(stdout: &[u8]) -> Result<MediaMetadata, FetchError> {
    let raw: RawInfo = serde_json::from_slice(stdout)
        .map_err(|e| FetchError::Parse(format!("invalid metadata JSON: {e}")))?;

    Ok(MediaMetadata {
        title: raw
            .title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| "Untitled video".to_string()),
        duration_secs: raw.duration,
        age_limit: raw.age_limit.unwrap_or(0),
    })
}

/// Parse one stdout line produced by [`PROGRESS_TEMPLATE`]
///
/// Returns `(downloaded, total)` where total falls back to the estimate and is
/// `None` when yt-dlp reports neither. Non-progress lines yield `None`.
pub(crate) fn parse_progress_line(line: &str) -> Option<(u64, Option<u64>)> {
    let rest = line.trim().strip_prefix(PROGRESS_PREFIX)?;
    let mut fields = rest.split(':');

    let downloaded = parse_bytes(fields.next()?)?;
    let total = fields.next().and_then(parse_bytes);
    let estimate = fields.next().and_then(parse_bytes);

    Some((downloaded, total.or(estimate)))
}

fn parse_bytes(field: &str) -> Option<u64> {
    let value: f64 = field.trim().parse().ok()?;
    (value.is_finite() && value >= 0.0).then_some(value as u64)
}

/// Turn a failed yt-dlp run into a [`FetchError`]
pub(crate) fn classify_failure(code: Option<i32>, stderr: &[u8]) -> FetchError {
    let stderr = String::from_utf8_lossy(stderr);
    let summary = last_error_line(&stderr);
    let lower = stderr.to_lowercase();

    if NO_MEDIA_MARKERS.iter().any(|marker| lower.contains(marker)) {
        return FetchError::NoMedia(summary);
    }

    FetchError::Execution {
        code,
        stderr: summary,
    }
}

/// Last `ERROR:` line, or the last non-empty line if there is none
fn last_error_line(stderr: &str) -> String {
    let lines: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    lines
        .iter()
        .rev()
        .find(|l| l.starts_with("ERROR:"))
        .or_else(|| lines.last())
        .map(|l| l.to_string())
        .unwrap_or_else(|| "yt-dlp exited without output".to_string())
}
