//! Test configuration helpers

use super::fake_ytdlp::{KIB, install_fake_ytdlp};
use native_vids::{Config, MediaBot};
use std::time::Duration;
use tempfile::TempDir;

/// Config rooted in `dir`, driving the fake yt-dlp
///
/// Inline below 8 KiB, hosted up to 100 KiB, 10 minute maximum duration.
pub fn test_config(dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.storage.temp_dir = dir.path().join("tmp");
    config.storage.public_dir = dir.path().join("public");
    config.storage.public_base_url = "https://vids.example.com".into();
    config.limits.max_inline_upload_bytes = 8 * KIB;
    config.limits.max_hosting_bytes = 100 * KIB;
    config.limits.max_duration = Duration::from_secs(600);
    config.fetcher.ytdlp_path = Some(install_fake_ytdlp(dir.path()));
    config.fetcher.progress_interval = Duration::from_millis(20);
    config.fetcher.process_timeout = Some(Duration::from_secs(30));
    config
}

/// Bot over the fake yt-dlp with [`test_config`]
pub fn create_test_bot() -> (MediaBot, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let bot = MediaBot::new(test_config(&dir)).unwrap();
    (bot, dir)
}
