//! Configuration types for native-vids

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::Path, path::PathBuf, str::FromStr, time::Duration};
use tokio::sync::Semaphore;

/// Largest accepted `max_concurrent_downloads`
///
/// Bounded by the semaphore's permit limit and by `u32`, since shutdown
/// reclaims every slot in a single `acquire_many`.
pub const MAX_CONCURRENT_DOWNLOADS: usize = if Semaphore::MAX_PERMITS < u32::MAX as usize {
    Semaphore::MAX_PERMITS
} else {
    u32::MAX as usize
};

/// Download policy limits (duration, sizes, concurrency)
///
/// Groups settings that decide whether and how a video is delivered.
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Videos at or above this duration are never downloaded (default: 15 minutes)
    #[serde(default = "default_max_duration", with = "duration_serde")]
    pub max_duration: Duration,

    /// Files strictly below this size are attached inline (default: 8 MiB)
    #[serde(default = "default_max_inline_upload_bytes")]
    pub max_inline_upload_bytes: u64,

    /// Files above this size are rejected as too large (default: 100 MiB)
    ///
    /// Files between the inline limit and this ceiling are copied to the
    /// public directory and linked instead of uploaded.
    #[serde(default = "default_max_hosting_bytes")]
    pub max_hosting_bytes: u64,

    /// Maximum URLs processed per chat message, across all sources (default: 5)
    #[serde(default = "default_max_urls_per_message")]
    pub max_urls_per_message: usize,

    /// Maximum download tasks running at once across all messages (default: 4)
    ///
    /// Must be between 1 and [`MAX_CONCURRENT_DOWNLOADS`].
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_downloads: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_duration: default_max_duration(),
            max_inline_upload_bytes: default_max_inline_upload_bytes(),
            max_hosting_bytes: default_max_hosting_bytes(),
            max_urls_per_message: default_max_urls_per_message(),
            max_concurrent_downloads: default_max_concurrent(),
        }
    }
}

/// Filesystem locations and the public URL they are served under
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Scratch directory for in-flight downloads (default: "./tmp")
    ///
    /// Each source gets its own subdirectory.
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,

    /// Persistent directory served at `public_base_url` (default: "./public")
    ///
    /// Hosted videos land in `{public_dir}/videos/{source}/`.
    #[serde(default = "default_public_dir")]
    pub public_dir: PathBuf,

    /// Externally reachable base URL of `public_dir` (default: "http://localhost:8000")
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            temp_dir: default_temp_dir(),
            public_dir: default_public_dir(),
            public_base_url: default_public_base_url(),
        }
    }
}

/// yt-dlp invocation settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FetcherConfig {
    /// Path to the yt-dlp executable (auto-detected from PATH if None)
    #[serde(default)]
    pub ytdlp_path: Option<PathBuf>,

    /// Netscape cookie file passed to yt-dlp
    #[serde(default)]
    pub cookie_file: Option<PathBuf>,

    /// Format selector override (default: prefer streams below the inline limit)
    #[serde(default)]
    pub format: Option<String>,

    /// Kill yt-dlp if a single invocation runs longer than this (None = no timeout)
    #[serde(default, with = "optional_duration_serde")]
    pub process_timeout: Option<Duration>,

    /// Minimum interval between progress edits of the status reply (default: 2 seconds)
    #[serde(default = "default_progress_interval", with = "duration_serde")]
    pub progress_interval: Duration,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: None,
            cookie_file: None,
            format: None,
            process_timeout: None,
            progress_interval: default_progress_interval(),
        }
    }
}

/// Embedded static file server for hosted videos
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ServeConfig {
    /// Address to serve `{public_dir}/videos` on (None = served externally)
    #[serde(default)]
    pub bind_address: Option<SocketAddr>,
}

/// Main configuration for [`MediaBot`](crate::MediaBot)
///
/// Limits and storage are flattened so a JSON config file stays flat;
/// fetcher and serve settings are nested objects.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Duration, size and concurrency limits
    #[serde(flatten)]
    pub limits: LimitsConfig,

    /// Temporary and public directories
    #[serde(flatten)]
    pub storage: StorageConfig,

    /// yt-dlp settings
    #[serde(default)]
    pub fetcher: FetcherConfig,

    /// Static file server settings
    #[serde(default)]
    pub serve: ServeConfig,

    /// Enabled source handler names (empty = all built-in sources)
    #[serde(default)]
    pub sources: Vec<String>,

    /// Verbose logging
    #[serde(default)]
    pub debug: bool,

    /// Chat platform credential (never serialized)
    #[serde(default, skip_serializing)]
    pub chat_token: Option<String>,
}

impl Config {
    /// Temporary directory
    pub fn temp_dir(&self) -> &PathBuf {
        &self.storage.temp_dir
    }

    /// Public directory
    pub fn public_dir(&self) -> &PathBuf {
        &self.storage.public_dir
    }

    /// Load a JSON config file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Build a config from the process environment
    ///
    /// If `CONFIG_FILE` is set, that JSON file is the base; individual
    /// variables override it. See [`Config::from_lookup`] for the keys.
    pub fn from_env() -> Result<Self> {
        let base = match std::env::var("CONFIG_FILE") {
            Ok(path) => Self::from_json_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        base.with_overrides(|key| std::env::var(key).ok())
    }

    /// Build a config from defaults plus the given key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Self::default().with_overrides(lookup)
    }

    /// Apply environment-style overrides on top of `self`
    ///
    /// Recognized keys: `DISCORD_TOKEN`, `HOST_URL`, `MAX_UPLOAD_SIZE`,
    /// `MAX_HOSTING_SIZE`, `MAX_DURATION` (seconds), `MAX_CONCURRENT_DOWNLOADS`,
    /// `MAX_URLS_PER_MESSAGE`, `TEMP_DIR`, `PUBLIC_DIR`, `COOKIE_FILE`,
    /// `YTDLP_PATH`, `SERVE_ADDRESS`, `SOURCES` (comma separated), `DEBUG`.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(token) = get("DISCORD_TOKEN") {
            self.chat_token = Some(token);
        }
        if let Some(url) = get("HOST_URL") {
            self.storage.public_base_url = url;
        }
        if let Some(bytes) = parse_key(&get, "MAX_UPLOAD_SIZE")? {
            self.limits.max_inline_upload_bytes = bytes;
        }
        if let Some(bytes) = parse_key(&get, "MAX_HOSTING_SIZE")? {
            self.limits.max_hosting_bytes = bytes;
        }
        if let Some(secs) = parse_key::<u64>(&get, "MAX_DURATION")? {
            self.limits.max_duration = Duration::from_secs(secs);
        }
        if let Some(n) = parse_key(&get, "MAX_CONCURRENT_DOWNLOADS")? {
            self.limits.max_concurrent_downloads = n;
        }
        if let Some(n) = parse_key(&get, "MAX_URLS_PER_MESSAGE")? {
            self.limits.max_urls_per_message = n;
        }
        if let Some(dir) = get("TEMP_DIR") {
            self.storage.temp_dir = PathBuf::from(dir);
        }
        if let Some(dir) = get("PUBLIC_DIR") {
            self.storage.public_dir = PathBuf::from(dir);
        }
        if let Some(path) = get("COOKIE_FILE") {
            self.fetcher.cookie_file = Some(PathBuf::from(path));
        }
        if let Some(path) = get("YTDLP_PATH") {
            self.fetcher.ytdlp_path = Some(PathBuf::from(path));
        }
        if let Some(addr) = parse_key(&get, "SERVE_ADDRESS")? {
            self.serve.bind_address = Some(addr);
        }
        if let Some(list) = get("SOURCES") {
            self.sources = list
                .split(',')
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(debug) = get("DEBUG") {
            self.debug = debug.trim().eq_ignore_ascii_case("true");
        }

        Ok(self)
    }

    /// Check cross-field invariants
    pub fn validate(&self) -> Result<()> {
        let limits = &self.limits;

        if limits.max_duration.is_zero() {
            return Err(Error::config("max_duration", "must be greater than zero"));
        }
        if limits.max_inline_upload_bytes >= limits.max_hosting_bytes {
            return Err(Error::config(
                "max_inline_upload_bytes",
                format!(
                    "inline upload limit ({}) must be smaller than hosting ceiling ({})",
                    limits.max_inline_upload_bytes, limits.max_hosting_bytes
                ),
            ));
        }
        if limits.max_concurrent_downloads == 0 {
            return Err(Error::config(
                "max_concurrent_downloads",
                "must be greater than zero",
            ));
        }
        if limits.max_concurrent_downloads > MAX_CONCURRENT_DOWNLOADS {
            return Err(Error::config(
                "max_concurrent_downloads",
                format!(
                    "{} exceeds the maximum of {}",
                    limits.max_concurrent_downloads, MAX_CONCURRENT_DOWNLOADS
                ),
            ));
        }
        if limits.max_urls_per_message == 0 {
            return Err(Error::config("max_urls_per_message", "must be greater than zero"));
        }
        if self.fetcher.progress_interval.is_zero() {
            return Err(Error::config("progress_interval", "must be greater than zero"));
        }

        let base = url::Url::parse(&self.storage.public_base_url).map_err(|e| {
            Error::config(
                "public_base_url",
                format!("invalid URL {:?}: {}", self.storage.public_base_url, e),
            )
        })?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(Error::config(
                "public_base_url",
                format!("unsupported scheme {:?}", base.scheme()),
            ));
        }

        for name in &self.sources {
            if crate::source::SourceHandler::builtin_by_name(name).is_none() {
                return Err(Error::config("sources", format!("unknown source {name:?}")));
            }
        }

        Ok(())
    }
}

fn parse_key<T>(get: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| Error::config(key, format!("invalid value {raw:?}: {e}"))),
        None => Ok(None),
    }
}

fn default_max_duration() -> Duration {
    Duration::from_secs(15 * 60)
}

fn default_max_inline_upload_bytes() -> u64 {
    8 * 1024 * 1024
}

fn default_max_hosting_bytes() -> u64 {
    100 * 1024 * 1024
}

fn default_max_urls_per_message() -> usize {
    5
}

fn default_max_concurrent() -> usize {
    4
}

fn default_temp_dir() -> PathBuf {
    PathBuf::from("./tmp")
}

fn default_public_dir() -> PathBuf {
    PathBuf::from("./public")
}

fn default_public_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_progress_interval() -> Duration {
    Duration::from_secs(2)
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Optional Duration serialization helper
mod optional_duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}
