//! Source handlers and URL extraction
//!
//! A [`SourceHandler`] is plain data: a stable name, a display name, the URL
//! patterns it claims, and the extra policy rules it adds. Handlers are built
//! once at startup and shared for the life of the process.

use crate::error::{Error, Result};
use crate::policy::SourcePolicy;
use regex::Regex;
use std::collections::HashSet;

/// Configuration bundle describing one supported media origin
#[derive(Clone, Debug)]
pub struct SourceHandler {
    name: String,
    display_name: String,
    url_patterns: Vec<Regex>,
    policy: SourcePolicy,
}

const REDDIT_PATTERNS: &[&str] = &[
    r"https?://(?:(?:old|www)\.)?reddit\.com/r/\w+/\w*/\w+/\S*",
    r"https?://v\.redd\.it/\w+",
    r"https?://www\.reddit\.com/r/\w+/s/\w+",
];

const TWITTER_PATTERNS: &[&str] = &[r"https?://(?:www\.)?(?:twitter|x)\.com/\w+/status/\w+"];

const YOUTUBE_PATTERNS: &[&str] = &[
    r"https?://www\.youtube\.com/watch\?v=[\w-]+",
    r"https?://youtu\.be/[\w-]+",
];

const INSTAGRAM_PATTERNS: &[&str] = &[r"https?://(?:www\.)?instagram\.com/(?:p|reels?)/[\w-]+"];

/// Names of the built-in handlers, in dispatch order
pub const BUILTIN_SOURCES: &[&str] = &["reddit", "twitter", "youtube", "instagram"];

impl SourceHandler {
    /// Create a handler, compiling its URL patterns
    pub fn new(
        name: impl Into<String>,
        display_name: impl Into<String>,
        patterns: &[&str],
        policy: SourcePolicy,
    ) -> Result<Self> {
        let name = name.into();
        let url_patterns = patterns
            .iter()
            .map(|p| {
                Regex::new(p).map_err(|e| {
                    Error::config("url_patterns", format!("invalid pattern for {name}: {e}"))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            name,
            display_name: display_name.into(),
            url_patterns,
            policy,
        })
    }

    /// Reddit posts, v.redd.it links and share links
    pub fn reddit() -> Result<Self> {
        Self::new(
            "reddit",
            "Reddit Downloader",
            REDDIT_PATTERNS,
            SourcePolicy::open(),
        )
    }

    /// Twitter / X status links
    pub fn twitter() -> Result<Self> {
        Self::new(
            "twitter",
            "Twitter Downloader",
            TWITTER_PATTERNS,
            SourcePolicy::open(),
        )
    }

    /// YouTube watch and short links, adult-rated videos only
    pub fn youtube() -> Result<Self> {
        Self::new(
            "youtube",
            "Youtube Downloader",
            YOUTUBE_PATTERNS,
            SourcePolicy::age_restricted(18),
        )
    }

    /// Instagram posts and reels
    pub fn instagram() -> Result<Self> {
        Self::new(
            "instagram",
            "Instagram Downloader",
            INSTAGRAM_PATTERNS,
            SourcePolicy::open(),
        )
    }

    /// Look up a built-in handler by name
    pub fn builtin_by_name(name: &str) -> Option<Result<Self>> {
        match name {
            "reddit" => Some(Self::reddit()),
            "twitter" => Some(Self::twitter()),
            "youtube" => Some(Self::youtube()),
            "instagram" => Some(Self::instagram()),
            _ => None,
        }
    }

    /// Every built-in handler
    pub fn builtin() -> Result<Vec<Self>> {
        Self::enabled(&[])
    }

    /// Built-in handlers restricted to `names` (empty = all), in dispatch order
    pub fn enabled(names: &[String]) -> Result<Vec<Self>> {
        for name in names {
            if !BUILTIN_SOURCES.contains(&name.as_str()) {
                return Err(Error::config("sources", format!("unknown source {name:?}")));
            }
        }

        BUILTIN_SOURCES
            .iter()
            .filter(|name| names.is_empty() || names.iter().any(|n| n == *name))
            .filter_map(|name| Self::builtin_by_name(name))
            .collect()
    }

    /// Stable identifier, also used in temp and public paths
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Human-readable name shown in status replies
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Extra policy rules for this source
    pub fn policy(&self) -> SourcePolicy {
        self.policy
    }

    /// Find every URL in `text` this handler claims
    ///
    /// Matches from all patterns are merged and deduplicated by exact string
    /// equality, keeping first-seen order.
    pub fn extract(&self, text: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        self.url_patterns
            .iter()
            .flat_map(|re| re.find_iter(text))
            .map(|m| m.as_str())
            .filter(|url| seen.insert(*url))
            .map(str::to_string)
            .collect()
    }
}
