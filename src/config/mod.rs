// src/config/mod.rs
//! Runtime configuration.
//!
//! Switches come from the environment (a `.env` file is loaded by the binary);
//! numeric tunables come from `config/signal.toml`.

pub mod model;
pub mod tunables;

use std::time::Duration;

pub use model::ModelConfig;
pub use tunables::Tunables;

pub const DEFAULT_TZ_OFFSET_MINUTES: i32 = 540;
pub const DEFAULT_RESPONSE_CACHE_TTL_SECS: u64 = 45;
pub const DEFAULT_SECONDARY_OFFICIAL_FEED_URL: &str = "https://www.coinbase.com/blog/rss.xml";

#[derive(Debug, Clone)]
pub struct SignalConfig {
    /// Minutes east of UTC that define the local "today".
    pub tz_offset_minutes: i32,
    /// Zero disables the response cache.
    pub response_cache_ttl: Duration,
    pub enable_secondary_official_feed: bool,
    pub secondary_official_feed_url: String,
    pub extra_feeds: Vec<String>,
    pub news_api_token: Option<String>,
    pub model: ModelConfig,
    pub tunables: Tunables,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            tz_offset_minutes: DEFAULT_TZ_OFFSET_MINUTES,
            response_cache_ttl: Duration::from_secs(DEFAULT_RESPONSE_CACHE_TTL_SECS),
            enable_secondary_official_feed: false,
            secondary_official_feed_url: DEFAULT_SECONDARY_OFFICIAL_FEED_URL.to_string(),
            extra_feeds: Vec::new(),
            news_api_token: None,
            model: ModelConfig::default(),
            tunables: Tunables::default(),
        }
    }
}

impl SignalConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            tz_offset_minutes: env_parse("SIGNAL_TZ_OFFSET_MINUTES").unwrap_or(d.tz_offset_minutes),
            response_cache_ttl: env_parse::<u64>("RESPONSE_CACHE_TTL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(d.response_cache_ttl),
            enable_secondary_official_feed: env_bool("ENABLE_SECONDARY_OFFICIAL_FEED", false),
            secondary_official_feed_url: env_string("SECONDARY_OFFICIAL_FEED_URL")
                .unwrap_or(d.secondary_official_feed_url),
            extra_feeds: env_list("EXTRA_FEEDS"),
            news_api_token: env_string("NEWS_API_TOKEN"),
            model: ModelConfig::from_env(),
            tunables: Tunables::load_default(),
        }
    }
}

/// Non-empty, trimmed env value.
pub(crate) fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub(crate) fn env_bool(key: &str, default: bool) -> bool {
    match env_string(key) {
        Some(v) => parse_flag(&v).unwrap_or(default),
        None => default,
    }
}

pub(crate) fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env_string(key).and_then(|v| v.parse().ok())
}

/// Comma-separated list; blanks dropped.
pub(crate) fn env_list(key: &str) -> Vec<String> {
    env_string(key)
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// `1/true/yes/on` and `0/false/no/off`, case-insensitive.
pub fn parse_flag(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag(" on "), Some(true));
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[serial_test::serial]
    #[test]
    fn from_env_reads_switches() {
        std::env::set_var("SIGNAL_TZ_OFFSET_MINUTES", "-300");
        std::env::set_var("RESPONSE_CACHE_TTL_SECS", "0");
        std::env::set_var("ENABLE_SECONDARY_OFFICIAL_FEED", "1");
        std::env::set_var("EXTRA_FEEDS", "https://a.example/rss, https://b.example/rss");
        std::env::set_var("NEWS_API_TOKEN", "   ");

        let cfg = SignalConfig::from_env();
        assert_eq!(cfg.tz_offset_minutes, -300);
        assert_eq!(cfg.response_cache_ttl, Duration::ZERO);
        assert!(cfg.enable_secondary_official_feed);
        assert_eq!(cfg.extra_feeds.len(), 2);
        assert!(cfg.news_api_token.is_none(), "blank token counts as absent");

        for k in [
            "SIGNAL_TZ_OFFSET_MINUTES",
            "RESPONSE_CACHE_TTL_SECS",
            "ENABLE_SECONDARY_OFFICIAL_FEED",
            "EXTRA_FEEDS",
            "NEWS_API_TOKEN",
        ] {
            std::env::remove_var(k);
        }
    }

    #[serial_test::serial]
    #[test]
    fn bad_numbers_fall_back() {
        std::env::set_var("SIGNAL_TZ_OFFSET_MINUTES", "nine");
        let cfg = SignalConfig::from_env();
        assert_eq!(cfg.tz_offset_minutes, DEFAULT_TZ_OFFSET_MINUTES);
        std::env::remove_var("SIGNAL_TZ_OFFSET_MINUTES");
    }
}
