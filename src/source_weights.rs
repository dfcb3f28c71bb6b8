//! # Source Weights
//!
//! Maps a publisher name to a credibility multiplier around 1.0.
//!
//! - Names come from [`resolve_source`]: creator → feed source → link host → "Unknown".
//! - Lookup is exact on the trimmed name; unlisted publishers get the default (1.0).
//! - The table is a built-in seed, optionally replaced by a JSON file:
//!
//! ```json
//! { "default_weight": 1.0, "weights": { "CoinDesk": 1.2, "Reuters": 1.4 } }
//! ```

use serde::Deserialize;
use std::{collections::HashMap, fs, path::Path};

pub const ENV_SOURCE_WEIGHTS_PATH: &str = "SOURCE_WEIGHTS_PATH";
pub const DEFAULT_SOURCE_WEIGHTS_PATH: &str = "config/source_weights.json";
pub const UNKNOWN_SOURCE: &str = "Unknown";

/// Publisher multipliers, loaded from JSON or the built-in seed.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceWeights {
    #[serde(default = "default_default_weight")]
    pub default_weight: f64,
    #[serde(default)]
    pub weights: HashMap<String, f64>,
}

fn default_default_weight() -> f64 {
    1.0
}

impl Default for SourceWeights {
    fn default() -> Self {
        Self::default_seed()
    }
}

impl SourceWeights {
    /// Load from a JSON file. Falls back to `default_seed()` on any error.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(s) => serde_json::from_str::<Self>(&s)
                .map(Self::trimmed)
                .unwrap_or_else(|e| {
                    tracing::warn!(error = %e, path = %path.display(), "invalid source weights, using seed");
                    Self::default_seed()
                }),
            Err(_) => Self::default_seed(),
        }
    }

    /// `$SOURCE_WEIGHTS_PATH`, else `config/source_weights.json`, else the seed.
    pub fn load_default() -> Self {
        let path = std::env::var(ENV_SOURCE_WEIGHTS_PATH)
            .unwrap_or_else(|_| DEFAULT_SOURCE_WEIGHTS_PATH.to_string());
        Self::load_from_file(path)
    }

    pub fn weight_for(&self, source: &str) -> f64 {
        self.weights
            .get(source.trim())
            .copied()
            .filter(|w| w.is_finite() && *w >= 0.0)
            .unwrap_or(self.default_weight)
    }

    fn trimmed(mut self) -> Self {
        self.weights = self
            .weights
            .into_iter()
            .map(|(k, v)| (k.trim().to_string(), v))
            .collect();
        self
    }

    /// Built-in table of crypto and financial publishers.
    pub(crate) fn default_seed() -> Self {
        let weights = [
            ("Bloomberg", 1.4),
            ("Reuters", 1.4),
            ("The Wall Street Journal", 1.3),
            ("Financial Times", 1.3),
            ("CNBC", 1.2),
            ("CoinDesk", 1.2),
            ("coindesk.com", 1.2),
            ("The Block", 1.2),
            ("theblock.co", 1.2),
            ("Decrypt", 1.1),
            ("decrypt.co", 1.1),
            ("Cointelegraph", 1.0),
            ("cointelegraph.com", 1.0),
            ("Bitcoin Magazine", 1.0),
            ("bitcoinmagazine.com", 1.0),
            ("Yahoo Finance", 1.0),
            ("CryptoSlate", 0.9),
            ("Bitcoinist", 0.8),
            ("NewsBTC", 0.7),
            ("U.Today", 0.7),
            ("연합뉴스", 1.2),
            ("한국경제", 1.1),
            ("매일경제", 1.1),
            ("코인데스크코리아", 1.1),
            ("블록미디어", 0.9),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        Self {
            default_weight: 1.0,
            weights,
        }
    }
}

/// Publisher name for an item: explicit creator, then the feed's source field,
/// then the link host without a leading `www.`, then `"Unknown"`.
pub fn resolve_source(creator: Option<&str>, feed_source: Option<&str>, link: &str) -> String {
    fn non_blank(s: Option<&str>) -> Option<&str> {
        s.map(str::trim).filter(|s| !s.is_empty())
    }

    if let Some(c) = non_blank(creator) {
        return c.to_string();
    }
    if let Some(s) = non_blank(feed_source) {
        return s.to_string();
    }
    if let Some(host) = url::Url::parse(link.trim())
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
    {
        let host = host.strip_prefix("www.").unwrap_or(&host);
        if !host.is_empty() {
            return host.to_string();
        }
    }
    UNKNOWN_SOURCE.to_string()
}
