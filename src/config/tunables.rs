// src/config/tunables.rs
//! Empirical constants of the signal pipeline.
//!
//! None of these values are derived; they are knobs that were picked by eye and
//! kept stable. They can be overridden from a TOML file:
//!
//! ```toml
//! decay_floor = 0.7
//! magnitude_min = 0.5
//! magnitude_max = 2.0
//! hysteresis = 1.05
//!
//! [model]
//! min_confidence = 0.4
//! min_margin = 0.05
//! min_magnitude = 0.5
//! magnitude_scale = 5.0
//!
//! [cache]
//! sentiment_ttl_secs = 21600
//! sentiment_capacity = 10000
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_SIGNAL_CONFIG_PATH: &str = "SIGNAL_CONFIG_PATH";
pub const DEFAULT_SIGNAL_CONFIG_PATH: &str = "config/signal.toml";
/// Upper bound for `cache.sentiment_ttl_secs` (30 days).
pub const MAX_SENTIMENT_TTL_SECS: u64 = 30 * 24 * 3600;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct Tunables {
    /// Weight kept by the oldest item still inside the window.
    pub decay_floor: f64,
    /// Clamp applied to |score| before it enters the aggregate.
    pub magnitude_min: f64,
    pub magnitude_max: f64,
    /// One side must exceed the other by this factor to leave NEUTRAL.
    pub hysteresis: f64,
    pub model: ModelTunables,
    pub cache: CacheTunables,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct ModelTunables {
    /// Strongest class probability below this ⇒ neutral.
    pub min_confidence: f64,
    /// |p(positive) − p(negative)| below this ⇒ neutral.
    pub min_margin: f64,
    pub min_magnitude: f64,
    pub magnitude_scale: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct CacheTunables {
    pub sentiment_ttl_secs: u64,
    pub sentiment_capacity: usize,
}

impl Default for Tunables {
    fn default() -> Self {
        Self {
            decay_floor: 0.7,
            magnitude_min: 0.5,
            magnitude_max: 2.0,
            hysteresis: 1.05,
            model: ModelTunables::default(),
            cache: CacheTunables::default(),
        }
    }
}

impl Default for ModelTunables {
    fn default() -> Self {
        Self {
            min_confidence: 0.4,
            min_margin: 0.05,
            min_magnitude: 0.5,
            magnitude_scale: 5.0,
        }
    }
}

impl Default for CacheTunables {
    fn default() -> Self {
        Self {
            sentiment_ttl_secs: 6 * 3600,
            sentiment_capacity: 10_000,
        }
    }
}

impl Tunables {
    /// Parse tunables from TOML text. Missing keys keep their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let t: Tunables = toml::from_str(s).context("parsing signal tunables")?;
        Ok(t.sanitized())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading tunables from {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// Load using `$SIGNAL_CONFIG_PATH`, then `config/signal.toml`.
    /// A missing or broken file yields the defaults.
    pub fn load_default() -> Self {
        let path = std::env::var(ENV_SIGNAL_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_SIGNAL_CONFIG_PATH));
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!(error = ?e, path = %path.display(), "invalid tunables, using defaults");
                Self::default()
            }
        }
    }

    /// Replace out-of-range values with defaults so the invariants downstream hold.
    fn sanitized(mut self) -> Self {
        let d = Self::default();
        if !(0.0..=1.0).contains(&self.decay_floor) {
            self.decay_floor = d.decay_floor;
        }
        if self.magnitude_min < 0.0 || self.magnitude_min > self.magnitude_max {
            self.magnitude_min = d.magnitude_min;
            self.magnitude_max = d.magnitude_max;
        }
        if self.hysteresis < 1.0 {
            self.hysteresis = d.hysteresis;
        }
        if !(0.0..=1.0).contains(&self.model.min_confidence) {
            self.model.min_confidence = d.model.min_confidence;
        }
        if !(0.0..=1.0).contains(&self.model.min_margin) {
            self.model.min_margin = d.model.min_margin;
        }
        if self.cache.sentiment_ttl_secs > MAX_SENTIMENT_TTL_SECS {
            self.cache.sentiment_ttl_secs = MAX_SENTIMENT_TTL_SECS;
        }
        if self.cache.sentiment_capacity == 0 {
            self.cache.sentiment_capacity = d.cache.sentiment_capacity;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_keeps_defaults() {
        let t = Tunables::from_toml_str("").unwrap();
        assert_eq!(t, Tunables::default());
    }

    #[test]
    fn partial_override() {
        let t = Tunables::from_toml_str(
            r#"
            hysteresis = 1.10
            [model]
            min_margin = 0.1
            "#,
        )
        .unwrap();
        assert!((t.hysteresis - 1.10).abs() < 1e-9);
        assert!((t.model.min_margin - 0.1).abs() < 1e-9);
        assert!((t.decay_floor - 0.7).abs() < 1e-9);
        assert_eq!(t.cache.sentiment_ttl_secs, 21_600);
    }

    #[test]
    fn out_of_range_values_fall_back() {
        let t = Tunables::from_toml_str(
            r#"
            decay_floor = 1.5
            magnitude_min = 3.0
            magnitude_max = 2.0
            hysteresis = 0.9
            "#,
        )
        .unwrap();
        assert_eq!(t, Tunables::default());
    }

    #[test]
    fn sentiment_ttl_is_capped() {
        let t = Tunables::from_toml_str(
            r#"
            [cache]
            sentiment_ttl_secs = 9223372036854775807
            "#,
        )
        .unwrap();
        assert_eq!(t.cache.sentiment_ttl_secs, MAX_SENTIMENT_TTL_SECS);

        let t = Tunables::from_toml_str("[cache]\nsentiment_ttl_secs = 0\n").unwrap();
        assert_eq!(t.cache.sentiment_ttl_secs, 0);
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("signal.toml");
        fs::write(&p, "decay_floor = 0.8\n").unwrap();
        let t = Tunables::load_from(&p).unwrap();
        assert!((t.decay_floor - 0.8).abs() < 1e-9);
    }
}
