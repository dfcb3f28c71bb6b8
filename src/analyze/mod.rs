// src/analyze/mod.rs
//! Sentiment pipeline: lexicon + optional model, merged and memoized per link.

pub mod ai_adapter;
pub mod combiner;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use metrics::counter;

use crate::cache::TtlCache;
use crate::sentiment::{SentimentAnalyzer, SentimentScore};

pub use crate::analyze::ai_adapter::{ModelProvider, ModelTrack, TrackStatus};
pub use crate::analyze::combiner::combine;

/// Cache-or-compute scorer keyed by normalized link.
pub struct SentimentPipeline {
    lexicon: SentimentAnalyzer,
    model: Arc<ModelProvider>,
    cache: Mutex<TtlCache<String, SentimentScore>>,
}

impl SentimentPipeline {
    pub fn new(model: Arc<ModelProvider>, ttl: Duration, capacity: usize) -> Self {
        Self {
            lexicon: SentimentAnalyzer::new(),
            model,
            cache: Mutex::new(TtlCache::new(ttl, capacity)),
        }
    }

    pub fn model(&self) -> &ModelProvider {
        &self.model
    }

    /// Combined sentiment for one article. Never fails: without a usable model
    /// this is the lexicon score.
    pub async fn score(
        &self,
        link: &str,
        title: &str,
        snippet: &str,
        now: DateTime<Utc>,
    ) -> SentimentScore {
        let cached = self.lock_cache().get(&link.to_string(), now);
        if let Some(hit) = cached {
            counter!("signal_sentiment_cache_hits_total").increment(1);
            return hit;
        }
        counter!("signal_sentiment_cache_misses_total").increment(1);

        let lex = self.lexicon.score(title, snippet);
        let model = self.model.score(&format!("{title}. {snippet}")).await;
        let combined = combine(lex, model);

        self.lock_cache().insert(link.to_string(), combined, now);
        combined
    }

    /// Drop expired entries; called once per computation.
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        self.lock_cache().sweep(now)
    }

    pub fn cached_len(&self) -> usize {
        self.lock_cache().len()
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, TtlCache<String, SentimentScore>> {
        self.cache.lock().unwrap_or_else(|p| p.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sentiment::SentimentLabel;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 3, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn lexicon_only_and_cached_per_link() {
        let p = SentimentPipeline::new(
            Arc::new(ModelProvider::disabled()),
            Duration::from_secs(6 * 3600),
            100,
        );
        let s = p.score("https://x.test/a", "bitcoin rally", "", now()).await;
        assert_eq!(s.label, SentimentLabel::Positive);
        assert_eq!(p.cached_len(), 1);

        // Same link, different text: the cached value is reused.
        let again = p.score("https://x.test/a", "exchange hack", "", now()).await;
        assert_eq!(again, s);
    }

    #[tokio::test]
    async fn sweep_clears_expired() {
        let p = SentimentPipeline::new(Arc::new(ModelProvider::disabled()), Duration::from_secs(60), 100);
        p.score("https://x.test/a", "rally", "", now()).await;
        assert_eq!(p.sweep(now() + chrono::Duration::seconds(61)), 1);
        assert_eq!(p.cached_len(), 0);
    }
}
