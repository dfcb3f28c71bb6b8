//! # Signal Service
//! Owns the caches and collaborators and runs one computation:
//! window → response cache → feeds → dedup/filter → score → weight →
//! aggregate → (news API) → payload.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use serde::Serialize;
use tracing::{info, warn};

use crate::analyze::{ModelProvider, ModelTrack, SentimentPipeline, TrackStatus};
use crate::cache::ResponseCache;
use crate::config::SignalConfig;
use crate::engine::{round4, AggregateState, SignalItem, SignalPayload};
use crate::ingest::feeds::{build_news_api, build_providers};
use crate::ingest::types::SourceProvider;
use crate::ingest::{fetch_all, fetch_one, select, Candidate, FeedBatch, FeedOutcome, LinkDedup};
use crate::source_weights::SourceWeights;
use crate::window::TimeWindow;

/// Whether a payload came from the response cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelReport {
    pub enabled: bool,
    pub finance: TrackStatus,
    pub multilingual: TrackStatus,
}

pub struct SignalService {
    config: SignalConfig,
    weights: SourceWeights,
    providers: Vec<Arc<dyn SourceProvider>>,
    news_api: Option<Arc<dyn SourceProvider>>,
    pipeline: SentimentPipeline,
    response_cache: Mutex<ResponseCache<SignalPayload>>,
    // One computation at a time; the caches assume it.
    gate: tokio::sync::Mutex<()>,
    last_report: Mutex<Vec<FeedOutcome>>,
}

impl SignalService {
    pub fn new(
        config: SignalConfig,
        weights: SourceWeights,
        providers: Vec<Arc<dyn SourceProvider>>,
        news_api: Option<Arc<dyn SourceProvider>>,
        model: Arc<ModelProvider>,
    ) -> Self {
        let cache_cfg = &config.tunables.cache;
        let pipeline = SentimentPipeline::new(
            model,
            Duration::from_secs(cache_cfg.sentiment_ttl_secs),
            cache_cfg.sentiment_capacity,
        );
        let response_cache = Mutex::new(ResponseCache::new(config.response_cache_ttl));
        Self {
            config,
            weights,
            providers,
            news_api,
            pipeline,
            response_cache,
            gate: tokio::sync::Mutex::new(()),
            last_report: Mutex::new(Vec::new()),
        }
    }

    /// Production wiring: HTTP feeds, optional news API, optional model backend.
    pub fn from_config(config: SignalConfig) -> Result<Self> {
        let providers = build_providers(&config)?;
        let news_api = build_news_api(&config)?;
        let model = Arc::new(ModelProvider::from_config(
            &config.model,
            config.tunables.model,
        ));
        let weights = SourceWeights::load_default();
        info!(
            target: "signal",
            feeds = providers.len(),
            news_api = news_api.is_some(),
            ml = model.is_enabled(),
            tz_offset_minutes = config.tz_offset_minutes,
            "signal service ready"
        );
        Ok(Self::new(config, weights, providers, news_api, model))
    }

    pub async fn compute(&self, force: bool) -> Result<(SignalPayload, CacheStatus)> {
        self.compute_at(Utc::now(), force).await
    }

    /// The signal as of `now`. `force` skips the response cache.
    pub async fn compute_at(
        &self,
        now: DateTime<Utc>,
        force: bool,
    ) -> Result<(SignalPayload, CacheStatus)> {
        let window = TimeWindow::today(now, self.config.tz_offset_minutes);
        if let Some(hit) = self.cached(&window, force) {
            return Ok((hit, CacheStatus::Hit));
        }

        let _gate = self.gate.lock().await;
        // Someone may have filled the cache while we waited.
        if let Some(hit) = self.cached(&window, force) {
            return Ok((hit, CacheStatus::Hit));
        }
        counter!("signal_response_cache_misses_total").increment(1);

        let t0 = Instant::now();
        let payload = self.run(&window).await?;
        histogram!("signal_compute_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

        info!(
            target: "signal",
            items = payload.items.len(),
            long_pct = payload.long_pct,
            short_pct = payload.short_pct,
            recommendation = ?payload.recommendation,
            force,
            "signal computed"
        );

        self.lock_response_cache().put(now, payload.clone());
        Ok((payload, CacheStatus::Miss))
    }

    /// Per-feed outcomes of the most recent computation.
    pub fn last_feed_report(&self) -> Vec<FeedOutcome> {
        self.last_report
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    pub fn model_status(&self) -> ModelReport {
        let model = self.pipeline.model();
        ModelReport {
            enabled: model.is_enabled(),
            finance: model.status(ModelTrack::Finance),
            multilingual: model.status(ModelTrack::Multilingual),
        }
    }

    fn cached(&self, window: &TimeWindow, force: bool) -> Option<SignalPayload> {
        let hit = self.lock_response_cache().get(window.now, force)?;
        counter!("signal_response_cache_hits_total").increment(1);
        Some(hit.refreshed_for(window))
    }

    async fn run(&self, window: &TimeWindow) -> Result<SignalPayload> {
        let now = window.now;
        let swept = self.pipeline.sweep(now);
        if swept > 0 {
            tracing::debug!(target: "signal", swept, "sentiment cache swept");
        }

        let mut dedup = LinkDedup::new();
        let mut state = AggregateState::default();
        let mut items = Vec::new();
        let mut report = Vec::with_capacity(self.providers.len() + 1);

        // The news API is fetched alongside the feeds but merged after them.
        let secondary = async {
            match &self.news_api {
                Some(api) => Some(fetch_one(api.as_ref()).await),
                None => None,
            }
        };
        let (batches, secondary) = futures::join!(fetch_all(&self.providers), secondary);

        for batch in batches {
            self.absorb(batch, window, &mut dedup, &mut state, &mut items, &mut report)
                .await;
        }

        if let Some(batch) = secondary {
            if !batch.outcome.ok {
                warn!(target: "signal", source = %batch.outcome.feed, "secondary source skipped");
            }
            self.absorb(batch, window, &mut dedup, &mut state, &mut items, &mut report)
                .await;
        }

        *self.last_report.lock().unwrap_or_else(|p| p.into_inner()) = report;

        Ok(SignalPayload::build(
            window,
            &state,
            items,
            self.config.tunables.hysteresis,
        ))
    }

    async fn absorb(
        &self,
        batch: FeedBatch,
        window: &TimeWindow,
        dedup: &mut LinkDedup,
        state: &mut AggregateState,
        items: &mut Vec<SignalItem>,
        report: &mut Vec<FeedOutcome>,
    ) {
        let (candidates, drops) = select(batch.items, window, dedup);
        if drops.total() > 0 {
            tracing::debug!(target: "signal", feed = %batch.outcome.feed, ?drops, "items dropped");
        }
        report.push(batch.outcome);

        // Sequential: a link scored here is a cache hit for any later request.
        for c in candidates {
            let item = self.score_item(c, window, state).await;
            items.push(item);
        }
    }

    async fn score_item(
        &self,
        c: Candidate,
        window: &TimeWindow,
        state: &mut AggregateState,
    ) -> SignalItem {
        let t = &self.config.tunables;
        let sentiment = self
            .pipeline
            .score(&c.link, &c.title, &c.snippet, window.now)
            .await;
        let weight_factor =
            self.weights.weight_for(&c.source) * window.decay_at(c.published_at, t.decay_floor);
        state.add(&sentiment, weight_factor, t);
        counter!("signal_items_scored_total").increment(1);

        SignalItem {
            title: c.title,
            link: c.link,
            pub_date: c.published_at,
            source: c.source,
            sentiment: sentiment.label,
            score: sentiment.score,
            weight: round4(sentiment.score * weight_factor),
        }
    }

    fn lock_response_cache(&self) -> std::sync::MutexGuard<'_, ResponseCache<SignalPayload>> {
        self.response_cache.lock().unwrap_or_else(|p| p.into_inner())
    }
}
