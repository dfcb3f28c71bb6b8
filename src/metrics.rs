use anyhow::{Context, Result};
use metrics::{describe_counter, describe_gauge, describe_histogram, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use shuttle_axum::axum::{routing::get, Router};

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder and publish the response-cache TTL.
    /// Call once per process.
    pub fn init(response_cache_ttl_secs: u64) -> Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;

        describe();
        gauge!("signal_response_cache_ttl_secs").set(response_cache_ttl_secs as f64);

        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

fn describe() {
    describe_counter!("signal_items_scored_total", "Items scored and aggregated.");
    describe_counter!(
        "signal_sentiment_cache_hits_total",
        "Sentiment lookups served from the per-link cache."
    );
    describe_counter!(
        "signal_sentiment_cache_misses_total",
        "Sentiment lookups that had to score the item."
    );
    describe_counter!(
        "signal_response_cache_hits_total",
        "Signal requests served from the response cache."
    );
    describe_counter!(
        "signal_response_cache_misses_total",
        "Signal requests that ran a full computation."
    );
    describe_counter!(
        "signal_model_fallbacks_total",
        "Items where the model failed and the lexicon score was used."
    );
    describe_histogram!("signal_compute_ms", "Full signal computation time in milliseconds.");
    describe_gauge!("signal_response_cache_ttl_secs", "Configured response cache TTL.");
}
