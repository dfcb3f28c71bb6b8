// tests/metrics.rs
//
// Installs the Prometheus recorder (once per test binary), runs one signal
// computation and checks the exposition output.
use std::sync::Arc;

use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::Utc;
use tower::ServiceExt;

use crypto_news_signal::analyze::ModelProvider;
use crypto_news_signal::ingest::providers::RssFeedProvider;
use crypto_news_signal::metrics::Metrics;
use crypto_news_signal::source_weights::SourceWeights;
use crypto_news_signal::{router, SignalConfig, SignalService};

fn feed_xml() -> String {
    format!(
        "<rss><channel><item><title>Bitcoin rally</title><link>https://news.test/m</link>\
         <pubDate>{}</pubDate></item></channel></rss>",
        Utc::now().to_rfc2822()
    )
}

fn build_app(metrics: &Metrics) -> Router {
    let cfg = SignalConfig {
        tz_offset_minutes: 0,
        ..SignalConfig::default()
    };
    let service = SignalService::new(
        cfg,
        SourceWeights::default(),
        vec![Arc::new(RssFeedProvider::from_fixture_str("Fixture", &feed_xml()))],
        None,
        Arc::new(ModelProvider::disabled()),
    );
    router(Arc::new(service)).merge(metrics.router())
}

#[tokio::test]
async fn metrics_endpoint_contains_expected_series() {
    let metrics = Metrics::init(45).expect("install recorder");
    let app = build_app(&metrics);

    for _ in 0..2 {
        let resp = app
            .clone()
            .oneshot(Request::get("/api/signal").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let resp = app
        .clone()
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    // axum::body::to_bytes requires an explicit limit
    let body = body::to_bytes(resp.into_body(), 1_048_576).await.unwrap(); // 1 MiB
    let text = String::from_utf8(body.to_vec()).unwrap();

    for needle in [
        "signal_feed_fetch_total",
        "signal_items_scored_total",
        "signal_sentiment_cache_misses_total",
        "signal_response_cache_hits_total",
        "signal_response_cache_misses_total",
        "signal_compute_ms",
        "signal_feed_parse_ms",
        "signal_response_cache_ttl_secs",
    ] {
        assert!(text.contains(needle), "missing series `{needle}` in:\n{text}");
    }

    for described in ["signal_feed_fetch_ms", "signal_feed_parse_ms", "signal_compute_ms"] {
        assert!(
            text.contains(&format!("# HELP {described} ")),
            "no HELP line for `{described}`"
        );
    }
}
