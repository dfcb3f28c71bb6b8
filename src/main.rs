//! Crypto news signal — Binary Entrypoint
//! Loads configuration, builds the signal service and serves it with Axum.

use std::sync::Arc;

use crypto_news_signal::{config::parse_flag, metrics::Metrics, SignalConfig, SignalService};
use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Compact logs by default, JSON with `SIGNAL_LOG_JSON=1`.
/// Uses `try_init` so a subscriber installed by the runtime wins.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("SIGNAL_LOG_JSON")
        .ok()
        .and_then(|v| parse_flag(&v))
        .unwrap_or(false);

    let res = if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .try_init()
    };
    if res.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    init_tracing();

    let config = SignalConfig::from_env();
    let metrics = Metrics::init(config.response_cache_ttl.as_secs())?;
    let service = Arc::new(SignalService::from_config(config)?);

    let router = crypto_news_signal::router(service).merge(metrics.router());

    Ok(router.into())
}
