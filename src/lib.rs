// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod cache;
pub mod config;
pub mod engine;
pub mod metrics;
pub mod sentiment;
pub mod signal;
pub mod source_weights;
pub mod window;

// Sentiment pipeline (lexicon + optional model, combiner)
pub mod analyze;

// Feed ingestion (RSS + news API)
pub mod ingest;

// ---- Re-exports for stable public API ----
pub use analyze::ai_adapter;
pub use crate::api::router;
pub use crate::config::SignalConfig;
pub use crate::signal::{CacheStatus, SignalService};
