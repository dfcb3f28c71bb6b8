// src/ingest/providers/mod.rs
pub mod news_api;
pub mod rss;

pub use news_api::NewsApiProvider;
pub use rss::RssFeedProvider;

/// Shared client for feed and API fetches.
pub(crate) fn http_client() -> anyhow::Result<reqwest::Client> {
    use anyhow::Context;
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(10))
        .user_agent(concat!("crypto-news-signal/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("building http client")
}
