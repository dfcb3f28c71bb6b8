// src/ingest/types.rs
use anyhow::Result;

/// One article as a feed client hands it over. Nothing is validated yet.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct RawItem {
    pub title: String,
    pub link: String,
    /// RFC 2822 `pubDate` or RFC 3339 `isoDate`, as published.
    pub pub_date: Option<String>,
    pub snippet: String,
    /// Author / `dc:creator`.
    pub creator: Option<String>,
    /// Publisher name supplied by the feed (e.g. Google News `<source>`).
    pub source: Option<String>,
}

/// A feed client: returns its current items or fails as a whole.
#[async_trait::async_trait]
pub trait SourceProvider: Send + Sync {
    async fn fetch_latest(&self) -> Result<Vec<RawItem>>;
    fn name(&self) -> &str;
}
