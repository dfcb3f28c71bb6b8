// src/ingest/providers/news_api.rs
//! Secondary JSON news source (CryptoPanic-style `posts` endpoint).
//!
//! Only constructed when an API token is configured.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use crate::ingest::types::{RawItem, SourceProvider};

pub const DEFAULT_NEWS_API_URL: &str = "https://cryptopanic.com/api/v1/posts/";

#[derive(Debug, Deserialize)]
struct Page {
    #[serde(default)]
    results: Vec<Post>,
}

#[derive(Debug, Deserialize)]
struct Post {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    published_at: Option<String>,
    #[serde(default)]
    description: Option<String>,
    source: Option<PostSource>,
}

#[derive(Debug, Deserialize)]
struct PostSource {
    title: Option<String>,
    domain: Option<String>,
}

pub fn parse_page(json: &str) -> Result<Vec<RawItem>> {
    let page: Page = serde_json::from_str(json).context("parsing news api json")?;
    Ok(page
        .results
        .into_iter()
        .filter(|p| !p.title.trim().is_empty())
        .map(|p| RawItem {
            title: p.title.trim().to_string(),
            link: p.url,
            pub_date: p.published_at,
            snippet: p.description.unwrap_or_default(),
            creator: None,
            source: p.source.and_then(|s| s.title.or(s.domain)),
        })
        .collect())
}

pub struct NewsApiProvider {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http {
        url: String,
        token: String,
        client: reqwest::Client,
    },
}

impl NewsApiProvider {
    /// `None` when no token is configured.
    pub fn from_token(token: Option<&str>, client: reqwest::Client) -> Option<Self> {
        let token = token.map(str::trim).filter(|t| !t.is_empty())?;
        Some(Self {
            mode: Mode::Http {
                url: DEFAULT_NEWS_API_URL.to_string(),
                token: token.to_string(),
                client,
            },
        })
    }

    pub fn from_fixture_str(json: &str) -> Self {
        Self {
            mode: Mode::Fixture(json.to_string()),
        }
    }
}

#[async_trait]
impl SourceProvider for NewsApiProvider {
    async fn fetch_latest(&self) -> Result<Vec<RawItem>> {
        match &self.mode {
            Mode::Fixture(s) => parse_page(s),
            Mode::Http { url, token, client } => {
                let body = client
                    .get(url.as_str())
                    .query(&[
                        ("auth_token", token.as_str()),
                        ("public", "true"),
                        ("kind", "news"),
                    ])
                    .send()
                    .await
                    .context("news api get()")?
                    .error_for_status()
                    .context("news api status")?
                    .text()
                    .await
                    .context("news api .text()")?;
                parse_page(&body)
            }
        }
    }

    fn name(&self) -> &str {
        "NewsAPI"
    }
}
