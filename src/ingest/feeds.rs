// src/ingest/feeds.rs
//! The feed list a computation fetches.

use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;

use crate::config::SignalConfig;
use crate::ingest::providers::{http_client, NewsApiProvider, RssFeedProvider};
use crate::ingest::types::SourceProvider;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedSpec {
    pub name: String,
    pub url: String,
}

impl FeedSpec {
    fn new(name: &str, url: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
        }
    }
}

const NATIVE_FEEDS: &[(&str, &str)] = &[
    ("CoinDesk", "https://www.coindesk.com/arc/outboundfeeds/rss/"),
    ("Cointelegraph", "https://cointelegraph.com/rss"),
    ("Decrypt", "https://decrypt.co/feed"),
    ("The Block", "https://www.theblock.co/rss.xml"),
    ("Bitcoin Magazine", "https://bitcoinmagazine.com/.rss/full/"),
];

const GOOGLE_NEWS_SEARCH: &str = "https://news.google.com/rss/search";

/// Google News RSS search for `query` in one locale, e.g. `("en-US", "US", "US:en")`.
fn google_news_search(query: &str, hl: &str, gl: &str, ceid: &str) -> String {
    match url::Url::parse_with_params(
        GOOGLE_NEWS_SEARCH,
        &[("q", query), ("hl", hl), ("gl", gl), ("ceid", ceid)],
    ) {
        Ok(u) => u.to_string(),
        Err(_) => GOOGLE_NEWS_SEARCH.to_string(),
    }
}

/// Native crypto feeds, then localized searches, then the optional official
/// feed, then extra feeds. Order decides first-seen dedup.
pub fn default_feeds(cfg: &SignalConfig) -> Vec<FeedSpec> {
    let mut feeds: Vec<FeedSpec> = NATIVE_FEEDS
        .iter()
        .map(|(name, url)| FeedSpec::new(name, url))
        .collect();

    feeds.push(FeedSpec {
        name: "Google News (en-US)".to_string(),
        url: google_news_search("bitcoin OR crypto when:1d", "en-US", "US", "US:en"),
    });
    feeds.push(FeedSpec {
        name: "Google News (ko-KR)".to_string(),
        url: google_news_search("비트코인 OR 암호화폐 when:1d", "ko", "KR", "KR:ko"),
    });

    if cfg.enable_secondary_official_feed {
        feeds.push(FeedSpec::new("Official", &cfg.secondary_official_feed_url));
    }

    for (i, url) in cfg.extra_feeds.iter().enumerate() {
        feeds.push(FeedSpec {
            name: format!("Extra #{}", i + 1),
            url: url.clone(),
        });
    }

    feeds
}

/// HTTP providers for every configured feed.
pub fn build_providers(cfg: &SignalConfig) -> Result<Vec<Arc<dyn SourceProvider>>> {
    let client = http_client()?;
    Ok(default_feeds(cfg)
        .into_iter()
        .map(|f| Arc::new(RssFeedProvider::from_url(&f.name, &f.url, client.clone())) as Arc<dyn SourceProvider>)
        .collect())
}

/// The token-gated JSON news source, if a token is configured.
pub fn build_news_api(cfg: &SignalConfig) -> Result<Option<Arc<dyn SourceProvider>>> {
    let Some(token) = cfg.news_api_token.as_deref() else {
        return Ok(None);
    };
    let client = http_client()?;
    Ok(NewsApiProvider::from_token(Some(token), client).map(|p| Arc::new(p) as Arc<dyn SourceProvider>))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_have_native_and_localized() {
        let feeds = default_feeds(&SignalConfig::default());
        assert_eq!(feeds.len(), 7);
        assert_eq!(feeds[0].name, "CoinDesk");
        assert!(feeds[5].url.starts_with(GOOGLE_NEWS_SEARCH));
        assert!(feeds[5].url.contains("hl=en-US"));
        assert!(feeds[6].url.contains("ceid=KR%3Ako"));
        assert!(!feeds.iter().any(|f| f.name == "Official"));
    }

    #[test]
    fn optional_feeds_are_appended_in_order() {
        let cfg = SignalConfig {
            enable_secondary_official_feed: true,
            extra_feeds: vec!["https://a.test/rss".into(), "https://b.test/rss".into()],
            ..SignalConfig::default()
        };
        let feeds = default_feeds(&cfg);
        assert_eq!(feeds.len(), 10);
        assert_eq!(feeds[7].url, cfg.secondary_official_feed_url);
        assert_eq!(feeds[8].url, "https://a.test/rss");
        assert_eq!(feeds[9].name, "Extra #2");
    }

    #[test]
    fn news_api_needs_token() {
        assert!(build_news_api(&SignalConfig::default()).unwrap().is_none());
        let cfg = SignalConfig {
            news_api_token: Some("t".into()),
            ..SignalConfig::default()
        };
        assert!(build_news_api(&cfg).unwrap().is_some());
    }
}
