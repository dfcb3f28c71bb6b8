// src/ingest/mod.rs
pub mod feeds;
pub mod providers;
pub mod types;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, NaiveDateTime, Utc};
use futures::future::join_all;
use metrics::{counter, describe_counter, describe_histogram, histogram};
use once_cell::sync::OnceCell;
use serde::Serialize;

use crate::ingest::types::{RawItem, SourceProvider};
use crate::source_weights::resolve_source;
use crate::window::TimeWindow;

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("signal_feed_fetch_total", "Feed fetches by outcome.");
        describe_counter!(
            "signal_items_dropped_total",
            "Raw items dropped before scoring, by reason."
        );
        describe_histogram!("signal_feed_fetch_ms", "Feed fetch+parse time in milliseconds.");
        describe_histogram!("signal_feed_parse_ms", "RSS document parse time in milliseconds.");
    });
}

/// Normalize text: decode entities, strip tags, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").expect("tag regex"));
    out = re_tags.replace_all(&out, " ").to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").expect("ws regex"));
    out = re_ws.replace_all(&out, " ").trim().to_string();

    // 5) Length cap: 1500 chars
    if out.chars().count() > 1500 {
        out = out.chars().take(1500).collect();
    }

    out
}

/// Canonical article URL: drops every `utm_*` query parameter and the fragment,
/// keeps the remaining parameters verbatim and in order. Unparsable input is
/// returned trimmed but otherwise unchanged.
pub fn normalize_link(raw: &str) -> String {
    let trimmed = raw.trim();
    let Ok(mut url) = url::Url::parse(trimmed) else {
        return trimmed.to_string();
    };
    if url.cannot_be_a_base() {
        return trimmed.to_string();
    }
    url.set_fragment(None);

    if let Some(query) = url.query().map(str::to_string) {
        let kept: Vec<&str> = query
            .split('&')
            .filter(|pair| !pair.is_empty())
            .filter(|pair| {
                let key = pair.split('=').next().unwrap_or_default();
                !key.to_ascii_lowercase().starts_with("utm_")
            })
            .collect();
        if kept.is_empty() {
            url.set_query(None);
        } else {
            url.set_query(Some(&kept.join("&")));
        }
    }

    url.to_string()
}

/// RFC 2822, then RFC 3339, then a bare `YYYY-MM-DD HH:MM:SS` taken as UTC.
pub fn parse_pub_date(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc2822(s)
        .or_else(|_| DateTime::parse_from_rfc3339(s))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|n| n.and_utc())
        })
}

/// What happened to one feed during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedOutcome {
    pub feed: String,
    pub ok: bool,
    pub items: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A feed's outcome plus its items (empty on failure).
#[derive(Debug, Clone)]
pub struct FeedBatch {
    pub outcome: FeedOutcome,
    pub items: Vec<RawItem>,
}

/// Fetch one provider, turning a failure into an empty batch.
pub async fn fetch_one(provider: &dyn SourceProvider) -> FeedBatch {
    ensure_metrics_described();
    let t0 = Instant::now();
    let res = provider.fetch_latest().await;
    histogram!("signal_feed_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

    match res {
        Ok(items) => {
            counter!("signal_feed_fetch_total", "outcome" => "ok").increment(1);
            tracing::debug!(target: "ingest", feed = provider.name(), items = items.len(), "feed fetched");
            FeedBatch {
                outcome: FeedOutcome {
                    feed: provider.name().to_string(),
                    ok: true,
                    items: items.len(),
                    error: None,
                },
                items,
            }
        }
        Err(e) => {
            counter!("signal_feed_fetch_total", "outcome" => "error").increment(1);
            tracing::warn!(target: "ingest", error = ?e, feed = provider.name(), "feed error");
            FeedBatch {
                outcome: FeedOutcome {
                    feed: provider.name().to_string(),
                    ok: false,
                    items: 0,
                    error: Some(format!("{e:#}")),
                },
                items: Vec::new(),
            }
        }
    }
}

/// Fetch every provider concurrently. Results keep the providers' order;
/// a failing provider never affects the others.
pub async fn fetch_all(providers: &[Arc<dyn SourceProvider>]) -> Vec<FeedBatch> {
    join_all(providers.iter().map(|p| fetch_one(p.as_ref()))).await
}

/// An item that passed link, dedup and window checks.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub title: String,
    pub link: String,
    pub published_at: DateTime<Utc>,
    pub source: String,
    pub snippet: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DropStats {
    pub no_link: usize,
    pub duplicate: usize,
    pub bad_date: usize,
    pub out_of_window: usize,
}

impl DropStats {
    pub fn total(&self) -> usize {
        self.no_link + self.duplicate + self.bad_date + self.out_of_window
    }

    fn record(&self) {
        for (reason, n) in [
            ("no_link", self.no_link),
            ("duplicate", self.duplicate),
            ("bad_date", self.bad_date),
            ("out_of_window", self.out_of_window),
        ] {
            if n > 0 {
                counter!("signal_items_dropped_total", "reason" => reason).increment(n as u64);
            }
        }
    }
}

/// Run-scoped first-seen filter over normalized links.
#[derive(Debug, Default)]
pub struct LinkDedup {
    seen: HashSet<String>,
}

impl LinkDedup {
    pub fn new() -> Self {
        Self::default()
    }

    /// True the first time `link` is offered.
    pub fn first_seen(&mut self, link: &str) -> bool {
        self.seen.insert(link.to_string())
    }
}

/// Normalize, dedup and window-filter raw items in order. Dropped items are
/// only counted.
pub fn select(
    items: Vec<RawItem>,
    window: &TimeWindow,
    dedup: &mut LinkDedup,
) -> (Vec<Candidate>, DropStats) {
    let mut stats = DropStats::default();
    let mut out = Vec::with_capacity(items.len());

    for it in items {
        let link = normalize_link(&it.link);
        if link.is_empty() {
            stats.no_link += 1;
            continue;
        }
        if !dedup.first_seen(&link) {
            stats.duplicate += 1;
            continue;
        }
        let Some(published_at) = it.pub_date.as_deref().and_then(parse_pub_date) else {
            stats.bad_date += 1;
            continue;
        };
        if !window.contains(published_at) {
            stats.out_of_window += 1;
            continue;
        }

        let source = resolve_source(it.creator.as_deref(), it.source.as_deref(), &link);
        out.push(Candidate {
            title: normalize_text(&it.title),
            snippet: normalize_text(&it.snippet),
            link,
            published_at,
            source,
        });
    }

    stats.record();
    (out, stats)
}
