use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Three-way sentiment class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

impl SentimentLabel {
    pub fn from_sign(score: f64) -> Self {
        if score > 0.0 {
            Self::Positive
        } else if score < 0.0 {
            Self::Negative
        } else {
            Self::Neutral
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::Neutral => "neutral",
        }
    }
}

/// Signed sentiment: the sign is the direction, the magnitude the strength.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentScore {
    pub label: SentimentLabel,
    pub score: f64,
}

impl SentimentScore {
    /// Label follows the sign of `score`.
    pub fn from_score(score: f64) -> Self {
        let score = if score.is_finite() { score } else { 0.0 };
        Self {
            label: SentimentLabel::from_sign(score),
            score,
        }
    }

    pub fn neutral() -> Self {
        Self::from_score(0.0)
    }

    pub fn magnitude(&self) -> f64 {
        self.score.abs()
    }

    pub fn is_neutral(&self) -> bool {
        self.label == SentimentLabel::Neutral
    }
}

// Korean entries cover the ko-KR search feed; the tokenizer keeps Hangul as alphanumeric.
static POSITIVE: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "rally", "rallies", "rallied", "surge", "surges", "surged", "soar", "soars", "soared",
        "bull", "bulls", "bullish", "gain", "gains", "jump", "jumps", "climb", "climbs",
        "rebound", "rebounds", "recover", "recovery", "breakout", "record", "ath", "high",
        "highs", "adoption", "approve", "approves", "approved", "approval", "inflow", "inflows",
        "upgrade", "partnership", "launch", "launches", "accumulate", "accumulation", "buy",
        "buying", "optimism", "optimistic", "growth", "outperform", "green", "pump",
        "상승", "급등", "호재", "강세", "반등", "최고",
    ]
    .into_iter()
    .collect()
});

static NEGATIVE: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "hack", "hacked", "hacker", "exploit", "exploited", "stolen", "theft", "scam", "fraud",
        "rug", "rugpull", "crash", "crashes", "crashed", "plunge", "plunges", "plunged", "dump",
        "dumps", "bear", "bears", "bearish", "selloff", "sell-off", "slump", "slumps", "drop",
        "drops", "fall", "falls", "fell", "decline", "declines", "tumble", "tumbles", "lawsuit",
        "sue", "sues", "ban", "bans", "banned", "crackdown", "liquidation", "liquidations",
        "outflow", "outflows", "bankrupt", "bankruptcy", "insolvent", "insolvency", "delay",
        "delays", "reject", "rejects", "rejected", "fear", "fears", "loss", "losses", "warning",
        "하락", "급락", "악재", "약세", "해킹", "폭락",
    ]
    .into_iter()
    .collect()
});

/// Deterministic keyword scorer.
#[derive(Debug, Clone, Default)]
pub struct SentimentAnalyzer;

impl SentimentAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Score `title + snippet`: +1 per positive keyword token, −1 per negative one.
    pub fn score(&self, title: &str, snippet: &str) -> SentimentScore {
        let text = format!("{title} {snippet}");
        let (pos, neg) = tokenize(&text).fold((0i32, 0i32), |(p, n), tok| {
            if POSITIVE.contains(tok.as_str()) {
                (p + 1, n)
            } else if NEGATIVE.contains(tok.as_str()) {
                (p, n + 1)
            } else {
                (p, n)
            }
        });
        SentimentScore::from_score(f64::from(pos - neg))
    }
}

/// Lowercase tokens made of alphanumerics and hyphens.
pub fn tokenize(s: &str) -> impl Iterator<Item = String> + '_ {
    s.split(|c: char| !(c.is_alphanumeric() || c == '-'))
        .map(|t| t.trim_matches('-'))
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}
