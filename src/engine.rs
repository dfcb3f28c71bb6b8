//! # Signal Engine
//! Pure aggregation: weighted per-class totals → long/short split and a
//! recommendation. No I/O, suitable for unit tests and offline evaluation.
//!
//! Policy: every scored item adds `clamp(|score|, min, max) × weightFactor` to
//! its class. Positive vs. negative weight decides the split; a direction wins
//! only when it beats the other by the hysteresis factor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::Tunables;
use crate::sentiment::{SentimentLabel, SentimentScore};
use crate::window::TimeWindow;

/// Final call for the current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Recommendation {
    Long,
    Short,
    Neutral,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassTotals {
    pub weight: f64,
    pub count: u32,
}

/// Running totals for one computation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AggregateState {
    pub positive: ClassTotals,
    pub negative: ClassTotals,
    pub neutral: ClassTotals,
}

impl AggregateState {
    /// Accumulate one item; returns the weight it contributed.
    pub fn add(&mut self, sentiment: &SentimentScore, weight_factor: f64, t: &Tunables) -> f64 {
        let contribution = sentiment.magnitude().clamp(t.magnitude_min, t.magnitude_max) * weight_factor;
        let class = match sentiment.label {
            SentimentLabel::Positive => &mut self.positive,
            SentimentLabel::Negative => &mut self.negative,
            SentimentLabel::Neutral => &mut self.neutral,
        };
        class.weight += contribution;
        class.count += 1;
        contribution
    }

    pub fn directional_weight(&self) -> f64 {
        self.positive.weight + self.negative.weight
    }

    /// `(longPct, shortPct)`; both 0 without directional weight.
    pub fn split(&self) -> (u8, u8) {
        let dir = self.directional_weight();
        if dir <= 0.0 {
            return (0, 0);
        }
        let long = (self.positive.weight / dir * 100.0).round().clamp(0.0, 100.0) as u8;
        (long, 100 - long)
    }

    pub fn recommendation(&self, hysteresis: f64) -> Recommendation {
        let (pos, neg) = (self.positive.weight, self.negative.weight);
        if pos > hysteresis * neg {
            Recommendation::Long
        } else if neg > hysteresis * pos {
            Recommendation::Short
        } else {
            Recommendation::Neutral
        }
    }
}

/// One scored article in the response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalItem {
    pub title: String,
    pub link: String,
    pub pub_date: DateTime<Utc>,
    pub source: String,
    pub sentiment: SentimentLabel,
    pub score: f64,
    /// `score × weightFactor`, 4 decimal places.
    pub weight: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counts {
    pub positive: u32,
    pub negative: u32,
    pub neutral: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Weights {
    #[serde(rename = "posW")]
    pub pos_w: f64,
    #[serde(rename = "negW")]
    pub neg_w: f64,
    #[serde(rename = "neuW")]
    pub neu_w: f64,
}

/// Body of `GET /api/signal`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalPayload {
    pub window_minutes: i64,
    pub timezone_offset_minutes: i32,
    pub generated_at: DateTime<Utc>,
    pub counts: Counts,
    pub weights: Weights,
    pub long_pct: u8,
    pub short_pct: u8,
    pub recommendation: Recommendation,
    pub items: Vec<SignalItem>,
}

impl SignalPayload {
    /// Assemble the response; items are sorted newest first (stable).
    pub fn build(
        window: &TimeWindow,
        state: &AggregateState,
        mut items: Vec<SignalItem>,
        hysteresis: f64,
    ) -> Self {
        items.sort_by(|a, b| b.pub_date.cmp(&a.pub_date));
        let (long_pct, short_pct) = state.split();
        Self {
            window_minutes: window.minutes,
            timezone_offset_minutes: window.offset_minutes,
            generated_at: window.now,
            counts: Counts {
                positive: state.positive.count,
                negative: state.negative.count,
                neutral: state.neutral.count,
            },
            weights: Weights {
                pos_w: round4(state.positive.weight),
                neg_w: round4(state.negative.weight),
                neu_w: round4(state.neutral.weight),
            },
            long_pct,
            short_pct,
            recommendation: state.recommendation(hysteresis),
            items,
        }
    }

    /// A cached snapshot served at a later `now`: window fields follow the
    /// clock, everything else stays as computed.
    pub fn refreshed_for(mut self, window: &TimeWindow) -> Self {
        self.window_minutes = window.minutes;
        self.timezone_offset_minutes = window.offset_minutes;
        self
    }
}

pub fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}
