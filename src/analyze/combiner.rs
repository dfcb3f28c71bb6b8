//! Merge the lexicon score with an optional model score.
//!
//! Policy:
//! - no model result → lexicon
//! - model neutral, lexicon directional → lexicon
//! - lexicon zero → model
//! - both directional → the larger magnitude wins; ties keep the lexicon

use crate::sentiment::SentimentScore;

pub fn combine(lexicon: SentimentScore, model: Option<SentimentScore>) -> SentimentScore {
    let Some(model) = model else {
        return lexicon;
    };
    if lexicon.score == 0.0 {
        return model;
    }
    if model.is_neutral() {
        return lexicon;
    }
    if model.magnitude() > lexicon.magnitude() {
        model
    } else {
        lexicon
    }
}
