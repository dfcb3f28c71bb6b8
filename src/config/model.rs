// src/config/model.rs
use serde::{Deserialize, Serialize};

use super::{env_bool, env_list, env_string};

pub const DEFAULT_INFERENCE_URL: &str = "https://api-inference.huggingface.co/models";

/// Finance-tuned candidates, tried in order.
pub const DEFAULT_FINANCE_MODELS: &[&str] = &["ProsusAI/finbert", "yiyanghkust/finbert-tone"];

/// Multilingual candidates (used for Hangul text), tried in order.
pub const DEFAULT_MULTILINGUAL_MODELS: &[&str] = &[
    "cardiffnlp/twitter-xlm-roberta-base-sentiment",
    "lxyuan/distilbert-base-multilingual-cased-sentiments-student",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub enabled: bool,
    /// Base URL of the inference endpoint; the model id is appended as a path.
    pub endpoint: String,
    /// Bearer token for the endpoint. Never logged.
    #[serde(skip_serializing)]
    pub api_token: Option<String>,
    pub finance_models: Vec<String>,
    pub multilingual_models: Vec<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: DEFAULT_INFERENCE_URL.to_string(),
            api_token: None,
            finance_models: owned(DEFAULT_FINANCE_MODELS),
            multilingual_models: owned(DEFAULT_MULTILINGUAL_MODELS),
        }
    }
}

impl ModelConfig {
    /// ENABLE_ML, ML_INFERENCE_URL, ML_API_TOKEN, ML_FINANCE_MODELS, ML_MULTILINGUAL_MODELS.
    /// Empty override lists keep the built-in candidates.
    pub fn from_env() -> Self {
        let d = Self::default();
        let finance = env_list("ML_FINANCE_MODELS");
        let multilingual = env_list("ML_MULTILINGUAL_MODELS");
        Self {
            enabled: env_bool("ENABLE_ML", false),
            endpoint: env_string("ML_INFERENCE_URL")
                .map(|s| s.trim_end_matches('/').to_string())
                .unwrap_or(d.endpoint),
            api_token: env_string("ML_API_TOKEN"),
            finance_models: if finance.is_empty() {
                d.finance_models
            } else {
                finance
            },
            multilingual_models: if multilingual.is_empty() {
                d.multilingual_models
            } else {
                multilingual
            },
        }
    }
}

fn owned(xs: &[&str]) -> Vec<String> {
    xs.iter().map(|s| s.to_string()).collect()
}
