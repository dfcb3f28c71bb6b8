//! Transformer adapter: optional ML sentiment on top of the lexicon.
//!
//! A [`ModelProvider`] owns two model tracks. Text containing Hangul goes to the
//! multilingual track, everything else to the finance-tuned track. Each track
//! loads lazily on first use by trying its candidate model ids in order; a track
//! whose candidates all fail is marked `Failed` and never retried.
//!
//! The backend is a seam ([`ClassifierBackend`]): production talks to an
//! inference endpoint over HTTP, tests inject deterministic backends.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::tunables::ModelTunables;
use crate::config::ModelConfig;
use crate::sentiment::{SentimentLabel, SentimentScore};

const TOP_K: usize = 3;
const MAX_INPUT_CHARS: usize = 512;
const PROBE_TEXT: &str = "Bitcoin price update";

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

// ------------------------------------------------------------
// Backend seam
// ------------------------------------------------------------

/// One ranked label from a classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelScore {
    pub label: String,
    pub score: f64,
}

impl LabelScore {
    pub fn new(label: impl Into<String>, score: f64) -> Self {
        Self {
            label: label.into(),
            score,
        }
    }
}

/// A loaded model.
pub trait TextClassifier: Send + Sync {
    /// Ranked `(label, probability)` pairs, best first, at most `top_k`.
    fn classify<'a>(&'a self, text: &'a str, top_k: usize)
        -> BoxFuture<'a, Result<Vec<LabelScore>>>;
    fn model_id(&self) -> &str;
}

/// Loads classifiers by model identifier.
pub trait ClassifierBackend: Send + Sync {
    fn load<'a>(&'a self, model_id: &'a str) -> BoxFuture<'a, Result<Arc<dyn TextClassifier>>>;
    fn name(&self) -> &'static str;
}

// ------------------------------------------------------------
// Tracks and provider state
// ------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelTrack {
    Finance,
    Multilingual,
}

impl ModelTrack {
    pub fn for_text(text: &str) -> Self {
        if contains_hangul(text) {
            Self::Multilingual
        } else {
            Self::Finance
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Finance => "finance",
            Self::Multilingual => "multilingual",
        }
    }
}

/// Hangul syllables, Jamo and compatibility Jamo.
pub fn contains_hangul(text: &str) -> bool {
    text.chars().any(|c| {
        matches!(c,
            '\u{AC00}'..='\u{D7A3}' | '\u{1100}'..='\u{11FF}' | '\u{3130}'..='\u{318F}')
    })
}

#[derive(Clone)]
enum TrackState {
    Unconfigured,
    Idle,
    Loading,
    Ready(Arc<dyn TextClassifier>),
    Failed,
}

/// Observable view of a track, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum TrackStatus {
    Unconfigured,
    Idle,
    Loading,
    Ready { model: String },
    Failed,
}

struct TrackSlot {
    track: ModelTrack,
    candidates: Vec<String>,
    state: Mutex<TrackState>,
    load_lock: tokio::sync::Mutex<()>,
    inference_warned: AtomicBool,
}

enum Peek {
    Ready(Arc<dyn TextClassifier>),
    Unavailable,
    NeedsLoad,
}

impl TrackSlot {
    fn new(track: ModelTrack, candidates: Vec<String>, configured: bool) -> Self {
        let state = if configured && !candidates.is_empty() {
            TrackState::Idle
        } else {
            TrackState::Unconfigured
        };
        Self {
            track,
            candidates,
            state: Mutex::new(state),
            load_lock: tokio::sync::Mutex::new(()),
            inference_warned: AtomicBool::new(false),
        }
    }

    fn get(&self) -> TrackState {
        self.state.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    fn set(&self, s: TrackState) {
        *self.state.lock().unwrap_or_else(|p| p.into_inner()) = s;
    }

    fn peek(&self) -> Peek {
        match self.get() {
            TrackState::Ready(c) => Peek::Ready(c),
            TrackState::Unconfigured | TrackState::Failed => Peek::Unavailable,
            TrackState::Idle | TrackState::Loading => Peek::NeedsLoad,
        }
    }

    fn status(&self) -> TrackStatus {
        match self.get() {
            TrackState::Unconfigured => TrackStatus::Unconfigured,
            TrackState::Idle => TrackStatus::Idle,
            TrackState::Loading => TrackStatus::Loading,
            TrackState::Ready(c) => TrackStatus::Ready {
                model: c.model_id().to_string(),
            },
            TrackState::Failed => TrackStatus::Failed,
        }
    }
}

/// Capability provider for model-based sentiment. Cheap to share behind an `Arc`.
pub struct ModelProvider {
    backend: Option<Arc<dyn ClassifierBackend>>,
    finance: TrackSlot,
    multilingual: TrackSlot,
    tunables: ModelTunables,
}

impl ModelProvider {
    /// Provider that never produces a model result.
    pub fn disabled() -> Self {
        Self {
            backend: None,
            finance: TrackSlot::new(ModelTrack::Finance, Vec::new(), false),
            multilingual: TrackSlot::new(ModelTrack::Multilingual, Vec::new(), false),
            tunables: ModelTunables::default(),
        }
    }

    pub fn new(
        backend: Arc<dyn ClassifierBackend>,
        finance_models: Vec<String>,
        multilingual_models: Vec<String>,
        tunables: ModelTunables,
    ) -> Self {
        Self {
            backend: Some(backend),
            finance: TrackSlot::new(ModelTrack::Finance, finance_models, true),
            multilingual: TrackSlot::new(ModelTrack::Multilingual, multilingual_models, true),
            tunables,
        }
    }

    /// Disabled unless `cfg.enabled`; an HTTP client that cannot be built also disables it.
    pub fn from_config(cfg: &ModelConfig, tunables: ModelTunables) -> Self {
        if !cfg.enabled {
            return Self::disabled();
        }
        match HttpClassifierBackend::new(&cfg.endpoint, cfg.api_token.clone()) {
            Ok(backend) => {
                info!(
                    target: "model",
                    backend = backend.name(),
                    finance = ?cfg.finance_models,
                    multilingual = ?cfg.multilingual_models,
                    "ML sentiment enabled"
                );
                Self::new(
                    Arc::new(backend),
                    cfg.finance_models.clone(),
                    cfg.multilingual_models.clone(),
                    tunables,
                )
            }
            Err(e) => {
                warn!(target: "model", error = ?e, "ML backend unavailable, lexicon only");
                Self::disabled()
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    pub fn status(&self, track: ModelTrack) -> TrackStatus {
        self.slot(track).status()
    }

    fn slot(&self, track: ModelTrack) -> &TrackSlot {
        match track {
            ModelTrack::Finance => &self.finance,
            ModelTrack::Multilingual => &self.multilingual,
        }
    }

    async fn classifier(&self, track: ModelTrack) -> Option<Arc<dyn TextClassifier>> {
        let backend = self.backend.as_ref()?;
        let slot = self.slot(track);
        match slot.peek() {
            Peek::Ready(c) => return Some(c),
            Peek::Unavailable => return None,
            Peek::NeedsLoad => {}
        }

        let _guard = slot.load_lock.lock().await;
        // Another caller may have finished the load while we waited.
        match slot.peek() {
            Peek::Ready(c) => return Some(c),
            Peek::Unavailable => return None,
            Peek::NeedsLoad => {}
        }

        slot.set(TrackState::Loading);
        for model_id in &slot.candidates {
            match backend.load(model_id).await {
                Ok(c) => {
                    info!(target: "model", track = track.as_str(), model_id = %model_id, "model loaded");
                    slot.set(TrackState::Ready(c.clone()));
                    return Some(c);
                }
                Err(e) => {
                    warn!(target: "model", track = track.as_str(), model_id = %model_id, error = ?e, "model load failed");
                }
            }
        }

        warn!(target: "model", track = track.as_str(), "no model candidate loaded; track disabled");
        slot.set(TrackState::Failed);
        None
    }

    /// Model sentiment for `text`, or `None` when the model path is unavailable
    /// or inference fails. Never errors.
    pub async fn score(&self, text: &str) -> Option<SentimentScore> {
        if !self.is_enabled() {
            return None;
        }
        let track = ModelTrack::for_text(text);
        let clf = self.classifier(track).await?;
        let input: String = text.chars().take(MAX_INPUT_CHARS).collect();

        match clf.classify(&input, TOP_K).await {
            Ok(labels) if !labels.is_empty() => {
                Some(interpret(aggregate(&labels), &self.tunables))
            }
            Ok(_) => None,
            Err(e) => {
                let slot = self.slot(track);
                if !slot.inference_warned.swap(true, Ordering::Relaxed) {
                    warn!(
                        target: "model",
                        track = slot.track.as_str(),
                        model_id = clf.model_id(),
                        error = ?e,
                        "inference failed; falling back to lexicon"
                    );
                }
                counter!("signal_model_fallbacks_total").increment(1);
                None
            }
        }
    }
}

// ------------------------------------------------------------
// Label mapping and interpretation
// ------------------------------------------------------------

/// Per-class probabilities.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClassProbs {
    pub positive: f64,
    pub negative: f64,
    pub neutral: f64,
}

/// Map a model label to a class. Named schemes match by substring; anything
/// else uses the index convention 0/1/2 → negative/neutral/positive, taking the
/// index from a trailing number (`LABEL_2`) or, failing that, from `rank`.
///
/// The index convention only holds for models trained with that label order;
/// a model with a different order would silently invert the signal.
pub fn map_label(label: &str, rank: usize) -> SentimentLabel {
    let l = label.to_lowercase();
    if l.contains("neg") || l.contains("bear") {
        SentimentLabel::Negative
    } else if l.contains("pos") || l.contains("bull") {
        SentimentLabel::Positive
    } else if l.contains("neu") {
        SentimentLabel::Neutral
    } else {
        let idx = l
            .rsplit(|c: char| !c.is_ascii_digit())
            .next()
            .and_then(|d| d.parse::<usize>().ok())
            .unwrap_or(rank);
        match idx {
            0 => SentimentLabel::Negative,
            2 => SentimentLabel::Positive,
            _ => SentimentLabel::Neutral,
        }
    }
}

/// Per-class max probability over the ranked labels.
pub fn aggregate(labels: &[LabelScore]) -> ClassProbs {
    let mut p = ClassProbs::default();
    for (rank, ls) in labels.iter().enumerate() {
        let slot = match map_label(&ls.label, rank) {
            SentimentLabel::Positive => &mut p.positive,
            SentimentLabel::Negative => &mut p.negative,
            SentimentLabel::Neutral => &mut p.neutral,
        };
        *slot = slot.max(ls.score);
    }
    p
}

/// Turn class probabilities into a signed score.
pub fn interpret(p: ClassProbs, t: &ModelTunables) -> SentimentScore {
    let strongest = p.positive.max(p.negative).max(p.neutral);
    let margin = p.positive - p.negative;
    if strongest < t.min_confidence || margin.abs() < t.min_margin {
        return SentimentScore::neutral();
    }
    let magnitude = (t.magnitude_scale * margin.abs()).max(t.min_magnitude);
    SentimentScore::from_score(magnitude.copysign(margin))
}

// ------------------------------------------------------------
// HTTP backend (Hugging Face style inference endpoint)
// ------------------------------------------------------------

/// POSTs `{"inputs": text, "parameters": {"top_k": k}}` to `{endpoint}/{model_id}`.
pub struct HttpClassifierBackend {
    http: reqwest::Client,
    endpoint: String,
    token: Option<String>,
}

impl HttpClassifierBackend {
    pub fn new(endpoint: &str, token: Option<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent("crypto-news-signal/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(15))
            .build()
            .context("building inference http client")?;
        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            token,
        })
    }
}

impl ClassifierBackend for HttpClassifierBackend {
    fn load<'a>(&'a self, model_id: &'a str) -> BoxFuture<'a, Result<Arc<dyn TextClassifier>>> {
        Box::pin(async move {
            let clf = HttpClassifier {
                http: self.http.clone(),
                url: format!("{}/{}", self.endpoint, model_id),
                token: self.token.clone(),
                model_id: model_id.to_string(),
            };
            // A load is a trial call; the endpoint answers only for models it can serve.
            clf.classify(PROBE_TEXT, 1)
                .await
                .with_context(|| format!("probing model {model_id}"))?;
            Ok(Arc::new(clf) as Arc<dyn TextClassifier>)
        })
    }

    fn name(&self) -> &'static str {
        "http-inference"
    }
}

struct HttpClassifier {
    http: reqwest::Client,
    url: String,
    token: Option<String>,
    model_id: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum InferenceResponse {
    Nested(Vec<Vec<LabelScore>>),
    Flat(Vec<LabelScore>),
    Error { error: String },
}

impl TextClassifier for HttpClassifier {
    fn classify<'a>(
        &'a self,
        text: &'a str,
        top_k: usize,
    ) -> BoxFuture<'a, Result<Vec<LabelScore>>> {
        Box::pin(async move {
            let body = serde_json::json!({
                "inputs": text,
                "parameters": { "top_k": top_k },
            });
            let mut req = self.http.post(&self.url).json(&body);
            if let Some(t) = &self.token {
                req = req.bearer_auth(t);
            }
            let resp = req.send().await.context("inference request")?;
            let status = resp.status();
            let parsed: InferenceResponse = resp.json().await.context("inference body")?;

            let mut labels = match parsed {
                InferenceResponse::Nested(mut v) if !v.is_empty() => v.swap_remove(0),
                InferenceResponse::Nested(_) => Vec::new(),
                InferenceResponse::Flat(v) => v,
                InferenceResponse::Error { error } => {
                    return Err(anyhow!("inference error ({status}): {error}"))
                }
            };
            if !status.is_success() {
                return Err(anyhow!("inference status {status}"));
            }
            labels.sort_by(|a, b| b.score.total_cmp(&a.score));
            labels.truncate(top_k);
            Ok(labels)
        })
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
