use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use shuttle_axum::axum::{
    extract::{Query, State},
    http::{header, HeaderName, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer};

use crate::config::parse_flag;
use crate::signal::SignalService;

pub const CACHE_HEADER: &str = "x-signal-cache";

#[derive(Clone)]
pub struct AppState {
    service: Arc<SignalService>,
}

impl AppState {
    pub fn new(service: Arc<SignalService>) -> Self {
        Self { service }
    }
}

pub fn router(service: Arc<SignalService>) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/signal", any(signal))
        .route("/debug/feeds", get(debug_feeds))
        .route("/debug/models", get(debug_models))
        .layer(CorsLayer::very_permissive())
        .layer(CatchPanicLayer::custom(panic_response))
        .with_state(AppState::new(service))
}

/// Handler-level failure: logged with its cause, answered with a generic 500.
pub struct AppError(anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!(target: "api", error = ?self.0, "request failed");
        internal_error()
    }
}

fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "error": "internal error" })),
    )
        .into_response()
}

/// A panicking handler gets the same 500 body as any other failure.
fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic payload"
    };
    tracing::error!(target: "api", panic = %detail, "handler panicked");
    internal_error()
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

/// `force`, `force=1`, `force=true`, `force=yes` all bypass the response cache.
fn force_requested(params: &HashMap<String, String>) -> bool {
    params
        .get("force")
        .is_some_and(|v| v.trim().is_empty() || parse_flag(v) == Some(true))
}

async fn signal(
    State(state): State<AppState>,
    method: Method,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, AppError> {
    if method != Method::GET {
        return Ok((
            StatusCode::METHOD_NOT_ALLOWED,
            [(header::ALLOW, "GET")],
            Json(serde_json::json!({ "error": "method not allowed" })),
        )
            .into_response());
    }

    let force = force_requested(&params);
    let (payload, status) = state.service.compute(force).await?;

    let mut resp = Json(payload).into_response();
    resp.headers_mut().insert(
        HeaderName::from_static(CACHE_HEADER),
        HeaderValue::from_static(status.as_str()),
    );
    Ok(resp)
}

async fn debug_feeds(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.service.last_feed_report())
}

async fn debug_models(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.service.model_status())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(q: &[(&str, &str)]) -> HashMap<String, String> {
        q.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    async fn error_body(resp: Response) -> serde_json::Value {
        let bytes = shuttle_axum::axum::body::to_bytes(resp.into_body(), 64 * 1024)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn app_error_is_a_generic_500() {
        let resp = AppError::from(anyhow::anyhow!("db password leaked in message")).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            resp.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
        let v = error_body(resp).await;
        assert_eq!(v, serde_json::json!({ "error": "internal error" }));
    }

    #[tokio::test]
    async fn panic_payloads_map_to_the_same_500() {
        for payload in [
            Box::new("static str") as Box<dyn Any + Send>,
            Box::new(String::from("owned")),
            Box::new(42_u8),
        ] {
            let resp = panic_response(payload);
            assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(error_body(resp).await["error"], "internal error");
        }
    }

    #[test]
    fn force_flag_forms() {
        assert!(force_requested(&params(&[("force", "")])));
        assert!(force_requested(&params(&[("force", "1")])));
        assert!(force_requested(&params(&[("force", "TRUE")])));
        assert!(force_requested(&params(&[("force", "yes")])));
        assert!(!force_requested(&params(&[("force", "0")])));
        assert!(!force_requested(&params(&[("force", "maybe")])));
        assert!(!force_requested(&params(&[])));
    }
}
