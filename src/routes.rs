//! HTTP routes: liveness, payment page, prediction

use crate::config::PagesConfig;
use crate::error::ApiError;
use crate::metrics::ServiceMetrics;
use crate::models::InferenceEngine;
use crate::types::{PredictRequest, PredictResponse};
use anyhow::Context;
use axum::{
    extract::State,
    response::Html,
    routing::{get, post},
    Json, Router,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

/// Text returned by `GET /`
pub const HOME_MESSAGE: &str = "UPI Fraud Detection API is running!";

/// Template rendered by `GET /pay`
pub const PAYMENT_TEMPLATE: &str = "payment.html";

/// URL prefix for static assets
pub const STATIC_PREFIX: &str = "/static";

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<InferenceEngine>,
    pub metrics: Arc<ServiceMetrics>,
    pub pages: Arc<PagesConfig>,
}

impl AppState {
    pub fn new(engine: InferenceEngine, metrics: Arc<ServiceMetrics>, pages: PagesConfig) -> Self {
        Self {
            engine: Arc::new(engine),
            metrics,
            pages: Arc::new(pages),
        }
    }
}

/// Build the router with all endpoints and middleware
pub fn router(state: AppState) -> Router {
    let static_files = ServeDir::new(&state.pages.static_dir);

    Router::new()
        .route("/", get(home))
        .route("/pay", get(pay))
        .route("/predict", post(predict))
        .route("/health", get(health))
        .nest_service(STATIC_PREFIX, static_files)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn home() -> &'static str {
    HOME_MESSAGE
}

/// Liveness probe
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "alive",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// Render the payment page template
pub async fn pay(State(state): State<AppState>) -> Result<Html<String>, ApiError> {
    let path = Path::new(&state.pages.template_dir).join(PAYMENT_TEMPLATE);
    let template = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("Failed to read template {:?}", path))?;

    Ok(Html(render_template(&template)))
}

/// Substitute the static asset prefix into a template
pub fn render_template(template: &str) -> String {
    template.replace("{{ static_url }}", STATIC_PREFIX)
}

/// Classify a submitted feature vector
pub async fn predict(
    State(state): State<AppState>,
    Json(req): Json<PredictRequest>,
) -> Result<Json<PredictResponse>, ApiError> {
    let request_id = Uuid::new_v4();
    let start = Instant::now();
    let feature_count = req.features.len();

    let engine = state.engine.clone();
    let outcome = tokio::task::spawn_blocking(move || engine.predict(&req.features))
        .await
        .context("Inference task failed")
        .and_then(|result| result);

    let result = match outcome {
        Ok(result) => result,
        Err(e) => {
            state.metrics.record_failure();
            return Err(ApiError(e.context(format!("Prediction {} failed", request_id))));
        }
    };

    let latency = start.elapsed();
    state.metrics.record_prediction(latency, result.label);

    info!(
        request_id = %request_id,
        features = feature_count,
        prediction = %result.label,
        latency_us = latency.as_micros(),
        "Prediction served"
    );

    Ok(Json(PredictResponse {
        prediction: result.label,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::inference::tests::test_engine;
    use crate::types::Label;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
        response::Response,
    };
    use std::sync::atomic::Ordering;
    use tower::ServiceExt;

    fn test_state(pages: PagesConfig) -> AppState {
        let (engine, _) = test_engine(10.0);
        AppState::new(engine, Arc::new(ServiceMetrics::new()), pages)
    }

    fn default_pages() -> PagesConfig {
        PagesConfig {
            template_dir: "templates".to_string(),
            static_dir: "static".to_string(),
        }
    }

    fn predict_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/predict")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_home() {
        let app = router(test_state(default_pages()));

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, HOME_MESSAGE);
    }

    #[tokio::test]
    async fn test_health() {
        let app = router(test_state(default_pages()));

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(json["status"], "alive");
        assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_predict_fraud_and_not_fraud() {
        let state = test_state(default_pages());
        let metrics = state.metrics.clone();
        let app = router(state);

        let response = app
            .clone()
            .oneshot(predict_request(r#"{"features": [100000, 0, 1, 0, 250.0]}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: PredictResponse = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body.prediction, Label::Fraud);

        let response = app
            .oneshot(predict_request(r#"{"features": [100000, 0, 1, 0, 12.5]}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, r#"{"prediction":"Not Fraud"}"#);

        assert_eq!(metrics.predictions_served.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.fraud_predictions.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_predict_too_few_features_is_server_error() {
        let state = test_state(default_pages());
        let metrics = state.metrics.clone();
        let app = router(state);

        let response = app
            .oneshot(predict_request(r#"{"features": [42.0]}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_string(response).await, "Internal Server Error");
        assert_eq!(metrics.predictions_failed.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_predict_malformed_body_is_rejected() {
        let app = router(test_state(default_pages()));

        let missing_key = app
            .clone()
            .oneshot(predict_request(r#"{"values": [1, 2]}"#))
            .await
            .unwrap();
        assert!(missing_key.status().is_client_error());

        let not_numeric = app
            .oneshot(predict_request(r#"{"features": ["a", "b"]}"#))
            .await
            .unwrap();
        assert!(not_numeric.status().is_client_error());
    }

    #[tokio::test]
    async fn test_pay_renders_template() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(PAYMENT_TEMPLATE),
            r#"<script src="{{ static_url }}/script.js"></script>"#,
        )
        .unwrap();
        let pages = PagesConfig {
            template_dir: dir.path().to_string_lossy().into_owned(),
            static_dir: "static".to_string(),
        };
        let app = router(test_state(pages));

        let response = app
            .oneshot(Request::builder().uri("/pay").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers().get(header::CONTENT_TYPE).unwrap();
        assert!(content_type.to_str().unwrap().contains("text/html"));
        assert_eq!(
            body_string(response).await,
            r#"<script src="/static/script.js"></script>"#
        );
    }

    #[tokio::test]
    async fn test_pay_missing_template_is_server_error() {
        let dir = tempfile::tempdir().unwrap();
        let pages = PagesConfig {
            template_dir: dir.path().to_string_lossy().into_owned(),
            static_dir: "static".to_string(),
        };
        let app = router(test_state(pages));

        let response = app
            .oneshot(Request::builder().uri("/pay").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_static_assets_served() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("app.js"), "console.log('ok');").unwrap();
        let pages = PagesConfig {
            template_dir: "templates".to_string(),
            static_dir: dir.path().to_string_lossy().into_owned(),
        };
        let app = router(test_state(pages));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/static/app.js")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "console.log('ok');");
    }
}
