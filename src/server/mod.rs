//! HTTP server for the PneumoGuard inference service.
//!
//! Endpoints:
//! - `POST /predict`: base64 chest X-ray in, prediction and recommendations out
//! - `GET /health`: liveness plus whether the model is loaded
//! - `GET /stats`: in-memory usage counters
//!
//! The model is loaded once at startup. If that fails the server still
//! starts, and every `/predict` retries the load until it succeeds.
//! CORS is open to every origin, method and header.

pub mod handlers;
pub mod metrics;
pub mod types;

pub use handlers::{health_handler, predict_handler, stats_handler, ApiError};
pub use metrics::UsageMetrics;
pub use types::{
    EndpointStats, ErrorResponse, HealthResponse, ModelStats, PredictRequest, PredictionStats,
    RequestStats, ServerConfig, SeverityStats, StatsResponse, DEFAULT_MAX_BODY_BYTES,
    DEFAULT_PORT,
};

use std::sync::Arc;
use std::time::Instant;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use chrono::{DateTime, Utc};
use eyre::{Result, WrapErr};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::model::ModelHandle;

// ---------------------------------------------------------------------------
// Server state
// ---------------------------------------------------------------------------

pub struct ServerState {
    pub config: ServerConfig,
    pub model: ModelHandle,
    pub start_time: Instant,
    pub started_at: DateTime<Utc>,
    pub usage: UsageMetrics,
}

impl ServerState {
    /// State backed by the ONNX model at `config.model_path`. Nothing is loaded yet.
    pub fn new(config: ServerConfig) -> Self {
        let model = ModelHandle::onnx(config.model_path.clone());
        Self::with_model(config, model)
    }

    /// State with an injected model handle.
    pub fn with_model(config: ServerConfig, model: ModelHandle) -> Self {
        Self {
            config,
            model,
            start_time: Instant::now(),
            started_at: Utc::now(),
            usage: UsageMetrics::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// HTTP server
// ---------------------------------------------------------------------------

/// Build the application router over shared state.
pub fn router(state: Arc<ServerState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let max_body_bytes = state.config.max_body_bytes;

    Router::new()
        .route("/predict", post(predict_handler))
        .route("/health", get(health_handler))
        .route("/stats", get(stats_handler))
        .layer(cors)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(state)
}

/// Run the HTTP server until SIGINT/SIGTERM.
pub async fn run_server(config: ServerConfig) -> Result<()> {
    let bind_addr = config.bind_addr;
    let state = Arc::new(ServerState::new(config));

    info!(model = %state.model.path().display(), "loading model");
    match state.model.ensure_loaded().await {
        Ok(model) => info!(
            hash = model.hash.as_deref().unwrap_or("unavailable"),
            "model ready"
        ),
        Err(e) => warn!(
            error = %e,
            "Error loading model; /predict will retry on each request"
        ),
    }

    let app = router(state.clone());

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .wrap_err_with(|| format!("failed to bind {bind_addr}"))?;
    info!(bind = %bind_addr, "PneumoGuard server listening");
    info!("Endpoints: POST /predict, GET /health, GET /stats");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!(
        total_requests = state
            .usage
            .total_requests
            .load(std::sync::atomic::Ordering::Relaxed),
        "server stopped"
    );
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down gracefully"),
        _ = sigterm => info!("received SIGTERM, shutting down gracefully"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_response_serialization() {
        let response = HealthResponse {
            status: "healthy".to_string(),
            model_loaded: false,
        };
        let json = serde_json::to_string(&response).unwrap();
        assert_eq!(json, r#"{"status":"healthy","model_loaded":false}"#);
    }

    #[test]
    fn test_predict_request_deserialization() {
        let req: PredictRequest =
            serde_json::from_str(r#"{"image": "data:image/png;base64,AAAA"}"#).unwrap();
        assert_eq!(req.image, "data:image/png;base64,AAAA");
        assert!(serde_json::from_str::<PredictRequest>(r#"{"img": "AAAA"}"#).is_err());
        assert!(serde_json::from_str::<PredictRequest>(r#"{"image": 5}"#).is_err());
    }

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr.port(), 8000);
        assert!(config.bind_addr.ip().is_unspecified());
        assert_eq!(
            config.model_path,
            std::path::PathBuf::from("pneumonia_detection_model.onnx")
        );
        assert_eq!(config.max_body_bytes, 32 * 1024 * 1024);
    }

    #[test]
    fn test_new_state_is_unloaded() {
        let state = ServerState::new(ServerConfig::default());
        assert!(!state.model.is_loaded());
        assert_eq!(
            state
                .usage
                .total_requests
                .load(std::sync::atomic::Ordering::Relaxed),
            0
        );
    }

    #[test]
    fn test_stats_response_serialization() {
        let response = StatsResponse {
            uptime_seconds: 3600,
            started_at: "2026-01-01T00:00:00+00:00".to_string(),
            model: ModelStats {
                path: "m.onnx".to_string(),
                loaded: true,
                hash: Some("sha256:abc".to_string()),
                loaded_at: None,
            },
            requests: RequestStats {
                total: 10,
                errors: 1,
                avg_processing_ms: 12.5,
            },
            predictions: PredictionStats {
                normal: 6,
                pneumonia: 3,
            },
            severity: SeverityStats {
                mild: 1,
                moderate: 1,
                severe: 1,
            },
            endpoints: EndpointStats {
                predict: 10,
                health: 4,
                stats: 1,
            },
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["model"]["hash"], "sha256:abc");
        assert!(json["model"].get("loaded_at").is_none());
        assert_eq!(json["predictions"]["pneumonia"], 3);
        assert_eq!(json["endpoints"]["health"], 4);
    }
}
