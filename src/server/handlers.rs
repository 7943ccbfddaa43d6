//! HTTP endpoint handler functions.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::warn;

use crate::error::InferenceError;
use crate::report::PredictionResult;

use super::types::*;
use super::ServerState;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Everything a handler can fail with, rendered as `{"detail": "..."}`.
#[derive(Debug)]
pub enum ApiError {
    /// Body is not a JSON object with a string `image` field.
    InvalidRequest(String),
    /// The model could not be loaded on this request either.
    ModelUnavailable(InferenceError),
    /// Decode, preprocessing or forward-pass failure.
    Processing(InferenceError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::ModelUnavailable(_) | Self::Processing(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn detail(&self) -> String {
        match self {
            Self::InvalidRequest(msg) => msg.clone(),
            Self::ModelUnavailable(e) => format!("Model not loaded: {e}"),
            Self::Processing(e) => e.to_string(),
        }
    }
}

impl From<InferenceError> for ApiError {
    fn from(e: InferenceError) -> Self {
        if e.is_model_unavailable() {
            Self::ModelUnavailable(e)
        } else {
            Self::Processing(e)
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(ErrorResponse { detail: self.detail() })).into_response()
    }
}

// ---------------------------------------------------------------------------
// Shared prediction logic
// ---------------------------------------------------------------------------

async fn run_prediction(state: &ServerState, body: &[u8]) -> Result<PredictionResult, ApiError> {
    let request: PredictRequest = serde_json::from_slice(body)
        .map_err(|e| ApiError::InvalidRequest(format!("Invalid request body: {e}")))?;

    let model = state
        .model
        .ensure_loaded()
        .await
        .map_err(ApiError::ModelUnavailable)?;

    // Decode, resize and the forward pass are CPU-bound.
    let classifier = Arc::clone(&model.classifier);
    let result = tokio::task::spawn_blocking(move || {
        crate::classify(classifier.as_ref(), &request.image)
    })
    .await
    .map_err(InferenceError::from)??;

    Ok(result)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

pub async fn predict_handler(
    State(state): State<Arc<ServerState>>,
    body: Bytes,
) -> Result<Json<PredictionResult>, ApiError> {
    let start = Instant::now();
    state.usage.ep_predict.fetch_add(1, Ordering::Relaxed);

    match run_prediction(&state, &body).await {
        Ok(result) => {
            let processing_time_ms = start.elapsed().as_millis() as u64;
            state.usage.record(&result, processing_time_ms);
            tracing::info!(
                prediction = result.prediction.as_str(),
                probability = result.pneumonia_probability,
                severity = result.severity().map(|s| s.as_str()).unwrap_or("none"),
                processing_time_ms,
                "prediction served"
            );
            Ok(Json(result))
        }
        Err(e) => {
            state.usage.record_error();
            warn!(status = %e.status(), detail = %e.detail(), "prediction failed");
            Err(e)
        }
    }
}

pub async fn health_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    state.usage.ep_health.fetch_add(1, Ordering::Relaxed);
    Json(HealthResponse {
        status: "healthy".to_string(),
        model_loaded: state.model.is_loaded(),
    })
}

pub async fn stats_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    state.usage.ep_stats.fetch_add(1, Ordering::Relaxed);

    let loaded = state.model.get();
    let usage = &state.usage;
    Json(StatsResponse {
        uptime_seconds: state.start_time.elapsed().as_secs(),
        started_at: state.started_at.to_rfc3339(),
        model: ModelStats {
            path: state.model.path().display().to_string(),
            loaded: loaded.is_some(),
            hash: loaded.as_ref().and_then(|m| m.hash.clone()),
            loaded_at: loaded.as_ref().map(|m| m.loaded_at.to_rfc3339()),
        },
        requests: RequestStats {
            total: usage.total_requests.load(Ordering::Relaxed),
            errors: usage.total_errors.load(Ordering::Relaxed),
            avg_processing_ms: usage.avg_processing_ms(),
        },
        predictions: PredictionStats {
            normal: usage.normal.load(Ordering::Relaxed),
            pneumonia: usage.pneumonia.load(Ordering::Relaxed),
        },
        severity: SeverityStats {
            mild: usage.mild.load(Ordering::Relaxed),
            moderate: usage.moderate.load(Ordering::Relaxed),
            severe: usage.severe.load(Ordering::Relaxed),
        },
        endpoints: EndpointStats {
            predict: usage.ep_predict.load(Ordering::Relaxed),
            health: usage.ep_health.load(Ordering::Relaxed),
            stats: usage.ep_stats.load(Ordering::Relaxed),
        },
    })
}
