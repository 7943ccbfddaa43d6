//! Request/response types and configuration for the PneumoGuard server.

use std::net::SocketAddr;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::model::DEFAULT_MODEL_PATH;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Default listening port when neither `--port` nor `PORT` is given.
pub const DEFAULT_PORT: u16 = 8000;

/// Maximum request body size in bytes (32 MiB). Base64 inflates images by a
/// third, so this admits X-rays of roughly 24 MB.
pub const DEFAULT_MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,
    /// ONNX image classifier, loaded at startup and retried per request until it succeeds
    pub model_path: PathBuf,
    /// Request body limit for `/predict`
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

/// Body of `POST /predict`.
#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    /// Base64 image, optionally prefixed with a `data:<mime>;base64,` header
    pub image: String,
}

/// Error body for every non-2xx response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model_loaded: bool,
}

/// Stats response
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub uptime_seconds: u64,
    pub started_at: String,
    pub model: ModelStats,
    pub requests: RequestStats,
    pub predictions: PredictionStats,
    pub severity: SeverityStats,
    pub endpoints: EndpointStats,
}

#[derive(Debug, Serialize)]
pub struct ModelStats {
    pub path: String,
    pub loaded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loaded_at: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RequestStats {
    pub total: u64,
    pub errors: u64,
    pub avg_processing_ms: f64,
}

#[derive(Debug, Serialize)]
pub struct PredictionStats {
    pub normal: u64,
    pub pneumonia: u64,
}

#[derive(Debug, Serialize)]
pub struct SeverityStats {
    pub mild: u64,
    pub moderate: u64,
    pub severe: u64,
}

#[derive(Debug, Serialize)]
pub struct EndpointStats {
    pub predict: u64,
    pub health: u64,
    pub stats: u64,
}
