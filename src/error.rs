//! Error taxonomy for the inference pipeline.

use std::path::PathBuf;

/// Everything that can go wrong between receiving image bytes and producing a
/// probability.
#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    /// Malformed base64 or an undecodable raster.
    #[error("{0}")]
    Decode(String),

    /// The model file does not exist.
    #[error("Model file not found at {}", .0.display())]
    ModelNotFound(PathBuf),

    /// The model file exists but could not be parsed or optimized.
    #[error("Failed to load model: {0}")]
    ModelLoad(String),

    /// The forward pass failed or produced an unusable output.
    #[error("Inference failed: {0}")]
    Inference(String),

    /// A blocking worker panicked or was cancelled.
    #[error("Worker task failed: {0}")]
    Task(String),
}

impl InferenceError {
    /// True for the variants that mean "there is no usable model yet".
    pub fn is_model_unavailable(&self) -> bool {
        matches!(self, Self::ModelNotFound(_) | Self::ModelLoad(_))
    }
}

impl From<tokio::task::JoinError> for InferenceError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::Task(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_not_found_message_names_path() {
        let err = InferenceError::ModelNotFound(PathBuf::from("missing.onnx"));
        assert_eq!(err.to_string(), "Model file not found at missing.onnx");
        assert!(err.is_model_unavailable());
    }

    #[test]
    fn test_decode_message_is_passed_through() {
        let err = InferenceError::Decode("Invalid base64: bad padding".to_string());
        assert_eq!(err.to_string(), "Invalid base64: bad padding");
        assert!(!err.is_model_unavailable());
    }
}
