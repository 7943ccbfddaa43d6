//! PneumoGuard: chest X-ray pneumonia screening.
//!
//! Turns a base64 image into a pneumonia probability, a severity tier and a
//! fixed list of recommendations:
//! - **Normal**: probability ≤ 0.5
//! - **Mild**: 0.5 < p ≤ 0.8
//! - **Moderate**: 0.8 < p ≤ 0.9
//! - **Severe**: p > 0.9
//!
//! The classifier itself is an opaque ONNX model run with `tract`. Everything
//! after the forward pass is a pure function of the probability.
//!
//! Uses structured logging via [`tracing`]. Set the `RUST_LOG` environment
//! variable to control log verbosity (e.g., `RUST_LOG=pneumoguard=debug`).

pub mod classifier;
pub mod error;
pub mod inspect;
pub mod model;
pub mod preprocess;
pub mod recommend;
pub mod report;
pub mod server;
pub mod severity;
pub mod tabular;

use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::classifier::Classifier;
use crate::error::InferenceError;
use crate::report::PredictionResult;

pub use crate::severity::Severity;

/// Version prefix for model hashes.
const MODEL_HASH_PREFIX: &str = "sha256:";

/// Normalize the image, run the classifier and assemble the result.
///
/// CPU-bound; async callers should run it on the blocking pool.
pub fn classify(
    classifier: &dyn Classifier,
    image_data: &str,
) -> Result<PredictionResult, InferenceError> {
    let tensor = preprocess::normalize_image(image_data)?;
    let probability = f64::from(classifier.predict(&tensor)?);
    let result = PredictionResult::from_probability(probability);

    tracing::debug!(
        probability,
        prediction = result.prediction.as_str(),
        severity = result.severity().map(|s| s.as_str()).unwrap_or("none"),
        "classified image"
    );

    Ok(result)
}

/// SHA-256 of a model file, formatted as `sha256:<hex>`.
pub fn model_hash(path: &Path) -> std::io::Result<String> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{MODEL_HASH_PREFIX}{}", hex::encode(hasher.finalize())))
}
