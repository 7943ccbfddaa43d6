//! Classifier adapter: normalized tensor → pneumonia probability.
//!
//! [`Classifier`] is the seam the server depends on. [`OnnxClassifier`] is the
//! production implementation, a `tract-onnx` plan pinned to the
//! `f32 [1, 224, 224, 3]` input the preprocessor produces. The plan is
//! immutable after load and `run` takes `&self`, so one instance is shared
//! across all requests without a lock.

use std::path::Path;
use std::sync::Arc;

use tract_onnx::prelude::*;
use tracing::info;

use crate::error::InferenceError;
use crate::preprocess::NormalizedTensor;

/// A loaded binary classifier.
pub trait Classifier: Send + Sync {
    /// Probability of the positive class (`output[0][0]`).
    fn predict(&self, input: &NormalizedTensor) -> Result<f32, InferenceError>;
}

/// Turns a model path into a ready classifier.
pub trait ModelLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<Arc<dyn Classifier>, InferenceError>;
}

type Plan = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// ONNX image classifier executed with tract.
pub struct OnnxClassifier {
    plan: Plan,
}

impl OnnxClassifier {
    pub fn load(path: &Path) -> Result<Self, InferenceError> {
        if !path.exists() {
            return Err(InferenceError::ModelNotFound(path.to_path_buf()));
        }

        let plan = tract_onnx::onnx()
            .model_for_path(path)
            .and_then(|model| {
                model.with_input_fact(
                    0,
                    InferenceFact::dt_shape(f32::datum_type(), tvec!(1, 224, 224, 3)),
                )
            })
            .and_then(|model| model.into_optimized())
            .and_then(|model| model.into_runnable())
            .map_err(|e| InferenceError::ModelLoad(format!("{e:#}")))?;

        info!(model = %path.display(), "loaded image classifier");
        Ok(Self { plan })
    }
}

impl Classifier for OnnxClassifier {
    fn predict(&self, input: &NormalizedTensor) -> Result<f32, InferenceError> {
        let tensor = Tensor::from_shape(&input.shape(), input.as_slice())
            .map_err(|e| InferenceError::Inference(format!("{e:#}")))?;

        let outputs = self
            .plan
            .run(tvec!(tensor.into()))
            .map_err(|e| InferenceError::Inference(format!("{e:#}")))?;

        let first = outputs
            .first()
            .ok_or_else(|| InferenceError::Inference("model produced no outputs".to_string()))?;
        let view = first
            .to_array_view::<f32>()
            .map_err(|e| InferenceError::Inference(format!("{e:#}")))?;
        let probability = view
            .iter()
            .next()
            .copied()
            .ok_or_else(|| InferenceError::Inference("model produced an empty output".to_string()))?;

        if !probability.is_finite() {
            return Err(InferenceError::Inference(format!(
                "model produced a non-finite output ({probability})"
            )));
        }

        tracing::debug!(probability, output_shape = ?view.shape(), "forward pass complete");
        Ok(probability)
    }
}

/// Loads [`OnnxClassifier`]s from disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct OnnxLoader;

impl ModelLoader for OnnxLoader {
    fn load(&self, path: &Path) -> Result<Arc<dyn Classifier>, InferenceError> {
        Ok(Arc::new(OnnxClassifier::load(path)?))
    }
}
