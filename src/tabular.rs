//! Standalone tabular risk predictor behind `pneumoguard predict`.
//!
//! Loads a classical classifier exported to ONNX (class probabilities as a
//! plain `[1, k]` tensor, i.e. no ZipMap) and scores one feature vector read
//! from a JSON file. Nested arrays are flattened row-major into a single
//! `[1, n]` row. Shares nothing with the HTTP service.

use std::path::Path;

use eyre::{bail, eyre, Result, WrapErr};
use serde::{Deserialize, Serialize};
use tract_onnx::prelude::*;
use tracing::debug;

pub const DEFAULT_MODEL_PATH: &str = "ensemble_model.onnx";
pub const DEFAULT_INPUT_PATH: &str = "temp_input.json";

/// Column of the probability matrix holding the positive class.
const POSITIVE_CLASS: usize = 1;

type Plan = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Output of a successful run, printed verbatim as JSON.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TabularPrediction {
    pub probability: f64,
    pub prediction: bool,
}

impl TabularPrediction {
    pub fn from_probability(probability: f64) -> Self {
        Self {
            probability,
            prediction: probability > 0.5,
        }
    }
}

/// Flatten a JSON number or (nested) array of numbers, row-major. Booleans
/// count as 1 and 0.
pub fn flatten_features(value: &serde_json::Value) -> Result<Vec<f32>> {
    fn walk(value: &serde_json::Value, out: &mut Vec<f32>) -> Result<()> {
        match value {
            serde_json::Value::Number(n) => {
                let v = n
                    .as_f64()
                    .ok_or_else(|| eyre!("feature {n} is not representable as a float"))?;
                out.push(v as f32);
            }
            serde_json::Value::Bool(b) => out.push(if *b { 1.0 } else { 0.0 }),
            serde_json::Value::Array(items) => {
                for item in items {
                    walk(item, out)?;
                }
            }
            other => bail!("could not convert {other} to a numeric feature"),
        }
        Ok(())
    }

    let mut features = Vec::new();
    walk(value, &mut features)?;
    if features.is_empty() {
        bail!("input contains no features");
    }
    Ok(features)
}

pub fn read_features(path: &Path) -> Result<Vec<f32>> {
    let content = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("cannot read input file {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&content)
        .wrap_err_with(|| format!("invalid JSON in {}", path.display()))?;
    flatten_features(&value)
}

/// Pick the positive-class probability out of the model outputs.
///
/// Classifiers exported from scikit-learn emit `(label, probabilities)`; the
/// probabilities are the first `f32` output shaped `[1, k]` with `k >= 2`.
pub fn positive_class_probability<'a>(outputs: impl IntoIterator<Item = &'a Tensor>) -> Result<f64> {
    for output in outputs {
        let shape = output.shape();
        if output.datum_type() != f32::datum_type()
            || shape.len() != 2
            || shape[0] != 1
            || shape[1] <= POSITIVE_CLASS
        {
            continue;
        }
        let view = output
            .to_array_view::<f32>()
            .map_err(|e| eyre!("{e:#}"))?;
        let p = view
            .iter()
            .nth(POSITIVE_CLASS)
            .copied()
            .ok_or_else(|| eyre!("probability output is shorter than its shape"))?;
        return Ok(f64::from(p));
    }
    bail!("model has no [1, k] float probability output (export it without ZipMap)")
}

/// A loaded tabular classifier with its input width fixed at load time.
pub struct TabularModel {
    plan: Plan,
    n_features: usize,
}

impl TabularModel {
    pub fn load(path: &Path, n_features: usize) -> Result<Self> {
        if !path.exists() {
            bail!("No such file or directory: '{}'", path.display());
        }
        let plan = tract_onnx::onnx()
            .model_for_path(path)
            .and_then(|m| {
                m.with_input_fact(0, InferenceFact::dt_shape(f32::datum_type(), tvec!(1, n_features)))
            })
            .and_then(|m| m.into_optimized())
            .and_then(|m| m.into_runnable())
            .map_err(|e| eyre!("failed to load model {}: {e:#}", path.display()))?;
        Ok(Self { plan, n_features })
    }

    pub fn predict_proba(&self, features: &[f32]) -> Result<f64> {
        if features.len() != self.n_features {
            bail!(
                "model expects {} features, got {}",
                self.n_features,
                features.len()
            );
        }
        let input = Tensor::from_shape(&[1, features.len()], features)
            .map_err(|e| eyre!("{e:#}"))?;
        let outputs = self
            .plan
            .run(tvec!(input.into()))
            .map_err(|e| eyre!("prediction failed: {e:#}"))?;
        positive_class_probability(outputs.iter().map(|v| &**v))
    }
}

/// Load the model and input, score, and return the prediction.
pub fn run(model_path: &Path, input_path: &Path) -> Result<TabularPrediction> {
    let features = read_features(input_path)?;
    debug!(n_features = features.len(), input = %input_path.display(), "read features");
    let model = TabularModel::load(model_path, features.len())?;
    let probability = model.predict_proba(&features)?;
    Ok(TabularPrediction::from_probability(probability))
}
