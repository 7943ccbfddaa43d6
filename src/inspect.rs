//! `pneumoguard inspect`: print what a model file expects and produces.

use std::fmt::Write as _;
use std::path::Path;

use eyre::{bail, eyre, Result};
use serde::Serialize;
use tract_onnx::prelude::*;

/// One graph input or output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TensorSummary {
    pub name: String,
    pub fact: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelSummary {
    pub path: String,
    pub hash: String,
    pub node_count: usize,
    pub inputs: Vec<TensorSummary>,
    pub outputs: Vec<TensorSummary>,
}

impl ModelSummary {
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Model:  {}", self.path);
        let _ = writeln!(out, "Hash:   {}", self.hash);
        let _ = writeln!(out, "Nodes:  {}", self.node_count);
        let _ = writeln!(out);
        let _ = writeln!(out, "Inputs:");
        for t in &self.inputs {
            let _ = writeln!(out, "  {:<24} {}", t.name, t.fact);
        }
        let _ = writeln!(out, "Outputs:");
        for t in &self.outputs {
            let _ = writeln!(out, "  {:<24} {}", t.name, t.fact);
        }
        out
    }
}

/// Parse the model without optimizing it, so symbolic dimensions survive.
pub fn summarize(path: &Path) -> Result<ModelSummary> {
    if !path.exists() {
        bail!("Model file not found at {}", path.display());
    }
    let model = tract_onnx::onnx()
        .model_for_path(path)
        .map_err(|e| eyre!("failed to parse {}: {e:#}", path.display()))?;

    let describe = |outlet: &OutletId, fact: &InferenceFact| TensorSummary {
        name: model.node(outlet.node).name.clone(),
        fact: format!("{fact:?}"),
    };

    let mut inputs = Vec::with_capacity(model.inputs.len());
    for (ix, outlet) in model.inputs.iter().enumerate() {
        let fact = model.input_fact(ix).map_err(|e| eyre!("{e:#}"))?;
        inputs.push(describe(outlet, fact));
    }
    let mut outputs = Vec::with_capacity(model.outputs.len());
    for (ix, outlet) in model.outputs.iter().enumerate() {
        let fact = model.output_fact(ix).map_err(|e| eyre!("{e:#}"))?;
        outputs.push(describe(outlet, fact));
    }

    Ok(ModelSummary {
        path: path.display().to_string(),
        hash: crate::model_hash(path)?,
        node_count: model.nodes.len(),
        inputs,
        outputs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_model() {
        let err = summarize(Path::new("/no/such/model.onnx")).unwrap_err();
        assert_eq!(err.to_string(), "Model file not found at /no/such/model.onnx");
    }

    #[test]
    fn test_summarize_lists_graph_io() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("tests/fixtures/softmax_classifier.onnx");
        let summary = summarize(&path).unwrap();

        assert_eq!(summary.hash, crate::model_hash(&path).unwrap());
        assert!(summary.node_count >= 4, "nodes: {}", summary.node_count);

        let inputs: Vec<&str> = summary.inputs.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(inputs, ["features"]);
        assert!(summary.inputs[0].fact.contains("F32"), "{}", summary.inputs[0].fact);

        let outputs: Vec<&str> = summary.outputs.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(outputs, ["label", "probabilities"]);

        let text = summary.render_text();
        assert!(text.contains("features"));
        assert!(text.contains("probabilities"));
    }

    #[test]
    fn test_summarize_rejects_non_model() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("junk.onnx");
        std::fs::write(&path, b"junk").unwrap();
        let err = summarize(&path).unwrap_err();
        assert!(err.to_string().starts_with("failed to parse"));
    }

    #[test]
    fn test_render_text_lists_io() {
        let summary = ModelSummary {
            path: "pneumonia.onnx".to_string(),
            hash: "sha256:abc".to_string(),
            node_count: 12,
            inputs: vec![TensorSummary {
                name: "input_1".to_string(),
                fact: "1,224,224,3,F32".to_string(),
            }],
            outputs: vec![TensorSummary {
                name: "dense_2".to_string(),
                fact: "1,1,F32".to_string(),
            }],
        };
        let text = summary.render_text();
        assert!(text.contains("Hash:   sha256:abc"));
        assert!(text.contains("Nodes:  12"));
        assert!(text.contains("input_1"));
        assert!(text.contains("1,224,224,3,F32"));
        assert!(text.contains("dense_2"));
    }

    #[test]
    fn test_json_shape() {
        let summary = ModelSummary {
            path: "m.onnx".to_string(),
            hash: "sha256:00".to_string(),
            node_count: 1,
            inputs: vec![],
            outputs: vec![],
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["node_count"], 1);
        assert!(json["inputs"].as_array().unwrap().is_empty());
    }
}
