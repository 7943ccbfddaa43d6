//! Assembles the JSON-facing prediction result from a raw probability.

use serde::{Deserialize, Serialize};

use crate::recommend::recommendations;
use crate::severity::Severity;

/// Probabilities strictly above this are reported as pneumonia.
pub const POSITIVE_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Diagnosis {
    Pneumonia,
    Normal,
}

impl Diagnosis {
    pub fn from_probability(probability: f64) -> Self {
        if probability > POSITIVE_THRESHOLD {
            Self::Pneumonia
        } else {
            Self::Normal
        }
    }

    pub fn is_positive(&self) -> bool {
        matches!(self, Self::Pneumonia)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pneumonia => "Pneumonia",
            Self::Normal => "Normal",
        }
    }
}

/// Radiological description of the finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Details {
    pub lung_opacity: String,
    pub infiltrates: String,
    pub consolidation: String,
    pub severity: Option<Severity>,
}

/// Response body of `POST /predict`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionResult {
    pub prediction: Diagnosis,
    pub confidence: f64,
    pub pneumonia_probability: f64,
    pub details: Details,
    pub recommendations: Vec<String>,
}

impl PredictionResult {
    pub fn from_probability(probability: f64) -> Self {
        let diagnosis = Diagnosis::from_probability(probability);
        let severity = Severity::from_probability(probability);
        let positive = diagnosis.is_positive();

        let details = Details {
            lung_opacity: format!(
                "{} opacity detected in lung fields ({:.1}% confidence)",
                if positive { "Increased" } else { "Normal" },
                probability * 100.0
            ),
            infiltrates: if positive {
                "Likely presence of infiltrates"
            } else {
                "No significant infiltrates detected"
            }
            .to_string(),
            consolidation: if positive {
                "Potential areas of consolidation observed"
            } else {
                "No consolidation observed"
            }
            .to_string(),
            severity,
        };

        Self {
            prediction: diagnosis,
            confidence: probability,
            pneumonia_probability: probability,
            details,
            recommendations: recommendations(probability, severity)
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }

    pub fn severity(&self) -> Option<Severity> {
        self.details.severity
    }
}
