//! Severity tiers derived from the pneumonia probability.

use serde::{Deserialize, Serialize};

/// Severity of a positive finding. "No severity" is `Option::None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    Mild,
    Moderate,
    Severe,
}

impl Severity {
    /// Exclusive lower bounds, checked from the top down; first match wins.
    const BANDS: [(f64, Severity); 3] = [
        (0.9, Severity::Severe),
        (0.8, Severity::Moderate),
        (0.5, Severity::Mild),
    ];

    pub fn from_probability(probability: f64) -> Option<Self> {
        Self::BANDS
            .iter()
            .find(|(bound, _)| probability > *bound)
            .map(|(_, severity)| *severity)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mild => "Mild",
            Self::Moderate => "Moderate",
            Self::Severe => "Severe",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_points() {
        assert_eq!(Severity::from_probability(0.95), Some(Severity::Severe));
        assert_eq!(Severity::from_probability(0.85), Some(Severity::Moderate));
        assert_eq!(Severity::from_probability(0.6), Some(Severity::Mild));
        assert_eq!(Severity::from_probability(0.3), None);
    }

    #[test]
    fn test_bounds_are_exclusive() {
        assert_eq!(Severity::from_probability(0.9), Some(Severity::Moderate));
        assert_eq!(Severity::from_probability(0.8), Some(Severity::Mild));
        assert_eq!(Severity::from_probability(0.5), None);
        assert_eq!(Severity::from_probability(1.0), Some(Severity::Severe));
        assert_eq!(Severity::from_probability(0.0), None);
    }

    #[test]
    fn test_monotonic_over_unit_interval() {
        let rank = |s: Option<Severity>| match s {
            None => 0,
            Some(Severity::Mild) => 1,
            Some(Severity::Moderate) => 2,
            Some(Severity::Severe) => 3,
        };
        let mut prev = 0;
        for i in 0..=1000 {
            let r = rank(Severity::from_probability(i as f64 / 1000.0));
            assert!(r >= prev, "severity decreased at p={}", i as f64 / 1000.0);
            prev = r;
        }
        assert_eq!(prev, 3);
    }

    #[test]
    fn test_nan_has_no_severity() {
        assert_eq!(Severity::from_probability(f64::NAN), None);
    }

    #[test]
    fn test_serializes_as_label() {
        assert_eq!(serde_json::to_string(&Severity::Severe).unwrap(), "\"Severe\"");
        assert_eq!(serde_json::to_string(&None::<Severity>).unwrap(), "null");
    }
}
