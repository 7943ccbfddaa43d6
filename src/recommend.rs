//! Advisory strings attached to every prediction.
//!
//! The positive branch re-checks `probability > 0.5` itself rather than
//! trusting the severity it was handed, so a positive probability with no
//! severity still gets the mild list.

use crate::severity::Severity;

const NORMAL: [&str; 4] = [
    "Continue normal health monitoring",
    "Maintain good respiratory hygiene",
    "Stay current with vaccinations",
    "Follow up if new symptoms develop",
];

const BASE: [&str; 3] = [
    "Consult with a healthcare provider",
    "Monitor breathing and oxygen levels",
    "Rest and maintain good hydration",
];

const SEVERE_LEAD: [&str; 4] = [
    "⚠️ SEEK IMMEDIATE EMERGENCY CARE",
    "High risk - immediate medical attention required",
    "Prepare for possible hospitalization",
    "Monitor oxygen saturation closely",
];

const MODERATE_LEAD: [&str; 3] = [
    "Seek urgent medical attention",
    "Begin prescribed treatments promptly",
    "Schedule follow-up chest X-rays",
];

const MILD_LEAD: [&str; 1] = ["Schedule medical evaluation"];

const MILD_TAIL: [&str; 2] = [
    "Follow up with chest X-rays as advised",
    "Complete prescribed medications if given",
];

/// Ordered recommendations for a probability and the severity derived from it.
pub fn recommendations(probability: f64, severity: Option<Severity>) -> Vec<&'static str> {
    if probability <= 0.5 || probability.is_nan() {
        return NORMAL.to_vec();
    }

    match severity {
        Some(Severity::Severe) => [&SEVERE_LEAD[..], &BASE[..]].concat(),
        Some(Severity::Moderate) => [&MODERATE_LEAD[..], &BASE[..]].concat(),
        _ => [&MILD_LEAD[..], &BASE[..], &MILD_TAIL[..]].concat(),
    }
}
