//! In-memory usage counters. Nothing here is written to disk.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::report::{Diagnosis, PredictionResult};
use crate::severity::Severity;

#[derive(Debug, Default)]
pub struct UsageMetrics {
    pub total_requests: AtomicU64,
    pub total_errors: AtomicU64,
    total_processing_ms: AtomicU64,

    pub normal: AtomicU64,
    pub pneumonia: AtomicU64,

    pub mild: AtomicU64,
    pub moderate: AtomicU64,
    pub severe: AtomicU64,

    pub ep_predict: AtomicU64,
    pub ep_health: AtomicU64,
    pub ep_stats: AtomicU64,
}

impl UsageMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, result: &PredictionResult, processing_time_ms: u64) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.total_processing_ms
            .fetch_add(processing_time_ms, Ordering::Relaxed);

        match result.prediction {
            Diagnosis::Pneumonia => self.pneumonia.fetch_add(1, Ordering::Relaxed),
            Diagnosis::Normal => self.normal.fetch_add(1, Ordering::Relaxed),
        };

        match result.severity() {
            Some(Severity::Mild) => {
                self.mild.fetch_add(1, Ordering::Relaxed);
            }
            Some(Severity::Moderate) => {
                self.moderate.fetch_add(1, Ordering::Relaxed);
            }
            Some(Severity::Severe) => {
                self.severe.fetch_add(1, Ordering::Relaxed);
            }
            None => {}
        }
    }

    pub fn record_error(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.total_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Mean processing time over successful predictions.
    pub fn avg_processing_ms(&self) -> f64 {
        let ok = self
            .total_requests
            .load(Ordering::Relaxed)
            .saturating_sub(self.total_errors.load(Ordering::Relaxed));
        if ok == 0 {
            return 0.0;
        }
        self.total_processing_ms.load(Ordering::Relaxed) as f64 / ok as f64
    }
}
