//! Heuristic answer confidence from retrieval yield.
//!
//! The score is not a probability. It grows with the number of retrieved chunks
//! and is capped below 1.0.
//!
//! With the default [`EmptyRetrieval::Baseline`] policy an answer backed by zero
//! chunks still scores the baseline (0.6). That floor looks unintended but is kept
//! as the default; set `confidence.empty_retrieval = "zero"` to report 0.0 instead.

use crate::config::{ConfidenceSettings, EmptyRetrieval};

/// Maps a retrieval count to a bounded score.
#[derive(Debug, Clone)]
pub struct ConfidenceEstimator {
    baseline: f64,
    per_chunk: f64,
    ceiling: f64,
    empty_retrieval: EmptyRetrieval,
}

impl ConfidenceEstimator {
    pub fn new(baseline: f64, per_chunk: f64, ceiling: f64) -> Self {
        Self {
            baseline,
            per_chunk,
            ceiling,
            empty_retrieval: EmptyRetrieval::Baseline,
        }
    }

    pub fn from_settings(settings: &ConfidenceSettings) -> Self {
        Self::new(settings.baseline, settings.per_chunk, settings.ceiling)
            .with_empty_retrieval(settings.empty_retrieval)
    }

    /// Set the score policy for answers with no retrieved chunks.
    pub fn with_empty_retrieval(mut self, policy: EmptyRetrieval) -> Self {
        self.empty_retrieval = policy;
        self
    }

    /// Score `retrieved` chunks out of a maximum of `k`, rounded to two decimals.
    pub fn estimate(&self, retrieved: usize, k: usize) -> f64 {
        if retrieved == 0 && self.empty_retrieval == EmptyRetrieval::Zero {
            return 0.0;
        }

        let counted = retrieved.min(k) as f64;
        let raw = (self.baseline + self.per_chunk * counted).min(self.ceiling);
        round2(raw.clamp(0.0, 1.0))
    }
}

impl Default for ConfidenceEstimator {
    fn default() -> Self {
        Self::from_settings(&ConfidenceSettings::default())
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
