//! Threshold Calibration
//!
//! Anomaly cutoff derived from the training-score distribution:
//! `threshold = k * stddev + mean`.
//! Recompute whenever the metadata changes; never carry a threshold across
//! retraining.

use serde::{Deserialize, Serialize};

use super::metadata::ScoreMetadata;
use crate::constants::DEFAULT_THRESHOLD_MULTIPLIER;

/// Threshold Configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ThresholdConfig {
    /// Standard deviations above the mean
    pub multiplier: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            multiplier: DEFAULT_THRESHOLD_MULTIPLIER,
        }
    }
}

impl ThresholdConfig {
    pub fn new(multiplier: f64) -> Self {
        Self { multiplier }
    }

    pub fn calibrate(&self, metadata: &ScoreMetadata) -> Threshold {
        Threshold {
            value: calibrate(metadata, self.multiplier),
            multiplier: self.multiplier,
            mean: metadata.mean,
            stddev: metadata.stddev,
        }
    }
}

/// `k * stddev + mean`
pub fn calibrate(metadata: &ScoreMetadata, k: f64) -> f64 {
    k * metadata.stddev + metadata.mean
}

/// Calibrated cutoff for one inference phase
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    pub value: f64,
    pub multiplier: f64,
    pub mean: f64,
    pub stddev: f64,
}

impl Threshold {
    /// Strictly above the cutoff
    pub fn is_anomaly(&self, score: f64) -> bool {
        score > self.value
    }
}
