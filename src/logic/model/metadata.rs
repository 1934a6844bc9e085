//! Score Metadata
//!
//! Summary of the training-set scores. Scores are kept raw (not divided by
//! the pass maximum) so a persisted threshold keeps the same units as the
//! distances produced at inference time.

use serde::{Deserialize, Serialize};

use crate::logic::error::{DetectorError, DetectorResult};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreMetadata {
    pub mean: f64,
    /// Population standard deviation
    pub stddev: f64,
    pub max: f64,
    pub min: f64,
}

impl ScoreMetadata {
    /// Compute `(mean, stddev, max, min)` over one training pass
    pub fn from_scores(scores: &[f64]) -> DetectorResult<Self> {
        if scores.is_empty() {
            return Err(DetectorError::EmptyDataSet("no scores to summarise".into()));
        }
        if scores.iter().any(|s| !s.is_finite()) {
            return Err(DetectorError::InvalidInput("non-finite score".into()));
        }

        let n = scores.len() as f64;
        let max = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let min = scores.iter().cloned().fold(f64::INFINITY, f64::min);

        // Summation rounding can push the mean a hair outside [min, max].
        // The variance is taken around the clamped mean that gets persisted.
        let mean = (scores.iter().sum::<f64>() / n).clamp(min, max);
        let variance = scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;

        Ok(Self {
            mean,
            stddev: variance.sqrt(),
            max,
            min,
        })
    }

    /// `max >= mean >= min`, `stddev >= 0`, all finite
    pub fn validate(&self) -> DetectorResult<()> {
        let finite = [self.mean, self.stddev, self.max, self.min].iter().all(|v| v.is_finite());
        if !finite || self.stddev < 0.0 || self.max < self.mean || self.mean < self.min {
            return Err(DetectorError::InvalidInput(format!("inconsistent score metadata: {:?}", self)));
        }
        Ok(())
    }
}
