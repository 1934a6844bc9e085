//! Model Module - SOM anomaly scoring engine
//!
//! - `grid` - prototype grid (ndarray backed)
//! - `som` - training and nearest-prototype scoring
//! - `metadata` - training score summary
//! - `threshold` - anomaly cutoff from the summary
//! - `storage` - persisted `ModelState`

pub mod grid;
pub mod som;
pub mod metadata;
pub mod threshold;
pub mod storage;

#[cfg(test)]
mod tests;

// Re-export common types
pub use grid::{Cell, Embedding, Grid};
pub use som::{ScoringPool, SomEngine, TrainOptions, learning_rate, neighborhood, score_grid};
pub use metadata::ScoreMetadata;
pub use threshold::{Threshold, ThresholdConfig, calibrate};
pub use storage::{ModelState, load_model, save_model};
