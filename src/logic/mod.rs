//! Logic Module - detection engine and orchestration
//!
//! ## Structure
//! - `model/` - SOM grid, training, scoring, threshold, persistence
//! - `encoder/` - log record to embedding
//! - `storage/` - data sources and result sinks
//! - `feedback/` - confirmed false positives
//! - `jobs/` - train/infer orchestrators and the step pipeline
//! - `detector.rs` - outer run loop

pub mod config;
pub mod error;

pub mod model;
pub mod encoder;
pub mod storage;
pub mod feedback;
pub mod jobs;
pub mod detector;

pub use config::DetectorConfig;
pub use error::{DetectorError, DetectorResult};
