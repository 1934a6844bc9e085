//! Log Anomaly Detector
//!
//! Flags unusual log lines by their distance to a Self-Organizing Map trained
//! on recent "normal" traffic.
//!
//! - `logic::model` - SOM engine, threshold calibration, persistence
//! - `logic::jobs` - training/inference orchestration and the step pipeline
//! - `logic::detector` - retrying run loop
//! - `logic::{encoder, storage, feedback}` - collaborator boundaries and adapters

pub mod constants;
pub mod logic;
