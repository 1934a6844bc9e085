//! Encoder Module - log record to embedding
//!
//! The engine only relies on the `Encoder` contract: every embedding produced
//! for one model has the same dimensionality.

pub mod hashing;

pub use hashing::HashingEncoder;

use once_cell::sync::Lazy;
use regex::Regex;

use super::model::Embedding;
use super::storage::LogRecord;
use crate::logic::error::DetectorResult;

static WORD_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new("[a-zA-Z]+").expect("valid word pattern"));

/// Turns raw records into embeddings
pub trait Encoder: Send {
    /// Length of every embedding this encoder produces
    fn dimension(&self) -> usize;

    /// One embedding per record, in input order
    fn encode(&mut self, records: &[LogRecord]) -> DetectorResult<Vec<Embedding>>;

    /// Extend the vocabulary without a full retrain. Encoders with a fixed
    /// token space leave themselves unchanged.
    fn update(&mut self, records: &[LogRecord]) -> DetectorResult<()>;
}

/// Lowercased alphabetic runs of a message. Digits and punctuation are dropped.
pub fn clean_message(message: &str) -> Vec<String> {
    WORD_PATTERN
        .find_iter(message)
        .map(|m| m.as_str().to_ascii_lowercase())
        .collect()
}
