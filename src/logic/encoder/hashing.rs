//! Hashing encoder
//!
//! Token feature hashing: every cleaned token of the message is hashed
//! (CRC32) into one of `dimension` buckets, then the bucket counts are
//! L2-normalised so every component lies in `[0, 1]`, the same range the
//! SOM prototypes are initialised in. Messages without tokens map to the
//! zero vector.
//!
//! The bucket space is fixed: any token already has a bucket, so there is
//! no vocabulary to extend and `update` leaves the encoder unchanged. A
//! persisted model therefore stays valid for a fresh encoder of the same
//! dimension.

use super::{clean_message, Encoder};
use crate::logic::error::{DetectorError, DetectorResult};
use crate::logic::model::Embedding;
use crate::logic::storage::LogRecord;

#[derive(Debug, Clone)]
pub struct HashingEncoder {
    dimension: usize,
}

impl HashingEncoder {
    pub fn new(dimension: usize) -> DetectorResult<Self> {
        if dimension == 0 {
            return Err(DetectorError::Config("encoder dimension must be at least 1".into()));
        }
        Ok(Self { dimension })
    }

    pub fn encode_message(&self, message: &str) -> Embedding {
        let mut vector = vec![0.0f64; self.dimension];
        for token in clean_message(message) {
            vector[bucket(&token, self.dimension)] += 1.0;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            for v in vector.iter_mut() {
                *v /= norm;
            }
        }
        vector
    }
}

fn bucket(token: &str, dimension: usize) -> usize {
    crc32fast::hash(token.as_bytes()) as usize % dimension
}

impl Encoder for HashingEncoder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn encode(&mut self, records: &[LogRecord]) -> DetectorResult<Vec<Embedding>> {
        Ok(records.iter().map(|r| self.encode_message(&r.message)).collect())
    }

    fn update(&mut self, _records: &[LogRecord]) -> DetectorResult<()> {
        Ok(())
    }
}
