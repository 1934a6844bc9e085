//! Feedback Module - human-confirmed false positives
//!
//! Fetched fresh every cycle and used twice:
//! - training: each confirmed-normal message is repeated as noise so the map
//!   learns it as normal
//! - inference: results whose message was confirmed normal are suppressed
//!
//! A missing or failing feedback backend means no suppression and no noise.

pub mod fact_store;

pub use fact_store::FactStoreClient;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::storage::LogRecord;
use crate::logic::error::DetectorResult;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub message: String,
    /// `false` means an operator confirmed the message is normal
    pub reported_as_anomaly: bool,
}

impl FeedbackRecord {
    pub fn false_positive(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            reported_as_anomaly: false,
        }
    }
}

/// Source of feedback records
pub trait FeedbackProvider: Send {
    fn fetch(&mut self) -> DetectorResult<Vec<FeedbackRecord>>;
}

/// No feedback backend configured
pub struct NoFeedback;

impl FeedbackProvider for NoFeedback {
    fn fetch(&mut self) -> DetectorResult<Vec<FeedbackRecord>> {
        Ok(Vec::new())
    }
}

/// Fixed list, for embedding and tests
#[derive(Debug, Clone, Default)]
pub struct StaticFeedback {
    records: Vec<FeedbackRecord>,
}

impl StaticFeedback {
    pub fn new(records: Vec<FeedbackRecord>) -> Self {
        Self { records }
    }
}

impl FeedbackProvider for StaticFeedback {
    fn fetch(&mut self) -> DetectorResult<Vec<FeedbackRecord>> {
        Ok(self.records.clone())
    }
}

/// Confirmed false positives for one cycle
#[derive(Debug, Clone, Default)]
pub struct FeedbackSet {
    false_positives: HashSet<String>,
}

impl FeedbackSet {
    pub fn from_records(records: Vec<FeedbackRecord>) -> Self {
        let false_positives = records
            .into_iter()
            .filter(|r| !r.reported_as_anomaly)
            .map(|r| r.message)
            .collect();
        Self { false_positives }
    }

    /// Fetch from the provider; any failure degrades to an empty set
    pub fn load(provider: &mut dyn FeedbackProvider) -> Self {
        match provider.fetch() {
            Ok(records) => {
                let set = Self::from_records(records);
                if !set.is_empty() {
                    log::info!("Loaded {} confirmed false positives", set.len());
                }
                set
            }
            Err(e) => {
                log::error!("Feedback store is either down or not functioning: {}", e);
                Self::default()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.false_positives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.false_positives.is_empty()
    }

    /// Exact message match
    pub fn is_false_positive(&self, message: &str) -> bool {
        self.false_positives.contains(message)
    }

    /// Each confirmed-normal message repeated `freq` times, ordered by message
    pub fn noise_records(&self, freq: usize) -> Vec<LogRecord> {
        let mut messages: Vec<&String> = self.false_positives.iter().collect();
        messages.sort();

        let mut noise = Vec::with_capacity(messages.len() * freq);
        for msg in messages {
            noise.extend(std::iter::repeat_with(|| LogRecord::new(msg.clone())).take(freq));
        }
        if !noise.is_empty() {
            log::info!("Added noise {} messages", noise.len());
        }
        noise
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::error::DetectorError;

    struct BrokenFeedback;

    impl FeedbackProvider for BrokenFeedback {
        fn fetch(&mut self) -> DetectorResult<Vec<FeedbackRecord>> {
            Err(DetectorError::Feedback("connection refused".into()))
        }
    }

    #[test]
    fn test_only_confirmed_normal_messages_count() {
        let set = FeedbackSet::from_records(vec![
            FeedbackRecord::false_positive("cron job started"),
            FeedbackRecord { message: "kernel panic".into(), reported_as_anomaly: true },
        ]);

        assert_eq!(set.len(), 1);
        assert!(set.is_false_positive("cron job started"));
        assert!(!set.is_false_positive("kernel panic"));
        assert!(!set.is_false_positive("cron job started "));
    }

    #[test]
    fn test_noise_records() {
        let set = FeedbackSet::from_records(vec![
            FeedbackRecord::false_positive("b"),
            FeedbackRecord::false_positive("a"),
        ]);

        let noise = set.noise_records(3);
        assert_eq!(noise.len(), 6);
        assert_eq!(noise[0].message, "a");
        assert_eq!(noise[5].message, "b");
        assert!(set.noise_records(0).is_empty());
    }

    #[test]
    fn test_failing_provider_degrades_to_empty() {
        let set = FeedbackSet::load(&mut BrokenFeedback);
        assert!(set.is_empty());
        assert!(set.noise_records(10).is_empty());
    }

    #[test]
    fn test_no_feedback() {
        assert!(FeedbackSet::load(&mut NoFeedback).is_empty());
    }
}
