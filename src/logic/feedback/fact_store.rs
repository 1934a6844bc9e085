//! Fact Store Client
//!
//! The fact store collects operator feedback on predictions.
//! `GET {url}/api/false_positive` returns `{"feedback": ["message", ...]}`,
//! every entry a message confirmed as normal.

use std::time::Duration;

use serde::Deserialize;

use super::{FeedbackProvider, FeedbackRecord};
use crate::logic::error::{DetectorError, DetectorResult};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct FalsePositiveResponse {
    feedback: Vec<String>,
}

pub struct FactStoreClient {
    base_url: String,
}

impl FactStoreClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn false_positive_url(&self) -> String {
        format!("{}/api/false_positive", self.base_url)
    }
}

/// Decode the `/api/false_positive` body
pub fn parse_false_positives(body: &str) -> DetectorResult<Vec<FeedbackRecord>> {
    let parsed: FalsePositiveResponse = serde_json::from_str(body)
        .map_err(|e| DetectorError::Feedback(format!("invalid response: {}", e)))?;

    Ok(parsed.feedback.into_iter().map(FeedbackRecord::false_positive).collect())
}

impl FeedbackProvider for FactStoreClient {
    fn fetch(&mut self) -> DetectorResult<Vec<FeedbackRecord>> {
        let url = self.false_positive_url();
        log::info!("Fetching false positives from fact store");

        let response = ureq::get(&url)
            .timeout(REQUEST_TIMEOUT)
            .call()
            .map_err(|e| DetectorError::Feedback(e.to_string()))?;

        let body = response.into_string()
            .map_err(|e| DetectorError::Feedback(e.to_string()))?;

        parse_false_positives(&body)
    }
}
