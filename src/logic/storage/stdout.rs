use url::form_urlencoded;

use super::record::AnomalyResult;
use super::DataSink;
use crate::logic::error::DetectorResult;

/// Logs every result. When a fact store URL is known, anomalies also get a
/// link that lets an operator mark them as false positives.
pub struct StdoutSink {
    fact_store_url: Option<String>,
}

impl StdoutSink {
    pub fn new(fact_store_url: Option<String>) -> Self {
        Self { fact_store_url }
    }

    /// Feedback link for one anomaly
    pub fn feedback_link(&self, result: &AnomalyResult) -> Option<String> {
        let base = self.fact_store_url.as_deref()?;
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("lad_id", &result.predict_id.to_string())
            .append_pair("is_anomaly", "False")
            .append_pair("message", &result.message)
            .finish();
        Some(format!("{}?{}", base.trim_end_matches('/'), query))
    }
}

impl DataSink for StdoutSink {
    fn name(&self) -> &str {
        "stdout"
    }

    fn store_results(&mut self, results: &[AnomalyResult]) -> DetectorResult<()> {
        for result in results {
            log::info!(
                "Anomaly: {}, Anomaly score: {:.6}, message: {}",
                result.anomaly as u8,
                result.anomaly_score,
                result.message
            );
            if result.anomaly {
                if let Some(link) = self.feedback_link(result) {
                    log::info!("Report false positive: {}", link);
                }
            }
        }
        log::info!("output logs {} in stdout sink", results.len());
        Ok(())
    }
}
