//! Inference Orchestrator
//!
//! Scores fresh batches against the published model until `loops_remaining`
//! reaches zero, then hands control back to training.

use std::time::{Duration, Instant};

use super::context::DetectionContext;
use crate::logic::error::{DetectorError, DetectorResult};
use crate::logic::feedback::FeedbackSet;
use crate::logic::model::{Threshold, ThresholdConfig};
use crate::logic::storage::{AnomalyResult, RetrieveWindow};

/// Outcome of one scored batch
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BatchSummary {
    pub records: usize,
    pub emitted: usize,
    pub anomalies: usize,
    pub suppressed: usize,
    pub max_score: f64,
}

pub struct InferenceOrchestrator {
    loops_remaining: usize,
    interval: Duration,
}

impl InferenceOrchestrator {
    pub fn new(loops: usize, interval: Duration) -> Self {
        Self {
            loops_remaining: loops,
            interval,
        }
    }

    pub fn loops_remaining(&self) -> usize {
        self.loops_remaining
    }

    /// Loop until every configured cycle has produced a batch.
    /// Returns early (Ok) when cancelled.
    pub fn execute(&mut self, ctx: &mut DetectionContext, threshold: &Threshold) -> DetectorResult<()> {
        while self.loops_remaining > 0 {
            if ctx.is_cancelled() {
                log::info!("Inference cancelled with {} loops remaining", self.loops_remaining);
                return Ok(());
            }

            let started = Instant::now();
            let summary = match self.run_batch(ctx, threshold)? {
                Some(summary) => summary,
                None => {
                    log::info!(
                        "No new logs, retrying in {}s",
                        ctx.config.empty_batch_backoff.as_secs_f64()
                    );
                    if !ctx.sleep(ctx.config.empty_batch_backoff) {
                        log::info!("Inference cancelled with {} loops remaining", self.loops_remaining);
                        return Ok(());
                    }
                    continue;
                }
            };

            self.loops_remaining -= 1;
            log::info!(
                "Batch scored: {} records, {} anomalies, {} suppressed, max score {:.4} ({} loops left)",
                summary.records,
                summary.anomalies,
                summary.suppressed,
                summary.max_score,
                self.loops_remaining
            );

            if !ctx.sleep(self.interval.saturating_sub(started.elapsed())) {
                log::info!("Inference cancelled with {} loops remaining", self.loops_remaining);
                return Ok(());
            }
        }
        Ok(())
    }

    /// Pull, score, filter and emit one batch. `None` when no records arrived.
    pub fn run_batch(
        &mut self,
        ctx: &mut DetectionContext,
        threshold: &Threshold,
    ) -> DetectorResult<Option<BatchSummary>> {
        let records = ctx.source.retrieve(RetrieveWindow::inference(&ctx.config))?;
        if records.is_empty() {
            return Ok(None);
        }
        log::info!("{} logs loaded from the last {} seconds", records.len(), ctx.config.infer_time_span);

        let embeddings = ctx.encoder.encode(&records)?;
        let model = ctx.model.as_ref()
            .ok_or_else(|| DetectorError::ModelLoad("no model available for inference".into()))?;
        let scores = ctx.scoring.score(&model.grid, &embeddings)?;

        let feedback = FeedbackSet::load(ctx.feedback.as_mut());

        let mut summary = BatchSummary {
            records: records.len(),
            max_score: scores.iter().cloned().fold(0.0, f64::max),
            ..Default::default()
        };
        let mut results = Vec::with_capacity(records.len());

        for (record, &score) in records.iter().zip(scores.iter()) {
            if feedback.is_false_positive(&record.message) {
                log::info!("False positive was found (score: {:.4}): {}", score, record.message);
                summary.suppressed += 1;
                continue;
            }

            let anomaly = threshold.is_anomaly(score);
            if anomaly {
                summary.anomalies += 1;
                log::warn!("Anomaly found (score: {:.4}): {}", score, record.message);
            }
            results.push(AnomalyResult::new(record, score, anomaly));
        }

        summary.emitted = results.len();
        if !results.is_empty() {
            ctx.sink.store_results(&results)?;
        }
        ctx.stats.record_batch(summary.records, summary.anomalies, summary.suppressed);

        Ok(Some(summary))
    }
}

/// Pipeline step: calibrate the threshold from the current model and run
/// the configured number of inference cycles
#[derive(Debug, Default)]
pub struct InferStep;

impl InferStep {
    pub fn new() -> Self {
        Self
    }

    pub fn run(&mut self, ctx: &mut DetectionContext) -> DetectorResult<()> {
        if ctx.model.is_none() {
            ctx.load_persisted_model()?;
        }
        let metadata = match ctx.model.as_ref() {
            Some(model) => model.metadata,
            None => return Err(DetectorError::ModelLoad("no model available for inference".into())),
        };

        let threshold = ThresholdConfig::new(ctx.config.threshold_multiplier).calibrate(&metadata);
        log::info!(
            "Inference threshold {:.4} (mean {:.4} + {} x stddev {:.4})",
            threshold.value,
            threshold.mean,
            threshold.multiplier,
            threshold.stddev
        );

        let interval = Duration::from_secs(ctx.config.infer_time_span);
        let mut orchestrator = InferenceOrchestrator::new(ctx.config.infer_loops, interval);
        orchestrator.execute(ctx, &threshold)?;

        ctx.stats.record_inference();
        Ok(())
    }
}
