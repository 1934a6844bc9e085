//! Detector - outer run loop
//!
//! Replays the job pipeline, waiting `retry_delay` between passes.
//! Recoverable failures (no data, no model) are logged and retried after the
//! same delay; anything else ends the run.

use super::error::DetectorResult;
use super::jobs::{CancelToken, DetectionContext, JobKind, Pipeline, StatsSnapshot, Tracer};

pub struct Detector {
    ctx: DetectionContext,
    pipeline: Pipeline,
    tracer: Option<Box<dyn Tracer>>,
}

impl Detector {
    pub fn new(ctx: DetectionContext, pipeline: Pipeline) -> Self {
        Self {
            ctx,
            pipeline,
            tracer: None,
        }
    }

    /// Detector running one of the named jobs
    pub fn for_job(ctx: DetectionContext, job: JobKind) -> Self {
        let pipeline = job.pipeline(&ctx.config);
        Self::new(ctx, pipeline)
    }

    pub fn with_tracer(mut self, tracer: Box<dyn Tracer>) -> Self {
        self.tracer = Some(tracer);
        self
    }

    pub fn context(&self) -> &DetectionContext {
        &self.ctx
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.ctx.cancel_token()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.ctx.stats.snapshot()
    }

    /// Run until cancelled, or until the first successful pass when
    /// `single_run` is set.
    pub fn run(&mut self, single_run: bool) -> DetectorResult<()> {
        log::info!("Detector started ({} steps)", self.pipeline.len());

        loop {
            if self.ctx.is_cancelled() {
                log::info!("Detector cancelled");
                return Ok(());
            }

            match self.pipeline.execute_all(&mut self.ctx, self.tracer.as_deref()) {
                Ok(()) => {
                    if single_run {
                        log::info!("Single run complete");
                        return Ok(());
                    }
                    log::info!("Pipeline pass complete; next in {:.1}s", self.ctx.config.retry_delay.as_secs_f64());
                    if !self.ctx.sleep(self.ctx.config.retry_delay) {
                        log::info!("Detector cancelled");
                        return Ok(());
                    }
                }
                Err(e) if e.is_recoverable() => {
                    log::error!("{}; retrying in {:.1}s", e, self.ctx.config.retry_delay.as_secs_f64());
                    if !self.ctx.sleep(self.ctx.config.retry_delay) {
                        log::info!("Detector cancelled");
                        return Ok(());
                    }
                }
                Err(e) => {
                    log::error!("Detector stopped: {}", e);
                    return Err(e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::{Duration, Instant};

    use tempfile::tempdir;

    use super::*;
    use crate::logic::config::DetectorConfig;
    use crate::logic::encoder::HashingEncoder;
    use crate::logic::error::DetectorError;
    use crate::logic::feedback::NoFeedback;
    use crate::logic::jobs::LogTracer;
    use crate::logic::storage::{LogRecord, MemorySink, MemorySource};

    fn detector(dir: &std::path::Path, job: JobKind) -> (Detector, MemorySource, MemorySink) {
        let config = DetectorConfig {
            map_size: 3,
            train_iterations: 200,
            parallelism: 1,
            infer_loops: 1,
            infer_time_span: 0,
            vector_length: 16,
            model_dir: dir.to_path_buf(),
            seed: Some(3),
            empty_batch_backoff: Duration::ZERO,
            retry_delay: Duration::ZERO,
            ..Default::default()
        };
        let source = MemorySource::new();
        let sink = MemorySink::new();
        let ctx = DetectionContext::new(
            config,
            Box::new(HashingEncoder::new(16).unwrap()),
            Box::new(source.clone()),
            Box::new(sink.clone()),
            Box::new(NoFeedback),
        );
        (Detector::for_job(ctx, job).with_tracer(Box::new(LogTracer)), source, sink)
    }

    #[test]
    fn test_single_run_retries_until_data_arrives() {
        let dir = tempdir().unwrap();
        let (mut detector, source, _) = detector(dir.path(), JobKind::Train);
        // Two empty cycles, then data
        source.push_batch(vec![]);
        source.push_batch(vec![]);
        source.push_batch(vec![LogRecord::new("service started"); 10]);

        detector.run(true).unwrap();

        assert_eq!(source.pending(), 0);
        assert_eq!(detector.stats().training_runs, 1);
        assert_eq!(detector.pipeline().count(), 1);
    }

    #[test]
    fn test_train_inference_single_run() {
        let dir = tempdir().unwrap();
        let (mut detector, source, sink) = detector(dir.path(), JobKind::TrainInference);
        source.push_batch(vec![LogRecord::new("service started"); 10]);
        source.push_batch(vec![LogRecord::new("service started")]);

        detector.run(true).unwrap();

        assert_eq!(sink.results().len(), 1);
        assert_eq!(detector.stats().inference_runs, 1);
    }

    #[test]
    fn test_fatal_error_propagates() {
        // Model file path is occupied by a directory: saving cannot succeed
        let blocked = tempdir().unwrap();
        std::fs::create_dir_all(blocked.path().join("SOM.model")).unwrap();
        let (mut detector, source, _) = detector(blocked.path(), JobKind::Train);
        source.push_batch(vec![LogRecord::new("service started"); 5]);

        let err = detector.run(false).unwrap_err();
        assert!(matches!(err, DetectorError::ModelSave(_)));
    }

    #[test]
    fn test_successful_passes_wait_retry_delay() {
        let dir = tempdir().unwrap();
        let (mut detector, source, _) = detector(dir.path(), JobKind::Train);
        detector.ctx.config.retry_delay = Duration::from_millis(100);
        source.push_batch(vec![LogRecord::new("service started"); 10]);

        let token = detector.cancel_token();
        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(350));
            token.cancel();
        });
        detector.run(false).unwrap();
        canceller.join().unwrap();

        // Later passes find the model and skip training, so only the delay paces them
        let passes = detector.pipeline().count();
        assert!(passes >= 2, "only {} passes", passes);
        assert!(passes <= 10, "{} passes in 350ms", passes);
        assert_eq!(detector.stats().training_runs, 1);
    }

    #[test]
    fn test_cancel_interrupts_retry_delay() {
        let dir = tempdir().unwrap();
        let (mut detector, source, _) = detector(dir.path(), JobKind::Train);
        detector.ctx.config.retry_delay = Duration::from_secs(5);
        source.push_batch(vec![LogRecord::new("service started"); 10]);

        let token = detector.cancel_token();
        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(150));
            token.cancel();
        });
        let started = Instant::now();
        detector.run(false).unwrap();
        canceller.join().unwrap();

        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(detector.pipeline().count(), 1);
    }

    #[test]
    fn test_cancelled_detector_returns() {
        let dir = tempdir().unwrap();
        let (mut detector, source, _) = detector(dir.path(), JobKind::Inference);
        detector.cancel_token().cancel();

        detector.run(false).unwrap();
        assert_eq!(source.pending(), 0);
        assert_eq!(detector.pipeline().count(), 0);
    }
}
