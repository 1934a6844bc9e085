//! Detection context
//!
//! Everything a step touches lives here. Steps receive `&mut DetectionContext`,
//! so training and scoring can never overlap on the same grid.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::logic::config::DetectorConfig;
use crate::logic::encoder::Encoder;
use crate::logic::error::DetectorResult;
use crate::logic::feedback::FeedbackProvider;
use crate::logic::model::{load_model, ModelState, ScoringPool, SomEngine};
use crate::logic::storage::{DataSink, DataSource};

/// Granularity of cancellable sleeps
const SLEEP_SLICE: Duration = Duration::from_millis(100);

// ============================================================================
// CANCELLATION
// ============================================================================

/// Shared stop flag, checked at every sleep point
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ============================================================================
// STATS
// ============================================================================

#[derive(Debug, Default)]
pub struct DetectorStats {
    training_runs: AtomicU64,
    inference_runs: AtomicU64,
    records_scored: AtomicU64,
    anomalies: AtomicU64,
    false_positives_suppressed: AtomicU64,
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub training_runs: u64,
    pub inference_runs: u64,
    pub records_scored: u64,
    pub anomalies: u64,
    pub false_positives_suppressed: u64,
}

impl DetectorStats {
    pub fn record_training(&self) {
        self.training_runs.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_inference(&self) {
        self.inference_runs.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_batch(&self, scored: usize, anomalies: usize, suppressed: usize) {
        self.records_scored.fetch_add(scored as u64, Ordering::Relaxed);
        self.anomalies.fetch_add(anomalies as u64, Ordering::Relaxed);
        self.false_positives_suppressed.fetch_add(suppressed as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            training_runs: self.training_runs.load(Ordering::Relaxed),
            inference_runs: self.inference_runs.load(Ordering::Relaxed),
            records_scored: self.records_scored.load(Ordering::Relaxed),
            anomalies: self.anomalies.load(Ordering::Relaxed),
            false_positives_suppressed: self.false_positives_suppressed.load(Ordering::Relaxed),
        }
    }
}

// ============================================================================
// CONTEXT
// ============================================================================

pub struct DetectionContext {
    pub config: DetectorConfig,
    pub encoder: Box<dyn Encoder>,
    pub source: Box<dyn DataSource>,
    pub sink: Box<dyn DataSink>,
    pub feedback: Box<dyn FeedbackProvider>,

    /// Training engine; owns the grid being refined
    pub engine: SomEngine,

    /// Last published model. Inference scores against this snapshot only.
    pub model: Option<ModelState>,

    /// Scoring workers, sized from `config.parallelism`
    pub scoring: ScoringPool,

    pub stats: Arc<DetectorStats>,
    cancel: CancelToken,
}

impl DetectionContext {
    pub fn new(
        config: DetectorConfig,
        encoder: Box<dyn Encoder>,
        source: Box<dyn DataSource>,
        sink: Box<dyn DataSink>,
        feedback: Box<dyn FeedbackProvider>,
    ) -> Self {
        let engine = match config.seed {
            Some(seed) => SomEngine::seeded(seed),
            None => SomEngine::new(),
        }
        .with_radius(config.neighborhood_radius);
        let scoring = ScoringPool::new(config.parallelism);

        Self {
            config,
            encoder,
            source,
            sink,
            feedback,
            engine,
            model: None,
            scoring,
            stats: Arc::new(DetectorStats::default()),
            cancel: CancelToken::new(),
        }
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Publish a model for scoring and make its grid the training start point
    pub fn install_model(&mut self, state: ModelState) {
        self.engine.set_grid(state.grid.clone());
        self.model = Some(state);
    }

    /// Load the persisted model into the context
    pub fn load_persisted_model(&mut self) -> DetectorResult<()> {
        let path = self.config.model_path();
        let state = load_model(&path)?;
        log::info!(
            "Loaded model from {} ({}x{}, trained {})",
            path.display(),
            state.grid.map_size(),
            state.grid.map_size(),
            state.trained_at
        );
        self.install_model(state);
        Ok(())
    }

    /// Sleep up to `duration`. Returns `false` when cancelled meanwhile.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.is_cancelled() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            thread::sleep(SLEEP_SLICE.min(deadline - now));
        }
    }
}
