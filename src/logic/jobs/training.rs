//! Training Orchestrator
//!
//! Decides whether to recreate, refine or skip the model, then runs
//! encode -> train -> self-score -> summarise -> persist.

use super::context::DetectionContext;
use crate::logic::error::{DetectorError, DetectorResult};
use crate::logic::feedback::FeedbackSet;
use crate::logic::model::{save_model, ModelState, ScoreMetadata, TrainOptions};
use crate::logic::storage::{LogRecord, RetrieveWindow};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrainingOrchestrator {
    pub model_exists: bool,
    pub retrain_requested: bool,
    /// Set whenever the persisted model failed to load or never existed
    pub force_recreate: bool,
}

impl TrainingOrchestrator {
    pub fn new(retrain_requested: bool) -> Self {
        Self {
            model_exists: false,
            retrain_requested,
            force_recreate: false,
        }
    }

    pub fn should_train(&self) -> bool {
        (self.model_exists && self.retrain_requested) || self.force_recreate || !self.model_exists
    }

    /// Sync `model_exists` / `force_recreate` with the context, loading the
    /// persisted model when nothing is in memory yet
    pub fn refresh(&mut self, ctx: &mut DetectionContext) {
        if ctx.model.is_some() {
            self.model_exists = true;
            return;
        }

        match ctx.load_persisted_model() {
            Ok(()) => self.model_exists = true,
            Err(e) => {
                log::warn!("{}; a new model will be created", e);
                self.model_exists = false;
                self.force_recreate = true;
            }
        }
    }

    /// Train on one batch and persist the result.
    ///
    /// Returns the score summary and the self-scores of the batch.
    pub fn execute(
        &mut self,
        ctx: &mut DetectionContext,
        batch: &[LogRecord],
    ) -> DetectorResult<(ScoreMetadata, Vec<f64>)> {
        if batch.is_empty() {
            return Err(DetectorError::EmptyDataSet("no records to train on".into()));
        }

        ctx.encoder.update(batch)?;
        let embeddings = ctx.encoder.encode(batch)?;

        let opts = TrainOptions {
            map_size: ctx.config.map_size,
            iterations: ctx.config.train_iterations,
            parallelism: ctx.config.parallelism,
            recreate: self.force_recreate,
        };
        log::info!(
            "Training SOM on {} records ({} iterations, recreate={})",
            embeddings.len(),
            opts.iterations,
            opts.recreate
        );
        ctx.engine.train(&embeddings, opts)?;

        let scores = ctx.engine.score_with(&ctx.scoring, &embeddings)?;
        let metadata = ScoreMetadata::from_scores(&scores)?;

        let grid = ctx.engine.grid()
            .cloned()
            .ok_or_else(|| DetectorError::ModelSave("engine has no grid after training".into()))?;
        let state = ModelState::new(grid, metadata);
        save_model(&state, &ctx.config.model_path())?;

        ctx.model = Some(state);
        ctx.stats.record_training();
        self.model_exists = true;
        self.force_recreate = false;

        log::info!(
            "Training complete: mean={:.4} stddev={:.4} min={:.4} max={:.4}",
            metadata.mean,
            metadata.stddev,
            metadata.min,
            metadata.max
        );
        Ok((metadata, scores))
    }
}

/// Pipeline step: fetch a training window, add feedback noise, train
pub struct TrainStep {
    orchestrator: TrainingOrchestrator,
}

impl TrainStep {
    pub fn new(retrain_requested: bool) -> Self {
        Self {
            orchestrator: TrainingOrchestrator::new(retrain_requested),
        }
    }

    pub fn orchestrator(&self) -> &TrainingOrchestrator {
        &self.orchestrator
    }

    pub fn run(&mut self, ctx: &mut DetectionContext) -> DetectorResult<()> {
        self.orchestrator.refresh(ctx);
        if !self.orchestrator.should_train() {
            log::info!("Model already exists and retraining is disabled, skipping training");
            return Ok(());
        }

        let mut batch = ctx.source.retrieve(RetrieveWindow::training(&ctx.config))?;
        if batch.is_empty() {
            return Err(DetectorError::EmptyDataSet(format!(
                "no logs in the last {} seconds",
                ctx.config.train_time_span
            )));
        }
        log::info!("{} logs loaded from the last {} seconds", batch.len(), ctx.config.train_time_span);

        let feedback = FeedbackSet::load(ctx.feedback.as_mut());
        batch.extend(feedback.noise_records(ctx.config.freq_noise));

        self.orchestrator.execute(ctx, &batch)?;
        Ok(())
    }
}
