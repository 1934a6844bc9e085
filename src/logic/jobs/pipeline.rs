//! Task Pipeline
//!
//! Ordered steps with a uniform contract and optional tracing. Steps run in
//! insertion order and stay queued afterwards so the run loop can replay the
//! same workflow every cycle.

use std::time::Instant;

use super::context::DetectionContext;
use super::inference::InferStep;
use super::training::TrainStep;
use crate::logic::error::DetectorResult;

// ============================================================================
// TRACING
// ============================================================================

/// An open trace span
#[derive(Debug)]
pub struct Span {
    pub name: String,
    pub started: Instant,
}

impl Span {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            started: Instant::now(),
        }
    }
}

pub trait Tracer: Send + Sync {
    fn start(&self, name: &str) -> Span {
        Span::new(name)
    }

    fn finish(&self, span: Span, ok: bool);
}

/// Writes span timings to the log
#[derive(Debug, Default)]
pub struct LogTracer;

impl Tracer for LogTracer {
    fn start(&self, name: &str) -> Span {
        log::debug!("step {} started", name);
        Span::new(name)
    }

    fn finish(&self, span: Span, ok: bool) {
        let elapsed = span.started.elapsed();
        if ok {
            log::info!("step {} finished in {:.2?}", span.name, elapsed);
        } else {
            log::warn!("step {} failed after {:.2?}", span.name, elapsed);
        }
    }
}

// ============================================================================
// STEPS
// ============================================================================

pub trait Step: Send {
    fn name(&self) -> &str;

    fn execute(&mut self, ctx: &mut DetectionContext) -> DetectorResult<()>;

    fn execute_with_tracing(&mut self, ctx: &mut DetectionContext, tracer: &dyn Tracer) -> DetectorResult<()> {
        let span = tracer.start(self.name());
        let result = self.execute(ctx);
        tracer.finish(span, result.is_ok());
        result
    }
}

impl Step for TrainStep {
    fn name(&self) -> &str {
        "train"
    }

    fn execute(&mut self, ctx: &mut DetectionContext) -> DetectorResult<()> {
        self.run(ctx)
    }
}

impl Step for InferStep {
    fn name(&self) -> &str {
        "infer"
    }

    fn execute(&mut self, ctx: &mut DetectionContext) -> DetectorResult<()> {
        self.run(ctx)
    }
}

pub enum PipelineStep {
    Train(TrainStep),
    Infer(InferStep),
    Custom(Box<dyn Step>),
}

impl PipelineStep {
    fn as_step(&mut self) -> &mut dyn Step {
        match self {
            PipelineStep::Train(step) => step,
            PipelineStep::Infer(step) => step,
            PipelineStep::Custom(step) => step.as_mut(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            PipelineStep::Train(step) => step.name(),
            PipelineStep::Infer(step) => step.name(),
            PipelineStep::Custom(step) => step.name(),
        }
    }
}

impl From<TrainStep> for PipelineStep {
    fn from(step: TrainStep) -> Self {
        PipelineStep::Train(step)
    }
}

impl From<InferStep> for PipelineStep {
    fn from(step: InferStep) -> Self {
        PipelineStep::Infer(step)
    }
}

impl From<Box<dyn Step>> for PipelineStep {
    fn from(step: Box<dyn Step>) -> Self {
        PipelineStep::Custom(step)
    }
}

// ============================================================================
// PIPELINE
// ============================================================================

#[derive(Default)]
pub struct Pipeline {
    steps: Vec<PipelineStep>,
    count: u64,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_step(&mut self, step: impl Into<PipelineStep>) -> &mut Self {
        self.steps.push(step.into());
        self
    }

    /// Run every step in order. The first failure is returned as-is and the
    /// remaining steps are not run.
    pub fn execute_all(&mut self, ctx: &mut DetectionContext, tracer: Option<&dyn Tracer>) -> DetectorResult<()> {
        for step in self.steps.iter_mut() {
            let step = step.as_step();
            match tracer {
                Some(tracer) => step.execute_with_tracing(ctx, tracer)?,
                None => step.execute(ctx)?,
            }
            self.count += 1;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Steps executed successfully over the pipeline's lifetime
    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Drop all queued steps. The executed count is kept.
    pub fn clear(&mut self) {
        self.steps.clear();
    }
}
