//! Jobs Module - detection workflow
//!
//! ## Structure
//! - `context.rs` - shared collaborators, published model, stats, cancellation
//! - `training.rs` - training orchestrator and train step
//! - `inference.rs` - inference orchestrator and infer step
//! - `pipeline.rs` - ordered step queue with tracing
//! - `catalog.rs` - named jobs to pipelines

pub mod context;
pub mod training;
pub mod inference;
pub mod pipeline;
pub mod catalog;


pub use context::{CancelToken, DetectionContext, DetectorStats, StatsSnapshot};
pub use training::{TrainStep, TrainingOrchestrator};
pub use inference::{BatchSummary, InferStep, InferenceOrchestrator};
pub use pipeline::{LogTracer, Pipeline, PipelineStep, Span, Step, Tracer};
pub use catalog::JobKind;
