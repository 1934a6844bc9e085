use std::fmt;
use std::str::FromStr;

use super::inference::InferStep;
use super::pipeline::Pipeline;
use super::training::TrainStep;
use crate::logic::config::DetectorConfig;
use crate::logic::error::DetectorError;

/// Named workflows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    Train,
    Inference,
    TrainInference,
}

impl JobKind {
    pub const ALL: [JobKind; 3] = [JobKind::Train, JobKind::Inference, JobKind::TrainInference];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Train => "sompy.train",
            JobKind::Inference => "sompy.inference",
            JobKind::TrainInference => "sompy.train.inference",
        }
    }

    /// Build the step sequence for this job
    pub fn pipeline(&self, config: &DetectorConfig) -> Pipeline {
        let mut pipeline = Pipeline::new();
        match self {
            JobKind::Train => {
                pipeline.add_step(TrainStep::new(config.retrain_on_existing_model));
            }
            JobKind::Inference => {
                pipeline.add_step(InferStep::new());
            }
            JobKind::TrainInference => {
                pipeline
                    .add_step(TrainStep::new(config.retrain_on_existing_model))
                    .add_step(InferStep::new());
            }
        }
        pipeline
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobKind {
    type Err = DetectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobKind::ALL
            .iter()
            .find(|job| job.as_str() == s)
            .copied()
            .ok_or_else(|| {
                let known: Vec<&str> = JobKind::ALL.iter().map(|j| j.as_str()).collect();
                DetectorError::Config(format!("unknown job '{}' (expected one of: {})", s, known.join(", ")))
            })
    }
}
