//! Detector configuration
//!
//! Every field can be overridden by a `LAD_<NAME>` environment variable.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::constants::{self, env_key};
use super::error::{DetectorError, DetectorResult};

/// Where inference results are written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkKind {
    /// JSON lines appended to `output_path`
    File,
    /// One log line per result
    Stdout,
}

impl FromStr for SinkKind {
    type Err = DetectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "file" | "local" => Ok(SinkKind::File),
            "stdout" | "stdout.sink" => Ok(SinkKind::Stdout),
            other => Err(DetectorError::Config(format!("Unsupported sink: {}", other))),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Side length of the SOM grid
    pub map_size: usize,

    /// Training steps per pass
    pub train_iterations: usize,

    /// Scoring worker count (values < 1 behave as 1)
    pub parallelism: usize,

    /// Neighbourhood window around the BMU
    pub neighborhood_radius: usize,

    /// Threshold multiplier `k`
    pub threshold_multiplier: f64,

    /// Inference cycles before retraining
    pub infer_loops: usize,

    /// Refine an existing model instead of skipping training
    pub retrain_on_existing_model: bool,

    pub train_time_span: u64,
    pub train_max_entries: usize,
    pub infer_time_span: u64,
    pub infer_max_entries: usize,

    /// Embedding dimensionality produced by the default encoder
    pub vector_length: usize,

    /// Copies of each confirmed-normal message injected into training
    pub freq_noise: usize,

    /// Fact store base URL (feedback service)
    pub fact_store_url: Option<String>,

    pub model_dir: PathBuf,
    pub model_file: String,

    /// Input file for the local data source
    pub input_path: Option<PathBuf>,

    /// Output file for the file sink
    pub output_path: Option<PathBuf>,

    pub sink: SinkKind,

    /// Fixed RNG seed for reproducible training
    pub seed: Option<u64>,

    pub empty_batch_backoff: Duration,
    pub retry_delay: Duration,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            map_size: constants::DEFAULT_MAP_SIZE,
            train_iterations: constants::DEFAULT_TRAIN_ITERATIONS,
            parallelism: constants::default_parallelism(),
            neighborhood_radius: constants::DEFAULT_NEIGHBORHOOD_RADIUS,
            threshold_multiplier: constants::DEFAULT_THRESHOLD_MULTIPLIER,
            infer_loops: constants::DEFAULT_INFER_LOOPS,
            retrain_on_existing_model: false,
            train_time_span: constants::DEFAULT_TRAIN_TIME_SPAN,
            train_max_entries: constants::DEFAULT_TRAIN_MAX_ENTRIES,
            infer_time_span: constants::DEFAULT_INFER_TIME_SPAN,
            infer_max_entries: constants::DEFAULT_INFER_MAX_ENTRIES,
            vector_length: constants::DEFAULT_VECTOR_LENGTH,
            freq_noise: constants::DEFAULT_FREQ_NOISE,
            fact_store_url: None,
            model_dir: constants::default_model_dir(),
            model_file: constants::DEFAULT_MODEL_FILE.to_string(),
            input_path: None,
            output_path: None,
            sink: SinkKind::Stdout,
            seed: None,
            empty_batch_backoff: Duration::from_secs(constants::DEFAULT_EMPTY_BATCH_BACKOFF),
            retry_delay: Duration::from_secs(constants::DEFAULT_RETRY_DELAY),
        }
    }
}

impl DetectorConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let d = Self::default();

        Self {
            map_size: env_parse("MAP_SIZE", d.map_size),
            train_iterations: env_parse("TRAIN_ITERATIONS", d.train_iterations),
            parallelism: env_parse("PARALLELISM", d.parallelism),
            neighborhood_radius: env_parse("NEIGHBORHOOD_RADIUS", d.neighborhood_radius),
            threshold_multiplier: env_parse("INFER_ANOMALY_THRESHOLD", d.threshold_multiplier),
            infer_loops: env_parse("INFER_LOOPS", d.infer_loops),
            retrain_on_existing_model: env_bool("TRAIN_UPDATE_MODEL", d.retrain_on_existing_model),
            train_time_span: env_parse("TRAIN_TIME_SPAN", d.train_time_span),
            train_max_entries: env_parse("TRAIN_MAX_ENTRIES", d.train_max_entries),
            infer_time_span: env_parse("INFER_TIME_SPAN", d.infer_time_span),
            infer_max_entries: env_parse("INFER_MAX_ENTRIES", d.infer_max_entries),
            vector_length: env_parse("TRAIN_VECTOR_LENGTH", d.vector_length),
            freq_noise: env_parse("FREQ_NOISE", d.freq_noise),
            fact_store_url: env_string("FACT_STORE_URL"),
            model_dir: env_string("MODEL_DIR").map(PathBuf::from).unwrap_or(d.model_dir),
            model_file: env_string("MODEL_FILE").unwrap_or(d.model_file),
            input_path: env_string("INPUT_PATH").map(PathBuf::from),
            output_path: env_string("OUTPUT_PATH").map(PathBuf::from),
            sink: env_parse("SINK", d.sink),
            seed: env_string("SEED").and_then(|s| s.parse().ok()),
            empty_batch_backoff: Duration::from_secs(
                env_parse("EMPTY_BATCH_BACKOFF", constants::DEFAULT_EMPTY_BATCH_BACKOFF),
            ),
            retry_delay: Duration::from_secs(
                env_parse("RETRY_DELAY", constants::DEFAULT_RETRY_DELAY),
            ),
        }
    }

    /// Full path of the persisted model
    pub fn model_path(&self) -> PathBuf {
        self.model_dir.join(&self.model_file)
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> DetectorResult<()> {
        if self.map_size == 0 {
            return Err(DetectorError::Config("map_size must be at least 1".into()));
        }
        if self.vector_length == 0 {
            return Err(DetectorError::Config("vector_length must be at least 1".into()));
        }
        if !self.threshold_multiplier.is_finite() || self.threshold_multiplier <= 0.0 {
            return Err(DetectorError::Config(format!(
                "threshold multiplier must be a positive number, got {}",
                self.threshold_multiplier
            )));
        }
        if self.sink == SinkKind::File && self.output_path.is_none() {
            return Err(DetectorError::Config("file sink requires LAD_OUTPUT_PATH".into()));
        }
        Ok(())
    }
}

// ============================================================================
// ENV HELPERS
// ============================================================================

fn env_string(name: &str) -> Option<String> {
    env::var(env_key(name)).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: FromStr>(name: &str, default: T) -> T {
    match env_string(name) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            log::warn!("Ignoring invalid value '{}' for {}", raw, env_key(name));
            default
        }),
        None => default,
    }
}

fn env_bool(name: &str, default: bool) -> bool {
    match env_string(name) {
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "y" | "on" | "t" => true,
            "0" | "false" | "no" | "n" | "off" | "f" => false,
            _ => {
                log::warn!("Ignoring invalid boolean '{}' for {}", raw, env_key(name));
                default
            }
        },
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DetectorConfig::default();
        assert_eq!(config.map_size, 24);
        assert_eq!(config.infer_loops, 10);
        assert!((config.threshold_multiplier - 3.1).abs() < f64::EPSILON);
        assert!(config.model_path().ends_with("SOM.model"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_map() {
        let config = DetectorConfig {
            map_size: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(DetectorError::Config(_))));
    }

    #[test]
    fn test_file_sink_needs_output_path() {
        let config = DetectorConfig {
            sink: SinkKind::File,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_sink_kind_parse() {
        assert_eq!("stdout".parse::<SinkKind>().unwrap(), SinkKind::Stdout);
        assert_eq!("FILE".parse::<SinkKind>().unwrap(), SinkKind::File);
        assert!("kafka".parse::<SinkKind>().is_err());
    }
}
