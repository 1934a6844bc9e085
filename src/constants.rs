//! Central Configuration Constants
//!
//! Single source of truth for all configuration defaults.
//! `DetectorConfig::from_env` falls back to these values.

use std::path::PathBuf;

/// Environment variable prefix for every setting
pub const ENV_PREFIX: &str = "LAD";

/// Side length of the SOM grid
pub const DEFAULT_MAP_SIZE: usize = 24;

/// SOM training iterations per pass
pub const DEFAULT_TRAIN_ITERATIONS: usize = 4500;

/// Neighbourhood window around the BMU (cells in each axis)
pub const DEFAULT_NEIGHBORHOOD_RADIUS: usize = 12;

/// Multiplier `k` in `threshold = k * stddev + mean`
pub const DEFAULT_THRESHOLD_MULTIPLIER: f64 = 3.1;

/// Inference cycles between two training passes
pub const DEFAULT_INFER_LOOPS: usize = 10;

/// Seconds of history loaded for training
pub const DEFAULT_TRAIN_TIME_SPAN: u64 = 900;

/// Maximum records loaded for training
pub const DEFAULT_TRAIN_MAX_ENTRIES: usize = 10_000;

/// Seconds of history loaded per inference cycle (also the cycle interval)
pub const DEFAULT_INFER_TIME_SPAN: u64 = 60;

/// Maximum records loaded per inference cycle
pub const DEFAULT_INFER_MAX_ENTRIES: usize = 10_000;

/// Length of an encoded log vector
pub const DEFAULT_VECTOR_LENGTH: usize = 25;

/// Copies of each confirmed-normal message injected into training
pub const DEFAULT_FREQ_NOISE: usize = 100;

/// Sleep before re-pulling an empty inference batch (seconds)
pub const DEFAULT_EMPTY_BATCH_BACKOFF: u64 = 5;

/// Sleep before the run loop retries after a recoverable failure (seconds)
pub const DEFAULT_RETRY_DELAY: u64 = 5;

/// File name of the persisted SOM model
pub const DEFAULT_MODEL_FILE: &str = "SOM.model";

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// App name
pub const APP_NAME: &str = "log-anomaly-detector";

/// Default model directory (platform data dir, falls back to `./models`)
pub fn default_model_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join(APP_NAME).join("models"))
        .unwrap_or_else(|| PathBuf::from("./models"))
}

/// Default worker count for scoring
pub fn default_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Full environment variable name for a setting (`LAD_<NAME>`)
pub fn env_key(name: &str) -> String {
    format!("{}_{}", ENV_PREFIX, name)
}
