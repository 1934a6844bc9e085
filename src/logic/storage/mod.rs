//! Storage Module - Log ingestion and result sinks
//!
//! Data sources return raw log records for a time window; an empty vector
//! means "no data this cycle" and is not an error. Sinks receive each scored
//! batch as soon as it is ready.
//!
//! ## Structure
//! - `record.rs` - `LogRecord`, `AnomalyResult`
//! - `local.rs` - file source / JSON-lines sink
//! - `stdout.rs` - log-only sink
//! - `memory.rs` - in-process queue source and collecting sink

pub mod record;
pub mod local;
pub mod stdout;
pub mod memory;

pub use record::{AnomalyResult, LogRecord};
pub use local::{LocalFileSink, LocalFileSource};
pub use stdout::StdoutSink;
pub use memory::{MemorySink, MemorySource};

use crate::logic::config::{DetectorConfig, SinkKind};
use crate::logic::error::{DetectorError, DetectorResult};

/// How far back to look and how many records to load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrieveWindow {
    pub time_span_secs: u64,
    pub max_entries: usize,
}

impl RetrieveWindow {
    pub fn training(config: &DetectorConfig) -> Self {
        Self {
            time_span_secs: config.train_time_span,
            max_entries: config.train_max_entries,
        }
    }

    pub fn inference(config: &DetectorConfig) -> Self {
        Self {
            time_span_secs: config.infer_time_span,
            max_entries: config.infer_max_entries,
        }
    }
}

/// Ingestion side
pub trait DataSource: Send {
    fn name(&self) -> &str;

    /// Records in the window. `Ok(vec![])` when nothing arrived.
    fn retrieve(&mut self, window: RetrieveWindow) -> DetectorResult<Vec<LogRecord>>;
}

/// Output side
pub trait DataSink: Send {
    fn name(&self) -> &str;

    fn store_results(&mut self, results: &[AnomalyResult]) -> DetectorResult<()>;
}

/// Build the configured source
pub fn source_from_config(config: &DetectorConfig) -> DetectorResult<Box<dyn DataSource>> {
    match &config.input_path {
        Some(path) => {
            log::info!("Using local file datasource: {}", path.display());
            Ok(Box::new(LocalFileSource::new(path.clone())))
        }
        None => Err(DetectorError::Config("no data source configured (set LAD_INPUT_PATH)".into())),
    }
}

/// Build the configured sink
pub fn sink_from_config(config: &DetectorConfig) -> DetectorResult<Box<dyn DataSink>> {
    match config.sink {
        SinkKind::File => {
            let path = config.output_path.clone()
                .ok_or_else(|| DetectorError::Config("file sink requires LAD_OUTPUT_PATH".into()))?;
            log::info!("Saving results to local file: {}", path.display());
            Ok(Box::new(LocalFileSink::new(path)))
        }
        SinkKind::Stdout => {
            log::info!("Saving results to stdout sink");
            Ok(Box::new(StdoutSink::new(config.fact_store_url.clone())))
        }
    }
}
