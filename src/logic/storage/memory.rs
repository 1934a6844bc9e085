use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use super::record::{AnomalyResult, LogRecord};
use super::{DataSink, DataSource, RetrieveWindow};
use crate::logic::error::DetectorResult;

/// Hands out queued batches one per `retrieve`; empty once drained.
/// Clones share the same queue so a caller can keep feeding it.
#[derive(Clone, Default)]
pub struct MemorySource {
    batches: Arc<Mutex<VecDeque<Vec<LogRecord>>>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_batch(&self, batch: Vec<LogRecord>) {
        self.batches.lock().push_back(batch);
    }

    pub fn pending(&self) -> usize {
        self.batches.lock().len()
    }
}

impl DataSource for MemorySource {
    fn name(&self) -> &str {
        "memory"
    }

    fn retrieve(&mut self, window: RetrieveWindow) -> DetectorResult<Vec<LogRecord>> {
        let mut batch = self.batches.lock().pop_front().unwrap_or_default();
        batch.truncate(window.max_entries);
        Ok(batch)
    }
}

/// Collects results; clones share the collected list
#[derive(Clone, Default)]
pub struct MemorySink {
    results: Arc<Mutex<Vec<AnomalyResult>>>,
    batches: Arc<Mutex<usize>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn results(&self) -> Vec<AnomalyResult> {
        self.results.lock().clone()
    }

    /// Number of `store_results` calls
    pub fn batches(&self) -> usize {
        *self.batches.lock()
    }
}

impl DataSink for MemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    fn store_results(&mut self, results: &[AnomalyResult]) -> DetectorResult<()> {
        self.results.lock().extend_from_slice(results);
        *self.batches.lock() += 1;
        Ok(())
    }
}
