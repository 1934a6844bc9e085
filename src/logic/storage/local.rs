use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use serde_json::Value;

use super::record::{AnomalyResult, LogRecord};
use super::{DataSink, DataSource, RetrieveWindow};
use crate::logic::error::{DetectorError, DetectorResult};

/// Reads log records from a JSON array file, a JSON-lines file, or stdin (`-`).
///
/// Local files carry no timestamps, so the time span of the window is
/// ignored and only `max_entries` applies.
pub struct LocalFileSource {
    path: PathBuf,
}

impl LocalFileSource {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn read_stdin(max_entries: usize) -> io::Result<Vec<LogRecord>> {
        let stdin = io::stdin();
        let mut records = Vec::new();

        for line in stdin.lock().lines() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            records.push(parse_line(trimmed));
            if records.len() >= max_entries {
                break;
            }
        }

        Ok(records)
    }
}

impl DataSource for LocalFileSource {
    fn name(&self) -> &str {
        "local"
    }

    fn retrieve(&mut self, window: RetrieveWindow) -> DetectorResult<Vec<LogRecord>> {
        if self.path.as_os_str() == "-" {
            return Ok(Self::read_stdin(window.max_entries)?);
        }

        log::info!("Reading from {}", self.path.display());
        let content = fs::read_to_string(&self.path)
            .map_err(|e| DetectorError::Storage(format!("{}: {}", self.path.display(), e)))?;

        let mut records = parse_content(&content)?;
        records.truncate(window.max_entries);

        log::info!("{} logs loaded", records.len());
        Ok(records)
    }
}

/// JSON array document or one JSON value per line
pub fn parse_content(content: &str) -> DetectorResult<Vec<LogRecord>> {
    let trimmed = content.trim_start();
    if trimmed.starts_with('[') {
        let values: Vec<Value> = serde_json::from_str(trimmed)?;
        return Ok(values.into_iter().map(LogRecord::from_json).collect());
    }

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(parse_line)
        .collect())
}

/// One line; anything that is not JSON is kept as plain text
fn parse_line(line: &str) -> LogRecord {
    match serde_json::from_str::<Value>(line) {
        Ok(value) => LogRecord::from_json(value),
        Err(e) => {
            log::debug!("Parsing failed ({}), assuming plain text", e);
            LogRecord::new(line)
        }
    }
}

/// Appends results as JSON lines
pub struct LocalFileSink {
    path: PathBuf,
    file: Option<File>,
}

impl LocalFileSink {
    pub fn new(path: PathBuf) -> Self {
        Self { path, file: None }
    }

    fn open(&mut self) -> io::Result<&mut File> {
        if self.file.is_none() {
            if let Some(parent) = self.path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
            let f = OpenOptions::new().create(true).append(true).open(&self.path)?;
            self.file = Some(f);
        }

        self.file
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "sink file not open"))
    }
}

impl DataSink for LocalFileSink {
    fn name(&self) -> &str {
        "local"
    }

    fn store_results(&mut self, results: &[AnomalyResult]) -> DetectorResult<()> {
        let file = self.open()?;
        for result in results {
            let json = serde_json::to_string(result)?;
            writeln!(file, "{}", json)?;
        }
        file.flush()?;
        Ok(())
    }
}
