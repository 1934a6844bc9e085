use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::grid::Grid;
use super::metadata::ScoreMetadata;
use crate::logic::error::{DetectorError, DetectorResult};

/// Bump when the persisted layout changes
pub const MODEL_FORMAT_VERSION: u8 = 1;

/// Grid and score metadata, always saved and loaded together
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelState {
    pub format_version: u8,
    pub grid: Grid,
    pub metadata: ScoreMetadata,
    pub trained_at: DateTime<Utc>,
    /// CRC32 of the grid values
    pub checksum: u32,
}

impl ModelState {
    pub fn new(grid: Grid, metadata: ScoreMetadata) -> Self {
        let checksum = grid.checksum();
        Self {
            format_version: MODEL_FORMAT_VERSION,
            grid,
            metadata,
            trained_at: Utc::now(),
            checksum,
        }
    }

    /// Reject files from another format version, corrupted grids and
    /// metadata that violates its invariants
    pub fn validate(&self) -> DetectorResult<()> {
        if self.format_version != MODEL_FORMAT_VERSION {
            return Err(DetectorError::ModelLoad(format!(
                "model format v{} is not supported (expected v{})",
                self.format_version, MODEL_FORMAT_VERSION
            )));
        }
        if self.grid.checksum() != self.checksum {
            return Err(DetectorError::ModelLoad(format!(
                "checksum mismatch: stored {:08x}, computed {:08x}",
                self.checksum,
                self.grid.checksum()
            )));
        }
        self.metadata
            .validate()
            .map_err(|e| DetectorError::ModelLoad(e.to_string()))
    }
}

/// Save atomically: write a sibling temp file, then rename over the target
pub fn save_model(state: &ModelState, path: &Path) -> DetectorResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| DetectorError::ModelSave(format!("{}: {}", parent.display(), e)))?;
        }
    }

    let json = serde_json::to_vec(state)
        .map_err(|e| DetectorError::ModelSave(e.to_string()))?;

    let tmp = temp_path(path);
    fs::write(&tmp, json)
        .map_err(|e| DetectorError::ModelSave(format!("{}: {}", tmp.display(), e)))?;

    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(DetectorError::ModelSave(format!("{}: {}", path.display(), e)));
    }

    log::info!("Model saved to {} (checksum {:08x})", path.display(), state.checksum);
    Ok(())
}

/// Load and validate. Every failure is a recoverable `ModelLoad`.
pub fn load_model(path: &Path) -> DetectorResult<ModelState> {
    if !path.is_file() {
        return Err(DetectorError::ModelLoad(format!("file {} does not exist", path.display())));
    }

    let data = fs::read(path)
        .map_err(|e| DetectorError::ModelLoad(format!("{}: {}", path.display(), e)))?;
    let state: ModelState = serde_json::from_slice(&data)
        .map_err(|e| DetectorError::ModelLoad(format!("{}: {}", path.display(), e)))?;

    state.validate()?;
    Ok(state)
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
