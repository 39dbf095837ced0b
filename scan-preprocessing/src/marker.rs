/// Processing markers recording that a directory was produced by a stage.
///
/// The marker file is the idempotence guard: its presence, not the names of
/// the point files next to it, tells a later run that the work is done.
use crate::bounds::PointCloudBounds;
use crate::constants::{PREPROCESS_MARKER, SPLIT_MARKER};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Preprocess,
    Split,
}

impl Stage {
    pub fn marker_name(self) -> &'static str {
        match self {
            Stage::Preprocess => PREPROCESS_MARKER,
            Stage::Split => SPLIT_MARKER,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerState {
    /// Written before the first output so an interrupted run is still guarded.
    InProgress,
    Complete,
}

/// One processed input and the files produced from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerEntry {
    pub source: String,
    pub outputs: Vec<String>,
    pub input_points: usize,
    pub output_points: Vec<usize>,
    pub bounds: Option<PointCloudBounds>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerFailure {
    pub source: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingMarker {
    pub stage: Stage,
    pub state: MarkerState,
    pub tool_version: String,
    /// Parameters the stage ran with.
    pub parameters: serde_json::Value,
    pub entries: Vec<MarkerEntry>,
    pub failures: Vec<MarkerFailure>,
    #[serde(default)]
    pub skipped: Vec<String>,
}

impl ProcessingMarker {
    pub fn new(stage: Stage, parameters: serde_json::Value) -> Self {
        Self {
            stage,
            state: MarkerState::InProgress,
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            parameters,
            entries: Vec::new(),
            failures: Vec::new(),
            skipped: Vec::new(),
        }
    }

    pub fn path_in(dir: &Path, stage: Stage) -> PathBuf {
        dir.join(stage.marker_name())
    }

    /// Writes the marker as pretty JSON into `dir`.
    pub fn write(&self, dir: &Path) -> Result<PathBuf> {
        let path = Self::path_in(dir, self.stage);
        let json = serde_json::to_string_pretty(self)?;
        fs::write(&path, json)?;
        log::debug!("Wrote {:?} marker ({:?}) to {}", self.stage, self.state, path.display());
        Ok(path)
    }

    pub fn read(dir: &Path, stage: Stage) -> Result<Self> {
        let data = fs::read_to_string(Self::path_in(dir, stage))?;
        Ok(serde_json::from_str(&data)?)
    }
}

/// True when `dir` already holds the marker for `stage`.
pub fn is_marked(dir: &Path, stage: Stage) -> bool {
    ProcessingMarker::path_in(dir, stage).is_file()
}
