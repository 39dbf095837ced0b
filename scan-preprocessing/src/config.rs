/// Deployment calibration loaded from JSON.
///
/// Every section is optional; missing fields fall back to the defaults in
/// `constants`.
use crate::constants::{
    DEFAULT_HIGH_FRACTION, DEFAULT_LOW_FRACTION, DEFAULT_MID_FRACTION, DEFAULT_NEIGHBORS,
    DEFAULT_SCALE_FACTOR, DEFAULT_STD_RATIO, DEFAULT_STRIDE, DEFAULT_TOTAL_SPAN,
};
use crate::error::{PreprocessError, Result};
use crate::outlier::OutlierParams;
use crate::point_set::Axis;
use crate::splitter::SplitParams;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub preprocess: PreprocessConfig,
    pub split: SplitConfig,
    pub convert: ConvertConfig,
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        self.preprocess.validate()?;
        self.split.params().validate()?;
        self.convert.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Uniform downsampling stride, applied before outlier removal.
    pub stride: usize,
    pub neighbors: usize,
    pub std_ratio: f64,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            stride: DEFAULT_STRIDE,
            neighbors: DEFAULT_NEIGHBORS,
            std_ratio: DEFAULT_STD_RATIO,
        }
    }
}

impl PreprocessConfig {
    pub fn outlier_params(&self) -> OutlierParams {
        OutlierParams {
            neighbors: self.neighbors,
            std_ratio: self.std_ratio,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.stride < 1 {
            return Err(PreprocessError::InvalidStride(self.stride));
        }
        self.outlier_params().validate()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    pub axis: Axis,
    pub total_span: f64,
    pub mid_fraction: f64,
    pub low_fraction: f64,
    pub high_fraction: f64,
    /// Keep the unsplit source files instead of removing them.
    pub keep_source: bool,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            axis: Axis::X,
            total_span: DEFAULT_TOTAL_SPAN,
            mid_fraction: DEFAULT_MID_FRACTION,
            low_fraction: DEFAULT_LOW_FRACTION,
            high_fraction: DEFAULT_HIGH_FRACTION,
            keep_source: false,
        }
    }
}

impl SplitConfig {
    pub fn params(&self) -> SplitParams {
        SplitParams {
            axis: self.axis,
            total_span: self.total_span,
            mid_fraction: self.mid_fraction,
            low_fraction: self.low_fraction,
            high_fraction: self.high_fraction,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertConfig {
    /// Multiplier applied to x, y and z when writing binary records.
    pub scale_factor: f64,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            scale_factor: DEFAULT_SCALE_FACTOR,
        }
    }
}

impl ConvertConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.scale_factor.is_finite() {
            return Err(PreprocessError::InvalidScale(self.scale_factor));
        }
        Ok(())
    }
}

/// Reads and validates a configuration file.
pub fn load_config(path: &Path) -> Result<PipelineConfig> {
    let data = fs::read_to_string(path).map_err(|e| {
        PreprocessError::Config(format!("failed to read {}: {}", path.display(), e))
    })?;
    let config: PipelineConfig = serde_json::from_str(&data).map_err(|e| {
        PreprocessError::Config(format!("failed to parse {}: {}", path.display(), e))
    })?;
    config.validate()?;
    log::debug!("Loaded configuration from {}: {:?}", path.display(), config);
    Ok(config)
}
