/// Error types shared by the preprocessing stages, codecs and batch drivers.
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PreprocessError>;

#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("invalid stride {0}: must be at least 1")]
    InvalidStride(usize),

    #[error("invalid neighbour count {0}: must be at least 1")]
    InvalidNeighborCount(usize),

    #[error("invalid standard deviation ratio {0}: must be positive and finite")]
    InvalidStdRatio(f64),

    #[error("invalid split parameters: {0}")]
    InvalidSplit(String),

    #[error("invalid scale factor {0}: must be finite")]
    InvalidScale(f64),

    #[error("{0}")]
    Usage(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(
        "output directory {} is already populated; it looks like the input was preprocessed before",
        .0.display()
    )]
    OutputExists(PathBuf),

    #[error(
        "directory {} carries a split marker; it looks like the data was split before",
        .0.display()
    )]
    AlreadySplit(PathBuf),

    #[error("point {index} has a non-finite coordinate")]
    NonFiniteCoordinate { index: usize },

    #[error("record buffer of {len} bytes is not a multiple of {record_size}")]
    MalformedRecords { len: usize, record_size: usize },

    #[error("point {index} does not fit an f32 record after scaling")]
    RecordOverflow { index: usize },

    #[error("malformed .npy buffer: {0}")]
    MalformedNpy(String),

    #[error("neighbour index covers {index_len} points but the point set has {points_len}")]
    IndexMismatch { index_len: usize, points_len: usize },

    #[error("invalid index subset: {0}")]
    InvalidIndices(String),

    #[error("unsupported format for {}", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("PLY error: {0}")]
    Ply(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("LAS error: {0}")]
    Las(#[from] las::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PreprocessError {
    /// True for the idempotence guards that abort a batch before any write.
    pub fn is_guard(&self) -> bool {
        matches!(
            self,
            PreprocessError::OutputExists(_) | PreprocessError::AlreadySplit(_)
        )
    }
}
