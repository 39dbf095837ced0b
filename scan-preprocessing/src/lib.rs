/// Geometric preprocessing for multi-view point cloud scans: uniform
/// downsampling, statistical outlier removal, overlap-aware range splitting
/// and conversion to fixed binary records.
pub mod batch;
pub mod bounds;
pub mod cli;
pub mod codec;
pub mod config;
pub mod constants;
pub mod downsample;
pub mod error;
pub mod labels;
pub mod marker;
pub mod neighbor_index;
pub mod outlier;
pub mod point_set;
pub mod serializer;
pub mod splitter;

pub use crate::bounds::PointCloudBounds;
pub use crate::config::PipelineConfig;
pub use crate::downsample::downsample;
pub use crate::error::{PreprocessError, Result};
pub use crate::labels::{BoxLabel, LabelFile, format_labels, parse_labels};
pub use crate::neighbor_index::NeighborIndex;
pub use crate::outlier::{OutlierReport, filter, filter_with_index, remove_outliers};
pub use crate::point_set::{Axis, IndexSubset, Point, PointSet};
pub use crate::serializer::{OutputFormat, deserialize, serialize};
pub use crate::splitter::{PartitionDescriptor, SplitOutput, SplitParams, split};
