/// Calibration defaults and shared names for point cloud preprocessing

/// Default uniform downsampling stride
pub const DEFAULT_STRIDE: usize = 8;

/// Default neighbour count for statistical outlier removal
pub const DEFAULT_NEIGHBORS: usize = 5;

/// Default standard deviation multiplier for outlier rejection
pub const DEFAULT_STD_RATIO: f64 = 1.0;

/// Physical extent of a scan along the split axis (scanner units)
pub const DEFAULT_TOTAL_SPAN: f64 = 5.13;

/// Split thresholds as fractions of the total span
pub const DEFAULT_MID_FRACTION: f64 = 0.5;
pub const DEFAULT_LOW_FRACTION: f64 = 0.23;
pub const DEFAULT_HIGH_FRACTION: f64 = 0.77;

/// Coordinate magnification applied when converting to binary records
pub const DEFAULT_SCALE_FACTOR: f64 = 20.0;

/// Bytes per serialized record: x, y, z, attribute as f32
pub const RECORD_SIZE: usize = 16;

/// Point file extensions picked up by batch discovery
pub const POINT_FILE_EXTENSIONS: &[&str] = &["ply", "las", "laz"];

/// Sentinel written into a preprocess output directory
pub const PREPROCESS_MARKER: &str = "preprocess_manifest.json";

/// Sentinel written into a directory once it has been split
pub const SPLIT_MARKER: &str = "split_manifest.json";

/// Filename suffixes for the upper and lower partitions
pub const UPPER_PART_SUFFIX: &str = "_part1";
pub const LOWER_PART_SUFFIX: &str = "_part2";

/// Annotation files picked up by label conversion
pub const LABEL_EXTENSION: &str = "json";
