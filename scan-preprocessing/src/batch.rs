/// Batch drivers composing the core stages over directories of scans.
use crate::bounds::PointCloudBounds;
use crate::codec::{self, is_point_file};
use crate::config::{PreprocessConfig, SplitConfig};
use crate::constants::{LABEL_EXTENSION, LOWER_PART_SUFFIX, UPPER_PART_SUFFIX};
use crate::downsample::downsample;
use crate::error::{PreprocessError, Result};
use crate::labels::{format_labels, label_file_name, parse_labels};
use crate::marker::{MarkerEntry, MarkerFailure, MarkerState, ProcessingMarker, Stage, is_marked};
use crate::outlier::remove_outliers;
use crate::point_set::PointSet;
use crate::serializer::{OutputFormat, write_records};
use crate::splitter::{SplitParams, split};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Runtime options shared by the batch drivers.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub show_progress: bool,
    /// Once set, no further files are started; running ones finish.
    pub cancel: Arc<AtomicBool>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            show_progress: true,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl BatchOptions {
    pub fn quiet() -> Self {
        Self {
            show_progress: false,
            ..Self::default()
        }
    }
}

#[derive(Debug)]
enum FileStatus {
    Done(MarkerEntry),
    Failed(String),
    Skipped,
}

/// Per-file results of one batch run.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub processed: Vec<MarkerEntry>,
    pub failures: Vec<MarkerFailure>,
    pub skipped: Vec<String>,
    pub marker_path: Option<PathBuf>,
}

impl BatchReport {
    fn from_outcomes(outcomes: Vec<(String, FileStatus)>) -> Self {
        let mut report = Self::default();
        for (source, status) in outcomes {
            match status {
                FileStatus::Done(entry) => report.processed.push(entry),
                FileStatus::Failed(error) => report.failures.push(MarkerFailure { source, error }),
                FileStatus::Skipped => report.skipped.push(source),
            }
        }
        report
    }

    fn record_into(&self, marker: &mut ProcessingMarker) {
        marker.entries = self.processed.clone();
        marker.failures = self.failures.clone();
        marker.skipped = self.skipped.clone();
    }

    /// True when every discovered file was processed.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.skipped.is_empty()
    }

    /// Prints batch summary for verification.
    pub fn print_summary(&self) {
        println!("Batch Summary:");
        println!("  Processed: {} files", self.processed.len());
        for entry in &self.processed {
            println!(
                "    {} ({} points) -> {}",
                entry.source,
                entry.input_points,
                entry.outputs.join(", ")
            );
        }
        if !self.failures.is_empty() {
            println!("  Failed: {} files", self.failures.len());
            for failure in &self.failures {
                println!("    {}: {}", failure.source, failure.error);
            }
        }
        if !self.skipped.is_empty() {
            println!("  Skipped after cancellation: {} files", self.skipped.len());
        }
        if let Some(path) = &self.marker_path {
            println!("  Marker: {}", path.display());
        }
    }
}

/// Point files directly inside `dir`, sorted by name.
pub fn discover_point_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && is_point_file(&path) {
            log::info!("Found file: {}", path.display());
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Refuses an output directory that already exists with content.
pub fn guard_output_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        return Ok(());
    }
    if !dir.is_dir() || fs::read_dir(dir)?.next().is_some() {
        return Err(PreprocessError::OutputExists(dir.to_path_buf()));
    }
    Ok(())
}

/// Downsample then filter one scan and save it to `output`.
pub fn preprocess_file(input: &Path, output: &Path, config: &PreprocessConfig) -> Result<MarkerEntry> {
    let raw = codec::load(input)?;
    let reduced = downsample(&raw, config.stride)?;
    let (inliers, report) = remove_outliers(&reduced, config.neighbors, config.std_ratio)?;
    log::debug!(
        "{}: {} raw, {} after stride {}, {} inliers (threshold {:.6})",
        input.display(),
        raw.len(),
        reduced.len(),
        config.stride,
        inliers.len(),
        report.threshold
    );

    codec::save(output, &inliers)?;
    Ok(MarkerEntry {
        source: file_name(input),
        outputs: vec![file_name(output)],
        input_points: raw.len(),
        output_points: vec![inliers.len()],
        bounds: valid_bounds(&inliers),
    })
}

/// Preprocesses every point file of `input_dir` into a fresh `output_dir`.
///
/// The output guard runs once before any file is touched; afterwards each
/// file succeeds or fails on its own.
pub fn preprocess_batch(
    input_dir: &Path,
    output_dir: &Path,
    config: &PreprocessConfig,
    options: &BatchOptions,
) -> Result<BatchReport> {
    config.validate()?;
    let files = discover_point_files(input_dir)?;

    guard_output_dir(output_dir)?;
    fs::create_dir_all(output_dir)?;
    log::info!(
        "Preprocessing {} files from {} into {}",
        files.len(),
        input_dir.display(),
        output_dir.display()
    );

    let outcomes = run_files(&files, options, "Preprocessing scans", |path| {
        let output = output_dir.join(path.file_name().unwrap_or_default());
        preprocess_file(path, &output, config)
    });
    let mut report = BatchReport::from_outcomes(outcomes);

    let mut marker = ProcessingMarker::new(Stage::Preprocess, serde_json::to_value(config)?);
    report.record_into(&mut marker);
    marker.state = MarkerState::Complete;
    report.marker_path = Some(marker.write(output_dir)?);
    Ok(report)
}

/// Splits one scan into `<stem>_part1` (upper) and `<stem>_part2` (lower)
/// next to it, removing the source unless `keep_source` is set.
pub fn split_file(input: &Path, params: &SplitParams, keep_source: bool) -> Result<MarkerEntry> {
    let points = codec::load(input)?;
    let output = split(&points, params)?;

    let upper_path = partition_path(input, UPPER_PART_SUFFIX);
    let lower_path = partition_path(input, LOWER_PART_SUFFIX);
    codec::save(&upper_path, &output.upper)?;
    codec::save(&lower_path, &output.lower)?;

    log::info!(
        "{}: {} points -> {} ({}) + {} ({})",
        input.display(),
        points.len(),
        upper_path.display(),
        output.upper.len(),
        lower_path.display(),
        output.lower.len()
    );

    if !keep_source {
        fs::remove_file(input)?;
        log::info!("{} is deleted", input.display());
    }

    Ok(MarkerEntry {
        source: file_name(input),
        outputs: vec![file_name(&upper_path), file_name(&lower_path)],
        input_points: points.len(),
        output_points: vec![output.upper.len(), output.lower.len()],
        bounds: valid_bounds(&points),
    })
}

/// Splits every point file of `dir` in place.
///
/// A directory holding the split marker is refused. The marker is written in
/// the `in_progress` state before the first partition is saved.
pub fn split_batch(dir: &Path, config: &SplitConfig, options: &BatchOptions) -> Result<BatchReport> {
    let params = config.params();
    params.validate()?;
    if is_marked(dir, Stage::Split) {
        return Err(PreprocessError::AlreadySplit(dir.to_path_buf()));
    }

    let files = discover_point_files(dir)?;
    let mut marker = ProcessingMarker::new(Stage::Split, serde_json::to_value(config)?);
    marker.write(dir)?;
    log::info!("Splitting {} files in {}", files.len(), dir.display());

    let outcomes = run_files(&files, options, "Splitting scans", |path| {
        split_file(path, &params, config.keep_source)
    });
    let mut report = BatchReport::from_outcomes(outcomes);

    report.record_into(&mut marker);
    marker.state = MarkerState::Complete;
    report.marker_path = Some(marker.write(dir)?);
    Ok(report)
}

/// Converts one point file to fixed binary records. Returns the record count.
pub fn convert_file(input: &Path, output: &Path, scale_factor: f64) -> Result<usize> {
    // Reject unknown output extensions before reading anything.
    OutputFormat::from_path(output)?;
    let points = codec::load(input)?;
    write_records(output, &points, scale_factor)?;
    log::info!(
        "Converted {} ({} points, scale {}) -> {}",
        input.display(),
        points.len(),
        scale_factor,
        output.display()
    );
    Ok(points.len())
}

/// Annotation files under `dir`, recursively, sorted by path.
pub fn discover_label_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    collect_label_files(dir, &mut files)?;
    files.sort();
    Ok(files)
}

fn collect_label_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_label_files(&path, files)?;
        } else if path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(LABEL_EXTENSION))
        {
            files.push(path);
        }
    }
    Ok(())
}

/// Converts one annotation file into scaled text lines at `output`.
pub fn convert_label_file(input: &Path, output: &Path, scale_factor: f64) -> Result<MarkerEntry> {
    let labels = parse_labels(&fs::read_to_string(input)?)?;
    let text = format_labels(&labels, scale_factor)?;
    fs::write(output, text)?;
    log::info!(
        "{}: {} objects -> {}",
        input.display(),
        labels.objects.len(),
        output.display()
    );
    Ok(MarkerEntry {
        source: file_name(input),
        outputs: vec![file_name(output)],
        input_points: labels.objects.len(),
        output_points: vec![labels.objects.len()],
        bounds: None,
    })
}

/// Converts every annotation file under `input_dir` into `NNNNNN.txt` files
/// in `output_dir`, numbered by sorted input path. Existing label files are
/// overwritten.
pub fn convert_labels(
    input_dir: &Path,
    output_dir: &Path,
    scale_factor: f64,
    options: &BatchOptions,
) -> Result<BatchReport> {
    if !scale_factor.is_finite() {
        return Err(PreprocessError::InvalidScale(scale_factor));
    }
    let files = discover_label_files(input_dir)?;
    fs::create_dir_all(output_dir)?;
    log::info!(
        "Converting {} label files from {} into {}",
        files.len(),
        input_dir.display(),
        output_dir.display()
    );

    let outcomes = run_files(&files, options, "Converting labels", |path| {
        let ordinal = files
            .binary_search_by(|candidate| candidate.as_path().cmp(path))
            .map_err(|_| PreprocessError::Config(format!("{} was not discovered", path.display())))?;
        convert_label_file(path, &output_dir.join(label_file_name(ordinal)), scale_factor)
    });
    Ok(BatchReport::from_outcomes(outcomes))
}

/// Runs `process` for each file on the rayon pool, isolating failures.
fn run_files<F>(
    files: &[PathBuf],
    options: &BatchOptions,
    message: &'static str,
    process: F,
) -> Vec<(String, FileStatus)>
where
    F: Fn(&Path) -> Result<MarkerEntry> + Sync,
{
    let pb = progress_bar(files.len(), options.show_progress);
    pb.set_message(message);

    let outcomes = files
        .par_iter()
        .map(|path| {
            let source = file_name(path);
            if options.cancel.load(Ordering::Relaxed) {
                log::warn!("Cancelled before {}", path.display());
                return (source, FileStatus::Skipped);
            }
            let status = match process(path) {
                Ok(entry) => {
                    log::info!("Processed Successfully: {}", path.display());
                    FileStatus::Done(entry)
                }
                Err(err) => {
                    log::error!("Failed to process {}: {}", path.display(), err);
                    FileStatus::Failed(err.to_string())
                }
            };
            pb.inc(1);
            (source, status)
        })
        .collect();

    pb.finish_with_message("Done");
    outcomes
}

fn progress_bar(len: usize, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len as u64);
    let style = ProgressStyle::default_bar()
        .template("[{bar:40.green/blue}] {pos}/{len} files ({percent}%) {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("▉▊▋▌▍▎▏ ");
    pb.set_style(style);
    pb
}

fn partition_path(source: &Path, suffix: &str) -> PathBuf {
    let stem = source.file_stem().unwrap_or_default().to_string_lossy();
    let name = match source.extension() {
        Some(ext) => format!("{}{}.{}", stem, suffix, ext.to_string_lossy()),
        None => format!("{}{}", stem, suffix),
    };
    source.with_file_name(name)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string()
}

fn valid_bounds(points: &PointSet) -> Option<PointCloudBounds> {
    let bounds = PointCloudBounds::from_points(points);
    bounds.is_valid().then_some(bounds)
}
