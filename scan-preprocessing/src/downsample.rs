/// Uniform stride downsampling.
///
/// Keeps positions `0, stride, 2 * stride, ...` below the set length, so the
/// output holds `ceil(len / stride)` points.
use crate::error::{PreprocessError, Result};
use crate::point_set::{IndexSubset, PointSet};

/// Positions retained by a stride of `stride` over `len` points.
pub fn downsample_indices(len: usize, stride: usize) -> Result<IndexSubset> {
    if stride < 1 {
        return Err(PreprocessError::InvalidStride(stride));
    }
    Ok(IndexSubset::from_sorted_unchecked(
        (0..len).step_by(stride).collect(),
    ))
}

pub fn downsample(points: &PointSet, stride: usize) -> Result<PointSet> {
    let indices = downsample_indices(points.len(), stride)?;
    log::debug!(
        "Downsampled {} -> {} points (stride {})",
        points.len(),
        indices.len(),
        stride
    );
    points.select(&indices)
}
