/// Overlap-aware range splitting along one axis.
///
/// Thresholds are fractions of the physical scan span:
/// `mid = span * mid_fraction`, `low = span * low_fraction`,
/// `high = span * high_fraction`. The upper partition keeps
/// `mid < c <= high` shifted by `mid`; the lower keeps `low < c <= mid`
/// shifted by `low`. A coordinate exactly at `mid` lands in the lower
/// partition only.
use crate::error::{PreprocessError, Result};
use crate::point_set::{Axis, PointSet};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SplitParams {
    pub axis: Axis,
    pub total_span: f64,
    pub mid_fraction: f64,
    pub low_fraction: f64,
    pub high_fraction: f64,
}

impl SplitParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.total_span.is_finite() && self.total_span > 0.0) {
            return Err(PreprocessError::InvalidSplit(format!(
                "total span {} must be positive and finite",
                self.total_span
            )));
        }
        let fractions = [self.low_fraction, self.mid_fraction, self.high_fraction];
        if fractions.iter().any(|f| !f.is_finite()) {
            return Err(PreprocessError::InvalidSplit(
                "fractions must be finite".to_string(),
            ));
        }
        if !(0.0 <= self.low_fraction
            && self.low_fraction <= self.mid_fraction
            && self.mid_fraction <= self.high_fraction
            && self.high_fraction <= 1.0)
        {
            return Err(PreprocessError::InvalidSplit(format!(
                "fractions must satisfy 0 <= low ({}) <= mid ({}) <= high ({}) <= 1",
                self.low_fraction, self.mid_fraction, self.high_fraction
            )));
        }
        Ok(())
    }

    pub fn mid(&self) -> f64 {
        self.total_span * self.mid_fraction
    }

    pub fn low_bound(&self) -> f64 {
        self.total_span * self.low_fraction
    }

    pub fn high_bound(&self) -> f64 {
        self.total_span * self.high_fraction
    }

    /// (upper, lower) partition descriptors.
    pub fn descriptors(&self) -> (PartitionDescriptor, PartitionDescriptor) {
        let mid = self.mid();
        let low = self.low_bound();
        (
            PartitionDescriptor {
                axis: self.axis,
                lower: mid,
                upper: self.high_bound(),
                offset: mid,
            },
            PartitionDescriptor {
                axis: self.axis,
                lower: low,
                upper: mid,
                offset: low,
            },
        )
    }
}

/// One spatial slice: coordinates in `(lower, upper]` along `axis`, shifted
/// by `-offset` on that axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PartitionDescriptor {
    pub axis: Axis,
    pub lower: f64,
    pub upper: f64,
    pub offset: f64,
}

impl PartitionDescriptor {
    pub fn contains(&self, coord: f64) -> bool {
        self.lower < coord && coord <= self.upper
    }

    /// Independent copy of the points inside this partition, recentered.
    pub fn extract(&self, points: &PointSet) -> PointSet {
        let retained = points
            .iter()
            .filter(|p| self.contains(p.coord(self.axis)))
            .map(|p| {
                let mut shifted = *p;
                *shifted.coord_mut(self.axis) -= self.offset;
                shifted
            })
            .collect();
        PointSet::from_trusted(retained, points.has_attribute())
    }
}

#[derive(Debug, Clone)]
pub struct SplitOutput {
    /// Partition above `mid`, saved with the `_part1` suffix.
    pub upper: PointSet,
    /// Partition at or below `mid`, saved with the `_part2` suffix.
    pub lower: PointSet,
}

pub fn split(points: &PointSet, params: &SplitParams) -> Result<SplitOutput> {
    params.validate()?;
    let (upper, lower) = params.descriptors();
    let output = SplitOutput {
        upper: upper.extract(points),
        lower: lower.extract(points),
    };
    log::debug!(
        "Split {} points on {}: upper {} in ({:.4}, {:.4}], lower {} in ({:.4}, {:.4}]",
        points.len(),
        params.axis,
        output.upper.len(),
        upper.lower,
        upper.upper,
        output.lower.len(),
        lower.lower,
        lower.upper
    );
    Ok(output)
}
