/// Ordered point sequences and index subsets shared by every stage
use crate::error::{PreprocessError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Coordinate axis used by splitting and bounds queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    #[default]
    X,
    Y,
    Z,
}

impl Axis {
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

impl TryFrom<usize> for Axis {
    type Error = PreprocessError;

    fn try_from(value: usize) -> Result<Self> {
        match value {
            0 => Ok(Axis::X),
            1 => Ok(Axis::Y),
            2 => Ok(Axis::Z),
            other => Err(PreprocessError::Config(format!(
                "axis index {} out of range 0..=2",
                other
            ))),
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        };
        f.write_str(name)
    }
}

/// Single scan sample. `attribute` is 0.0 when the source carries none.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub attribute: f64,
}

impl Point {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            x,
            y,
            z,
            attribute: 0.0,
        }
    }

    pub fn with_attribute(mut self, attribute: f64) -> Self {
        self.attribute = attribute;
        self
    }

    pub fn position(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    pub fn coord(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    pub(crate) fn coord_mut(&mut self, axis: Axis) -> &mut f64 {
        match axis {
            Axis::X => &mut self.x,
            Axis::Y => &mut self.y,
            Axis::Z => &mut self.z,
        }
    }

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// Immutable ordered point sequence.
///
/// Built once by a codec or a transform and consumed read-only by each
/// later stage. `has_attribute` records whether the scalar channel came from
/// the source data or was defaulted to zero.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PointSet {
    points: Vec<Point>,
    has_attribute: bool,
}

impl PointSet {
    /// Wraps `points`, rejecting any non-finite coordinate.
    pub fn new(points: Vec<Point>, has_attribute: bool) -> Result<Self> {
        if let Some(index) = points.iter().position(|p| !p.is_finite()) {
            return Err(PreprocessError::NonFiniteCoordinate { index });
        }
        Ok(Self {
            points,
            has_attribute,
        })
    }

    /// Point set without an attribute channel.
    pub fn from_positions<I>(positions: I) -> Result<Self>
    where
        I: IntoIterator<Item = [f64; 3]>,
    {
        let points = positions
            .into_iter()
            .map(|[x, y, z]| Point::new(x, y, z))
            .collect();
        Self::new(points, false)
    }

    /// Transforms build from points that are already known to be finite.
    pub(crate) fn from_trusted(points: Vec<Point>, has_attribute: bool) -> Self {
        Self {
            points,
            has_attribute,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn has_attribute(&self) -> bool {
        self.has_attribute
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Point> {
        self.points.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Point> {
        self.points.get(index)
    }

    /// Materialises the subsequence named by `indices`, preserving order.
    pub fn select(&self, indices: &IndexSubset) -> Result<PointSet> {
        if let Some(&last) = indices.as_slice().last() {
            if last >= self.points.len() {
                return Err(PreprocessError::InvalidIndices(format!(
                    "position {} out of range for {} points",
                    last,
                    self.points.len()
                )));
            }
        }
        let points = indices.iter().map(|i| self.points[i]).collect();
        Ok(Self::from_trusted(points, self.has_attribute))
    }
}

impl<'a> IntoIterator for &'a PointSet {
    type Item = &'a Point;
    type IntoIter = std::slice::Iter<'a, Point>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

/// Strictly increasing positions into a point set.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IndexSubset {
    indices: Vec<usize>,
}

impl IndexSubset {
    /// Accepts only strictly increasing positions.
    pub fn from_sorted(indices: Vec<usize>) -> Result<Self> {
        if let Some(w) = indices.windows(2).find(|w| w[0] >= w[1]) {
            return Err(PreprocessError::InvalidIndices(format!(
                "positions must be strictly increasing, found {} followed by {}",
                w[0], w[1]
            )));
        }
        Ok(Self { indices })
    }

    pub(crate) fn from_sorted_unchecked(indices: Vec<usize>) -> Self {
        debug_assert!(indices.windows(2).all(|w| w[0] < w[1]));
        Self { indices }
    }

    /// Every position `0..len`.
    pub fn full(len: usize) -> Self {
        Self {
            indices: (0..len).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.indices
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.indices.iter().copied()
    }

    pub fn contains(&self, index: usize) -> bool {
        self.indices.binary_search(&index).is_ok()
    }

    /// Positions in `0..len` that are not part of this subset.
    pub fn complement(&self, len: usize) -> IndexSubset {
        let mut kept = self.indices.iter().peekable();
        let mut rest = Vec::with_capacity(len.saturating_sub(self.indices.len()));
        for i in 0..len {
            if kept.peek() == Some(&&i) {
                kept.next();
            } else {
                rest.push(i);
            }
        }
        Self { indices: rest }
    }

    pub fn into_vec(self) -> Vec<usize> {
        self.indices
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_finite_coordinates() {
        let points = vec![Point::new(0.0, 1.0, 2.0), Point::new(f64::NAN, 0.0, 0.0)];
        let err = PointSet::new(points, false).unwrap_err();
        assert!(matches!(err, PreprocessError::NonFiniteCoordinate { index: 1 }));

        let err = PointSet::from_positions([[0.0, f64::INFINITY, 0.0]]).unwrap_err();
        assert!(matches!(err, PreprocessError::NonFiniteCoordinate { index: 0 }));
    }

    #[test]
    fn attribute_defaults_to_zero() {
        let set = PointSet::from_positions([[1.0, 2.0, 3.0]]).unwrap();
        assert!(!set.has_attribute());
        assert_eq!(set.points()[0].attribute, 0.0);
    }

    #[test]
    fn select_preserves_order_and_attribute_flag() {
        let points = (0..5)
            .map(|i| Point::new(i as f64, 0.0, 0.0).with_attribute(i as f64 * 10.0))
            .collect();
        let set = PointSet::new(points, true).unwrap();
        let subset = IndexSubset::from_sorted(vec![1, 3, 4]).unwrap();
        let selected = set.select(&subset).unwrap();

        let xs: Vec<f64> = selected.iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![1.0, 3.0, 4.0]);
        assert_eq!(selected.points()[1].attribute, 30.0);
        assert!(selected.has_attribute());
    }

    #[test]
    fn select_rejects_out_of_range_positions() {
        let set = PointSet::from_positions([[0.0, 0.0, 0.0]]).unwrap();
        let subset = IndexSubset::from_sorted(vec![0, 1]).unwrap();
        assert!(matches!(
            set.select(&subset),
            Err(PreprocessError::InvalidIndices(_))
        ));
    }

    #[test]
    fn index_subset_must_be_strictly_increasing() {
        assert!(IndexSubset::from_sorted(vec![0, 2, 2]).is_err());
        assert!(IndexSubset::from_sorted(vec![3, 1]).is_err());
        assert!(IndexSubset::from_sorted(vec![]).is_ok());
    }

    #[test]
    fn complement_partitions_the_range() {
        let subset = IndexSubset::from_sorted(vec![0, 3, 4, 7]).unwrap();
        let rest = subset.complement(9);
        assert_eq!(rest.as_slice(), &[1, 2, 5, 6, 8]);
        assert_eq!(subset.len() + rest.len(), 9);
        assert!(rest.iter().all(|i| !subset.contains(i)));
    }

    #[test]
    fn axis_from_index() {
        assert_eq!(Axis::try_from(2).unwrap(), Axis::Z);
        assert!(Axis::try_from(3).is_err());
        assert_eq!(Axis::Y.index(), 1);
    }
}
