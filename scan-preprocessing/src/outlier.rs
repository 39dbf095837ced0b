/// Statistical outlier removal.
///
/// A point is kept when the mean distance to its `k` nearest neighbours is at
/// most `mean + std_ratio * std_dev`, both statistics taken over the whole
/// input set (population standard deviation). When the set holds `k` points
/// or fewer, `k` is clamped to `len - 1`.
use crate::error::{PreprocessError, Result};
use crate::neighbor_index::NeighborIndex;
use crate::point_set::{IndexSubset, PointSet};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutlierParams {
    pub neighbors: usize,
    pub std_ratio: f64,
}

impl OutlierParams {
    pub fn validate(&self) -> Result<()> {
        if self.neighbors < 1 {
            return Err(PreprocessError::InvalidNeighborCount(self.neighbors));
        }
        if !(self.std_ratio.is_finite() && self.std_ratio > 0.0) {
            return Err(PreprocessError::InvalidStdRatio(self.std_ratio));
        }
        Ok(())
    }
}

/// Result of one filtering pass.
#[derive(Debug, Clone)]
pub struct OutlierReport {
    /// Retained positions, in original order.
    pub inliers: IndexSubset,
    /// Per-point mean neighbour distance.
    pub mean_distances: Vec<f64>,
    /// `k` after clamping to the set size.
    pub effective_neighbors: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub threshold: f64,
}

impl OutlierReport {
    /// Removed positions; the complement of `inliers`.
    pub fn outliers(&self) -> IndexSubset {
        self.inliers.complement(self.mean_distances.len())
    }
}

pub fn filter(points: &PointSet, k: usize, std_ratio: f64) -> Result<OutlierReport> {
    let params = OutlierParams {
        neighbors: k,
        std_ratio,
    };
    params.validate()?;
    let index = NeighborIndex::build(points);
    filter_with_index(&index, points, k, std_ratio)
}

/// Same as [`filter`] but reuses an index built over `points`.
pub fn filter_with_index(
    index: &NeighborIndex,
    points: &PointSet,
    k: usize,
    std_ratio: f64,
) -> Result<OutlierReport> {
    OutlierParams {
        neighbors: k,
        std_ratio,
    }
    .validate()?;
    if index.len() != points.len() {
        return Err(PreprocessError::IndexMismatch {
            index_len: index.len(),
            points_len: points.len(),
        });
    }

    let n = points.len();
    let effective_neighbors = k.min(n.saturating_sub(1));
    if effective_neighbors < k {
        log::warn!(
            "Only {} points available; clamping neighbour count {} -> {}",
            n,
            k,
            effective_neighbors
        );
    }

    if effective_neighbors == 0 {
        return Ok(OutlierReport {
            inliers: IndexSubset::full(n),
            mean_distances: vec![0.0; n],
            effective_neighbors,
            mean: 0.0,
            std_dev: 0.0,
            threshold: 0.0,
        });
    }

    let mean_distances = index.mean_neighbor_distances(points, effective_neighbors);
    let (mean, std_dev) = mean_and_std_dev(&mean_distances);
    let threshold = mean + std_ratio * std_dev;

    let inliers: Vec<usize> = mean_distances
        .iter()
        .enumerate()
        .filter(|&(_, &d)| d <= threshold)
        .map(|(i, _)| i)
        .collect();

    log::debug!(
        "Outlier threshold {:.6} (mean {:.6}, std {:.6}); kept {}/{}",
        threshold,
        mean,
        std_dev,
        inliers.len(),
        n
    );

    Ok(OutlierReport {
        inliers: IndexSubset::from_sorted_unchecked(inliers),
        mean_distances,
        effective_neighbors,
        mean,
        std_dev,
        threshold,
    })
}

/// Filters and materialises the inlier point set.
pub fn remove_outliers(
    points: &PointSet,
    k: usize,
    std_ratio: f64,
) -> Result<(PointSet, OutlierReport)> {
    let report = filter(points, k, std_ratio)?;
    let inliers = points.select(&report.inliers)?;
    Ok((inliers, report))
}

fn mean_and_std_dev(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::point_set::Point;

    /// 10x10 planar grid with unit spacing plus far-away strays.
    fn grid_with_strays() -> PointSet {
        let mut positions = Vec::new();
        for x in 0..10 {
            for y in 0..10 {
                positions.push([x as f64, y as f64, 0.0]);
            }
        }
        positions.push([40.0, 40.0, 25.0]);
        positions.push([-30.0, 5.0, -18.0]);
        PointSet::from_positions(positions).unwrap()
    }

    fn brute_force_means(points: &PointSet, k: usize) -> Vec<f64> {
        let ps = points.points();
        ps.iter()
            .enumerate()
            .map(|(i, p)| {
                let mut d: Vec<f64> = ps
                    .iter()
                    .enumerate()
                    .filter(|&(j, _)| j != i)
                    .map(|(_, q)| {
                        ((p.x - q.x).powi(2) + (p.y - q.y).powi(2) + (p.z - q.z).powi(2)).sqrt()
                    })
                    .collect();
                d.sort_by(|a, b| a.total_cmp(b));
                d[..k].iter().sum::<f64>() / k as f64
            })
            .collect()
    }

    #[test]
    fn rejects_invalid_parameters() {
        let set = grid_with_strays();
        assert!(matches!(
            filter(&set, 0, 1.0),
            Err(PreprocessError::InvalidNeighborCount(0))
        ));
        assert!(matches!(
            filter(&set, 5, 0.0),
            Err(PreprocessError::InvalidStdRatio(_))
        ));
        assert!(matches!(
            filter(&set, 5, f64::NAN),
            Err(PreprocessError::InvalidStdRatio(_))
        ));
    }

    #[test]
    fn removes_far_strays() {
        let set = grid_with_strays();
        let report = filter(&set, 5, 1.0).unwrap();
        let outliers = report.outliers();
        assert!(outliers.contains(100));
        assert!(outliers.contains(101));
        assert!(report.inliers.len() >= 90);
    }

    #[test]
    fn retained_points_satisfy_global_threshold() {
        let set = grid_with_strays();
        let k = 5;
        let ratio = 0.5;
        let report = filter(&set, k, ratio).unwrap();

        let reference = brute_force_means(&set, k);
        let n = reference.len() as f64;
        let mu = reference.iter().sum::<f64>() / n;
        let sigma = (reference.iter().map(|d| (d - mu).powi(2)).sum::<f64>() / n).sqrt();
        let threshold = mu + ratio * sigma;

        for i in 0..set.len() {
            let retained = report.inliers.contains(i);
            assert_eq!(retained, reference[i] <= threshold + 1e-12, "point {}", i);
        }

        let removed = report.outliers();
        assert_eq!(report.inliers.len() + removed.len(), set.len());
        assert!(removed.iter().all(|i| !report.inliers.contains(i)));
    }

    #[test]
    fn clamps_neighbour_count_for_small_sets() {
        let set = PointSet::from_positions([[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]])
            .unwrap();
        let report = filter(&set, 5, 1.0).unwrap();
        assert_eq!(report.effective_neighbors, 2);
        assert_eq!(report.mean_distances.len(), 3);
    }

    #[test]
    fn tiny_sets_keep_everything() {
        let empty = filter(&PointSet::default(), 3, 1.0).unwrap();
        assert!(empty.inliers.is_empty());

        let single = PointSet::from_positions([[4.0, 4.0, 4.0]]).unwrap();
        let report = filter(&single, 3, 1.0).unwrap();
        assert_eq!(report.inliers.as_slice(), &[0]);
        assert_eq!(report.effective_neighbors, 0);
    }

    #[test]
    fn reused_index_gives_same_result() {
        let set = grid_with_strays();
        let index = NeighborIndex::build(&set);
        let strict = filter_with_index(&index, &set, 5, 0.5).unwrap();
        let loose = filter_with_index(&index, &set, 5, 3.0).unwrap();
        assert_eq!(strict.inliers, filter(&set, 5, 0.5).unwrap().inliers);
        assert!(loose.inliers.len() >= strict.inliers.len());
    }

    #[test]
    fn mismatched_index_is_rejected() {
        let set = grid_with_strays();
        let other = PointSet::from_positions([[0.0, 0.0, 0.0]]).unwrap();
        let index = NeighborIndex::build(&other);
        assert!(matches!(
            filter_with_index(&index, &set, 5, 1.0),
            Err(PreprocessError::IndexMismatch { .. })
        ));
    }

    #[test]
    fn remove_outliers_keeps_attributes() {
        let mut points: Vec<Point> = (0..20)
            .map(|i| Point::new((i % 5) as f64, (i / 5) as f64, 0.0).with_attribute(i as f64))
            .collect();
        points.push(Point::new(100.0, 100.0, 100.0).with_attribute(-1.0));
        let set = PointSet::new(points, true).unwrap();

        let (kept, report) = remove_outliers(&set, 4, 1.0).unwrap();
        assert_eq!(kept.len(), report.inliers.len());
        assert!(kept.has_attribute());
        assert!(kept.iter().all(|p| p.attribute >= 0.0));
    }
}
