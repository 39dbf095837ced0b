/// Reusable k-nearest-neighbour index over a point set.
///
/// Bulk loading the R*-tree is O(N log N); each query walks the tree in
/// distance order. Build it once and share it when the same point set is
/// filtered with several parameter sets.
use crate::point_set::PointSet;
use rstar::{AABB, PointDistance, RTree, RTreeObject};

/// Tree entry remembering its position in the source set.
#[derive(Debug, Clone, Copy)]
struct IndexedPoint {
    index: usize,
    position: [f64; 3],
}

impl RTreeObject for IndexedPoint {
    type Envelope = AABB<[f64; 3]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.position)
    }
}

impl PointDistance for IndexedPoint {
    fn distance_2(&self, point: &[f64; 3]) -> f64 {
        let dx = self.position[0] - point[0];
        let dy = self.position[1] - point[1];
        let dz = self.position[2] - point[2];
        dx * dx + dy * dy + dz * dz
    }
}

pub struct NeighborIndex {
    tree: RTree<IndexedPoint>,
    len: usize,
}

impl NeighborIndex {
    pub fn build(points: &PointSet) -> Self {
        let entries: Vec<IndexedPoint> = points
            .iter()
            .enumerate()
            .map(|(index, p)| IndexedPoint {
                index,
                position: p.position(),
            })
            .collect();
        Self {
            len: entries.len(),
            tree: RTree::bulk_load(entries),
        }
    }

    /// Number of indexed points.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Up to `k` nearest points other than `query_index`, closest first, as
    /// `(index, euclidean distance)`.
    ///
    /// Self is excluded by index, so coincident duplicates still count as
    /// neighbours at distance zero.
    pub fn k_nearest(&self, query_index: usize, position: [f64; 3], k: usize) -> Vec<(usize, f64)> {
        self.tree
            .nearest_neighbor_iter_with_distance_2(&position)
            .filter(|(entry, _)| entry.index != query_index)
            .take(k)
            .map(|(entry, d2)| (entry.index, d2.sqrt()))
            .collect()
    }

    /// Mean distance from every point of `points` to its `k` nearest others.
    /// `points` must be the set the index was built over.
    pub fn mean_neighbor_distances(&self, points: &PointSet, k: usize) -> Vec<f64> {
        points
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let neighbors = self.k_nearest(i, p.position(), k);
                if neighbors.is_empty() {
                    0.0
                } else {
                    neighbors.iter().map(|&(_, d)| d).sum::<f64>() / neighbors.len() as f64
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excludes_the_query_point() {
        let set = PointSet::from_positions([[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [3.0, 0.0, 0.0]])
            .unwrap();
        let index = NeighborIndex::build(&set);
        let neighbors = index.k_nearest(0, [0.0, 0.0, 0.0], 2);
        assert_eq!(neighbors, vec![(1, 1.0), (2, 3.0)]);
    }

    #[test]
    fn duplicates_count_as_neighbours() {
        let set = PointSet::from_positions([[2.0, 2.0, 2.0], [2.0, 2.0, 2.0], [5.0, 2.0, 2.0]])
            .unwrap();
        let index = NeighborIndex::build(&set);
        let neighbors = index.k_nearest(1, [2.0, 2.0, 2.0], 1);
        assert_eq!(neighbors, vec![(0, 0.0)]);
    }

    #[test]
    fn matches_brute_force_means() {
        let positions: Vec<[f64; 3]> = (0..60)
            .map(|i| {
                let t = i as f64;
                [(t * 0.37).sin() * 4.0, (t * 0.91).cos() * 3.0, t * 0.05]
            })
            .collect();
        let set = PointSet::from_positions(positions.clone()).unwrap();
        let index = NeighborIndex::build(&set);
        let means = index.mean_neighbor_distances(&set, 4);

        for (i, p) in positions.iter().enumerate() {
            let mut dists: Vec<f64> = positions
                .iter()
                .enumerate()
                .filter(|&(j, _)| j != i)
                .map(|(_, q)| {
                    ((p[0] - q[0]).powi(2) + (p[1] - q[1]).powi(2) + (p[2] - q[2]).powi(2)).sqrt()
                })
                .collect();
            dists.sort_by(|a, b| a.total_cmp(b));
            let expected = dists[..4].iter().sum::<f64>() / 4.0;
            assert!((means[i] - expected).abs() < 1e-9, "point {}", i);
        }
    }
}
