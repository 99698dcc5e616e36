//! Point spatial index family (C2).
//!
//! Four interchangeable K-nearest/radius structures over a rebuilt-per-tick
//! set of agent positions, grounded in the teacher's `SpatialHash`
//! (`gameplay/units/avoidance/spatial_hash.rs`: a uniform-grid bucket map
//! rebuilt every frame) and, for the tree variants, `korangar-collision`'s
//! `KDTree` (`src/kdtree.rs`: recursive median splits with explicit
//! left/right child indices and per-node AABB pruning).
//!
//! All four variants implement the same [`PointIndex`] contract so the
//! simulator can be pointed at any of them via
//! [`crate::config::PointIndexKind`].

pub mod bvh;
pub mod grid;
pub mod kdtree;
pub mod quadtree;

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use glam::Vec2;

/// Shared contract every point index variant implements (spec.md §4.2).
pub trait PointIndex {
    /// Replace the indexed point set.
    fn build(&mut self, points: &[Vec2]);

    /// Up to `k` indices nearest `p`. Order is unspecified.
    fn query_k_nearest(&self, p: Vec2, k: usize) -> Vec<usize>;

    /// Up to `k` indices within `radius` of `p`, sorted ascending by
    /// distance to `p`.
    fn query_k_nearest_sorted(&self, p: Vec2, k: usize, radius: f32) -> Vec<usize>;

    /// All indices within `r` of `p`. Order is unspecified.
    fn query_radius(&self, p: Vec2, r: f32) -> Vec<usize>;
}

/// Max-heap entry ordered by squared distance, used to maintain a bounded
/// "K closest so far" set across every variant's traversal.
struct HeapEntry {
    dist_sq: f32,
    index: usize,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.dist_sq == other.dist_sq
    }
}
impl Eq for HeapEntry {}
impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.dist_sq
            .partial_cmp(&other.dist_sq)
            .unwrap_or(Ordering::Equal)
    }
}

/// Bounded max-heap of the `k` closest candidates seen so far. Shared by
/// every variant's query implementation so the "expand until the Kth-worst
/// distance is smaller than the next region's bound" rule (spec.md §4.2) is
/// written once.
pub(crate) struct KNearestAccumulator {
    heap: BinaryHeap<HeapEntry>,
    k: usize,
}

impl KNearestAccumulator {
    pub(crate) fn new(k: usize) -> Self {
        Self {
            heap: BinaryHeap::with_capacity(k.max(1)),
            k,
        }
    }

    pub(crate) fn offer(&mut self, index: usize, dist_sq: f32) {
        if self.heap.len() < self.k {
            self.heap.push(HeapEntry { dist_sq, index });
        } else if let Some(worst) = self.heap.peek() {
            if dist_sq < worst.dist_sq {
                self.heap.pop();
                self.heap.push(HeapEntry { dist_sq, index });
            }
        }
    }

    /// The squared distance of the current worst (Kth) candidate, or
    /// `f32::INFINITY` while the accumulator isn't yet full.
    pub(crate) fn worst_dist_sq(&self) -> f32 {
        if self.heap.len() < self.k {
            f32::INFINITY
        } else {
            self.heap.peek().map_or(f32::INFINITY, |e| e.dist_sq)
        }
    }

    pub(crate) fn into_indices(self) -> Vec<usize> {
        self.heap.into_iter().map(|e| e.index).collect()
    }

    pub(crate) fn into_sorted_indices(self) -> Vec<usize> {
        let mut entries: Vec<HeapEntry> = self.heap.into_vec();
        entries.sort_by(|a, b| a.dist_sq.partial_cmp(&b.dist_sq).unwrap_or(Ordering::Equal));
        entries.into_iter().map(|e| e.index).collect()
    }
}

/// Brute-force reference used by tests (spec.md §8 S4) and by [`grid::Grid`]
/// when no bucket structure makes sense for tiny point sets.
pub(crate) fn brute_force_k_nearest(points: &[Vec2], p: Vec2, k: usize, radius: f32) -> Vec<usize> {
    let radius_sq = radius * radius;
    let mut acc = KNearestAccumulator::new(k.max(1));
    for (i, &point) in points.iter().enumerate() {
        let dist_sq = point.distance_squared(p);
        if dist_sq <= radius_sq {
            acc.offer(i, dist_sq);
        }
    }
    acc.into_sorted_indices()
}

#[cfg(test)]
mod contract_tests {
    use super::*;
    use crate::spatial::{bvh::Bvh, grid::Grid, kdtree::KdTree, quadtree::QuadTree};

    fn sample_points() -> Vec<Vec2> {
        vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(5.0, 5.0),
            Vec2::new(-3.0, 2.0),
            Vec2::new(10.0, -10.0),
            Vec2::new(0.5, 0.5),
            Vec2::new(-1.0, -1.0),
        ]
    }

    fn assert_k_nearest_matches_sorted_as_set(mut index: impl PointIndex) {
        let points = sample_points();
        index.build(&points);
        let query = Vec2::new(0.0, 0.0);
        let k = 4;

        let mut unsorted = index.query_k_nearest(query, k);
        let mut sorted = index.query_k_nearest_sorted(query, k, f32::INFINITY);
        unsorted.sort_unstable();
        sorted.sort_unstable();
        assert_eq!(unsorted, sorted);
    }

    #[test]
    fn grid_k_nearest_matches_sorted() {
        assert_k_nearest_matches_sorted_as_set(Grid::new(2.0));
    }

    #[test]
    fn kdtree_k_nearest_matches_sorted() {
        assert_k_nearest_matches_sorted_as_set(KdTree::new());
    }

    #[test]
    fn bvh_k_nearest_matches_sorted() {
        assert_k_nearest_matches_sorted_as_set(Bvh::new());
    }

    #[test]
    fn quadtree_k_nearest_matches_sorted() {
        assert_k_nearest_matches_sorted_as_set(QuadTree::new(Vec2::splat(-20.0), Vec2::splat(20.0)));
    }

    fn assert_radius_is_exact(mut index: impl PointIndex) {
        let points = sample_points();
        index.build(&points);
        let query = Vec2::new(0.0, 0.0);
        let r = 3.0;

        let mut got = index.query_radius(query, r);
        let mut expected: Vec<usize> = points
            .iter()
            .enumerate()
            .filter(|(_, p)| p.distance_squared(query) <= r * r)
            .map(|(i, _)| i)
            .collect();
        got.sort_unstable();
        expected.sort_unstable();
        assert_eq!(got, expected);
    }

    #[test]
    fn grid_radius_exact() {
        assert_radius_is_exact(Grid::new(2.0));
    }

    #[test]
    fn kdtree_radius_exact() {
        assert_radius_is_exact(KdTree::new());
    }

    #[test]
    fn bvh_radius_exact() {
        assert_radius_is_exact(Bvh::new());
    }

    #[test]
    fn quadtree_radius_exact() {
        assert_radius_is_exact(QuadTree::new(Vec2::splat(-20.0), Vec2::splat(20.0)));
    }
}
