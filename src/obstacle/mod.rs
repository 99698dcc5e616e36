//! Obstacle topology model (C3): directed edges, `next`/`prev` linkage,
//! convexity, and the segment-splitting KD-tree that backs ORCA's sorted
//! proximity queries.
//!
//! The teacher delegates all static geometry to `vleue_navigator`'s navmesh
//! (out of this spec's scope — see SPEC_FULL.md §7), so there is no teacher
//! counterpart for this module; it is grounded instead on
//! `korangar-collision::kdtree::KDTree`'s arena-of-nodes-with-explicit-
//! indices shape (Design Notes: "cyclic obstacle graph via bidirectional
//! owning pointers" → "an arena of edges indexed by integer ids; `next`/
//! `prev` are `Option<usize>`").

pub mod segment_tree;

use glam::Vec2;

use crate::math::{left_of, EPS};

/// One oriented obstacle edge `P1 -> P2`. Interior is to the left of the
/// directed edge (CCW winding convention, spec.md §6).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObstacleEdge {
    pub p1: Vec2,
    pub p2: Vec2,
    pub direction: Vec2,
    pub is_convex: bool,
    pub next: Option<usize>,
    pub prev: Option<usize>,
}

impl ObstacleEdge {
    fn new(p1: Vec2, p2: Vec2) -> Self {
        let delta = p2 - p1;
        let direction = if delta.length_squared() > EPS {
            delta.normalize()
        } else {
            Vec2::ZERO
        };
        Self {
            p1,
            p2,
            direction,
            is_convex: true,
            next: None,
            prev: None,
        }
    }
}

/// Owns the obstacle arena, the dirty flag, and the built segment tree.
#[derive(Debug, Default)]
pub struct ObstacleSet {
    edges: Vec<ObstacleEdge>,
    dirty: bool,
    tree: segment_tree::SegmentTree,
}

impl ObstacleSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn edges(&self) -> &[ObstacleEdge] {
        &self.edges
    }

    #[must_use]
    pub fn edge(&self, id: usize) -> Option<&ObstacleEdge> {
        self.edges.get(id)
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// `addObstacle(p1, p2) -> edgeId` (spec.md §6). Marks the set dirty.
    pub fn add_obstacle(&mut self, p1: Vec2, p2: Vec2) -> usize {
        self.edges.push(ObstacleEdge::new(p1, p2));
        self.dirty = true;
        self.edges.len() - 1
    }

    /// `clearObstacles()` (spec.md §6).
    pub fn clear_obstacles(&mut self) {
        self.edges.clear();
        self.tree = segment_tree::SegmentTree::default();
        self.dirty = true;
    }

    /// `rebuildObstacles()` (spec.md §6): runs the linkage pass then rebuilds
    /// the segment KD-tree. Idempotent: rebuilding twice on an unchanged
    /// edge set yields identical topology (spec.md §8 round-trip property).
    pub fn rebuild(&mut self, link_eps: f32) {
        self.link_edges(link_eps);
        self.compute_convexity();
        self.tree = segment_tree::SegmentTree::build(self.edges.clone());
        self.dirty = false;
    }

    /// Step 1-2 of spec.md §4.3: quantize each `P1` into a grid keyed by
    /// `link_eps`, then for every edge find the closest candidate whose
    /// `P1` lands near `E.P2`.
    fn link_edges(&mut self, link_eps: f32) {
        for edge in &mut self.edges {
            edge.next = None;
            edge.prev = None;
        }

        let cell = link_eps.max(EPS);
        let quantize = |p: Vec2| -> (i64, i64) {
            ((p.x / cell).round() as i64, (p.y / cell).round() as i64)
        };

        let mut grid: std::collections::HashMap<(i64, i64), Vec<usize>> =
            std::collections::HashMap::new();
        for (i, edge) in self.edges.iter().enumerate() {
            grid.entry(quantize(edge.p1)).or_default().push(i);
        }

        let link_eps_sq = link_eps * link_eps;
        let mut next_links: Vec<Option<usize>> = vec![None; self.edges.len()];
        for (i, edge) in self.edges.iter().enumerate() {
            let key = quantize(edge.p2);
            let mut best: Option<(usize, f32)> = None;
            for dx in -1..=1 {
                for dy in -1..=1 {
                    let Some(candidates) = grid.get(&(key.0 + dx, key.1 + dy)) else {
                        continue;
                    };
                    for &candidate in candidates {
                        if candidate == i {
                            continue;
                        }
                        let dist_sq = self.edges[candidate].p1.distance_squared(edge.p2);
                        if dist_sq <= link_eps_sq
                            && best.is_none_or(|(_, best_dist)| dist_sq < best_dist)
                        {
                            best = Some((candidate, dist_sq));
                        }
                    }
                }
            }
            next_links[i] = best.map(|(idx, _)| idx);
        }

        for (i, next) in next_links.into_iter().enumerate() {
            self.edges[i].next = next;
            if let Some(next) = next {
                self.edges[next].prev = Some(i);
            }
        }
    }

    /// Step 3 of spec.md §4.3. Open-chain endpoints default to convex.
    fn compute_convexity(&mut self) {
        for i in 0..self.edges.len() {
            let (prev, next) = (self.edges[i].prev, self.edges[i].next);
            self.edges[i].is_convex = match (prev, next) {
                (Some(prev), Some(next)) => {
                    left_of(self.edges[prev].p1, self.edges[i].p1, self.edges[next].p1) >= 0.0
                }
                _ => true,
            };
        }
    }

    /// Sorted proximity query used by `orca::obstacle` (spec.md §4.3).
    /// Returned indices are into [`Self::query_edges`], not [`Self::edges`]:
    /// the tree may have split an edge into fragments at build time, and
    /// fragment indices only exist in its own copy of the arena.
    #[must_use]
    pub fn query_sorted(&self, p: Vec2, range_sq: f32) -> Vec<usize> {
        self.tree.query_sorted(p, range_sq)
    }

    /// The edge arena matching indices returned by [`Self::query_sorted`]
    /// (post segment-splitting). Use this, not [`Self::edges`], when
    /// resolving a `query_sorted` result to its edge.
    #[must_use]
    pub fn query_edges(&self) -> &[ObstacleEdge] {
        self.tree.edges()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn pentagon_edges(shuffle: bool) -> Vec<(Vec2, Vec2)> {
        let verts = [
            Vec2::new(1.0, 0.0),
            Vec2::new(0.309, 0.951),
            Vec2::new(-0.809, 0.588),
            Vec2::new(-0.809, -0.588),
            Vec2::new(0.309, -0.951),
        ];
        let mut edges: Vec<(Vec2, Vec2)> = (0..5)
            .map(|i| (verts[i], verts[(i + 1) % 5]))
            .collect();
        if shuffle {
            edges.swap(0, 3);
            edges.swap(1, 4);
        }
        edges
    }

    #[test]
    fn pentagon_links_into_a_single_ccw_cycle() {
        // spec.md §8 S5
        let mut set = ObstacleSet::new();
        for (p1, p2) in pentagon_edges(true) {
            set.add_obstacle(p1, p2);
        }
        set.rebuild(0.05);

        let start = 0;
        let mut visited = vec![start];
        let mut current = set.edge(start).unwrap().next.unwrap();
        while current != start {
            visited.push(current);
            current = set.edge(current).unwrap().next.unwrap();
        }
        assert_eq!(visited.len(), 5);
        for edge in set.edges() {
            assert!(edge.is_convex);
        }
    }

    #[test]
    fn linkage_respects_eps_tolerance() {
        let mut set = ObstacleSet::new();
        set.add_obstacle(Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0));
        set.add_obstacle(Vec2::new(1.001, 0.0), Vec2::new(2.0, 0.0));
        set.rebuild(0.05);
        assert_eq!(set.edge(0).unwrap().next, Some(1));
        assert_eq!(set.edge(1).unwrap().prev, Some(0));

        // |E.P2 - E.next.P1| < ObstacleLinkEpsilon (spec.md §8 invariant 5).
        let gap = set.edge(0).unwrap().p2.distance(set.edge(1).unwrap().p1);
        assert!(gap < 0.05);
    }

    #[test]
    fn unlinked_edges_stay_open_and_convex() {
        let mut set = ObstacleSet::new();
        set.add_obstacle(Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0));
        set.add_obstacle(Vec2::new(50.0, 50.0), Vec2::new(51.0, 50.0));
        set.rebuild(0.05);
        assert_eq!(set.edge(0).unwrap().next, None);
        assert!(set.edge(0).unwrap().is_convex);
    }

    #[test]
    fn query_sorted_indices_resolve_against_query_edges() {
        let mut set = ObstacleSet::new();
        for (p1, p2) in pentagon_edges(false) {
            set.add_obstacle(p1, p2);
        }
        set.rebuild(0.05);
        let hits = set.query_sorted(Vec2::ZERO, 100.0);
        let query_edges = set.query_edges();
        assert!(hits.iter().all(|&i| i < query_edges.len()));
    }

    #[test]
    fn rebuild_is_idempotent() {
        let mut set = ObstacleSet::new();
        for (p1, p2) in pentagon_edges(false) {
            set.add_obstacle(p1, p2);
        }
        set.rebuild(0.05);
        let first: Vec<_> = set.edges().to_vec();
        set.rebuild(0.05);
        let second: Vec<_> = set.edges().to_vec();
        assert_eq!(first, second);
    }
}
