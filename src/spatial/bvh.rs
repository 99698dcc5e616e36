//! BVH variant: longest-axis median splits, per-node AABB, pruning via
//! box distance.
//!
//! Grounded on the same `korangar-collision::kdtree` node shape (explicit
//! `left`/`right` indices, a boundary stored per interior node) but split
//! along whichever axis has the larger extent at each level rather than
//! alternating, matching spec.md §4.2's BVH variant description.

use glam::Vec2;

use super::{KNearestAccumulator, PointIndex};

#[derive(Debug, Clone, Copy)]
struct Aabb {
    min: Vec2,
    max: Vec2,
}

impl Aabb {
    fn of(points: &[Vec2], indices: &[usize]) -> Self {
        let mut min = Vec2::splat(f32::INFINITY);
        let mut max = Vec2::splat(f32::NEG_INFINITY);
        for &i in indices {
            min = min.min(points[i]);
            max = max.max(points[i]);
        }
        Self { min, max }
    }

    fn longest_axis(&self) -> usize {
        let extent = self.max - self.min;
        usize::from(extent.y > extent.x)
    }

    /// Squared distance from `p` to the closest point on this box (0 if
    /// `p` is inside).
    fn dist_sq(&self, p: Vec2) -> f32 {
        let dx = (self.min.x - p.x).max(0.0).max(p.x - self.max.x);
        let dy = (self.min.y - p.y).max(0.0).max(p.y - self.max.y);
        dx * dx + dy * dy
    }
}

enum Node {
    Leaf {
        point_index: usize,
    },
    Interior {
        aabb: Aabb,
        left: Box<Node>,
        right: Box<Node>,
    },
}

#[derive(Debug, Default)]
pub struct Bvh {
    points: Vec<Vec2>,
    root: Option<Box<NodeHandle>>,
}

struct NodeHandle(Node);
impl std::fmt::Debug for NodeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("NodeHandle")
    }
}

impl Bvh {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn build_recursive(&self, indices: &mut [usize]) -> Node {
        if indices.len() == 1 {
            return Node::Leaf {
                point_index: indices[0],
            };
        }
        let aabb = Aabb::of(&self.points, indices);
        let axis = aabb.longest_axis();
        let mid = indices.len() / 2;
        indices.select_nth_unstable_by(mid, |&a, &b| {
            axis_value(self.points[a], axis)
                .partial_cmp(&axis_value(self.points[b], axis))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let (left_indices, right_indices) = indices.split_at_mut(mid);
        let left = Box::new(self.build_recursive(left_indices));
        let right = Box::new(self.build_recursive(right_indices));
        Node::Interior { aabb, left, right }
    }

    fn visit(&self, node: &Node, p: Vec2, radius_sq: f32, acc: &mut KNearestAccumulator) {
        match node {
            Node::Leaf { point_index } => {
                let dist_sq = self.points[*point_index].distance_squared(p);
                if dist_sq <= radius_sq {
                    acc.offer(*point_index, dist_sq);
                }
            }
            Node::Interior { aabb, left, right } => {
                let left_bound = box_dist_sq(left, &self.points, p);
                let right_bound = box_dist_sq(right, &self.points, p);
                let _ = aabb;
                let (first, first_bound, second, second_bound) = if left_bound <= right_bound {
                    (left, left_bound, right, right_bound)
                } else {
                    (right, right_bound, left, left_bound)
                };
                if first_bound <= acc.worst_dist_sq() {
                    self.visit(first, p, radius_sq, acc);
                }
                if second_bound <= acc.worst_dist_sq() {
                    self.visit(second, p, radius_sq, acc);
                }
            }
        }
    }
}

fn box_dist_sq(node: &Node, points: &[Vec2], p: Vec2) -> f32 {
    match node {
        Node::Leaf { point_index } => points[*point_index].distance_squared(p),
        Node::Interior { aabb, .. } => aabb.dist_sq(p),
    }
}

fn axis_value(p: Vec2, axis: usize) -> f32 {
    if axis == 0 {
        p.x
    } else {
        p.y
    }
}

impl PointIndex for Bvh {
    fn build(&mut self, points: &[Vec2]) {
        self.points.clear();
        self.points.extend_from_slice(points);
        if self.points.is_empty() {
            self.root = None;
            return;
        }
        let mut indices: Vec<usize> = (0..self.points.len()).collect();
        self.root = Some(Box::new(NodeHandle(self.build_recursive(&mut indices))));
    }

    fn query_k_nearest(&self, p: Vec2, k: usize) -> Vec<usize> {
        self.query_k_nearest_sorted(p, k, f32::INFINITY)
    }

    fn query_k_nearest_sorted(&self, p: Vec2, k: usize, radius: f32) -> Vec<usize> {
        if k == 0 {
            return Vec::new();
        }
        let Some(root) = &self.root else {
            return Vec::new();
        };
        let mut acc = KNearestAccumulator::new(k);
        self.visit(&root.0, p, radius * radius, &mut acc);
        acc.into_sorted_indices()
    }

    fn query_radius(&self, p: Vec2, r: f32) -> Vec<usize> {
        let Some(root) = &self.root else {
            return Vec::new();
        };
        let mut result = Vec::new();
        let r_sq = r * r;
        collect_radius(&root.0, &self.points, p, r_sq, &mut result);
        result
    }
}

fn collect_radius(node: &Node, points: &[Vec2], p: Vec2, r_sq: f32, out: &mut Vec<usize>) {
    match node {
        Node::Leaf { point_index } => {
            if points[*point_index].distance_squared(p) <= r_sq {
                out.push(*point_index);
            }
        }
        Node::Interior { aabb, left, right } => {
            if aabb.dist_sq(p) > r_sq {
                return;
            }
            collect_radius(left, points, p, r_sq, out);
            collect_radius(right, points, p, r_sq, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn nearest_matches_brute_force() {
        let points: Vec<Vec2> = (0..40)
            .map(|i| Vec2::new((i as f32 * 2.3).sin() * 15.0, (i as f32 * 1.1).cos() * 15.0))
            .collect();
        let mut bvh = Bvh::new();
        bvh.build(&points);

        let query = Vec2::new(-4.0, 6.0);
        let got = bvh.query_k_nearest_sorted(query, 6, f32::INFINITY);
        let expected = super::super::brute_force_k_nearest(&points, query, 6, f32::INFINITY);
        assert_eq!(got, expected);
    }

    #[test]
    fn empty_bvh_returns_nothing() {
        let mut bvh = Bvh::new();
        bvh.build(&[]);
        assert!(bvh.query_k_nearest(Vec2::ZERO, 3).is_empty());
    }
}
