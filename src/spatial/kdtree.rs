//! KD-tree variant: median-of-partition splits alternating x/y axes,
//! `O(N log N)` build via quickselect, recursive-descent query with
//! sibling pruning by axis distance.
//!
//! Node/leaf shape (explicit `left`/`right` child indices into a flat
//! `Vec`, rather than boxed pointers) is grounded on
//! `korangar-collision::kdtree::KDTree`'s `KDTreeNode::{Node, Leaf}` layout,
//! adapted from its 3D AABB surface-area-heuristic splits to the simpler 2D
//! point median split spec.md §4.2 specifies.

use glam::Vec2;

use super::{KNearestAccumulator, PointIndex};

enum Node {
    /// Interior: splits `points[point_index]` along `axis`; children cover
    /// the remaining points partitioned about the median.
    Split {
        axis: usize,
        point_index: usize,
        split_value: f32,
        left: Option<Box<Node>>,
        right: Option<Box<Node>>,
    },
    Leaf {
        point_index: usize,
    },
}

#[derive(Debug, Default)]
pub struct KdTree {
    points: Vec<Vec2>,
    root: Option<Box<NodeHandle>>,
}

/// Wrapper so `KdTree` doesn't need `Node` to be `pub`.
struct NodeHandle(Node);

impl std::fmt::Debug for NodeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("NodeHandle")
    }
}

impl KdTree {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn build_recursive(&self, indices: &mut [usize], depth: usize) -> Option<Box<Node>> {
        if indices.is_empty() {
            return None;
        }
        if indices.len() == 1 {
            return Some(Box::new(Node::Leaf {
                point_index: indices[0],
            }));
        }
        let axis = depth % 2;
        let mid = indices.len() / 2;
        indices.select_nth_unstable_by(mid, |&a, &b| {
            axis_value(self.points[a], axis)
                .partial_cmp(&axis_value(self.points[b], axis))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let point_index = indices[mid];
        let split_value = axis_value(self.points[point_index], axis);
        let (left_indices, rest) = indices.split_at_mut(mid);
        let right_indices = &mut rest[1..];

        let left = self.build_recursive(left_indices, depth + 1);
        let right = self.build_recursive(right_indices, depth + 1);

        Some(Box::new(Node::Split {
            axis,
            point_index,
            split_value,
            left,
            right,
        }))
    }

    fn visit(&self, node: &Node, p: Vec2, radius_sq: f32, acc: &mut KNearestAccumulator) {
        match node {
            Node::Leaf { point_index } => {
                let dist_sq = self.points[*point_index].distance_squared(p);
                if dist_sq <= radius_sq {
                    acc.offer(*point_index, dist_sq);
                }
            }
            Node::Split {
                axis,
                point_index,
                split_value,
                left,
                right,
            } => {
                let dist_sq = self.points[*point_index].distance_squared(p);
                if dist_sq <= radius_sq {
                    acc.offer(*point_index, dist_sq);
                }

                let query_value = axis_value(p, *axis);
                let (near, far) = if query_value <= *split_value {
                    (left, right)
                } else {
                    (right, left)
                };
                if let Some(near) = near {
                    self.visit(near, p, radius_sq, acc);
                }
                let axis_dist = query_value - split_value;
                if axis_dist * axis_dist <= acc.worst_dist_sq() {
                    if let Some(far) = far {
                        self.visit(far, p, radius_sq, acc);
                    }
                }
            }
        }
    }
}

fn axis_value(p: Vec2, axis: usize) -> f32 {
    if axis == 0 {
        p.x
    } else {
        p.y
    }
}

impl PointIndex for KdTree {
    fn build(&mut self, points: &[Vec2]) {
        self.points.clear();
        self.points.extend_from_slice(points);
        let mut indices: Vec<usize> = (0..self.points.len()).collect();
        self.root = self
            .build_recursive(&mut indices, 0)
            .map(|node| Box::new(NodeHandle(*node)));
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
        Node::Split {
            axis,
            point_index,
            split_value,
            left,
            right,
        } => {
            if points[*point_index].distance_squared(p) <= r_sq {
                out.push(*point_index);
            }
            let query_value = axis_value(p, *axis);
            let axis_dist = query_value - split_value;
            let (near, far) = if query_value <= *split_value {
                (left, right)
            } else {
                (right, left)
            };
            if let Some(near) = near {
                collect_radius(near, points, p, r_sq, out);
            }
            if axis_dist * axis_dist <= r_sq {
                if let Some(far) = far {
                    collect_radius(far, points, p, r_sq, out);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn single_point_tree() {
        let mut tree = KdTree::new();
        tree.build(&[Vec2::new(1.0, 1.0)]);
        assert_eq!(tree.query_k_nearest(Vec2::ZERO, 1), vec![0]);
    }

    #[test]
    fn empty_tree_returns_nothing() {
        let mut tree = KdTree::new();
        tree.build(&[]);
        assert!(tree.query_k_nearest(Vec2::ZERO, 5).is_empty());
    }

    #[test]
    fn nearest_matches_brute_force() {
        let points: Vec<Vec2> = (0..50)
            .map(|i| Vec2::new((i as f32 * 1.7).sin() * 20.0, (i as f32 * 0.9).cos() * 20.0))
            .collect();
        let mut tree = KdTree::new();
        tree.build(&points);

        let query = Vec2::new(3.0, -2.0);
        let got = tree.query_k_nearest_sorted(query, 5, f32::INFINITY);
        let expected = super::super::brute_force_k_nearest(&points, query, 5, f32::INFINITY);
        assert_eq!(got, expected);
    }
}
