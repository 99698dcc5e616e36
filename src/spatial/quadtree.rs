//! Quad-tree variant over a fixed square (well, rectangular) world bound.
//!
//! Grounded the same way as the other tree variants but split into four
//! same-shaped children at the bound's center rather than a binary median
//! split, matching spec.md §4.2's quad-tree description. Bucketed leaves
//! (rather than one point per leaf) keep the recursion shallow for the
//! skewed point distributions a crowd simulation produces.

use glam::Vec2;

use super::{KNearestAccumulator, PointIndex};

const LEAF_CAPACITY: usize = 8;
const MAX_DEPTH: u32 = 16;

#[derive(Debug, Clone, Copy)]
struct Bounds {
    min: Vec2,
    max: Vec2,
}

impl Bounds {
    fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    fn quadrant(&self, q: usize) -> Bounds {
        let c = self.center();
        let (min_x, max_x) = if q & 1 == 0 {
            (self.min.x, c.x)
        } else {
            (c.x, self.max.x)
        };
        let (min_y, max_y) = if q & 2 == 0 {
            (self.min.y, c.y)
        } else {
            (c.y, self.max.y)
        };
        Bounds {
            min: Vec2::new(min_x, min_y),
            max: Vec2::new(max_x, max_y),
        }
    }

    fn dist_sq(&self, p: Vec2) -> f32 {
        let dx = (self.min.x - p.x).max(0.0).max(p.x - self.max.x);
        let dy = (self.min.y - p.y).max(0.0).max(p.y - self.max.y);
        dx * dx + dy * dy
    }

    fn quadrant_of(&self, p: Vec2) -> usize {
        let c = self.center();
        usize::from(p.x >= c.x) | (usize::from(p.y >= c.y) << 1)
    }
}

enum Node {
    Leaf { points: Vec<usize> },
    Interior { children: Box<[Node; 4]> },
}

#[derive(Debug, Default)]
pub struct QuadTree {
    points: Vec<Vec2>,
    bounds: Bounds,
    root: Option<Box<NodeHandle>>,
}

struct NodeHandle(Node);
impl std::fmt::Debug for NodeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("NodeHandle")
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Bounds {
            min: Vec2::splat(-1.0),
            max: Vec2::splat(1.0),
        }
    }
}

impl QuadTree {
    #[must_use]
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self {
            points: Vec::new(),
            bounds: Bounds { min, max },
            root: None,
        }
    }

    fn insert(&self, node: &mut Node, bounds: Bounds, index: usize, depth: u32) {
        match node {
            Node::Leaf { points } => {
                if points.len() < LEAF_CAPACITY || depth >= MAX_DEPTH {
                    points.push(index);
                } else {
                    let mut children: [Node; 4] = [
                        Node::Leaf { points: Vec::new() },
                        Node::Leaf { points: Vec::new() },
                        Node::Leaf { points: Vec::new() },
                        Node::Leaf { points: Vec::new() },
                    ];
                    let existing = std::mem::take(points);
                    for existing_index in existing {
                        let q = bounds.quadrant_of(self.points[existing_index]);
                        self.insert(
                            &mut children[q],
                            bounds.quadrant(q),
                            existing_index,
                            depth + 1,
                        );
                    }
                    let q = bounds.quadrant_of(self.points[index]);
                    self.insert(&mut children[q], bounds.quadrant(q), index, depth + 1);
                    *node = Node::Interior {
                        children: Box::new(children),
                    };
                }
            }
            Node::Interior { children } => {
                let q = bounds.quadrant_of(self.points[index]);
                self.insert(&mut children[q], bounds.quadrant(q), index, depth + 1);
            }
        }
    }

    fn visit(
        &self,
        node: &Node,
        bounds: Bounds,
        p: Vec2,
        radius_sq: f32,
        acc: &mut KNearestAccumulator,
    ) {
        match node {
            Node::Leaf { points } => {
                for &i in points {
                    let dist_sq = self.points[i].distance_squared(p);
                    if dist_sq <= radius_sq {
                        acc.offer(i, dist_sq);
                    }
                }
            }
            Node::Interior { children } => {
                let mut order: [usize; 4] = [0, 1, 2, 3];
                order.sort_by(|&a, &b| {
                    bounds
                        .quadrant(a)
                        .dist_sq(p)
                        .partial_cmp(&bounds.quadrant(b).dist_sq(p))
                        .unwrap_or(std::cmp::Ordering::Equal)
                });
                for q in order {
                    let child_bounds = bounds.quadrant(q);
                    if child_bounds.dist_sq(p) <= acc.worst_dist_sq() {
                        self.visit(&children[q], child_bounds, p, radius_sq, acc);
                    }
                }
            }
        }
    }
}

impl PointIndex for QuadTree {
    fn build(&mut self, points: &[Vec2]) {
        self.points.clear();
        self.points.extend_from_slice(points);
        if self.points.is_empty() {
            self.root = None;
            return;
        }
        let mut root = Node::Leaf { points: Vec::new() };
        for i in 0..self.points.len() {
            self.insert(&mut root, self.bounds, i, 0);
        }
        self.root = Some(Box::new(NodeHandle(root)));
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
        self.visit(&root.0, self.bounds, p, radius * radius, &mut acc);
        acc.into_sorted_indices()
    }

    fn query_radius(&self, p: Vec2, r: f32) -> Vec<usize> {
        let Some(root) = &self.root else {
            return Vec::new();
        };
        let mut result = Vec::new();
        let r_sq = r * r;
        collect_radius(&root.0, self.bounds, &self.points, p, r_sq, &mut result);
        result
    }
}

fn collect_radius(
    node: &Node,
    bounds: Bounds,
    points: &[Vec2],
    p: Vec2,
    r_sq: f32,
    out: &mut Vec<usize>,
) {
    if bounds.dist_sq(p) > r_sq {
        return;
    }
    match node {
        Node::Leaf { points: leaf } => {
            for &i in leaf {
                if points[i].distance_squared(p) <= r_sq {
                    out.push(i);
                }
            }
        }
        Node::Interior { children } => {
            for q in 0..4 {
                collect_radius(&children[q], bounds.quadrant(q), points, p, r_sq, out);
            }
        }
    }
}
