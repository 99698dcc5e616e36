//! Agent-obstacle ORCA constraint (spec.md §4.4.2).
//!
//! The teacher has no obstacle-aware ORCA (it defers static geometry to
//! `vleue_navigator`'s navmesh); this is the RVO2 reference algorithm for
//! obstacle velocity obstacles, reconstructed from spec.md's paraphrase and
//! grounded in the same half-plane conventions as `orca::agent` (unit
//! directions, "left of line is feasible", `rot90ccw` offset for the
//! collision-radius padding).

use glam::Vec2;

use crate::math::{det, rot90_ccw, EPS};
use crate::obstacle::ObstacleEdge;
use crate::orca::OrcaLine;

/// Build every (non-"already-covered") obstacle ORCA line for agent
/// `position`/`radius`/`velocity`, iterating `edges[sorted_indices[..]]` in
/// the mandatory closest-first order (spec.md §4.3's sorted proximity
/// query).
#[must_use]
pub fn build_obstacle_lines(
    position: Vec2,
    radius: f32,
    velocity: Vec2,
    time_horizon_obst: f32,
    edges: &[ObstacleEdge],
    sorted_indices: &[usize],
) -> Vec<OrcaLine> {
    let inv_h = 1.0 / time_horizon_obst;
    let radius_sq = radius * radius;
    let mut lines: Vec<OrcaLine> = Vec::new();

    'edges: for &edge_idx in sorted_indices {
        let edge = edges[edge_idx];
        let v1 = edge.p1;
        let v2 = edge.p2;
        let rp1 = v1 - position;
        let rp2 = v2 - position;

        if already_covered(rp1, rp2, inv_h, radius, &lines) {
            continue;
        }

        let ev = v2 - v1;
        let ev_len_sq = ev.length_squared();
        if ev_len_sq <= EPS {
            continue; // degenerate zero-length edge: silently skipped per spec.md §7
        }
        let s = (-rp1).dot(ev) / ev_len_sq;
        let dist_sq_line = (-rp1 - s * ev).length_squared();

        let dist_sq_1 = rp1.length_squared();
        let dist_sq_2 = rp2.length_squared();

        // Collision cases: hard constraint with point = (0, 0).
        if s < 0.0 && dist_sq_1 <= radius_sq {
            if edge.is_convex {
                let direction = Vec2::new(-rp1.y, rp1.x).normalize_or_zero();
                lines.push(OrcaLine::new(Vec2::ZERO, direction));
            }
            continue;
        }
        if s > 1.0 && dist_sq_2 <= radius_sq {
            // A dangling endpoint (no `next`) is treated as convex with no
            // neighbor to filter against (Design Notes Open Question 3).
            let next_is_convex = edge.next.map_or(true, |n| edges[n].is_convex);
            let not_filtered_by_next = edge.next.map_or(true, |n| det(rp2, edges[n].direction) >= 0.0);
            if next_is_convex && not_filtered_by_next {
                let direction = Vec2::new(-rp2.y, rp2.x).normalize_or_zero();
                lines.push(OrcaLine::new(Vec2::ZERO, direction));
            }
            continue;
        }
        if (0.0..=1.0).contains(&s) && dist_sq_line <= radius_sq {
            lines.push(OrcaLine::new(Vec2::ZERO, -edge.direction));
            continue;
        }

        // No collision: compute the two velocity-obstacle legs. `obstacle1`/
        // `obstacle2` are the edges that "own" the left/right cutoff vertex;
        // they both default to (edge, edge.next) but the oblique cases
        // reassign one to the other when a single vertex obscures the whole
        // segment, exactly as the RVO2 reference algorithm does.
        let (left_vertex, right_vertex, mut left_leg, mut right_leg, same_vertex);
        let obstacle1_idx: usize;
        let obstacle2_idx: Option<usize>;

        if s < 0.0 && dist_sq_line <= radius_sq {
            if !edge.is_convex {
                continue 'edges;
            }
            let leg = (dist_sq_1 - radius_sq).max(0.0).sqrt();
            left_leg = Vec2::new(
                rp1.x.mul_add(leg, -(rp1.y * radius)),
                rp1.x.mul_add(radius, rp1.y * leg),
            ) / dist_sq_1;
            right_leg = Vec2::new(
                rp1.x.mul_add(leg, rp1.y * radius),
                (-rp1.x).mul_add(radius, rp1.y * leg),
            ) / dist_sq_1;
            left_vertex = v1;
            right_vertex = v1;
            same_vertex = true;
            obstacle1_idx = edge_idx;
            obstacle2_idx = Some(edge_idx);
        } else if s > 1.0 && dist_sq_line <= radius_sq {
            let Some(next_idx) = edge.next else { continue 'edges };
            if !edges[next_idx].is_convex {
                continue 'edges;
            }
            let leg = (dist_sq_2 - radius_sq).max(0.0).sqrt();
            left_leg = Vec2::new(
                rp2.x.mul_add(leg, -(rp2.y * radius)),
                rp2.x.mul_add(radius, rp2.y * leg),
            ) / dist_sq_2;
            right_leg = Vec2::new(
                rp2.x.mul_add(leg, rp2.y * radius),
                (-rp2.x).mul_add(radius, rp2.y * leg),
            ) / dist_sq_2;
            left_vertex = v2;
            right_vertex = v2;
            same_vertex = true;
            obstacle1_idx = next_idx;
            obstacle2_idx = Some(next_idx);
        } else {
            left_leg = if edge.is_convex {
                let leg = (dist_sq_1 - radius_sq).max(0.0).sqrt();
                Vec2::new(
                    rp1.x.mul_add(leg, -(rp1.y * radius)),
                    rp1.x.mul_add(radius, rp1.y * leg),
                ) / dist_sq_1
            } else {
                -edge.direction
            };
            let next_convex = edge.next.map_or(true, |n| edges[n].is_convex);
            right_leg = if next_convex {
                let leg = (dist_sq_2 - radius_sq).max(0.0).sqrt();
                Vec2::new(
                    rp2.x.mul_add(leg, rp2.y * radius),
                    (-rp2.x).mul_add(radius, rp2.y * leg),
                ) / dist_sq_2
            } else {
                edge.direction
            };
            left_vertex = v1;
            right_vertex = v2;
            same_vertex = false;
            obstacle1_idx = edge_idx;
            obstacle2_idx = edge.next;
        }

        // Foreign-leg test: a leg that points into the obstacle body is
        // rotated onto the neighboring edge's direction instead.
        let mut left_foreign = false;
        let mut right_foreign = false;

        if edges[obstacle1_idx].is_convex {
            if let Some(prev_dir) = edges[obstacle1_idx].prev.map(|p| edges[p].direction) {
                if det(left_leg, -prev_dir) >= 0.0 {
                    left_leg = -prev_dir;
                    left_foreign = true;
                }
            }
        }
        if let Some(obstacle2_idx) = obstacle2_idx {
            if edges[obstacle2_idx].is_convex {
                let owner_dir = edges[obstacle2_idx].direction;
                if det(right_leg, owner_dir) <= 0.0 {
                    right_leg = owner_dir;
                    right_foreign = true;
                }
            }
        }
        let cutoff_dir = edges[obstacle1_idx].direction;

        let left_cutoff = inv_h * (left_vertex - position);
        let right_cutoff = inv_h * (right_vertex - position);
        let cutoff_vec = right_cutoff - left_cutoff;

        let t = if same_vertex {
            0.5
        } else {
            let denom = cutoff_vec.length_squared();
            if denom <= EPS {
                0.5
            } else {
                (velocity - left_cutoff).dot(cutoff_vec) / denom
            }
        };
        let t_left = (velocity - left_cutoff).dot(left_leg);
        let t_right = (velocity - right_cutoff).dot(right_leg);

        if (t < 0.0 && t_left < 0.0) || (same_vertex && t_left < 0.0 && t_right < 0.0) {
            let w = velocity - left_cutoff;
            if w.length_squared() <= EPS {
                continue;
            }
            let unit_w = w.normalize();
            let direction = Vec2::new(unit_w.y, -unit_w.x);
            let point = left_cutoff + radius * inv_h * unit_w;
            lines.push(OrcaLine::new(point, direction));
            continue;
        }
        if t > 1.0 && t_right < 0.0 {
            let w = velocity - right_cutoff;
            if w.length_squared() <= EPS {
                continue;
            }
            let unit_w = w.normalize();
            let direction = Vec2::new(unit_w.y, -unit_w.x);
            let point = right_cutoff + radius * inv_h * unit_w;
            lines.push(OrcaLine::new(point, direction));
            continue;
        }

        let dist_sq_cutoff = if t < 0.0 || t > 1.0 || same_vertex {
            f32::INFINITY
        } else {
            (velocity - (left_cutoff + t * cutoff_vec)).length_squared()
        };
        let dist_sq_left = if t_left < 0.0 {
            f32::INFINITY
        } else {
            (velocity - (left_cutoff + t_left * left_leg)).length_squared()
        };
        let dist_sq_right = if t_right < 0.0 {
            f32::INFINITY
        } else {
            (velocity - (right_cutoff + t_right * right_leg)).length_squared()
        };

        if dist_sq_cutoff <= dist_sq_left && dist_sq_cutoff <= dist_sq_right {
            let direction = -cutoff_dir;
            let point = left_cutoff + radius * inv_h * rot90_ccw(direction);
            lines.push(OrcaLine::new(point, direction));
        } else if dist_sq_left <= dist_sq_right {
            if left_foreign {
                continue;
            }
            let point = left_cutoff + radius * inv_h * rot90_ccw(left_leg);
            lines.push(OrcaLine::new(point, left_leg));
        } else {
            if right_foreign {
                continue;
            }
            let direction = -right_leg;
            let point = right_cutoff + radius * inv_h * rot90_ccw(direction);
            lines.push(OrcaLine::new(point, direction));
        }
    }

    lines
}

/// Already-covered test (spec.md §4.4.2): is the velocity obstacle of this
/// edge fully dominated by a previously emitted (closer) obstacle line?
fn already_covered(rp1: Vec2, rp2: Vec2, inv_h: f32, radius: f32, lines: &[OrcaLine]) -> bool {
    lines.iter().any(|line| {
        det(inv_h * rp1 - line.point, line.direction) - inv_h * radius >= -EPS
            && det(inv_h * rp2 - line.point, line.direction) - inv_h * radius >= -EPS
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn wall_edges() -> Vec<ObstacleEdge> {
        // Horizontal wall from (-10,0) to (10,0), interior below (agent above).
        let mut edge = ObstacleEdge {
            p1: Vec2::new(-10.0, 0.0),
            p2: Vec2::new(10.0, 0.0),
            direction: Vec2::new(1.0, 0.0),
            is_convex: true,
            next: None,
            prev: None,
        };
        edge.is_convex = true;
        vec![edge]
    }

    #[test]
    fn agent_above_wall_gets_a_feasibility_constraint() {
        let edges = wall_edges();
        let lines = build_obstacle_lines(
            Vec2::new(0.0, 2.0),
            0.5,
            Vec2::new(0.0, -1.0),
            2.0,
            &edges,
            &[0],
        );
        assert!(!lines.is_empty());
    }

    #[test]
    fn agent_far_from_wall_yields_no_constraint() {
        let edges = wall_edges();
        let lines = build_obstacle_lines(
            Vec2::new(0.0, 500.0),
            0.5,
            Vec2::new(0.0, -1.0),
            2.0,
            &edges,
            &[0],
        );
        assert!(lines.is_empty());
    }

    #[test]
    fn segment_collision_emits_hard_line_through_origin() {
        let edges = wall_edges();
        // Agent overlapping the segment itself.
        let lines = build_obstacle_lines(Vec2::new(0.0, 0.1), 0.5, Vec2::ZERO, 2.0, &edges, &[0]);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].point, Vec2::ZERO);
    }

    #[test]
    fn convex_corner_right_leg_keeps_interior_infeasible() {
        // Right-angle corner: edge0 runs along +x into the corner at the
        // origin, edge1 continues along -y. Agent sits past the corner with
        // a velocity that makes the right leg the closest projection (not
        // the cutoff line, not the left leg) -- regression for the right leg
        // being emitted un-negated.
        let mut edge0 = ObstacleEdge {
            p1: Vec2::new(-10.0, 0.0),
            p2: Vec2::new(0.0, 0.0),
            direction: Vec2::new(1.0, 0.0),
            is_convex: true,
            next: Some(1),
            prev: None,
        };
        edge0.is_convex = true;
        let edge1 = ObstacleEdge {
            p1: Vec2::new(0.0, 0.0),
            p2: Vec2::new(0.0, -10.0),
            direction: Vec2::new(0.0, -1.0),
            is_convex: true,
            next: None,
            prev: Some(0),
        };
        let edges = vec![edge0, edge1];

        let lines = build_obstacle_lines(
            Vec2::new(2.0, -2.0),
            0.5,
            Vec2::new(-0.5, 2.5),
            2.0,
            &edges,
            &[0],
        );
        assert_eq!(lines.len(), 1);
        let line = lines[0];

        // Heading back into the corner's interior pocket must violate.
        assert!(line.signed_violation(Vec2::new(-5.0, -5.0)) > 0.0);
        // Heading away along free space past the corner must stay feasible.
        assert!(line.signed_violation(Vec2::new(-0.5, 5.0)) < 0.0);
    }

    #[test]
    fn zero_length_edge_is_skipped() {
        let edges = vec![ObstacleEdge {
            p1: Vec2::new(1.0, 1.0),
            p2: Vec2::new(1.0, 1.0),
            direction: Vec2::ZERO,
            is_convex: true,
            next: None,
            prev: None,
        }];
        let lines = build_obstacle_lines(Vec2::ZERO, 0.5, Vec2::ZERO, 2.0, &edges, &[0]);
        assert!(lines.is_empty());
    }
}
