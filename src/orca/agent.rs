//! Agent-agent ORCA constraint (spec.md §4.4.1).
//!
//! Grounded directly on the teacher's `compute_orca_line`
//! (`gameplay/units/avoidance/orca.rs`), which implements the same RVO2
//! leg/cutoff-circle math. Two departures from the teacher, both required
//! by spec.md:
//! - the teacher skips emission entirely when agents already overlap
//!   (`dist_sq <= combined_radius_sq`), deferring to its physics engine's
//!   pushbox; this spec's "colliding" branch (§4.4.1) is load-bearing —
//!   there is no physics engine to fall back to — so it is implemented here
//!   using `invDt` exactly as Design Notes Open Question 1 directs.
//! - the teacher scales `u` by a per-agent `responsibility` field; this spec
//!   fixes the coefficient at `0.5` (`line.point = A.vel + 0.5*u`), so that
//!   field is dropped.

use glam::Vec2;

use crate::math::{det, rot90_cw};
use crate::orca::OrcaLine;

/// The subset of agent state the constraint builder needs.
#[derive(Debug, Clone, Copy)]
pub struct AgentSnapshot {
    pub position: Vec2,
    pub velocity: Vec2,
    pub radius: f32,
}

/// Build the ORCA line for `a` avoiding neighbor `o`, or `None` for
/// degenerate input (zero relative position with zero relative velocity,
/// which would leave `w` undefined).
#[must_use]
pub fn agent_agent_line(
    a: AgentSnapshot,
    o: AgentSnapshot,
    time_horizon: f32,
    dt: f32,
) -> Option<OrcaLine> {
    let rp = o.position - a.position;
    let rv = a.velocity - o.velocity;
    let cr = a.radius + o.radius;
    let dist_sq = rp.length_squared();
    let cr_sq = cr * cr;

    if dist_sq > cr_sq {
        non_colliding_line(rp, rv, cr, cr_sq, dist_sq, time_horizon, a.velocity)
    } else {
        colliding_line(rp, rv, cr, dt, a.velocity)
    }
}

fn non_colliding_line(
    rp: Vec2,
    rv: Vec2,
    cr: f32,
    cr_sq: f32,
    dist_sq: f32,
    time_horizon: f32,
    a_vel: Vec2,
) -> Option<OrcaLine> {
    let inv_h = 1.0 / time_horizon;
    let w = rv - inv_h * rp;
    let w_len_sq = w.length_squared();
    let w_dot_rp = w.dot(rp);

    if w_dot_rp < 0.0 && w_dot_rp * w_dot_rp > cr_sq * w_len_sq {
        // Project on the cutoff circle.
        let w_len = w_len_sq.sqrt();
        if w_len < f32::EPSILON {
            return None;
        }
        let unit_w = w / w_len;
        let direction = rot90_cw(unit_w);
        let u = cr.mul_add(inv_h, -w_len) * unit_w;
        Some(OrcaLine::new(a_vel + 0.5 * u, direction))
    } else {
        // Project on a leg.
        let leg = (dist_sq - cr_sq).max(0.0).sqrt();
        let direction = if det(rp, w) > 0.0 {
            Vec2::new(
                rp.x.mul_add(leg, -(rp.y * cr)),
                rp.x.mul_add(cr, rp.y * leg),
            ) / dist_sq
        } else {
            -Vec2::new(
                rp.x.mul_add(leg, rp.y * cr),
                (-rp.x).mul_add(cr, rp.y * leg),
            ) / dist_sq
        };
        let u = rv.dot(direction) * direction - rv;
        Some(OrcaLine::new(a_vel + 0.5 * u, direction))
    }
}

fn colliding_line(rp: Vec2, rv: Vec2, cr: f32, dt: f32, a_vel: Vec2) -> Option<OrcaLine> {
    if dt <= 0.0 {
        return None;
    }
    let inv_dt = 1.0 / dt;
    let w = rv - inv_dt * rp;
    let w_len = w.length();
    if w_len < f32::EPSILON {
        return None;
    }
    let unit_w = w / w_len;
    let direction = rot90_cw(unit_w);
    let u = cr.mul_add(inv_dt, -w_len) * unit_w;
    Some(OrcaLine::new(a_vel + 0.5 * u, direction))
}
