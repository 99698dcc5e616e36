//! The fixed component set listed in spec.md §6.
//!
//! Mirrors the teacher's per-unit component catalogue
//! (`gameplay/units/mod.rs`: `Movement`, `Target`, `CurrentTarget`, ...)
//! trimmed to exactly what the ORCA pipeline needs, with the game-specific
//! combat/economy/health components dropped (out of scope).

use glam::Vec2;

/// World-space position.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position(pub Vec2);

/// Last-integrated velocity (the solver's output from the previous tick).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Velocity(pub Vec2);

/// Tick-local desired velocity, written by the preferred-velocity producer
/// (C9) and consumed by the solver (C4/C5) each tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PreferredVelocity(pub Vec2);

/// Tick-local solver output, written during `Simulator::step` and then
/// copied into `Velocity` at integration time. Kept as its own component
/// (rather than overwriting `Velocity` mid-solve) so that every agent's
/// ORCA line construction in a given tick reads the same pre-tick
/// `Velocity` snapshot (spec.md §4.6 ordering guarantee).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NewVelocity(pub Vec2);

/// Collision radius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Radius(pub f32);

/// Per-agent ORCA tuning, matching spec.md §3's `AgentParameters`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgentParameters {
    pub max_speed: f32,
    pub neighbor_dist: f32,
    pub max_neighbors: u32,
    pub time_horizon: f32,
    pub time_horizon_obst: f32,
}

impl Default for AgentParameters {
    fn default() -> Self {
        Self {
            max_speed: 2.0,
            neighbor_dist: 10.0,
            max_neighbors: 10,
            time_horizon: 2.0,
            time_horizon_obst: 2.0,
        }
    }
}

/// Waypoint-following state consumed by `preferred_velocity` (C9).
#[derive(Debug, Clone, Default)]
pub struct MovementState {
    pub target: Vec2,
    pub preferred_velocity: Vec2,
    pub path: Vec<Vec2>,
    pub path_index: usize,
    pub has_path: bool,
}

impl MovementState {
    #[must_use]
    pub fn current_waypoint(&self) -> Option<Vec2> {
        if self.has_path {
            self.path.get(self.path_index).copied()
        } else {
            None
        }
    }

    /// Replace the path, resetting progress. Mirrors the teacher's
    /// `NavPath::set` (`gameplay/units/pathfinding.rs`).
    pub fn set_path(&mut self, path: Vec<Vec2>) {
        self.has_path = !path.is_empty();
        self.path = path;
        self.path_index = 0;
    }

    /// Advance to the next waypoint. Returns `true` if one remains.
    pub fn advance(&mut self) -> bool {
        self.path_index += 1;
        self.path_index < self.path.len()
    }
}
