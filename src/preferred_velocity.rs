//! Preferred-velocity producer and pathfinding interface (C9).
//!
//! Waypoint-advance bookkeeping is grounded on the teacher's `NavPath`
//! (`gameplay/units/pathfinding.rs`) generalized from navmesh waypoints to
//! the `MovementState` component's `path`/`path_index` fields. The external
//! pathfinder boundary (no search algorithm is implemented here) is grounded
//! on `kennerCreates-flume-sugar`'s `NavigationGrid`: a flat walkability
//! buffer with world/cell conversions, generalized from its fixed 100x100 XZ
//! layout to an arbitrary width/height/cell_size/origin on the XY plane.

use glam::Vec2;

use crate::ecs::MovementState;

/// Default tolerance for "close enough to a waypoint to advance" (spec.md
/// §4.9).
pub const DEFAULT_WAYPOINT_EPS: f32 = 0.5;

/// Default "close enough to the final target to stop" tolerance. spec.md
/// §4.9 names `arrivalEps` without fixing a value; chosen small relative to
/// `DEFAULT_WAYPOINT_EPS` (Design Notes: documented choice, not left
/// implicit).
pub const DEFAULT_ARRIVAL_EPS: f32 = 0.05;

/// External pathfinding collaborator. This crate does not implement a search
/// algorithm (A*, flow field, navmesh); `NullPathProvider` is the default
/// and always reports no path, falling the caller back to direct-to-target.
pub trait PathProvider {
    /// Compute a waypoint path from `from` to `to`, or `None` if unreachable
    /// or not implemented.
    fn find_path(&self, from: Vec2, to: Vec2) -> Option<Vec<Vec2>>;
}

/// Always reports no path; every agent using this provider falls back to
/// heading straight at its target.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullPathProvider;

impl PathProvider for NullPathProvider {
    fn find_path(&self, _from: Vec2, _to: Vec2) -> Option<Vec<Vec2>> {
        None
    }
}

/// Uniform-cost walkability grid, the minimal interface an external
/// pathfinder needs to place and query itself in world space.
#[derive(Debug, Clone)]
pub struct NavGrid {
    walkable: Vec<bool>,
    width: u32,
    height: u32,
    cell_size: f32,
    origin: Vec2,
}

impl NavGrid {
    /// A fully open grid of `width` x `height` cells, `cell_size` world
    /// units per cell, with `origin` as the world position of cell (0, 0).
    #[must_use]
    pub fn new_open(width: u32, height: u32, cell_size: f32, origin: Vec2) -> Self {
        Self {
            walkable: vec![true; (width * height) as usize],
            width,
            height,
            cell_size,
            origin,
        }
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[must_use]
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    #[must_use]
    pub fn origin(&self) -> Vec2 {
        self.origin
    }

    /// Mark a single cell as blocked. No-op if out of bounds.
    pub fn set_obstacle(&mut self, cx: u32, cy: u32) {
        if cx < self.width && cy < self.height {
            let idx = self.index(cx, cy);
            self.walkable[idx] = false;
        }
    }

    /// World-space position to the grid cell containing it, or `None` if
    /// outside the grid.
    #[must_use]
    pub fn world_to_grid(&self, pos: Vec2) -> Option<(u32, u32)> {
        let rel = (pos - self.origin) / self.cell_size;
        if rel.x < 0.0 || rel.y < 0.0 {
            return None;
        }
        let cx = rel.x as u32;
        let cy = rel.y as u32;
        if cx >= self.width || cy >= self.height {
            return None;
        }
        Some((cx, cy))
    }

    /// World-space center of a grid cell.
    #[must_use]
    pub fn grid_to_world(&self, cx: u32, cy: u32) -> Vec2 {
        self.origin
            + Vec2::new(
                (cx as f32 + 0.5) * self.cell_size,
                (cy as f32 + 0.5) * self.cell_size,
            )
    }

    #[must_use]
    pub fn is_valid(&self, cx: u32, cy: u32) -> bool {
        cx < self.width && cy < self.height
    }

    #[must_use]
    pub fn is_obstacle(&self, cx: u32, cy: u32) -> bool {
        if !self.is_valid(cx, cy) {
            return true;
        }
        !self.walkable[self.index(cx, cy)]
    }

    fn index(&self, cx: u32, cy: u32) -> usize {
        (cy * self.width + cx) as usize
    }
}

/// Recompute `state.preferred_velocity` for one tick (spec.md §4.9).
///
/// With no path (or an exhausted one), heads straight for the target,
/// zeroing out once within `arrival_eps` of it. With a path, advances past
/// waypoints within `waypoint_eps` and steers at the current one; running
/// off the end of the path falls through to direct-to-target.
pub fn update_preferred_velocity(
    state: &mut MovementState,
    position: Vec2,
    max_speed: f32,
    waypoint_eps: f32,
    arrival_eps: f32,
) {
    if state.has_path {
        while let Some(waypoint) = state.current_waypoint() {
            if position.distance_squared(waypoint) < waypoint_eps * waypoint_eps {
                if !state.advance() {
                    break;
                }
            } else {
                state.preferred_velocity = steer_toward(position, waypoint, max_speed, 0.0);
                return;
            }
        }
        state.has_path = false;
    }

    state.preferred_velocity = steer_toward(position, state.target, max_speed, arrival_eps);
}

fn steer_toward(position: Vec2, target: Vec2, max_speed: f32, arrival_eps: f32) -> Vec2 {
    let to_target = target - position;
    if to_target.length_squared() > arrival_eps * arrival_eps {
        to_target.normalize_or_zero() * max_speed
    } else {
        Vec2::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn state_with_target(target: Vec2) -> MovementState {
        MovementState {
            target,
            preferred_velocity: Vec2::ZERO,
            path: Vec::new(),
            path_index: 0,
            has_path: false,
        }
    }

    #[test]
    fn no_path_heads_straight_at_target() {
        let mut state = state_with_target(Vec2::new(10.0, 0.0));
        update_preferred_velocity(&mut state, Vec2::ZERO, 2.0, 0.5, 0.1);
        assert!((state.preferred_velocity - Vec2::new(2.0, 0.0)).length() < 1e-4);
    }

    #[test]
    fn within_arrival_eps_yields_zero_velocity() {
        let mut state = state_with_target(Vec2::new(0.05, 0.0));
        update_preferred_velocity(&mut state, Vec2::ZERO, 2.0, 0.5, 0.1);
        assert_eq!(state.preferred_velocity, Vec2::ZERO);
    }

    #[test]
    fn path_advances_past_reached_waypoints() {
        let mut state = state_with_target(Vec2::new(20.0, 0.0));
        state.set_path(vec![Vec2::new(0.1, 0.0), Vec2::new(10.0, 0.0)]);
        update_preferred_velocity(&mut state, Vec2::ZERO, 2.0, 0.5, 0.1);
        assert_eq!(state.path_index, 1);
        assert!((state.preferred_velocity - Vec2::new(2.0, 0.0)).length() < 1e-4);
    }

    #[test]
    fn exhausted_path_falls_back_to_direct_to_target() {
        let mut state = state_with_target(Vec2::new(20.0, 0.0));
        state.set_path(vec![Vec2::new(0.1, 0.0)]);
        update_preferred_velocity(&mut state, Vec2::ZERO, 2.0, 0.5, 0.1);
        assert!(!state.has_path);
        assert!((state.preferred_velocity - Vec2::new(2.0, 0.0)).length() < 1e-4);
    }

    #[test]
    fn nav_grid_round_trips_world_and_cell_coordinates() {
        let grid = NavGrid::new_open(10, 10, 1.0, Vec2::ZERO);
        let (cx, cy) = grid.world_to_grid(Vec2::new(3.5, 4.5)).unwrap();
        assert_eq!((cx, cy), (3, 4));
        assert!(!grid.is_obstacle(cx, cy));
    }

    #[test]
    fn nav_grid_reports_out_of_bounds_as_obstacle() {
        let grid = NavGrid::new_open(4, 4, 1.0, Vec2::ZERO);
        assert!(grid.is_obstacle(10, 10));
        assert!(grid.world_to_grid(Vec2::new(-1.0, 0.0)).is_none());
    }

    #[test]
    fn null_path_provider_never_produces_a_path() {
        let provider = NullPathProvider;
        assert!(provider
            .find_path(Vec2::ZERO, Vec2::new(5.0, 5.0))
            .is_none());
    }
}
