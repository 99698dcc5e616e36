//! Per-tick simulator (C6): owns the entity store, the obstacle model, and
//! the point spatial index, and drives the fixed six-step tick of spec.md
//! §4.6 — gather, neighbor query, solve, integrate, scatter, reindex.
//!
//! Grounded on the teacher's `SpatialHash`-rebuild-every-frame pattern
//! (`gameplay/units/avoidance/spatial_hash.rs`) for the scratch-buffer reuse
//! policy (clear and refill in place; `Vec` growth already doubles capacity,
//! so nothing shrinks across ticks), and on Design Notes item 1 ("the
//! simulator owns the entity store, the obstacle model, and the point
//! spatial index; systems receive a handle at construction") for the
//! top-level ownership shape.

use glam::Vec2;

use crate::config::{PointIndexKind, SimulationConfig};
use crate::ecs::{AgentParameters, EntityId, Position, Radius, World};
use crate::math::EPS;
use crate::obstacle::ObstacleSet;
use crate::orca::{agent_agent_line, build_obstacle_lines, linear_program_2, linear_program_3, AgentSnapshot, OrcaLine};
use crate::preferred_velocity::{
    update_preferred_velocity, NullPathProvider, PathProvider, DEFAULT_ARRIVAL_EPS,
    DEFAULT_WAYPOINT_EPS,
};
use crate::spatial::{bvh::Bvh, grid::Grid, kdtree::KdTree, quadtree::QuadTree, PointIndex};

fn make_point_index(config: &SimulationConfig) -> Box<dyn PointIndex> {
    match config.point_index_kind {
        PointIndexKind::Grid => {
            let cell = config.default_agent_params.neighbor_dist.max(1.0);
            Box::new(Grid::new(cell))
        }
        PointIndexKind::KdTree => Box::new(KdTree::new()),
        PointIndexKind::Bvh => Box::new(Bvh::new()),
        PointIndexKind::QuadTree => {
            Box::new(QuadTree::new(config.world_bounds.min, config.world_bounds.max))
        }
    }
}

/// Owns every piece of simulation state and advances it tick by tick.
pub struct Simulator {
    world: World,
    obstacles: ObstacleSet,
    config: SimulationConfig,
    point_index: Box<dyn PointIndex>,
    path_provider: Box<dyn PathProvider>,

    // Scratch buffers, reused and grown-by-doubling across ticks (spec.md
    // §5): never reallocated down to a smaller capacity.
    ids: Vec<EntityId>,
    positions: Vec<Vec2>,
    velocities: Vec<Vec2>,
    radii: Vec<f32>,
    params: Vec<AgentParameters>,
    pref_velocities: Vec<Vec2>,
    new_velocities: Vec<Vec2>,
    neighbor_scratch: Vec<usize>,
    line_scratch: Vec<OrcaLine>,
}

impl Simulator {
    #[must_use]
    pub fn new(config: SimulationConfig) -> Self {
        let point_index = make_point_index(&config);
        Self {
            world: World::new(),
            obstacles: ObstacleSet::new(),
            config,
            point_index,
            path_provider: Box::new(NullPathProvider),
            ids: Vec::new(),
            positions: Vec::new(),
            velocities: Vec::new(),
            radii: Vec::new(),
            params: Vec::new(),
            pref_velocities: Vec::new(),
            new_velocities: Vec::new(),
            neighbor_scratch: Vec::new(),
            line_scratch: Vec::new(),
        }
    }

    /// Replace the external pathfinder. Defaults to [`NullPathProvider`].
    #[must_use]
    pub fn with_path_provider(mut self, provider: Box<dyn PathProvider>) -> Self {
        self.path_provider = provider;
        self
    }

    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    #[must_use]
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Spawner interface (spec.md §6): attaches the fixed agent component
    /// set in one call.
    pub fn spawn_agent(&mut self, position: Vec2, radius: f32, params: AgentParameters) -> EntityId {
        self.world
            .spawn_agent(Position(position), Radius(radius), params)
    }

    /// Set (or change) where an agent is steering toward. A path computed
    /// from the wired [`PathProvider`] is attached if one is found;
    /// otherwise the agent heads straight for `target`.
    pub fn set_target(&mut self, id: EntityId, target: Vec2) {
        let from = self.world.position(id).map(|p| p.0).unwrap_or(target);
        let path = self.path_provider.find_path(from, target);
        if let Ok(state) = self.world.movement_state_mut(id) {
            state.target = target;
            match path {
                Some(path) => state.set_path(path),
                None => state.set_path(Vec::new()),
            }
        }
    }

    /// `addObstacle(p1, p2) -> edgeId` (spec.md §6).
    pub fn add_obstacle(&mut self, p1: Vec2, p2: Vec2) -> usize {
        self.obstacles.add_obstacle(p1, p2)
    }

    /// `clearObstacles()` (spec.md §6).
    pub fn clear_obstacles(&mut self) {
        self.obstacles.clear_obstacles();
    }

    /// Force an immediate obstacle rebuild. Normally unnecessary: `step`
    /// rebuilds lazily when the obstacle set is dirty.
    pub fn rebuild_obstacles(&mut self) {
        self.obstacles.rebuild(self.config.link_eps);
    }

    /// Run the full per-tick pipeline (spec.md §4.6) once, advancing the
    /// simulation by `dt` seconds.
    pub fn step(&mut self, dt: f32) {
        if self.obstacles.is_dirty() {
            self.obstacles.rebuild(self.config.link_eps);
        }

        self.update_preferred_velocities();
        self.gather();
        self.point_index.build(&self.positions);
        self.solve(dt);
        self.integrate(dt);
        self.scatter();
        if let Some(padding) = self.config.penetration_padding {
            separate_overlapping_pairs(&mut self.positions, &self.radii, padding);
            self.scatter();
        }
        self.point_index.build(&self.positions);
    }

    fn update_preferred_velocities(&mut self) {
        let ids: Vec<EntityId> = self.world.iter_positions().map(|(id, _)| id).collect();
        for id in ids {
            let Ok(position) = self.world.position(id).map(|p| p.0) else {
                continue;
            };
            let Ok(max_speed) = self.world.agent_parameters(id).map(|p| p.max_speed) else {
                continue;
            };
            let mut new_pref = None;
            if let Ok(state) = self.world.movement_state_mut(id) {
                update_preferred_velocity(
                    state,
                    position,
                    max_speed,
                    DEFAULT_WAYPOINT_EPS,
                    DEFAULT_ARRIVAL_EPS,
                );
                new_pref = Some(state.preferred_velocity);
            }
            if let Some(pref) = new_pref {
                if let Ok(slot) = self.world.preferred_velocity_mut(id) {
                    slot.0 = pref;
                }
            }
        }
    }

    fn gather(&mut self) {
        self.ids.clear();
        self.positions.clear();
        self.velocities.clear();
        self.radii.clear();
        self.params.clear();
        self.pref_velocities.clear();

        for (id, position) in self.world.iter_positions() {
            let Ok(velocity) = self.world.velocity(id) else {
                continue;
            };
            let Ok(radius) = self.world.radius(id) else {
                continue;
            };
            let Ok(agent_params) = self.world.agent_parameters(id) else {
                continue;
            };
            let Ok(pref_vel) = self.world.preferred_velocity(id) else {
                continue;
            };

            self.ids.push(id);
            self.positions.push(position.0);
            self.velocities.push(velocity.0);
            self.radii.push(radius.0);
            self.params.push(*agent_params);
            self.pref_velocities.push(pref_vel.0);
        }

        self.new_velocities.clear();
        self.new_velocities.resize(self.ids.len(), Vec2::ZERO);
    }

    fn solve(&mut self, dt: f32) {
        let count = self.ids.len();
        for i in 0..count {
            let position = self.positions[i];
            let params = self.params[i];
            let radius = self.radii[i];

            let obstacle_range = params.time_horizon_obst.mul_add(params.max_speed, radius);
            let obstacle_edges = self
                .obstacles
                .query_sorted(position, obstacle_range * obstacle_range);

            self.line_scratch.clear();
            self.line_scratch.extend(build_obstacle_lines(
                position,
                radius,
                self.velocities[i],
                params.time_horizon_obst,
                self.obstacles.query_edges(),
                &obstacle_edges,
            ));
            let obstacle_count = self.line_scratch.len();

            self.neighbor_scratch.clear();
            self.neighbor_scratch.extend(
                self.point_index
                    .query_k_nearest_sorted(position, params.max_neighbors as usize + 1, params.neighbor_dist)
                    .into_iter()
                    .filter(|&j| j != i)
                    .take(params.max_neighbors as usize),
            );

            let snapshot_i = AgentSnapshot {
                position,
                velocity: self.velocities[i],
                radius,
            };
            for &j in &self.neighbor_scratch {
                let snapshot_j = AgentSnapshot {
                    position: self.positions[j],
                    velocity: self.velocities[j],
                    radius: self.radii[j],
                };
                if let Some(line) = agent_agent_line(snapshot_i, snapshot_j, params.time_horizon, dt) {
                    self.line_scratch.push(line);
                }
            }

            let (mut result, fail) = linear_program_2(
                &self.line_scratch,
                self.pref_velocities[i],
                params.max_speed,
                false,
            );
            if fail < self.line_scratch.len() {
                result = linear_program_3(&self.line_scratch, obstacle_count, fail, result, params.max_speed);
            }
            self.new_velocities[i] = result;
        }
    }

    fn integrate(&mut self, dt: f32) {
        for i in 0..self.positions.len() {
            self.velocities[i] = self.new_velocities[i];
            self.positions[i] += self.velocities[i] * dt;
        }
    }

    fn scatter(&mut self) {
        for i in 0..self.ids.len() {
            let id = self.ids[i];
            if let Ok(slot) = self.world.velocity_mut(id) {
                slot.0 = self.velocities[i];
            }
            if let Ok(slot) = self.world.new_velocity_mut(id) {
                slot.0 = self.new_velocities[i];
            }
            if let Ok(slot) = self.world.position_mut(id) {
                slot.0 = self.positions[i];
            }
        }
    }
}

/// Optional deep-penetration separation pass (Design Notes Open Question
/// 2). Pushes every overlapping pair apart by half the overlap, so that two
/// agents converge on just touching rather than fully resolving in one
/// tick (avoids introducing large instantaneous position jumps). Runs after
/// integration, before the positions are scattered back to the component
/// store, over the same dense local-index buffers the solver used.
fn separate_overlapping_pairs(positions: &mut [Vec2], radii: &[f32], padding: f32) {
    let count = positions.len();
    for i in 0..count {
        for j in (i + 1)..count {
            let delta = positions[j] - positions[i];
            let dist_sq = delta.length_squared();
            let min_dist = radii[i] + radii[j] + padding;
            if dist_sq >= min_dist * min_dist || dist_sq <= EPS {
                continue;
            }
            let dist = dist_sq.sqrt();
            let overlap = min_dist - dist;
            let push = delta / dist * (overlap * 0.5);
            positions[i] -= push;
            positions[j] += push;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn params(max_speed: f32) -> AgentParameters {
        AgentParameters {
            max_speed,
            neighbor_dist: 10.0,
            max_neighbors: 10,
            time_horizon: 2.0,
            time_horizon_obst: 2.0,
        }
    }

    #[test]
    fn single_agent_no_obstacles_reaches_preferred_velocity() {
        // spec.md §8 invariant: single agent, no obstacles -> newVelocity ==
        // clamp(prefVelocity, maxSpeed) exactly (no neighbors to deflect it).
        let mut sim = Simulator::new(SimulationConfig::default());
        let id = sim.spawn_agent(Vec2::ZERO, 0.5, params(2.0));
        sim.set_target(id, Vec2::new(100.0, 0.0));
        sim.step(0.1);

        let velocity = sim.world().velocity(id).unwrap().0;
        assert!((velocity - Vec2::new(2.0, 0.0)).length() < 1e-3);
    }

    #[test]
    fn head_on_agents_deflect_laterally() {
        // spec.md §8 S1.
        let mut sim = Simulator::new(SimulationConfig::default());
        let a = sim.spawn_agent(Vec2::new(-5.0, 0.0), 0.5, params(1.0));
        let b = sim.spawn_agent(Vec2::new(5.0, 0.0), 0.5, params(1.0));
        sim.set_target(a, Vec2::new(100.0, 0.0));
        sim.set_target(b, Vec2::new(-100.0, 0.0));

        sim.step(0.25);

        let va = sim.world().velocity(a).unwrap().0;
        let vb = sim.world().velocity(b).unwrap().0;
        assert!(va.x > 0.0 && va.x < 1.0);
        assert!(va.y.abs() > 1e-4);
        assert!((va.y + vb.y).abs() < 1e-3);
    }

    #[test]
    fn agent_never_penetrates_a_wall() {
        // spec.md §8 S2 (abbreviated).
        let mut sim = Simulator::new(SimulationConfig::default());
        sim.add_obstacle(Vec2::new(-10.0, 0.0), Vec2::new(10.0, 0.0));
        sim.rebuild_obstacles();

        let id = sim.spawn_agent(Vec2::new(0.0, 2.0), 0.5, params(2.0));
        sim.set_target(id, Vec2::new(0.0, -50.0));

        for _ in 0..40 {
            sim.step(0.1);
            let y = sim.world().position(id).unwrap().0.y;
            assert!(y >= 0.5 - 1e-2, "agent penetrated the wall: y={y}");
        }
    }

    #[test]
    fn destroyed_agent_drops_out_of_the_next_tick() {
        let mut sim = Simulator::new(SimulationConfig::default());
        let id = sim.spawn_agent(Vec2::ZERO, 0.5, params(1.0));
        sim.world.destroy(id);
        sim.step(0.1);
        assert_eq!(sim.positions.len(), 0);
    }
}
