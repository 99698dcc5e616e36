//! Fixed simulation configuration.
//!
//! Design Notes: "Parametric configuration via dynamic options dictionaries"
//! is replaced by a fixed struct enumerating every recognized option, rather
//! than a stringly-typed bag the teacher's `RunConfig`-style resources avoid
//! in favor of plain fields.

use glam::Vec2;

use crate::ecs::AgentParameters;

/// Which point spatial index variant the simulator builds each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointIndexKind {
    #[default]
    Grid,
    KdTree,
    Bvh,
    QuadTree,
}

/// Which obstacle index variant backs sorted proximity queries.
///
/// Only one is specified by spec.md §4.3 (the segment KD-tree); this exists
/// so `SimulationConfig` mirrors the Design Notes' full field list even
/// though `obstacle::segment_tree` is the sole implementation today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ObstacleIndexKind {
    #[default]
    SegmentKdTree,
}

/// World-aligned axis bounds, used to size the quad-tree and grid variants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldBounds {
    pub min: Vec2,
    pub max: Vec2,
}

impl Default for WorldBounds {
    fn default() -> Self {
        Self {
            min: Vec2::splat(-1000.0),
            max: Vec2::splat(1000.0),
        }
    }
}

/// The fixed configuration set named in Design Notes: `worldBounds`,
/// `maxAgents`, `linkEps`, `penetrationPadding`, `pointIndexKind`,
/// `obstacleIndexKind`, `defaultAgentParams`.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    pub world_bounds: WorldBounds,
    pub max_agents: usize,
    /// `ObstacleLinkEpsilon` in spec.md §4.3, default `0.05`.
    pub link_eps: f32,
    /// Deep-penetration separation pass (Design Notes Open Question 2).
    /// `None` disables the pass, matching the spec's "not mandated".
    pub penetration_padding: Option<f32>,
    pub point_index_kind: PointIndexKind,
    pub obstacle_index_kind: ObstacleIndexKind,
    pub default_agent_params: AgentParameters,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            world_bounds: WorldBounds::default(),
            max_agents: 4096,
            link_eps: 0.05,
            penetration_padding: None,
            point_index_kind: PointIndexKind::default(),
            obstacle_index_kind: ObstacleIndexKind::default(),
            default_agent_params: AgentParameters::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_penetration_pass_disabled() {
        let config = SimulationConfig::default();
        assert_eq!(config.penetration_padding, None);
    }

    #[test]
    fn default_link_eps_matches_spec() {
        let config = SimulationConfig::default();
        assert!((config.link_eps - 0.05).abs() < f32::EPSILON);
    }
}
