//! Entity/component store (C7).
//!
//! A hand-rolled sparse-set ECS satisfying spec.md §4.7's exact contract:
//! monotonic never-recycled ids, O(1) swap-remove, and a dense-array +
//! hashmap invariant per component type. This replaces the teacher's use
//! of Bevy's `World`/`Entity`/`Query` (which recycles ids via generations
//! and hides its storage behind archetypes) — Design Notes item 1
//! ("singleton managers with mutable global state" / reflection-based
//! discovery) calls for explicit, safe ownership instead.

mod components;
mod entity;
mod store;

pub use components::{
    AgentParameters, MovementState, NewVelocity, Position, PreferredVelocity, Radius, Velocity,
};
pub use entity::EntityId;
use entity::EntityAllocator;
pub use store::ComponentStore;

use crate::error::{SimError, SimResult};

/// Owns every entity and its components. Created once by the simulator and
/// handed to systems by reference (Design Notes: "the simulator owns the
/// entity store... systems receive a handle at construction").
#[derive(Debug, Default)]
pub struct World {
    allocator: EntityAllocator,
    live: ComponentStore<()>,
    positions: ComponentStore<Position>,
    velocities: ComponentStore<Velocity>,
    preferred_velocities: ComponentStore<PreferredVelocity>,
    new_velocities: ComponentStore<NewVelocity>,
    radii: ComponentStore<Radius>,
    agent_params: ComponentStore<AgentParameters>,
    movement_states: ComponentStore<MovementState>,
}

impl World {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a bare entity with no components attached.
    pub fn create(&mut self) -> EntityId {
        let id = self.allocator.create();
        self.live.insert(id, ());
        id
    }

    /// Reserve a caller-supplied id. A no-op if `id` is already live.
    pub fn create_with_id(&mut self, id: EntityId) -> EntityId {
        let id = self.allocator.create_with_id(id);
        if !self.live.has(id) {
            self.live.insert(id, ());
        }
        id
    }

    /// Remove `id` from every component array.
    pub fn destroy(&mut self, id: EntityId) {
        self.live.remove(id);
        self.positions.remove(id);
        self.velocities.remove(id);
        self.preferred_velocities.remove(id);
        self.new_velocities.remove(id);
        self.radii.remove(id);
        self.agent_params.remove(id);
        self.movement_states.remove(id);
    }

    #[must_use]
    pub fn is_live(&self, id: EntityId) -> bool {
        self.live.has(id)
    }

    /// Convenience spawner used by the external spawner interface
    /// (spec.md §6): creates an entity and attaches the standard agent
    /// component set in one call.
    pub fn spawn_agent(
        &mut self,
        position: Position,
        radius: Radius,
        params: AgentParameters,
    ) -> EntityId {
        let id = self.create();
        self.positions.insert(id, position);
        self.velocities.insert(id, Velocity::default());
        self.preferred_velocities
            .insert(id, PreferredVelocity::default());
        self.new_velocities.insert(id, NewVelocity::default());
        self.radii.insert(id, radius);
        self.agent_params.insert(id, params);
        self.movement_states.insert(id, MovementState::default());
        id
    }
}

/// Generates the repetitive per-component accessor set (`add`, `get`,
/// `get_mut`, `has`, `iter`) for one field of `World`, matching spec.md
/// §4.7's `add<T>`/`get<T>`/`getReadOnly<T>`/`has<T>` contract without
/// hand-writing it eight times over.
macro_rules! component_accessors {
    ($field:ident, $ty:ty, $add:ident, $get:ident, $get_mut:ident, $has:ident, $remove:ident, $iter:ident, $iter_mut:ident) => {
        impl World {
            pub fn $add(&mut self, id: EntityId, value: $ty) {
                self.$field.insert(id, value);
            }

            #[must_use]
            pub fn $get(&self, id: EntityId) -> SimResult<&$ty> {
                if !self.is_live(id) {
                    return Err(SimError::UnknownEntity(id));
                }
                self.$field.get(id).ok_or(SimError::MissingComponent(id))
            }

            pub fn $get_mut(&mut self, id: EntityId) -> SimResult<&mut $ty> {
                if !self.live.has(id) {
                    return Err(SimError::UnknownEntity(id));
                }
                self.$field
                    .get_mut(id)
                    .ok_or(SimError::MissingComponent(id))
            }

            #[must_use]
            pub fn $has(&self, id: EntityId) -> bool {
                self.$field.has(id)
            }

            pub fn $remove(&mut self, id: EntityId) -> Option<$ty> {
                self.$field.remove(id)
            }

            pub fn $iter(&self) -> impl Iterator<Item = (EntityId, &$ty)> {
                self.$field.iter()
            }

            pub fn $iter_mut(&mut self) -> impl Iterator<Item = (EntityId, &mut $ty)> {
                self.$field.iter_mut()
            }
        }
    };
}

component_accessors!(
    positions,
    Position,
    add_position,
    position,
    position_mut,
    has_position,
    remove_position,
    iter_positions,
    iter_positions_mut
);
component_accessors!(
    velocities,
    Velocity,
    add_velocity,
    velocity,
    velocity_mut,
    has_velocity,
    remove_velocity,
    iter_velocities,
    iter_velocities_mut
);
component_accessors!(
    preferred_velocities,
    PreferredVelocity,
    add_preferred_velocity,
    preferred_velocity,
    preferred_velocity_mut,
    has_preferred_velocity,
    remove_preferred_velocity,
    iter_preferred_velocities,
    iter_preferred_velocities_mut
);
component_accessors!(
    new_velocities,
    NewVelocity,
    add_new_velocity,
    new_velocity,
    new_velocity_mut,
    has_new_velocity,
    remove_new_velocity,
    iter_new_velocities,
    iter_new_velocities_mut
);
component_accessors!(
    radii,
    Radius,
    add_radius,
    radius,
    radius_mut,
    has_radius,
    remove_radius,
    iter_radii,
    iter_radii_mut
);
component_accessors!(
    agent_params,
    AgentParameters,
    add_agent_parameters,
    agent_parameters,
    agent_parameters_mut,
    has_agent_parameters,
    remove_agent_parameters,
    iter_agent_parameters,
    iter_agent_parameters_mut
);
component_accessors!(
    movement_states,
    MovementState,
    add_movement_state,
    movement_state,
    movement_state_mut,
    has_movement_state,
    remove_movement_state,
    iter_movement_states,
    iter_movement_states_mut
);

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;
    use pretty_assertions::assert_eq;

    #[test]
    fn spawn_agent_attaches_full_component_set() {
        let mut world = World::new();
        let id = world.spawn_agent(
            Position(Vec2::new(1.0, 2.0)),
            Radius(0.5),
            AgentParameters::default(),
        );
        assert!(world.is_live(id));
        assert_eq!(world.position(id).unwrap().0, Vec2::new(1.0, 2.0));
        assert!(world.has_velocity(id));
        assert!(world.has_movement_state(id));
    }

    #[test]
    fn destroy_removes_every_component() {
        let mut world = World::new();
        let id = world.spawn_agent(Position::default(), Radius(1.0), AgentParameters::default());
        world.destroy(id);
        assert!(!world.is_live(id));
        assert!(world.position(id).is_err());
        assert!(!world.has_velocity(id));
    }

    #[test]
    fn unknown_entity_surfaces_as_error() {
        let world = World::new();
        let ghost = EntityId::from_raw(9999);
        match world.position(ghost) {
            Err(SimError::UnknownEntity(_)) => {}
            other => panic!("expected UnknownEntity, got {other:?}"),
        }
    }

    #[test]
    fn component_present_but_missing_specific_type() {
        let mut world = World::new();
        let id = world.create();
        // Entity is live but has no Position attached.
        match world.position(id) {
            Err(SimError::MissingComponent(_)) => {}
            other => panic!("expected MissingComponent, got {other:?}"),
        }
    }

    #[test]
    fn create_with_id_is_idempotent_and_live() {
        let mut world = World::new();
        let id = EntityId::from_raw(42);
        let first = world.create_with_id(id);
        let second = world.create_with_id(id);
        assert_eq!(first, second);
        assert!(world.is_live(id));
    }

    #[test]
    fn lifecycle_round_trip_matches_live_count() {
        // spec.md §8 S6: create 100, destroy odd-indexed, check dense invariants.
        let mut world = World::new();
        let ids: Vec<_> = (0..100)
            .map(|i| {
                world.spawn_agent(
                    Position(Vec2::new(i as f32, 0.0)),
                    Radius(0.5),
                    AgentParameters::default(),
                )
            })
            .collect();

        for (i, &id) in ids.iter().enumerate() {
            if i % 2 == 1 {
                world.destroy(id);
            }
        }

        let live_count = ids.iter().filter(|&&id| world.is_live(id)).count();
        assert_eq!(live_count, 50);
        assert_eq!(world.iter_positions().count(), 50);
        for (id, _) in world.iter_positions() {
            assert!(world.is_live(id));
        }
    }
}
