//! Deterministic, real-time crowd collision avoidance on top of the ORCA
//! (Optimal Reciprocal Collision Avoidance) velocity-obstacle algorithm.
//!
//! [`Simulator`] owns every piece of state — the entity/component store
//! (C7), the obstacle topology model (C3), and the point spatial index
//! (C2) — and advances all of it one fixed tick at a time via
//! [`Simulator::step`]: gather, neighbor query, solve, integrate, scatter,
//! reindex.

pub mod config;
pub mod ecs;
pub mod error;
pub mod math;
pub mod obstacle;
pub mod orca;
pub mod preferred_velocity;
pub mod scheduler;
pub mod simulation;
pub mod spatial;

pub use config::SimulationConfig;
pub use ecs::{AgentParameters, EntityId, World};
pub use error::{SimError, SimResult};
pub use simulation::Simulator;
