//! Error kinds surfaced across the crate's public API.
//!
//! Per spec: only a handful of failure modes are ever visible to a caller.
//! Everything else (degenerate geometry, solver infeasibility, spatial
//! index capacity overrun) is resolved in-algorithm and never surfaces as
//! an `Err` — see `simulation::Simulator::step`.

use thiserror::Error;

use crate::ecs::EntityId;

/// Errors returned by the public entity/component and obstacle APIs.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SimError {
    /// `get`/`get_mut`/`destroy` (etc.) referenced an entity that was never
    /// created, or has already been destroyed.
    #[error("unknown entity {0:?}")]
    UnknownEntity(EntityId),
    /// The entity exists but does not carry the requested component.
    #[error("entity {0:?} has no such component")]
    MissingComponent(EntityId),
}

pub type SimResult<T> = Result<T, SimError>;
