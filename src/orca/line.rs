//! ORCA half-plane constraint representation.

use glam::Vec2;

/// A half-plane constraint in velocity space: `point` lies on its boundary,
/// `direction` is a unit vector; the feasible region is "left of" the
/// directed line through `point` along `direction` (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrcaLine {
    pub point: Vec2,
    pub direction: Vec2,
}

impl OrcaLine {
    #[must_use]
    pub fn new(point: Vec2, direction: Vec2) -> Self {
        Self { point, direction }
    }

    /// `det(direction, point - v) `: positive when `v` violates the
    /// constraint (is strictly to the right of the line).
    #[must_use]
    pub fn signed_violation(&self, v: Vec2) -> f32 {
        crate::math::det(self.direction, self.point - v)
    }
}
