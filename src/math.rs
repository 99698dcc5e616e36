//! Pure vector math kernel shared by every geometric subsystem.
//!
//! Single-precision throughout. Based on the determinant/`left_of`
//! primitives used by the RVO2-style avoidance math in
//! `orca::agent`/`orca::obstacle`, pulled out so the spatial index and
//! obstacle model can share the same epsilon and the same definitions.

use glam::Vec2;

/// Epsilon used for parallelism / "on the line" checks throughout the crate.
pub const EPS: f32 = 1e-5;

/// 2D cross product / determinant of the 2x2 matrix `[a b]`.
#[inline]
#[must_use]
pub fn det(a: Vec2, b: Vec2) -> f32 {
    a.x.mul_add(b.y, -(a.y * b.x))
}

/// Signed area test: positive when `c` is left of the directed line `a -> b`.
#[inline]
#[must_use]
pub fn left_of(a: Vec2, b: Vec2, c: Vec2) -> f32 {
    det(a - c, b - a)
}

/// Squared distance from `p` to the segment `v1 -> v2`.
#[inline]
#[must_use]
pub fn dist_sq_point_segment(v1: Vec2, v2: Vec2, p: Vec2) -> f32 {
    let edge = v2 - v1;
    let len_sq = edge.length_squared();
    if len_sq <= EPS {
        return (p - v1).length_squared();
    }
    let r = (p - v1).dot(edge) / len_sq;
    let r = r.clamp(0.0, 1.0);
    (p - (v1 + r * edge)).length_squared()
}

/// Squared distance from `p` to the infinite line through `v1` and `v2`.
#[inline]
#[must_use]
pub fn dist_sq_point_line(v1: Vec2, v2: Vec2, p: Vec2) -> f32 {
    let edge = v2 - v1;
    let len_sq = edge.length_squared();
    if len_sq <= EPS {
        return (p - v1).length_squared();
    }
    let d = det(edge, p - v1);
    (d * d) / len_sq
}

/// Rotate `v` 90 degrees clockwise (screen/standard math convention used by
/// the ORCA line constructors: `(x, y) -> (y, -x)`).
#[inline]
#[must_use]
pub fn rot90_cw(v: Vec2) -> Vec2 {
    Vec2::new(v.y, -v.x)
}

/// Rotate `v` 90 degrees counter-clockwise: `(x, y) -> (-y, x)`.
#[inline]
#[must_use]
pub fn rot90_ccw(v: Vec2) -> Vec2 {
    Vec2::new(-v.y, v.x)
}
