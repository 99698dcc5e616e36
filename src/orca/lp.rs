//! Linear programmer (C5): 2D LP under a speed disk, with a 3D fallback
//! that minimizes penetration depth when the hard (obstacle) + soft (agent)
//! constraint set is infeasible.
//!
//! Grounded closely on the teacher's `linear_program_1/2/3`
//! (`gameplay/units/avoidance/orca.rs`), the RVO2 reference algorithm,
//! generalized per spec.md §4.5 so obstacle lines are threaded through as a
//! `num_obstacle_lines` hard-constraint count rather than being absent.

use glam::Vec2;

use crate::math::det;
use crate::orca::OrcaLine;

/// 1D optimization along `lines[line_idx]`, intersected with the speed disk
/// and every prior constraint `lines[..line_idx]`. Returns `None` if
/// infeasible.
fn linear_program_1(
    lines: &[OrcaLine],
    line_idx: usize,
    opt_velocity: Vec2,
    radius: f32,
    direction_opt: bool,
) -> Option<Vec2> {
    let line = lines[line_idx];
    let dot_product = line.point.dot(line.direction);
    let discriminant =
        dot_product.mul_add(dot_product, radius.mul_add(radius, -line.point.length_squared()));

    if discriminant < 0.0 {
        return None;
    }

    let sqrt_discriminant = discriminant.sqrt();
    let mut t_left = -dot_product - sqrt_discriminant;
    let mut t_right = -dot_product + sqrt_discriminant;

    for prior in &lines[..line_idx] {
        let denominator = det(line.direction, prior.direction);
        let numerator = det(prior.direction, line.point - prior.point);

        if denominator.abs() <= f32::EPSILON {
            if numerator < 0.0 {
                return None;
            }
            continue;
        }

        let t = numerator / denominator;
        if denominator >= 0.0 {
            t_right = t_right.min(t);
        } else {
            t_left = t_left.max(t);
        }

        if t_left > t_right {
            return None;
        }
    }

    let t = if direction_opt {
        let t_opt = line.direction.dot(opt_velocity);
        t_opt.clamp(t_left, t_right)
    } else {
        let t_opt = line.direction.dot(opt_velocity - line.point);
        t_opt.clamp(t_left, t_right)
    };

    Some(line.point + t * line.direction)
}

/// 2D incremental LP (spec.md §4.5 `linearProgram2`). Returns
/// `(result, fail_index)`; `fail_index == lines.len()` means full success.
#[must_use]
pub fn linear_program_2(
    lines: &[OrcaLine],
    opt_velocity: Vec2,
    radius: f32,
    direction_opt: bool,
) -> (Vec2, usize) {
    let mut result = if direction_opt {
        opt_velocity.normalize_or_zero() * radius
    } else if opt_velocity.length_squared() > radius * radius {
        opt_velocity.normalize_or_zero() * radius
    } else {
        opt_velocity
    };

    for (i, line) in lines.iter().enumerate() {
        if det(line.direction, line.point - result) > 0.0 {
            match linear_program_1(lines, i, opt_velocity, radius, direction_opt) {
                Some(new_result) => result = new_result,
                None => return (result, i),
            }
        }
    }

    (result, lines.len())
}

/// 3D fallback (spec.md §4.5 `linearProgram3`). `num_obstacle_lines` marks
/// the hard prefix of `lines` that is never relaxed; if the hard subset
/// alone is infeasible, the seed velocity (`current`) is returned unchanged.
#[must_use]
pub fn linear_program_3(
    lines: &[OrcaLine],
    num_obstacle_lines: usize,
    fail_line: usize,
    current: Vec2,
    radius: f32,
) -> Vec2 {
    let mut result = current;
    let mut distance = 0.0_f32;

    for i in fail_line..lines.len() {
        if det(lines[i].direction, lines[i].point - result) <= distance {
            continue;
        }

        let mut projected_lines: Vec<OrcaLine> = lines[..num_obstacle_lines].to_vec();
        for j in num_obstacle_lines..i {
            let determinant = det(lines[i].direction, lines[j].direction);
            if determinant.abs() <= f32::EPSILON {
                if lines[i].direction.dot(lines[j].direction) > 0.0 {
                    continue; // codirectional: redundant
                }
                // Antidirectional: bisect.
                projected_lines.push(OrcaLine::new(
                    0.5 * (lines[i].point + lines[j].point),
                    (lines[j].direction - lines[i].direction).normalize_or_zero(),
                ));
            } else {
                projected_lines.push(OrcaLine::new(
                    lines[i].point
                        + (det(lines[j].direction, lines[i].point - lines[j].point) / determinant)
                            * lines[i].direction,
                    (lines[j].direction - lines[i].direction).normalize_or_zero(),
                ));
            }
        }

        let opt_direction = crate::math::rot90_ccw(lines[i].direction);
        let (new_result, _) = linear_program_2(&projected_lines, opt_direction, radius, true);

        if det(lines[i].direction, lines[i].point - new_result) > distance {
            result = new_result;
        }
        distance = det(lines[i].direction, lines[i].point - result);
    }

    result
}
