//! Jumping and gravity.
//!
//! The jump phase counts jumps consumed since the last landing. Ground jumps
//! and wall jumps are always available; air jumps are gated by
//! [`ControllerConfig::max_air_jumps`].

use bevy::prelude::*;

use crate::config::ControllerConfig;
use crate::contacts::StepState;
use crate::state::MotionState;

/// Below this squared speed a grounded character only receives the part of
/// gravity along the contact normal.
pub const RESTING_SPEED_SQ: f32 = 0.01;

/// Launch speed needed to reach `height` under `gravity`.
#[inline]
pub fn jump_speed(gravity: Vec3, height: f32) -> f32 {
    (2.0 * gravity.length() * height).max(0.0).sqrt()
}

/// Which surface a jump was taken from.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpKind {
    Ground,
    Wall,
    Air,
}

/// A jump that was applied to the velocity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JumpOutcome {
    pub kind: JumpKind,
    /// Unit direction the speed was added along.
    pub direction: Vec3,
    /// Speed actually added after subtracting the aligned velocity.
    pub speed: f32,
}

/// Apply a queued jump.
///
/// Returns `None` when no jump is available, in which case nothing changes.
pub fn apply_jump(
    motion: &mut MotionState,
    step: &StepState,
    config: &ControllerConfig,
    gravity: Vec3,
) -> Option<JumpOutcome> {
    let (kind, direction) = if step.on_ground() {
        (JumpKind::Ground, motion.contact_normal)
    } else if step.on_steep() {
        motion.jump_phase = 0;
        (JumpKind::Wall, motion.steep_normal)
    } else if config.max_air_jumps > 0 && motion.jump_phase <= config.max_air_jumps {
        if motion.jump_phase == 0 {
            motion.jump_phase = 1;
        }
        (JumpKind::Air, motion.contact_normal)
    } else {
        return None;
    };

    motion.steps_since_jump = 0;
    motion.jump_phase += 1;

    let mut direction = direction.normalize_or(motion.up_axis);
    if config.use_jump_bias {
        direction = (direction + motion.up_axis).normalize_or(motion.up_axis);
    }

    let mut speed = jump_speed(gravity, config.jump_height);
    let aligned = motion.velocity.dot(direction);
    if aligned > f32::EPSILON {
        speed = (speed - aligned).max(0.0);
    }
    motion.velocity += direction * speed;

    debug!(?kind, phase = motion.jump_phase, speed, "jump");

    Some(JumpOutcome {
        kind,
        direction,
        speed,
    })
}

/// Integrate gravity for one step.
///
/// A grounded, nearly resting character only receives the component of
/// gravity along the contact normal, so it does not creep down slopes.
pub fn apply_gravity(
    velocity: Vec3,
    gravity: Vec3,
    contact_normal: Vec3,
    grounded: bool,
    dt: f32,
) -> Vec3 {
    if grounded && velocity.length_squared() < RESTING_SPEED_SQ {
        velocity + contact_normal * (gravity.dot(contact_normal) * dt)
    } else {
        velocity + gravity * dt
    }
}
