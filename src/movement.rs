//! Velocity adjustment along the contact plane.

use bevy::prelude::*;

use crate::config::ControllerConfig;

/// Project `direction` onto the plane with the given normal and normalize it.
///
/// Returns zero when the direction is parallel to the normal.
#[inline]
pub fn project_direction_on_plane(direction: Vec3, normal: Vec3) -> Vec3 {
    (direction - normal * direction.dot(normal)).normalize_or_zero()
}

/// Move `current` toward `target` by at most `max_delta`.
#[inline]
pub fn move_towards(current: f32, target: f32, max_delta: f32) -> f32 {
    if (target - current).abs() <= max_delta {
        target
    } else {
        current + (target - current).signum() * max_delta
    }
}

/// Scale a move axis (`x` = right, `y` = forward) into a desired planar velocity.
///
/// Forward input uses the forward speed, backward input the backward speed.
pub fn desired_velocity(move_axis: Vec2, config: &ControllerConfig) -> Vec2 {
    let forward_speed = if move_axis.y >= 0.0 {
        config.max_speed_forward
    } else {
        config.max_speed_backward
    };
    Vec2::new(move_axis.x * config.max_speed_strafe, move_axis.y * forward_speed)
}

/// Steer `velocity` toward the desired planar velocity.
///
/// The right and forward axes are projected onto the contact plane and the
/// current velocity along each is moved toward its target by at most
/// `acceleration * dt`. The component along the contact normal is untouched.
pub fn adjust_velocity(
    velocity: Vec3,
    desired: Vec2,
    right_axis: Vec3,
    forward_axis: Vec3,
    contact_normal: Vec3,
    acceleration: f32,
    dt: f32,
) -> Vec3 {
    let x_axis = project_direction_on_plane(right_axis, contact_normal);
    let z_axis = project_direction_on_plane(forward_axis, contact_normal);

    let current_x = velocity.dot(x_axis);
    let current_z = velocity.dot(z_axis);

    let max_change = acceleration * dt;
    let new_x = move_towards(current_x, desired.x, max_change);
    let new_z = move_towards(current_z, desired.y, max_change);

    velocity + x_axis * (new_x - current_x) + z_axis * (new_z - current_z)
}
