//! Controller state.
//!
//! [`MotionState`] is the solver state that persists between steps. The marker
//! components indicate the current physical state of a character controller and
//! are added/removed by the controller systems after every step.

use bevy::prelude::*;

/// Solver state that persists across steps.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct MotionState {
    /// Current velocity.
    pub velocity: Vec3,
    /// Desired planar velocity from input (`x` = right, `y` = forward).
    pub desired_velocity: Vec2,
    /// Plane normal that velocity is adjusted against.
    pub contact_normal: Vec3,
    /// Normalized (or single) steep normal from the last classification.
    pub steep_normal: Vec3,
    /// Opposite of the gravity direction.
    pub up_axis: Vec3,
    /// Input-space right, projected onto the plane of `up_axis`.
    pub right_axis: Vec3,
    /// Input-space forward, projected onto the plane of `up_axis`.
    pub forward_axis: Vec3,
    pub steps_since_grounded: u32,
    pub steps_since_jump: u32,
    /// 0 = grounded/reset, otherwise number of jumps consumed since landing.
    pub jump_phase: u32,
}

impl Default for MotionState {
    fn default() -> Self {
        Self {
            velocity: Vec3::ZERO,
            desired_velocity: Vec2::ZERO,
            contact_normal: Vec3::Y,
            steep_normal: Vec3::ZERO,
            up_axis: Vec3::Y,
            right_axis: Vec3::X,
            forward_axis: Vec3::NEG_Z,
            steps_since_grounded: 0,
            steps_since_jump: 0,
            jump_phase: 0,
        }
    }
}

impl MotionState {
    /// Advance the step counters. Called once at the start of every step.
    pub(crate) fn tick_counters(&mut self) {
        self.steps_since_grounded = self.steps_since_grounded.saturating_add(1);
        self.steps_since_jump = self.steps_since_jump.saturating_add(1);
    }
}

/// Marker component indicating the character is grounded.
///
/// Added when the last step found direct ground contacts, snapped to the
/// ground or promoted a cluster of steep contacts. Removed when the character
/// becomes airborne.
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Grounded;

/// Marker component indicating the character is airborne.
///
/// Mutually exclusive with [`Grounded`].
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Airborne;

/// Marker component indicating the character is touching steep surfaces.
#[derive(Component, Reflect, Debug, Clone, Copy)]
#[reflect(Component)]
pub struct OnSteep {
    /// Combined normal of the steep contacts.
    pub normal: Vec3,
}

impl Default for OnSteep {
    fn default() -> Self {
        Self { normal: Vec3::X }
    }
}

/// Insert on a character to disable its controller; remove to enable it again.
///
/// Disabling zeroes the body velocity and clears the input axes.
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct ControllerDisabled;
