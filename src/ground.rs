//! Ground classification.
//!
//! Runs once per step after every contact of the step has been aggregated and
//! decides whether the character is supported. In order of priority:
//!
//! 1. direct ground contacts,
//! 2. snapping to ground found by a downward probe,
//! 3. promoting a cluster of steep contacts whose average normal is ground-like.
//!
//! Otherwise the character is airborne and the contact plane becomes the
//! horizontal plane of the up-axis.

use bevy::prelude::*;

use crate::collision::CollisionData;
use crate::config::{LayerMask, SlopeThresholds};
use crate::contacts::StepState;
use crate::state::MotionState;

/// Downward ray query against the physics world.
pub trait GroundProbe {
    /// Cast a ray and return the first hit within `max_distance` on a layer in `mask`.
    fn cast_ray(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        mask: LayerMask,
    ) -> Option<CollisionData>;
}

/// A hit that was cast ahead of time, e.g. by a backend sensor system.
impl GroundProbe for Option<CollisionData> {
    fn cast_ray(
        &self,
        _origin: Vec3,
        _direction: Vec3,
        max_distance: f32,
        mask: LayerMask,
    ) -> Option<CollisionData> {
        self.filter(|hit| hit.distance <= max_distance && mask.contains(hit.layer))
    }
}

/// Probe that never hits anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGround;

impl GroundProbe for NoGround {
    fn cast_ray(&self, _: Vec3, _: Vec3, _: f32, _: LayerMask) -> Option<CollisionData> {
        None
    }
}

/// An infinite plane, for headless simulation and tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneProbe {
    pub point: Vec3,
    /// Unit normal of the walkable side.
    pub normal: Vec3,
    pub layer: u32,
}

impl PlaneProbe {
    /// Horizontal ground at the given height.
    pub fn flat(height: f32) -> Self {
        Self {
            point: Vec3::new(0.0, height, 0.0),
            normal: Vec3::Y,
            layer: 0,
        }
    }

    /// Builder: set the plane's layer.
    pub fn on_layer(mut self, layer: u32) -> Self {
        self.layer = layer;
        self
    }
}

impl GroundProbe for PlaneProbe {
    fn cast_ray(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        mask: LayerMask,
    ) -> Option<CollisionData> {
        if !mask.contains(self.layer) {
            return None;
        }
        let approach = direction.dot(self.normal);
        if approach >= -f32::EPSILON {
            return None;
        }
        let distance = (self.point - origin).dot(self.normal) / approach;
        if !(0.0..=max_distance).contains(&distance) {
            return None;
        }
        Some(CollisionData::new(
            distance,
            self.normal,
            origin + direction * distance,
            self.layer,
            None,
        ))
    }
}

/// What supports the character after classification.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GroundSupport {
    /// No support; the character is falling or rising freely.
    #[default]
    Airborne,
    /// At least one direct ground contact.
    Contact,
    /// Held to the ground by the probe.
    Snapped,
    /// Wedged between steep surfaces whose combined normal is ground-like.
    SteepSupported,
}

impl GroundSupport {
    #[inline]
    pub fn is_grounded(self) -> bool {
        self != GroundSupport::Airborne
    }
}

/// Everything the classifier needs besides the step and motion state.
pub struct GroundQuery<'a, P: GroundProbe + ?Sized> {
    pub thresholds: &'a SlopeThresholds,
    /// Probe origin.
    pub position: Vec3,
    pub max_snap_speed: f32,
    pub probe_distance: f32,
    pub probe_mask: LayerMask,
    pub probe: &'a P,
}

/// Classify the step and update the contact normal and step counters.
///
/// `motion.velocity` must already hold this step's baseline velocity; snapping
/// may redirect it along the ground plane.
pub fn classify_ground<P: GroundProbe + ?Sized>(
    step: &mut StepState,
    motion: &mut MotionState,
    query: &GroundQuery<'_, P>,
) -> GroundSupport {
    let support = if step.on_ground() {
        GroundSupport::Contact
    } else if snap_to_ground(step, motion, query) {
        GroundSupport::Snapped
    } else if promote_steep_contacts(step, motion, query.thresholds) {
        GroundSupport::SteepSupported
    } else {
        GroundSupport::Airborne
    };

    motion.steep_normal = step.steep_normal.normalize_or_zero();

    match support {
        GroundSupport::Airborne => {
            motion.contact_normal = motion.up_axis;
        }
        GroundSupport::Contact => {
            motion.steps_since_grounded = 0;
            if motion.steps_since_jump > 1 {
                motion.jump_phase = 0;
            }
            motion.contact_normal = if step.ground_contact_count > 1 {
                let blended = step.adjusted_ground_normal.normalize_or_zero();
                if blended == Vec3::ZERO {
                    motion.up_axis
                } else {
                    blended
                }
            } else {
                step.ground_normal
            };
        }
        GroundSupport::Snapped | GroundSupport::SteepSupported => {
            motion.steps_since_grounded = 0;
            if motion.steps_since_jump > 1 {
                motion.jump_phase = 0;
            }
        }
    }

    trace!(
        ?support,
        ground = step.ground_contact_count,
        steep = step.steep_contact_count,
        normal = ?motion.contact_normal,
        "ground classified"
    );

    support
}

/// Keep the character glued to ground found just below it.
///
/// Only runs right after losing ground contact, never within two steps of a
/// jump, and never above `max_snap_speed`. On success the velocity is turned
/// along the hit plane while keeping its speed.
pub fn snap_to_ground<P: GroundProbe + ?Sized>(
    step: &mut StepState,
    motion: &mut MotionState,
    query: &GroundQuery<'_, P>,
) -> bool {
    if motion.steps_since_grounded > 1 || motion.steps_since_jump <= 2 {
        return false;
    }
    let speed = motion.velocity.length();
    if speed > query.max_snap_speed {
        return false;
    }
    let Some(hit) = query.probe.cast_ray(
        query.position,
        -motion.up_axis,
        query.probe_distance,
        query.probe_mask,
    ) else {
        return false;
    };
    let normal = hit.normal.normalize_or_zero();
    if normal == Vec3::ZERO {
        return false;
    }
    if motion.up_axis.dot(normal) < query.thresholds.min_dot(hit.layer) {
        return false;
    }

    step.ground_contact_count = 1;
    motion.contact_normal = normal;

    let dot = motion.velocity.dot(normal);
    if dot > 0.0 {
        motion.velocity = (motion.velocity - normal * dot).normalize_or_zero() * speed;
    }
    true
}

/// Treat two or more steep contacts as ground when their combined normal is
/// within the ground angle.
pub fn promote_steep_contacts(
    step: &mut StepState,
    motion: &mut MotionState,
    thresholds: &SlopeThresholds,
) -> bool {
    if step.steep_contact_count <= 1 {
        return false;
    }
    step.steep_normal = step.steep_normal.normalize_or_zero();
    if step.steep_normal == Vec3::ZERO {
        return false;
    }
    if motion.up_axis.dot(step.steep_normal) < thresholds.ground_min_dot {
        return false;
    }
    step.steep_contact_count = 0;
    step.ground_contact_count = 1;
    motion.contact_normal = step.steep_normal;
    true
}
