//! Collision data exchanged with the physics world.
//!
//! Contacts are reported by the physics backend during a step and consumed by
//! the next solver step. Probe hits come from the downward ground ray.

use bevy::prelude::*;

/// A single contact reported by the physics world.
///
/// The normal points from the touched surface toward the character.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    /// Unit surface normal.
    pub normal: Vec3,
    /// World-space contact point.
    pub point: Vec3,
    /// Layer index of the touched collider.
    pub layer: u32,
    /// Touched collider, if known.
    pub collider: Option<Entity>,
}

impl Contact {
    /// Create a contact on the given layer.
    pub fn new(normal: Vec3, point: Vec3, layer: u32) -> Self {
        Self {
            normal,
            point,
            layer,
            collider: None,
        }
    }

    /// Builder: attach the touched collider.
    pub fn with_collider(mut self, collider: Entity) -> Self {
        self.collider = Some(collider);
        self
    }
}

/// Information about a raycast hit.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct CollisionData {
    /// Distance from the ray origin to the hit point.
    pub distance: f32,
    /// Normal of the surface at the hit point.
    pub normal: Vec3,
    /// World position of the hit point.
    pub point: Vec3,
    /// Layer index of the hit collider.
    pub layer: u32,
    /// Entity that was hit (if any).
    pub entity: Option<Entity>,
}

impl CollisionData {
    /// Create a collision result.
    pub fn new(distance: f32, normal: Vec3, point: Vec3, layer: u32, entity: Option<Entity>) -> Self {
        Self {
            distance,
            normal,
            point,
            layer,
            entity,
        }
    }
}

/// State of the character's rigid body at the start of a step.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BodySnapshot {
    /// Body position (the ground probe origin).
    pub position: Vec3,
    /// Body velocity as left by the integrator and any external impulses.
    pub velocity: Vec3,
    /// Lower corner of the collision volume's world bounds.
    pub bounds_min: Vec3,
}

impl BodySnapshot {
    /// Create a snapshot.
    pub fn new(position: Vec3, velocity: Vec3, bounds_min: Vec3) -> Self {
        Self {
            position,
            velocity,
            bounds_min,
        }
    }

    /// A resting body at `position` whose bounds extend `half_height` below it.
    pub fn resting(position: Vec3, half_height: f32) -> Self {
        Self::new(position, Vec3::ZERO, position - Vec3::Y * half_height)
    }
}
