//! Physics backend abstraction.
//!
//! This module defines the trait that physics backends must implement
//! to work with the character controller. This allows easy swapping
//! between physics engines (Rapier3D, Avian, custom, etc.).
//!
//! Contacts and the ground probe are not part of the trait: backend sensor
//! systems write them into the [`ContactReports`] and [`GroundProbeHit`]
//! components before the solver runs.

use bevy::prelude::*;

use crate::collision::{Contact, CollisionData};

/// Gravity used when neither a [`CharacterGravity`] nor a [`GravityField`]
/// overrides it.
pub const DEFAULT_GRAVITY: Vec3 = Vec3::new(0.0, -9.81, 0.0);

/// Trait for physics backend implementations.
///
/// Implement this trait to integrate a physics engine with the character
/// controller. The backend reads and writes the rigid body state; the
/// solver itself never touches the physics world.
///
/// For an example implementation, see the `rapier` module's `Rapier3dBackend`.
pub trait CharacterPhysicsBackend: 'static + Send + Sync {
    /// Returns the plugin that sets up this backend, including its sensor
    /// systems.
    fn plugin() -> impl Plugin;

    /// Get the current velocity of an entity.
    fn get_velocity(world: &World, entity: Entity) -> Vec3;

    /// Set the velocity of an entity.
    fn set_velocity(world: &mut World, entity: Entity, velocity: Vec3);

    /// Get the current position of an entity (the ground probe origin).
    fn get_position(world: &World, entity: Entity) -> Vec3;

    /// Get the lower corner of the entity's collider bounds.
    fn get_bounds_min(world: &World, entity: Entity) -> Vec3 {
        Self::get_position(world, entity)
    }

    /// Get the fixed timestep delta time.
    fn get_fixed_timestep(world: &World) -> f32;

    /// Get the gravity vector for an entity.
    ///
    /// Checks the entity's [`CharacterGravity`] first, then the
    /// [`GravityField`] resource.
    fn get_gravity(world: &World, entity: Entity) -> Vec3 {
        if let Some(gravity) = world.get::<CharacterGravity>(entity) {
            return gravity.0;
        }
        world
            .get_resource::<GravityField>()
            .map(|field| field.0)
            .unwrap_or(DEFAULT_GRAVITY)
    }

    /// Lock or unlock the body's translation.
    fn set_position_frozen(_world: &mut World, _entity: Entity, _frozen: bool) {}
}

/// Empty plugin for backends that don't need additional setup.
pub struct NoOpBackendPlugin;

impl Plugin for NoOpBackendPlugin {
    fn build(&self, _app: &mut App) {}
}

/// World gravity for all characters.
#[derive(Resource, Reflect, Debug, Clone, Copy, PartialEq)]
#[reflect(Resource)]
pub struct GravityField(pub Vec3);

impl Default for GravityField {
    fn default() -> Self {
        Self(DEFAULT_GRAVITY)
    }
}

/// Per-character gravity override, e.g. for planets.
#[derive(Component, Reflect, Debug, Clone, Copy, PartialEq)]
#[reflect(Component)]
pub struct CharacterGravity(pub Vec3);

/// Contacts reported for a character since its last solver step.
///
/// Backends push into this from their sensor systems; the solver drains it.
#[derive(Component, Reflect, Debug, Clone, Default)]
#[reflect(Component)]
pub struct ContactReports {
    contacts: Vec<Contact>,
}

impl ContactReports {
    pub fn push(&mut self, contact: Contact) {
        self.contacts.push(contact);
    }

    pub fn extend(&mut self, contacts: impl IntoIterator<Item = Contact>) {
        self.contacts.extend(contacts);
    }

    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    /// Remove and return every pending contact.
    pub fn take(&mut self) -> Vec<Contact> {
        std::mem::take(&mut self.contacts)
    }
}

/// Result of the downward ground probe for the current step.
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct GroundProbeHit(pub Option<CollisionData>);
