//! Rapier3D physics backend implementation.
//!
//! This module provides the physics backend for Bevy Rapier3D.
//! Enable with the `rapier3d` feature.

use bevy::prelude::*;
use bevy_rapier3d::geometry::Group;
use bevy_rapier3d::prelude::*;

use crate::backend::{CharacterPhysicsBackend, ContactReports, GroundProbeHit};
use crate::collision::{CollisionData, Contact};
use crate::controller::CharacterController;
use crate::state::ControllerDisabled;

/// Rapier3D physics backend for the character controller.
///
/// Velocity is read from and written to the [`Velocity`] component. Contacts
/// and the ground probe are gathered by dedicated sensor systems that receive
/// the Rapier context as a system parameter.
///
/// Characters should use `GravityScale(0.0)`: the controller integrates
/// gravity itself.
pub struct Rapier3dBackend;

impl CharacterPhysicsBackend for Rapier3dBackend {
    fn plugin() -> impl Plugin {
        Rapier3dBackendPlugin
    }

    fn get_velocity(world: &World, entity: Entity) -> Vec3 {
        world
            .get::<Velocity>(entity)
            .map(|v| v.linvel)
            .unwrap_or(Vec3::ZERO)
    }

    fn set_velocity(world: &mut World, entity: Entity, velocity: Vec3) {
        if let Some(mut vel) = world.get_mut::<Velocity>(entity) {
            vel.linvel = velocity;
        }
    }

    fn get_position(world: &World, entity: Entity) -> Vec3 {
        world
            .get::<Transform>(entity)
            .map(|t| t.translation)
            .or_else(|| world.get::<GlobalTransform>(entity).map(|t| t.translation()))
            .unwrap_or(Vec3::ZERO)
    }

    fn get_bounds_min(world: &World, entity: Entity) -> Vec3 {
        let half_extents = world
            .get::<Collider>(entity)
            .map(collider_half_extents)
            .unwrap_or(Vec3::ZERO);
        Self::get_position(world, entity) - half_extents
    }

    fn get_fixed_timestep(world: &World) -> f32 {
        world
            .get_resource::<Time<Fixed>>()
            .map(|t| t.delta_secs())
            .filter(|&d| d > 0.0)
            .unwrap_or(1.0 / 60.0)
    }

    fn set_position_frozen(world: &mut World, entity: Entity, frozen: bool) {
        if let Some(mut axes) = world.get_mut::<LockedAxes>(entity) {
            axes.set(LockedAxes::TRANSLATION_LOCKED, frozen);
            return;
        }
        if frozen {
            if let Ok(mut entity) = world.get_entity_mut(entity) {
                entity.insert(LockedAxes::TRANSLATION_LOCKED);
            }
        }
    }
}

/// Plugin that sets up Rapier3D-specific systems for the character controller.
pub struct Rapier3dBackendPlugin;

impl Plugin for Rapier3dBackendPlugin {
    fn build(&self, app: &mut App) {
        use crate::CharacterControllerSet;

        // Sensors - contacts and the ground probe are independent
        app.add_systems(
            FixedUpdate,
            (rapier_contact_sensor, rapier_ground_probe).in_set(CharacterControllerSet::Sensors),
        );
    }
}

/// Half extents of a collider's axis-aligned bounds, ignoring rotation.
pub fn collider_half_extents(collider: &Collider) -> Vec3 {
    if let Some(capsule) = collider.as_capsule() {
        let segment = capsule.segment();
        (segment.a() - segment.b()).abs() / 2.0 + Vec3::splat(capsule.radius())
    } else if let Some(ball) = collider.as_ball() {
        Vec3::splat(ball.radius())
    } else if let Some(cuboid) = collider.as_cuboid() {
        cuboid.half_extents()
    } else {
        Vec3::ZERO
    }
}

/// Layer index of a collider: its lowest membership bit.
fn collider_layer(groups: Option<&CollisionGroups>) -> u32 {
    groups
        .map(|g| g.memberships.bits())
        .filter(|&bits| bits != 0)
        .map(u32::trailing_zeros)
        .unwrap_or(0)
}

/// Report every active contact of each character into [`ContactReports`].
///
/// Normals are flipped as needed so they point from the touched surface
/// toward the character.
fn rapier_contact_sensor(
    rapier_context: ReadRapierContext,
    mut q_controllers: Query<
        (Entity, &mut ContactReports),
        (With<CharacterController>, Without<ControllerDisabled>),
    >,
    q_groups: Query<&CollisionGroups>,
) {
    let Ok(context) = rapier_context.single() else {
        return;
    };

    for (entity, mut reports) in &mut q_controllers {
        for pair in context.contact_pairs_with(entity) {
            if !pair.has_any_active_contact() {
                continue;
            }
            let character_is_first = pair.collider1() == Some(entity);
            let other = if character_is_first {
                pair.collider2()
            } else {
                pair.collider1()
            };
            let layer = collider_layer(other.and_then(|e| q_groups.get(e).ok()));

            for manifold in pair.manifolds() {
                let normal = if character_is_first {
                    -manifold.normal()
                } else {
                    manifold.normal()
                };
                for solver_contact in manifold.solver_contacts() {
                    let mut contact = Contact::new(normal, solver_contact.point(), layer);
                    contact.collider = other;
                    reports.push(contact);
                }
            }
        }
    }
}

/// Cast the downward ground probe for each character.
fn rapier_ground_probe(
    rapier_context: ReadRapierContext,
    mut q_controllers: Query<
        (Entity, &GlobalTransform, &CharacterController, &mut GroundProbeHit),
        Without<ControllerDisabled>,
    >,
    q_groups: Query<&CollisionGroups>,
) {
    let Ok(context) = rapier_context.single() else {
        return;
    };

    for (entity, transform, controller, mut probe) in &mut q_controllers {
        let origin = transform.translation();
        let direction = -controller.up_axis();
        let mask = controller.config().probe_mask;

        let filter = QueryFilter::default()
            .exclude_rigid_body(entity)
            .exclude_collider(entity)
            .exclude_sensors()
            .groups(CollisionGroups::new(
                Group::ALL,
                Group::from_bits_truncate(mask.0),
            ));

        probe.0 = context
            .cast_ray_and_get_normal(origin, direction, controller.probe_distance(), true, filter)
            .map(|(hit_entity, hit)| {
                let layer = collider_layer(q_groups.get(hit_entity).ok());
                CollisionData::new(
                    hit.time_of_impact,
                    hit.normal,
                    hit.point,
                    layer,
                    Some(hit_entity),
                )
            });
    }
}

/// Bundle of Rapier components for a character.
///
/// # Example
///
/// ```rust,no_run
/// use bevy::prelude::*;
/// use bevy_rapier3d::prelude::*;
/// use rigid_character_controller::prelude::*;
/// use rigid_character_controller::rapier::Rapier3dCharacterBundle;
///
/// fn spawn_player(mut commands: Commands) {
///     commands.spawn((
///         Transform::from_xyz(0.0, 2.0, 0.0),
///         CharacterController::new(ControllerConfig::player()).unwrap(),
///         CharacterInput::keyboard(),
///         Rapier3dCharacterBundle::new(),
///         Collider::capsule_y(0.5, 0.5),
///     ));
/// }
/// ```
///
/// # Defaults
///
/// - `rigid_body`: [`RigidBody::Dynamic`]
/// - `velocity`: Zero velocity (overwritten by the controller every step)
/// - `locked_axes`: [`LockedAxes::ROTATION_LOCKED`] so the character stays upright
/// - `gravity_scale`: `0.0`, the controller applies gravity itself
/// - `friction`: zero, so ground friction does not fight the acceleration caps
#[derive(Bundle)]
pub struct Rapier3dCharacterBundle {
    pub rigid_body: RigidBody,
    pub velocity: Velocity,
    pub locked_axes: LockedAxes,
    pub gravity_scale: GravityScale,
    pub friction: Friction,
}

impl Default for Rapier3dCharacterBundle {
    fn default() -> Self {
        Self::new()
    }
}

impl Rapier3dCharacterBundle {
    pub fn new() -> Self {
        Self {
            rigid_body: RigidBody::Dynamic,
            velocity: Velocity::default(),
            locked_axes: LockedAxes::ROTATION_LOCKED,
            gravity_scale: GravityScale(0.0),
            friction: Friction {
                coefficient: 0.0,
                combine_rule: CoefficientCombineRule::Min,
            },
        }
    }

    /// Set the rigid body type for the character.
    pub fn with_body(mut self, body: RigidBody) -> Self {
        self.rigid_body = body;
        self
    }

    /// Set which axes should be locked for the rigid body.
    pub fn with_locked_axes(mut self, axes: LockedAxes) -> Self {
        self.locked_axes = axes;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_app() -> App {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        app.add_plugins(RapierPhysicsPlugin::<NoUserData>::default());
        app.insert_resource(Time::<Fixed>::from_hz(60.0));
        app
    }

    #[test]
    fn rapier_backend_get_position() {
        let mut app = create_test_app();

        let entity = app
            .world_mut()
            .spawn((Transform::from_xyz(1.0, 2.0, 3.0), RigidBody::Dynamic))
            .id();

        app.update();

        let pos = Rapier3dBackend::get_position(app.world(), entity);
        assert!((pos - Vec3::new(1.0, 2.0, 3.0)).length() < 0.01);
    }

    #[test]
    fn rapier_backend_velocity() {
        let mut app = create_test_app();

        let entity = app
            .world_mut()
            .spawn((
                Transform::default(),
                RigidBody::Dynamic,
                Velocity::linear(Vec3::new(5.0, 3.0, 0.0)),
            ))
            .id();

        Rapier3dBackend::set_velocity(app.world_mut(), entity, Vec3::new(1.0, 0.0, -2.0));

        let vel = Rapier3dBackend::get_velocity(app.world(), entity);
        assert_eq!(vel, Vec3::new(1.0, 0.0, -2.0));
    }

    #[test]
    fn capsule_bounds() {
        let half = collider_half_extents(&Collider::capsule_y(0.5, 0.25));
        assert!((half - Vec3::new(0.25, 0.75, 0.25)).length() < 1e-5);

        let half = collider_half_extents(&Collider::cuboid(1.0, 2.0, 3.0));
        assert_eq!(half, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn layer_is_lowest_membership_bit() {
        assert_eq!(collider_layer(None), 0);
        let groups = CollisionGroups::new(Group::GROUP_3 | Group::GROUP_5, Group::ALL);
        assert_eq!(collider_layer(Some(&groups)), 2);
    }

    #[test]
    fn freezing_locks_translation() {
        let mut app = create_test_app();
        let entity = app
            .world_mut()
            .spawn(Rapier3dCharacterBundle::new())
            .id();

        Rapier3dBackend::set_position_frozen(app.world_mut(), entity, true);
        let axes = *app.world().get::<LockedAxes>(entity).unwrap();
        assert!(axes.contains(LockedAxes::TRANSLATION_LOCKED));
        assert!(axes.contains(LockedAxes::ROTATION_LOCKED));

        Rapier3dBackend::set_position_frozen(app.world_mut(), entity, false);
        let axes = *app.world().get::<LockedAxes>(entity).unwrap();
        assert!(!axes.contains(LockedAxes::TRANSLATION_LOCKED));
    }
}
