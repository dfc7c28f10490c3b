//! Core controller systems.
//!
//! These systems wire [`CharacterController`] into Bevy. Input runs once per
//! rendered frame in `Update`; the solver runs in `FixedUpdate` and is generic
//! over the physics backend.

use bevy::prelude::*;

use crate::backend::{CharacterPhysicsBackend, ContactReports, GroundProbeHit};
use crate::collision::BodySnapshot;
use crate::controller::CharacterController;
use crate::input::{CharacterInput, FollowInputSpace, InputSpace};
use crate::state::{Airborne, ControllerDisabled, Grounded, OnSteep};

/// Feed keyboard state to device-polling input modules.
pub fn poll_device_input(
    keys: Option<Res<ButtonInput<KeyCode>>>,
    mut q_inputs: Query<&mut CharacterInput>,
) {
    let Some(keys) = keys else {
        return;
    };
    for mut input in &mut q_inputs {
        input.module_mut().poll_keyboard(&keys);
    }
}

/// Copy the followed entity's axes into [`InputSpace`].
pub fn sync_input_space(
    mut q_spaces: Query<(&FollowInputSpace, &mut InputSpace)>,
    q_transforms: Query<&GlobalTransform>,
) {
    for (follow, mut space) in &mut q_spaces {
        if let Ok(transform) = q_transforms.get(follow.0) {
            *space = InputSpace::from_transform(transform);
        }
    }
}

/// Pull this frame's input into every controller.
///
/// Disabled controllers are included so their modules drain input instead
/// of holding it until re-enable.
pub fn update_controller_input(
    time: Res<Time>,
    mut q_controllers: Query<(&mut CharacterController, &mut CharacterInput, Option<&InputSpace>)>,
) {
    let dt = time.delta_secs();
    for (mut controller, mut input, space) in &mut q_controllers {
        controller.update_input(dt, input.module_mut(), space);
    }
}

/// Disable controllers that were built with an invalid configuration,
/// e.g. through reflection or a scene file.
pub fn validate_new_controllers(
    mut commands: Commands,
    q_added: Query<(Entity, &CharacterController), Added<CharacterController>>,
) {
    for (entity, controller) in &q_added {
        if let Err(err) = controller.config().validate() {
            error!(?entity, %err, "invalid character controller configuration");
            commands.entity(entity).insert(ControllerDisabled);
        }
    }
}

/// Run `on_disable`/`on_enable` when [`ControllerDisabled`] is added or removed.
pub fn sync_controller_lifecycle(
    mut removed: RemovedComponents<ControllerDisabled>,
    mut q_controllers: Query<(
        &mut CharacterController,
        Option<&mut CharacterInput>,
        Option<Ref<ControllerDisabled>>,
    )>,
) {
    for (mut controller, input, disabled) in &mut q_controllers {
        if !disabled.is_some_and(|marker| marker.is_added()) {
            continue;
        }
        match input {
            Some(mut input) => controller.on_disable(Some(input.module_mut())),
            None => controller.on_disable(None),
        }
    }

    for entity in removed.read() {
        if let Ok((mut controller, input, None)) = q_controllers.get_mut(entity) {
            match input {
                Some(mut input) => controller.on_enable(Some(input.module_mut())),
                None => controller.on_enable(None),
            }
        }
    }
}

/// Run one solver step for every character and write the resulting velocity
/// back to the body.
///
/// Contact reports are drained here, so every contact is used by exactly one
/// step.
pub fn run_motion_solver<B: CharacterPhysicsBackend>(world: &mut World) {
    let dt = B::get_fixed_timestep(world);

    let entities: Vec<(Entity, bool)> = world
        .query_filtered::<(Entity, Has<ControllerDisabled>), With<CharacterController>>()
        .iter(world)
        .collect();

    for (entity, disabled) in entities {
        let requests = world
            .get_mut::<CharacterController>(entity)
            .map(|mut controller| controller.take_body_requests())
            .unwrap_or_default();
        if requests.reset_velocity {
            B::set_velocity(world, entity, Vec3::ZERO);
        }
        if let Some(frozen) = requests.freeze {
            B::set_position_frozen(world, entity, frozen);
        }

        let contacts = world
            .get_mut::<ContactReports>(entity)
            .map(|mut reports| reports.take())
            .unwrap_or_default();
        if disabled {
            continue;
        }

        let body = BodySnapshot::new(
            B::get_position(world, entity),
            B::get_velocity(world, entity),
            B::get_bounds_min(world, entity),
        );
        let gravity = B::get_gravity(world, entity);
        let probe = world.get::<GroundProbeHit>(entity).and_then(|hit| hit.0);

        let velocity = {
            let Some(mut controller) = world.get_mut::<CharacterController>(entity) else {
                continue;
            };
            controller.fixed_step(dt, gravity, &contacts, &body, &probe)
        };
        B::set_velocity(world, entity, velocity);
    }
}

/// Synchronize state marker components with controller state.
pub fn sync_state_markers(
    mut commands: Commands,
    q_controllers: Query<(
        Entity,
        &CharacterController,
        Has<Grounded>,
        Has<Airborne>,
        Option<&OnSteep>,
    )>,
) {
    for (entity, controller, has_grounded, has_airborne, on_steep) in &q_controllers {
        let grounded = controller.is_grounded();

        // Sync Grounded/Airborne
        if grounded && !has_grounded {
            commands.entity(entity).insert(Grounded).remove::<Airborne>();
        } else if !grounded && !has_airborne {
            commands.entity(entity).insert(Airborne).remove::<Grounded>();
        }

        // Sync OnSteep
        if controller.is_on_steep() {
            let normal = controller.steep_normal();
            if on_steep.is_none_or(|steep| steep.normal != normal) {
                commands.entity(entity).insert(OnSteep { normal });
            }
        } else if on_steep.is_some() {
            commands.entity(entity).remove::<OnSteep>();
        }
    }
}
