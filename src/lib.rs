//! # `rigid_character_controller`
//!
//! A 3D rigidbody character controller with physics backend abstraction.
//!
//! This crate provides a motion solver that turns player input and the
//! contacts reported by a physics engine into a velocity for the character's
//! rigid body. It:
//! - Classifies contacts as ground, steep or ceiling against a gravity-derived up-axis
//! - Uses a separate, steeper angle limit for stairs layers
//! - Snaps to the ground after walking over ledges and crests
//! - Treats being wedged between steep walls as grounded
//! - Blends velocity toward the input with capped ground and air acceleration
//! - Supports ground, wall and air jumps with an optional up-axis bias
//! - Abstracts the physics backend (Rapier3D included)
//!
//! ## Architecture
//!
//! Every fixed step runs the same pipeline:
//! 1. Contacts reported since the last step are aggregated ([`contacts`])
//! 2. Ground support is decided, falling back to snapping and steep promotion ([`ground`])
//! 3. The velocity is steered along the contact plane ([`movement`])
//! 4. Queued jumps and gravity are applied ([`jump`])
//!
//! The solver is plain Rust in [`controller::CharacterController`] and can be
//! stepped without Bevy's ECS. [`CharacterControllerPlugin`] runs it for every
//! character and moves data in and out of the physics engine.
//!
//! ## Usage
//!
//! ```rust
//! use bevy::prelude::*;
//! use rigid_character_controller::prelude::*;
//!
//! let mut controller = CharacterController::new(ControllerConfig::platformer()).unwrap();
//! let body = BodySnapshot::resting(Vec3::new(0.0, 1.0, 0.0), 1.0);
//! let ground = [Contact::new(Vec3::Y, Vec3::ZERO, 0)];
//!
//! controller.queue_jump();
//! let velocity = controller.fixed_step(1.0 / 60.0, Vec3::new(0.0, -9.81, 0.0), &ground, &body, &NoGround);
//! assert!(velocity.y > 0.0);
//! ```

use bevy::prelude::*;

pub mod backend;
pub mod collision;
pub mod config;
pub mod contacts;
pub mod controller;
pub mod ground;
pub mod input;
pub mod jump;
pub mod movement;
pub mod state;
pub mod systems;

#[cfg(feature = "rapier3d")]
pub mod rapier;

pub mod prelude {
    //! Convenient re-exports for common usage.

    pub use crate::backend::{
        CharacterGravity, CharacterPhysicsBackend, ContactReports, GravityField, GroundProbeHit,
    };
    pub use crate::collision::{BodySnapshot, CollisionData, Contact};
    pub use crate::config::{ConfigError, ControllerConfig, LayerMask};
    pub use crate::contacts::GroundContactRecord;
    pub use crate::controller::CharacterController;
    pub use crate::ground::{GroundProbe, GroundSupport, NoGround, PlaneProbe};
    pub use crate::input::{
        AxisMode, CharacterInput, FollowInputSpace, InputAxesData, InputSpace, KeyBindings,
        KeyboardInputModule, PlayerInputModule, ScriptedFrame, ScriptedInputModule,
    };
    pub use crate::state::{Airborne, ControllerDisabled, Grounded, OnSteep};
    pub use crate::{CharacterControllerPlugin, CharacterControllerSet};

    #[cfg(feature = "rapier3d")]
    pub use crate::rapier::Rapier3dBackend;
}

/// System sets for the character controller's `FixedUpdate` systems.
///
/// The sets run in order. Backends put their contact and probe systems in
/// [`Sensors`](CharacterControllerSet::Sensors).
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CharacterControllerSet {
    /// Validation and enable/disable handling.
    Preparation,
    /// Backend contact reporting and ground probing.
    Sensors,
    /// The motion solver.
    Solve,
    /// State marker components.
    Sync,
}

/// Main plugin for the character controller system.
///
/// This plugin is generic over a physics backend `B` which provides the actual
/// physics operations (velocity access, contact reporting, ground probing).
///
/// # Type Parameters
/// - `B`: The physics backend implementation (e.g., `Rapier3dBackend`)
///
/// # Examples
///
/// With Rapier3D backend:
/// ```rust,ignore
/// use bevy::prelude::*;
/// use bevy_rapier3d::prelude::*;
/// use rigid_character_controller::prelude::*;
///
/// App::new()
///     .add_plugins(DefaultPlugins)
///     .add_plugins(RapierPhysicsPlugin::<NoUserData>::default())
///     .add_plugins(CharacterControllerPlugin::<Rapier3dBackend>::default())
///     .run();
/// ```
pub struct CharacterControllerPlugin<B: backend::CharacterPhysicsBackend> {
    _marker: std::marker::PhantomData<B>,
}

impl<B: backend::CharacterPhysicsBackend> Default for CharacterControllerPlugin<B> {
    fn default() -> Self {
        Self {
            _marker: std::marker::PhantomData,
        }
    }
}

impl<B: backend::CharacterPhysicsBackend> Plugin for CharacterControllerPlugin<B> {
    fn build(&self, app: &mut App) {
        // Register core types
        app.register_type::<controller::CharacterController>();
        app.register_type::<config::ControllerConfig>();
        app.register_type::<config::LayerMask>();
        app.register_type::<input::InputSpace>();
        app.register_type::<input::FollowInputSpace>();
        app.register_type::<backend::GravityField>();
        app.register_type::<backend::CharacterGravity>();
        app.register_type::<backend::ContactReports>();
        app.register_type::<backend::GroundProbeHit>();
        app.register_type::<state::Grounded>();
        app.register_type::<state::Airborne>();
        app.register_type::<state::OnSteep>();
        app.register_type::<state::ControllerDisabled>();

        app.init_resource::<backend::GravityField>();

        // Add the physics backend plugin
        app.add_plugins(B::plugin());

        // Input is read once per rendered frame
        app.add_systems(
            Update,
            (
                systems::poll_device_input,
                systems::sync_input_space,
                systems::update_controller_input,
            )
                .chain(),
        );

        app.configure_sets(
            FixedUpdate,
            (
                CharacterControllerSet::Preparation,
                CharacterControllerSet::Sensors,
                CharacterControllerSet::Solve,
                CharacterControllerSet::Sync,
            )
                .chain(),
        );

        app.add_systems(
            FixedUpdate,
            (
                (
                    systems::validate_new_controllers,
                    systems::sync_controller_lifecycle,
                )
                    .chain()
                    .in_set(CharacterControllerSet::Preparation),
                systems::run_motion_solver::<B>.in_set(CharacterControllerSet::Solve),
                systems::sync_state_markers.in_set(CharacterControllerSet::Sync),
            ),
        );
    }
}
