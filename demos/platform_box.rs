//! Platform Box Demo
//!
//! A headless run of the controller on Rapier3D. A character is dropped into
//! a walled box with a raised platform and a ramp, then follows a scripted
//! timeline: walk to the platform, jump onto it, double jump off the far
//! side and walk up the ramp.
//!
//! Position, velocity and ground state are logged every half second. The
//! app exits when the script runs out.
//!
//! ```text
//! cargo run --example platform_box --features rapier3d
//! ```

use std::time::Duration;

use bevy::app::ScheduleRunnerPlugin;
use bevy::log::LogPlugin;
use bevy::prelude::*;
use bevy_rapier3d::prelude::*;
use rigid_character_controller::prelude::*;
use rigid_character_controller::rapier::Rapier3dCharacterBundle;

// ==================== Constants ====================

const STEP: f64 = 1.0 / 60.0;
const LOG_INTERVAL: f32 = 0.5;

const BOX_HALF_SIZE: f32 = 12.0;
const WALL_HEIGHT: f32 = 3.0;
const PLATFORM_HEIGHT: f32 = 1.0;
const RAMP_ANGLE: f32 = 20.0;

fn main() {
    App::new()
        .add_plugins(
            MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(Duration::from_secs_f64(STEP))),
        )
        .add_plugins((TransformPlugin, LogPlugin::default()))
        .add_plugins(RapierPhysicsPlugin::<NoUserData>::default())
        // The controller integrates gravity, so the character body uses GravityScale(0).
        .add_plugins(CharacterControllerPlugin::<Rapier3dBackend>::default())
        .insert_resource(Time::<Fixed>::from_seconds(STEP))
        .init_resource::<LogTimer>()
        .add_systems(Startup, setup)
        .add_systems(Update, (log_player, exit_when_script_done))
        .run();
}

#[derive(Component)]
struct Player;

#[derive(Resource, Default)]
struct LogTimer(f32);

// ==================== Setup ====================

fn setup(mut commands: Commands) {
    // Floor, top face at Y = 0
    commands.spawn((
        Transform::from_xyz(0.0, -0.5, 0.0),
        RigidBody::Fixed,
        Collider::cuboid(BOX_HALF_SIZE, 0.5, BOX_HALF_SIZE),
    ));

    // Walls
    for (x, z, half_x, half_z) in [
        (BOX_HALF_SIZE, 0.0, 0.5, BOX_HALF_SIZE),
        (-BOX_HALF_SIZE, 0.0, 0.5, BOX_HALF_SIZE),
        (0.0, BOX_HALF_SIZE, BOX_HALF_SIZE, 0.5),
        (0.0, -BOX_HALF_SIZE, BOX_HALF_SIZE, 0.5),
    ] {
        commands.spawn((
            Transform::from_xyz(x, WALL_HEIGHT * 0.5, z),
            RigidBody::Fixed,
            Collider::cuboid(half_x, WALL_HEIGHT * 0.5, half_z),
        ));
    }

    // Platform in the middle
    commands.spawn((
        Transform::from_xyz(0.0, PLATFORM_HEIGHT * 0.5, -4.0),
        RigidBody::Fixed,
        Collider::cuboid(2.0, PLATFORM_HEIGHT * 0.5, 2.0),
    ));

    // Ramp along +X, below the default 25 degree ground limit
    commands.spawn((
        Transform::from_xyz(6.0, 0.0, -4.0)
            .with_rotation(Quat::from_rotation_z(RAMP_ANGLE.to_radians())),
        RigidBody::Fixed,
        Collider::cuboid(3.0, 0.2, 2.0),
    ));

    let config = ControllerConfig::default()
        .with_speeds(4.0, 3.0, 3.0)
        .with_acceleration(30.0, 10.0)
        .with_jump_height(1.5)
        .with_max_air_jumps(1);

    let script = [
        ScriptedFrame::idle(1.0),
        // Walk toward the platform, -Z is forward
        ScriptedFrame::moving(Vec2::Y, 0.4),
        ScriptedFrame::moving(Vec2::Y, 0.8).with_jump(),
        ScriptedFrame::idle(0.5),
        // Off the far side with a double jump
        ScriptedFrame::moving(Vec2::X, 0.3).with_jump(),
        ScriptedFrame::moving(Vec2::X, 0.2).with_jump(),
        ScriptedFrame::moving(Vec2::X, 1.5),
        ScriptedFrame::idle(1.0),
    ];

    commands.spawn((
        Player,
        Transform::from_xyz(0.0, 2.0, 0.0),
        CharacterController::new(config).unwrap_or_default(),
        CharacterInput::new(ScriptedInputModule::from_script(script)),
        Rapier3dCharacterBundle::new(),
        Collider::capsule_y(0.5, 0.5),
    ));
}

// ==================== Systems ====================

fn log_player(
    time: Res<Time>,
    mut timer: ResMut<LogTimer>,
    q_player: Query<(&Transform, &CharacterController), With<Player>>,
) {
    timer.0 += time.delta_secs();
    if timer.0 < LOG_INTERVAL {
        return;
    }
    timer.0 = 0.0;

    for (transform, controller) in &q_player {
        info!(
            position = ?transform.translation,
            velocity = ?controller.velocity(),
            grounded = controller.is_grounded(),
            steep = controller.is_on_steep(),
            contacts = controller.ground_contact_count(),
            "player"
        );
    }
}

fn exit_when_script_done(
    mut q_player: Query<&mut CharacterInput, With<Player>>,
    mut exit: EventWriter<AppExit>,
) {
    for mut input in &mut q_player {
        let playing = input
            .downcast_mut::<ScriptedInputModule>()
            .is_some_and(|module| module.is_playing());
        if !playing {
            info!("script finished");
            exit.write(AppExit::Success);
        }
    }
}
