//! Step-by-step scenarios for the motion solver, driven without an ECS world.

use approx::assert_relative_eq;
use bevy::prelude::*;
use rigid_character_controller::jump::jump_speed;
use rigid_character_controller::prelude::*;

const DT: f32 = 1.0 / 60.0;
const GRAVITY: Vec3 = Vec3::new(0.0, -9.81, 0.0);

fn flat_ground() -> [Contact; 1] {
    [Contact::new(Vec3::Y, Vec3::ZERO, 0)]
}

fn standing() -> BodySnapshot {
    BodySnapshot::resting(Vec3::new(0.0, 1.0, 0.0), 1.0)
}

fn slope(degrees: f32) -> Vec3 {
    let r = degrees.to_radians();
    Vec3::new(r.sin(), r.cos(), 0.0)
}

/// Stand on flat ground long enough for the post-spawn jump window to pass.
fn settled(config: ControllerConfig) -> CharacterController {
    let mut controller = CharacterController::new(config).unwrap();
    for _ in 0..3 {
        controller.fixed_step(DT, GRAVITY, &flat_ground(), &standing(), &NoGround);
    }
    assert!(controller.is_grounded());
    controller
}

/// One airborne step with a resting body and no probe hit.
fn airborne_step(controller: &mut CharacterController) -> Vec3 {
    controller.fixed_step(DT, GRAVITY, &[], &standing(), &NoGround)
}

// ==================== Classification ====================

/// With no contacts and nothing below, the character is airborne and the
/// contact normal falls back to the up-axis.
#[test]
fn no_contacts_means_airborne() {
    let mut controller = CharacterController::default();
    let sideways = Vec3::new(-9.81, 0.0, 0.0);

    controller.fixed_step(DT, sideways, &[], &standing(), &NoGround);

    println!(
        "PROOF: support={:?}, normal={:?}",
        controller.ground_support(),
        controller.contact_normal()
    );
    assert_eq!(controller.ground_support(), GroundSupport::Airborne);
    assert!(!controller.is_grounded());
    assert_relative_eq!(controller.contact_normal().x, 1.0, epsilon = 1e-6);
    assert_relative_eq!(controller.up_axis().x, 1.0, epsilon = 1e-6);
}

#[test]
fn single_slope_contact_uses_its_normal() {
    let mut controller = CharacterController::default();
    let normal = slope(10.0);

    controller.fixed_step(
        DT,
        GRAVITY,
        &[Contact::new(normal, Vec3::ZERO, 0)],
        &standing(),
        &NoGround,
    );

    assert_eq!(controller.ground_support(), GroundSupport::Contact);
    assert_relative_eq!(controller.contact_normal().x, normal.x, epsilon = 1e-6);
    assert_relative_eq!(controller.contact_normal().y, normal.y, epsilon = 1e-6);
}

/// Two ground contacts on opposing slopes average to the up-axis.
#[test]
fn two_ground_contacts_are_averaged() {
    let mut controller = CharacterController::default();
    let contacts = [
        Contact::new(slope(10.0), Vec3::new(0.3, 0.0, 0.0), 0),
        Contact::new(slope(-10.0), Vec3::new(-0.3, 0.0, 0.0), 0),
    ];

    controller.fixed_step(DT, GRAVITY, &contacts, &standing(), &NoGround);

    let normal = controller.contact_normal();
    println!("PROOF: blended normal={:?}", normal);
    assert_eq!(controller.ground_contact_count(), 2);
    assert_relative_eq!(normal.x, 0.0, epsilon = 1e-6);
    assert_relative_eq!(normal.y, 1.0, epsilon = 1e-6);
    assert_eq!(controller.ground_contacts().len(), 2);
}

/// A V-shaped crevice of two steep walls supports the character.
#[test]
fn wedged_between_steep_walls_is_grounded() {
    let mut controller = CharacterController::default();
    let contacts = [
        Contact::new(slope(60.0), Vec3::ZERO, 0),
        Contact::new(slope(-60.0), Vec3::ZERO, 0),
    ];

    controller.fixed_step(DT, GRAVITY, &contacts, &standing(), &NoGround);

    println!("PROOF: support={:?}", controller.ground_support());
    assert_eq!(controller.ground_support(), GroundSupport::SteepSupported);
    assert!(controller.is_grounded());
    assert_relative_eq!(controller.contact_normal().y, 1.0, epsilon = 1e-6);
}

#[test]
fn single_steep_wall_is_not_ground() {
    let mut controller = CharacterController::default();

    controller.fixed_step(
        DT,
        GRAVITY,
        &[Contact::new(slope(60.0), Vec3::ZERO, 0)],
        &standing(),
        &NoGround,
    );

    assert_eq!(controller.ground_support(), GroundSupport::Airborne);
    assert!(controller.is_on_steep());
    assert_relative_eq!(controller.steep_normal().length(), 1.0, epsilon = 1e-6);
}

/// Stairs layers accept steeper surfaces than regular ground.
#[test]
fn stairs_layer_uses_stairs_angle() {
    let config = ControllerConfig::default()
        .with_angles(25.0, 50.0)
        .with_masks(LayerMask::ALL, LayerMask::layer(2));
    let steps = [Contact::new(slope(40.0), Vec3::ZERO, 2)];
    let ramp = [Contact::new(slope(40.0), Vec3::ZERO, 0)];

    let mut on_stairs = CharacterController::new(config).unwrap();
    on_stairs.fixed_step(DT, GRAVITY, &steps, &standing(), &NoGround);
    let mut on_ramp = CharacterController::new(config).unwrap();
    on_ramp.fixed_step(DT, GRAVITY, &ramp, &standing(), &NoGround);

    println!(
        "PROOF: stairs grounded={}, ramp grounded={}",
        on_stairs.is_grounded(),
        on_ramp.is_grounded()
    );
    assert!(on_stairs.is_grounded());
    assert!(!on_ramp.is_grounded());
    assert!(on_ramp.is_on_steep());
}

#[test]
fn ceiling_contacts_are_ignored() {
    let mut controller = CharacterController::default();

    controller.fixed_step(
        DT,
        GRAVITY,
        &[Contact::new(Vec3::NEG_Y, Vec3::new(0.0, 2.0, 0.0), 0)],
        &standing(),
        &NoGround,
    );

    assert!(!controller.is_grounded());
    assert!(!controller.is_on_steep());
}

// ==================== Snapping ====================

/// Cresting a hill: contact is lost for one step but ground is right below.
#[test]
fn snaps_to_ground_after_losing_contact() {
    let mut controller = settled(ControllerConfig::default().with_snapping(100.0, 1.5));
    let body = BodySnapshot::new(
        Vec3::new(0.0, 1.2, 0.0),
        Vec3::new(3.0, 0.5, 0.0),
        Vec3::new(-0.5, 0.2, -0.5),
    );

    let velocity = controller.fixed_step(DT, GRAVITY, &[], &body, &PlaneProbe::flat(0.0));

    println!("PROOF: support={:?}, velocity={:?}", controller.ground_support(), velocity);
    assert_eq!(controller.ground_support(), GroundSupport::Snapped);
    assert!(controller.is_grounded());
    assert!(velocity.y < 0.0, "snapping must remove the upward launch");
    assert!(velocity.x > 2.8);
}

#[test]
fn snap_respects_speed_limit() {
    let mut controller = settled(ControllerConfig::default().with_snapping(1.0, 1.5));
    let body = BodySnapshot::new(Vec3::new(0.0, 1.2, 0.0), Vec3::new(3.0, 0.5, 0.0), Vec3::ZERO);

    controller.fixed_step(DT, GRAVITY, &[], &body, &PlaneProbe::flat(0.0));

    assert_eq!(controller.ground_support(), GroundSupport::Airborne);
}

#[test]
fn snap_respects_probe_mask() {
    let config = ControllerConfig::default()
        .with_snapping(100.0, 1.5)
        .with_masks(LayerMask::layer(0), LayerMask::NONE);
    let mut controller = settled(config);
    let body = BodySnapshot::new(Vec3::new(0.0, 1.2, 0.0), Vec3::X, Vec3::ZERO);

    controller.fixed_step(DT, GRAVITY, &[], &body, &PlaneProbe::flat(0.0).on_layer(3));

    assert_eq!(controller.ground_support(), GroundSupport::Airborne);
}

#[test]
fn snap_only_right_after_losing_contact() {
    let mut controller = settled(ControllerConfig::default().with_snapping(100.0, 1.5));
    airborne_step(&mut controller);

    let body = BodySnapshot::new(Vec3::new(0.0, 1.2, 0.0), Vec3::X, Vec3::ZERO);
    controller.fixed_step(DT, GRAVITY, &[], &body, &PlaneProbe::flat(0.0));

    assert_eq!(controller.steps_since_grounded(), 2);
    assert_eq!(controller.ground_support(), GroundSupport::Airborne);
}

/// The jump must not be cancelled by snapping back onto the ground.
#[test]
fn no_snap_right_after_jump() {
    let mut controller = settled(ControllerConfig::default().with_snapping(100.0, 1.5));
    controller.queue_jump();
    let launch = controller.fixed_step(DT, GRAVITY, &flat_ground(), &standing(), &NoGround);

    let body = BodySnapshot::new(Vec3::new(0.0, 1.1, 0.0), launch, Vec3::ZERO);
    let velocity = controller.fixed_step(DT, GRAVITY, &[], &body, &PlaneProbe::flat(0.0));

    println!("PROOF: velocity after jump step={:?}", velocity);
    assert_eq!(controller.ground_support(), GroundSupport::Airborne);
    assert!(velocity.y > 0.0);
}

// ==================== Jumping ====================

#[test]
fn ground_jump_reaches_launch_speed() {
    let mut controller = settled(ControllerConfig::default().with_jump_height(2.0));
    controller.queue_jump();

    let velocity = controller.fixed_step(DT, GRAVITY, &flat_ground(), &standing(), &NoGround);

    let launch = jump_speed(GRAVITY, 2.0);
    println!("PROOF: launch speed={}, velocity={:?}", launch, velocity);
    assert_relative_eq!(launch, 6.264, epsilon = 1e-3);
    assert_relative_eq!(velocity.y, launch - 9.81 * DT, epsilon = 1e-4);
    assert_eq!(controller.jump_phase(), 1);
    assert_eq!(controller.steps_since_jump(), 0);
}

/// A jump only tops up the speed already moving along the jump direction.
#[test]
fn jump_does_not_stack_on_rising_velocity() {
    let mut controller = settled(ControllerConfig::default());
    controller.queue_jump();
    let body = BodySnapshot::new(Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.0, 10.0, 0.0), Vec3::ZERO);

    let velocity = controller.fixed_step(DT, GRAVITY, &flat_ground(), &body, &NoGround);

    assert_relative_eq!(velocity.y, 10.0 - 9.81 * DT, epsilon = 1e-4);
}

#[test]
fn air_jumps_are_limited() {
    let mut controller = settled(ControllerConfig::default().with_max_air_jumps(2));
    let launched = |v: Vec3| v.y > 0.0;

    controller.queue_jump();
    let ground = controller.fixed_step(DT, GRAVITY, &flat_ground(), &standing(), &NoGround);
    assert!(launched(ground));

    let mut phases = Vec::new();
    let mut results = Vec::new();
    for _ in 0..3 {
        controller.queue_jump();
        results.push(launched(airborne_step(&mut controller)));
        phases.push(controller.jump_phase());
    }

    println!("PROOF: air jump results={:?}, phases={:?}", results, phases);
    assert_eq!(results, vec![true, true, false]);
    assert_eq!(phases, vec![2, 3, 3]);
}

/// Walking off a ledge spends the ground jump.
#[test]
fn falling_off_ledge_spends_ground_jump() {
    let mut controller = settled(ControllerConfig::default().with_max_air_jumps(1));
    airborne_step(&mut controller);

    controller.queue_jump();
    assert!(airborne_step(&mut controller).y > 0.0);
    assert_eq!(controller.jump_phase(), 2);

    controller.queue_jump();
    assert!(airborne_step(&mut controller).y < 0.0);
}

#[test]
fn no_air_jumps_by_default() {
    let mut controller = settled(ControllerConfig::default());
    airborne_step(&mut controller);

    controller.queue_jump();
    let velocity = airborne_step(&mut controller);

    assert_relative_eq!(velocity.y, -9.81 * DT, epsilon = 1e-5);
    assert_eq!(controller.jump_phase(), 0);
}

#[test]
fn wall_jump_pushes_away_from_wall() {
    let mut controller = settled(ControllerConfig::default().with_max_air_jumps(0));
    let wall = [Contact::new(Vec3::X, Vec3::new(-0.5, 1.0, 0.0), 0)];

    controller.queue_jump();
    let velocity = controller.fixed_step(DT, GRAVITY, &wall, &standing(), &NoGround);

    println!("PROOF: wall jump velocity={:?}", velocity);
    assert_relative_eq!(velocity.x, jump_speed(GRAVITY, 1.0), epsilon = 1e-4);
    assert_eq!(controller.jump_phase(), 1);
}

#[test]
fn jump_bias_tilts_wall_jump_upward() {
    let config = ControllerConfig::default().with_jump_bias(true);
    let mut controller = settled(config);
    let wall = [Contact::new(Vec3::X, Vec3::new(-0.5, 1.0, 0.0), 0)];

    controller.queue_jump();
    let velocity = controller.fixed_step(DT, GRAVITY, &wall, &standing(), &NoGround);

    let speed = jump_speed(GRAVITY, 1.0);
    let component = speed * std::f32::consts::FRAC_1_SQRT_2;
    assert_relative_eq!(velocity.x, component, epsilon = 1e-4);
    assert_relative_eq!(velocity.y, component - 9.81 * DT, epsilon = 1e-4);
}

#[test]
fn landing_resets_jump_phase() {
    let mut controller = settled(ControllerConfig::default().with_max_air_jumps(1));
    controller.queue_jump();
    controller.fixed_step(DT, GRAVITY, &flat_ground(), &standing(), &NoGround);
    airborne_step(&mut controller);
    assert_eq!(controller.jump_phase(), 1);

    controller.fixed_step(DT, GRAVITY, &flat_ground(), &standing(), &NoGround);

    assert_eq!(controller.jump_phase(), 0);
}

/// Ground still reported on the step right after a jump does not reset the phase.
#[test]
fn ground_contact_right_after_jump_keeps_phase() {
    let mut controller = settled(ControllerConfig::default());
    controller.queue_jump();
    controller.fixed_step(DT, GRAVITY, &flat_ground(), &standing(), &NoGround);

    controller.fixed_step(DT, GRAVITY, &flat_ground(), &standing(), &NoGround);

    assert_eq!(controller.steps_since_jump(), 1);
    assert_eq!(controller.jump_phase(), 1);
}

// ==================== Movement & Gravity ====================

#[test]
fn acceleration_is_capped_per_step() {
    let config = ControllerConfig::default()
        .with_speeds(10.0, 10.0, 10.0)
        .with_acceleration(30.0, 30.0);
    let mut controller = settled(config);
    controller.set_move_input(Vec2::new(1.0, 0.0));

    let velocity = controller.fixed_step(DT, GRAVITY, &flat_ground(), &standing(), &NoGround);

    assert_relative_eq!(velocity.x, 30.0 * DT, epsilon = 1e-5);
}

#[test]
fn resting_on_slope_does_not_slide() {
    let mut controller = CharacterController::default();
    let normal = slope(20.0);

    let velocity = controller.fixed_step(
        DT,
        GRAVITY,
        &[Contact::new(normal, Vec3::ZERO, 0)],
        &standing(),
        &NoGround,
    );

    let along_slope = velocity - normal * velocity.dot(normal);
    println!("PROOF: velocity={:?}, along slope={:?}", velocity, along_slope);
    assert!(along_slope.length() < 1e-5);
}

#[test]
fn disabled_gravity_keeps_velocity() {
    let mut controller = CharacterController::new(ControllerConfig::default().with_gravity_disabled(true))
        .unwrap();
    let body = BodySnapshot::new(Vec3::ZERO, Vec3::new(0.0, 2.0, 0.0), Vec3::ZERO);

    let velocity = controller.fixed_step(DT, GRAVITY, &[], &body, &NoGround);

    assert_eq!(velocity, Vec3::new(0.0, 2.0, 0.0));
}

#[test]
fn disabled_controller_passes_velocity_through() {
    let mut controller = settled(ControllerConfig::default());
    controller.on_disable(None);
    let body = BodySnapshot::new(Vec3::ZERO, Vec3::new(1.0, 2.0, 3.0), Vec3::ZERO);

    let velocity = controller.fixed_step(DT, GRAVITY, &flat_ground(), &body, &NoGround);

    assert_eq!(velocity, Vec3::new(1.0, 2.0, 3.0));
    assert_eq!(controller.velocity(), Vec3::ZERO);
}
