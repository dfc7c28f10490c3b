//! The character controller component.
//!
//! [`CharacterController`] owns the persistent solver state of one character
//! and runs the per-step pipeline:
//!
//! 1. fetch gravity and the up-axis,
//! 2. aggregate the step's contacts and classify ground support,
//! 3. steer the velocity along the contact plane,
//! 4. apply a queued jump,
//! 5. integrate gravity.
//!
//! It is plain data plus methods and can be driven without an ECS `World`;
//! the plugin systems in [`crate::systems`] do that wiring for Bevy.

use bevy::prelude::*;

use crate::backend::{ContactReports, GroundProbeHit};
use crate::collision::{BodySnapshot, Contact};
use crate::config::{ConfigError, ControllerConfig, SlopeThresholds};
use crate::contacts::{ContactContext, GroundContactRecord, StepState};
use crate::ground::{classify_ground, GroundProbe, GroundQuery, GroundSupport};
use crate::input::{AxisMode, InputAxesData, InputSpace, PlayerInputModule};
use crate::jump::{apply_gravity, apply_jump};
use crate::movement::{adjust_velocity, desired_velocity, project_direction_on_plane};
use crate::state::MotionState;

/// Changes the controller asks the physics body to make outside the normal
/// velocity write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BodyRequests {
    /// Zero the body's velocity.
    pub reset_velocity: bool,
    /// Lock (`Some(true)`) or unlock (`Some(false)`) the body's translation.
    pub freeze: Option<bool>,
}

impl BodyRequests {
    pub fn is_empty(&self) -> bool {
        !self.reset_velocity && self.freeze.is_none()
    }
}

/// Rigidbody character controller.
///
/// # Example
///
/// ```rust
/// use bevy::prelude::*;
/// use rigid_character_controller::prelude::*;
///
/// let mut controller = CharacterController::new(ControllerConfig::player()).unwrap();
/// let body = BodySnapshot::resting(Vec3::new(0.0, 1.0, 0.0), 1.0);
/// let ground = [Contact::new(Vec3::Y, Vec3::ZERO, 0)];
///
/// controller.fixed_step(1.0 / 60.0, Vec3::new(0.0, -9.81, 0.0), &ground, &body, &NoGround);
/// assert!(controller.is_grounded());
/// ```
#[derive(Component, Reflect, Debug, Clone)]
#[reflect(Component)]
#[require(ContactReports, GroundProbeHit)]
pub struct CharacterController {
    config: ControllerConfig,
    thresholds: SlopeThresholds,
    motion: MotionState,
    support: GroundSupport,
    #[reflect(ignore)]
    last_step: StepState,
    axes: InputAxesData,
    axis_mode: AxisMode,
    jump_queued: bool,
    input_blocked: bool,
    pending_block: Option<bool>,
    enabled: bool,
    #[reflect(ignore)]
    body_requests: BodyRequests,
}

impl Default for CharacterController {
    fn default() -> Self {
        let config = ControllerConfig::default();
        Self {
            config,
            thresholds: config.thresholds(),
            motion: MotionState::default(),
            support: GroundSupport::Airborne,
            last_step: StepState::default(),
            axes: InputAxesData::default(),
            axis_mode: AxisMode::default(),
            jump_queued: false,
            input_blocked: false,
            pending_block: None,
            enabled: true,
            body_requests: BodyRequests::default(),
        }
    }
}

impl CharacterController {
    /// Validate the configuration and create a controller.
    pub fn new(config: ControllerConfig) -> Result<Self, ConfigError> {
        let mut controller = Self::default();
        controller.set_config(config)?;
        Ok(controller)
    }

    /// Replace the configuration. The old one stays active on error.
    pub fn set_config(&mut self, config: ControllerConfig) -> Result<(), ConfigError> {
        config.validate()?;
        if config.probe_mask == config.stairs_mask {
            warn!(
                mask = config.probe_mask.0,
                "probe mask equals stairs mask; stairs layers should be a subset of the probe layers"
            );
        }
        if config.disable_gravity != self.config.disable_gravity {
            self.set_gravity(!config.disable_gravity, false);
        }
        self.config = config;
        self.thresholds = config.thresholds();
        Ok(())
    }

    // ==================== Lifecycle ====================

    /// Resume stepping after [`on_disable`](Self::on_disable). Input latched
    /// while disabled is dropped.
    pub fn on_enable(&mut self, input: Option<&mut dyn PlayerInputModule>) {
        if !self.enabled {
            info!("character controller enabled");
        }
        self.enabled = true;
        self.jump_queued = false;
        if let Some(input) = input {
            input.clear_input_axes();
        }
    }

    /// Stop stepping, zero the velocity and clear the input axes.
    pub fn on_disable(&mut self, input: Option<&mut dyn PlayerInputModule>) {
        if self.enabled {
            info!("character controller disabled");
        }
        self.enabled = false;
        self.motion.velocity = Vec3::ZERO;
        self.motion.desired_velocity = Vec2::ZERO;
        self.axes = InputAxesData::default();
        self.jump_queued = false;
        if let Some(input) = input {
            input.clear_input_axes();
        }
        self.body_requests.reset_velocity = true;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Block or unblock player input. The input module is told on the next
    /// [`update_input`](Self::update_input).
    pub fn set_block_input(&mut self, blocked: bool, message: &str) {
        if blocked {
            info!(reason = message, "input blocked");
        } else {
            info!(reason = message, "input unblocked");
        }
        self.input_blocked = blocked;
        self.pending_block = Some(blocked);
    }

    /// Enable or disable gravity.
    ///
    /// Disabling zeroes the velocity so the character does not drift, and can
    /// additionally lock the body in place.
    pub fn set_gravity(&mut self, enabled: bool, freeze_position: bool) {
        info!(enabled, freeze_position, "gravity toggled");
        self.config.disable_gravity = !enabled;
        if enabled {
            self.body_requests.freeze = Some(false);
        } else {
            self.motion.velocity = Vec3::ZERO;
            self.body_requests.reset_velocity = true;
            self.body_requests.freeze = Some(freeze_position);
        }
    }

    /// Drain pending body changes. Called by the backend glue once per step.
    pub fn take_body_requests(&mut self) -> BodyRequests {
        std::mem::take(&mut self.body_requests)
    }

    // ==================== Per-frame input ====================

    /// Pull input from the module and derive the desired velocity.
    ///
    /// Called once per rendered frame. Jump requests latch until the next
    /// fixed step consumes them. While disabled the module still updates
    /// and its input is dropped.
    pub fn update_input(
        &mut self,
        dt: f32,
        input: &mut dyn PlayerInputModule,
        space: Option<&InputSpace>,
    ) {
        if let Some(blocked) = self.pending_block.take() {
            input.set_block_input(blocked);
        }
        if !input.is_ready() {
            return;
        }
        if !self.enabled {
            input.managed_update(dt);
            return;
        }

        input.managed_update(dt);
        self.axis_mode = input.axis_mode();
        self.axes = if self.input_blocked {
            InputAxesData::default()
        } else {
            input.input_axes()
        };

        let space = space.copied().unwrap_or_default();
        let up = self.motion.up_axis;
        self.motion.right_axis = project_direction_on_plane(space.right, up);
        self.motion.forward_axis = project_direction_on_plane(space.forward, up);
        self.motion.desired_velocity = desired_velocity(self.axes.move_adjusted, &self.config);

        self.jump_queued |= input.is_jump_queued();
    }

    /// Request a jump on the next fixed step without an input module.
    pub fn queue_jump(&mut self) {
        self.jump_queued = true;
    }

    /// Set the move axis (`x` = right, `y` = forward) without an input module.
    pub fn set_move_input(&mut self, move_axis: Vec2) {
        self.axes = InputAxesData::new(move_axis, self.axes.aim_axis);
        self.motion.desired_velocity = desired_velocity(self.axes.move_adjusted, &self.config);
    }

    // ==================== Fixed step ====================

    /// Run one solver step and return the velocity to hand to the body.
    ///
    /// `contacts` are all contacts reported since the previous step; `probe`
    /// answers the downward ground ray.
    pub fn fixed_step<P: GroundProbe + ?Sized>(
        &mut self,
        dt: f32,
        gravity: Vec3,
        contacts: &[Contact],
        body: &BodySnapshot,
        probe: &P,
    ) -> Vec3 {
        if !self.enabled {
            return body.velocity;
        }

        let up = -gravity.normalize_or_zero();
        if up != Vec3::ZERO {
            self.motion.up_axis = up;
        }
        let gravity = if self.config.disable_gravity {
            Vec3::ZERO
        } else {
            gravity
        };

        let ctx = ContactContext {
            up_axis: self.motion.up_axis,
            thresholds: self.thresholds,
            bounds_min: body.bounds_min,
            last_velocity: self.motion.velocity,
            frame_dt: dt,
            fixed_dt: dt,
        };
        let mut step = StepState::new();
        step.evaluate_contacts(contacts, &ctx);

        self.motion.tick_counters();
        self.motion.velocity = body.velocity;

        let query = GroundQuery {
            thresholds: &self.thresholds,
            position: body.position,
            max_snap_speed: self.config.max_snap_speed,
            probe_distance: self.config.probe_distance,
            probe_mask: self.config.probe_mask,
            probe,
        };
        self.support = classify_ground(&mut step, &mut self.motion, &query);

        let acceleration = if self.support.is_grounded() {
            self.config.max_ground_acceleration
        } else {
            self.config.max_air_acceleration
        };
        self.motion.velocity = adjust_velocity(
            self.motion.velocity,
            self.motion.desired_velocity,
            self.motion.right_axis,
            self.motion.forward_axis,
            self.motion.contact_normal,
            acceleration,
            dt,
        );

        if std::mem::take(&mut self.jump_queued) {
            apply_jump(&mut self.motion, &step, &self.config, gravity);
        }

        self.motion.velocity = apply_gravity(
            self.motion.velocity,
            gravity,
            self.motion.contact_normal,
            step.on_ground(),
            dt,
        );

        self.last_step = step;
        self.motion.velocity
    }

    // ==================== Accessors ====================

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn motion(&self) -> &MotionState {
        &self.motion
    }

    pub fn velocity(&self) -> Vec3 {
        self.motion.velocity
    }

    /// Desired planar velocity (`x` = right, `y` = forward).
    pub fn desired_velocity(&self) -> Vec2 {
        self.motion.desired_velocity
    }

    pub fn contact_normal(&self) -> Vec3 {
        self.motion.contact_normal
    }

    pub fn steep_normal(&self) -> Vec3 {
        self.motion.steep_normal
    }

    pub fn up_axis(&self) -> Vec3 {
        self.motion.up_axis
    }

    pub fn is_grounded(&self) -> bool {
        self.support.is_grounded()
    }

    pub fn is_on_steep(&self) -> bool {
        self.last_step.on_steep()
    }

    pub fn ground_support(&self) -> GroundSupport {
        self.support
    }

    /// Ground contacts accepted during the last step.
    pub fn ground_contacts(&self) -> &[GroundContactRecord] {
        self.last_step.ground_contacts()
    }

    pub fn ground_contact_count(&self) -> u32 {
        self.last_step.ground_contact_count()
    }

    pub fn steep_contact_count(&self) -> u32 {
        self.last_step.steep_contact_count()
    }

    pub fn steps_since_grounded(&self) -> u32 {
        self.motion.steps_since_grounded
    }

    pub fn steps_since_jump(&self) -> u32 {
        self.motion.steps_since_jump
    }

    pub fn jump_phase(&self) -> u32 {
        self.motion.jump_phase
    }

    pub fn probe_distance(&self) -> f32 {
        self.config.probe_distance
    }

    pub fn axis_mode(&self) -> AxisMode {
        self.axis_mode
    }

    /// Axes read on the last input update.
    pub fn input_axes(&self) -> InputAxesData {
        self.axes
    }

    pub fn is_input_blocked(&self) -> bool {
        self.input_blocked
    }

    pub fn is_jump_queued(&self) -> bool {
        self.jump_queued
    }
}
