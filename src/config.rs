//! Controller configuration.
//!
//! This module defines the tuning parameters of the motion solver: acceleration
//! caps, per-axis speeds, jump height, slope and stair limits, ground snapping
//! and the layer masks used to classify contacts.

use bevy::prelude::*;
use thiserror::Error;

/// Highest supported air-jump budget.
pub const MAX_AIR_JUMPS_LIMIT: u32 = 5;

/// A set of physics layers, one bit per layer index (`0..32`).
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayerMask(pub u32);

impl Default for LayerMask {
    fn default() -> Self {
        Self::ALL
    }
}

impl LayerMask {
    /// Every layer.
    pub const ALL: Self = Self(u32::MAX);
    /// No layer at all.
    pub const NONE: Self = Self(0);

    /// Mask containing a single layer.
    pub fn layer(layer: u32) -> Self {
        Self::NONE.with(layer)
    }

    /// Builder: add a layer to the mask.
    pub fn with(self, layer: u32) -> Self {
        match 1u32.checked_shl(layer) {
            Some(bit) => Self(self.0 | bit),
            None => self,
        }
    }

    /// Whether the given layer index is part of this mask.
    ///
    /// Layer indices outside `0..32` are never contained.
    #[inline]
    pub fn contains(&self, layer: u32) -> bool {
        1u32.checked_shl(layer)
            .map(|bit| self.0 & bit != 0)
            .unwrap_or(false)
    }
}

/// Invalid configuration values.
///
/// These are setup errors: they are reported once when a controller is
/// created or reconfigured, never per step.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("`{name}` must be a finite, non-negative number (got {value})")]
    NegativeOrNonFinite { name: &'static str, value: f32 },
    #[error("`{name}` must be an angle between 0 and 90 degrees (got {value})")]
    AngleOutOfRange { name: &'static str, value: f32 },
    #[error("`max_air_jumps` must be at most 5 (got {0})")]
    TooManyAirJumps(u32),
}

/// Minimum `dot(up, normal)` values derived from the configured angles.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct SlopeThresholds {
    /// `cos(max_ground_angle)`.
    pub ground_min_dot: f32,
    /// `cos(max_stairs_angle)`.
    pub stairs_min_dot: f32,
    /// Layers that use the stairs threshold instead of the ground one.
    pub stairs_mask: LayerMask,
}

impl SlopeThresholds {
    /// Compute thresholds from a configuration.
    pub fn from_config(config: &ControllerConfig) -> Self {
        Self {
            ground_min_dot: config.max_ground_angle.to_radians().cos(),
            stairs_min_dot: config.max_stairs_angle.to_radians().cos(),
            stairs_mask: config.stairs_mask,
        }
    }

    /// Minimum up-dot for a surface on the given layer.
    #[inline]
    pub fn min_dot(&self, layer: u32) -> f32 {
        if self.stairs_mask.contains(layer) {
            self.stairs_min_dot
        } else {
            self.ground_min_dot
        }
    }
}

impl Default for SlopeThresholds {
    fn default() -> Self {
        Self::from_config(&ControllerConfig::default())
    }
}

/// Configuration parameters for the character controller.
///
/// Angles are in degrees, speeds in units/second and accelerations in
/// units/second². The values are only changed through
/// [`CharacterController::set_config`](crate::controller::CharacterController::set_config),
/// which re-validates them.
///
/// The default `stairs_mask` is empty rather than all layers. With the
/// default `probe_mask` of all layers, an all-layers stairs mask would equal
/// the probe mask and apply the steeper stairs angle to every surface.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct ControllerConfig {
    // === Acceleration ===
    /// Maximum velocity change per second while grounded.
    pub max_ground_acceleration: f32,
    /// Maximum velocity change per second while airborne.
    pub max_air_acceleration: f32,

    // === Speed ===
    /// Top speed when pushing forward.
    pub max_speed_forward: f32,
    /// Top speed when pushing backward.
    pub max_speed_backward: f32,
    /// Top speed when strafing.
    pub max_speed_strafe: f32,

    // === Jumping ===
    /// Height reached by a jump from rest.
    pub jump_height: f32,
    /// Number of jumps allowed while airborne.
    pub max_air_jumps: u32,
    /// Blend jump directions toward the up-axis.
    pub use_jump_bias: bool,

    // === Surfaces ===
    /// Steepest slope (degrees) that still counts as ground.
    pub max_ground_angle: f32,
    /// Steepest slope (degrees) that counts as ground on stairs layers.
    pub max_stairs_angle: f32,

    // === Ground Snapping ===
    /// Snapping is skipped above this speed.
    pub max_snap_speed: f32,
    /// Length of the downward ground probe, measured from the body position.
    pub probe_distance: f32,
    /// Layers hit by the ground probe. Should include the stairs layers and
    /// exclude the character itself.
    pub probe_mask: LayerMask,
    /// Layers evaluated against `max_stairs_angle`.
    ///
    /// Defaults to [`LayerMask::NONE`], so every surface uses
    /// `max_ground_angle` until stairs layers are named here. Set it to
    /// [`LayerMask::ALL`] to treat every layer as stairs.
    pub stairs_mask: LayerMask,

    // === Gravity ===
    /// Ignore gravity entirely.
    pub disable_gravity: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            max_ground_acceleration: 10.0,
            max_air_acceleration: 10.0,

            max_speed_forward: 1.0,
            max_speed_backward: 1.0,
            max_speed_strafe: 1.0,

            jump_height: 1.0,
            max_air_jumps: 0,
            use_jump_bias: false,

            max_ground_angle: 25.0,
            max_stairs_angle: 50.0,

            max_snap_speed: 100.0,
            probe_distance: 1.0,
            probe_mask: LayerMask::ALL,
            stairs_mask: LayerMask::NONE,

            disable_gravity: false,
        }
    }
}

impl ControllerConfig {
    /// Create a config tuned for a responsive first-person player.
    pub fn player() -> Self {
        Self {
            max_ground_acceleration: 40.0,
            max_air_acceleration: 8.0,
            max_speed_forward: 6.0,
            max_speed_backward: 4.0,
            max_speed_strafe: 5.0,
            jump_height: 1.2,
            max_snap_speed: 8.0,
            probe_distance: 1.5,
            ..default()
        }
    }

    /// Create a config with air jumps and jump bias for platforming.
    pub fn platformer() -> Self {
        Self {
            max_air_jumps: 1,
            use_jump_bias: true,
            jump_height: 2.0,
            ..Self::player()
        }
    }

    /// Check every value against its valid range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let non_negative = [
            ("max_ground_acceleration", self.max_ground_acceleration),
            ("max_air_acceleration", self.max_air_acceleration),
            ("max_speed_forward", self.max_speed_forward),
            ("max_speed_backward", self.max_speed_backward),
            ("max_speed_strafe", self.max_speed_strafe),
            ("jump_height", self.jump_height),
            ("max_snap_speed", self.max_snap_speed),
            ("probe_distance", self.probe_distance),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::NegativeOrNonFinite { name, value });
            }
        }

        for (name, value) in [
            ("max_ground_angle", self.max_ground_angle),
            ("max_stairs_angle", self.max_stairs_angle),
        ] {
            if !(0.0..=90.0).contains(&value) {
                return Err(ConfigError::AngleOutOfRange { name, value });
            }
        }

        if self.max_air_jumps > MAX_AIR_JUMPS_LIMIT {
            return Err(ConfigError::TooManyAirJumps(self.max_air_jumps));
        }

        Ok(())
    }

    /// Derived slope thresholds.
    pub fn thresholds(&self) -> SlopeThresholds {
        SlopeThresholds::from_config(self)
    }

    /// Builder: set ground and air acceleration.
    pub fn with_acceleration(mut self, ground: f32, air: f32) -> Self {
        self.max_ground_acceleration = ground;
        self.max_air_acceleration = air;
        self
    }

    /// Builder: set forward, backward and strafe speed.
    pub fn with_speeds(mut self, forward: f32, backward: f32, strafe: f32) -> Self {
        self.max_speed_forward = forward;
        self.max_speed_backward = backward;
        self.max_speed_strafe = strafe;
        self
    }

    /// Builder: set jump height.
    pub fn with_jump_height(mut self, height: f32) -> Self {
        self.jump_height = height;
        self
    }

    /// Builder: set the air-jump budget.
    pub fn with_max_air_jumps(mut self, jumps: u32) -> Self {
        self.max_air_jumps = jumps;
        self
    }

    /// Builder: enable or disable jump bias.
    pub fn with_jump_bias(mut self, enabled: bool) -> Self {
        self.use_jump_bias = enabled;
        self
    }

    /// Builder: set ground and stairs angles (degrees).
    pub fn with_angles(mut self, ground: f32, stairs: f32) -> Self {
        self.max_ground_angle = ground;
        self.max_stairs_angle = stairs;
        self
    }

    /// Builder: set ground snapping parameters.
    pub fn with_snapping(mut self, max_snap_speed: f32, probe_distance: f32) -> Self {
        self.max_snap_speed = max_snap_speed;
        self.probe_distance = probe_distance;
        self
    }

    /// Builder: set probe and stairs masks.
    pub fn with_masks(mut self, probe: LayerMask, stairs: LayerMask) -> Self {
        self.probe_mask = probe;
        self.stairs_mask = stairs;
        self
    }

    /// Builder: disable gravity.
    pub fn with_gravity_disabled(mut self, disabled: bool) -> Self {
        self.disable_gravity = disabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    // ==================== LayerMask Tests ====================

    #[test]
    fn layer_mask_contains() {
        let mask = LayerMask::layer(3).with(5);
        assert!(mask.contains(3));
        assert!(mask.contains(5));
        assert!(!mask.contains(4));
        assert!(!mask.contains(40));
    }

    #[test]
    fn layer_mask_all_and_none() {
        assert!(LayerMask::ALL.contains(0));
        assert!(LayerMask::ALL.contains(31));
        assert!(!LayerMask::NONE.contains(0));
    }

    // ==================== Threshold Tests ====================

    #[test]
    fn default_stairs_mask_uses_ground_angle() {
        let config = ControllerConfig::default().with_angles(25.0, 50.0);
        let thresholds = config.thresholds();
        assert_eq!(config.stairs_mask, LayerMask::NONE);
        assert_relative_eq!(thresholds.min_dot(0), thresholds.ground_min_dot);
        assert_relative_eq!(thresholds.min_dot(7), thresholds.ground_min_dot);
    }

    #[test]
    fn thresholds_from_angles() {
        let config = ControllerConfig::default().with_angles(60.0, 0.0);
        let thresholds = config.thresholds();
        assert_relative_eq!(thresholds.ground_min_dot, 0.5, epsilon = 1e-6);
        assert_relative_eq!(thresholds.stairs_min_dot, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn thresholds_pick_stairs_for_stairs_layers() {
        let config = ControllerConfig::default()
            .with_angles(25.0, 50.0)
            .with_masks(LayerMask::ALL, LayerMask::layer(2));
        let thresholds = config.thresholds();
        assert_eq!(thresholds.min_dot(2), thresholds.stairs_min_dot);
        assert_eq!(thresholds.min_dot(0), thresholds.ground_min_dot);
        assert!(thresholds.stairs_min_dot < thresholds.ground_min_dot);
    }

    // ==================== Validation Tests ====================

    #[test]
    fn default_config_is_valid() {
        assert_eq!(ControllerConfig::default().validate(), Ok(()));
        assert_eq!(ControllerConfig::player().validate(), Ok(()));
        assert_eq!(ControllerConfig::platformer().validate(), Ok(()));
    }

    #[test]
    fn negative_probe_distance_is_rejected() {
        let config = ControllerConfig::default().with_snapping(10.0, -1.0);
        assert_eq!(
            config.validate(),
            Err(ConfigError::NegativeOrNonFinite {
                name: "probe_distance",
                value: -1.0
            })
        );
    }

    #[test]
    fn nan_speed_is_rejected() {
        let config = ControllerConfig::default().with_speeds(f32::NAN, 1.0, 1.0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NegativeOrNonFinite {
                name: "max_speed_forward",
                ..
            })
        ));
    }

    #[test]
    fn angle_out_of_range_is_rejected() {
        let config = ControllerConfig::default().with_angles(95.0, 50.0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::AngleOutOfRange {
                name: "max_ground_angle",
                ..
            })
        ));
    }

    #[test]
    fn air_jump_budget_is_capped() {
        let config = ControllerConfig::default().with_max_air_jumps(6);
        assert_eq!(config.validate(), Err(ConfigError::TooManyAirJumps(6)));
    }

    #[test]
    fn platformer_preset_has_air_jumps() {
        let platformer = ControllerConfig::platformer();
        assert_eq!(platformer.max_air_jumps, 1);
        assert!(platformer.use_jump_bias);
    }
}
