//! Player input modules.
//!
//! The controller never reads devices directly. It talks to a
//! [`PlayerInputModule`], which turns device state (or a script) into
//! normalized move/aim axes and a jump latch once per frame.

use std::any::Any;
use std::collections::VecDeque;

use bevy::prelude::*;

/// How callers should interpret the aim axes. Informational only; the solver
/// never reads it.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AxisMode {
    /// Joystick-like devices: the axes are a deflection held over time.
    #[default]
    Relative,
    /// Mouse-like devices: the axes are the motion of this frame.
    Absolute,
}

/// Move and aim axes for one frame.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Default)]
pub struct InputAxesData {
    /// Raw move axis (`x` = right, `y` = forward).
    pub move_axis: Vec2,
    /// Move axis clamped to unit length.
    pub move_adjusted: Vec2,
    /// Raw aim axis.
    pub aim_axis: Vec2,
    /// Aim axis after module-specific processing.
    pub aim_adjusted: Vec2,
}

impl InputAxesData {
    /// Build axes from raw values. Diagonal movement is clamped so it is not
    /// faster than straight movement.
    pub fn new(move_axis: Vec2, aim_axis: Vec2) -> Self {
        Self {
            move_axis,
            move_adjusted: move_axis.clamp_length_max(1.0),
            aim_axis,
            aim_adjusted: aim_axis,
        }
    }
}

/// Capability interface between a device (or script) and the controller.
pub trait PlayerInputModule: Send + Sync + 'static {
    /// Advance the module by one frame.
    fn managed_update(&mut self, dt: f32);

    /// Axes produced by the last update.
    fn input_axes(&self) -> InputAxesData;

    /// Zero the axes and drop any latched jump.
    fn clear_input_axes(&mut self);

    fn axis_mode(&self) -> AxisMode;

    /// Whether a jump was requested during the last update.
    fn is_jump_queued(&self) -> bool;

    fn is_sprinting(&self) -> bool {
        false
    }

    fn is_crouching(&self) -> bool {
        false
    }

    /// Whether the module can produce input yet.
    fn is_ready(&self) -> bool {
        true
    }

    /// While blocked the module must report zero axes and no jump.
    fn set_block_input(&mut self, blocked: bool);

    /// Read device state. Only device-polling modules override this.
    fn poll_keyboard(&mut self, _keys: &ButtonInput<KeyCode>) {}

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

// ==================== Keyboard ====================

/// Key assignments for [`KeyboardInputModule`].
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct KeyBindings {
    pub forward: KeyCode,
    pub backward: KeyCode,
    pub left: KeyCode,
    pub right: KeyCode,
    pub aim_up: KeyCode,
    pub aim_down: KeyCode,
    pub aim_left: KeyCode,
    pub aim_right: KeyCode,
    pub jump: KeyCode,
    pub sprint: KeyCode,
    pub crouch: KeyCode,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            forward: KeyCode::KeyW,
            backward: KeyCode::KeyS,
            left: KeyCode::KeyA,
            right: KeyCode::KeyD,
            aim_up: KeyCode::ArrowUp,
            aim_down: KeyCode::ArrowDown,
            aim_left: KeyCode::ArrowLeft,
            aim_right: KeyCode::ArrowRight,
            jump: KeyCode::Space,
            sprint: KeyCode::ShiftLeft,
            crouch: KeyCode::ControlLeft,
        }
    }
}

/// Polls [`ButtonInput<KeyCode>`] directly.
#[derive(Debug, Clone, Default)]
pub struct KeyboardInputModule {
    pub bindings: KeyBindings,
    pub axis_mode: AxisMode,
    raw_move: Vec2,
    raw_aim: Vec2,
    axes: InputAxesData,
    jump_pressed: bool,
    jump_queued: bool,
    sprinting: bool,
    crouching: bool,
    blocked: bool,
}

impl KeyboardInputModule {
    pub fn new(bindings: KeyBindings) -> Self {
        Self {
            bindings,
            ..default()
        }
    }

    /// Builder: set the reported axis mode.
    pub fn with_axis_mode(mut self, mode: AxisMode) -> Self {
        self.axis_mode = mode;
        self
    }
}

fn key_axis(keys: &ButtonInput<KeyCode>, negative: KeyCode, positive: KeyCode) -> f32 {
    let mut value = 0.0;
    if keys.pressed(positive) {
        value += 1.0;
    }
    if keys.pressed(negative) {
        value -= 1.0;
    }
    value
}

impl PlayerInputModule for KeyboardInputModule {
    fn managed_update(&mut self, _dt: f32) {
        self.jump_queued = std::mem::take(&mut self.jump_pressed);
        if self.blocked {
            self.axes = InputAxesData::default();
            self.jump_queued = false;
            return;
        }
        self.axes = InputAxesData::new(self.raw_move, self.raw_aim);
    }

    fn input_axes(&self) -> InputAxesData {
        self.axes
    }

    fn clear_input_axes(&mut self) {
        self.axes = InputAxesData::default();
        self.raw_move = Vec2::ZERO;
        self.raw_aim = Vec2::ZERO;
        self.jump_pressed = false;
        self.jump_queued = false;
    }

    fn axis_mode(&self) -> AxisMode {
        self.axis_mode
    }

    fn is_jump_queued(&self) -> bool {
        self.jump_queued
    }

    fn is_sprinting(&self) -> bool {
        self.sprinting && !self.blocked
    }

    fn is_crouching(&self) -> bool {
        self.crouching && !self.blocked
    }

    fn set_block_input(&mut self, blocked: bool) {
        self.blocked = blocked;
    }

    fn poll_keyboard(&mut self, keys: &ButtonInput<KeyCode>) {
        let b = self.bindings;
        self.raw_move = Vec2::new(
            key_axis(keys, b.left, b.right),
            key_axis(keys, b.backward, b.forward),
        );
        self.raw_aim = Vec2::new(
            key_axis(keys, b.aim_left, b.aim_right),
            key_axis(keys, b.aim_down, b.aim_up),
        );
        self.jump_pressed |= keys.just_pressed(b.jump);
        self.sprinting = keys.pressed(b.sprint);
        self.crouching = keys.pressed(b.crouch);
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ==================== Scripted ====================

/// One entry of a [`ScriptedInputModule`] timeline.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScriptedFrame {
    /// Seconds the values are held for.
    pub duration: f32,
    pub move_axis: Vec2,
    pub aim_axis: Vec2,
    /// Queue a jump when the frame starts.
    pub jump: bool,
    pub sprint: bool,
    pub crouch: bool,
}

impl ScriptedFrame {
    /// Hold a move axis for `duration` seconds.
    pub fn moving(move_axis: Vec2, duration: f32) -> Self {
        Self {
            duration,
            move_axis,
            ..default()
        }
    }

    /// Do nothing for `duration` seconds.
    pub fn idle(duration: f32) -> Self {
        Self {
            duration,
            ..default()
        }
    }

    /// Builder: queue a jump at the start of this frame.
    pub fn with_jump(mut self) -> Self {
        self.jump = true;
        self
    }
}

/// Input driven by code: AI, replays, network or tests.
///
/// Values can be set directly or queued as a timeline of [`ScriptedFrame`]s
/// that is advanced by `dt` on every update.
#[derive(Debug, Clone, Default)]
pub struct ScriptedInputModule {
    pub axis_mode: AxisMode,
    move_axis: Vec2,
    aim_axis: Vec2,
    axes: InputAxesData,
    jump_pending: bool,
    jump_queued: bool,
    sprinting: bool,
    crouching: bool,
    blocked: bool,
    not_ready: bool,
    script: VecDeque<ScriptedFrame>,
    frame_elapsed: Option<f32>,
    finish_script_next: bool,
}

impl ScriptedInputModule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a module that plays the given timeline.
    pub fn from_script(frames: impl IntoIterator<Item = ScriptedFrame>) -> Self {
        let mut module = Self::new();
        module.queue_frames(frames);
        module
    }

    pub fn set_move_axis(&mut self, move_axis: Vec2) {
        self.move_axis = move_axis;
    }

    pub fn set_aim_axis(&mut self, aim_axis: Vec2) {
        self.aim_axis = aim_axis;
    }

    pub fn set_sprinting(&mut self, sprinting: bool) {
        self.sprinting = sprinting;
    }

    pub fn set_crouching(&mut self, crouching: bool) {
        self.crouching = crouching;
    }

    /// Mark the module as not ready, e.g. while a remote source connects.
    pub fn set_ready(&mut self, ready: bool) {
        self.not_ready = !ready;
    }

    /// Queue a jump for the next update.
    pub fn press_jump(&mut self) {
        self.jump_pending = true;
    }

    /// Append frames to the timeline.
    pub fn queue_frames(&mut self, frames: impl IntoIterator<Item = ScriptedFrame>) {
        self.script.extend(frames);
    }

    /// Whether timeline frames remain.
    pub fn is_playing(&self) -> bool {
        !self.script.is_empty()
    }

    fn advance_script(&mut self, dt: f32) {
        let Some(frame) = self.script.front().copied() else {
            return;
        };
        let elapsed = match self.frame_elapsed {
            Some(elapsed) => elapsed,
            None => {
                self.move_axis = frame.move_axis;
                self.aim_axis = frame.aim_axis;
                self.sprinting = frame.sprint;
                self.crouching = frame.crouch;
                self.jump_pending |= frame.jump;
                0.0
            }
        };
        let elapsed = elapsed + dt;
        if elapsed >= frame.duration {
            self.script.pop_front();
            self.frame_elapsed = None;
            if self.script.is_empty() {
                // The last frame's values are applied this update, then released.
                self.finish_script_next = true;
            }
        } else {
            self.frame_elapsed = Some(elapsed);
        }
    }
}

impl PlayerInputModule for ScriptedInputModule {
    fn managed_update(&mut self, dt: f32) {
        if std::mem::take(&mut self.finish_script_next) {
            self.move_axis = Vec2::ZERO;
            self.aim_axis = Vec2::ZERO;
            self.sprinting = false;
            self.crouching = false;
        }
        self.advance_script(dt);
        self.jump_queued = std::mem::take(&mut self.jump_pending);
        if self.blocked {
            self.axes = InputAxesData::default();
            self.jump_queued = false;
            return;
        }
        self.axes = InputAxesData::new(self.move_axis, self.aim_axis);
    }

    fn input_axes(&self) -> InputAxesData {
        self.axes
    }

    fn clear_input_axes(&mut self) {
        self.axes = InputAxesData::default();
        self.move_axis = Vec2::ZERO;
        self.aim_axis = Vec2::ZERO;
        self.jump_pending = false;
        self.jump_queued = false;
    }

    fn axis_mode(&self) -> AxisMode {
        self.axis_mode
    }

    fn is_jump_queued(&self) -> bool {
        self.jump_queued
    }

    fn is_sprinting(&self) -> bool {
        self.sprinting && !self.blocked
    }

    fn is_crouching(&self) -> bool {
        self.crouching && !self.blocked
    }

    fn is_ready(&self) -> bool {
        !self.not_ready
    }

    fn set_block_input(&mut self, blocked: bool) {
        self.blocked = blocked;
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ==================== Components ====================

/// The input module driving a character.
#[derive(Component)]
pub struct CharacterInput {
    module: Box<dyn PlayerInputModule>,
}

impl CharacterInput {
    pub fn new(module: impl PlayerInputModule) -> Self {
        Self {
            module: Box::new(module),
        }
    }

    /// Keyboard input with default bindings.
    pub fn keyboard() -> Self {
        Self::new(KeyboardInputModule::default())
    }

    /// Scripted input with nothing queued.
    pub fn scripted() -> Self {
        Self::new(ScriptedInputModule::new())
    }

    pub fn module(&self) -> &dyn PlayerInputModule {
        self.module.as_ref()
    }

    pub fn module_mut(&mut self) -> &mut dyn PlayerInputModule {
        self.module.as_mut()
    }

    /// Access the concrete module, e.g. to drive a [`ScriptedInputModule`].
    pub fn downcast_mut<T: PlayerInputModule>(&mut self) -> Option<&mut T> {
        self.module.as_any_mut().downcast_mut::<T>()
    }
}

impl std::fmt::Debug for CharacterInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CharacterInput")
            .field("axes", &self.module.input_axes())
            .field("axis_mode", &self.module.axis_mode())
            .finish()
    }
}

/// World-space axes the move input is expressed in, usually a camera's.
///
/// Without this component the controller uses world `X` as right and `-Z`
/// as forward.
#[derive(Component, Reflect, Debug, Clone, Copy, PartialEq)]
#[reflect(Component)]
pub struct InputSpace {
    pub right: Vec3,
    pub forward: Vec3,
}

impl Default for InputSpace {
    fn default() -> Self {
        Self {
            right: Vec3::X,
            forward: Vec3::NEG_Z,
        }
    }
}

impl InputSpace {
    /// Axes of a transform, e.g. a camera.
    pub fn from_transform(transform: &GlobalTransform) -> Self {
        Self {
            right: *transform.right(),
            forward: *transform.forward(),
        }
    }
}

/// Keep this character's [`InputSpace`] in sync with another entity's
/// transform.
#[derive(Component, Reflect, Debug, Clone, Copy, PartialEq)]
#[reflect(Component)]
#[require(InputSpace)]
pub struct FollowInputSpace(pub Entity);
