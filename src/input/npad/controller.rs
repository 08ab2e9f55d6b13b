use crate::config::{ControllerType, InputConfig};
use crate::input::capability::{GamepadButton, GamepadFeatures, MotionId, StickId};
use crate::input::gamepad::snapshot::GamepadStateSnapshot;
use crate::input::gamepad::{Gamepad, GamepadDevice};
use crate::input::motion::MotionInput;
use crate::input::registry::GamepadRegistry;

use super::hle::{ControllerKeys, GamepadInput, JoystickPosition, SixAxisInput};
use super::service::HidService;

/// Weights used to fold the console's dual-band rumble into one actuator
const RUMBLE_DOMINANT_WEIGHT: f32 = 0.85;
const RUMBLE_SECONDARY_WEIGHT: f32 = 0.15;

/// Apply a radial deadzone to a stick position and rescale the rest of the
/// travel to the full range
pub fn apply_deadzone(x: f32, y: f32, deadzone: f32) -> JoystickPosition {
    let magnitude = (x * x + y * y).sqrt().min(1.0);
    if magnitude <= deadzone {
        return JoystickPosition::default();
    }

    let scale = (magnitude - deadzone) / (1.0 - deadzone);
    JoystickPosition {
        dx: clamp_axis(x / magnitude * scale),
        dy: clamp_axis(y / magnitude * scale),
    }
}

/// Convert a normalized axis value to signed 16-bit console units
pub fn clamp_axis(value: f32) -> i32 {
    if value < 0.0 {
        (value * -(i16::MIN as f32)).max(i16::MIN as f32) as i32
    } else {
        (value * i16::MAX as f32).min(i16::MAX as f32) as i32
    }
}

/// Scale a stick position by the configured range and keep it within the
/// unit circle
pub fn clamp_to_circle(position: JoystickPosition, range: f32) -> JoystickPosition {
    let mut x = position.dx as f32 * range;
    let mut y = position.dy as f32 * range;
    let length = (x * x + y * y).sqrt();
    let max = i16::MAX as f32;
    if length > max {
        x = x / length * max;
        y = y / length * max;
    }
    JoystickPosition {
        dx: x as i32,
        dy: y as i32,
    }
}

/// One player slot: the gamepad bound to it, its configuration and the state
/// last read from it
pub struct NpadController {
    id: Option<String>,
    gamepad: Option<GamepadDevice>,
    config: Option<InputConfig>,
    state: GamepadStateSnapshot,
    left_motion: MotionInput,
    right_motion: MotionInput,
}

impl Default for NpadController {
    fn default() -> Self {
        Self::new()
    }
}

impl NpadController {
    pub fn new() -> Self {
        Self {
            id: None,
            gamepad: None,
            config: None,
            state: GamepadStateSnapshot::default(),
            left_motion: MotionInput::new(),
            right_motion: MotionInput::new(),
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn gamepad(&self) -> Option<&GamepadDevice> {
        self.gamepad.as_ref()
    }

    /// Bind this slot to the device named by the configuration. The previous
    /// gamepad is released if the configuration points elsewhere. Returns
    /// whether a gamepad is bound.
    pub fn update_driver_configuration(
        &mut self,
        registry: &GamepadRegistry,
        config: &InputConfig,
    ) -> bool {
        if self.id.as_deref() != Some(config.id.as_str()) || self.gamepad.is_none() {
            self.dispose();
            self.id = Some(config.id.clone());
            self.gamepad = registry.get_gamepad(&config.id);
            // Force the user configuration onto the new gamepad
            self.config = None;
            match self.gamepad.as_ref() {
                Some(gamepad) => log::debug!("Bound '{}' to {:?}", gamepad.name(), config.player_index),
                None => log::debug!("No gamepad {} for {:?}", config.id, config.player_index),
            }
        }

        self.gamepad.is_some()
    }

    /// Push the configuration to the gamepad if it changed
    pub fn update_user_configuration(&mut self, config: &InputConfig) {
        if self.config.as_ref() == Some(config) {
            return;
        }
        if let Some(gamepad) = self.gamepad.as_ref() {
            gamepad.set_configuration(config);
        }
        self.config = Some(config.clone());
    }

    /// Read the gamepad. `timestamp` is in microseconds.
    pub fn update(&mut self, timestamp: u64) {
        let (Some(gamepad), Some(config)) = (self.gamepad.as_ref(), self.config.as_ref()) else {
            return;
        };

        self.state = gamepad.mapped_state_snapshot();

        let motion = &config.motion;
        if !motion.enable_motion || !gamepad.features().contains(GamepadFeatures::MOTION) {
            return;
        }
        self.left_motion.update(
            gamepad.motion_data(MotionId::Accelerometer),
            gamepad.motion_data(MotionId::Gyroscope),
            timestamp,
            motion.sensitivity,
            motion.gyro_deadzone,
        );
        if config.controller_type == ControllerType::JoyconPair {
            self.right_motion.update(
                gamepad.motion_data(MotionId::SecondAccelerometer),
                gamepad.motion_data(MotionId::SecondGyroscope),
                timestamp,
                motion.sensitivity,
                motion.gyro_deadzone,
            );
        }
    }

    /// Forward the next pending rumble request for this player, if any
    pub fn update_rumble(&self, hid: &dyn HidService) {
        let (Some(gamepad), Some(config)) = (self.gamepad.as_ref(), self.config.as_ref()) else {
            return;
        };
        let Some((left, right)) = hid.dequeue_rumble(config.player_index) else {
            return;
        };
        if !config.rumble.enable_rumble {
            return;
        }

        let low = ((right.amplitude_low * RUMBLE_DOMINANT_WEIGHT
            + right.amplitude_high * RUMBLE_SECONDARY_WEIGHT)
            * config.rumble.strong_rumble)
            .min(1.0);
        let high = ((left.amplitude_low * RUMBLE_SECONDARY_WEIGHT
            + left.amplitude_high * RUMBLE_DOMINANT_WEIGHT)
            * config.rumble.weak_rumble)
            .min(1.0);
        gamepad.rumble(low, high, u32::MAX);
    }

    /// Controller state in console units
    pub fn hle_input_state(&self) -> GamepadInput {
        let Some(config) = self.config.as_ref() else {
            return GamepadInput::default();
        };

        let mut buttons = ControllerKeys::empty();
        for button in self.state.pressed_buttons() {
            if let Some(key) = ControllerKeys::from_button(button) {
                buttons |= key;
            }
        }

        let (lx, ly) = self.state.stick(StickId::Left);
        let (rx, ry) = self.state.stick(StickId::Right);
        GamepadInput {
            player_id: config.player_index,
            buttons,
            l_stick: clamp_to_circle(apply_deadzone(lx, ly, config.deadzone_left), config.range_left),
            r_stick: clamp_to_circle(
                apply_deadzone(rx, ry, config.deadzone_right),
                config.range_right,
            ),
        }
    }

    /// Motion state in console units. `second` selects the stream of the right
    /// half of a pair.
    pub fn hle_motion_state(&self, second: bool) -> SixAxisInput {
        let motion = if second {
            &self.right_motion
        } else {
            &self.left_motion
        };
        SixAxisInput {
            player_id: self
                .config
                .as_ref()
                .map(|config| config.player_index)
                .unwrap_or_default(),
            accelerometer: motion.accelerometer(),
            gyroscope: motion.gyroscope() / 360.0,
            rotation: motion.rotation() / 360.0,
            orientation: motion.orientation(),
        }
    }

    /// Whether the bound gamepad currently reports the given logical button
    pub fn is_pressed(&self, button: GamepadButton) -> bool {
        self.state.is_pressed(button)
    }

    /// Forget state read before input updates were blocked
    pub fn clear(&mut self) {
        self.state = GamepadStateSnapshot::default();
        self.left_motion.reset();
        self.right_motion.reset();
    }

    /// Release the bound gamepad
    pub fn dispose(&mut self) {
        if let Some(mut gamepad) = self.gamepad.take() {
            gamepad.dispose();
        }
    }
}
