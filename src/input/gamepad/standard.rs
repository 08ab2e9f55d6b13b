use std::f32::consts::PI;
use std::sync::{Arc, Mutex};

use crate::config::InputConfig;
use crate::input::capability::{GamepadButton, GamepadFeatures, MotionId, StickId};
use crate::input::host::{DeviceHandle, HostInput, PhysicalAxis, PhysicalButton, SensorType};
use crate::input::motion::{Vector3, STANDARD_GRAVITY};
use crate::sync::LockExt;

use super::device::OpenedDevice;
use super::mapping::{apply_stick_transform, normalize_axis, MappedHalves, UserMapping};
use super::snapshot::GamepadStateSnapshot;
use super::Gamepad;

/// Digital buttons of a full controller. Face buttons follow the console's
/// positional layout.
const STANDARD_BUTTONS: [(GamepadButton, PhysicalButton); 21] = [
    (GamepadButton::A, PhysicalButton::East),
    (GamepadButton::B, PhysicalButton::South),
    (GamepadButton::X, PhysicalButton::North),
    (GamepadButton::Y, PhysicalButton::West),
    (GamepadButton::LeftStick, PhysicalButton::LeftStick),
    (GamepadButton::RightStick, PhysicalButton::RightStick),
    (GamepadButton::LeftShoulder, PhysicalButton::LeftShoulder),
    (GamepadButton::RightShoulder, PhysicalButton::RightShoulder),
    (GamepadButton::DpadUp, PhysicalButton::DpadUp),
    (GamepadButton::DpadDown, PhysicalButton::DpadDown),
    (GamepadButton::DpadLeft, PhysicalButton::DpadLeft),
    (GamepadButton::DpadRight, PhysicalButton::DpadRight),
    (GamepadButton::Minus, PhysicalButton::Back),
    (GamepadButton::Plus, PhysicalButton::Start),
    (GamepadButton::Guide, PhysicalButton::Guide),
    (GamepadButton::Misc1, PhysicalButton::Misc1),
    (GamepadButton::Paddle1, PhysicalButton::RightPaddle1),
    (GamepadButton::Paddle2, PhysicalButton::LeftPaddle1),
    (GamepadButton::Paddle3, PhysicalButton::RightPaddle2),
    (GamepadButton::Paddle4, PhysicalButton::LeftPaddle2),
    (GamepadButton::Touchpad, PhysicalButton::Touchpad),
];

/// Analog trigger travel above which a trigger reads as pressed until configured
const DEFAULT_TRIGGER_THRESHOLD: f32 = 0.5;

struct StandardState {
    mapping: UserMapping,
    trigger_threshold: f32,
}

impl Default for StandardState {
    fn default() -> Self {
        Self {
            mapping: UserMapping::default(),
            trigger_threshold: DEFAULT_TRIGGER_THRESHOLD,
        }
    }
}

/// A complete controller on a single device
pub struct StandardGamepad {
    device: OpenedDevice,
    state: Mutex<StandardState>,
}

impl StandardGamepad {
    pub fn new(host: Arc<dyn HostInput>, handle: DeviceHandle, id: String, name: String) -> Self {
        Self {
            device: OpenedDevice::new(host, handle, id, name),
            state: Mutex::new(StandardState::default()),
        }
    }

    fn read_button(&self, state: &StandardState, button: GamepadButton) -> bool {
        let trigger = match button {
            GamepadButton::LeftTrigger => Some(PhysicalAxis::LeftTrigger),
            GamepadButton::RightTrigger => Some(PhysicalAxis::RightTrigger),
            _ => None,
        };
        if let Some(axis) = trigger {
            let value = self.device.axis(axis) as f32 / i16::MAX as f32;
            return value > state.trigger_threshold;
        }

        STANDARD_BUTTONS
            .iter()
            .find(|(logical, _)| *logical == button)
            .is_some_and(|(_, physical)| self.device.button(*physical))
    }

    fn read_stick(&self, state: &StandardState, stick: StickId) -> (f32, f32) {
        let (x_axis, y_axis) = match stick {
            StickId::Left => (PhysicalAxis::LeftX, PhysicalAxis::LeftY),
            StickId::Right => (PhysicalAxis::RightX, PhysicalAxis::RightY),
            StickId::Unbound => return (0.0, 0.0),
        };

        let x = normalize_axis(self.device.axis(x_axis));
        let y = -normalize_axis(self.device.axis(y_axis));
        match state.mapping.stick_config(stick) {
            Some(config) => apply_stick_transform(config, x, y),
            None => (x, y),
        }
    }
}

impl Gamepad for StandardGamepad {
    fn id(&self) -> &str {
        self.device.id()
    }

    fn name(&self) -> &str {
        self.device.name()
    }

    fn features(&self) -> GamepadFeatures {
        self.device.features()
    }

    fn is_connected(&self) -> bool {
        self.device.is_connected()
    }

    fn is_pressed(&self, button: GamepadButton) -> bool {
        let state = self.state.lock_or_recover();
        self.read_button(&state, button)
    }

    fn stick(&self, stick: StickId) -> (f32, f32) {
        let state = self.state.lock_or_recover();
        self.read_stick(&state, stick)
    }

    /// Host sensor axes have Y pointing up and Z toward the player; the
    /// console expects Z up.
    fn motion_data(&self, motion: MotionId) -> Vector3 {
        let sensor = match motion {
            MotionId::Accelerometer => SensorType::Accelerometer,
            MotionId::Gyroscope => SensorType::Gyroscope,
            _ => return Vector3::ZERO,
        };
        let Some(values) = self.device.sensor(sensor) else {
            return Vector3::ZERO;
        };

        let value = Vector3::new(values[0], -values[2], values[1]);
        match sensor {
            SensorType::Gyroscope => value * (180.0 / PI),
            SensorType::Accelerometer => value / STANDARD_GRAVITY,
        }
    }

    fn rumble(&self, low: f32, high: f32, duration_ms: u32) {
        self.device.rumble(low, high, duration_ms)
    }

    fn set_configuration(&self, config: &InputConfig) {
        self.state.lock_or_recover().mapping = UserMapping::from_config(config, MappedHalves::Both);
        self.set_trigger_threshold(config.trigger_threshold);
    }

    fn set_trigger_threshold(&self, threshold: f32) {
        self.state.lock_or_recover().trigger_threshold = threshold;
    }

    fn mapped_state_snapshot(&self) -> GamepadStateSnapshot {
        let state = self.state.lock_or_recover();
        let mut raw = GamepadStateSnapshot::default();
        for button in GamepadButton::ALL {
            raw.set_pressed(button, self.read_button(&state, button));
        }
        for stick in [StickId::Left, StickId::Right] {
            raw.set_stick(stick, self.read_stick(&state, stick));
        }
        state.mapping.resolve(&raw)
    }

    fn dispose(&mut self) {
        self.device.close();
    }
}
