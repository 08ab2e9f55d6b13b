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

/// Which half of a Joy-Con pair a device is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoyConSide {
    Left,
    Right,
}

/// Logical buttons of a left Joy-Con held in the pair orientation, and the
/// physical buttons the host reports them as.
const LEFT_BUTTONS: [(GamepadButton, PhysicalButton); 10] = [
    (GamepadButton::LeftStick, PhysicalButton::LeftStick),
    (GamepadButton::DpadUp, PhysicalButton::West),
    (GamepadButton::DpadDown, PhysicalButton::East),
    (GamepadButton::DpadLeft, PhysicalButton::South),
    (GamepadButton::DpadRight, PhysicalButton::North),
    (GamepadButton::Minus, PhysicalButton::Start),
    (GamepadButton::LeftShoulder, PhysicalButton::LeftPaddle1),
    (GamepadButton::LeftTrigger, PhysicalButton::LeftPaddle2),
    (GamepadButton::SingleRightTrigger0, PhysicalButton::RightShoulder),
    (GamepadButton::SingleLeftTrigger0, PhysicalButton::LeftShoulder),
];

const RIGHT_BUTTONS: [(GamepadButton, PhysicalButton); 10] = [
    (GamepadButton::RightStick, PhysicalButton::LeftStick),
    (GamepadButton::A, PhysicalButton::South),
    (GamepadButton::B, PhysicalButton::West),
    (GamepadButton::X, PhysicalButton::East),
    (GamepadButton::Y, PhysicalButton::North),
    (GamepadButton::Plus, PhysicalButton::Start),
    (GamepadButton::RightShoulder, PhysicalButton::RightPaddle1),
    (GamepadButton::RightTrigger, PhysicalButton::RightPaddle2),
    (GamepadButton::SingleRightTrigger1, PhysicalButton::RightShoulder),
    (GamepadButton::SingleLeftTrigger1, PhysicalButton::LeftShoulder),
];

/// One half of a Joy-Con pair used on its own. Each half only answers for the
/// logical buttons and stick it physically carries.
pub struct JoyCon {
    device: OpenedDevice,
    side: JoyConSide,
    mapping: Mutex<UserMapping>,
}

impl JoyCon {
    pub fn new(
        host: Arc<dyn HostInput>,
        handle: DeviceHandle,
        id: String,
        name: String,
        side: JoyConSide,
    ) -> Self {
        Self {
            device: OpenedDevice::new(host, handle, id, name),
            side,
            mapping: Mutex::new(UserMapping::default()),
        }
    }

    pub fn side(&self) -> JoyConSide {
        self.side
    }

    fn physical_button(&self, button: GamepadButton) -> Option<PhysicalButton> {
        let table = match self.side {
            JoyConSide::Left => &LEFT_BUTTONS,
            JoyConSide::Right => &RIGHT_BUTTONS,
        };
        table
            .iter()
            .find(|(logical, _)| *logical == button)
            .map(|(_, physical)| *physical)
    }

    /// Read the stick with the given mapping's transforms applied
    fn read_stick(&self, mapping: &UserMapping, stick: StickId) -> (f32, f32) {
        if stick == StickId::Unbound || stick != self.own_stick() {
            return (0.0, 0.0);
        }

        let x = normalize_axis(self.device.axis(PhysicalAxis::LeftX));
        let y = -normalize_axis(self.device.axis(PhysicalAxis::LeftY));

        let config = mapping.stick_config(stick);
        let (x, y) = match config {
            Some(config) => apply_stick_transform(config, x, y),
            None => (x, y),
        };

        if config.map_or(true, |config| config.orientation_swap) {
            orient_stick(self.side, x, y)
        } else {
            (x, y)
        }
    }

    /// The logical stick this half's joystick serves
    fn own_stick(&self) -> StickId {
        match self.side {
            JoyConSide::Left => StickId::Left,
            JoyConSide::Right => StickId::Right,
        }
    }
}

/// Turn a stick position read from a lone half into the console's axes. The
/// half is held sideways, so its stick is rotated a quarter turn; the two
/// halves face opposite directions.
pub fn orient_stick(side: JoyConSide, x: f32, y: f32) -> (f32, f32) {
    match side {
        JoyConSide::Left => (y, -x),
        JoyConSide::Right => (-y, x),
    }
}

/// Remap a raw sensor sample into console axes. The sensor is mounted rotated
/// 180 degrees between the two halves.
pub fn orient_motion(side: JoyConSide, values: [f32; 3]) -> Vector3 {
    match side {
        JoyConSide::Left => Vector3::new(-values[2], values[1], values[0]),
        JoyConSide::Right => Vector3::new(values[2], values[1], -values[0]),
    }
}

impl Gamepad for JoyCon {
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
        match self.physical_button(button) {
            Some(physical) => self.device.button(physical),
            None => false,
        }
    }

    fn stick(&self, stick: StickId) -> (f32, f32) {
        let mapping = self.mapping.lock_or_recover();
        self.read_stick(&mapping, stick)
    }

    fn motion_data(&self, motion: MotionId) -> Vector3 {
        let sensor = match motion {
            MotionId::Accelerometer => SensorType::Accelerometer,
            MotionId::Gyroscope => SensorType::Gyroscope,
            _ => return Vector3::ZERO,
        };
        let Some(values) = self.device.sensor(sensor) else {
            return Vector3::ZERO;
        };

        let value = orient_motion(self.side, values);
        match sensor {
            SensorType::Gyroscope => value * (180.0 / PI),
            SensorType::Accelerometer => value / STANDARD_GRAVITY,
        }
    }

    fn rumble(&self, low: f32, high: f32, duration_ms: u32) {
        self.device.rumble(low, high, duration_ms)
    }

    fn set_configuration(&self, config: &InputConfig) {
        let halves = match self.side {
            JoyConSide::Left => MappedHalves::Left,
            JoyConSide::Right => MappedHalves::Right,
        };
        *self.mapping.lock_or_recover() = UserMapping::from_config(config, halves);
        self.set_trigger_threshold(config.trigger_threshold);
    }

    /// Joy-Con triggers are digital
    fn set_trigger_threshold(&self, _threshold: f32) {}

    fn mapped_state_snapshot(&self) -> GamepadStateSnapshot {
        let mapping = self.mapping.lock_or_recover();
        let mut raw = GamepadStateSnapshot::default();
        for button in GamepadButton::ALL {
            raw.set_pressed(button, self.is_pressed(button));
        }
        raw.set_stick(self.own_stick(), self.read_stick(&mapping, self.own_stick()));
        mapping.resolve(&raw)
    }

    fn dispose(&mut self) {
        self.device.close();
    }
}
