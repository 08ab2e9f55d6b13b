pub mod device;
pub mod joycon;
#[cfg(test)]
mod joycon_test;
pub mod joycon_pair;
pub mod mapping;
pub mod snapshot;
pub mod standard;

use crate::config::InputConfig;

use self::joycon::JoyCon;
use self::joycon_pair::JoyConPair;
use self::snapshot::GamepadStateSnapshot;
use self::standard::StandardGamepad;

use super::capability::{GamepadButton, GamepadFeatures, MotionId, StickId};
use super::motion::Vector3;

/// Logical view of a controller. Reads never fail: a value the device cannot
/// provide reads as released, centered or zero.
pub trait Gamepad: Send + Sync {
    /// DriverId of the device
    fn id(&self) -> &str;
    fn name(&self) -> &str;
    fn features(&self) -> GamepadFeatures;
    fn is_connected(&self) -> bool;
    fn is_pressed(&self, button: GamepadButton) -> bool;
    /// Position of the given logical stick, each component in [-1, 1]
    fn stick(&self, stick: StickId) -> (f32, f32);
    /// Accelerometer data in g, gyroscope data in degrees per second
    fn motion_data(&self, motion: MotionId) -> Vector3;
    /// Rumble with normalized intensities in [0, 1]
    fn rumble(&self, low: f32, high: f32, duration_ms: u32);
    fn set_configuration(&self, config: &InputConfig);
    fn set_trigger_threshold(&self, threshold: f32);
    /// Raw state resolved through the current user mapping
    fn mapped_state_snapshot(&self) -> GamepadStateSnapshot;
    /// Release the underlying device. Safe to call more than once.
    fn dispose(&mut self);

    /// Raw logical state, without the user mapping applied
    fn state_snapshot(&self) -> GamepadStateSnapshot {
        let mut snapshot = GamepadStateSnapshot::default();
        for button in GamepadButton::ALL {
            snapshot.set_pressed(button, self.is_pressed(button));
        }
        for stick in [StickId::Left, StickId::Right] {
            snapshot.set_stick(stick, self.stick(stick));
        }
        snapshot
    }
}

/// Every kind of gamepad the registry can hand out. The variant is chosen once
/// when the device is opened.
pub enum GamepadDevice {
    Standard(StandardGamepad),
    JoyCon(JoyCon),
    JoyConPair(JoyConPair),
}

impl GamepadDevice {
    fn inner(&self) -> &dyn Gamepad {
        match self {
            GamepadDevice::Standard(gamepad) => gamepad,
            GamepadDevice::JoyCon(gamepad) => gamepad,
            GamepadDevice::JoyConPair(gamepad) => gamepad,
        }
    }
}

impl Gamepad for GamepadDevice {
    fn id(&self) -> &str {
        self.inner().id()
    }

    fn name(&self) -> &str {
        self.inner().name()
    }

    fn features(&self) -> GamepadFeatures {
        self.inner().features()
    }

    fn is_connected(&self) -> bool {
        self.inner().is_connected()
    }

    fn is_pressed(&self, button: GamepadButton) -> bool {
        self.inner().is_pressed(button)
    }

    fn stick(&self, stick: StickId) -> (f32, f32) {
        self.inner().stick(stick)
    }

    fn motion_data(&self, motion: MotionId) -> Vector3 {
        self.inner().motion_data(motion)
    }

    fn rumble(&self, low: f32, high: f32, duration_ms: u32) {
        self.inner().rumble(low, high, duration_ms)
    }

    fn set_configuration(&self, config: &InputConfig) {
        self.inner().set_configuration(config)
    }

    fn set_trigger_threshold(&self, threshold: f32) {
        self.inner().set_trigger_threshold(threshold)
    }

    fn mapped_state_snapshot(&self) -> GamepadStateSnapshot {
        self.inner().mapped_state_snapshot()
    }

    fn state_snapshot(&self) -> GamepadStateSnapshot {
        self.inner().state_snapshot()
    }

    fn dispose(&mut self) {
        match self {
            GamepadDevice::Standard(gamepad) => gamepad.dispose(),
            GamepadDevice::JoyCon(gamepad) => gamepad.dispose(),
            GamepadDevice::JoyConPair(gamepad) => gamepad.dispose(),
        }
    }
}

/// Convert a normalized rumble intensity to the host's native range
pub(crate) fn rumble_intensity(value: f32) -> u16 {
    (value.clamp(0.0, 1.0) * u16::MAX as f32) as u16
}
