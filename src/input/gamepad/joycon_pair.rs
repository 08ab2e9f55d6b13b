use std::sync::Mutex;

use crate::config::InputConfig;
use crate::input::capability::{GamepadButton, GamepadFeatures, MotionId, StickId};
use crate::input::motion::Vector3;
use crate::input::registry::{JOYCON_PAIR_ID, JOYCON_PAIR_NAME};
use crate::sync::LockExt;

use super::joycon::JoyCon;
use super::mapping::{MappedHalves, UserMapping};
use super::snapshot::GamepadStateSnapshot;
use super::Gamepad;

/// A left and a right Joy-Con presented as one full controller
pub struct JoyConPair {
    left: Option<JoyCon>,
    right: Option<JoyCon>,
    mapping: Mutex<UserMapping>,
}

impl JoyConPair {
    pub fn new(left: JoyCon, right: JoyCon) -> Self {
        Self {
            left: Some(left),
            right: Some(right),
            mapping: Mutex::new(UserMapping::default()),
        }
    }

    pub fn left(&self) -> Option<&JoyCon> {
        self.left.as_ref()
    }

    pub fn right(&self) -> Option<&JoyCon> {
        self.right.as_ref()
    }

    fn halves(&self) -> impl Iterator<Item = &JoyCon> {
        self.left.iter().chain(self.right.iter())
    }
}

impl Gamepad for JoyConPair {
    fn id(&self) -> &str {
        JOYCON_PAIR_ID
    }

    fn name(&self) -> &str {
        JOYCON_PAIR_NAME
    }

    fn features(&self) -> GamepadFeatures {
        self.halves()
            .fold(GamepadFeatures::empty(), |features, half| {
                features | half.features()
            })
    }

    fn is_connected(&self) -> bool {
        let left = self.left.as_ref().is_some_and(|half| half.is_connected());
        let right = self.right.as_ref().is_some_and(|half| half.is_connected());
        left && right
    }

    fn is_pressed(&self, button: GamepadButton) -> bool {
        self.halves().any(|half| half.is_pressed(button))
    }

    fn stick(&self, stick: StickId) -> (f32, f32) {
        let half = match stick {
            StickId::Left => self.left.as_ref(),
            StickId::Right => self.right.as_ref(),
            StickId::Unbound => None,
        };
        half.map_or((0.0, 0.0), |half| half.stick(stick))
    }

    fn motion_data(&self, motion: MotionId) -> Vector3 {
        let (half, motion) = match motion {
            MotionId::Accelerometer | MotionId::Gyroscope => (self.left.as_ref(), motion),
            MotionId::SecondAccelerometer => (self.right.as_ref(), MotionId::Accelerometer),
            MotionId::SecondGyroscope => (self.right.as_ref(), MotionId::Gyroscope),
            MotionId::Invalid => return Vector3::ZERO,
        };
        half.map_or(Vector3::ZERO, |half| half.motion_data(motion))
    }

    /// The right half carries the low frequency actuator and the left half the
    /// high frequency one. A zero/zero request stops both.
    fn rumble(&self, low: f32, high: f32, duration_ms: u32) {
        if low == 0.0 && high == 0.0 {
            for half in self.halves() {
                half.rumble(0.0, 0.0, duration_ms);
            }
            return;
        }

        if low != 0.0 {
            if let Some(right) = self.right.as_ref() {
                right.rumble(low, low, duration_ms);
            }
        }
        if high != 0.0 {
            if let Some(left) = self.left.as_ref() {
                left.rumble(high, high, duration_ms);
            }
        }
    }

    fn set_configuration(&self, config: &InputConfig) {
        *self.mapping.lock_or_recover() = UserMapping::from_config(config, MappedHalves::Both);
        for half in self.halves() {
            half.set_configuration(config);
        }
    }

    fn set_trigger_threshold(&self, threshold: f32) {
        for half in self.halves() {
            half.set_trigger_threshold(threshold);
        }
    }

    fn mapped_state_snapshot(&self) -> GamepadStateSnapshot {
        let mapping = self.mapping.lock_or_recover();
        let raw = self.state_snapshot();
        mapping.resolve(&raw)
    }

    fn dispose(&mut self) {
        if let Some(mut left) = self.left.take() {
            left.dispose();
        }
        if let Some(mut right) = self.right.take() {
            right.dispose();
        }
    }
}
