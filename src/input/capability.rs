use bitflags::bitflags;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Logical gamepad buttons as understood by the emulated console. Physical
/// controls are translated into this space by each [crate::input::gamepad::Gamepad]
/// implementation.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum GamepadButton {
    #[default]
    Unbound,
    A,
    B,
    X,
    Y,
    LeftStick,
    RightStick,
    LeftShoulder,
    RightShoulder,
    LeftTrigger,
    RightTrigger,
    DpadUp,
    DpadDown,
    DpadLeft,
    DpadRight,
    Minus,
    Plus,
    Guide,
    Misc1,
    Paddle1,
    Paddle2,
    Paddle3,
    Paddle4,
    Touchpad,
    SingleLeftTrigger0,
    SingleRightTrigger0,
    SingleLeftTrigger1,
    SingleRightTrigger1,
}

impl GamepadButton {
    pub const COUNT: usize = 28;

    /// Every logical button, in declaration order
    pub const ALL: [GamepadButton; Self::COUNT] = [
        GamepadButton::Unbound,
        GamepadButton::A,
        GamepadButton::B,
        GamepadButton::X,
        GamepadButton::Y,
        GamepadButton::LeftStick,
        GamepadButton::RightStick,
        GamepadButton::LeftShoulder,
        GamepadButton::RightShoulder,
        GamepadButton::LeftTrigger,
        GamepadButton::RightTrigger,
        GamepadButton::DpadUp,
        GamepadButton::DpadDown,
        GamepadButton::DpadLeft,
        GamepadButton::DpadRight,
        GamepadButton::Minus,
        GamepadButton::Plus,
        GamepadButton::Guide,
        GamepadButton::Misc1,
        GamepadButton::Paddle1,
        GamepadButton::Paddle2,
        GamepadButton::Paddle3,
        GamepadButton::Paddle4,
        GamepadButton::Touchpad,
        GamepadButton::SingleLeftTrigger0,
        GamepadButton::SingleRightTrigger0,
        GamepadButton::SingleLeftTrigger1,
        GamepadButton::SingleRightTrigger1,
    ];

    /// Position of this button in per-button state arrays
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Logical analog sticks
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum StickId {
    #[default]
    Unbound,
    Left,
    Right,
}

impl StickId {
    pub const COUNT: usize = 3;

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Motion channels a gamepad can report. The second pair is only served by a
/// paired composite, whose right half carries its own sensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MotionId {
    Invalid,
    Accelerometer,
    Gyroscope,
    SecondAccelerometer,
    SecondGyroscope,
}

bitflags! {
    /// Optional capabilities a gamepad may expose
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct GamepadFeatures: u8 {
        const MOTION = 1 << 0;
        const RUMBLE = 1 << 1;
    }
}
