pub mod path;

use std::{io, path::Path};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::input::capability::{GamepadButton, StickId};

/// Represents all possible errors loading an [InputProfile]
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Could not read: {0}")]
    IoError(#[from] io::Error),
    #[error("Unable to deserialize: {0}")]
    DeserializeError(#[from] serde_yaml::Error),
}

/// A named set of player assignments
#[derive(Debug, Deserialize, Serialize, Clone, JsonSchema, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct InputProfile {
    pub version: u32,
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub enable_keyboard: bool,
    #[serde(default)]
    pub enable_mouse: bool,
    #[serde(default)]
    pub players: Vec<InputConfig>,
}

impl InputProfile {
    /// Load an [InputProfile] from the given YAML string
    pub fn from_yaml(content: String) -> Result<InputProfile, LoadError> {
        let profile: InputProfile = serde_yaml::from_str(content.as_str())?;
        Ok(profile)
    }

    /// Load an [InputProfile] from the given YAML file
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<InputProfile, LoadError> {
        let file = std::fs::File::open(path)?;
        let profile: InputProfile = serde_yaml::from_reader(file)?;
        Ok(profile)
    }
}

/// Player slot a controller is assigned to
#[derive(
    Debug, Default, Deserialize, Serialize, Clone, Copy, JsonSchema, PartialEq, Eq, Hash,
)]
#[serde(rename_all = "snake_case")]
pub enum PlayerIndex {
    Player1,
    Player2,
    Player3,
    Player4,
    Player5,
    Player6,
    Player7,
    Player8,
    Handheld,
    #[default]
    Unknown,
}

impl PlayerIndex {
    /// Slot number of this player, or `None` for [PlayerIndex::Unknown]
    pub fn index(self) -> Option<usize> {
        match self {
            PlayerIndex::Unknown => None,
            index => Some(index as usize),
        }
    }
}

/// Controller layout presented to the console for a player
#[derive(
    Debug, Default, Deserialize, Serialize, Clone, Copy, JsonSchema, PartialEq, Eq, Hash,
)]
#[serde(rename_all = "snake_case")]
pub enum ControllerType {
    #[default]
    ProController,
    Handheld,
    JoyconPair,
    JoyconLeft,
    JoyconRight,
}

/// Full configuration of one player's controller. Button fields name the
/// logical button read from the device for each console button.
#[derive(Debug, Deserialize, Serialize, Clone, JsonSchema, PartialEq)]
#[serde(rename_all = "snake_case", default)]
pub struct InputConfig {
    /// DriverId of the device, or `JoyConPair` for a paired composite
    pub id: String,
    pub name: String,
    pub player_index: PlayerIndex,
    pub controller_type: ControllerType,
    pub left_joycon: LeftJoyconConfig,
    pub left_joycon_stick: StickConfig,
    pub right_joycon: RightJoyconConfig,
    pub right_joycon_stick: StickConfig,
    pub deadzone_left: f32,
    pub deadzone_right: f32,
    pub range_left: f32,
    pub range_right: f32,
    pub trigger_threshold: f32,
    pub motion: MotionConfig,
    pub rumble: RumbleConfig,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            player_index: PlayerIndex::default(),
            controller_type: ControllerType::default(),
            left_joycon: LeftJoyconConfig::default(),
            left_joycon_stick: StickConfig::left(),
            right_joycon: RightJoyconConfig::default(),
            right_joycon_stick: StickConfig::right(),
            deadzone_left: 0.1,
            deadzone_right: 0.1,
            range_left: 1.0,
            range_right: 1.0,
            trigger_threshold: 0.5,
            motion: MotionConfig::default(),
            rumble: RumbleConfig::default(),
        }
    }
}

impl InputConfig {
    /// Default configuration binding the given device to a player slot
    pub fn new(id: &str, player_index: PlayerIndex, controller_type: ControllerType) -> Self {
        Self {
            id: id.to_string(),
            player_index,
            controller_type,
            ..Default::default()
        }
    }
}

/// Buttons of the left half of a controller
#[derive(Debug, Deserialize, Serialize, Clone, JsonSchema, PartialEq)]
#[serde(rename_all = "snake_case", default)]
pub struct LeftJoyconConfig {
    pub button_minus: GamepadButton,
    pub button_l: GamepadButton,
    pub button_zl: GamepadButton,
    pub button_sl: GamepadButton,
    pub button_sr: GamepadButton,
    pub dpad_up: GamepadButton,
    pub dpad_down: GamepadButton,
    pub dpad_left: GamepadButton,
    pub dpad_right: GamepadButton,
}

impl Default for LeftJoyconConfig {
    fn default() -> Self {
        Self {
            button_minus: GamepadButton::Minus,
            button_l: GamepadButton::LeftShoulder,
            button_zl: GamepadButton::LeftTrigger,
            button_sl: GamepadButton::SingleLeftTrigger0,
            button_sr: GamepadButton::SingleRightTrigger0,
            dpad_up: GamepadButton::DpadUp,
            dpad_down: GamepadButton::DpadDown,
            dpad_left: GamepadButton::DpadLeft,
            dpad_right: GamepadButton::DpadRight,
        }
    }
}

/// Buttons of the right half of a controller
#[derive(Debug, Deserialize, Serialize, Clone, JsonSchema, PartialEq)]
#[serde(rename_all = "snake_case", default)]
pub struct RightJoyconConfig {
    pub button_plus: GamepadButton,
    pub button_r: GamepadButton,
    pub button_zr: GamepadButton,
    pub button_sl: GamepadButton,
    pub button_sr: GamepadButton,
    pub button_x: GamepadButton,
    pub button_b: GamepadButton,
    pub button_y: GamepadButton,
    pub button_a: GamepadButton,
}

impl Default for RightJoyconConfig {
    fn default() -> Self {
        Self {
            button_plus: GamepadButton::Plus,
            button_r: GamepadButton::RightShoulder,
            button_zr: GamepadButton::RightTrigger,
            button_sl: GamepadButton::SingleLeftTrigger1,
            button_sr: GamepadButton::SingleRightTrigger1,
            button_x: GamepadButton::X,
            button_b: GamepadButton::B,
            button_y: GamepadButton::Y,
            button_a: GamepadButton::A,
        }
    }
}

/// Analog stick assignment and transforms
#[derive(Debug, Deserialize, Serialize, Clone, JsonSchema, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct StickConfig {
    /// Physical stick read for this logical stick
    pub joystick: StickId,
    /// Logical button read for the stick click
    pub stick_button: GamepadButton,
    #[serde(default)]
    pub invert_stick_x: bool,
    #[serde(default)]
    pub invert_stick_y: bool,
    #[serde(default)]
    pub rotate90_cw: bool,
    /// Reorient a single Joy-Con stick to the console's stick axes. Disable to
    /// read the raw half orientation.
    #[serde(default = "default_true")]
    pub orientation_swap: bool,
}

impl StickConfig {
    pub fn left() -> Self {
        Self {
            joystick: StickId::Left,
            stick_button: GamepadButton::LeftStick,
            invert_stick_x: false,
            invert_stick_y: false,
            rotate90_cw: false,
            orientation_swap: true,
        }
    }

    pub fn right() -> Self {
        Self {
            joystick: StickId::Right,
            stick_button: GamepadButton::RightStick,
            ..Self::left()
        }
    }
}

/// Motion sensor settings
#[derive(Debug, Deserialize, Serialize, Clone, JsonSchema, PartialEq)]
#[serde(rename_all = "snake_case", default)]
pub struct MotionConfig {
    pub enable_motion: bool,
    /// Gyroscope scale in percent
    pub sensitivity: i32,
    /// Angular velocity in degrees per second below which the gyroscope reads zero
    pub gyro_deadzone: f32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            enable_motion: true,
            sensitivity: 100,
            gyro_deadzone: 1.0,
        }
    }
}

/// Rumble settings
#[derive(Debug, Deserialize, Serialize, Clone, JsonSchema, PartialEq)]
#[serde(rename_all = "snake_case", default)]
pub struct RumbleConfig {
    pub enable_rumble: bool,
    pub strong_rumble: f32,
    pub weak_rumble: f32,
}

impl Default for RumbleConfig {
    fn default() -> Self {
        Self {
            enable_rumble: true,
            strong_rumble: 1.0,
            weak_rumble: 1.0,
        }
    }
}

fn default_true() -> bool {
    true
}
