//! Input state handed to the emulated console's HID service

use bitflags::bitflags;

use crate::config::PlayerIndex;
use crate::input::capability::GamepadButton;
use crate::input::motion::Vector3;

/// Width of the console's screen in its own coordinates
pub const SWITCH_PANEL_WIDTH: u32 = 1280;
/// Height of the console's screen in its own coordinates
pub const SWITCH_PANEL_HEIGHT: u32 = 720;

bitflags! {
    /// Button bitmask understood by the console
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ControllerKeys: u64 {
        const A = 1 << 0;
        const B = 1 << 1;
        const X = 1 << 2;
        const Y = 1 << 3;
        const L_STICK = 1 << 4;
        const R_STICK = 1 << 5;
        const L = 1 << 6;
        const R = 1 << 7;
        const ZL = 1 << 8;
        const ZR = 1 << 9;
        const PLUS = 1 << 10;
        const MINUS = 1 << 11;
        const DPAD_LEFT = 1 << 12;
        const DPAD_UP = 1 << 13;
        const DPAD_RIGHT = 1 << 14;
        const DPAD_DOWN = 1 << 15;
        const L_STICK_LEFT = 1 << 16;
        const L_STICK_UP = 1 << 17;
        const L_STICK_RIGHT = 1 << 18;
        const L_STICK_DOWN = 1 << 19;
        const R_STICK_LEFT = 1 << 20;
        const R_STICK_UP = 1 << 21;
        const R_STICK_RIGHT = 1 << 22;
        const R_STICK_DOWN = 1 << 23;
        const SL_LEFT = 1 << 24;
        const SR_LEFT = 1 << 25;
        const SL_RIGHT = 1 << 26;
        const SR_RIGHT = 1 << 27;
    }
}

impl ControllerKeys {
    /// Console key for a logical button, if it has one
    pub fn from_button(button: GamepadButton) -> Option<ControllerKeys> {
        let key = match button {
            GamepadButton::A => Self::A,
            GamepadButton::B => Self::B,
            GamepadButton::X => Self::X,
            GamepadButton::Y => Self::Y,
            GamepadButton::LeftStick => Self::L_STICK,
            GamepadButton::RightStick => Self::R_STICK,
            GamepadButton::LeftShoulder => Self::L,
            GamepadButton::RightShoulder => Self::R,
            GamepadButton::LeftTrigger => Self::ZL,
            GamepadButton::RightTrigger => Self::ZR,
            GamepadButton::DpadUp => Self::DPAD_UP,
            GamepadButton::DpadDown => Self::DPAD_DOWN,
            GamepadButton::DpadLeft => Self::DPAD_LEFT,
            GamepadButton::DpadRight => Self::DPAD_RIGHT,
            GamepadButton::Minus => Self::MINUS,
            GamepadButton::Plus => Self::PLUS,
            GamepadButton::SingleLeftTrigger0 => Self::SL_LEFT,
            GamepadButton::SingleRightTrigger0 => Self::SR_LEFT,
            GamepadButton::SingleLeftTrigger1 => Self::SL_RIGHT,
            GamepadButton::SingleRightTrigger1 => Self::SR_RIGHT,
            _ => return None,
        };
        Some(key)
    }
}

/// Stick position in signed 16-bit console units
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct JoystickPosition {
    pub dx: i32,
    pub dy: i32,
}

/// Stick displacement beyond which a direction counts as a pressed button
const STICK_BUTTON_THRESHOLD: i32 = i16::MAX as i32 / 2;

/// Synthesize the stick direction buttons for both sticks
pub fn stick_buttons(left: JoystickPosition, right: JoystickPosition) -> ControllerKeys {
    let mut keys = ControllerKeys::empty();
    let directions = [
        (
            left,
            [
                ControllerKeys::L_STICK_LEFT,
                ControllerKeys::L_STICK_RIGHT,
                ControllerKeys::L_STICK_DOWN,
                ControllerKeys::L_STICK_UP,
            ],
        ),
        (
            right,
            [
                ControllerKeys::R_STICK_LEFT,
                ControllerKeys::R_STICK_RIGHT,
                ControllerKeys::R_STICK_DOWN,
                ControllerKeys::R_STICK_UP,
            ],
        ),
    ];
    for (position, [left, right, down, up]) in directions {
        if position.dx < -STICK_BUTTON_THRESHOLD {
            keys |= left;
        }
        if position.dx > STICK_BUTTON_THRESHOLD {
            keys |= right;
        }
        if position.dy < -STICK_BUTTON_THRESHOLD {
            keys |= down;
        }
        if position.dy > STICK_BUTTON_THRESHOLD {
            keys |= up;
        }
    }
    keys
}

/// Per-player controller state for one frame
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GamepadInput {
    pub player_id: PlayerIndex,
    pub buttons: ControllerKeys,
    pub l_stick: JoystickPosition,
    pub r_stick: JoystickPosition,
}

/// Per-player six-axis sensor state for one frame
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct SixAxisInput {
    pub player_id: PlayerIndex,
    /// Acceleration in g
    pub accelerometer: Vector3,
    /// Angular velocity in revolutions per second
    pub gyroscope: Vector3,
    /// Accumulated rotation in revolutions
    pub rotation: Vector3,
    /// Row-major 3x3 orientation matrix
    pub orientation: [f32; 9],
}

/// Keyboard state: a bitmap of pressed HID usage ids and the modifier mask
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct KeyboardInput {
    pub modifier: u32,
    pub keys: [u64; 4],
}

impl KeyboardInput {
    pub fn is_pressed(&self, usage: u8) -> bool {
        self.keys[usage as usize / 64] & (1u64 << (usage % 64)) != 0
    }
}

/// Mouse state in console screen coordinates
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MouseInput {
    pub x: i32,
    pub y: i32,
    pub buttons: u32,
    pub scroll_x: i32,
    pub scroll_y: i32,
    pub connected: bool,
}

/// One rumble request from the console for one half of a controller
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct VibrationValue {
    pub amplitude_low: f32,
    pub frequency_low: f32,
    pub amplitude_high: f32,
    pub frequency_high: f32,
}

/// Map a host window position to console screen coordinates. The console's
/// image is letterboxed inside the window at the given aspect ratio; positions
/// outside of it map to the origin.
pub fn mouse_screen_position(
    position: (f32, f32),
    client_size: (u32, u32),
    aspect_ratio: f32,
) -> (f32, f32) {
    let (mouse_x, mouse_y) = position;
    let (client_width, client_height) = (client_size.0 as i64, client_size.1 as i64);
    let panel_height = SWITCH_PANEL_HEIGHT as i64;
    let aspect_width = (SWITCH_PANEL_HEIGHT as f32 * aspect_ratio) as i64;
    if aspect_width <= 0 || client_width <= 0 || client_height <= 0 {
        return (0.0, 0.0);
    }

    let (mut screen_width, mut screen_height) = (client_width, client_height);
    if client_width * panel_height > client_height * aspect_width {
        screen_width = client_height * aspect_width / panel_height;
    } else {
        screen_height = client_width * panel_height / aspect_width;
    }
    if screen_width <= 0 || screen_height <= 0 {
        return (0.0, 0.0);
    }

    let start_x = (client_width - screen_width) >> 1;
    let start_y = (client_height - screen_height) >> 1;
    let end_x = start_x + screen_width;
    let end_y = start_y + screen_height;

    let inside = mouse_x >= start_x as f32
        && mouse_y >= start_y as f32
        && mouse_x < end_x as f32
        && mouse_y < end_y as f32;
    if !inside {
        return (0.0, 0.0);
    }

    let screen_x = mouse_x as i64 - start_x;
    let screen_y = mouse_y as i64 - start_y;
    (
        (screen_x * aspect_width / screen_width) as f32,
        (screen_y * panel_height / screen_height) as f32,
    )
}
