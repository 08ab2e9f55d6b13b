use evdev::{AbsoluteAxisCode, KeyCode};
use glob_match::glob_match;

use crate::input::host::{DeviceKind, PhysicalAxis, PhysicalButton};

/// Standard gravity, in m/s²
pub const STANDARD_GRAVITY: f32 = 9.80665;

/// Accelerometer units per g used by hid-nintendo when a node reports no
/// resolution
pub const ACCEL_RES_PER_G: i32 = 4096;

/// Gyroscope units per degree per second used by hid-nintendo when a node
/// reports no resolution
pub const GYRO_RES_PER_DPS: i32 = 14247;

/// Name suffix of the motion sensor node created next to a controller
pub const IMU_NAME_SUFFIX: &str = " IMU";

const JOYCON_LEFT_PATTERNS: &[&str] = &["*Joy-Con (L)", "*Left Joy-Con"];
const JOYCON_RIGHT_PATTERNS: &[&str] = &["*Joy-Con (R)", "*Right Joy-Con"];

/// Classify a device by its name
pub fn classify(name: &str) -> DeviceKind {
    if JOYCON_LEFT_PATTERNS.iter().any(|p| glob_match(p, name)) {
        return DeviceKind::JoyConLeft;
    }
    if JOYCON_RIGHT_PATTERNS.iter().any(|p| glob_match(p, name)) {
        return DeviceKind::JoyConRight;
    }
    DeviceKind::Standard
}

pub fn is_imu_name(name: &str) -> bool {
    name.ends_with(IMU_NAME_SUFFIX)
}

/// Key codes reporting the given physical button
pub fn button_codes(button: PhysicalButton) -> &'static [KeyCode] {
    match button {
        PhysicalButton::South => &[KeyCode::BTN_SOUTH],
        PhysicalButton::East => &[KeyCode::BTN_EAST],
        PhysicalButton::West => &[KeyCode::BTN_WEST],
        PhysicalButton::North => &[KeyCode::BTN_NORTH],
        PhysicalButton::Back => &[KeyCode::BTN_SELECT],
        PhysicalButton::Guide => &[KeyCode::BTN_MODE],
        PhysicalButton::Start => &[KeyCode::BTN_START],
        PhysicalButton::LeftStick => &[KeyCode::BTN_THUMBL],
        PhysicalButton::RightStick => &[KeyCode::BTN_THUMBR],
        PhysicalButton::LeftShoulder => &[KeyCode::BTN_TL],
        PhysicalButton::RightShoulder => &[KeyCode::BTN_TR],
        PhysicalButton::DpadUp => &[KeyCode::BTN_DPAD_UP],
        PhysicalButton::DpadDown => &[KeyCode::BTN_DPAD_DOWN],
        PhysicalButton::DpadLeft => &[KeyCode::BTN_DPAD_LEFT],
        PhysicalButton::DpadRight => &[KeyCode::BTN_DPAD_RIGHT],
        PhysicalButton::Misc1 => &[KeyCode::BTN_Z],
        PhysicalButton::RightPaddle1 => &[KeyCode::BTN_TRIGGER_HAPPY1],
        PhysicalButton::LeftPaddle1 => &[KeyCode::BTN_TRIGGER_HAPPY2],
        PhysicalButton::RightPaddle2 => &[KeyCode::BTN_TRIGGER_HAPPY3],
        PhysicalButton::LeftPaddle2 => &[KeyCode::BTN_TRIGGER_HAPPY4],
        PhysicalButton::Touchpad => &[KeyCode::BTN_TOUCH],
    }
}

/// Hat direction standing in for a dpad button on devices without dpad keys.
/// Returns the hat axis and the sign that counts as pressed.
pub fn hat_direction(button: PhysicalButton) -> Option<(AbsoluteAxisCode, i32)> {
    match button {
        PhysicalButton::DpadUp => Some((AbsoluteAxisCode::ABS_HAT0Y, -1)),
        PhysicalButton::DpadDown => Some((AbsoluteAxisCode::ABS_HAT0Y, 1)),
        PhysicalButton::DpadLeft => Some((AbsoluteAxisCode::ABS_HAT0X, -1)),
        PhysicalButton::DpadRight => Some((AbsoluteAxisCode::ABS_HAT0X, 1)),
        _ => None,
    }
}

/// Absolute axis reporting the given physical axis
pub fn axis_code(axis: PhysicalAxis) -> AbsoluteAxisCode {
    match axis {
        PhysicalAxis::LeftX => AbsoluteAxisCode::ABS_X,
        PhysicalAxis::LeftY => AbsoluteAxisCode::ABS_Y,
        PhysicalAxis::RightX => AbsoluteAxisCode::ABS_RX,
        PhysicalAxis::RightY => AbsoluteAxisCode::ABS_RY,
        PhysicalAxis::LeftTrigger => AbsoluteAxisCode::ABS_Z,
        PhysicalAxis::RightTrigger => AbsoluteAxisCode::ABS_RZ,
    }
}

/// Key code of a digital trigger, used when the trigger has no axis
pub fn trigger_key(axis: PhysicalAxis) -> Option<KeyCode> {
    match axis {
        PhysicalAxis::LeftTrigger => Some(KeyCode::BTN_TL2),
        PhysicalAxis::RightTrigger => Some(KeyCode::BTN_TR2),
        _ => None,
    }
}

pub fn is_trigger(axis: PhysicalAxis) -> bool {
    matches!(axis, PhysicalAxis::LeftTrigger | PhysicalAxis::RightTrigger)
}

/// Scale a stick reading from the device range onto the full `i16` range
pub fn normalize_stick(value: i32, minimum: i32, maximum: i32) -> i16 {
    if maximum <= minimum {
        return 0;
    }
    let range = maximum as i64 - minimum as i64;
    let offset = (value as i64 - minimum as i64).clamp(0, range);
    let scaled = offset * u16::MAX as i64 / range + i16::MIN as i64;
    scaled as i16
}

/// Scale a trigger reading from the device range onto `0..=i16::MAX`
pub fn normalize_trigger(value: i32, minimum: i32, maximum: i32) -> i16 {
    if maximum <= minimum {
        return 0;
    }
    let range = maximum as i64 - minimum as i64;
    let offset = (value as i64 - minimum as i64).clamp(0, range);
    (offset * i16::MAX as i64 / range) as i16
}

/// Convert a raw accelerometer reading to m/s²
pub fn accel_to_mps2(value: i32, resolution: i32) -> f32 {
    let resolution = if resolution > 0 {
        resolution
    } else {
        ACCEL_RES_PER_G
    };
    value as f32 / resolution as f32 * STANDARD_GRAVITY
}

/// Convert a raw gyroscope reading to rad/s
pub fn gyro_to_rads(value: i32, resolution: i32) -> f32 {
    let resolution = if resolution > 0 {
        resolution
    } else {
        GYRO_RES_PER_DPS
    };
    (value as f32 / resolution as f32).to_radians()
}
