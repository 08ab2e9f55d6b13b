use std::error::Error;
use std::sync::Arc;

use crate::config::{ControllerType, InputConfig, PlayerIndex};
use crate::input::capability::{GamepadButton, GamepadFeatures, MotionId, StickId};
use crate::input::host::mock::{MockDevice, MockHost, RumbleCall};
use crate::input::host::{HostInput, InstanceId, PhysicalAxis, PhysicalButton, SensorType};

use super::joycon::{orient_stick, JoyCon, JoyConSide};
use super::Gamepad;

const EPSILON: f32 = 0.0001;

fn open_half(side: JoyConSide) -> Result<(Arc<MockHost>, InstanceId, JoyCon), Box<dyn Error>> {
    let host = Arc::new(MockHost::new());
    let device = match side {
        JoyConSide::Left => MockDevice::joycon_left(),
        JoyConSide::Right => MockDevice::joycon_right(),
    };
    let instance = host.plug(device);
    let handle = host.open(instance)?;
    let name = host.name_for_id(instance).unwrap_or_default();
    let joycon = JoyCon::new(host.clone(), handle, format!("half-{instance}"), name, side);
    host.clear_rumble_calls();
    Ok((host, instance, joycon))
}

#[test]
fn test_half_only_reports_own_buttons() -> Result<(), Box<dyn Error>> {
    let (host, instance, left) = open_half(JoyConSide::Left)?;
    host.press(instance, PhysicalButton::West);
    host.press(instance, PhysicalButton::Start);

    assert!(left.is_pressed(GamepadButton::DpadUp), "West should be DpadUp");
    assert!(left.is_pressed(GamepadButton::Minus), "Start should be Minus");
    assert!(!left.is_pressed(GamepadButton::Y), "left half has no Y");
    assert!(!left.is_pressed(GamepadButton::Plus), "left half has no Plus");

    let (host, instance, right) = open_half(JoyConSide::Right)?;
    host.press(instance, PhysicalButton::South);
    host.press(instance, PhysicalButton::North);
    assert!(right.is_pressed(GamepadButton::A), "South should be A");
    assert!(right.is_pressed(GamepadButton::Y), "North should be Y");
    assert!(!right.is_pressed(GamepadButton::DpadLeft), "right half has no dpad");

    Ok(())
}

#[test]
fn test_remap_never_leaks_to_wrong_half() -> Result<(), Box<dyn Error>> {
    let mut config = InputConfig::new("right", PlayerIndex::Player1, ControllerType::JoyconRight);
    config.left_joycon.dpad_up = GamepadButton::Y;

    let (host, instance, right) = open_half(JoyConSide::Right)?;
    right.set_configuration(&config);
    host.press(instance, PhysicalButton::North);

    let snapshot = right.mapped_state_snapshot();
    assert!(snapshot.is_pressed(GamepadButton::Y), "Y should still be pressed");
    assert!(
        !snapshot.is_pressed(GamepadButton::DpadUp),
        "right half should never report DpadUp"
    );

    Ok(())
}

#[test]
fn test_left_half_remap_to_other_half_button() -> Result<(), Box<dyn Error>> {
    let mut config = InputConfig::new("left", PlayerIndex::Player1, ControllerType::JoyconLeft);
    config.left_joycon.dpad_up = GamepadButton::Y;

    let (host, instance, left) = open_half(JoyConSide::Left)?;
    left.set_configuration(&config);

    // Y lives on the right half, so nothing on this half can press DpadUp
    let physical = [
        PhysicalButton::West,
        PhysicalButton::East,
        PhysicalButton::South,
        PhysicalButton::North,
        PhysicalButton::Start,
        PhysicalButton::LeftStick,
        PhysicalButton::LeftPaddle1,
        PhysicalButton::LeftPaddle2,
        PhysicalButton::LeftShoulder,
        PhysicalButton::RightShoulder,
    ];
    for button in physical {
        host.press(instance, button);
        let snapshot = left.mapped_state_snapshot();
        assert!(
            !snapshot.is_pressed(GamepadButton::DpadUp),
            "{button:?} should not press DpadUp"
        );
        assert!(!snapshot.is_pressed(GamepadButton::Y), "left half has no Y");
        host.release(instance, button);
    }

    host.press(instance, PhysicalButton::North);
    assert!(
        left.mapped_state_snapshot().is_pressed(GamepadButton::DpadRight),
        "other entries are unaffected"
    );

    Ok(())
}

#[test]
fn test_default_mapping_on_left_half() -> Result<(), Box<dyn Error>> {
    let config = InputConfig::new("left", PlayerIndex::Player1, ControllerType::JoyconLeft);
    let (host, instance, left) = open_half(JoyConSide::Left)?;
    left.set_configuration(&config);

    assert!(!left.mapped_state_snapshot().is_pressed(GamepadButton::DpadUp));
    host.press(instance, PhysicalButton::West);
    assert!(
        left.mapped_state_snapshot().is_pressed(GamepadButton::DpadUp),
        "mapped DpadUp should follow West"
    );
    host.release(instance, PhysicalButton::West);
    assert!(!left.mapped_state_snapshot().is_pressed(GamepadButton::DpadUp));

    Ok(())
}

#[test]
fn test_stick_reads() -> Result<(), Box<dyn Error>> {
    let (host, instance, left) = open_half(JoyConSide::Left)?;
    host.set_axis(instance, PhysicalAxis::LeftX, i16::MAX);

    assert_eq!(left.stick(StickId::Unbound), (0.0, 0.0), "unbound stick is centered");
    assert_eq!(left.stick(StickId::Right), (0.0, 0.0), "left half has no right stick");

    // Held sideways: pushing the stick along X reads as down on the console
    let (x, y) = left.stick(StickId::Left);
    assert!(x.abs() < EPSILON, "x should be centered, got {x}");
    assert!((y + 1.0).abs() < EPSILON, "y should be -1, got {y}");

    let mut config = InputConfig::new("left", PlayerIndex::Player1, ControllerType::JoyconLeft);
    config.left_joycon_stick.orientation_swap = false;
    left.set_configuration(&config);
    let (x, y) = left.stick(StickId::Left);
    assert!((x - 1.0).abs() < EPSILON, "x should be +1, got {x}");
    assert!(y.abs() < EPSILON, "y should be centered, got {y}");

    host.set_axis(instance, PhysicalAxis::LeftX, 0);
    host.set_axis(instance, PhysicalAxis::LeftY, i16::MIN);
    let (_, y) = left.stick(StickId::Left);
    assert!((y - 1.0).abs() < EPSILON, "raw minimum Y should read as up, got {y}");

    Ok(())
}

#[test]
fn test_orient_stick() -> Result<(), Box<dyn Error>> {
    assert_eq!(orient_stick(JoyConSide::Left, 1.0, 0.5), (0.5, -1.0));
    assert_eq!(orient_stick(JoyConSide::Right, 1.0, 0.5), (-0.5, 1.0));
    Ok(())
}

#[test]
fn test_motion_units_and_axes() -> Result<(), Box<dyn Error>> {
    let (host, instance, left) = open_half(JoyConSide::Left)?;
    assert!(left.features().contains(GamepadFeatures::MOTION));
    assert!(host.is_sensor_enabled(instance, SensorType::Gyroscope));
    assert!(host.is_sensor_enabled(instance, SensorType::Accelerometer));

    host.set_sensor(instance, SensorType::Accelerometer, [9.80665, 0.0, 0.0]);
    host.set_sensor(
        instance,
        SensorType::Gyroscope,
        [0.0, 0.0, std::f32::consts::PI],
    );

    let accel = left.motion_data(MotionId::Accelerometer);
    assert!((accel.z - 1.0).abs() < EPSILON, "accel should be 1g on z: {accel:?}");
    let gyro = left.motion_data(MotionId::Gyroscope);
    assert!((gyro.x + 180.0).abs() < 0.01, "gyro should be -180 deg/s on x: {gyro:?}");

    let second = left.motion_data(MotionId::SecondGyroscope);
    assert_eq!(second.length(), 0.0, "a single half has no second stream");

    Ok(())
}

#[test]
fn test_rumble_and_dispose() -> Result<(), Box<dyn Error>> {
    let (host, instance, mut right) = open_half(JoyConSide::Right)?;
    right.rumble(1.0, 0.5, 100);
    assert_eq!(
        host.rumble_calls(),
        vec![RumbleCall {
            instance,
            low: u16::MAX,
            high: 32767,
            duration_ms: 100
        }]
    );

    assert!(right.is_connected());
    assert_eq!(host.open_handles(instance), 1);
    right.dispose();
    right.dispose();
    assert!(!right.is_connected(), "disposed half should be disconnected");
    assert_eq!(host.open_handles(instance), 0, "handle should be closed");

    Ok(())
}

#[test]
fn test_mapped_snapshot_is_stable() -> Result<(), Box<dyn Error>> {
    let config = InputConfig::new("left", PlayerIndex::Player1, ControllerType::JoyconLeft);
    let (host, instance, left) = open_half(JoyConSide::Left)?;
    left.set_configuration(&config);
    host.press(instance, PhysicalButton::LeftPaddle1);
    host.set_axis(instance, PhysicalAxis::LeftX, 1234);
    host.set_axis(instance, PhysicalAxis::LeftY, -4321);

    let first = left.mapped_state_snapshot();
    let second = left.mapped_state_snapshot();
    assert_eq!(first, second, "snapshots should be identical");
    assert!(first.is_pressed(GamepadButton::LeftShoulder));

    Ok(())
}
