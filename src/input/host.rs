#[cfg(any(test, feature = "mock"))]
pub mod mock;
#[cfg(test)]
#[path = "host_test.rs"]
mod host_test;

use std::collections::HashSet;
use std::fmt;
use std::io;

use thiserror::Error;

/// Transient id assigned by the host to a device for as long as it stays
/// plugged in. Not stable across reconnects.
pub type InstanceId = u32;

/// Opaque handle to an opened physical device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceHandle(pub u64);

/// Possible errors reported by a [HostInput] implementation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    #[error("No device with instance id {0}")]
    UnknownInstance(InstanceId),
    #[error("Device handle {0:?} is not open")]
    InvalidHandle(DeviceHandle),
    #[error("Operation not supported: {0}")]
    Unsupported(String),
    #[error("{0:?} sensor is not enabled")]
    SensorDisabled(SensorType),
    #[error("Device I/O failed: {0}")]
    Io(String),
    #[error("Host input initialization failed: {0}")]
    Init(String),
}

impl From<io::Error> for HostError {
    fn from(err: io::Error) -> Self {
        HostError::Io(err.to_string())
    }
}

/// Physical controls as laid out on the device. Face buttons are named by
/// position so that layouts with different labels line up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhysicalButton {
    South,
    East,
    West,
    North,
    Back,
    Guide,
    Start,
    LeftStick,
    RightStick,
    LeftShoulder,
    RightShoulder,
    DpadUp,
    DpadDown,
    DpadLeft,
    DpadRight,
    Misc1,
    RightPaddle1,
    LeftPaddle1,
    RightPaddle2,
    LeftPaddle2,
    Touchpad,
}

/// Physical analog axes, reported as signed 16-bit values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhysicalAxis {
    LeftX,
    LeftY,
    RightX,
    RightY,
    LeftTrigger,
    RightTrigger,
}

/// Motion sensors. Accelerometer data is in m/s², gyroscope data in rad/s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorType {
    Accelerometer,
    Gyroscope,
}

/// Motion sensors switched on per device
#[derive(Debug, Default)]
pub struct EnabledSensors(HashSet<(InstanceId, SensorType)>);

impl EnabledSensors {
    pub fn set(&mut self, instance: InstanceId, sensor: SensorType, enabled: bool) {
        if enabled {
            self.0.insert((instance, sensor));
        } else {
            self.0.remove(&(instance, sensor));
        }
    }

    pub fn contains(&self, instance: InstanceId, sensor: SensorType) -> bool {
        self.0.contains(&(instance, sensor))
    }

    /// Fail with [HostError::SensorDisabled] unless the sensor was enabled
    pub fn check(&self, instance: InstanceId, sensor: SensorType) -> Result<(), HostError> {
        if !self.contains(instance, sensor) {
            return Err(HostError::SensorDisabled(sensor));
        }
        Ok(())
    }

    /// Forget every sensor of a device that went away
    pub fn remove_device(&mut self, instance: InstanceId) {
        self.0.retain(|(id, _)| *id != instance);
    }
}

/// Type classification reported by the host for a device
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    #[default]
    Unknown,
    Standard,
    JoyConLeft,
    JoyConRight,
}

/// 128-bit hardware GUID identifying a device model
#[derive(Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Guid(pub [u8; 16]);

impl Guid {
    /// Build a GUID from the input id of a device. Fields are stored little
    /// endian at the same offsets SDL uses for its joystick GUIDs.
    pub fn from_input_id(bus: u16, vendor: u16, product: u16, version: u16) -> Self {
        let mut data = [0u8; 16];
        data[0..2].copy_from_slice(&bus.to_le_bytes());
        data[4..6].copy_from_slice(&vendor.to_le_bytes());
        data[8..10].copy_from_slice(&product.to_le_bytes());
        data[12..14].copy_from_slice(&version.to_le_bytes());
        Self(data)
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Guid({self})")
    }
}

/// Events reported by the host through [HostInput::poll_events]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    Added(InstanceId),
    Removed(InstanceId),
    Battery {
        instance: InstanceId,
        percent: Option<u8>,
    },
}

/// Host input API. Implementations talk to the operating system; everything
/// above this trait is platform independent.
///
/// Instance-keyed queries identify a device by its [InstanceId]; reads and
/// writes go through a [DeviceHandle] returned by [HostInput::open]. A device
/// may be opened more than once and every handle must be closed separately.
pub trait HostInput: Send + Sync {
    /// Initialize the host subsystem. Called once before any other method.
    fn init(&self) -> Result<(), HostError>;
    /// Tear the host subsystem down. Open handles are invalid afterwards.
    fn quit(&self);
    /// Drain pending connect, disconnect and battery events
    fn poll_events(&self) -> Vec<HostEvent>;

    /// Instance ids of all gamepads currently attached
    fn gamepads(&self) -> Vec<InstanceId>;
    fn is_gamepad(&self, instance: InstanceId) -> bool;
    fn name_for_id(&self, instance: InstanceId) -> Option<String>;
    fn guid_for_id(&self, instance: InstanceId) -> Option<Guid>;
    fn kind_for_id(&self, instance: InstanceId) -> DeviceKind;

    fn open(&self, instance: InstanceId) -> Result<DeviceHandle, HostError>;
    fn close(&self, handle: DeviceHandle);
    fn is_connected(&self, handle: DeviceHandle) -> bool;

    fn button(&self, handle: DeviceHandle, button: PhysicalButton) -> Result<bool, HostError>;
    fn axis(&self, handle: DeviceHandle, axis: PhysicalAxis) -> Result<i16, HostError>;
    fn has_sensor(&self, handle: DeviceHandle, sensor: SensorType) -> bool;
    fn set_sensor_enabled(
        &self,
        handle: DeviceHandle,
        sensor: SensorType,
        enabled: bool,
    ) -> Result<(), HostError>;
    /// Latest sample of a sensor. Fails with [HostError::SensorDisabled]
    /// until the sensor was turned on with [HostInput::set_sensor_enabled].
    fn sensor_data(&self, handle: DeviceHandle, sensor: SensorType) -> Result<[f32; 3], HostError>;
    /// Start a rumble effect. Intensities use the full `u16` range and a
    /// zero/zero call stops any running effect.
    fn rumble(
        &self,
        handle: DeviceHandle,
        low: u16,
        high: u16,
        duration_ms: u32,
    ) -> Result<(), HostError>;
}
