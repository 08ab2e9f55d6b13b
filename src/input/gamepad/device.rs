use std::sync::Arc;

use crate::input::capability::GamepadFeatures;
use crate::input::host::{
    DeviceHandle, HostInput, PhysicalAxis, PhysicalButton, SensorType,
};

use super::rumble_intensity;

/// Duration of the probe rumble sent to detect rumble support
const RUMBLE_PROBE_MS: u32 = 100;

/// An opened physical device shared by the single-device gamepad variants.
/// Reads are infallible: host errors are logged and read as defaults.
pub struct OpenedDevice {
    host: Arc<dyn HostInput>,
    handle: Option<DeviceHandle>,
    id: String,
    name: String,
    features: GamepadFeatures,
}

impl OpenedDevice {
    /// Take ownership of an opened handle, probe its features and enable its
    /// motion sensors if it has both.
    pub fn new(host: Arc<dyn HostInput>, handle: DeviceHandle, id: String, name: String) -> Self {
        let mut features = GamepadFeatures::empty();
        if host.has_sensor(handle, SensorType::Accelerometer)
            && host.has_sensor(handle, SensorType::Gyroscope)
        {
            features |= GamepadFeatures::MOTION;
        }
        if host.rumble(handle, 0, 0, RUMBLE_PROBE_MS).is_ok() {
            features |= GamepadFeatures::RUMBLE;
        }

        if features.contains(GamepadFeatures::MOTION) {
            for sensor in [SensorType::Accelerometer, SensorType::Gyroscope] {
                if let Err(e) = host.set_sensor_enabled(handle, sensor, true) {
                    log::error!("Could not enable {sensor:?} on gamepad '{name}' ({id}): {e}");
                }
            }
        }
        log::debug!("Opened gamepad '{name}' ({id}) with features {features:?}");

        Self {
            host,
            handle: Some(handle),
            id,
            name,
            features,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn features(&self) -> GamepadFeatures {
        self.features
    }

    pub fn is_connected(&self) -> bool {
        self.handle
            .is_some_and(|handle| self.host.is_connected(handle))
    }

    pub fn button(&self, button: PhysicalButton) -> bool {
        let Some(handle) = self.handle else {
            return false;
        };
        self.host.button(handle, button).unwrap_or_else(|e| {
            log::debug!("Failed to read {button:?} on '{}': {e}", self.id);
            false
        })
    }

    pub fn axis(&self, axis: PhysicalAxis) -> i16 {
        let Some(handle) = self.handle else {
            return 0;
        };
        self.host.axis(handle, axis).unwrap_or_else(|e| {
            log::debug!("Failed to read {axis:?} on '{}': {e}", self.id);
            0
        })
    }

    /// Raw sensor sample, or `None` if motion is unavailable or the read failed
    pub fn sensor(&self, sensor: SensorType) -> Option<[f32; 3]> {
        if !self.features.contains(GamepadFeatures::MOTION) {
            return None;
        }
        let handle = self.handle?;
        match self.host.sensor_data(handle, sensor) {
            Ok(values) => Some(values),
            Err(e) => {
                log::debug!("Failed to read {sensor:?} on '{}': {e}", self.id);
                None
            }
        }
    }

    pub fn rumble(&self, low: f32, high: f32, duration_ms: u32) {
        if !self.features.contains(GamepadFeatures::RUMBLE) {
            return;
        }
        let Some(handle) = self.handle else {
            return;
        };
        let (low, high) = (rumble_intensity(low), rumble_intensity(high));
        if let Err(e) = self.host.rumble(handle, low, high, duration_ms) {
            log::error!("Rumble failed on '{}': {e}", self.id);
        }
    }

    pub fn close(&mut self) {
        if let Some(handle) = self.handle.take() {
            log::debug!("Closing gamepad '{}' ({})", self.name, self.id);
            self.host.close(handle);
        }
    }
}

impl Drop for OpenedDevice {
    fn drop(&mut self) {
        self.close();
    }
}
