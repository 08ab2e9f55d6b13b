use std::collections::HashMap;
use std::io;
use std::mem;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::thread;

use evdev::{
    AbsInfo, AbsoluteAxisCode, Device, FFEffect, FFEffectCode, FFEffectData, FFEffectKind,
    FFReplay, FFTrigger, KeyCode, PropType,
};
use tokio::sync::mpsc::{self, Receiver};

use crate::input::host::{
    DeviceHandle, DeviceKind, EnabledSensors, Guid, HostError, HostEvent, HostInput, InstanceId,
    PhysicalAxis, PhysicalButton, SensorType,
};
use crate::input::registry::{JOYCON_LEFT_NAME, JOYCON_RIGHT_NAME};
use crate::sync::LockExt;
use crate::watcher::{self, WatchEvent};

use super::codes;

/// Directory holding the event device nodes
pub const INPUT_PATH: &str = "/dev/input";

/// Number of polls a newly created node is retried for while udev is still
/// setting up its permissions
const OPEN_RETRIES: u32 = 100;

/// Motion sensor node of a controller
struct ImuNode {
    path: PathBuf,
    phys: Option<String>,
    device: Device,
    accel_resolution: i32,
    gyro_resolution: i32,
}

impl ImuNode {
    fn new(path: PathBuf, device: Device) -> Self {
        let mut accel_resolution = 0;
        let mut gyro_resolution = 0;
        if let Ok(axes) = device.get_absinfo() {
            for (axis, info) in axes {
                if axis == AbsoluteAxisCode::ABS_X {
                    accel_resolution = info.resolution();
                } else if axis == AbsoluteAxisCode::ABS_RX {
                    gyro_resolution = info.resolution();
                }
            }
        }
        Self {
            path,
            phys: device.physical_path().map(str::to_string),
            device,
            accel_resolution,
            gyro_resolution,
        }
    }

    fn read(&self, sensor: SensorType) -> io::Result<[f32; 3]> {
        let axes = match sensor {
            SensorType::Accelerometer => [
                AbsoluteAxisCode::ABS_X,
                AbsoluteAxisCode::ABS_Y,
                AbsoluteAxisCode::ABS_Z,
            ],
            SensorType::Gyroscope => [
                AbsoluteAxisCode::ABS_RX,
                AbsoluteAxisCode::ABS_RY,
                AbsoluteAxisCode::ABS_RZ,
            ],
        };
        let mut values = [0i32; 3];
        for (axis, info) in self.device.get_absinfo()? {
            if let Some(i) = axes.iter().position(|code| *code == axis) {
                values[i] = info.value();
            }
        }
        Ok(values.map(|value| match sensor {
            SensorType::Accelerometer => codes::accel_to_mps2(value, self.accel_resolution),
            SensorType::Gyroscope => codes::gyro_to_rads(value, self.gyro_resolution),
        }))
    }
}

/// An attached gamepad node
struct EvdevDevice {
    path: PathBuf,
    device: Device,
    name: Option<String>,
    guid: Guid,
    kind: DeviceKind,
    phys: Option<String>,
    axes: HashMap<AbsoluteAxisCode, AbsInfo>,
    imu: Option<ImuNode>,
    rumble: Option<FFEffect>,
}

impl EvdevDevice {
    fn new(path: PathBuf, device: Device) -> Self {
        let id = device.input_id();
        let guid = Guid::from_input_id(id.bus_type().0, id.vendor(), id.product(), id.version());
        let kind = device
            .name()
            .map(codes::classify)
            .unwrap_or(DeviceKind::Standard);
        // Joy-Con halves go by the same names on every host
        let name = match kind {
            DeviceKind::JoyConLeft => Some(JOYCON_LEFT_NAME.to_string()),
            DeviceKind::JoyConRight => Some(JOYCON_RIGHT_NAME.to_string()),
            _ => device.name().map(str::to_string),
        };

        let mut axes = HashMap::new();
        match device.get_absinfo() {
            Ok(infos) => axes.extend(infos),
            Err(e) => log::debug!("Failed to read axis info of {path:?}: {e:?}"),
        }

        Self {
            phys: device.physical_path().map(str::to_string),
            path,
            device,
            name,
            guid,
            kind,
            axes,
            imu: None,
            rumble: None,
        }
    }

    fn has_key(&self, key: KeyCode) -> bool {
        self.device
            .supported_keys()
            .is_some_and(|keys| keys.contains(key))
    }

    fn abs_value(&self, axis: AbsoluteAxisCode) -> io::Result<Option<i32>> {
        let value = self
            .device
            .get_absinfo()?
            .find(|(code, _)| *code == axis)
            .map(|(_, info)| info.value());
        Ok(value)
    }

    fn button(&self, button: PhysicalButton) -> io::Result<bool> {
        let keys = codes::button_codes(button);
        if keys.iter().any(|key| self.has_key(*key)) {
            let state = self.device.get_key_state()?;
            return Ok(keys.iter().any(|key| state.contains(*key)));
        }

        // Many controllers report the dpad as a hat instead of keys
        if let Some((hat, sign)) = codes::hat_direction(button) {
            let value = self.abs_value(hat)?.unwrap_or_default();
            return Ok(value.signum() == sign);
        }
        Ok(false)
    }

    fn axis(&self, axis: PhysicalAxis) -> io::Result<i16> {
        let code = codes::axis_code(axis);
        if let Some(info) = self.axes.get(&code) {
            let value = self.abs_value(code)?.unwrap_or(info.value());
            let normalized = if codes::is_trigger(axis) {
                codes::normalize_trigger(value, info.minimum(), info.maximum())
            } else {
                codes::normalize_stick(value, info.minimum(), info.maximum())
            };
            return Ok(normalized);
        }

        // Digital triggers read as fully pulled or released
        if let Some(key) = codes::trigger_key(axis) {
            if self.has_key(key) && self.device.get_key_state()?.contains(key) {
                return Ok(i16::MAX);
            }
        }
        Ok(0)
    }

    fn supports_rumble(&self) -> bool {
        self.device
            .supported_ff()
            .is_some_and(|ff| ff.contains(FFEffectCode::FF_RUMBLE))
    }

    fn rumble(&mut self, low: u16, high: u16, duration_ms: u32) -> io::Result<()> {
        if low == 0 && high == 0 {
            if let Some(effect) = self.rumble.as_mut() {
                effect.stop()?;
            }
            return Ok(());
        }

        let data = FFEffectData {
            direction: 0,
            trigger: FFTrigger {
                button: 0,
                interval: 0,
            },
            replay: FFReplay {
                length: duration_ms.min(u16::MAX as u32) as u16,
                delay: 0,
            },
            kind: FFEffectKind::Rumble {
                strong_magnitude: low,
                weak_magnitude: high,
            },
        };
        match self.rumble.as_mut() {
            Some(effect) => effect.update(data)?,
            None => {
                log::trace!("Uploading FF effect data to {:?}", self.path);
                self.rumble = Some(self.device.upload_ff_effect(data)?);
            }
        }
        if let Some(effect) = self.rumble.as_mut() {
            effect.play(1)?;
        }
        Ok(())
    }
}

#[derive(Default)]
struct EvdevState {
    initialized: bool,
    devices: HashMap<InstanceId, EvdevDevice>,
    handles: HashMap<DeviceHandle, InstanceId>,
    orphan_imus: Vec<ImuNode>,
    enabled_sensors: EnabledSensors,
    watcher: Option<Receiver<WatchEvent>>,
    pending: Vec<(PathBuf, u32)>,
    next_instance: InstanceId,
    next_handle: u64,
}

impl EvdevState {
    fn is_known(&self, path: &Path) -> bool {
        self.devices.values().any(|d| d.path == path)
            || self.devices.values().any(|d| d.imu.as_ref().is_some_and(|imu| imu.path == path))
            || self.orphan_imus.iter().any(|imu| imu.path == path)
    }

    /// Track a newly opened node. Returns the instance id if it is a new
    /// gamepad.
    fn add_device(&mut self, path: PathBuf, device: Device) -> Option<InstanceId> {
        if self.is_known(&path) {
            return None;
        }

        let is_imu = device.name().is_some_and(codes::is_imu_name)
            || device.properties().contains(PropType::ACCELEROMETER);
        if is_imu {
            let imu = ImuNode::new(path, device);
            let owner = self
                .devices
                .values_mut()
                .find(|d| d.imu.is_none() && d.phys.is_some() && d.phys == imu.phys);
            match owner {
                Some(owner) => {
                    log::debug!("Attached motion sensors {:?} to {:?}", imu.path, owner.path);
                    owner.imu = Some(imu);
                }
                None => self.orphan_imus.push(imu),
            }
            return None;
        }

        let is_gamepad = device
            .supported_keys()
            .is_some_and(|keys| keys.contains(KeyCode::BTN_SOUTH));
        if !is_gamepad {
            return None;
        }

        let mut gamepad = EvdevDevice::new(path, device);
        if let Some(i) = self
            .orphan_imus
            .iter()
            .position(|imu| imu.phys.is_some() && imu.phys == gamepad.phys)
        {
            gamepad.imu = Some(self.orphan_imus.swap_remove(i));
        }

        self.next_instance += 1;
        let instance = self.next_instance;
        log::info!(
            "Found gamepad {:?} at {:?} ({:?})",
            gamepad.name,
            gamepad.path,
            gamepad.guid
        );
        self.devices.insert(instance, gamepad);
        Some(instance)
    }

    /// Forget a removed node. Returns the instance id if a gamepad went away.
    fn remove_path(&mut self, path: &Path) -> Option<InstanceId> {
        self.orphan_imus.retain(|imu| imu.path != path);
        for device in self.devices.values_mut() {
            if device.imu.as_ref().is_some_and(|imu| imu.path == path) {
                device.imu = None;
            }
        }

        let instance = self
            .devices
            .iter()
            .find(|(_, d)| d.path == path)
            .map(|(id, _)| *id)?;
        if let Some(device) = self.devices.remove(&instance) {
            if let Some(imu) = device.imu {
                self.orphan_imus.push(imu);
            }
        }
        self.handles.retain(|_, id| *id != instance);
        self.enabled_sensors.remove_device(instance);
        log::info!("Gamepad at {path:?} was removed");
        Some(instance)
    }

    fn device(&self, handle: DeviceHandle) -> Result<&EvdevDevice, HostError> {
        self.handles
            .get(&handle)
            .and_then(|instance| self.devices.get(instance))
            .ok_or(HostError::InvalidHandle(handle))
    }

    fn device_mut(&mut self, handle: DeviceHandle) -> Result<&mut EvdevDevice, HostError> {
        let instance = *self
            .handles
            .get(&handle)
            .ok_or(HostError::InvalidHandle(handle))?;
        self.devices
            .get_mut(&instance)
            .ok_or(HostError::InvalidHandle(handle))
    }
}

/// [HostInput] backed by the Linux evdev interface. Gamepads are the event
/// nodes under [INPUT_PATH] that report a south face button; hot-plug is
/// picked up through an inotify watch on that directory.
#[derive(Default)]
pub struct EvdevHost {
    state: Mutex<EvdevState>,
}

impl EvdevHost {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HostInput for EvdevHost {
    fn init(&self) -> Result<(), HostError> {
        let mut state = self.state.lock_or_recover();
        if state.initialized {
            return Ok(());
        }

        // Watch before enumerating so that no node slips through in between
        let (tx, rx) = mpsc::channel(64);
        thread::Builder::new()
            .name("evdev-watcher".to_string())
            .spawn(move || watcher::watch(INPUT_PATH.to_string(), tx))
            .map_err(|e| HostError::Init(e.to_string()))?;
        state.watcher = Some(rx);

        for (path, device) in evdev::enumerate() {
            state.add_device(path, device);
        }
        state.initialized = true;
        log::debug!("Found {} gamepad(s) under {INPUT_PATH}", state.devices.len());

        Ok(())
    }

    fn quit(&self) {
        // Dropping the receiver stops the watcher thread on its next event
        *self.state.lock_or_recover() = EvdevState::default();
    }

    fn poll_events(&self) -> Vec<HostEvent> {
        let mut state = self.state.lock_or_recover();
        let mut events = Vec::new();

        let mut watch_events = Vec::new();
        if let Some(rx) = state.watcher.as_mut() {
            while let Ok(event) = rx.try_recv() {
                watch_events.push(event);
            }
        }

        for event in watch_events {
            match event {
                WatchEvent::Create { name, base_path } if name.starts_with("event") => {
                    state.pending.push((Path::new(&base_path).join(name), 0));
                }
                WatchEvent::Delete { name, base_path } if name.starts_with("event") => {
                    let path = Path::new(&base_path).join(name);
                    state.pending.retain(|(pending, _)| *pending != path);
                    if let Some(instance) = state.remove_path(&path) {
                        events.push(HostEvent::Removed(instance));
                    }
                }
                _ => (),
            }
        }

        for (path, attempts) in mem::take(&mut state.pending) {
            match Device::open(&path) {
                Ok(device) => {
                    if let Some(instance) = state.add_device(path, device) {
                        events.push(HostEvent::Added(instance));
                    }
                }
                Err(e) if attempts < OPEN_RETRIES => {
                    log::trace!("Unable to open {path:?} yet: {e:?}");
                    state.pending.push((path, attempts + 1));
                }
                Err(e) => log::warn!("Giving up on opening {path:?}: {e:?}"),
            }
        }

        events
    }

    fn gamepads(&self) -> Vec<InstanceId> {
        let state = self.state.lock_or_recover();
        let mut ids: Vec<InstanceId> = state.devices.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    fn is_gamepad(&self, instance: InstanceId) -> bool {
        self.state.lock_or_recover().devices.contains_key(&instance)
    }

    fn name_for_id(&self, instance: InstanceId) -> Option<String> {
        let state = self.state.lock_or_recover();
        state.devices.get(&instance).and_then(|d| d.name.clone())
    }

    fn guid_for_id(&self, instance: InstanceId) -> Option<Guid> {
        let state = self.state.lock_or_recover();
        state.devices.get(&instance).map(|d| d.guid)
    }

    fn kind_for_id(&self, instance: InstanceId) -> DeviceKind {
        let state = self.state.lock_or_recover();
        state
            .devices
            .get(&instance)
            .map(|d| d.kind)
            .unwrap_or_default()
    }

    fn open(&self, instance: InstanceId) -> Result<DeviceHandle, HostError> {
        let mut state = self.state.lock_or_recover();
        if !state.devices.contains_key(&instance) {
            return Err(HostError::UnknownInstance(instance));
        }
        state.next_handle += 1;
        let handle = DeviceHandle(state.next_handle);
        state.handles.insert(handle, instance);
        Ok(handle)
    }

    fn close(&self, handle: DeviceHandle) {
        self.state.lock_or_recover().handles.remove(&handle);
    }

    fn is_connected(&self, handle: DeviceHandle) -> bool {
        self.state.lock_or_recover().device(handle).is_ok()
    }

    fn button(&self, handle: DeviceHandle, button: PhysicalButton) -> Result<bool, HostError> {
        let state = self.state.lock_or_recover();
        Ok(state.device(handle)?.button(button)?)
    }

    fn axis(&self, handle: DeviceHandle, axis: PhysicalAxis) -> Result<i16, HostError> {
        let state = self.state.lock_or_recover();
        Ok(state.device(handle)?.axis(axis)?)
    }

    fn has_sensor(&self, handle: DeviceHandle, _sensor: SensorType) -> bool {
        let state = self.state.lock_or_recover();
        state.device(handle).is_ok_and(|d| d.imu.is_some())
    }

    fn set_sensor_enabled(
        &self,
        handle: DeviceHandle,
        sensor: SensorType,
        enabled: bool,
    ) -> Result<(), HostError> {
        let mut state = self.state.lock_or_recover();
        if state.device(handle)?.imu.is_none() {
            return Err(HostError::Unsupported(format!("{sensor:?}")));
        }
        let Some(instance) = state.handles.get(&handle).copied() else {
            return Err(HostError::InvalidHandle(handle));
        };
        state.enabled_sensors.set(instance, sensor, enabled);
        Ok(())
    }

    fn sensor_data(&self, handle: DeviceHandle, sensor: SensorType) -> Result<[f32; 3], HostError> {
        let state = self.state.lock_or_recover();
        let Some(imu) = state.device(handle)?.imu.as_ref() else {
            return Err(HostError::Unsupported(format!("{sensor:?}")));
        };
        let Some(instance) = state.handles.get(&handle).copied() else {
            return Err(HostError::InvalidHandle(handle));
        };
        state.enabled_sensors.check(instance, sensor)?;
        Ok(imu.read(sensor)?)
    }

    fn rumble(
        &self,
        handle: DeviceHandle,
        low: u16,
        high: u16,
        duration_ms: u32,
    ) -> Result<(), HostError> {
        let mut state = self.state.lock_or_recover();
        let device = state.device_mut(handle)?;
        if !device.supports_rumble() {
            return Err(HostError::Unsupported("rumble".to_string()));
        }
        Ok(device.rumble(low, high, duration_ms)?)
    }
}
