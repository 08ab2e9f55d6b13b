//! In-memory [HostInput] used to drive the input stack without hardware.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

use crate::input::registry::{JOYCON_LEFT_NAME, JOYCON_RIGHT_NAME};
use crate::sync::LockExt;

use super::{
    DeviceHandle, DeviceKind, EnabledSensors, Guid, HostError, HostEvent, HostInput, InstanceId,
    PhysicalAxis, PhysicalButton, SensorType,
};

/// A simulated physical device
#[derive(Debug, Clone)]
pub struct MockDevice {
    pub name: Option<String>,
    pub guid: Guid,
    pub kind: DeviceKind,
    pub gamepad: bool,
    pub rumble: bool,
    pub sensors: HashSet<SensorType>,
    buttons: HashSet<PhysicalButton>,
    axes: HashMap<PhysicalAxis, i16>,
    sensor_data: HashMap<SensorType, [f32; 3]>,
}

impl MockDevice {
    pub fn new(name: &str, guid: Guid, kind: DeviceKind) -> Self {
        Self {
            name: Some(name.to_string()),
            guid,
            kind,
            gamepad: true,
            rumble: false,
            sensors: HashSet::new(),
            buttons: HashSet::new(),
            axes: HashMap::new(),
            sensor_data: HashMap::new(),
        }
    }

    /// A generic dual-stick controller
    pub fn standard(name: &str) -> Self {
        Self::new(
            name,
            Guid::from_input_id(0x03, 0x045e, 0x028e, 0x0110),
            DeviceKind::Standard,
        )
    }

    pub fn joycon_left() -> Self {
        Self::new(
            JOYCON_LEFT_NAME,
            Guid::from_input_id(0x05, 0x057e, 0x2006, 0x0001),
            DeviceKind::JoyConLeft,
        )
        .with_motion()
        .with_rumble()
    }

    pub fn joycon_right() -> Self {
        Self::new(
            JOYCON_RIGHT_NAME,
            Guid::from_input_id(0x05, 0x057e, 0x2007, 0x0001),
            DeviceKind::JoyConRight,
        )
        .with_motion()
        .with_rumble()
    }

    pub fn with_motion(mut self) -> Self {
        self.sensors.insert(SensorType::Accelerometer);
        self.sensors.insert(SensorType::Gyroscope);
        self
    }

    pub fn with_rumble(mut self) -> Self {
        self.rumble = true;
        self
    }

    pub fn with_kind(mut self, kind: DeviceKind) -> Self {
        self.kind = kind;
        self
    }
}

/// A rumble request observed by the [MockHost]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RumbleCall {
    pub instance: InstanceId,
    pub low: u16,
    pub high: u16,
    pub duration_ms: u32,
}

#[derive(Debug, Default)]
struct MockState {
    devices: HashMap<InstanceId, MockDevice>,
    handles: HashMap<DeviceHandle, InstanceId>,
    enabled_sensors: EnabledSensors,
    events: VecDeque<HostEvent>,
    rumbles: Vec<RumbleCall>,
    next_instance: InstanceId,
    next_handle: u64,
    init_error: Option<String>,
    init_count: usize,
    quit_count: usize,
    failing_reads: bool,
}

/// Simulated host input API
#[derive(Debug, Default)]
pub struct MockHost {
    state: Mutex<MockState>,
}

impl MockHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next calls to [HostInput::init] fail with the given message
    pub fn fail_init(&self, message: &str) {
        self.state.lock_or_recover().init_error = Some(message.to_string());
    }

    /// Make every button, axis and sensor read fail
    pub fn fail_reads(&self, failing: bool) {
        self.state.lock_or_recover().failing_reads = failing;
    }

    /// Attach a device and queue its connect event. Returns its instance id.
    pub fn plug(&self, device: MockDevice) -> InstanceId {
        let mut state = self.state.lock_or_recover();
        state.next_instance += 1;
        let instance = state.next_instance;
        state.devices.insert(instance, device);
        state.events.push_back(HostEvent::Added(instance));
        instance
    }

    /// Detach a device and queue its disconnect event
    pub fn unplug(&self, instance: InstanceId) {
        let mut state = self.state.lock_or_recover();
        state.devices.remove(&instance);
        state.handles.retain(|_, id| *id != instance);
        state.enabled_sensors.remove_device(instance);
        state.events.push_back(HostEvent::Removed(instance));
    }

    /// Queue a battery level change
    pub fn report_battery(&self, instance: InstanceId, percent: Option<u8>) {
        let mut state = self.state.lock_or_recover();
        state.events.push_back(HostEvent::Battery { instance, percent });
    }

    pub fn press(&self, instance: InstanceId, button: PhysicalButton) {
        let mut state = self.state.lock_or_recover();
        if let Some(device) = state.devices.get_mut(&instance) {
            device.buttons.insert(button);
        }
    }

    pub fn release(&self, instance: InstanceId, button: PhysicalButton) {
        let mut state = self.state.lock_or_recover();
        if let Some(device) = state.devices.get_mut(&instance) {
            device.buttons.remove(&button);
        }
    }

    pub fn set_axis(&self, instance: InstanceId, axis: PhysicalAxis, value: i16) {
        let mut state = self.state.lock_or_recover();
        if let Some(device) = state.devices.get_mut(&instance) {
            device.axes.insert(axis, value);
        }
    }

    pub fn set_sensor(&self, instance: InstanceId, sensor: SensorType, value: [f32; 3]) {
        let mut state = self.state.lock_or_recover();
        if let Some(device) = state.devices.get_mut(&instance) {
            device.sensor_data.insert(sensor, value);
        }
    }

    /// All rumble requests received so far
    pub fn rumble_calls(&self) -> Vec<RumbleCall> {
        self.state.lock_or_recover().rumbles.clone()
    }

    pub fn clear_rumble_calls(&self) {
        self.state.lock_or_recover().rumbles.clear();
    }

    /// Number of handles currently open for the given device
    pub fn open_handles(&self, instance: InstanceId) -> usize {
        let state = self.state.lock_or_recover();
        state.handles.values().filter(|id| **id == instance).count()
    }

    pub fn is_sensor_enabled(&self, instance: InstanceId, sensor: SensorType) -> bool {
        let state = self.state.lock_or_recover();
        state.enabled_sensors.contains(instance, sensor)
    }

    pub fn init_count(&self) -> usize {
        self.state.lock_or_recover().init_count
    }

    pub fn quit_count(&self) -> usize {
        self.state.lock_or_recover().quit_count
    }

    fn with_device<T>(
        &self,
        handle: DeviceHandle,
        f: impl FnOnce(InstanceId, &MockDevice) -> Result<T, HostError>,
    ) -> Result<T, HostError> {
        let state = self.state.lock_or_recover();
        let instance = *state
            .handles
            .get(&handle)
            .ok_or(HostError::InvalidHandle(handle))?;
        let device = state
            .devices
            .get(&instance)
            .ok_or(HostError::InvalidHandle(handle))?;
        f(instance, device)
    }

    fn check_reads(&self) -> Result<(), HostError> {
        if self.state.lock_or_recover().failing_reads {
            return Err(HostError::Io("simulated read failure".to_string()));
        }
        Ok(())
    }
}

impl HostInput for MockHost {
    fn init(&self) -> Result<(), HostError> {
        let mut state = self.state.lock_or_recover();
        if let Some(message) = state.init_error.as_ref() {
            return Err(HostError::Init(message.clone()));
        }
        state.init_count += 1;
        Ok(())
    }

    fn quit(&self) {
        let mut state = self.state.lock_or_recover();
        state.quit_count += 1;
        state.handles.clear();
    }

    fn poll_events(&self) -> Vec<HostEvent> {
        self.state.lock_or_recover().events.drain(..).collect()
    }

    fn gamepads(&self) -> Vec<InstanceId> {
        let state = self.state.lock_or_recover();
        let mut ids: Vec<InstanceId> = state
            .devices
            .iter()
            .filter(|(_, device)| device.gamepad)
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        ids
    }

    fn is_gamepad(&self, instance: InstanceId) -> bool {
        let state = self.state.lock_or_recover();
        state.devices.get(&instance).is_some_and(|d| d.gamepad)
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
        self.with_device(handle, |_, _| Ok(())).is_ok()
    }

    fn button(&self, handle: DeviceHandle, button: PhysicalButton) -> Result<bool, HostError> {
        self.check_reads()?;
        self.with_device(handle, |_, device| Ok(device.buttons.contains(&button)))
    }

    fn axis(&self, handle: DeviceHandle, axis: PhysicalAxis) -> Result<i16, HostError> {
        self.check_reads()?;
        self.with_device(handle, |_, device| {
            Ok(device.axes.get(&axis).copied().unwrap_or_default())
        })
    }

    fn has_sensor(&self, handle: DeviceHandle, sensor: SensorType) -> bool {
        self.with_device(handle, |_, device| Ok(device.sensors.contains(&sensor)))
            .unwrap_or(false)
    }

    fn set_sensor_enabled(
        &self,
        handle: DeviceHandle,
        sensor: SensorType,
        enabled: bool,
    ) -> Result<(), HostError> {
        let instance = self.with_device(handle, |instance, device| {
            if !device.sensors.contains(&sensor) {
                return Err(HostError::Unsupported(format!("{sensor:?}")));
            }
            Ok(instance)
        })?;
        let mut state = self.state.lock_or_recover();
        state.enabled_sensors.set(instance, sensor, enabled);
        Ok(())
    }

    fn sensor_data(&self, handle: DeviceHandle, sensor: SensorType) -> Result<[f32; 3], HostError> {
        self.check_reads()?;
        let state = self.state.lock_or_recover();
        let instance = *state
            .handles
            .get(&handle)
            .ok_or(HostError::InvalidHandle(handle))?;
        let device = state
            .devices
            .get(&instance)
            .ok_or(HostError::InvalidHandle(handle))?;
        if !device.sensors.contains(&sensor) {
            return Err(HostError::Unsupported(format!("{sensor:?}")));
        }
        state.enabled_sensors.check(instance, sensor)?;
        Ok(device.sensor_data.get(&sensor).copied().unwrap_or_default())
    }

    fn rumble(
        &self,
        handle: DeviceHandle,
        low: u16,
        high: u16,
        duration_ms: u32,
    ) -> Result<(), HostError> {
        let instance = self.with_device(handle, |instance, device| {
            if !device.rumble {
                return Err(HostError::Unsupported("rumble".to_string()));
            }
            Ok(instance)
        })?;
        self.state.lock_or_recover().rumbles.push(RumbleCall {
            instance,
            low,
            high,
            duration_ms,
        });
        Ok(())
    }
}
