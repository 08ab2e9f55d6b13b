use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use crate::sync::LockExt;

use super::driver::{DriverError, HostDriver};
use super::gamepad::joycon::{JoyCon, JoyConSide};
use super::gamepad::joycon_pair::JoyConPair;
use super::gamepad::standard::StandardGamepad;
use super::gamepad::GamepadDevice;
use super::host::{DeviceHandle, DeviceKind, Guid, HostEvent, HostInput, InstanceId};

/// Identity of the synthetic composite formed by a left and a right Joy-Con
pub const JOYCON_PAIR_ID: &str = "JoyConPair";
pub const JOYCON_PAIR_NAME: &str = "Nintendo Switch Joy-Con (L/R)";
pub const JOYCON_LEFT_NAME: &str = "Nintendo Switch Joy-Con (L)";
pub const JOYCON_RIGHT_NAME: &str = "Nintendo Switch Joy-Con (R)";
pub const JOYCON_NAME_PREFIX: &str = "Nintendo Switch Joy-Con";

/// Notification raised when a gamepad identity appears or goes away
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
    Connected(String),
    Disconnected(String),
}

/// Token returned by [GamepadRegistry::subscribe]
pub type SubscriptionId = u64;

type Listener = Arc<dyn Fn(&RegistryEvent) + Send + Sync>;

/// A registered device
#[derive(Debug)]
struct GamepadInfo {
    driver_id: String,
    handle: DeviceHandle,
    kind: DeviceKind,
}

#[derive(Debug, Default)]
struct RegistryState {
    gamepads: HashMap<InstanceId, GamepadInfo>,
    /// DriverIds in connection order
    ids: Vec<String>,
    pair_advertised: bool,
}

impl RegistryState {
    fn is_pair_combinable(&self) -> bool {
        let kinds: Vec<DeviceKind> = self.gamepads.values().map(|info| info.kind).collect();
        kinds.contains(&DeviceKind::JoyConLeft) && kinds.contains(&DeviceKind::JoyConRight)
    }

    /// Update the advertised pair state, returning the notification for an
    /// actual change.
    fn update_pair(&mut self) -> Option<RegistryEvent> {
        let combinable = self.is_pair_combinable();
        if combinable == self.pair_advertised {
            return None;
        }
        self.pair_advertised = combinable;
        let id = JOYCON_PAIR_ID.to_string();
        if combinable {
            log::info!("Joy-Con pair available");
            Some(RegistryEvent::Connected(id))
        } else {
            log::info!("Joy-Con pair no longer available");
            Some(RegistryEvent::Disconnected(id))
        }
    }
}

/// Generate a DriverId for a device that does not collide with any id in use.
/// The GUID is used as-is when free, otherwise a numeric suffix is appended.
pub fn generate_gamepad_id(ids: &[String], guid: &Guid) -> String {
    let base = guid.to_string();
    if !ids.contains(&base) {
        return base;
    }

    let mut suffix: u32 = 1;
    loop {
        let candidate = format!("{base}-{suffix}");
        if !ids.contains(&candidate) {
            return candidate;
        }
        suffix += 1;
    }
}

/// Classify a device by the type reported by the host, falling back to its
/// name. A device whose name cannot be read is never a Joy-Con.
fn classify(host: &dyn HostInput, instance: InstanceId) -> DeviceKind {
    match host.kind_for_id(instance) {
        kind @ (DeviceKind::JoyConLeft | DeviceKind::JoyConRight) => kind,
        kind => match host.name_for_id(instance).as_deref() {
            Some(JOYCON_LEFT_NAME) => DeviceKind::JoyConLeft,
            Some(JOYCON_RIGHT_NAME) => DeviceKind::JoyConRight,
            Some(_) if kind == DeviceKind::Unknown => DeviceKind::Standard,
            _ => kind,
        },
    }
}

/// Tracks connected gamepads, assigns their DriverIds and notices when a left
/// and right Joy-Con can be combined.
///
/// Notifications are delivered on the thread that handled the host event, in
/// the order the events were handled. Listeners may call back into
/// [GamepadRegistry::get_gamepad] but must not feed events to the registry.
pub struct GamepadRegistry {
    driver: Arc<HostDriver>,
    host: Arc<dyn HostInput>,
    state: Mutex<RegistryState>,
    listeners: Mutex<Vec<(SubscriptionId, Listener)>>,
    /// Serializes event handling so notifications keep their order
    dispatch: Mutex<()>,
    next_subscription: AtomicU64,
    host_subscription: Mutex<Option<u64>>,
}

impl GamepadRegistry {
    /// Create a registry on top of the given driver. Takes a reference on the
    /// driver and registers every gamepad that is already attached.
    pub fn new(driver: Arc<HostDriver>) -> Result<Arc<Self>, DriverError> {
        driver.acquire()?;
        let host = driver.host();
        let registry = Arc::new(Self {
            driver: driver.clone(),
            host: host.clone(),
            state: Mutex::new(RegistryState::default()),
            listeners: Mutex::new(Vec::new()),
            dispatch: Mutex::new(()),
            next_subscription: AtomicU64::new(1),
            host_subscription: Mutex::new(None),
        });

        let weak: Weak<Self> = Arc::downgrade(&registry);
        let token = driver.subscribe(Arc::new(move |event: &HostEvent| {
            let Some(registry) = weak.upgrade() else {
                return;
            };
            match event {
                HostEvent::Added(instance) => registry.handle_connect(*instance),
                HostEvent::Removed(instance) => registry.handle_disconnect(*instance),
                HostEvent::Battery { .. } => (),
            }
        }));
        *registry.host_subscription.lock_or_recover() = Some(token);

        for instance in host.gamepads() {
            registry.handle_connect(instance);
        }

        Ok(registry)
    }

    pub fn driver_name(&self) -> &str {
        "HostInput"
    }

    /// Register a listener for connect and disconnect notifications
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&RegistryEvent) + Send + Sync + 'static,
    {
        let id = self.next_subscription.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .lock_or_recover()
            .push((id, Arc::new(listener)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.listeners.lock_or_recover().retain(|(t, _)| *t != id);
    }

    /// DriverIds of all registered devices in connection order, followed by
    /// the pair identity when a pair is available
    pub fn gamepad_ids(&self) -> Vec<String> {
        let state = self.state.lock_or_recover();
        let mut ids = state.ids.clone();
        if state.pair_advertised {
            ids.push(JOYCON_PAIR_ID.to_string());
        }
        ids
    }

    pub fn is_pair_available(&self) -> bool {
        self.state.lock_or_recover().pair_advertised
    }

    /// Register a newly attached device. Duplicate events and devices that are
    /// not gamepads are ignored.
    pub fn handle_connect(&self, instance: InstanceId) {
        let _dispatch = self.dispatch.lock_or_recover();
        let events = {
            let mut state = self.state.lock_or_recover();
            if state.gamepads.contains_key(&instance) {
                log::trace!("Device {instance} is already registered");
                return;
            }
            if !self.host.is_gamepad(instance) {
                return;
            }

            let guid = self.host.guid_for_id(instance).unwrap_or_default();
            let driver_id = generate_gamepad_id(&state.ids, &guid);
            let handle = match self.host.open(instance) {
                Ok(handle) => handle,
                Err(e) => {
                    log::error!("Unable to open gamepad {instance}: {e}");
                    return;
                }
            };
            let kind = classify(self.host.as_ref(), instance);

            log::info!("Gamepad connected: {driver_id} ({kind:?})");
            state.gamepads.insert(
                instance,
                GamepadInfo {
                    driver_id: driver_id.clone(),
                    handle,
                    kind,
                },
            );
            state.ids.push(driver_id.clone());

            let mut events = vec![RegistryEvent::Connected(driver_id)];
            events.extend(state.update_pair());
            events
        };

        self.notify(&events);
    }

    /// Forget a detached device. Unknown instances are ignored.
    pub fn handle_disconnect(&self, instance: InstanceId) {
        let _dispatch = self.dispatch.lock_or_recover();
        let events = {
            let mut state = self.state.lock_or_recover();
            let Some(info) = state.gamepads.remove(&instance) else {
                return;
            };
            self.host.close(info.handle);
            state.ids.retain(|id| *id != info.driver_id);

            log::info!("Gamepad disconnected: {}", info.driver_id);
            let mut events = vec![RegistryEvent::Disconnected(info.driver_id)];
            events.extend(state.update_pair());
            events
        };

        self.notify(&events);
    }

    /// Open a gamepad by DriverId, or the pair composite by [JOYCON_PAIR_ID].
    /// Returns `None` if the device, or either half of the pair, is missing.
    pub fn get_gamepad(&self, id: &str) -> Option<GamepadDevice> {
        if id == JOYCON_PAIR_ID {
            return self.open_pair();
        }

        let (instance, kind) = {
            let state = self.state.lock_or_recover();
            state
                .gamepads
                .iter()
                .find(|(_, info)| info.driver_id == id)
                .map(|(instance, info)| (*instance, info.kind))?
        };

        let handle = match self.host.open(instance) {
            Ok(handle) => handle,
            Err(e) => {
                log::debug!("Unable to open gamepad {id}: {e}");
                return None;
            }
        };
        let name = self.host.name_for_id(instance).unwrap_or_default();
        let host = self.host.clone();
        let id = id.to_string();

        let gamepad = match kind {
            DeviceKind::JoyConLeft => {
                GamepadDevice::JoyCon(JoyCon::new(host, handle, id, name, JoyConSide::Left))
            }
            DeviceKind::JoyConRight => {
                GamepadDevice::JoyCon(JoyCon::new(host, handle, id, name, JoyConSide::Right))
            }
            DeviceKind::Standard | DeviceKind::Unknown => {
                GamepadDevice::Standard(StandardGamepad::new(host, handle, id, name))
            }
        };
        Some(gamepad)
    }

    fn open_pair(&self) -> Option<GamepadDevice> {
        // Copy the entries out so the host is never queried under the lock
        let entries: Vec<(InstanceId, String, DeviceKind)> = {
            let state = self.state.lock_or_recover();
            let mut entries: Vec<_> = state
                .gamepads
                .iter()
                .map(|(instance, info)| (*instance, info.driver_id.clone(), info.kind))
                .collect();
            entries.sort_by_key(|(instance, _, _)| *instance);
            entries
        };

        let left = entries
            .iter()
            .find(|(_, _, kind)| *kind == DeviceKind::JoyConLeft)?;
        let right = entries
            .iter()
            .find(|(_, _, kind)| *kind == DeviceKind::JoyConRight)?;

        let left = self.open_half(left, JoyConSide::Left)?;
        let right = self.open_half(right, JoyConSide::Right)?;
        Some(GamepadDevice::JoyConPair(JoyConPair::new(left, right)))
    }

    fn open_half(
        &self,
        (instance, driver_id, _): &(InstanceId, String, DeviceKind),
        side: JoyConSide,
    ) -> Option<JoyCon> {
        let handle = match self.host.open(*instance) {
            Ok(handle) => handle,
            Err(e) => {
                log::debug!("Unable to open {side:?} Joy-Con {driver_id}: {e}");
                return None;
            }
        };
        let name = self.host.name_for_id(*instance).unwrap_or_default();
        Some(JoyCon::new(
            self.host.clone(),
            handle,
            driver_id.clone(),
            name,
            side,
        ))
    }

    fn notify(&self, events: &[RegistryEvent]) {
        if events.is_empty() {
            return;
        }
        let listeners: Vec<Listener> = self
            .listeners
            .lock_or_recover()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for event in events {
            for listener in listeners.iter() {
                listener(event);
            }
        }
    }
}

impl Drop for GamepadRegistry {
    /// Report every registered device as disconnected before letting go of
    /// the driver
    fn drop(&mut self) {
        if let Some(token) = self.host_subscription.lock_or_recover().take() {
            self.driver.unsubscribe(token);
        }

        {
            let _dispatch = self.dispatch.lock_or_recover();
            let events = {
                let mut state = self.state.lock_or_recover();
                let mut events: Vec<RegistryEvent> = state
                    .ids
                    .drain(..)
                    .map(RegistryEvent::Disconnected)
                    .collect();
                for (_, info) in state.gamepads.drain() {
                    self.host.close(info.handle);
                }
                if state.pair_advertised {
                    state.pair_advertised = false;
                    events.push(RegistryEvent::Disconnected(JOYCON_PAIR_ID.to_string()));
                }
                events
            };
            self.notify(&events);
        }

        self.driver.release();
    }
}
