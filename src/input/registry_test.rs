use std::collections::HashSet;
use std::error::Error;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crate::input::driver::HostDriver;
use crate::input::gamepad::{Gamepad, GamepadDevice};
use crate::input::host::mock::{MockDevice, MockHost};
use crate::input::host::{DeviceKind, Guid};

use super::registry::{
    generate_gamepad_id, GamepadRegistry, RegistryEvent, JOYCON_LEFT_NAME, JOYCON_PAIR_ID,
};

struct TestRegistry {
    host: Arc<MockHost>,
    driver: Arc<HostDriver>,
    registry: Arc<GamepadRegistry>,
    events: Arc<Mutex<Vec<RegistryEvent>>>,
}

impl TestRegistry {
    fn new() -> Result<Self, Box<dyn Error>> {
        Self::with_devices(Vec::new())
    }

    fn with_devices(devices: Vec<MockDevice>) -> Result<Self, Box<dyn Error>> {
        let host = Arc::new(MockHost::new());
        for device in devices {
            host.plug(device);
        }
        let driver = Arc::new(HostDriver::new(host.clone()));
        let registry = GamepadRegistry::new(driver.clone())?;

        let events = Arc::new(Mutex::new(Vec::new()));
        {
            let events = events.clone();
            registry.subscribe(move |event| events.lock().unwrap().push(event.clone()));
        }

        Ok(Self {
            host,
            driver,
            registry,
            events,
        })
    }

    /// Plug a device and deliver its connect event
    fn connect(&self, device: MockDevice) -> u32 {
        let instance = self.host.plug(device);
        self.registry.handle_connect(instance);
        instance
    }

    fn disconnect(&self, instance: u32) {
        self.host.unplug(instance);
        self.registry.handle_disconnect(instance);
    }

    fn take_events(&self) -> Vec<RegistryEvent> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }
}

fn wait_until(condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}

fn pair_connected() -> RegistryEvent {
    RegistryEvent::Connected(JOYCON_PAIR_ID.to_string())
}

fn pair_disconnected() -> RegistryEvent {
    RegistryEvent::Disconnected(JOYCON_PAIR_ID.to_string())
}

#[test]
fn test_generate_gamepad_id() -> Result<(), Box<dyn Error>> {
    let guid = Guid::from_input_id(0x03, 0x045e, 0x028e, 0x0110);
    let base = guid.to_string();

    assert_eq!(generate_gamepad_id(&[], &guid), base);
    let ids = vec![base.clone()];
    assert_eq!(generate_gamepad_id(&ids, &guid), format!("{base}-1"));
    let ids = vec![base.clone(), format!("{base}-1")];
    assert_eq!(generate_gamepad_id(&ids, &guid), format!("{base}-2"));
    let ids = vec![format!("{base}-1")];
    assert_eq!(generate_gamepad_id(&ids, &guid), base, "free id is reused");

    Ok(())
}

#[test]
fn test_attached_devices_are_registered() -> Result<(), Box<dyn Error>> {
    let mut keyboard = MockDevice::standard("Keyboard");
    keyboard.gamepad = false;
    let test = TestRegistry::with_devices(vec![
        MockDevice::standard("Pad A"),
        keyboard,
        MockDevice::standard("Pad B"),
    ])?;

    let ids = test.registry.gamepad_ids();
    assert_eq!(ids.len(), 2, "only gamepads are registered: {ids:?}");
    let unique: HashSet<&String> = ids.iter().collect();
    assert_eq!(unique.len(), 2, "ids must be unique: {ids:?}");
    assert_eq!(ids[1], format!("{}-1", ids[0]), "same GUID gets a suffix");
    assert_eq!(test.registry.driver_name(), "HostInput");
    assert_eq!(test.driver.ref_count(), 1);

    Ok(())
}

#[test]
fn test_ids_are_freed_on_disconnect() -> Result<(), Box<dyn Error>> {
    let test = TestRegistry::new()?;
    let first = test.connect(MockDevice::standard("Pad A"));
    let second = test.connect(MockDevice::standard("Pad B"));
    let ids = test.registry.gamepad_ids();

    test.disconnect(first);
    assert_eq!(test.registry.gamepad_ids(), vec![ids[1].clone()]);

    test.connect(MockDevice::standard("Pad C"));
    assert_eq!(
        test.registry.gamepad_ids(),
        vec![ids[1].clone(), ids[0].clone()],
        "released id should be handed out again"
    );

    // Duplicate and unknown events change nothing
    test.registry.handle_disconnect(first);
    test.registry.handle_connect(second);
    assert_eq!(test.registry.gamepad_ids().len(), 2);

    Ok(())
}

#[test]
fn test_pair_notified_once_per_transition() -> Result<(), Box<dyn Error>> {
    let test = TestRegistry::new()?;

    let left = test.connect(MockDevice::joycon_left());
    let left_id = test.registry.gamepad_ids()[0].clone();
    assert_eq!(test.take_events(), vec![RegistryEvent::Connected(left_id.clone())]);
    assert!(!test.registry.is_pair_available());

    let right = test.connect(MockDevice::joycon_right());
    let events = test.take_events();
    assert_eq!(events.len(), 2, "got {events:?}");
    assert_eq!(events[1], pair_connected(), "pair follows the device");
    assert!(test.registry.is_pair_available());
    assert_eq!(test.registry.gamepad_ids().last(), Some(&JOYCON_PAIR_ID.to_string()));

    // A second left half does not announce the pair again
    let second_left = test.connect(MockDevice::joycon_left());
    let events = test.take_events();
    assert!(!events.contains(&pair_connected()), "got {events:?}");

    test.disconnect(left);
    assert_eq!(test.take_events(), vec![RegistryEvent::Disconnected(left_id)]);
    assert!(test.registry.is_pair_available(), "another left half remains");

    test.disconnect(second_left);
    let events = test.take_events();
    assert_eq!(events.len(), 2, "got {events:?}");
    assert_eq!(events[1], pair_disconnected());
    assert!(!test.registry.is_pair_available());

    test.disconnect(right);
    let events = test.take_events();
    assert_eq!(events.len(), 1, "pair was already gone: {events:?}");

    Ok(())
}

#[test]
fn test_joycon_recognized_by_name() -> Result<(), Box<dyn Error>> {
    let test = TestRegistry::new()?;
    let guid = Guid::from_input_id(0x05, 0x057e, 0x2006, 0x0001);
    test.connect(MockDevice::new(JOYCON_LEFT_NAME, guid, DeviceKind::Unknown));
    test.connect(MockDevice::joycon_right());
    assert!(test.registry.is_pair_available());
    Ok(())
}

#[test]
fn test_get_gamepad() -> Result<(), Box<dyn Error>> {
    let test = TestRegistry::new()?;
    assert!(test.registry.get_gamepad("missing").is_none());
    assert!(test.registry.get_gamepad(JOYCON_PAIR_ID).is_none(), "no halves yet");

    test.connect(MockDevice::standard("Pad"));
    let left = test.connect(MockDevice::joycon_left());
    test.connect(MockDevice::joycon_right());
    let ids = test.registry.gamepad_ids();

    let standard = test.registry.get_gamepad(&ids[0]);
    assert!(matches!(standard, Some(GamepadDevice::Standard(_))));
    let half = test.registry.get_gamepad(&ids[1]);
    assert!(matches!(half, Some(GamepadDevice::JoyCon(_))));

    let mut pair = test
        .registry
        .get_gamepad(JOYCON_PAIR_ID)
        .ok_or("pair should open")?;
    assert!(matches!(pair, GamepadDevice::JoyConPair(_)));
    assert_eq!(pair.id(), JOYCON_PAIR_ID);
    assert!(pair.is_connected());

    // Registry handle, the single half and the pair's half
    assert_eq!(test.host.open_handles(left), 3);
    pair.dispose();
    drop(half);
    assert_eq!(test.host.open_handles(left), 1);

    Ok(())
}

#[test]
fn test_drop_disconnects_everything() -> Result<(), Box<dyn Error>> {
    let test = TestRegistry::new()?;
    test.connect(MockDevice::joycon_left());
    test.connect(MockDevice::joycon_right());
    let ids = test.registry.gamepad_ids();
    test.take_events();

    let TestRegistry {
        host,
        driver,
        registry,
        events,
    } = test;
    drop(registry);

    assert!(
        wait_until(|| host.quit_count() == 1),
        "driver should be released"
    );
    assert_eq!(driver.ref_count(), 0);
    let events = events.lock().unwrap().clone();
    let expected: Vec<RegistryEvent> = ids
        .into_iter()
        .map(RegistryEvent::Disconnected)
        .collect();
    assert_eq!(events, expected, "every id including the pair goes away");

    Ok(())
}
