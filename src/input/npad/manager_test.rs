use std::collections::{HashMap, VecDeque};
use std::error::Error;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::config::{ControllerType, InputConfig, PlayerIndex};
use crate::input::driver::HostDriver;
use crate::input::host::mock::{MockDevice, MockHost};
use crate::input::host::{PhysicalAxis, PhysicalButton};
use crate::input::registry::{GamepadRegistry, JOYCON_PAIR_ID};

use super::hle::{
    ControllerKeys, GamepadInput, KeyboardInput, MouseInput, SixAxisInput, VibrationValue,
};
use super::manager::NpadManager;
use super::service::{
    HidService, KeyboardSnapshot, KeyboardSource, MouseSnapshot, MouseSource,
};

#[derive(Default)]
struct RecordingHid {
    refreshes: Mutex<Vec<Vec<InputConfig>>>,
    npads: Mutex<Vec<Vec<GamepadInput>>>,
    six_axis: Mutex<Vec<Vec<SixAxisInput>>>,
    keyboard: Mutex<Vec<KeyboardInput>>,
    mouse: Mutex<Vec<MouseInput>>,
    rumble: Mutex<HashMap<PlayerIndex, VecDeque<(VibrationValue, VibrationValue)>>>,
}

impl RecordingHid {
    fn last_refresh(&self) -> Vec<InputConfig> {
        self.refreshes.lock().unwrap().last().cloned().unwrap_or_default()
    }

    fn last_npads(&self) -> Vec<GamepadInput> {
        self.npads.lock().unwrap().last().cloned().unwrap_or_default()
    }

    fn last_six_axis(&self) -> Vec<SixAxisInput> {
        self.six_axis.lock().unwrap().last().cloned().unwrap_or_default()
    }

    fn last_mouse(&self) -> Option<MouseInput> {
        self.mouse.lock().unwrap().last().copied()
    }
}

impl HidService for RecordingHid {
    fn refresh_input_config(&self, configs: &[InputConfig]) {
        self.refreshes.lock().unwrap().push(configs.to_vec());
    }

    fn update_npads(&self, states: &[GamepadInput]) {
        self.npads.lock().unwrap().push(states.to_vec());
    }

    fn update_six_axis(&self, states: &[SixAxisInput]) {
        self.six_axis.lock().unwrap().push(states.to_vec());
    }

    fn update_keyboard(&self, state: &KeyboardInput) {
        self.keyboard.lock().unwrap().push(*state);
    }

    fn update_mouse(&self, state: &MouseInput) {
        self.mouse.lock().unwrap().push(*state);
    }

    fn dequeue_rumble(&self, player: PlayerIndex) -> Option<(VibrationValue, VibrationValue)> {
        self.rumble.lock().unwrap().get_mut(&player)?.pop_front()
    }
}

#[derive(Default)]
struct TestKeyboard {
    pressed: Mutex<Vec<u8>>,
    clears: AtomicUsize,
}

impl KeyboardSource for TestKeyboard {
    fn snapshot(&self) -> KeyboardSnapshot {
        KeyboardSnapshot {
            pressed: self.pressed.lock().unwrap().clone(),
            modifiers: 0,
        }
    }

    fn clear(&self) {
        self.clears.fetch_add(1, Ordering::SeqCst);
    }
}

struct TestMouse;

impl MouseSource for TestMouse {
    fn snapshot(&self) -> MouseSnapshot {
        MouseSnapshot {
            buttons: [true, false, true, false, false],
            position: (640.0, 360.0),
            scroll: (0.0, -2.0),
            client_size: (1280, 720),
        }
    }
}

struct TestSession {
    host: Arc<MockHost>,
    registry: Arc<GamepadRegistry>,
    hid: Arc<RecordingHid>,
    keyboard: Arc<TestKeyboard>,
    manager: NpadManager,
}

impl TestSession {
    fn new() -> Result<Self, Box<dyn Error>> {
        let host = Arc::new(MockHost::new());
        let driver = Arc::new(HostDriver::new(host.clone()));
        let registry = GamepadRegistry::new(driver)?;
        let manager = NpadManager::new(registry.clone());
        Ok(Self {
            host,
            registry,
            hid: Arc::new(RecordingHid::default()),
            keyboard: Arc::new(TestKeyboard::default()),
            manager,
        })
    }

    fn connect(&self, device: MockDevice) -> (u32, String) {
        let instance = self.host.plug(device);
        self.registry.handle_connect(instance);
        let id = self
            .registry
            .gamepad_ids()
            .into_iter()
            .rfind(|id| id != JOYCON_PAIR_ID)
            .unwrap_or_default();
        (instance, id)
    }

    fn initialize(&self, configs: Vec<InputConfig>, keyboard: bool, mouse: bool) {
        self.manager.initialize(
            self.hid.clone(),
            configs,
            keyboard,
            mouse,
            Some(self.keyboard.clone()),
            Some(Arc::new(TestMouse)),
        );
    }
}

#[test]
fn test_states_cover_every_configured_player() -> Result<(), Box<dyn Error>> {
    let session = TestSession::new()?;
    let (instance, id) = session.connect(MockDevice::standard("Pad"));
    let player1 = InputConfig::new(&id, PlayerIndex::Player1, ControllerType::ProController);
    let player2 = InputConfig::new("missing", PlayerIndex::Player2, ControllerType::ProController);
    session.initialize(vec![player1.clone(), player2], false, false);

    assert_eq!(session.hid.last_refresh(), vec![player1], "only resolved players are valid");
    assert!(session.manager.is_bound(PlayerIndex::Player1));
    assert!(!session.manager.is_bound(PlayerIndex::Player2));

    session.host.press(instance, PhysicalButton::East);
    session.host.set_axis(instance, PhysicalAxis::LeftX, i16::MAX);
    session.manager.update(16.0 / 9.0);

    let npads = session.hid.last_npads();
    assert_eq!(npads.len(), 2);
    assert_eq!(npads[0].player_id, PlayerIndex::Player1);
    assert!(npads[0].buttons.contains(ControllerKeys::A));
    assert!(
        npads[0].buttons.contains(ControllerKeys::L_STICK_RIGHT),
        "stick direction should be synthesized: {:?}",
        npads[0]
    );
    assert_eq!(npads[1].player_id, PlayerIndex::Player2);
    assert_eq!(npads[1].buttons, ControllerKeys::empty());

    let six_axis = session.hid.last_six_axis();
    assert_eq!(six_axis.len(), 2);
    assert_eq!(six_axis[1].player_id, PlayerIndex::Player2);
    assert_eq!(six_axis[1].orientation, [0.0; 9]);

    assert_eq!(
        session.hid.last_mouse(),
        Some(MouseInput::default()),
        "disabled mouse is reported disconnected"
    );
    assert!(session.hid.keyboard.lock().unwrap().is_empty());

    Ok(())
}

#[test]
fn test_blocked_updates_report_neutral_state() -> Result<(), Box<dyn Error>> {
    let session = TestSession::new()?;
    let (instance, id) = session.connect(MockDevice::standard("Pad"));
    let config = InputConfig::new(&id, PlayerIndex::Player1, ControllerType::ProController);
    session.initialize(vec![config], true, false);
    session.host.press(instance, PhysicalButton::East);

    session.manager.block_input_updates();
    assert!(session.manager.input_updates_blocked());
    session.manager.update(1.0);

    let npads = session.hid.last_npads();
    assert_eq!(npads[0].buttons, ControllerKeys::empty());
    assert_eq!(npads[0].player_id, PlayerIndex::Player1);
    assert_eq!(session.hid.last_six_axis()[0].orientation, [0.0; 9]);
    assert!(session.hid.keyboard.lock().unwrap().is_empty(), "no keyboard while blocked");

    session.manager.unblock_input_updates();
    assert!(!session.manager.input_updates_blocked());
    assert_eq!(session.keyboard.clears.load(Ordering::SeqCst), 1);

    session.keyboard.pressed.lock().unwrap().push(0x04);
    session.manager.update(1.0);
    assert!(session.hid.last_npads()[0].buttons.contains(ControllerKeys::A));
    let keyboard = session.hid.keyboard.lock().unwrap().last().copied();
    assert!(keyboard.is_some_and(|k| k.is_pressed(0x04)), "got {keyboard:?}");

    Ok(())
}

#[test]
fn test_hotplug_rebinds_players() -> Result<(), Box<dyn Error>> {
    let session = TestSession::new()?;
    // Learn the id the device will get, then unplug it again
    let (instance, id) = session.connect(MockDevice::standard("Pad"));
    session.host.unplug(instance);
    session.registry.handle_disconnect(instance);

    let config = InputConfig::new(&id, PlayerIndex::Player1, ControllerType::ProController);
    session.initialize(vec![config.clone()], false, false);
    assert!(!session.manager.is_bound(PlayerIndex::Player1));
    assert!(session.hid.last_refresh().is_empty());

    let (instance, _) = session.connect(MockDevice::standard("Pad"));
    assert!(session.manager.is_bound(PlayerIndex::Player1), "bound on connect");
    assert_eq!(session.hid.last_refresh(), vec![config]);

    session.host.unplug(instance);
    session.registry.handle_disconnect(instance);
    assert!(!session.manager.is_bound(PlayerIndex::Player1), "unbound on disconnect");
    assert_eq!(session.host.open_handles(instance), 0);

    Ok(())
}

#[test]
fn test_pair_reports_two_motion_streams() -> Result<(), Box<dyn Error>> {
    let session = TestSession::new()?;
    session.connect(MockDevice::joycon_left());
    session.connect(MockDevice::joycon_right());
    let config =
        InputConfig::new(JOYCON_PAIR_ID, PlayerIndex::Handheld, ControllerType::JoyconPair);
    session.initialize(vec![config], false, false);
    assert!(session.manager.is_bound(PlayerIndex::Handheld));

    session.manager.update(1.0);
    session.manager.update(1.0);

    let six_axis = session.hid.last_six_axis();
    assert_eq!(six_axis.len(), 2, "primary and secondary stream");
    assert!(six_axis
        .iter()
        .all(|state| state.player_id == PlayerIndex::Handheld));
    assert_eq!(session.hid.last_npads().len(), 1);

    Ok(())
}

#[test]
fn test_mouse_and_rumble() -> Result<(), Box<dyn Error>> {
    let session = TestSession::new()?;
    let (_, id) = session.connect(MockDevice::standard("Pad").with_rumble());
    let config = InputConfig::new(&id, PlayerIndex::Player1, ControllerType::ProController);
    session.initialize(vec![config], false, true);
    session.host.clear_rumble_calls();

    let vibration = VibrationValue {
        amplitude_low: 1.0,
        amplitude_high: 1.0,
        ..Default::default()
    };
    session
        .hid
        .rumble
        .lock()
        .unwrap()
        .entry(PlayerIndex::Player1)
        .or_default()
        .push_back((vibration, vibration));
    session.manager.update(16.0 / 9.0);

    let mouse = session.hid.last_mouse().ok_or("mouse should be updated")?;
    assert_eq!(
        mouse,
        MouseInput {
            x: 640,
            y: 360,
            buttons: 0b101,
            scroll_x: 0,
            scroll_y: -2,
            connected: true,
        }
    );

    let calls = session.host.rumble_calls();
    assert_eq!(calls.len(), 1, "one queued request should be played");
    assert_eq!(calls[0].low, u16::MAX);
    assert_eq!(calls[0].high, u16::MAX);

    Ok(())
}

#[test]
fn test_config_lookup_and_dispose() -> Result<(), Box<dyn Error>> {
    let session = TestSession::new()?;
    let (instance, id) = session.connect(MockDevice::standard("Pad"));
    let config = InputConfig::new(&id, PlayerIndex::Player3, ControllerType::ProController);
    session.initialize(vec![config.clone()], false, false);

    assert_eq!(session.manager.player_input_config(PlayerIndex::Player3), Some(config));
    assert_eq!(session.manager.player_input_config(PlayerIndex::Player1), None);
    // Registry handle and the bound controller
    assert_eq!(session.host.open_handles(instance), 2);

    session.manager.dispose();
    session.manager.dispose();
    assert!(!session.manager.is_bound(PlayerIndex::Player3));
    assert_eq!(session.host.open_handles(instance), 1);

    let updates = session.hid.npads.lock().unwrap().len();
    session.manager.update(1.0);
    assert_eq!(session.hid.npads.lock().unwrap().len(), updates, "disposed manager is idle");

    Ok(())
}
