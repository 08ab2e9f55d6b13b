use std::sync::{Arc, Mutex, Weak};
use std::time::Instant;

use crate::config::{ControllerType, InputConfig, PlayerIndex};
use crate::input::registry::{GamepadRegistry, RegistryEvent, SubscriptionId};
use crate::sync::LockExt;

use super::controller::NpadController;
use super::hle::{
    mouse_screen_position, stick_buttons, GamepadInput, KeyboardInput, MouseInput, SixAxisInput,
};
use super::service::{HidService, KeyboardSource, MouseSource};

/// Number of player slots, including the handheld slot
pub const MAX_CONTROLLERS: usize = 9;

/// Everything guarded by the manager lock
struct NpadState {
    hid: Option<Arc<dyn HidService>>,
    keyboard: Option<Arc<dyn KeyboardSource>>,
    mouse: Option<Arc<dyn MouseSource>>,
    controllers: Vec<Option<NpadController>>,
    /// Configuration as last requested, including players whose device is
    /// missing
    configs: Vec<InputConfig>,
    enable_keyboard: bool,
    enable_mouse: bool,
    blocked: bool,
    disposed: bool,
}

struct NpadInner {
    registry: Arc<GamepadRegistry>,
    state: Mutex<NpadState>,
    epoch: Instant,
}

impl NpadInner {
    fn reload(&self, state: &mut NpadState) {
        if state.disposed {
            return;
        }

        let mut old_controllers: Vec<Option<NpadController>> =
            std::mem::take(&mut state.controllers);
        state.controllers = (0..MAX_CONTROLLERS).map(|_| None).collect();

        let mut valid = Vec::new();
        for config in state.configs.iter() {
            let Some(index) = config.player_index.index() else {
                log::warn!("Ignoring configuration for {} without a player", config.id);
                continue;
            };

            // Reuse the controller already in this slot
            let mut controller = old_controllers[index].take().unwrap_or_default();
            if controller.update_driver_configuration(&self.registry, config) {
                state.controllers[index] = Some(controller);
                valid.push(config.clone());
            } else {
                controller.dispose();
            }
        }

        // Release controllers the new configuration did not reuse
        for mut controller in old_controllers.into_iter().flatten() {
            controller.dispose();
        }

        log::debug!(
            "Reloaded input configuration: {} of {} players bound",
            valid.len(),
            state.configs.len()
        );
        if let Some(hid) = state.hid.as_ref() {
            hid.refresh_input_config(&valid);
        }
    }

    fn handle_event(&self, event: &RegistryEvent) {
        let mut state = self.state.lock_or_recover();
        match event {
            RegistryEvent::Connected(id) => {
                log::debug!("Reloading input configuration after {id} connected");
            }
            RegistryEvent::Disconnected(id) => {
                log::debug!("Reloading input configuration after {id} disconnected");
                for slot in state.controllers.iter_mut() {
                    if slot.as_ref().is_some_and(|c| c.id() == Some(id.as_str())) {
                        if let Some(mut controller) = slot.take() {
                            controller.dispose();
                        }
                    }
                }
            }
        }
        self.reload(&mut state);
    }
}

/// Binds player slots to gamepads and feeds their state to the console's HID
/// service once per frame.
///
/// Every operation takes the same lock, including the reloads triggered by
/// connect and disconnect notifications from the registry.
pub struct NpadManager {
    inner: Arc<NpadInner>,
    subscription: Mutex<Option<SubscriptionId>>,
}

impl NpadManager {
    pub fn new(registry: Arc<GamepadRegistry>) -> Self {
        let inner = Arc::new(NpadInner {
            registry: registry.clone(),
            state: Mutex::new(NpadState {
                hid: None,
                keyboard: None,
                mouse: None,
                controllers: (0..MAX_CONTROLLERS).map(|_| None).collect(),
                configs: Vec::new(),
                enable_keyboard: false,
                enable_mouse: false,
                blocked: false,
                disposed: false,
            }),
            epoch: Instant::now(),
        });

        let weak: Weak<NpadInner> = Arc::downgrade(&inner);
        let subscription = registry.subscribe(move |event| {
            if let Some(inner) = weak.upgrade() {
                inner.handle_event(event);
            }
        });

        Self {
            inner,
            subscription: Mutex::new(Some(subscription)),
        }
    }

    /// Attach the HID service and host keyboard and mouse, then apply the
    /// given configuration
    pub fn initialize(
        &self,
        hid: Arc<dyn HidService>,
        configs: Vec<InputConfig>,
        enable_keyboard: bool,
        enable_mouse: bool,
        keyboard: Option<Arc<dyn KeyboardSource>>,
        mouse: Option<Arc<dyn MouseSource>>,
    ) {
        {
            let mut state = self.inner.state.lock_or_recover();
            state.hid = Some(hid);
            state.keyboard = keyboard;
            state.mouse = mouse;
        }
        self.reload_configuration(configs, enable_keyboard, enable_mouse);
    }

    /// Replace the whole player configuration. Players whose device cannot be
    /// found are left unbound until it connects.
    pub fn reload_configuration(
        &self,
        configs: Vec<InputConfig>,
        enable_keyboard: bool,
        enable_mouse: bool,
    ) {
        let mut state = self.inner.state.lock_or_recover();
        state.configs = configs;
        state.enable_keyboard = enable_keyboard;
        state.enable_mouse = enable_mouse;
        self.inner.reload(&mut state);
    }

    /// Poll every bound controller and hand the frame's input to the HID
    /// service. `aspect_ratio` is the ratio of the console image shown in the
    /// host window.
    pub fn update(&self, aspect_ratio: f32) {
        let mut guard = self.inner.state.lock_or_recover();
        let state = &mut *guard;
        if state.disposed {
            return;
        }
        let Some(hid) = state.hid.clone() else {
            log::trace!("No HID service attached, skipping update");
            return;
        };

        let timestamp = self.inner.epoch.elapsed().as_micros() as u64;
        let mut input_states: Vec<GamepadInput> = Vec::with_capacity(state.configs.len());
        let mut motion_states: Vec<SixAxisInput> = Vec::with_capacity(state.configs.len());

        for config in state.configs.iter() {
            let player = config.player_index;
            let controller = player
                .index()
                .and_then(|index| state.controllers[index].as_mut());

            let mut input = GamepadInput::default();
            let mut motion = SixAxisInput::default();
            let mut second_motion = None;

            match controller {
                Some(controller) if !state.blocked => {
                    controller.update_driver_configuration(&self.inner.registry, config);
                    controller.update_user_configuration(config);
                    controller.update(timestamp);
                    controller.update_rumble(hid.as_ref());

                    input = controller.hle_input_state();
                    input.buttons |= stick_buttons(input.l_stick, input.r_stick);

                    motion = controller.hle_motion_state(false);
                    if config.controller_type == ControllerType::JoyconPair {
                        second_motion = Some(controller.hle_motion_state(true));
                    }
                }
                _ => (),
            }

            input.player_id = player;
            motion.player_id = player;
            input_states.push(input);
            motion_states.push(motion);
            if let Some(mut second) = second_motion {
                second.player_id = player;
                motion_states.push(second);
            }
        }

        hid.update_npads(&input_states);
        hid.update_six_axis(&motion_states);

        if !state.blocked && state.enable_keyboard {
            if let Some(keyboard) = state.keyboard.as_ref() {
                hid.update_keyboard(&KeyboardInput::from(&keyboard.snapshot()));
            }
        }

        let mouse = state.mouse.as_ref().filter(|_| state.enable_mouse);
        match mouse {
            Some(mouse) => {
                let snapshot = mouse.snapshot();
                let buttons = snapshot
                    .buttons
                    .iter()
                    .enumerate()
                    .filter(|(_, pressed)| **pressed)
                    .fold(0u32, |mask, (bit, _)| mask | (1 << bit));
                let (x, y) =
                    mouse_screen_position(snapshot.position, snapshot.client_size, aspect_ratio);
                hid.update_mouse(&MouseInput {
                    x: x as i32,
                    y: y as i32,
                    buttons,
                    scroll_x: snapshot.scroll.0 as i32,
                    scroll_y: snapshot.scroll.1 as i32,
                    connected: true,
                });
            }
            None => hid.update_mouse(&MouseInput::default()),
        }
    }

    /// Stop polling devices. Players keep reporting a neutral state.
    pub fn block_input_updates(&self) {
        self.inner.state.lock_or_recover().blocked = true;
    }

    /// Resume polling, discarding any input that arrived while blocked
    pub fn unblock_input_updates(&self) {
        let mut state = self.inner.state.lock_or_recover();
        for controller in state.controllers.iter_mut().flatten() {
            controller.clear();
        }
        if let Some(keyboard) = state.keyboard.as_ref() {
            keyboard.clear();
        }
        state.blocked = false;
    }

    pub fn input_updates_blocked(&self) -> bool {
        self.inner.state.lock_or_recover().blocked
    }

    /// Configuration of the given player, if one was requested
    pub fn player_input_config(&self, player: PlayerIndex) -> Option<InputConfig> {
        self.inner
            .state
            .lock_or_recover()
            .configs
            .iter()
            .find(|config| config.player_index == player)
            .cloned()
    }

    /// Whether a gamepad is currently bound to the given player
    pub fn is_bound(&self, player: PlayerIndex) -> bool {
        let state = self.inner.state.lock_or_recover();
        player
            .index()
            .and_then(|index| state.controllers[index].as_ref())
            .is_some_and(|controller| controller.gamepad().is_some())
    }

    /// Release every controller and stop listening to the registry. Safe to
    /// call more than once.
    pub fn dispose(&self) {
        if let Some(subscription) = self.subscription.lock_or_recover().take() {
            self.inner.registry.unsubscribe(subscription);
        }

        let mut state = self.inner.state.lock_or_recover();
        if state.disposed {
            return;
        }
        for mut controller in state.controllers.iter_mut().filter_map(Option::take) {
            controller.dispose();
        }
        state.disposed = true;
        log::debug!("Input session disposed");
    }
}

impl Drop for NpadManager {
    fn drop(&mut self) {
        self.dispose();
    }
}
