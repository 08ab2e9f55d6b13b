#[cfg(test)]
mod daemon_test;

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::config::{InputConfig, PlayerIndex};
use crate::input::npad::hle::{
    GamepadInput, KeyboardInput, MouseInput, SixAxisInput, VibrationValue,
};
use crate::input::npad::manager::NpadManager;
use crate::input::npad::service::HidService;
use crate::sync::LockExt;

/// Default number of frames per second
pub const DEFAULT_FRAME_RATE: u32 = 60;

/// Default aspect ratio of the console image
pub const DEFAULT_ASPECT_RATIO: f32 = 16.0 / 9.0;

#[derive(Default)]
struct LoggedState {
    npads: Vec<GamepadInput>,
    keyboard: KeyboardInput,
    mouse: MouseInput,
}

/// A [HidService] that logs every change in the state it is fed. Used by the
/// daemon when no console is attached.
#[derive(Default)]
pub struct LoggingHidService {
    last: Mutex<LoggedState>,
    rumble: Mutex<HashMap<PlayerIndex, VecDeque<(VibrationValue, VibrationValue)>>>,
    frames: AtomicU64,
}

impl LoggingHidService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of controller frames received so far
    pub fn frame_count(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }

    /// Last controller state received for the given player
    pub fn npad_state(&self, player: PlayerIndex) -> Option<GamepadInput> {
        self.last
            .lock_or_recover()
            .npads
            .iter()
            .find(|state| state.player_id == player)
            .copied()
    }

    /// Queue a rumble request to be picked up by the given player's controller
    pub fn queue_rumble(&self, player: PlayerIndex, left: VibrationValue, right: VibrationValue) {
        self.rumble
            .lock_or_recover()
            .entry(player)
            .or_default()
            .push_back((left, right));
    }
}

impl HidService for LoggingHidService {
    fn refresh_input_config(&self, configs: &[InputConfig]) {
        if configs.is_empty() {
            log::info!("No configured controller is connected");
        }
        for config in configs {
            log::info!(
                "Controller '{}' assigned to {:?} as {:?}",
                config.id,
                config.player_index,
                config.controller_type
            );
        }
    }

    fn update_npads(&self, states: &[GamepadInput]) {
        self.frames.fetch_add(1, Ordering::Relaxed);
        let mut last = self.last.lock_or_recover();
        for state in states {
            let previous = last
                .npads
                .iter()
                .find(|previous| previous.player_id == state.player_id);
            if previous != Some(state) {
                log::debug!(
                    "{:?}: buttons {:#x} left {:?} right {:?}",
                    state.player_id,
                    state.buttons.bits(),
                    state.l_stick,
                    state.r_stick
                );
            }
        }
        last.npads = states.to_vec();
    }

    fn update_six_axis(&self, states: &[SixAxisInput]) {
        for state in states {
            log::trace!(
                "{:?}: accel {:?} gyro {:?}",
                state.player_id,
                state.accelerometer,
                state.gyroscope
            );
        }
    }

    fn update_keyboard(&self, state: &KeyboardInput) {
        let mut last = self.last.lock_or_recover();
        if last.keyboard != *state {
            log::debug!("Keyboard: modifiers {:#x} keys {:x?}", state.modifier, state.keys);
            last.keyboard = *state;
        }
    }

    fn update_mouse(&self, state: &MouseInput) {
        let mut last = self.last.lock_or_recover();
        if last.mouse != *state {
            log::debug!("Mouse: {state:?}");
            last.mouse = *state;
        }
    }

    fn dequeue_rumble(&self, player: PlayerIndex) -> Option<(VibrationValue, VibrationValue)> {
        self.rumble.lock_or_recover().get_mut(&player)?.pop_front()
    }
}

/// Time between two frames at the given rate. A rate of zero is treated as
/// one frame per second.
pub fn frame_period(frame_rate: u32) -> Duration {
    Duration::from_secs_f64(1.0 / frame_rate.max(1) as f64)
}

/// Update the manager once per frame until `shutdown` turns true or its
/// sender is dropped. Returns the number of frames run.
pub async fn run_frames(
    manager: &NpadManager,
    frame_rate: u32,
    aspect_ratio: f32,
    mut shutdown: watch::Receiver<bool>,
) -> u64 {
    let mut interval = tokio::time::interval(frame_period(frame_rate));
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut frames = 0;
    loop {
        if *shutdown.borrow() {
            break;
        }
        tokio::select! {
            _ = interval.tick() => {
                manager.update(aspect_ratio);
                frames += 1;
            }
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    log::debug!("Frame loop stopped after {frames} frames");
    frames
}
