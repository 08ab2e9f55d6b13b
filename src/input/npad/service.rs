use crate::config::{InputConfig, PlayerIndex};

use super::hle::{GamepadInput, KeyboardInput, MouseInput, SixAxisInput, VibrationValue};

/// The emulated console's HID service, fed once per frame by
/// [super::manager::NpadManager]. Calls are made with the manager's lock held
/// and must not call back into the manager.
pub trait HidService: Send + Sync {
    /// Player configurations whose devices resolved
    fn refresh_input_config(&self, configs: &[InputConfig]);
    fn update_npads(&self, states: &[GamepadInput]);
    fn update_six_axis(&self, states: &[SixAxisInput]);
    fn update_keyboard(&self, state: &KeyboardInput);
    fn update_mouse(&self, state: &MouseInput);
    /// Next pending rumble request for a player as a (left, right) pair
    fn dequeue_rumble(&self, player: PlayerIndex) -> Option<(VibrationValue, VibrationValue)>;
}

/// Pressed keys of a host keyboard
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct KeyboardSnapshot {
    /// HID usage ids of pressed keys
    pub pressed: Vec<u8>,
    pub modifiers: u32,
}

impl From<&KeyboardSnapshot> for KeyboardInput {
    fn from(snapshot: &KeyboardSnapshot) -> Self {
        let mut input = KeyboardInput {
            modifier: snapshot.modifiers,
            ..Default::default()
        };
        for usage in snapshot.pressed.iter() {
            input.keys[*usage as usize / 64] |= 1u64 << (usage % 64);
        }
        input
    }
}

/// Host keyboard
pub trait KeyboardSource: Send + Sync {
    fn snapshot(&self) -> KeyboardSnapshot;
    /// Drop any key state buffered while input updates were blocked
    fn clear(&self);
}

/// State of a host mouse relative to the window showing the console
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct MouseSnapshot {
    /// Left, right, middle, back and forward
    pub buttons: [bool; 5],
    pub position: (f32, f32),
    pub scroll: (f32, f32),
    pub client_size: (u32, u32),
}

/// Host mouse
pub trait MouseSource: Send + Sync {
    fn snapshot(&self) -> MouseSnapshot;
}
