use crate::input::capability::{GamepadButton, StickId};

/// State of every logical button and stick of a gamepad at one point in time
#[derive(Debug, Default, Clone, PartialEq)]
pub struct GamepadStateSnapshot {
    sticks: [(f32, f32); StickId::COUNT],
    buttons: [bool; GamepadButton::COUNT],
}

impl GamepadStateSnapshot {
    pub fn is_pressed(&self, button: GamepadButton) -> bool {
        self.buttons[button.index()]
    }

    pub fn stick(&self, stick: StickId) -> (f32, f32) {
        self.sticks[stick.index()]
    }

    /// Logical buttons currently pressed
    pub fn pressed_buttons(&self) -> impl Iterator<Item = GamepadButton> + '_ {
        GamepadButton::ALL
            .into_iter()
            .filter(|button| self.is_pressed(*button))
    }

    pub(crate) fn set_pressed(&mut self, button: GamepadButton, pressed: bool) {
        if button == GamepadButton::Unbound {
            return;
        }
        self.buttons[button.index()] = pressed;
    }

    pub(crate) fn set_stick(&mut self, stick: StickId, value: (f32, f32)) {
        if stick == StickId::Unbound {
            return;
        }
        self.sticks[stick.index()] = value;
    }
}
