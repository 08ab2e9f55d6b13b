use crate::config::{InputConfig, StickConfig};
use crate::input::capability::{GamepadButton, StickId};

use super::snapshot::GamepadStateSnapshot;

/// Scale applied to raw signed 16-bit axis values
const AXIS_CONVERT_RATE: f32 = 1.0 / (i16::MAX as f32 + 0.5);

/// Convert a raw signed 16-bit axis value into the [-1, 1] range
pub fn normalize_axis(value: i16) -> f32 {
    value as f32 * AXIS_CONVERT_RATE
}

/// Apply the configured invert and rotate transforms to a stick position
pub fn apply_stick_transform(config: &StickConfig, x: f32, y: f32) -> (f32, f32) {
    let (mut x, mut y) = (x, y);
    if config.invert_stick_x {
        x = -x;
    }
    if config.invert_stick_y {
        y = -y;
    }
    if config.rotate90_cw {
        (x, y) = (y, -x);
    }
    (x, y)
}

/// Which halves of a controller a mapping covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappedHalves {
    Left,
    Right,
    Both,
}

/// Logical button `to` takes the pressed state of raw logical button `from`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonMappingEntry {
    pub to: GamepadButton,
    pub from: GamepadButton,
}

impl ButtonMappingEntry {
    pub fn new(to: GamepadButton, from: GamepadButton) -> Self {
        Self { to, from }
    }

    pub fn is_valid(&self) -> bool {
        self.to != GamepadButton::Unbound && self.from != GamepadButton::Unbound
    }
}

/// User remapping resolved on top of a gamepad's raw state. A mapping is only
/// ever built whole from an [InputConfig] and replaced, never edited.
#[derive(Debug, Clone, Default)]
pub struct UserMapping {
    buttons: Vec<ButtonMappingEntry>,
    sticks: [StickId; StickId::COUNT],
    left_stick: Option<StickConfig>,
    right_stick: Option<StickConfig>,
}

impl UserMapping {
    /// Build the mapping for the given halves. Sticks come first, then the
    /// left half buttons, then the right half buttons.
    pub fn from_config(config: &InputConfig, halves: MappedHalves) -> Self {
        let mut mapping = Self::default();
        mapping.sticks[StickId::Left.index()] = config.left_joycon_stick.joystick;
        mapping.sticks[StickId::Right.index()] = config.right_joycon_stick.joystick;
        mapping.left_stick = Some(config.left_joycon_stick.clone());
        mapping.right_stick = Some(config.right_joycon_stick.clone());

        if matches!(halves, MappedHalves::Left | MappedHalves::Both) {
            mapping.add_left_buttons(config);
        }
        if matches!(halves, MappedHalves::Right | MappedHalves::Both) {
            mapping.add_right_buttons(config);
        }

        mapping
    }

    fn add_left_buttons(&mut self, config: &InputConfig) {
        let left = &config.left_joycon;
        self.buttons.extend([
            ButtonMappingEntry::new(
                GamepadButton::LeftStick,
                config.left_joycon_stick.stick_button,
            ),
            ButtonMappingEntry::new(GamepadButton::DpadUp, left.dpad_up),
            ButtonMappingEntry::new(GamepadButton::DpadDown, left.dpad_down),
            ButtonMappingEntry::new(GamepadButton::DpadLeft, left.dpad_left),
            ButtonMappingEntry::new(GamepadButton::DpadRight, left.dpad_right),
            ButtonMappingEntry::new(GamepadButton::Minus, left.button_minus),
            ButtonMappingEntry::new(GamepadButton::LeftShoulder, left.button_l),
            ButtonMappingEntry::new(GamepadButton::LeftTrigger, left.button_zl),
            ButtonMappingEntry::new(GamepadButton::SingleRightTrigger0, left.button_sr),
            ButtonMappingEntry::new(GamepadButton::SingleLeftTrigger0, left.button_sl),
        ]);
    }

    fn add_right_buttons(&mut self, config: &InputConfig) {
        let right = &config.right_joycon;
        self.buttons.extend([
            ButtonMappingEntry::new(
                GamepadButton::RightStick,
                config.right_joycon_stick.stick_button,
            ),
            ButtonMappingEntry::new(GamepadButton::A, right.button_a),
            ButtonMappingEntry::new(GamepadButton::B, right.button_b),
            ButtonMappingEntry::new(GamepadButton::X, right.button_x),
            ButtonMappingEntry::new(GamepadButton::Y, right.button_y),
            ButtonMappingEntry::new(GamepadButton::Plus, right.button_plus),
            ButtonMappingEntry::new(GamepadButton::RightShoulder, right.button_r),
            ButtonMappingEntry::new(GamepadButton::RightTrigger, right.button_zr),
            ButtonMappingEntry::new(GamepadButton::SingleRightTrigger1, right.button_sr),
            ButtonMappingEntry::new(GamepadButton::SingleLeftTrigger1, right.button_sl),
        ]);
    }

    pub fn buttons(&self) -> &[ButtonMappingEntry] {
        &self.buttons
    }

    /// Physical stick feeding the given logical stick
    pub fn stick_source(&self, stick: StickId) -> StickId {
        self.sticks[stick.index()]
    }

    /// Stick settings that apply to the given logical stick. When the other
    /// side's physical stick is assigned to this logical stick, its settings
    /// follow it.
    pub fn stick_config(&self, stick: StickId) -> Option<&StickConfig> {
        let left = self.left_stick.as_ref()?;
        let right = self.right_stick.as_ref()?;
        match stick {
            StickId::Left if right.joystick == StickId::Left => Some(right),
            StickId::Left => Some(left),
            StickId::Right if left.joystick == StickId::Right => Some(left),
            StickId::Right => Some(right),
            StickId::Unbound => None,
        }
    }

    /// Resolve a raw snapshot through this mapping. The first entry to mark a
    /// logical button pressed wins; later entries for the same button cannot
    /// release it. An empty mapping passes the raw state through.
    pub fn resolve(&self, raw: &GamepadStateSnapshot) -> GamepadStateSnapshot {
        if self.buttons.is_empty() {
            return raw.clone();
        }

        let mut result = GamepadStateSnapshot::default();
        for entry in self.buttons.iter().filter(|entry| entry.is_valid()) {
            if !result.is_pressed(entry.to) {
                result.set_pressed(entry.to, raw.is_pressed(entry.from));
            }
        }

        for stick in [StickId::Left, StickId::Right] {
            result.set_stick(stick, raw.stick(self.stick_source(stick)));
        }

        result
    }
}
