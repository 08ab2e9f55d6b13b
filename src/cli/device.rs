use std::error::Error;

use tabled::settings::{Panel, Style};
use tabled::{Table, Tabled};

use crate::input::capability::GamepadFeatures;
use crate::input::gamepad::Gamepad;
use crate::input::registry::GamepadRegistry;

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "Id")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Motion")]
    motion: bool,
    #[tabled(rename = "Rumble")]
    rumble: bool,
}

/// Print every gamepad known to the registry, including the pair composite
/// when one is available
pub fn handle_devices(registry: &GamepadRegistry) -> Result<(), Box<dyn Error + Send + Sync>> {
    let mut devices = Vec::new();
    for id in registry.gamepad_ids() {
        let Some(mut gamepad) = registry.get_gamepad(&id) else {
            continue;
        };
        let features = gamepad.features();
        devices.push(DeviceRow {
            id,
            name: gamepad.name().to_string(),
            motion: features.contains(GamepadFeatures::MOTION),
            rumble: features.contains(GamepadFeatures::RUMBLE),
        });
        gamepad.dispose();
    }
    let count = devices.len();

    let mut table = Table::new(devices);
    table
        .with(Style::modern_rounded())
        .with(Panel::header("Gamepads"));
    println!("{table}");
    println!("Found {count} gamepad(s)");

    Ok(())
}
