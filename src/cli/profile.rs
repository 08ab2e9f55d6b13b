use std::error::Error;

use tabled::settings::{Panel, Style};
use tabled::{Table, Tabled};

use crate::config::path::{get_multidir_sorted_files, get_profiles_paths};
use crate::config::InputProfile;

#[derive(Tabled)]
struct ProfileRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Players")]
    players: usize,
    #[tabled(rename = "Keyboard")]
    keyboard: bool,
    #[tabled(rename = "Mouse")]
    mouse: bool,
    #[tabled(rename = "Path")]
    path: String,
}

/// Print every input profile found in the profile search paths
pub fn handle_profiles() -> Result<(), Box<dyn Error + Send + Sync>> {
    let files = get_multidir_sorted_files(&get_profiles_paths());

    let mut profiles = Vec::with_capacity(files.len());
    for file in files {
        let profile = match InputProfile::from_yaml_file(&file) {
            Ok(profile) => profile,
            Err(e) => {
                log::warn!("Skipping invalid profile {file:?}: {e}");
                continue;
            }
        };
        profiles.push(ProfileRow {
            name: profile.name,
            players: profile.players.len(),
            keyboard: profile.enable_keyboard,
            mouse: profile.enable_mouse,
            path: file.display().to_string(),
        });
    }
    let count = profiles.len();

    let mut table = Table::new(profiles);
    table
        .with(Style::modern_rounded())
        .with(Panel::header("Input Profiles"));
    println!("{table}");
    println!("Found {count} input profile(s)");

    Ok(())
}
