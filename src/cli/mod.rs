pub mod device;
pub mod profile;

use std::error::Error;
use std::path::Path;

use clap::{Parser, Subcommand};

use crate::config::{path::find_profile, InputProfile};
use crate::daemon::{DEFAULT_ASPECT_RATIO, DEFAULT_FRAME_RATE};

/// Profile loaded when none is given on the command line
pub const DEFAULT_PROFILE: &str = "default";

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Input profile name, or path to an input profile file
    #[arg(short, long, default_value = DEFAULT_PROFILE, global = true)]
    pub profile: String,
    /// Number of input frames per second
    #[arg(long, default_value_t = DEFAULT_FRAME_RATE, global = true)]
    pub frame_rate: u32,
    /// Aspect ratio of the console image, used to map the mouse position
    #[arg(long, default_value_t = DEFAULT_ASPECT_RATIO, global = true)]
    pub aspect_ratio: f32,
    #[command(subcommand)]
    pub cmd: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start the InputFuse daemon (default)
    Run,
    /// List the input profiles found in the profile search paths
    Profiles,
    /// List the connected gamepads
    Devices,
}

/// Load the input profile named on the command line. An existing file path is
/// loaded directly; anything else is looked up by name in the profile search
/// paths.
pub fn load_profile(name: &str) -> Result<InputProfile, Box<dyn Error + Send + Sync>> {
    let path = Path::new(name);
    if path.is_file() {
        log::debug!("Loading input profile from {path:?}");
        return Ok(InputProfile::from_yaml_file(path)?);
    }

    find_profile(name).ok_or_else(|| format!("No input profile found with name: {name}").into())
}
