use std::error::Error;
use std::fs::File;
use std::io::Write;

use inputfuse::config::InputProfile;
use schemars::schema_for;

const SCHEMA_PATH: &str = "./rootfs/usr/share/inputfuse/schema/input_profile_v1.json";

fn main() -> Result<(), Box<dyn Error>> {
    let input_profile_schema = schema_for!(InputProfile);
    let mut file = File::create(SCHEMA_PATH)?;
    write!(
        file,
        "{}",
        serde_json::to_string_pretty(&input_profile_schema)?
    )?;
    Ok(())
}
