pub mod capability;
pub mod driver;
pub mod gamepad;
pub mod host;
pub mod motion;
pub mod npad;
pub mod registry;
#[cfg(test)]
mod registry_test;
