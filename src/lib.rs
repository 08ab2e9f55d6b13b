pub mod audio;
pub mod cli;
pub mod config;
pub mod daemon;
pub mod drivers;
pub mod input;
pub mod sync;
pub mod watcher;
