use std::env;
use std::error::Error;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::watch;

use inputfuse::cli::device::handle_devices;
use inputfuse::cli::profile::handle_profiles;
use inputfuse::cli::{load_profile, Args, Commands};
use inputfuse::daemon::{run_frames, LoggingHidService};
use inputfuse::input::driver::HostDriver;
use inputfuse::input::npad::manager::NpadManager;
use inputfuse::input::registry::GamepadRegistry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let log_level = match env::var("LOG_LEVEL") {
        Ok(value) => value,
        Err(_) => "info".to_string(),
    };
    env::set_var("RUST_LOG", log_level);
    env_logger::init();

    let args = Args::parse();
    match args.cmd.clone().unwrap_or(Commands::Run) {
        Commands::Run => run(args).await,
        Commands::Profiles => handle_profiles(),
        Commands::Devices => {
            let registry = GamepadRegistry::new(HostDriver::global())?;
            handle_devices(&registry)
        }
    }
}

async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    log::info!("Starting InputFuse v{}", VERSION);

    let profile = load_profile(&args.profile)?;
    log::info!(
        "Loaded input profile '{}' with {} player(s)",
        profile.name,
        profile.players.len()
    );

    // Setup CTRL+C handler
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Unable to listen for shutdown signal: {e:?}");
            return;
        }
        log::info!("Shutting down");
        let _ = shutdown_tx.send(true);
    });

    let registry = GamepadRegistry::new(HostDriver::global())?;
    log::info!("Found {} gamepad(s)", registry.gamepad_ids().len());

    let manager = NpadManager::new(registry.clone());
    manager.initialize(
        Arc::new(LoggingHidService::new()),
        profile.players,
        profile.enable_keyboard,
        profile.enable_mouse,
        None,
        None,
    );

    run_frames(&manager, args.frame_rate, args.aspect_ratio, shutdown_rx).await;

    manager.dispose();
    drop(manager);
    drop(registry);
    log::info!("InputFuse stopped");

    Ok(())
}
