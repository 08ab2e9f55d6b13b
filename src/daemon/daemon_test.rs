use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::config::{ControllerType, InputConfig, PlayerIndex};
use crate::input::driver::HostDriver;
use crate::input::host::mock::{MockDevice, MockHost};
use crate::input::host::PhysicalButton;
use crate::input::npad::hle::{ControllerKeys, VibrationValue};
use crate::input::npad::manager::NpadManager;
use crate::input::npad::service::HidService;
use crate::input::registry::GamepadRegistry;

use super::{frame_period, run_frames, LoggingHidService};

#[tokio::test]
async fn test_frames_run_until_shutdown() -> Result<(), Box<dyn Error>> {
    let host = Arc::new(MockHost::new());
    let registry = GamepadRegistry::new(Arc::new(HostDriver::new(host.clone())))?;
    let instance = host.plug(MockDevice::standard("Pad"));
    registry.handle_connect(instance);
    let id = registry.gamepad_ids().pop().unwrap_or_default();

    let manager = NpadManager::new(registry.clone());
    let hid = Arc::new(LoggingHidService::new());
    let config = InputConfig::new(&id, PlayerIndex::Player1, ControllerType::ProController);
    manager.initialize(hid.clone(), vec![config], false, false, None, None);
    host.press(instance, PhysicalButton::East);

    let (tx, rx) = watch::channel(false);
    let stop = async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(true)
    };
    let (frames, sent) = tokio::join!(run_frames(&manager, 1000, 16.0 / 9.0, rx), stop);
    sent?;

    assert!(frames > 0);
    assert_eq!(hid.frame_count(), frames);
    let state = hid.npad_state(PlayerIndex::Player1).unwrap_or_default();
    assert!(state.buttons.contains(ControllerKeys::A), "{state:?}");

    manager.dispose();
    Ok(())
}

#[tokio::test]
async fn test_frames_stop_when_sender_is_gone() -> Result<(), Box<dyn Error>> {
    let host = Arc::new(MockHost::new());
    let registry = GamepadRegistry::new(Arc::new(HostDriver::new(host)))?;
    let manager = NpadManager::new(registry);

    let (tx, rx) = watch::channel(false);
    drop(tx);
    let frames = tokio::time::timeout(
        Duration::from_secs(5),
        run_frames(&manager, 1, 16.0 / 9.0, rx),
    )
    .await?;
    assert!(frames <= 1);
    Ok(())
}

#[test]
fn test_rumble_is_queued_per_player() -> Result<(), Box<dyn Error>> {
    let hid = LoggingHidService::new();
    let strong = VibrationValue {
        amplitude_low: 1.0,
        amplitude_high: 1.0,
        ..Default::default()
    };
    let weak = VibrationValue {
        amplitude_low: 0.1,
        ..Default::default()
    };
    hid.queue_rumble(PlayerIndex::Player1, strong, strong);
    hid.queue_rumble(PlayerIndex::Player1, weak, weak);

    assert_eq!(hid.dequeue_rumble(PlayerIndex::Player2), None);
    assert_eq!(hid.dequeue_rumble(PlayerIndex::Player1), Some((strong, strong)));
    assert_eq!(hid.dequeue_rumble(PlayerIndex::Player1), Some((weak, weak)));
    assert_eq!(hid.dequeue_rumble(PlayerIndex::Player1), None);
    Ok(())
}

#[test]
fn test_frame_period() -> Result<(), Box<dyn Error>> {
    assert_eq!(frame_period(0), Duration::from_secs(1));
    assert_eq!(frame_period(4), Duration::from_millis(250));
    Ok(())
}
