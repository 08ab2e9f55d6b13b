use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;

use thiserror::Error;

use crate::drivers::evdev::driver::EvdevHost;
use crate::sync::LockExt;

use super::host::{HostError, HostEvent, HostInput};

/// Interval between two polls of the host event queue
pub const EVENT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Possible errors bringing up the host input subsystem
#[derive(Error, Debug)]
pub enum DriverError {
    #[error("Failed to initialize host input: {0}")]
    Init(#[from] HostError),
    #[error("Failed to spawn event thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Callback invoked on the event thread for every [HostEvent]
pub type HostListener = Arc<dyn Fn(&HostEvent) + Send + Sync>;

struct Worker {
    running: Arc<AtomicBool>,
    thread_id: ThreadId,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct DriverState {
    ref_count: usize,
    worker: Option<Worker>,
}

/// Reference counted owner of a [HostInput] backend.
///
/// The first [HostDriver::acquire] initializes the backend and starts a
/// thread that polls it for events; the matching last [HostDriver::release]
/// stops that thread and shuts the backend down.
pub struct HostDriver {
    host: Arc<dyn HostInput>,
    state: Mutex<DriverState>,
    listeners: Arc<Mutex<Vec<(u64, HostListener)>>>,
    next_token: AtomicU64,
}

impl HostDriver {
    pub fn new(host: Arc<dyn HostInput>) -> Self {
        Self {
            host,
            state: Mutex::new(DriverState::default()),
            listeners: Arc::new(Mutex::new(Vec::new())),
            next_token: AtomicU64::new(1),
        }
    }

    /// Process-wide driver backed by evdev
    pub fn global() -> Arc<HostDriver> {
        static GLOBAL: OnceLock<Arc<HostDriver>> = OnceLock::new();
        GLOBAL
            .get_or_init(|| Arc::new(HostDriver::new(Arc::new(EvdevHost::new()))))
            .clone()
    }

    pub fn host(&self) -> Arc<dyn HostInput> {
        self.host.clone()
    }

    /// Take a reference on the driver, initializing the backend if this is the
    /// first one. A failed initialization leaves the count untouched.
    pub fn acquire(&self) -> Result<(), DriverError> {
        let mut state = self.state.lock_or_recover();
        if state.ref_count > 0 {
            state.ref_count += 1;
            return Ok(());
        }

        log::debug!("Initializing host input");
        self.host.init()?;

        let running = Arc::new(AtomicBool::new(true));
        let handle = {
            let running = running.clone();
            let host = self.host.clone();
            let listeners = self.listeners.clone();
            thread::Builder::new()
                .name("host-input-events".to_string())
                .spawn(move || run_event_loop(host, listeners, running))
        };
        let handle = match handle {
            Ok(handle) => handle,
            Err(e) => {
                self.host.quit();
                return Err(e.into());
            }
        };

        state.worker = Some(Worker {
            running,
            thread_id: handle.thread().id(),
            handle,
        });
        state.ref_count = 1;
        log::info!("Host input initialized");

        Ok(())
    }

    /// Drop a reference on the driver. The last release stops the event thread
    /// and shuts the backend down.
    pub fn release(&self) {
        let mut state = self.state.lock_or_recover();
        match state.ref_count {
            0 => {
                log::warn!("Host input released more times than acquired");
                return;
            }
            1 => (),
            _ => {
                state.ref_count -= 1;
                return;
            }
        }

        state.ref_count = 0;
        if let Some(worker) = state.worker.take() {
            worker.running.store(false, Ordering::SeqCst);
            // The last reference can be dropped from a listener running on the
            // event thread itself, which cannot join itself.
            if worker.thread_id != thread::current().id() && worker.handle.join().is_err() {
                log::error!("Host input event thread panicked");
            }
        }
        self.host.quit();
        log::info!("Host input shut down");
    }

    pub fn is_initialized(&self) -> bool {
        self.state.lock_or_recover().ref_count > 0
    }

    pub fn ref_count(&self) -> usize {
        self.state.lock_or_recover().ref_count
    }

    /// Register a listener for host events. Returns a token for
    /// [HostDriver::unsubscribe].
    pub fn subscribe(&self, listener: HostListener) -> u64 {
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        self.listeners.lock_or_recover().push((token, listener));
        token
    }

    pub fn unsubscribe(&self, token: u64) {
        self.listeners.lock_or_recover().retain(|(t, _)| *t != token);
    }
}

/// Poll the host for events until told to stop, forwarding each event to the
/// registered listeners.
fn run_event_loop(
    host: Arc<dyn HostInput>,
    listeners: Arc<Mutex<Vec<(u64, HostListener)>>>,
    running: Arc<AtomicBool>,
) {
    log::debug!("Started host input event thread");
    while running.load(Ordering::SeqCst) {
        for event in host.poll_events() {
            if let HostEvent::Battery { instance, percent } = &event {
                match percent {
                    Some(percent) => {
                        log::info!("Battery level of device {instance} changed to {percent}%")
                    }
                    None => log::info!("Battery level of device {instance} changed to unknown"),
                }
            }

            let snapshot: Vec<HostListener> = listeners
                .lock_or_recover()
                .iter()
                .map(|(_, listener)| listener.clone())
                .collect();
            for listener in snapshot {
                listener(&event);
            }
        }
        thread::sleep(EVENT_POLL_INTERVAL);
    }
    log::debug!("Stopped host input event thread");
}
