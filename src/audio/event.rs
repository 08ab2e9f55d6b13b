use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use crate::sync::LockExt;

/// Manual reset event. Once set it stays set, waking every waiter, until it
/// is explicitly reset.
#[derive(Debug, Default)]
pub struct UpdateEvent {
    signaled: Mutex<bool>,
    condvar: Condvar,
}

impl UpdateEvent {
    pub fn new(signaled: bool) -> Self {
        Self {
            signaled: Mutex::new(signaled),
            condvar: Condvar::new(),
        }
    }

    pub fn set(&self) {
        let mut signaled = self.signaled.lock_or_recover();
        *signaled = true;
        self.condvar.notify_all();
    }

    pub fn reset(&self) {
        *self.signaled.lock_or_recover() = false;
    }

    pub fn is_set(&self) -> bool {
        *self.signaled.lock_or_recover()
    }

    /// Block until the event is set or the timeout elapses. Returns whether
    /// the event was set.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut signaled = self.signaled.lock_or_recover();
        while !*signaled {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            signaled = match self.condvar.wait_timeout(signaled, deadline - now) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
        true
    }
}
