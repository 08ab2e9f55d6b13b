use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError, TryLockError};

/// Mutexes shared between the application, host event and audio threads.
///
/// A panic on one of those threads must not take the others down with it, so
/// a poisoned lock is recovered and the inner state used as-is.
pub trait LockExt<T> {
    /// Block until the lock is acquired
    fn lock_or_recover(&self) -> MutexGuard<'_, T>;

    /// Acquire the lock only if it is free right now. Returns `None` if another
    /// thread currently holds it.
    fn try_lock_or_recover(&self) -> Option<MutexGuard<'_, T>>;
}

impl<T> LockExt<T> for Mutex<T> {
    fn lock_or_recover(&self) -> MutexGuard<'_, T> {
        self.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn try_lock_or_recover(&self) -> Option<MutexGuard<'_, T>> {
        match self.try_lock() {
            Ok(guard) => Some(guard),
            Err(TryLockError::Poisoned(poisoned)) => Some(poisoned.into_inner()),
            Err(TryLockError::WouldBlock) => None,
        }
    }
}

/// `f32` stored in an [AtomicU32] so it can be read from the audio callback
/// without taking a lock.
#[derive(Debug)]
pub struct AtomicF32(AtomicU32);

impl AtomicF32 {
    pub fn new(value: f32) -> Self {
        Self(AtomicU32::new(value.to_bits()))
    }

    pub fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    pub fn store(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}
