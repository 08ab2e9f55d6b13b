//! Scripted [AudioBackend] whose callbacks are pulled by hand.

use std::sync::{Arc, Mutex};

use crate::sync::LockExt;

use super::{AudioBackend, AudioCallback, AudioError, AudioStream, StreamSpec};

#[derive(Default)]
struct StreamState {
    running: bool,
    destroyed: bool,
}

/// Record of a stream opened on the [MockBackend]
pub struct MockStreamRecord {
    pub spec: StreamSpec,
    callback: Arc<dyn AudioCallback>,
    state: Mutex<StreamState>,
}

impl MockStreamRecord {
    pub fn is_running(&self) -> bool {
        self.state.lock_or_recover().running
    }

    pub fn is_destroyed(&self) -> bool {
        self.state.lock_or_recover().destroyed
    }

    /// Invoke the stream callback the way the hardware would, asking for the
    /// given number of bytes. Returns `None` once the stream is destroyed.
    pub fn pull(&self, bytes: usize) -> Option<Vec<u8>> {
        if self.is_destroyed() {
            return None;
        }
        // Garbage the callback must overwrite
        let mut output = vec![0xaa; bytes];
        self.callback.fill(&mut output);
        Some(output)
    }
}

struct MockStream {
    record: Arc<MockStreamRecord>,
    fail_control: bool,
}

impl AudioStream for MockStream {
    fn resume(&mut self) -> Result<(), AudioError> {
        if self.fail_control {
            return Err(AudioError::Control("resume refused".to_string()));
        }
        self.record.state.lock_or_recover().running = true;
        Ok(())
    }

    fn pause(&mut self) -> Result<(), AudioError> {
        if self.fail_control {
            return Err(AudioError::Control("pause refused".to_string()));
        }
        self.record.state.lock_or_recover().running = false;
        Ok(())
    }
}

impl Drop for MockStream {
    fn drop(&mut self) {
        let mut state = self.record.state.lock_or_recover();
        state.running = false;
        state.destroyed = true;
    }
}

#[derive(Default)]
struct MockBackendState {
    streams: Vec<Arc<MockStreamRecord>>,
    open_attempts: usize,
    fail_open: bool,
    fail_control: bool,
    channel_count: Option<u32>,
}

/// Simulated host audio API
#[derive(Default)]
pub struct MockBackend {
    state: Mutex<MockBackendState>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::with_channel_count(2)
    }

    /// Backend whose default device reports the given channel count
    pub fn with_channel_count(channel_count: u32) -> Self {
        let backend = Self::default();
        backend.state.lock_or_recover().channel_count = Some(channel_count);
        backend
    }

    /// Backend whose default device cannot be queried
    pub fn without_default_device() -> Self {
        Self::default()
    }

    /// Make every following open attempt fail
    pub fn fail_open(&self, fail: bool) {
        self.state.lock_or_recover().fail_open = fail;
    }

    /// Make resume and pause fail on streams opened from now on
    pub fn fail_control(&self, fail: bool) {
        self.state.lock_or_recover().fail_control = fail;
    }

    pub fn open_attempts(&self) -> usize {
        self.state.lock_or_recover().open_attempts
    }

    /// Every stream that was successfully opened, oldest first
    pub fn streams(&self) -> Vec<Arc<MockStreamRecord>> {
        self.state.lock_or_recover().streams.clone()
    }

    /// The most recently opened stream that was not destroyed yet
    pub fn live_stream(&self) -> Option<Arc<MockStreamRecord>> {
        self.streams().into_iter().rev().find(|s| !s.is_destroyed())
    }
}

impl AudioBackend for MockBackend {
    fn name(&self) -> &str {
        "Mock"
    }

    fn open_stream(
        &self,
        spec: &StreamSpec,
        callback: Arc<dyn AudioCallback>,
    ) -> Result<Box<dyn AudioStream>, AudioError> {
        let mut state = self.state.lock_or_recover();
        state.open_attempts += 1;
        if state.fail_open {
            return Err(AudioError::Open("no playback device".to_string()));
        }

        let record = Arc::new(MockStreamRecord {
            spec: *spec,
            callback,
            state: Mutex::new(StreamState::default()),
        });
        state.streams.push(record.clone());
        Ok(Box::new(MockStream {
            record,
            fail_control: state.fail_control,
        }))
    }

    fn default_channel_count(&self) -> Result<u32, AudioError> {
        self.state
            .lock_or_recover()
            .channel_count
            .ok_or_else(|| AudioError::Query("no default playback device".to_string()))
    }
}
