use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use crate::sync::{AtomicF32, LockExt};

use super::backend::{AudioBackend, AudioCallback, AudioError, StreamSpec};
use super::event::UpdateEvent;
use super::session::OutputSession;
use super::{
    Direction, SampleFormat, CHANNEL_COUNT_MAX, TARGET_SAMPLE_COUNT, TARGET_SAMPLE_RATE,
};

/// Sessions currently open on a driver
#[derive(Default)]
pub(crate) struct SessionSet {
    sessions: Mutex<HashMap<u64, Weak<OutputSession>>>,
    next_id: AtomicU64,
}

impl SessionSet {
    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn register(&self, session: &Arc<OutputSession>) {
        self.sessions
            .lock_or_recover()
            .insert(session.id(), Arc::downgrade(session));
    }

    /// Forget the session. Returns false if it was already unregistered.
    pub(crate) fn unregister(&self, id: u64) -> bool {
        self.sessions.lock_or_recover().remove(&id).is_some()
    }

    fn len(&self) -> usize {
        self.sessions.lock_or_recover().len()
    }

    fn live_sessions(&self) -> Vec<Arc<OutputSession>> {
        self.sessions
            .lock_or_recover()
            .values()
            .filter_map(Weak::upgrade)
            .collect()
    }
}

struct Silence;

impl AudioCallback for Silence {
    fn fill(&self, output: &mut [u8]) {
        output.fill(0);
    }
}

/// Entry point of the audio output side. Owns the host audio backend and
/// hands out [OutputSession]s that all share one update event and one master
/// volume.
pub struct OutputDriver {
    backend: Arc<dyn AudioBackend>,
    update_event: Arc<UpdateEvent>,
    pause_event: Arc<UpdateEvent>,
    master_volume: Arc<AtomicF32>,
    sessions: Arc<SessionSet>,
    supports_surround: bool,
}

impl OutputDriver {
    pub fn new(backend: Arc<dyn AudioBackend>) -> Self {
        let supports_surround = match backend.default_channel_count() {
            Ok(channels) => channels >= CHANNEL_COUNT_MAX,
            Err(e) => {
                log::error!("Failed to query the default playback device: {e:?}");
                true
            }
        };
        log::debug!(
            "Audio backend {} ready, surround support: {supports_surround}",
            backend.name()
        );

        Self {
            backend,
            update_event: Arc::new(UpdateEvent::new(false)),
            pause_event: Arc::new(UpdateEvent::new(true)),
            master_volume: Arc::new(AtomicF32::new(1.0)),
            sessions: Arc::new(SessionSet::default()),
            supports_surround,
        }
    }

    /// Whether the backend can open a stream in the widest configuration a
    /// session may ask for.
    pub fn is_supported(backend: &dyn AudioBackend) -> bool {
        let spec = StreamSpec {
            format: SampleFormat::PcmInt16,
            sample_rate: TARGET_SAMPLE_RATE,
            channel_count: CHANNEL_COUNT_MAX,
            frame_count: TARGET_SAMPLE_COUNT,
        };
        match backend.open_stream(&spec, Arc::new(Silence)) {
            Ok(_) => true,
            Err(e) => {
                log::debug!("Audio backend {} is not usable: {e:?}", backend.name());
                false
            }
        }
    }

    /// Event set by sessions whenever a queued buffer finished playing
    pub fn update_required_event(&self) -> Arc<UpdateEvent> {
        self.update_event.clone()
    }

    pub fn pause_event(&self) -> Arc<UpdateEvent> {
        self.pause_event.clone()
    }

    pub fn volume(&self) -> f32 {
        self.master_volume.load()
    }

    /// Set the master volume, applied on top of every session's own volume
    pub fn set_volume(&self, volume: f32) {
        self.master_volume.store(volume);
    }

    /// Open a playback session. A channel count of 0 means stereo and a
    /// sample rate of 0 means the target rate.
    pub fn open_session(
        &self,
        direction: Direction,
        format: SampleFormat,
        sample_rate: u32,
        channel_count: u32,
    ) -> Result<Arc<OutputSession>, AudioError> {
        let channel_count = if channel_count == 0 { 2 } else { channel_count };
        let sample_rate = if sample_rate == 0 {
            TARGET_SAMPLE_RATE
        } else {
            sample_rate
        };

        if !self.supports_direction(direction) {
            return Err(AudioError::UnsupportedDirection);
        }
        if !self.supports_sample_format(format) {
            return Err(AudioError::UnsupportedFormat(format));
        }

        let session = Arc::new(OutputSession::new(
            self.sessions.next_id(),
            self.backend.clone(),
            self.sessions.clone(),
            format,
            sample_rate,
            channel_count,
            self.update_event.clone(),
            self.master_volume.clone(),
        ));
        self.sessions.register(&session);
        log::debug!(
            "Opened audio session {} ({format:?}, {sample_rate} Hz, {channel_count} channels)",
            session.id()
        );

        Ok(session)
    }

    /// Number of sessions that were opened and not disposed yet
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn supports_sample_rate(&self, _sample_rate: u32) -> bool {
        true
    }

    pub fn supports_sample_format(&self, format: SampleFormat) -> bool {
        format != SampleFormat::PcmInt24
    }

    pub fn supports_channel_count(&self, channel_count: u32) -> bool {
        if channel_count == CHANNEL_COUNT_MAX {
            return self.supports_surround;
        }
        true
    }

    pub fn supports_direction(&self, direction: Direction) -> bool {
        direction == Direction::Output
    }

    /// Dispose every session still open on this driver
    pub fn dispose(&self) {
        for session in self.sessions.live_sessions() {
            session.dispose();
        }
    }
}

impl Drop for OutputDriver {
    fn drop(&mut self) {
        self.dispose();
    }
}
