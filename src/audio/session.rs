use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::sync::{AtomicF32, LockExt};

use super::backend::{AudioBackend, AudioCallback, AudioStream, StreamSpec};
use super::driver::SessionSet;
use super::event::UpdateEvent;
use super::mix::mix_with_volume;
use super::ring_buffer::RingBuffer;
use super::{AudioBuffer, SampleFormat, TARGET_SAMPLE_COUNT};

/// Tracks how much of one queued [AudioBuffer] the hardware has played
#[derive(Debug)]
pub struct QueuedSegment {
    pub id: u64,
    pub sample_count: u64,
    played: AtomicU64,
}

impl QueuedSegment {
    fn new(id: u64, sample_count: u64) -> Self {
        Self {
            id,
            sample_count,
            played: AtomicU64::new(0),
        }
    }

    pub fn played_sample_count(&self) -> u64 {
        self.played.load(Ordering::Acquire)
    }
}

/// Bytes waiting for the hardware. Only copies happen under its lock.
#[derive(Default)]
struct Playback {
    ring: RingBuffer,
    // Reused by the callback so reads do not allocate
    scratch: Vec<u8>,
}

/// Part of the session the hardware callback reaches into
struct SessionShared {
    format: SampleFormat,
    bytes_per_frame: usize,
    playback: Mutex<Playback>,
    segments: Mutex<VecDeque<QueuedSegment>>,
    // Frames played while the segment queue was busy, attributed later
    unattributed: AtomicU64,
    played_samples: AtomicU64,
    volume: AtomicF32,
    master_volume: Arc<AtomicF32>,
    update_event: Arc<UpdateEvent>,
}

impl SessionShared {
    /// Credit played frames to the queued segments, oldest first
    fn attribute(&self, frames: u64) {
        let Some(mut segments) = self.segments.try_lock_or_recover() else {
            self.unattributed.fetch_add(frames, Ordering::AcqRel);
            return;
        };

        let mut remaining = frames + self.unattributed.swap(0, Ordering::AcqRel);
        let mut need_update = false;
        while remaining > 0 {
            let Some(segment) = segments.front() else {
                break;
            };
            let played = segment.played.load(Ordering::Acquire);
            let still_needed = segment.sample_count.saturating_sub(played);
            let played_now = still_needed.min(remaining);
            segment.played.fetch_add(played_now, Ordering::AcqRel);
            self.played_samples.fetch_add(played_now, Ordering::AcqRel);
            remaining -= played_now;

            if played + played_now >= segment.sample_count {
                segments.pop_front();
                need_update = true;
            }
        }

        if need_update {
            self.update_event.set();
        }
    }
}

impl AudioCallback for SessionShared {
    fn fill(&self, output: &mut [u8]) {
        let frames = {
            // The application thread may be writing; never wait for it here.
            let Some(mut guard) = self.playback.try_lock_or_recover() else {
                output.fill(0);
                return;
            };
            let playback = &mut *guard;

            let bpf = self.bytes_per_frame;
            let max_frames = output.len() / bpf;
            let buffered_frames = playback.ring.len() / bpf;
            let frames = max_frames.min(buffered_frames);
            output.fill(0);
            if frames > 0 {
                let bytes = frames * bpf;
                if playback.scratch.len() < bytes {
                    playback.scratch.resize(bytes, 0);
                }
                playback.ring.read(&mut playback.scratch[..bytes]);

                let volume = self.volume.load() * self.master_volume.load();
                mix_with_volume(
                    &playback.scratch[..bytes],
                    &mut output[..bytes],
                    self.format,
                    volume,
                );
            }
            frames as u64
        };

        if frames > 0 || self.unattributed.load(Ordering::Acquire) > 0 {
            self.attribute(frames);
        }
    }
}

struct StreamSlot {
    stream: Option<Box<dyn AudioStream>>,
    sample_count: u32,
    has_setup_error: bool,
    started: bool,
}

/// Playback session feeding one hardware stream.
///
/// The application queues buffers with [OutputSession::queue_buffer] and the
/// backend pulls them through its callback at the hardware's pace. The stream
/// is opened lazily with the first buffer and reopened whenever a bigger
/// buffer comes in. A failed open is not retried; instead queued buffers are
/// reported as played straight away so the application keeps running.
pub struct OutputSession {
    id: u64,
    backend: Arc<dyn AudioBackend>,
    sessions: Arc<SessionSet>,
    sample_rate: u32,
    channel_count: u32,
    shared: Arc<SessionShared>,
    slot: Mutex<StreamSlot>,
    // Keeps segment and byte order the same across concurrent writers
    writer: Mutex<()>,
}

impl OutputSession {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: u64,
        backend: Arc<dyn AudioBackend>,
        sessions: Arc<SessionSet>,
        format: SampleFormat,
        sample_rate: u32,
        channel_count: u32,
        update_event: Arc<UpdateEvent>,
        master_volume: Arc<AtomicF32>,
    ) -> Self {
        let shared = SessionShared {
            format,
            bytes_per_frame: format.sample_size() * channel_count as usize,
            playback: Mutex::new(Playback::default()),
            segments: Mutex::new(VecDeque::new()),
            unattributed: AtomicU64::new(0),
            played_samples: AtomicU64::new(0),
            volume: AtomicF32::new(1.0),
            master_volume,
            update_event,
        };
        Self {
            id,
            backend,
            sessions,
            sample_rate,
            channel_count,
            shared: Arc::new(shared),
            slot: Mutex::new(StreamSlot {
                stream: None,
                sample_count: u32::MAX,
                has_setup_error: false,
                started: false,
            }),
            writer: Mutex::new(()),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn format(&self) -> SampleFormat {
        self.shared.format
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channel_count(&self) -> u32 {
        self.channel_count
    }

    /// Number of frames contained in the given buffer
    pub fn sample_count(&self, buffer: &AudioBuffer) -> u64 {
        (buffer.data.len() / self.shared.bytes_per_frame) as u64
    }

    /// Frame count the current stream was opened for, if there is one
    pub fn stream_sample_count(&self) -> Option<u32> {
        let slot = self.slot.lock_or_recover();
        slot.stream.as_ref().map(|_| slot.sample_count)
    }

    pub fn has_setup_error(&self) -> bool {
        self.slot.lock_or_recover().has_setup_error
    }

    /// Open the hardware stream if there is none yet, or reopen it if the
    /// buffer holds more frames than the current stream was opened for.
    pub fn ensure_stream_setup(&self, buffer: &AudioBuffer) {
        let frames = u32::try_from(self.sample_count(buffer)).unwrap_or(u32::MAX);
        let mut slot = self.slot.lock_or_recover();

        let grow = frames >= TARGET_SAMPLE_COUNT && frames > slot.sample_count;
        let needs_setup = !slot.has_setup_error && (slot.stream.is_none() || grow);
        if !needs_setup {
            return;
        }

        let sample_count = frames.max(TARGET_SAMPLE_COUNT);
        let spec = StreamSpec {
            format: self.shared.format,
            sample_rate: self.sample_rate,
            channel_count: self.channel_count,
            frame_count: sample_count,
        };
        let callback: Arc<dyn AudioCallback> = self.shared.clone();
        let mut stream = match self.backend.open_stream(&spec, callback) {
            Ok(stream) => stream,
            Err(e) => {
                log::error!("Failed to set up audio stream: {e:?}");
                slot.has_setup_error = true;
                return;
            }
        };

        {
            let mut playback = self.shared.playback.lock_or_recover();
            let bytes = sample_count as usize * self.shared.bytes_per_frame;
            if playback.scratch.len() < bytes {
                playback.scratch.resize(bytes, 0);
            }
        }

        if slot.started {
            if let Err(e) = stream.resume() {
                log::error!("Failed to resume audio stream: {e:?}");
            }
        }

        // Replacing the stream drops (and destroys) the previous one
        slot.stream = Some(stream);
        slot.sample_count = sample_count;
        log::info!(
            "New audio stream setup with a target sample count of {sample_count} ({:?}, {} Hz, {} channels)",
            spec.format,
            spec.sample_rate,
            spec.channel_count
        );
    }

    /// Queue a buffer for playback. A buffer without a single frame counts
    /// as played straight away.
    pub fn queue_buffer(&self, buffer: &AudioBuffer) {
        let frames = self.sample_count(buffer);
        if frames == 0 {
            self.shared.update_event.set();
            return;
        }

        self.ensure_stream_setup(buffer);
        let has_stream = self.slot.lock_or_recover().stream.is_some();
        if !has_stream {
            self.shared
                .played_samples
                .fetch_add(frames, Ordering::AcqRel);
            self.shared.update_event.set();
            return;
        }

        let _writer = self.writer.lock_or_recover();
        // The segment goes first so the callback never plays bytes it cannot
        // attribute to a buffer.
        self.shared
            .segments
            .lock_or_recover()
            .push_back(QueuedSegment::new(buffer.id, frames));
        let mut playback = self.reserve_ring(buffer.data.len());
        playback.ring.write(&buffer.data);
    }

    /// Lock the ring once it has room for `additional` more bytes. Any new
    /// storage is allocated with the lock released.
    fn reserve_ring(&self, additional: usize) -> MutexGuard<'_, Playback> {
        loop {
            let playback = self.shared.playback.lock_or_recover();
            let needed = playback.ring.len() + additional;
            let capacity = playback.ring.capacity_for(needed);
            if capacity == playback.ring.capacity() {
                return playback;
            }
            drop(playback);

            let storage = vec![0; capacity];
            let mut playback = self.shared.playback.lock_or_recover();
            if playback.ring.len() + additional > capacity {
                continue;
            }
            match playback.ring.replace_storage(storage) {
                Ok(()) => return playback,
                Err(_) => continue,
            }
        }
    }

    /// Total number of frames played since the session was opened
    pub fn played_sample_count(&self) -> u64 {
        self.shared.played_samples.load(Ordering::Acquire)
    }

    pub fn volume(&self) -> f32 {
        self.shared.volume.load()
    }

    /// Set the linear volume applied from the next callback on
    pub fn set_volume(&self, volume: f32) {
        self.shared.volume.store(volume);
    }

    /// Whether the hardware is done with the given buffer, so that the
    /// application may reuse it.
    pub fn was_buffer_fully_consumed(&self, buffer: &AudioBuffer) -> bool {
        !self
            .shared
            .segments
            .lock_or_recover()
            .iter()
            .any(|segment| segment.id == buffer.id)
    }

    /// Number of buffers waiting to be played completely
    pub fn queued_buffer_count(&self) -> usize {
        self.shared.segments.lock_or_recover().len()
    }

    #[cfg(test)]
    pub(crate) fn lock_segments(&self) -> MutexGuard<'_, VecDeque<QueuedSegment>> {
        self.shared.segments.lock_or_recover()
    }

    pub fn is_started(&self) -> bool {
        self.slot.lock_or_recover().started
    }

    pub fn start(&self) {
        let mut slot = self.slot.lock_or_recover();
        if slot.started {
            return;
        }
        if let Some(stream) = slot.stream.as_mut() {
            if let Err(e) = stream.resume() {
                log::error!("Failed to resume audio stream: {e:?}");
            }
        }
        slot.started = true;
    }

    pub fn stop(&self) {
        let mut slot = self.slot.lock_or_recover();
        if !slot.started {
            return;
        }
        if let Some(stream) = slot.stream.as_mut() {
            if let Err(e) = stream.pause() {
                log::error!("Failed to pause audio stream: {e:?}");
            }
        }
        slot.started = false;
    }

    /// Stop playback and destroy the stream. Only the first call, whether
    /// made directly or through the driver, has an effect.
    pub fn dispose(&self) {
        if !self.sessions.unregister(self.id) {
            return;
        }
        self.stop();

        let stream = self.slot.lock_or_recover().stream.take();
        drop(stream);

        self.shared.playback.lock_or_recover().ring.clear();
        self.shared.segments.lock_or_recover().clear();
        self.shared.unattributed.store(0, Ordering::Release);
        log::debug!("Disposed audio session {}", self.id);
    }
}

impl Drop for OutputSession {
    fn drop(&mut self) {
        self.dispose();
    }
}
