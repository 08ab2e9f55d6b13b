#[cfg(any(test, feature = "mock"))]
pub mod mock;

use std::sync::Arc;

use thiserror::Error;

use super::SampleFormat;

/// Possible errors from a host audio backend or session setup
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AudioError {
    #[error("Unsupported sample format: {0:?}")]
    UnsupportedFormat(SampleFormat),
    #[error("Input direction is not supported by this backend")]
    UnsupportedDirection,
    #[error("Failed to open audio stream: {0}")]
    Open(String),
    #[error("Audio device query failed: {0}")]
    Query(String),
    #[error("Audio stream control failed: {0}")]
    Control(String),
}

/// Parameters a hardware stream is opened with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSpec {
    pub format: SampleFormat,
    pub sample_rate: u32,
    pub channel_count: u32,
    /// Number of frames the backend should ask for per callback
    pub frame_count: u32,
}

impl StreamSpec {
    /// Size of one frame (one sample for every channel), in bytes
    pub fn bytes_per_frame(&self) -> usize {
        self.format.sample_size() * self.channel_count as usize
    }
}

/// Pull side of a stream. The backend invokes it from a thread it owns,
/// asking for the output region to be filled with PCM data.
pub trait AudioCallback: Send + Sync {
    fn fill(&self, output: &mut [u8]);
}

/// Opened hardware stream. Streams start paused; dropping the stream destroys
/// it, and once dropped its callback is never invoked again.
pub trait AudioStream: Send {
    fn resume(&mut self) -> Result<(), AudioError>;
    fn pause(&mut self) -> Result<(), AudioError>;
}

/// Host audio API
pub trait AudioBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Open a playback stream on the default device, pulling data through
    /// the given callback.
    fn open_stream(
        &self,
        spec: &StreamSpec,
        callback: Arc<dyn AudioCallback>,
    ) -> Result<Box<dyn AudioStream>, AudioError>;

    /// Channel count of the default playback device
    fn default_channel_count(&self) -> Result<u32, AudioError>;
}
