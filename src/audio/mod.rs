pub mod backend;
pub mod driver;
pub mod event;
pub mod mix;
pub mod null;
pub mod ring_buffer;
pub mod session;
#[cfg(test)]
mod session_test;

/// Smallest number of frames a hardware stream is opened for
pub const TARGET_SAMPLE_COUNT: u32 = 240;

/// Sample rate used when a session does not ask for one
pub const TARGET_SAMPLE_RATE: u32 = 48000;

/// Most channels a session can carry (5.1)
pub const CHANNEL_COUNT_MAX: u32 = 6;

/// PCM sample encodings an application can hand to a session. Multi-byte
/// formats are little endian and signed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleFormat {
    PcmInt8,
    PcmInt16,
    PcmInt24,
    PcmInt32,
    PcmFloat,
}

impl SampleFormat {
    /// Size of a single sample of one channel, in bytes
    pub fn sample_size(&self) -> usize {
        match self {
            SampleFormat::PcmInt8 => 1,
            SampleFormat::PcmInt16 => 2,
            SampleFormat::PcmInt24 => 3,
            SampleFormat::PcmInt32 => 4,
            SampleFormat::PcmFloat => 4,
        }
    }
}

/// Direction of an audio session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

/// Block of PCM data queued by the application. The id identifies the block
/// until the session reports it as consumed, after which the application may
/// recycle it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AudioBuffer {
    pub id: u64,
    pub data: Vec<u8>,
}

impl AudioBuffer {
    pub fn new(id: u64, data: Vec<u8>) -> Self {
        Self { id, data }
    }
}
