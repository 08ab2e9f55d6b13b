use std::error::Error;
use std::sync::Arc;

use super::backend::mock::MockBackend;
use super::driver::OutputDriver;
use super::session::OutputSession;
use super::{AudioBuffer, Direction, SampleFormat, TARGET_SAMPLE_COUNT};

const CHANNELS: usize = 2;
const BYTES_PER_FRAME: usize = 2 * CHANNELS;

struct TestSession {
    backend: Arc<MockBackend>,
    driver: OutputDriver,
    session: Arc<OutputSession>,
}

fn open() -> Result<TestSession, Box<dyn Error>> {
    let backend = Arc::new(MockBackend::new());
    let driver = OutputDriver::new(backend.clone());
    let session = driver.open_session(Direction::Output, SampleFormat::PcmInt16, 48000, 2)?;
    Ok(TestSession {
        backend,
        driver,
        session,
    })
}

/// Stereo 16-bit buffer with every sample set to `value`
fn pcm16(id: u64, frames: usize, value: i16) -> AudioBuffer {
    let data = (0..frames * CHANNELS)
        .flat_map(|_| value.to_le_bytes())
        .collect();
    AudioBuffer::new(id, data)
}

fn samples(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|b| i16::from_le_bytes([b[0], b[1]]))
        .collect()
}

#[test]
fn test_stream_is_opened_lazily() -> Result<(), Box<dyn Error>> {
    let test = open()?;
    assert_eq!(test.backend.open_attempts(), 0, "nothing opened before data");
    assert_eq!(test.session.stream_sample_count(), None);

    test.session.queue_buffer(&pcm16(1, 100, 0));
    assert_eq!(test.backend.open_attempts(), 1);
    let stream = test.backend.live_stream().ok_or("stream should be open")?;
    assert_eq!(stream.spec.frame_count, TARGET_SAMPLE_COUNT, "small buffers use the target");
    assert_eq!(stream.spec.channel_count, 2);
    assert!(!stream.is_running(), "session was not started");

    test.session.start();
    assert!(stream.is_running());
    test.session.start();
    assert!(test.session.is_started());

    test.session.stop();
    assert!(!stream.is_running());
    test.session.stop();
    assert!(!test.session.is_started());

    Ok(())
}

#[test]
fn test_stream_grows_but_never_shrinks() -> Result<(), Box<dyn Error>> {
    let test = open()?;
    test.session.start();
    test.session.queue_buffer(&pcm16(1, 240, 0));
    assert_eq!(test.session.stream_sample_count(), Some(240));

    test.session.queue_buffer(&pcm16(2, 480, 0));
    assert_eq!(test.session.stream_sample_count(), Some(480));
    let streams = test.backend.streams();
    assert_eq!(streams.len(), 2, "bigger buffer reopens the stream");
    assert!(streams[0].is_destroyed(), "old stream is replaced");
    assert!(streams[1].is_running(), "new stream picks up the running state");

    test.session.queue_buffer(&pcm16(3, 300, 0));
    test.session.queue_buffer(&pcm16(4, 480, 0));
    test.session.queue_buffer(&pcm16(5, 10, 0));
    assert_eq!(test.backend.streams().len(), 2, "no reopen for smaller buffers");
    assert_eq!(test.session.stream_sample_count(), Some(480));

    Ok(())
}

#[test]
fn test_failed_setup_reports_buffers_as_played() -> Result<(), Box<dyn Error>> {
    let test = open()?;
    let event = test.driver.update_required_event();
    test.backend.fail_open(true);

    let buffer = pcm16(7, 960, 100);
    test.session.queue_buffer(&buffer);
    assert!(test.session.has_setup_error());
    assert_eq!(test.session.played_sample_count(), 960);
    assert!(event.is_set(), "caller is woken up as if the buffer played");
    assert!(test.session.was_buffer_fully_consumed(&buffer));

    // The error sticks even once the device would work again
    event.reset();
    test.backend.fail_open(false);
    test.session.queue_buffer(&pcm16(8, 960, 100));
    assert_eq!(test.backend.open_attempts(), 1, "setup is not retried");
    assert_eq!(test.session.played_sample_count(), 1920);
    assert!(event.is_set());
    assert_eq!(test.session.stream_sample_count(), None);

    Ok(())
}

#[test]
fn test_callback_plays_and_accounts_buffers() -> Result<(), Box<dyn Error>> {
    let test = open()?;
    let event = test.driver.update_required_event();
    let first = pcm16(1, 100, 1000);
    let second = pcm16(2, 100, -1000);
    test.session.queue_buffer(&first);
    test.session.queue_buffer(&second);
    let stream = test.backend.live_stream().ok_or("stream should be open")?;

    let output = stream.pull(60 * BYTES_PER_FRAME).ok_or("stream is live")?;
    assert!(samples(&output).iter().all(|s| *s == 1000));
    assert_eq!(test.session.played_sample_count(), 60);
    assert!(!test.session.was_buffer_fully_consumed(&first));
    assert!(!event.is_set(), "no buffer finished yet");

    let output = stream.pull(80 * BYTES_PER_FRAME).ok_or("stream is live")?;
    let played = samples(&output);
    assert_eq!(played[..80], [1000; 80]);
    assert_eq!(played[80..], [-1000; 80]);
    assert_eq!(test.session.played_sample_count(), 140);
    assert!(test.session.was_buffer_fully_consumed(&first));
    assert!(!test.session.was_buffer_fully_consumed(&second));
    assert!(event.is_set());
    assert_eq!(test.session.queued_buffer_count(), 1);

    // Asking for more than is buffered plays the rest then silence
    event.reset();
    let output = stream.pull(200 * BYTES_PER_FRAME).ok_or("stream is live")?;
    let played = samples(&output);
    assert_eq!(played[..120], [-1000; 120]);
    assert!(played[120..].iter().all(|s| *s == 0));
    assert_eq!(test.session.played_sample_count(), 200);
    assert!(test.session.was_buffer_fully_consumed(&second));
    assert!(event.is_set());

    Ok(())
}

#[test]
fn test_underrun_outputs_silence() -> Result<(), Box<dyn Error>> {
    let test = open()?;
    test.session.queue_buffer(&pcm16(1, 10, 500));
    let stream = test.backend.live_stream().ok_or("stream should be open")?;
    stream.pull(10 * BYTES_PER_FRAME);

    let output = stream.pull(64 * BYTES_PER_FRAME).ok_or("stream is live")?;
    assert!(output.iter().all(|b| *b == 0), "empty ring plays silence");

    test.session.queue_buffer(&pcm16(2, 10, 500));
    let output = stream.pull(BYTES_PER_FRAME - 1).ok_or("stream is live")?;
    assert!(output.iter().all(|b| *b == 0), "less than a frame plays silence");
    assert_eq!(test.session.played_sample_count(), 10);

    Ok(())
}

#[test]
fn test_volume_applies_on_next_callback() -> Result<(), Box<dyn Error>> {
    let test = open()?;
    test.session.queue_buffer(&pcm16(1, 20, 1000));
    let stream = test.backend.live_stream().ok_or("stream should be open")?;

    stream.pull(10 * BYTES_PER_FRAME);
    test.session.set_volume(0.5);
    test.driver.set_volume(0.5);
    assert_eq!(test.session.volume(), 0.5);
    assert_eq!(test.driver.volume(), 0.5);

    let output = stream.pull(10 * BYTES_PER_FRAME).ok_or("stream is live")?;
    assert!(
        samples(&output).iter().all(|s| *s == 250),
        "session and master volume multiply"
    );

    Ok(())
}

#[test]
fn test_dispose_destroys_stream() -> Result<(), Box<dyn Error>> {
    let test = open()?;
    test.session.queue_buffer(&pcm16(1, 100, 1000));
    test.session.start();
    let stream = test.backend.live_stream().ok_or("stream should be open")?;

    test.session.dispose();
    assert!(stream.is_destroyed());
    assert!(!stream.is_running());
    assert!(stream.pull(64).is_none(), "callback never runs again");
    assert_eq!(test.driver.session_count(), 0);
    assert!(!test.session.is_started());

    test.session.dispose();
    assert_eq!(test.driver.session_count(), 0);
    Ok(())
}

#[test]
fn test_consumed_check_covers_every_queued_buffer() -> Result<(), Box<dyn Error>> {
    let test = open()?;
    let first = pcm16(1, 50, 100);
    let second = pcm16(2, 50, 200);
    test.session.queue_buffer(&first);
    test.session.queue_buffer(&second);
    assert!(!test.session.was_buffer_fully_consumed(&first));
    assert!(
        !test.session.was_buffer_fully_consumed(&second),
        "buffers behind the front are still pending"
    );

    let stream = test.backend.live_stream().ok_or("stream should be open")?;
    stream.pull(50 * BYTES_PER_FRAME);
    assert!(test.session.was_buffer_fully_consumed(&first));
    assert!(!test.session.was_buffer_fully_consumed(&second));

    stream.pull(50 * BYTES_PER_FRAME);
    assert!(test.session.was_buffer_fully_consumed(&second));
    Ok(())
}

#[test]
fn test_empty_buffer_counts_as_played() -> Result<(), Box<dyn Error>> {
    let test = open()?;
    let event = test.driver.update_required_event();
    let empty = AudioBuffer::new(9, Vec::new());

    test.session.queue_buffer(&empty);
    assert!(test.session.was_buffer_fully_consumed(&empty));
    assert!(event.is_set(), "caller is woken up right away");
    assert_eq!(test.session.queued_buffer_count(), 0);
    assert_eq!(test.session.played_sample_count(), 0);

    // Queued after a real buffer it does not hold up the queue either
    event.reset();
    test.session.queue_buffer(&pcm16(10, 20, 300));
    test.session.queue_buffer(&empty);
    let stream = test.backend.live_stream().ok_or("stream should be open")?;
    stream.pull(20 * BYTES_PER_FRAME);
    assert_eq!(test.session.queued_buffer_count(), 0);
    assert_eq!(test.session.played_sample_count(), 20);
    Ok(())
}

#[test]
fn test_busy_segment_queue_keeps_audio_playing() -> Result<(), Box<dyn Error>> {
    let test = open()?;
    let event = test.driver.update_required_event();
    let buffer = pcm16(1, 100, 1000);
    test.session.queue_buffer(&buffer);
    let stream = test.backend.live_stream().ok_or("stream should be open")?;

    let held = test.session.lock_segments();
    let output = stream.pull(100 * BYTES_PER_FRAME).ok_or("stream is live")?;
    assert!(
        samples(&output).iter().all(|s| *s == 1000),
        "queued audio plays while the queue is being inspected"
    );
    drop(held);
    assert_eq!(test.session.played_sample_count(), 0, "not attributed yet");
    assert!(!event.is_set());

    // The next callback credits the frames it could not attribute before
    let output = stream.pull(10 * BYTES_PER_FRAME).ok_or("stream is live")?;
    assert!(output.iter().all(|b| *b == 0));
    assert_eq!(test.session.played_sample_count(), 100);
    assert!(test.session.was_buffer_fully_consumed(&buffer));
    assert!(event.is_set());
    Ok(())
}

#[test]
fn test_large_buffer_grows_the_ring() -> Result<(), Box<dyn Error>> {
    let test = open()?;
    test.session.queue_buffer(&pcm16(1, 100, 1));
    let stream = test.backend.live_stream().ok_or("stream should be open")?;
    stream.pull(40 * BYTES_PER_FRAME);

    // Far more than the ring holds initially, with 60 frames still pending
    test.session.queue_buffer(&pcm16(2, 4000, 2));
    let stream = test.backend.live_stream().ok_or("bigger stream should be open")?;
    assert_eq!(test.session.stream_sample_count(), Some(4000));
    let output = stream.pull(4060 * BYTES_PER_FRAME).ok_or("stream is live")?;
    let played = samples(&output);
    assert_eq!(played[..120], [1; 120]);
    assert!(played[120..].iter().all(|s| *s == 2));
    assert_eq!(test.session.played_sample_count(), 4100);
    assert_eq!(test.session.queued_buffer_count(), 0);
    Ok(())
}
