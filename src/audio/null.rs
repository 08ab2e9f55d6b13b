use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::backend::{AudioBackend, AudioCallback, AudioError, AudioStream, StreamSpec};

/// Audio backend that plays into the void. Streams pull their callback at
/// the rate real hardware would and throw the data away, which keeps
/// sessions progressing on machines without a sound device.
#[derive(Debug)]
pub struct NullBackend {
    channel_count: u32,
}

impl Default for NullBackend {
    fn default() -> Self {
        Self::new(2)
    }
}

impl NullBackend {
    pub fn new(channel_count: u32) -> Self {
        Self { channel_count }
    }
}

impl AudioBackend for NullBackend {
    fn name(&self) -> &str {
        "Null"
    }

    fn open_stream(
        &self,
        spec: &StreamSpec,
        callback: Arc<dyn AudioCallback>,
    ) -> Result<Box<dyn AudioStream>, AudioError> {
        if spec.sample_rate == 0 || spec.channel_count == 0 {
            return Err(AudioError::Open(format!("invalid stream parameters {spec:?}")));
        }
        Ok(Box::new(NullStream {
            spec: *spec,
            callback,
            worker: None,
        }))
    }

    fn default_channel_count(&self) -> Result<u32, AudioError> {
        Ok(self.channel_count)
    }
}

struct NullWorker {
    running: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

struct NullStream {
    spec: StreamSpec,
    callback: Arc<dyn AudioCallback>,
    worker: Option<NullWorker>,
}

impl AudioStream for NullStream {
    fn resume(&mut self) -> Result<(), AudioError> {
        if self.worker.is_some() {
            return Ok(());
        }

        let running = Arc::new(AtomicBool::new(true));
        let period = Duration::from_secs_f64(
            self.spec.frame_count.max(1) as f64 / self.spec.sample_rate as f64,
        );
        let mut output = vec![0u8; self.spec.frame_count as usize * self.spec.bytes_per_frame()];
        let handle = {
            let running = running.clone();
            let callback = self.callback.clone();
            thread::Builder::new()
                .name("null-audio".to_string())
                .spawn(move || {
                    while running.load(Ordering::SeqCst) {
                        callback.fill(&mut output);
                        thread::sleep(period);
                    }
                })
                .map_err(|e| AudioError::Control(e.to_string()))?
        };

        self.worker = Some(NullWorker { running, handle });
        Ok(())
    }

    fn pause(&mut self) -> Result<(), AudioError> {
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };
        worker.running.store(false, Ordering::SeqCst);
        worker
            .handle
            .join()
            .map_err(|_| AudioError::Control("null audio thread panicked".to_string()))
    }
}

impl Drop for NullStream {
    fn drop(&mut self) {
        if let Err(e) = self.pause() {
            log::error!("Failed to stop null audio stream: {e:?}");
        }
    }
}
