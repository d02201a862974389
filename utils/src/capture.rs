//! Media capture: fixed-interval microphone chunking and screen-frame
//! caching. Both sides flush on a 3-second tick, matching the relay's
//! realtime-input cadence.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use base64::Engine;
use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::StreamConfig;

use crate::audio;
use crate::device;

/// How often accumulated audio and the current frame are flushed.
pub const CHUNK_INTERVAL: Duration = Duration::from_secs(3);

const CAPTURE_QUEUE: usize = 1024;
const RESAMPLER_CHUNK_SIZE: usize = 1024;

/// Accumulates normalized samples between ticks and flushes them as one
/// base64 PCM16LE chunk. Flushed data is gone; there is no retry buffer.
#[derive(Debug, Default)]
pub struct AudioChunker {
    pending: Vec<f32>,
}

impl AudioChunker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, samples: &[f32]) {
        self.pending.extend_from_slice(samples);
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Encodes and clears the pending buffer. `None` when nothing was
    /// captured since the last flush.
    pub fn flush(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let samples = std::mem::take(&mut self.pending);
        Some(audio::encode(&samples))
    }
}

/// Microphone capture running the device at its native rate, downmixed to
/// mono and resampled to [`audio::CAPTURE_SAMPLE_RATE`] before each flush.
///
/// The cpal stream lives on the caller's thread; only the chunking task is
/// spawned onto the runtime.
pub struct AudioCapture {
    stream: Option<cpal::Stream>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl AudioCapture {
    /// Opens the input device and starts flushing base64 chunks into `sink`
    /// every [`CHUNK_INTERVAL`]. Permission or device failures surface here;
    /// there is no retry.
    pub fn start<F>(device_name: Option<String>, mut sink: F) -> anyhow::Result<Self>
    where
        F: FnMut(String) + Send + 'static,
    {
        let input = device::get_or_default_input(device_name)?;
        let default_config = input.default_input_config()?;
        let config = StreamConfig {
            channels: default_config.channels(),
            sample_rate: default_config.sample_rate(),
            buffer_size: cpal::BufferSize::Default,
        };
        let channels = config.channels as usize;
        let in_rate = config.sample_rate.0 as f64;
        tracing::debug!(device = ?input.name(), ?config, "starting audio capture");

        let (tx, mut rx) = tokio::sync::mpsc::channel::<Vec<f32>>(CAPTURE_QUEUE);
        let input_data_fn = move |data: &[f32], _: &cpal::InputCallbackInfo| {
            let mono = downmix(data, channels);
            if tx.try_send(mono).is_err() {
                tracing::warn!("capture queue full, dropping samples");
            }
        };
        let stream = input.build_input_stream(
            &config,
            input_data_fn,
            move |err| tracing::error!("input stream error: {}", err),
            None,
        )?;
        stream.play()?;

        let mut resampler = if in_rate != audio::CAPTURE_SAMPLE_RATE {
            Some(audio::create_resampler(
                in_rate,
                audio::CAPTURE_SAMPLE_RATE,
                RESAMPLER_CHUNK_SIZE,
            )?)
        } else {
            None
        };

        let task = tokio::spawn(async move {
            let mut chunker = AudioChunker::new();
            let mut raw: Vec<f32> = Vec::new();
            let mut ticker = tokio::time::interval(CHUNK_INTERVAL);
            loop {
                tokio::select! {
                    received = rx.recv() => match received {
                        Some(samples) => raw.extend_from_slice(&samples),
                        None => break,
                    },
                    _ = ticker.tick() => {
                        if raw.is_empty() {
                            continue;
                        }
                        let samples = std::mem::take(&mut raw);
                        match &mut resampler {
                            Some(resampler) => match audio::resample_all(resampler, &samples) {
                                Ok(resampled) => chunker.push(&resampled),
                                Err(e) => tracing::error!("resampling failed: {}", e),
                            },
                            None => chunker.push(&samples),
                        }
                        if let Some(chunk) = chunker.flush() {
                            sink(chunk);
                        }
                    }
                }
            }
            tracing::debug!("audio capture task finished");
        });

        Ok(Self {
            stream: Some(stream),
            task: Some(task),
        })
    }

    /// Tears down the device stream and the chunking task.
    pub fn stop(&mut self) {
        self.stream.take();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for AudioCapture {
    fn drop(&mut self) {
        self.stop();
    }
}

fn downmix(data: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return data.to_vec();
    }
    data.chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

/// Produces one size-bounded (640x480 max) JPEG frame per call. The actual
/// platform grab is the embedder's concern; this trait is the seam.
pub trait FrameSource: Send + 'static {
    fn capture_frame(&mut self) -> anyhow::Result<Vec<u8>>;
}

/// Serves a fixed JPEG on every tick.
pub struct StaticFrameSource {
    jpeg: Vec<u8>,
}

impl StaticFrameSource {
    pub fn new(jpeg: Vec<u8>) -> Self {
        Self { jpeg }
    }
}

impl FrameSource for StaticFrameSource {
    fn capture_frame(&mut self) -> anyhow::Result<Vec<u8>> {
        Ok(self.jpeg.clone())
    }
}

/// Re-reads a JPEG file on every tick. Useful when another process keeps a
/// screenshot file fresh.
pub struct FileFrameSource {
    path: PathBuf,
}

impl FileFrameSource {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl FrameSource for FileFrameSource {
    fn capture_frame(&mut self) -> anyhow::Result<Vec<u8>> {
        Ok(std::fs::read(&self.path)?)
    }
}

/// Rasterizes the newest frame from a [`FrameSource`] every
/// [`CHUNK_INTERVAL`] and keeps it base64-encoded as "current frame".
pub struct FrameCache {
    current: Arc<Mutex<Option<String>>>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl FrameCache {
    pub fn start<S: FrameSource>(mut source: S) -> Self {
        let current = Arc::new(Mutex::new(None));
        let shared = current.clone();
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(CHUNK_INTERVAL);
            loop {
                ticker.tick().await;
                match source.capture_frame() {
                    Ok(jpeg) => {
                        let encoded = base64::engine::general_purpose::STANDARD.encode(&jpeg);
                        if let Ok(mut guard) = shared.lock() {
                            *guard = Some(encoded);
                        }
                    }
                    Err(e) => tracing::warn!("frame capture failed: {}", e),
                }
            }
        });
        Self {
            current,
            task: Some(task),
        }
    }

    /// Most recent captured frame, base64-encoded. `None` until the first
    /// successful grab.
    pub fn current_frame(&self) -> Option<String> {
        self.current.lock().ok().and_then(|guard| guard.clone())
    }

    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for FrameCache {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_chunker_flushes_nothing() {
        let mut chunker = AudioChunker::new();
        assert!(chunker.flush().is_none());
    }

    #[test]
    fn flush_drains_and_encodes() {
        let mut chunker = AudioChunker::new();
        chunker.push(&[0.0, 0.5, -0.5]);
        let chunk = chunker.flush().expect("chunk");
        assert!(chunker.is_empty());
        assert_eq!(crate::audio::decode(&chunk), vec![0.0, 0.5, -0.5]);
        assert!(chunker.flush().is_none());
    }

    #[test]
    fn downmix_averages_interleaved_channels() {
        let mono = downmix(&[1.0, 0.0, 0.5, 0.5], 2);
        assert_eq!(mono, vec![0.5, 0.5]);
        assert_eq!(downmix(&[0.1, 0.2], 1), vec![0.1, 0.2]);
    }

    #[tokio::test]
    async fn frame_cache_holds_latest_frame() {
        let cache = FrameCache::start(StaticFrameSource::new(vec![0xff, 0xd8, 0xff]));
        tokio::time::sleep(Duration::from_millis(100)).await;
        let frame = cache.current_frame().expect("frame after first tick");
        assert_eq!(
            base64::engine::general_purpose::STANDARD
                .decode(frame)
                .unwrap(),
            vec![0xff, 0xd8, 0xff]
        );
    }

    struct FailingSource;
    impl FrameSource for FailingSource {
        fn capture_frame(&mut self) -> anyhow::Result<Vec<u8>> {
            anyhow::bail!("permission denied")
        }
    }

    #[tokio::test]
    async fn failing_source_leaves_cache_empty() {
        let cache = FrameCache::start(FailingSource);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(cache.current_frame().is_none());
    }
}
