//! Playback sink: base64 PCM16LE chunks in, normalized samples out through
//! a ring buffer drained by the output device in arrival order. No jitter
//! buffer and no back-pressure; overflow is dropped with a warning.

use anyhow::Context;
use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::StreamConfig;
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapCons, HeapProd};

use crate::audio;
use crate::device;

const OUTPUT_LATENCY_MS: usize = 1000;

/// Seam between the sink and the actual output device, so the queueing and
/// idempotence logic is testable without audio hardware.
pub trait AudioOutput {
    fn start(&mut self, consumer: HeapCons<f32>) -> anyhow::Result<()>;
}

/// cpal-backed output rendering at [`audio::PLAYBACK_SAMPLE_RATE`], mono
/// duplicated across the device's channels.
pub struct CpalOutput {
    device_name: Option<String>,
    stream: Option<cpal::Stream>,
}

impl CpalOutput {
    pub fn new(device_name: Option<String>) -> Self {
        Self {
            device_name,
            stream: None,
        }
    }
}

impl AudioOutput for CpalOutput {
    fn start(&mut self, mut consumer: HeapCons<f32>) -> anyhow::Result<()> {
        let output = device::get_or_default_output(self.device_name.clone())?;
        let default_config = output.default_output_config()?;
        let config = StreamConfig {
            channels: default_config.channels(),
            sample_rate: cpal::SampleRate(audio::PLAYBACK_SAMPLE_RATE as u32),
            buffer_size: cpal::BufferSize::Default,
        };
        let channel_count = config.channels as usize;
        tracing::debug!(device = ?output.name(), ?config, "starting playback output");

        let output_data_fn = move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
            for frame in data.chunks_mut(channel_count) {
                let sample = consumer.try_pop().unwrap_or(0.0);
                for slot in frame.iter_mut() {
                    *slot = sample;
                }
            }
        };
        let stream = output.build_output_stream(
            &config,
            output_data_fn,
            move |err| tracing::error!("output stream error: {}", err),
            None,
        )?;
        stream.play()?;
        self.stream = Some(stream);
        Ok(())
    }
}

pub struct PlaybackSink<O: AudioOutput = CpalOutput> {
    output: O,
    producer: HeapProd<f32>,
    consumer: Option<HeapCons<f32>>,
    initialized: bool,
}

impl PlaybackSink<CpalOutput> {
    pub fn new(device_name: Option<String>) -> Self {
        Self::with_output(CpalOutput::new(device_name))
    }
}

impl<O: AudioOutput> PlaybackSink<O> {
    pub fn with_output(output: O) -> Self {
        let latency_samples = audio::PLAYBACK_SAMPLE_RATE as usize * OUTPUT_LATENCY_MS / 1000;
        let (producer, consumer) = audio::shared_buffer(latency_samples).split();
        Self {
            output,
            producer,
            consumer: Some(consumer),
            initialized: false,
        }
    }

    /// One-time output setup. Guarded: a second call is a no-op and never
    /// opens a second device.
    pub fn initialize(&mut self) -> anyhow::Result<()> {
        if self.initialized {
            return Ok(());
        }
        let consumer = self
            .consumer
            .take()
            .context("playback consumer already handed out")?;
        self.output.start(consumer)?;
        self.initialized = true;
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Decodes one base64 PCM16LE chunk and enqueues it for playback,
    /// initializing the output lazily. Returns how many samples were
    /// actually queued.
    pub fn play_chunk(&mut self, base64_chunk: &str) -> anyhow::Result<usize> {
        if !self.initialized {
            self.initialize()?;
        }
        let samples = audio::decode(base64_chunk);
        let pushed = self.producer.push_slice(&samples);
        if pushed < samples.len() {
            tracing::warn!(
                "playback buffer full, dropped {} samples",
                samples.len() - pushed
            );
        }
        Ok(pushed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct MockOutput {
        starts: usize,
        consumer: Option<HeapCons<f32>>,
    }

    impl AudioOutput for MockOutput {
        fn start(&mut self, consumer: HeapCons<f32>) -> anyhow::Result<()> {
            self.starts += 1;
            self.consumer = Some(consumer);
            Ok(())
        }
    }

    #[test]
    fn initialize_is_idempotent() {
        let mut sink = PlaybackSink::with_output(MockOutput::default());
        assert!(!sink.is_initialized());
        sink.initialize().unwrap();
        sink.initialize().unwrap();
        assert!(sink.is_initialized());
        assert_eq!(sink.output.starts, 1);
    }

    #[test]
    fn play_chunk_initializes_lazily_and_queues_samples() {
        let mut sink = PlaybackSink::with_output(MockOutput::default());
        let chunk = audio::encode(&[0.25, -0.25, 0.5]);
        let queued = sink.play_chunk(&chunk).unwrap();
        assert_eq!(queued, 3);
        assert!(sink.is_initialized());
        assert_eq!(sink.output.starts, 1);

        let mut consumer = sink.output.consumer.take().unwrap();
        let mut drained = Vec::new();
        while let Some(sample) = consumer.try_pop() {
            drained.push(sample);
        }
        assert_eq!(drained.len(), 3);
        assert!((drained[0] - 0.25).abs() < 1.0 / 32768.0);
    }

    #[test]
    fn chunks_play_in_arrival_order() {
        let mut sink = PlaybackSink::with_output(MockOutput::default());
        sink.play_chunk(&audio::encode(&[0.1])).unwrap();
        sink.play_chunk(&audio::encode(&[0.9])).unwrap();

        let mut consumer = sink.output.consumer.take().unwrap();
        let first = consumer.try_pop().unwrap();
        let second = consumer.try_pop().unwrap();
        assert!(first < second);
    }
}
