use base64::Engine;
use ringbuf::HeapRb;
use rubato::{FastFixedIn, PolynomialDegree, Resampler};

/// Microphone capture rate expected by the relay (mono PCM16).
pub const CAPTURE_SAMPLE_RATE: f64 = 16000.0;
/// Rate at which relay audio responses are rendered.
pub const PLAYBACK_SAMPLE_RATE: f64 = 24000.0;

pub fn create_resampler(in_sampling_rate: f64, out_sampling_rate: f64, chunk_size: usize) -> anyhow::Result<FastFixedIn<f32>> {
    let resampler = FastFixedIn::<f32>::new(
        out_sampling_rate / in_sampling_rate,
        1.0,
        PolynomialDegree::Cubic,
        chunk_size,
        1
    )?;
    Ok(resampler)
}

pub fn split_for_chunks(samples: &[f32], chunk_size: usize) -> Vec<Vec<f32>> {
    samples.chunks(chunk_size).map(|chunk| {
        let mut chunk = chunk.to_vec();
        chunk.resize(chunk_size, 0.0);
        chunk
    }).collect()
}

/// Runs a whole capture buffer through a fixed-chunk resampler, zero-padding
/// the tail chunk.
pub fn resample_all(resampler: &mut FastFixedIn<f32>, samples: &[f32]) -> anyhow::Result<Vec<f32>> {
    let chunk_size = resampler.input_frames_next();
    let mut out = Vec::new();
    for chunk in split_for_chunks(samples, chunk_size) {
        let processed = resampler.process(&[chunk], None)?;
        out.extend_from_slice(&processed[0]);
    }
    Ok(out)
}

pub fn shared_buffer(size: usize) -> HeapRb<f32> {
    HeapRb::new(size)
}

pub fn decode(fragment: &str) -> Vec<f32> {
    if let Ok(pcm16) = base64::engine::general_purpose::STANDARD.decode(fragment) {
        pcm16.chunks_exact(2).map(|chunk| {
            let v = i16::from_le_bytes([chunk[0], chunk[1]]);
            (v as f32 / 32768.0).clamp(-1.0, 1.0)
        }).collect()
    } else {
        tracing::error!("Failed to decode base64 fragment");
        Vec::new()
    }
}

pub fn encode(pcm32: &[f32]) -> String {
    let pcm16: Vec<u8> = pcm32.iter().flat_map(|&sample| {
        ((sample * 32768.0).round().clamp(i16::MIN as f32, i16::MAX as f32) as i16).to_le_bytes().to_vec()
    }).collect();
    base64::engine::general_purpose::STANDARD.encode(&pcm16)
}
