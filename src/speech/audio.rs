//! WAV decoding and conditioning for speech emotion analysis.
//!
//! Decodes any integer or float PCM WAV, downmixes to mono by averaging the
//! channels and resamples to the target rate.

use rubato::{FftFixedIn, Resampler};
use std::io::Cursor;
use tracing::debug;

use super::classifier::SpeechError;

/// Input chunk size for the offline resampler
const RESAMPLE_CHUNK: usize = 1024;

/// Accepted source sample rates, in Hz
const MIN_SOURCE_RATE: u32 = 1_000;
const MAX_SOURCE_RATE: u32 = 384_000;

/// Longest clip accepted for analysis, in seconds
const MAX_SOURCE_SECS: u32 = 300;

/// Mono audio at a known sample rate
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl ConditionedAudio {
    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }

    pub fn rms(&self) -> f32 {
        rms(&self.samples)
    }
}

/// Root-mean-square amplitude, 0.0 for empty input
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = samples.iter().map(|s| (*s as f64) * (*s as f64)).sum();
    (sum_sq / samples.len() as f64).sqrt() as f32
}

/// Decode WAV bytes into interleaved samples in [-1, 1]
pub fn decode_wav(bytes: &[u8]) -> Result<(Vec<f32>, hound::WavSpec), SpeechError> {
    let mut reader = hound::WavReader::new(Cursor::new(bytes))
        .map_err(|e| SpeechError::DecodeError(e.to_string()))?;
    let spec = reader.spec();

    if spec.channels == 0 {
        return Err(SpeechError::DecodeError("WAV declares zero channels".to_string()));
    }

    // Output length scales with the rate ratio; bound both before decoding.
    if !(MIN_SOURCE_RATE..=MAX_SOURCE_RATE).contains(&spec.sample_rate) {
        return Err(SpeechError::DecodeError(format!(
            "Unsupported sample rate: {} Hz (supported: {}-{} Hz)",
            spec.sample_rate, MIN_SOURCE_RATE, MAX_SOURCE_RATE
        )));
    }

    let frames = reader.duration();
    if frames / spec.sample_rate > MAX_SOURCE_SECS {
        return Err(SpeechError::DecodeError(format!(
            "Audio too long: {} frames at {} Hz (max: {}s)",
            frames, spec.sample_rate, MAX_SOURCE_SECS
        )));
    }

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(|e| SpeechError::DecodeError(e.to_string()))?,
        hound::SampleFormat::Int => {
            if spec.bits_per_sample == 0 || spec.bits_per_sample > 32 {
                return Err(SpeechError::DecodeError(format!(
                    "Unsupported bit depth: {}",
                    spec.bits_per_sample
                )));
            }
            let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()
                .map_err(|e| SpeechError::DecodeError(e.to_string()))?
        }
    };

    Ok((samples, spec))
}

/// Average interleaved channels into one
pub fn downmix(interleaved: &[f32], channels: u16) -> Vec<f32> {
    let channels = channels.max(1) as usize;
    if channels == 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Resample a complete mono clip from `from_rate` to `to_rate`.
///
/// The output is delay-compensated and has `round(len * to / from)` samples.
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>, SpeechError> {
    if from_rate == to_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }
    if from_rate == 0 || to_rate == 0 {
        return Err(SpeechError::ResampleError(format!(
            "Invalid sample rates: {} Hz -> {} Hz",
            from_rate, to_rate
        )));
    }

    debug!(
        "Resampling {} samples: {} Hz -> {} Hz",
        samples.len(),
        from_rate,
        to_rate
    );

    let mut resampler =
        FftFixedIn::<f32>::new(from_rate as usize, to_rate as usize, RESAMPLE_CHUNK, 2, 1)
            .map_err(|e| SpeechError::ResampleError(e.to_string()))?;

    let delay = resampler.output_delay();
    let expected = (samples.len() as f64 * to_rate as f64 / from_rate as f64).round() as usize;
    let mut output = Vec::with_capacity(expected + delay + RESAMPLE_CHUNK);

    let mut pos = 0;
    while pos + resampler.input_frames_next() <= samples.len() {
        let frames = resampler.input_frames_next();
        let chunk = resampler
            .process(&[&samples[pos..pos + frames]], None)
            .map_err(|e| SpeechError::ResampleError(e.to_string()))?;
        output.extend_from_slice(&chunk[0]);
        pos += frames;
    }

    // Feed the tail, then flush zeros until the delayed signal is out.
    while output.len() < expected + delay {
        let tail: &[f32] = &samples[pos..];
        let chunk = resampler
            .process_partial(Some(&[tail][..]), None)
            .map_err(|e| SpeechError::ResampleError(e.to_string()))?;
        if chunk[0].is_empty() {
            break;
        }
        output.extend_from_slice(&chunk[0]);
        pos = samples.len();
    }

    output.drain(..delay.min(output.len()));
    output.truncate(expected);
    Ok(output)
}

/// Decode, downmix and resample WAV bytes to mono at `target_rate`
pub fn condition(bytes: &[u8], target_rate: u32) -> Result<ConditionedAudio, SpeechError> {
    let (interleaved, spec) = decode_wav(bytes)?;
    let mono = downmix(&interleaved, spec.channels);

    debug!(
        "Decoded WAV: {} Hz, {} channels, {} bits, {} frames",
        spec.sample_rate,
        spec.channels,
        spec.bits_per_sample,
        mono.len()
    );

    let samples = resample(&mono, spec.sample_rate, target_rate)?;
    Ok(ConditionedAudio {
        samples,
        sample_rate: target_rate,
    })
}

/// Encode mono samples as 16-bit PCM WAV
pub fn encode_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>, SpeechError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .map_err(|e| SpeechError::EncodeError(e.to_string()))?;
        for &sample in samples {
            let clamped = sample.clamp(-1.0, 1.0);
            writer
                .write_sample((clamped * i16::MAX as f32) as i16)
                .map_err(|e| SpeechError::EncodeError(e.to_string()))?;
        }
        writer
            .finalize()
            .map_err(|e| SpeechError::EncodeError(e.to_string()))?;
    }
    Ok(cursor.into_inner())
}
