use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use tokio::sync::mpsc;

use super::codec;

/// One block of raw microphone samples (mono, floating point)
#[derive(Debug, Clone)]
pub struct CaptureBlock {
    /// Samples as delivered by the source, nominally in [-1, 1]
    pub samples: Vec<f32>,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

/// Audio sample data (16-bit PCM, mono)
///
/// Produced by the capture pipeline for input or by decoding an inbound
/// envelope for output. Consumed exactly once by its sink.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl AudioFrame {
    pub fn new(samples: Vec<i16>, sample_rate: u32) -> Self {
        Self { samples, sample_rate }
    }

    /// Build a frame from little-endian PCM bytes
    pub fn from_pcm_bytes(bytes: &[u8], sample_rate: u32) -> Self {
        Self::new(codec::unpack_le(bytes), sample_rate)
    }

    /// Little-endian PCM bytes for this frame
    pub fn to_pcm_bytes(&self) -> Vec<u8> {
        codec::pack_le(&self.samples)
    }

    /// Samples as floats in [-1, 1)
    pub fn to_float(&self) -> Vec<f32> {
        codec::to_float(&self.samples)
    }

    /// Playback duration in seconds
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Configuration for a capture backend
#[derive(Debug, Clone)]
pub struct AudioBackendConfig {
    /// Sample rate the pipeline expects (resampled if the source differs)
    pub sample_rate: u32,
    /// Samples per delivered block
    pub frame_size: usize,
}

impl Default for AudioBackendConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000, // 16kHz model input
            frame_size: 2048,   // ~128ms at 16kHz
        }
    }
}

impl AudioBackendConfig {
    /// Wall-clock duration of one block
    pub fn frame_duration(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(self.frame_size as f64 / self.sample_rate.max(1) as f64)
    }
}

/// Microphone source trait
///
/// Implementations:
/// - File: replay a WAV file in real time (testing, headless demos)
/// - Microphone: default input device via cpal (feature `microphone`)
#[async_trait::async_trait]
pub trait AudioBackend: Send + Sync {
    /// Start capturing audio
    ///
    /// Returns a channel receiver that will receive fixed-size blocks
    async fn start(&mut self) -> Result<mpsc::Receiver<CaptureBlock>>;

    /// Stop capturing audio and release the source
    async fn stop(&mut self) -> Result<()>;

    /// Check if backend is currently capturing
    fn is_capturing(&self) -> bool;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// Audio backend factory
pub struct AudioBackendFactory;

impl AudioBackendFactory {
    /// Create a capture backend for the given source
    pub fn create(source: AudioSource, config: AudioBackendConfig) -> Result<Box<dyn AudioBackend>> {
        match source {
            AudioSource::Microphone => {
                #[cfg(feature = "microphone")]
                {
                    use super::microphone::MicrophoneBackend;
                    Ok(Box::new(MicrophoneBackend::new(config)))
                }

                #[cfg(not(feature = "microphone"))]
                {
                    let _ = config;
                    bail!("Microphone capture requires building with `--features microphone`")
                }
            }

            AudioSource::File(path) => {
                use super::file_backend::FileBackend;
                let backend = FileBackend::new(path, config)?;
                Ok(Box::new(backend))
            }
        }
    }
}

/// Audio source type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AudioSource {
    /// Default input device
    #[default]
    Microphone,
    /// WAV file replayed in real time
    File(PathBuf),
}

impl FromStr for AudioSource {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("microphone") || s.eq_ignore_ascii_case("mic") {
            return Ok(AudioSource::Microphone);
        }
        match s.strip_prefix("file:") {
            Some(path) if !path.is_empty() => Ok(AudioSource::File(PathBuf::from(path))),
            _ => bail!("Unknown audio input '{}': expected `microphone` or `file:<path>`", s),
        }
    }
}

impl TryFrom<String> for AudioSource {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<AudioSource> for String {
    fn from(source: AudioSource) -> Self {
        source.to_string()
    }
}

impl fmt::Display for AudioSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioSource::Microphone => write!(f, "microphone"),
            AudioSource::File(path) => write!(f, "file:{}", path.display()),
        }
    }
}

/// Average interleaved channels down to mono
pub fn downmix_to_mono(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    samples
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Linear-interpolation resampler for mono audio
pub fn resample_linear(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() || from_rate == 0 || to_rate == 0 {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let out_len = ((samples.len() as f64) / ratio).floor() as usize;
    let last = samples.len() - 1;

    (0..out_len)
        .map(|i| {
            let pos = i as f64 * ratio;
            let idx = pos.floor() as usize;
            let frac = (pos - idx as f64) as f32;
            let a = samples[idx.min(last)];
            let b = samples[(idx + 1).min(last)];
            a + (b - a) * frac
        })
        .collect()
}
