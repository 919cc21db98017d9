//! PCM codec
//!
//! Converts between floating-point samples in `[-1, 1]` and little-endian
//! 16-bit signed PCM, and between PCM bytes and the base64 text carried
//! inside JSON envelopes.

use anyhow::{Context, Result};
use base64::Engine;

/// Scale applied to negative samples (magnitude of `i16::MIN`)
const NEGATIVE_SCALE: f32 = 32768.0;
/// Scale applied to non-negative samples (`i16::MAX`)
const POSITIVE_SCALE: f32 = 32767.0;
/// Divisor used when turning PCM back into floats
const DECODE_SCALE: f32 = 32768.0;

/// Quantize a single float sample to i16.
///
/// Callers must clamp to `[-1, 1]` first; out-of-range input saturates.
#[inline]
pub fn quantize_sample(sample: f32) -> i16 {
    if sample < 0.0 {
        (sample * NEGATIVE_SCALE) as i16
    } else {
        (sample * POSITIVE_SCALE) as i16
    }
}

/// Quantize a block of float samples to i16 PCM.
pub fn quantize(samples: &[f32]) -> Vec<i16> {
    samples.iter().map(|&s| quantize_sample(s)).collect()
}

/// Pack i16 samples as little-endian bytes.
pub fn pack_le(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

/// Unpack little-endian bytes into i16 samples.
///
/// A trailing odd byte cannot form a sample and is ignored.
pub fn unpack_le(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

/// Convert i16 PCM samples to floats.
pub fn to_float(samples: &[i16]) -> Vec<f32> {
    samples.iter().map(|&s| s as f32 / DECODE_SCALE).collect()
}

/// Encode float samples to little-endian 16-bit PCM bytes.
pub fn encode_frame(samples: &[f32]) -> Vec<u8> {
    pack_le(&quantize(samples))
}

/// Decode little-endian 16-bit PCM bytes to float samples.
pub fn decode_frame(bytes: &[u8]) -> Vec<f32> {
    to_float(&unpack_le(bytes))
}

/// Encode PCM bytes as base64 text for the JSON envelope.
pub fn to_transport_text(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

/// Decode base64 text from an envelope back to PCM bytes.
pub fn from_transport_text(text: &str) -> Result<Vec<u8>> {
    base64::engine::general_purpose::STANDARD
        .decode(text)
        .context("Invalid base64 audio payload")
}
