use serde::{Deserialize, Serialize};

use crate::audio::AudioSource;
use crate::interrupt::DEFAULT_THRESHOLD;

/// Voices offered by the remote model service
pub const KNOWN_VOICES: &[&str] = &["Zephyr", "Puck", "Charon", "Kore", "Fenrir", "Aoede"];

/// Configuration for a voice session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Unique session identifier (e.g., "session-5f0c...")
    pub session_id: String,

    /// WebSocket endpoint of the model relay
    pub url: String,

    /// Voice identity sent in the configuration envelope
    pub voice: String,

    /// Microphone source
    pub input: AudioSource,

    /// Sample rate of captured audio (the model expects 16kHz)
    pub input_sample_rate: u32,

    /// Sample rate of received audio (the model produces 24kHz)
    pub output_sample_rate: u32,

    /// Samples per captured frame
    pub frame_size: usize,

    /// Input RMS above which user speech cancels AI playback
    pub interruption_threshold: f32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_id: format!("session-{}", uuid::Uuid::new_v4()),
            url: "ws://127.0.0.1:8000/ws".to_string(),
            voice: "Zephyr".to_string(),
            input: AudioSource::Microphone,
            input_sample_rate: 16000,
            output_sample_rate: 24000,
            frame_size: 2048, // ~128ms at 16kHz
            interruption_threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl SessionConfig {
    /// Same settings under a fresh session id
    pub fn renewed(&self) -> Self {
        Self {
            session_id: format!("session-{}", uuid::Uuid::new_v4()),
            ..self.clone()
        }
    }
}
