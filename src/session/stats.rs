use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::state::SessionState;
use crate::transport::Role;

/// Statistics about a voice session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    pub session_id: String,

    /// Connection state at the time of the snapshot
    pub state: SessionState,

    /// When the session was created
    pub started_at: DateTime<Utc>,

    /// Total duration in seconds
    pub duration_secs: f64,

    /// Microphone frames processed
    pub frames_captured: usize,

    /// Frames handed to the transport
    pub frames_sent: usize,

    /// Frames dropped because the channel was not open or a send failed
    pub frames_dropped: usize,

    /// Inbound audio payloads received
    pub audio_chunks_received: usize,

    /// Barge-ins detected from input loudness
    pub local_interruptions: usize,

    /// Interruptions requested by the peer
    pub server_interruptions: usize,

    /// Transcript messages flushed at turn completion
    pub messages_flushed: usize,
}

/// A finished transcript line for one speaker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptMessage {
    pub role: Role,

    /// Trimmed text of the whole turn
    pub text: String,

    /// When the turn was flushed
    pub timestamp: DateTime<Utc>,
}
