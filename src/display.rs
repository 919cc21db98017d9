//! Presentation collaborators
//!
//! The session pushes state outward and never reads anything back.

use serde::Serialize;
use std::sync::RwLock;
use tracing::{debug, error, info};

use crate::session::{SessionState, SessionStats, TranscriptMessage};
use crate::transport::Role;

/// Live presentation tuple
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StatusSnapshot {
    pub state: SessionState,
    pub ai_speaking: bool,
    /// Smoothed input loudness
    pub loudness: f32,
    /// Avatar mouth state: AI audio playing and the meter above its floor
    pub speaking_now: bool,
}

/// Receives everything the session wants shown to the user
pub trait DisplaySink: Send + Sync {
    fn on_status(&self, status: StatusSnapshot);

    /// A finished turn for one speaker
    fn on_message(&self, message: &TranscriptMessage);

    /// A user-visible error
    fn on_error(&self, message: &str);

    fn on_stats(&self, _stats: &SessionStats) {}
}

/// Prints turns to stdout and logs state changes
#[derive(Debug, Default)]
pub struct ConsoleDisplay {
    last_state: RwLock<Option<SessionState>>,
}

impl ConsoleDisplay {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DisplaySink for ConsoleDisplay {
    fn on_status(&self, status: StatusSnapshot) {
        if let Ok(mut last) = self.last_state.write() {
            if *last != Some(status.state) {
                info!("Session {}", status.state);
                *last = Some(status.state);
            }
        }
        debug!(
            "status: speaking={} loudness={:.3}",
            status.ai_speaking, status.loudness
        );
    }

    fn on_message(&self, message: &TranscriptMessage) {
        let speaker = match message.role {
            Role::User => "You",
            Role::Model => "Echo",
        };
        println!(
            "[{}] {}: {}",
            message.timestamp.format("%H:%M:%S"),
            speaker,
            message.text
        );
    }

    fn on_error(&self, message: &str) {
        error!("{}", message);
        eprintln!("Error: {}", message);
    }
}

#[derive(Debug, Default)]
struct SharedState {
    status: StatusSnapshot,
    messages: Vec<TranscriptMessage>,
    last_error: Option<String>,
    stats: Option<SessionStats>,
}

/// Keeps the latest presentation state for readers such as the HTTP API
#[derive(Debug, Default)]
pub struct SharedDisplay {
    inner: RwLock<SharedState>,
}

impl SharedDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> StatusSnapshot {
        self.inner.read().map(|s| s.status).unwrap_or_default()
    }

    pub fn messages(&self) -> Vec<TranscriptMessage> {
        self.inner
            .read()
            .map(|s| s.messages.clone())
            .unwrap_or_default()
    }

    pub fn last_error(&self) -> Option<String> {
        self.inner.read().ok().and_then(|s| s.last_error.clone())
    }

    pub fn stats(&self) -> Option<SessionStats> {
        self.inner.read().ok().and_then(|s| s.stats.clone())
    }

    /// Forget the previous session's transcript and error
    pub fn reset(&self) {
        if let Ok(mut state) = self.inner.write() {
            *state = SharedState::default();
        }
    }
}

impl DisplaySink for SharedDisplay {
    fn on_status(&self, status: StatusSnapshot) {
        if let Ok(mut state) = self.inner.write() {
            state.status = status;
        }
    }

    fn on_message(&self, message: &TranscriptMessage) {
        if let Ok(mut state) = self.inner.write() {
            state.messages.push(message.clone());
        }
    }

    fn on_error(&self, message: &str) {
        error!("{}", message);
        if let Ok(mut state) = self.inner.write() {
            state.last_error = Some(message.to_string());
        }
    }

    fn on_stats(&self, stats: &SessionStats) {
        if let Ok(mut state) = self.inner.write() {
            state.stats = Some(stats.clone());
        }
    }
}
