//! Voice session management
//!
//! This module provides the `VoiceSession` state machine and the task that
//! drives it:
//! - Channel lifecycle (DISCONNECTED → CONNECTING → CONNECTED)
//! - Inbound dispatch to playback, transcript assembly and interruption
//! - Microphone capture while connected
//! - Session statistics and cleanup

mod config;
mod event;
mod runner;
#[allow(clippy::module_inception)]
mod session;
mod state;
mod stats;
mod transcript;

pub use config::{SessionConfig, KNOWN_VOICES};
pub use event::SessionEvent;
pub use runner::{run_session, spawn_session, SessionHandle, SessionStopper};
pub use session::{Flow, VoiceSession};
pub use state::SessionState;
pub use stats::{SessionStats, TranscriptMessage};
pub use transcript::TurnAssembler;
