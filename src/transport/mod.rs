pub mod client;
pub mod messages;

pub use client::{Transport, WsTransport};
pub use messages::{InboundEnvelope, RealtimeInputMessage, Role, TranscriptFragment, VoiceConfigMessage};
