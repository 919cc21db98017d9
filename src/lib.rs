pub mod audio;
pub mod config;
pub mod display;
pub mod http;
pub mod interrupt;
pub mod playback;
pub mod session;
pub mod transport;

pub use audio::{
    AudioBackend, AudioBackendConfig, AudioBackendFactory, AudioFile, AudioFrame, AudioSource,
    CaptureBlock, CapturePipeline, VolumeMeter,
};
pub use config::Config;
pub use display::{ConsoleDisplay, DisplaySink, SharedDisplay, StatusSnapshot};
pub use http::{create_router, AppState};
pub use interrupt::{Interruption, InterruptionMonitor, InterruptionSource};
pub use playback::{open_output, ClockedSink, Mixer, OutputSink, PlaybackEntry, PlaybackScheduler};
pub use session::{
    spawn_session, SessionConfig, SessionEvent, SessionHandle, SessionState, SessionStats,
    TranscriptMessage, VoiceSession,
};
pub use transport::{InboundEnvelope, Role, Transport, WsTransport};
