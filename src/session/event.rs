use crate::audio::CaptureBlock;
use crate::playback::EntryId;

/// Everything the session reacts to, delivered through one queue
///
/// Handlers run to completion one event at a time; producers (socket reader,
/// capture forwarder, playback timers, user controls) only ever post.
#[derive(Debug)]
pub enum SessionEvent {
    /// The transport finished its handshake
    TransportOpened,
    /// A text envelope from the remote peer
    Inbound(String),
    /// The peer closed the channel
    TransportClosed,
    /// The channel failed
    TransportError(String),
    /// One block from the microphone source
    Captured(CaptureBlock),
    /// The microphone source could not be started
    CaptureFailed(String),
    /// A scheduled output buffer played to its end
    PlaybackEnded(EntryId),
    /// User-initiated stop
    Stop,
}
