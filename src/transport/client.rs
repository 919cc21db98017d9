use anyhow::{anyhow, Context, Result};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::Message;
use tracing::{debug, info, warn};

use super::messages::{RealtimeInputMessage, VoiceConfigMessage};
use crate::session::SessionEvent;

/// Outbound half of the channel to the remote peer
///
/// Sends never block and are never retried.
pub trait Transport: Send {
    /// Queue a text message for sending
    fn send_text(&self, text: String) -> Result<()>;

    /// Close the channel; further sends fail
    fn close(&mut self);

    /// Send the session configuration envelope
    fn send_voice_config(&self, voice: &str) -> Result<()> {
        let message = VoiceConfigMessage {
            voice: voice.to_string(),
        };
        self.send_text(serde_json::to_string(&message)?)
    }

    /// Send one base64-encoded audio frame
    fn send_audio(&self, data: String) -> Result<()> {
        let message = RealtimeInputMessage::new(data);
        self.send_text(serde_json::to_string(&message)?)
    }
}

/// WebSocket transport
///
/// A reader task turns socket traffic into session events; a writer task
/// drains the outbound queue into the socket.
pub struct WsTransport {
    outbound: mpsc::UnboundedSender<Message>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl WsTransport {
    /// Connect to `url` and start relaying
    ///
    /// `SessionEvent::TransportOpened` is posted before any inbound message.
    pub async fn connect(url: &str, events: mpsc::UnboundedSender<SessionEvent>) -> Result<Self> {
        info!("Connecting to {}", url);

        let (stream, _) = connect_async(url)
            .await
            .with_context(|| format!("Failed to connect to {}", url))?;

        info!("Connected to {}", url);

        let (mut sink, mut source) = stream.split();
        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

        let writer = tokio::spawn(async move {
            while let Some(message) = outbound_rx.recv().await {
                let closing = matches!(message, Message::Close(_));
                if let Err(e) = sink.send(message).await {
                    warn!("Failed to send message: {}", e);
                    break;
                }
                if closing {
                    break;
                }
            }
            let _ = sink.close().await;
            debug!("Transport writer stopped");
        });

        let _ = events.send(SessionEvent::TransportOpened);

        let reader = tokio::spawn(async move {
            while let Some(message) = source.next().await {
                match message {
                    Ok(Message::Text(text)) => {
                        if events.send(SessionEvent::Inbound(text)).is_err() {
                            return;
                        }
                    }
                    Ok(Message::Binary(bytes)) => match String::from_utf8(bytes.to_vec()) {
                        Ok(text) => {
                            if events.send(SessionEvent::Inbound(text)).is_err() {
                                return;
                            }
                        }
                        Err(_) => warn!("Ignoring non-UTF-8 binary message ({} bytes)", bytes.len()),
                    },
                    Ok(Message::Close(frame)) => {
                        info!("Transport closed by peer: {:?}", frame);
                        let _ = events.send(SessionEvent::TransportClosed);
                        return;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        let _ = events.send(SessionEvent::TransportError(e.to_string()));
                        return;
                    }
                }
            }
            let _ = events.send(SessionEvent::TransportClosed);
        });

        Ok(Self {
            outbound,
            reader,
            writer,
        })
    }
}

impl Transport for WsTransport {
    fn send_text(&self, text: String) -> Result<()> {
        self.outbound
            .send(Message::Text(text))
            .map_err(|_| anyhow!("Transport writer has stopped"))
    }

    fn close(&mut self) {
        self.reader.abort();
        if self.outbound.send(Message::Close(None)).is_err() {
            self.writer.abort();
        }
    }
}

impl Drop for WsTransport {
    fn drop(&mut self) {
        self.reader.abort();
    }
}
