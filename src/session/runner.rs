use super::config::SessionConfig;
use super::event::SessionEvent;
use super::session::{Flow, VoiceSession};
use super::stats::SessionStats;
use crate::audio::{AudioBackend, AudioBackendConfig, AudioBackendFactory};
use crate::display::DisplaySink;
use crate::playback::open_output;
use crate::transport::{Transport, WsTransport};
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Handle to a session running on its own task
pub struct SessionHandle {
    session_id: String,
    events: mpsc::UnboundedSender<SessionEvent>,
    task: JoinHandle<Result<SessionStats>>,
}

impl SessionHandle {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Request a stop; the session cleans up on its own task
    pub fn stop(&self) {
        // A closed queue means the session already ended
        let _ = self.events.send(SessionEvent::Stop);
    }

    /// Detached stop trigger, usable while `join` is pending
    pub fn stopper(&self) -> SessionStopper {
        SessionStopper(self.events.clone())
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the session to end and return its final stats
    pub async fn join(self) -> Result<SessionStats> {
        self.task.await.context("Session task panicked")?
    }
}

/// Requests a stop for a session that may already be gone
#[derive(Clone)]
pub struct SessionStopper(mpsc::UnboundedSender<SessionEvent>);

impl SessionStopper {
    pub fn stop(&self) {
        let _ = self.0.send(SessionEvent::Stop);
    }
}

/// Spawn a session on a background task
pub fn spawn_session(config: SessionConfig, display: Arc<dyn DisplaySink>) -> SessionHandle {
    let (events, events_rx) = mpsc::unbounded_channel();
    let session_id = config.session_id.clone();
    let task = tokio::spawn(run_session(config, display, events.clone(), events_rx));

    SessionHandle {
        session_id,
        events,
        task,
    }
}

/// Run one session to completion
///
/// This is the single dispatch loop: socket traffic, microphone blocks,
/// playback completions and stop requests all arrive as events on one queue
/// and are handled strictly one at a time.
pub async fn run_session(
    config: SessionConfig,
    display: Arc<dyn DisplaySink>,
    events: mpsc::UnboundedSender<SessionEvent>,
    mut events_rx: mpsc::UnboundedReceiver<SessionEvent>,
) -> Result<SessionStats> {
    let mut session = VoiceSession::new(config.clone(), display);
    session.begin()?;

    // The handshake has no timeout, so a stop must be able to abandon it
    let connect = WsTransport::connect(&config.url, events.clone());
    tokio::pin!(connect);

    let transport = loop {
        tokio::select! {
            biased;
            result = &mut connect => match result {
                Ok(transport) => break transport,
                Err(e) => {
                    session.fail(&format!("{:#}", e));
                    return Err(e);
                }
            },
            event = events_rx.recv() => match event {
                Some(SessionEvent::Stop) | None => {
                    info!("Stop requested while connecting to {}", config.url);
                    session.cleanup();
                    return Ok(session.stats());
                }
                Some(other) => debug!("Ignoring {:?} while connecting", other),
            },
        }
    };

    let sink = match open_output(config.output_sample_rate, events.clone()).await {
        Ok(sink) => sink,
        Err(e) => {
            let mut transport = transport;
            transport.close();
            session.fail(&format!("{:#}", e));
            return Err(e);
        }
    };
    session.connect(Box::new(transport), sink)?;

    let mut capture = CaptureTask::default();

    while let Some(event) = events_rx.recv().await {
        match session.handle(event) {
            Flow::Continue => {}
            Flow::StartCapture => {
                if let Err(e) = capture.start(&config, events.clone()).await {
                    error!("Failed to start capture: {:#}", e);
                    let _ = events.send(SessionEvent::CaptureFailed(format!("{:#}", e)));
                }
            }
            Flow::Shutdown => break,
        }
    }

    capture.stop().await;
    session.cleanup();

    let stats = session.stats();
    info!(
        "Session {} ended: {} frames sent, {} audio chunks received, {} interruptions",
        stats.session_id,
        stats.frames_sent,
        stats.audio_chunks_received,
        stats.local_interruptions + stats.server_interruptions
    );

    Ok(stats)
}

/// Microphone source plus the task forwarding its blocks into the event queue
#[derive(Default)]
struct CaptureTask {
    backend: Option<Box<dyn AudioBackend>>,
    forwarder: Option<JoinHandle<()>>,
}

impl CaptureTask {
    async fn start(
        &mut self,
        config: &SessionConfig,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Result<()> {
        let backend_config = AudioBackendConfig {
            sample_rate: config.input_sample_rate,
            frame_size: config.frame_size,
        };

        let mut backend = AudioBackendFactory::create(config.input.clone(), backend_config)
            .context("Failed to create audio backend")?;

        let mut blocks = backend
            .start()
            .await
            .context("Failed to start audio capture")?;

        info!("Capturing from {}", backend.name());

        let forwarder = tokio::spawn(async move {
            while let Some(block) = blocks.recv().await {
                if events.send(SessionEvent::Captured(block)).is_err() {
                    break;
                }
            }
        });

        self.backend = Some(backend);
        self.forwarder = Some(forwarder);
        Ok(())
    }

    async fn stop(&mut self) {
        if let Some(forwarder) = self.forwarder.take() {
            forwarder.abort();
        }

        if let Some(mut backend) = self.backend.take() {
            if let Err(e) = backend.stop().await {
                warn!("Failed to stop audio backend: {:#}", e);
            }
        }
    }
}
