use super::config::SessionConfig;
use super::event::SessionEvent;
use super::state::SessionState;
use super::stats::{SessionStats, TranscriptMessage};
use super::transcript::TurnAssembler;
use crate::audio::{codec, AudioFrame, CaptureBlock, CapturePipeline, VolumeMeter};
use crate::display::{DisplaySink, StatusSnapshot};
use crate::interrupt::{InterruptionMonitor, InterruptionSource};
use crate::playback::{OutputSink, PlaybackScheduler};
use crate::transport::{InboundEnvelope, Transport};
use anyhow::{bail, Result};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What the dispatch loop should do after an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep processing events
    Continue,
    /// The channel is open; start the microphone source
    StartCapture,
    /// The session is over; release capture and exit
    Shutdown,
}

/// A voice session: one channel, one microphone, one output clock
///
/// All state lives here and is only touched from `handle`, which the dispatch
/// loop calls for one event at a time.
pub struct VoiceSession {
    /// Session configuration
    config: SessionConfig,

    /// Connection lifecycle; only this type changes it
    state: SessionState,

    /// Outbound channel, present from `connect` until cleanup
    transport: Option<Box<dyn Transport>>,

    /// Output sink waiting for the channel to open
    pending_sink: Option<Box<dyn OutputSink>>,

    scheduler: PlaybackScheduler,
    monitor: InterruptionMonitor,
    capture: CapturePipeline,
    turns: TurnAssembler,
    meter: VolumeMeter,

    /// Presentation collaborator
    display: Arc<dyn DisplaySink>,

    /// Turns flushed so far
    transcript: Vec<TranscriptMessage>,

    started_at: chrono::DateTime<chrono::Utc>,
    audio_chunks_received: usize,
    local_interruptions: usize,
    server_interruptions: usize,
}

impl VoiceSession {
    /// Create a new session in the `DISCONNECTED` state
    pub fn new(config: SessionConfig, display: Arc<dyn DisplaySink>) -> Self {
        info!("Creating voice session: {}", config.session_id);

        let scheduler = PlaybackScheduler::new(config.output_sample_rate);
        let monitor = InterruptionMonitor::new(config.interruption_threshold);

        Self {
            config,
            state: SessionState::Disconnected,
            transport: None,
            pending_sink: None,
            scheduler,
            monitor,
            capture: CapturePipeline::new(),
            turns: TurnAssembler::new(),
            meter: VolumeMeter::new(),
            display,
            transcript: Vec::new(),
            started_at: Utc::now(),
            audio_chunks_received: 0,
            local_interruptions: 0,
            server_interruptions: 0,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_ai_speaking(&self) -> bool {
        self.scheduler.is_speaking()
    }

    pub fn active_playback(&self) -> usize {
        self.scheduler.active_len()
    }

    pub fn scheduler(&self) -> &PlaybackScheduler {
        &self.scheduler
    }

    pub fn turns(&self) -> &TurnAssembler {
        &self.turns
    }

    pub fn transcript(&self) -> &[TranscriptMessage] {
        &self.transcript
    }

    /// Change the voice; only allowed while disconnected
    pub fn set_voice(&mut self, voice: impl Into<String>) -> Result<()> {
        if self.state != SessionState::Disconnected {
            bail!("Voice can only be changed while disconnected");
        }
        self.config.voice = voice.into();
        Ok(())
    }

    /// `DISCONNECTED → CONNECTING`
    pub fn begin(&mut self) -> Result<()> {
        if self.state != SessionState::Disconnected {
            bail!("Session {} is already {}", self.config.session_id, self.state);
        }

        info!("Starting voice session: {}", self.config.session_id);
        self.set_state(SessionState::Connecting);
        Ok(())
    }

    /// Hand over the channel and output sink once the transport exists
    ///
    /// The sink is attached when the channel reports it is open.
    pub fn connect(&mut self, transport: Box<dyn Transport>, sink: Box<dyn OutputSink>) -> Result<()> {
        if self.state != SessionState::Connecting {
            bail!("Cannot attach a transport while {}", self.state);
        }
        self.transport = Some(transport);
        self.pending_sink = Some(sink);
        Ok(())
    }

    /// Report a startup failure and release everything
    pub fn fail(&mut self, message: &str) {
        warn!("Session {} failed: {}", self.config.session_id, message);
        self.display.on_error(message);
        self.cleanup();
    }

    /// Process one event
    pub fn handle(&mut self, event: SessionEvent) -> Flow {
        match event {
            SessionEvent::TransportOpened => self.on_open(),
            SessionEvent::Inbound(text) => {
                self.on_inbound(&text);
                Flow::Continue
            }
            SessionEvent::Captured(block) => {
                self.on_capture(&block);
                Flow::Continue
            }
            SessionEvent::PlaybackEnded(id) => {
                if self.scheduler.on_entry_ended(id) {
                    self.publish_status();
                }
                Flow::Continue
            }
            SessionEvent::TransportClosed => {
                info!("Transport closed");
                self.cleanup();
                Flow::Shutdown
            }
            SessionEvent::TransportError(e) => {
                warn!("Transport error: {}", e);
                self.display.on_error("Connection Failed");
                self.cleanup();
                Flow::Shutdown
            }
            SessionEvent::CaptureFailed(e) => {
                self.fail(&e);
                Flow::Shutdown
            }
            SessionEvent::Stop => {
                info!("Stop requested");
                self.cleanup();
                Flow::Shutdown
            }
        }
    }

    fn on_open(&mut self) -> Flow {
        if self.state != SessionState::Connecting {
            debug!("Ignoring open notification while {}", self.state);
            return Flow::Continue;
        }

        self.set_state(SessionState::Connected);

        if let Some(sink) = self.pending_sink.take() {
            self.scheduler.attach(sink);
        }

        if let Some(transport) = &self.transport {
            match transport.send_voice_config(&self.config.voice) {
                Ok(()) => info!("Sent session config (voice: {})", self.config.voice),
                Err(e) => warn!("Failed to send session config: {}", e),
            }
        }

        Flow::StartCapture
    }

    /// Dispatch order: audio, transcript, turn completion, interruption
    fn on_inbound(&mut self, raw: &str) {
        if !self.state.is_connected() {
            debug!("Ignoring inbound message while {}", self.state);
            return;
        }

        let envelope = match InboundEnvelope::parse(raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!("Skipping malformed message: {:#}", e);
                return;
            }
        };

        if let Some(audio) = &envelope.audio {
            self.play_audio(audio);
        }

        if let Some(fragment) = envelope.transcript() {
            self.turns.push(&fragment);
        }

        if envelope.turn_complete {
            for message in self.turns.flush() {
                info!("{}: {}", message.role, message.text);
                self.display.on_message(&message);
                self.transcript.push(message);
            }
        }

        if envelope.interrupted {
            self.monitor.interrupt_from_server(&mut self.scheduler);
            self.server_interruptions += 1;
            self.turns.discard();
        }

        self.publish_status();
    }

    fn play_audio(&mut self, payload: &str) {
        self.audio_chunks_received += 1;

        let bytes = match codec::from_transport_text(payload) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Skipping audio payload: {:#}", e);
                return;
            }
        };

        let frame = AudioFrame::from_pcm_bytes(&bytes, self.config.output_sample_rate);
        if let Err(e) = self.scheduler.enqueue(&frame) {
            warn!("Failed to schedule audio: {:#}", e);
        }
    }

    fn on_capture(&mut self, block: &CaptureBlock) {
        if self.state == SessionState::Disconnected {
            debug!("Ignoring capture block after stop");
            return;
        }

        let transport = if self.state.is_connected() {
            self.transport.as_deref()
        } else {
            None
        };

        let outcome = self
            .capture
            .process(&block.samples, &self.monitor, &mut self.scheduler, transport);

        if let Some(interruption) = outcome.interruption {
            if let InterruptionSource::Local { .. } = interruption.source {
                self.local_interruptions += 1;
            }
        }

        self.meter.push(outcome.rms);
        self.publish_status();
    }

    /// Release every resource; safe to call repeatedly
    pub fn cleanup(&mut self) {
        let was = self.state;

        if let Some(mut transport) = self.transport.take() {
            transport.close();
        }
        self.pending_sink = None;
        self.scheduler.detach();
        self.meter.reset();

        if was != SessionState::Disconnected {
            info!("Session {} disconnected (was {})", self.config.session_id, was);
        }
        self.set_state(SessionState::Disconnected);
    }

    /// Current live tuple for the display
    pub fn status(&self) -> StatusSnapshot {
        let ai_speaking = self.scheduler.is_speaking();
        StatusSnapshot {
            state: self.state,
            ai_speaking,
            loudness: self.meter.level(),
            speaking_now: self.meter.is_speaking_now(ai_speaking),
        }
    }

    /// Current session statistics
    pub fn stats(&self) -> SessionStats {
        let duration = Utc::now().signed_duration_since(self.started_at);
        let counters = self.capture.counters();

        SessionStats {
            session_id: self.config.session_id.clone(),
            state: self.state,
            started_at: self.started_at,
            duration_secs: duration.num_milliseconds() as f64 / 1000.0,
            frames_captured: counters.frames_captured,
            frames_sent: counters.frames_sent,
            frames_dropped: counters.frames_dropped,
            audio_chunks_received: self.audio_chunks_received,
            local_interruptions: self.local_interruptions,
            server_interruptions: self.server_interruptions,
            messages_flushed: self.transcript.len(),
        }
    }

    fn set_state(&mut self, state: SessionState) {
        self.state = state;
        self.publish_status();
    }

    fn publish_status(&self) {
        self.display.on_status(self.status());
        self.display.on_stats(&self.stats());
    }
}
