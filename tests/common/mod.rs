// Test doubles shared by the integration tests
//
// Every double records what it was asked to do behind an Arc<Mutex<..>> so
// the test keeps a handle after boxing it into the session.

#![allow(dead_code)]

use anyhow::{bail, Result};
use futures::StreamExt;
use hound::{SampleFormat, WavSpec, WavWriter};
use live_voice::display::{DisplaySink, StatusSnapshot};
use live_voice::playback::{EntryId, OutputSink, PlaybackEntry};
use live_voice::session::TranscriptMessage;
use live_voice::transport::Transport;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

#[derive(Default)]
pub struct TransportLog {
    pub sent: Vec<String>,
    pub closed: bool,
    pub fail_sends: bool,
}

/// Transport that records outbound text
#[derive(Clone, Default)]
pub struct RecordingTransport(pub Arc<Mutex<TransportLog>>);

impl RecordingTransport {
    pub fn sent(&self) -> Vec<String> {
        self.0.lock().unwrap().sent.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.0.lock().unwrap().closed
    }
}

impl Transport for RecordingTransport {
    fn send_text(&self, text: String) -> Result<()> {
        let mut log = self.0.lock().unwrap();
        if log.closed || log.fail_sends {
            bail!("transport closed");
        }
        log.sent.push(text);
        Ok(())
    }

    fn close(&mut self) {
        self.0.lock().unwrap().closed = true;
    }
}

#[derive(Default)]
pub struct SinkLog {
    pub now: f64,
    pub scheduled: Vec<PlaybackEntry>,
    pub stopped: Vec<EntryId>,
    pub closed: bool,
}

/// Output sink with a manually advanced clock
#[derive(Clone, Default)]
pub struct ManualSink(pub Arc<Mutex<SinkLog>>);

impl ManualSink {
    pub fn set_time(&self, now: f64) {
        self.0.lock().unwrap().now = now;
    }

    pub fn scheduled(&self) -> Vec<PlaybackEntry> {
        self.0.lock().unwrap().scheduled.clone()
    }

    pub fn stopped(&self) -> Vec<EntryId> {
        self.0.lock().unwrap().stopped.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.0.lock().unwrap().closed
    }
}

impl OutputSink for ManualSink {
    fn current_time(&self) -> f64 {
        self.0.lock().unwrap().now
    }

    fn schedule(&mut self, entry: &PlaybackEntry, _samples: &[f32]) -> Result<()> {
        let mut log = self.0.lock().unwrap();
        if log.closed {
            bail!("sink closed");
        }
        log.scheduled.push(*entry);
        Ok(())
    }

    fn stop(&mut self, id: EntryId) {
        self.0.lock().unwrap().stopped.push(id);
    }

    fn close(&mut self) {
        self.0.lock().unwrap().closed = true;
    }
}

#[derive(Default)]
pub struct DisplayLog {
    pub statuses: Vec<StatusSnapshot>,
    pub messages: Vec<TranscriptMessage>,
    pub errors: Vec<String>,
}

/// Display that records everything pushed to it
#[derive(Clone, Default)]
pub struct RecordingDisplay(pub Arc<Mutex<DisplayLog>>);

impl RecordingDisplay {
    pub fn messages(&self) -> Vec<TranscriptMessage> {
        self.0.lock().unwrap().messages.clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.0.lock().unwrap().errors.clone()
    }

    pub fn last_status(&self) -> Option<StatusSnapshot> {
        self.0.lock().unwrap().statuses.last().copied()
    }
}

impl DisplaySink for RecordingDisplay {
    fn on_status(&self, status: StatusSnapshot) {
        self.0.lock().unwrap().statuses.push(status);
    }

    fn on_message(&self, message: &TranscriptMessage) {
        self.0.lock().unwrap().messages.push(message.clone());
    }

    fn on_error(&self, message: &str) {
        self.0.lock().unwrap().errors.push(message.to_string());
    }
}

/// Endpoint that accepts TCP connections but never completes a handshake
pub async fn stalled_peer() -> Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });

    Ok(format!("ws://{}", addr))
}

/// WebSocket peer that records every text message until the client closes
pub async fn loopback_peer() -> Result<(String, JoinHandle<Vec<String>>)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    let task = tokio::spawn(async move {
        let mut received = Vec::new();
        let Ok((stream, _)) = listener.accept().await else {
            return received;
        };
        let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
            return received;
        };
        while let Some(Ok(message)) = ws.next().await {
            match message {
                Message::Text(text) => received.push(text),
                Message::Close(_) => break,
                _ => {}
            }
        }
        received
    });

    Ok((format!("ws://{}", addr), task))
}

/// Quiet 16 kHz mono WAV used as the capture source
pub fn quiet_wav(dir: &Path, seconds: f32) -> Result<PathBuf> {
    let path = dir.join("input.wav");
    let spec = WavSpec {
        channels: 1,
        sample_rate: 16000,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(&path, spec)?;
    for _ in 0..(16000.0 * seconds) as usize {
        writer.write_sample(300i16)?;
    }
    writer.finalize()?;
    Ok(path)
}
