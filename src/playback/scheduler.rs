use anyhow::Result;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::audio::AudioFrame;

/// Identifier of a scheduled output buffer
pub type EntryId = u64;

/// A buffer scheduled on the output clock
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackEntry {
    pub id: EntryId,
    /// Output clock time (seconds) at which the buffer starts
    pub start_time: f64,
    /// Buffer length in seconds
    pub duration: f64,
}

impl PlaybackEntry {
    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration
    }
}

/// Audio rendering context that accepts timed buffers
///
/// The scheduler only decides *when* a buffer plays; the sink renders it and
/// reports natural completion back through the session's event queue.
pub trait OutputSink: Send {
    /// Current time of the output clock, in seconds
    fn current_time(&self) -> f64;

    /// Queue `samples` to start playing at `entry.start_time`
    fn schedule(&mut self, entry: &PlaybackEntry, samples: &[f32]) -> Result<()>;

    /// Stop a scheduled or playing buffer immediately
    fn stop(&mut self, id: EntryId);

    /// Release the rendering context
    fn close(&mut self);
}

/// Gapless scheduler for inbound audio
///
/// Each buffer starts at `max(now, end of previous buffer)` so consecutive
/// frames play back to back without overlap, and late frames snap to the
/// current clock time.
pub struct PlaybackScheduler {
    sample_rate: u32,
    sink: Option<Box<dyn OutputSink>>,
    active: BTreeMap<EntryId, PlaybackEntry>,
    next_start_time: f64,
    next_id: EntryId,
    speaking: bool,
}

impl PlaybackScheduler {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            sink: None,
            active: BTreeMap::new(),
            next_start_time: 0.0,
            next_id: 0,
            speaking: false,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Install the output sink for a new session
    pub fn attach(&mut self, sink: Box<dyn OutputSink>) {
        if self.sink.is_some() {
            self.detach();
        }
        self.sink = Some(sink);
        self.next_start_time = 0.0;
        info!("Playback scheduler attached ({}Hz)", self.sample_rate);
    }

    /// Cancel everything and close the output sink
    pub fn detach(&mut self) {
        self.cancel_all();
        if let Some(mut sink) = self.sink.take() {
            sink.close();
            info!("Playback output closed");
        }
        self.next_start_time = 0.0;
    }

    pub fn is_attached(&self) -> bool {
        self.sink.is_some()
    }

    /// True while any scheduled buffer has not finished
    pub fn is_speaking(&self) -> bool {
        self.speaking
    }

    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    /// Schedule a decoded frame for output
    ///
    /// Returns `Ok(None)` without side effects when no sink is attached or the
    /// frame is empty.
    pub fn enqueue(&mut self, frame: &AudioFrame) -> Result<Option<PlaybackEntry>> {
        let Some(sink) = self.sink.as_mut() else {
            debug!("No output sink attached; dropping {} samples", frame.samples.len());
            return Ok(None);
        };

        if frame.is_empty() {
            return Ok(None);
        }

        let now = sink.current_time();
        let start_time = self.next_start_time.max(now);
        let entry = PlaybackEntry {
            id: self.next_id,
            start_time,
            duration: frame.samples.len() as f64 / self.sample_rate as f64,
        };

        sink.schedule(&entry, &frame.to_float())?;

        self.next_id += 1;
        self.next_start_time = entry.end_time();
        self.active.insert(entry.id, entry);
        self.speaking = true;

        debug!(
            "Scheduled entry {} at {:.3}s for {:.3}s ({} active)",
            entry.id,
            entry.start_time,
            entry.duration,
            self.active.len()
        );

        Ok(Some(entry))
    }

    /// Natural completion of a buffer
    ///
    /// Unknown ids (already cancelled, or from a closed session) are ignored.
    /// Returns true when this completion drained the active set.
    pub fn on_entry_ended(&mut self, id: EntryId) -> bool {
        if self.active.remove(&id).is_none() {
            debug!("Ignoring completion of inactive entry {}", id);
            return false;
        }

        if self.active.is_empty() && self.speaking {
            self.speaking = false;
            debug!("Playback drained");
            return true;
        }

        false
    }

    /// Stop every active buffer immediately and clear the speaking flag
    ///
    /// Returns the number of buffers that were cut off.
    pub fn cancel_all(&mut self) -> usize {
        let cancelled = self.active.len();

        match self.sink.as_mut() {
            Some(sink) => {
                for id in self.active.keys() {
                    sink.stop(*id);
                }
            }
            None if cancelled > 0 => {
                warn!("Cancelling {} entries with no sink attached", cancelled);
            }
            None => {}
        }

        self.active.clear();
        self.speaking = false;
        self.next_start_time = 0.0;

        cancelled
    }
}
