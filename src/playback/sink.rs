use anyhow::{bail, Result};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

use super::scheduler::{EntryId, OutputSink, PlaybackEntry};
use crate::session::SessionEvent;

/// Output sink driven by the tokio clock
///
/// Time zero is the moment the sink is created. Each scheduled buffer gets a
/// timer that posts `SessionEvent::PlaybackEnded` when its end time passes;
/// stopping a buffer cancels that timer so no completion is ever reported for
/// it.
pub struct ClockedSink {
    origin: Instant,
    sample_rate: u32,
    events: mpsc::UnboundedSender<SessionEvent>,
    timers: HashMap<EntryId, JoinHandle<()>>,
    closed: bool,
}

impl ClockedSink {
    pub fn new(sample_rate: u32, events: mpsc::UnboundedSender<SessionEvent>) -> Self {
        info!("Output clock started ({}Hz)", sample_rate);

        Self {
            origin: Instant::now(),
            sample_rate,
            events,
            timers: HashMap::new(),
            closed: false,
        }
    }

    /// Buffers currently waiting to start or playing
    pub fn pending(&self) -> usize {
        self.timers.values().filter(|t| !t.is_finished()).count()
    }
}

impl OutputSink for ClockedSink {
    fn current_time(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }

    fn schedule(&mut self, entry: &PlaybackEntry, samples: &[f32]) -> Result<()> {
        if self.closed {
            bail!("Output sink is closed");
        }

        self.timers.retain(|_, timer| !timer.is_finished());

        let end = self.origin + Duration::from_secs_f64(entry.end_time().max(0.0));
        let events = self.events.clone();
        let id = entry.id;

        let timer = tokio::spawn(async move {
            tokio::time::sleep_until(end).await;
            let _ = events.send(SessionEvent::PlaybackEnded(id));
        });

        debug!(
            "Rendering entry {} ({} samples @ {}Hz)",
            id,
            samples.len(),
            self.sample_rate
        );

        self.timers.insert(id, timer);
        Ok(())
    }

    fn stop(&mut self, id: EntryId) {
        if let Some(timer) = self.timers.remove(&id) {
            timer.abort();
        }
    }

    fn close(&mut self) {
        for (_, timer) in self.timers.drain() {
            timer.abort();
        }
        self.closed = true;
    }
}

impl Drop for ClockedSink {
    fn drop(&mut self) {
        self.close();
    }
}
