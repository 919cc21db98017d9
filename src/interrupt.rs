//! Barge-in detection
//!
//! While AI audio is playing, a single input frame louder than the threshold
//! cancels all scheduled output. The server can request the same
//! cancellation explicitly.

use serde::Serialize;
use tracing::info;

use crate::playback::PlaybackScheduler;

/// Default RMS level above which user speech cancels playback
pub const DEFAULT_THRESHOLD: f32 = 0.1;

/// What triggered a cancellation
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum InterruptionSource {
    /// Local loudness detection
    Local { rms: f32 },
    /// `interrupted` flag from the remote peer
    Server,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interruption {
    pub source: InterruptionSource,
    /// Number of output buffers that were cut off
    pub cancelled: usize,
}

/// Watches input loudness against the playback state
#[derive(Debug, Clone)]
pub struct InterruptionMonitor {
    threshold: f32,
}

impl Default for InterruptionMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}

impl InterruptionMonitor {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Check one captured frame's loudness
    ///
    /// Cancels playback when the AI is speaking and `rms` exceeds the
    /// threshold. No debounce: one loud frame is enough.
    pub fn observe(&self, rms: f32, scheduler: &mut PlaybackScheduler) -> Option<Interruption> {
        if !scheduler.is_speaking() || rms <= self.threshold {
            return None;
        }

        let cancelled = scheduler.cancel_all();
        info!(
            "Barge-in: input rms {:.3} > {:.3}, cancelled {} buffers",
            rms, self.threshold, cancelled
        );

        Some(Interruption {
            source: InterruptionSource::Local { rms },
            cancelled,
        })
    }

    /// Server-requested interruption; always cancels
    pub fn interrupt_from_server(&self, scheduler: &mut PlaybackScheduler) -> Interruption {
        let cancelled = scheduler.cancel_all();
        info!("Server interruption: cancelled {} buffers", cancelled);

        Interruption {
            source: InterruptionSource::Server,
            cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioFrame;
    use crate::playback::{EntryId, OutputSink, PlaybackEntry};

    struct SilentSink;

    impl OutputSink for SilentSink {
        fn current_time(&self) -> f64 {
            0.0
        }
        fn schedule(&mut self, _entry: &PlaybackEntry, _samples: &[f32]) -> anyhow::Result<()> {
            Ok(())
        }
        fn stop(&mut self, _id: EntryId) {}
        fn close(&mut self) {}
    }

    fn speaking_scheduler(entries: usize) -> PlaybackScheduler {
        let mut scheduler = PlaybackScheduler::new(24000);
        scheduler.attach(Box::new(SilentSink));
        for _ in 0..entries {
            scheduler.enqueue(&AudioFrame::new(vec![1; 240], 24000)).unwrap();
        }
        scheduler
    }

    #[test]
    fn test_loud_frame_cancels_playback() {
        let monitor = InterruptionMonitor::new(0.1);
        let mut scheduler = speaking_scheduler(3);

        let interruption = monitor.observe(0.25, &mut scheduler).unwrap();
        assert_eq!(interruption.cancelled, 3);
        assert_eq!(interruption.source, InterruptionSource::Local { rms: 0.25 });
        assert_eq!(scheduler.active_len(), 0);
        assert!(!scheduler.is_speaking());
    }

    #[test]
    fn test_quiet_frame_is_ignored() {
        let monitor = InterruptionMonitor::new(0.1);
        let mut scheduler = speaking_scheduler(2);

        assert!(monitor.observe(0.05, &mut scheduler).is_none());
        assert!(monitor.observe(0.1, &mut scheduler).is_none());
        assert_eq!(scheduler.active_len(), 2);
        assert!(scheduler.is_speaking());
    }

    #[test]
    fn test_loud_frame_without_playback_is_ignored() {
        let monitor = InterruptionMonitor::new(0.08);
        let mut scheduler = speaking_scheduler(0);

        assert!(monitor.observe(0.9, &mut scheduler).is_none());
    }

    #[test]
    fn test_server_interruption_always_cancels() {
        let monitor = InterruptionMonitor::default();
        let mut scheduler = speaking_scheduler(1);

        let interruption = monitor.interrupt_from_server(&mut scheduler);
        assert_eq!(interruption.source, InterruptionSource::Server);
        assert_eq!(interruption.cancelled, 1);
        assert!(!scheduler.is_speaking());
    }
}
