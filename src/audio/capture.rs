//! Capture pipeline
//!
//! Turns each microphone block into an outbound audio frame: loudness first,
//! then the barge-in check, then clamp, encode and send. Blocks captured
//! while the channel is not open are counted and dropped.

use tracing::{debug, warn};

use super::codec;
use crate::interrupt::{Interruption, InterruptionMonitor};
use crate::playback::PlaybackScheduler;
use crate::transport::Transport;

/// Root-mean-square loudness of a block (0.0 for an empty block)
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f32 = samples.iter().map(|s| s * s).sum();
    (sum / samples.len() as f32).sqrt()
}

/// Result of pushing one block through the pipeline
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureOutcome {
    pub rms: f32,
    pub interruption: Option<Interruption>,
    pub sent: bool,
}

/// Counters kept across a session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureCounters {
    pub frames_captured: usize,
    pub frames_sent: usize,
    pub frames_dropped: usize,
}

/// Turns microphone blocks into outbound audio envelopes
///
/// Per block: loudness, barge-in check, clamp + encode, send. The whole
/// sequence runs inside one call so no other event can interleave.
#[derive(Debug, Default)]
pub struct CapturePipeline {
    counters: CaptureCounters,
}

impl CapturePipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counters(&self) -> CaptureCounters {
        self.counters
    }

    /// Process one block
    ///
    /// `transport` is `None` whenever the session is not connected; the block
    /// is then dropped silently after the loudness and barge-in steps.
    pub fn process(
        &mut self,
        samples: &[f32],
        monitor: &InterruptionMonitor,
        scheduler: &mut PlaybackScheduler,
        transport: Option<&dyn Transport>,
    ) -> CaptureOutcome {
        self.counters.frames_captured += 1;

        let level = rms(samples);
        let interruption = monitor.observe(level, scheduler);

        let Some(transport) = transport else {
            self.counters.frames_dropped += 1;
            return CaptureOutcome {
                rms: level,
                interruption,
                sent: false,
            };
        };

        let clamped: Vec<f32> = samples.iter().map(|s| s.clamp(-1.0, 1.0)).collect();
        let payload = codec::to_transport_text(&codec::encode_frame(&clamped));

        let sent = match transport.send_audio(payload) {
            Ok(()) => {
                self.counters.frames_sent += 1;
                true
            }
            Err(e) => {
                warn!("Dropping audio frame: {}", e);
                self.counters.frames_dropped += 1;
                false
            }
        };

        debug!("Captured {} samples (rms {:.4}, sent {})", samples.len(), level, sent);

        CaptureOutcome {
            rms: level,
            interruption,
            sent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rms_of_constant_signal() {
        assert!((rms(&[0.5; 64]) - 0.5).abs() < 1e-6);
        assert!((rms(&[-0.25, 0.25]) - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_rms_of_empty_block_is_zero() {
        assert_eq!(rms(&[]), 0.0);
    }
}
