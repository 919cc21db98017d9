use std::collections::VecDeque;

/// Number of RMS readings averaged by the meter
pub const HISTORY_LEN: usize = 20;

/// Average level above which the AI counts as audibly speaking
pub const SPEAKING_LEVEL: f32 = 0.01;

/// Smoothed loudness for presentation
///
/// Keeps a fixed window of the most recent per-frame RMS values, starting
/// from silence.
#[derive(Debug, Clone)]
pub struct VolumeMeter {
    history: VecDeque<f32>,
}

impl Default for VolumeMeter {
    fn default() -> Self {
        Self::new()
    }
}

impl VolumeMeter {
    pub fn new() -> Self {
        Self {
            history: std::iter::repeat(0.0).take(HISTORY_LEN).collect(),
        }
    }

    pub fn push(&mut self, rms: f32) {
        self.history.pop_front();
        self.history.push_back(rms);
    }

    /// Mean of the window
    pub fn level(&self) -> f32 {
        self.history.iter().sum::<f32>() / self.history.len() as f32
    }

    /// Whether an avatar should show its speaking mouth
    pub fn is_speaking_now(&self, ai_speaking: bool) -> bool {
        ai_speaking && self.level() > SPEAKING_LEVEL
    }

    pub fn reset(&mut self) {
        self.history.iter_mut().for_each(|v| *v = 0.0);
    }
}
