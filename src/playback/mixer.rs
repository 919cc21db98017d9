//! Sample-accurate mixing of scheduled buffers
//!
//! The mixer owns the output clock of a device sink: time advances only as
//! frames are rendered. Buffers are placed at absolute frame positions and
//! summed where they overlap.

use std::collections::BTreeMap;

use super::scheduler::EntryId;

#[derive(Debug)]
struct Voice {
    start: u64,
    samples: Vec<f32>,
}

impl Voice {
    fn end(&self) -> u64 {
        self.start + self.samples.len() as u64
    }
}

/// Mono mixer rendering into interleaved device buffers
#[derive(Debug)]
pub struct Mixer {
    rate: u32,
    position: u64,
    voices: BTreeMap<EntryId, Voice>,
}

impl Mixer {
    pub fn new(rate: u32) -> Self {
        Self {
            rate: rate.max(1),
            position: 0,
            voices: BTreeMap::new(),
        }
    }

    pub fn rate(&self) -> u32 {
        self.rate
    }

    /// Seconds rendered so far
    pub fn current_time(&self) -> f64 {
        self.position as f64 / self.rate as f64
    }

    /// Place `samples` (already at the mixer rate) to start at `start_time`
    ///
    /// A start time in the past plays from the next rendered frame.
    pub fn add(&mut self, id: EntryId, start_time: f64, samples: Vec<f32>) {
        let start = ((start_time.max(0.0) * self.rate as f64).round() as u64).max(self.position);
        self.voices.insert(id, Voice { start, samples });
    }

    pub fn remove(&mut self, id: EntryId) -> bool {
        self.voices.remove(&id).is_some()
    }

    pub fn clear(&mut self) {
        self.voices.clear();
    }

    pub fn pending(&self) -> usize {
        self.voices.len()
    }

    /// Fill `out` (interleaved, `channels` wide) and advance the clock
    ///
    /// Returns the buffers that finished during this render, in id order.
    pub fn render(&mut self, out: &mut [f32], channels: usize) -> Vec<EntryId> {
        let channels = channels.max(1);
        let frames = out.len() / channels;

        for (f, frame) in out.chunks_mut(channels).enumerate() {
            let t = self.position + f as u64;
            let mut acc = 0.0;
            for voice in self.voices.values() {
                if t >= voice.start && t < voice.end() {
                    acc += voice.samples[(t - voice.start) as usize];
                }
            }
            frame.fill(acc.clamp(-1.0, 1.0));
        }

        self.position += frames as u64;

        let position = self.position;
        let finished: Vec<EntryId> = self
            .voices
            .iter()
            .filter(|(_, v)| v.end() <= position)
            .map(|(id, _)| *id)
            .collect();
        for id in &finished {
            self.voices.remove(id);
        }
        finished
    }
}
