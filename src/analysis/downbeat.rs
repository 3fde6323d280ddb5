use super::beats::{BeatGrid, MIN_DETECTED_BEATS};
use super::envelope::window_size;
use crate::audio::AudioSignal;

/// Picks the first perceptually strong beat among the opening beats.
#[derive(Clone, Copy, Debug)]
pub struct DownbeatLocator {
    threshold: f32,
    max_beats: usize,
}

impl Default for DownbeatLocator {
    fn default() -> Self {
        Self::new(0.5, 16)
    }
}

impl DownbeatLocator {
    pub fn new(threshold: f32, max_beats: usize) -> Self {
        Self {
            threshold,
            max_beats: max_beats.max(1),
        }
    }

    /// Time of the first beat whose onset energy exceeds the threshold
    /// relative to the loudest opening beat. Returns 0 with fewer than
    /// four beats and the first beat when none qualifies.
    pub fn locate(&self, signal: &AudioSignal<'_>, beats: &BeatGrid) -> f64 {
        if beats.len() < MIN_DETECTED_BEATS {
            return 0.0;
        }

        let samples = signal.samples();
        let sample_rate = signal.sample_rate() as f64;
        let window = window_size(signal.sample_rate());

        let energies: Vec<f32> = beats
            .times()
            .iter()
            .take(self.max_beats)
            .map(|&beat| {
                let start = ((beat.max(0.0) * sample_rate).floor() as usize).min(samples.len());
                let end = (start + window).min(samples.len());
                samples[start..end].iter().map(|s| s * s).sum()
            })
            .collect();

        let first = beats.times()[0];
        let max = energies.iter().copied().fold(0.0f32, f32::max);
        if max <= 0.0 {
            return first;
        }

        energies
            .iter()
            .position(|&e| e / max > self.threshold)
            .map_or(first, |idx| beats.times()[idx])
    }
}
