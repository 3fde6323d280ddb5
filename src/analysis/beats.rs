//! Beat grid detection
//!
//! Peaks in the normalized energy envelope are snapped onto an evenly
//! spaced grid at the estimated tempo. The snapping is greedy: each grid
//! step takes the closest peak within half a beat, or keeps the nominal
//! position when no peak is in range. Tracks with too few detected beats
//! fall back to a synthetic grid built from the tempo alone.

use serde::Serialize;

use super::bpm::BpmEstimate;
use super::envelope::EnergyEnvelope;

/// Below this many detected beats the grid is synthesized instead.
pub const MIN_DETECTED_BEATS: usize = 4;

/// Ordered, strictly increasing beat times in seconds.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct BeatGrid {
    times: Vec<f64>,
}

/// Where a beat grid came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GridSource {
    Detected,
    Synthesized,
}

impl BeatGrid {
    pub fn from_times(times: Vec<f64>) -> Self {
        debug_assert!(times.windows(2).all(|w| w[0] < w[1]));
        Self { times }
    }

    /// Uniform grid `offset + i * 60/bpm` holding `floor(duration / (60/bpm))` beats.
    pub fn synthesize(bpm: f64, offset: f64, duration_sec: f64) -> Self {
        if bpm <= 0.0 || duration_sec <= 0.0 {
            return Self::default();
        }
        let seconds_per_beat = 60.0 / bpm;
        let count = (duration_sec / seconds_per_beat).floor() as usize;
        let times = (0..count)
            .map(|i| offset + i as f64 * seconds_per_beat)
            .collect();
        Self { times }
    }

    /// Shift the whole grid so its first beat lands on `offset` when it starts earlier.
    pub fn anchor(&mut self, offset: f64) {
        let Some(&first) = self.times.first() else {
            return;
        };
        if first >= offset {
            return;
        }
        let shift = offset - first;
        for t in &mut self.times {
            *t += shift;
        }
        self.times[0] = offset;
    }

    /// Drop beats at or past `end_sec`.
    pub fn truncate_at(&mut self, end_sec: f64) {
        let keep = self.times.partition_point(|&t| t < end_sec);
        self.times.truncate(keep);
    }

    /// Index of the first beat strictly after `time_sec`.
    pub fn next_index_after(&self, time_sec: f64) -> Option<usize> {
        let idx = self.times.partition_point(|&t| t <= time_sec);
        (idx < self.times.len()).then_some(idx)
    }

    /// Beat times as fractions of the track length, for markers.
    pub fn normalized_positions(&self, duration_sec: f64) -> Vec<f64> {
        if duration_sec <= 0.0 {
            return Vec::new();
        }
        self.times.iter().map(|t| t / duration_sec).collect()
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn first(&self) -> Option<f64> {
        self.times.first().copied()
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.times.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}

#[derive(Clone, Copy, Debug)]
pub struct BeatTracker {
    peak_threshold: f32,
}

impl Default for BeatTracker {
    fn default() -> Self {
        Self::new(0.3)
    }
}

impl BeatTracker {
    pub fn new(peak_threshold: f32) -> Self {
        Self { peak_threshold }
    }

    /// Local maxima of the envelope above the threshold.
    pub fn pick_peaks(&self, envelope: &[f32]) -> Vec<usize> {
        if envelope.len() < 3 {
            return Vec::new();
        }
        (1..envelope.len() - 1)
            .filter(|&i| {
                envelope[i] > envelope[i - 1]
                    && envelope[i] >= envelope[i + 1]
                    && envelope[i] > self.peak_threshold
            })
            .collect()
    }

    /// Snap envelope peaks onto a grid at `bpm`, starting from the first peak.
    pub fn track(&self, envelope: &EnergyEnvelope, bpm: BpmEstimate) -> BeatGrid {
        let Some(seconds_per_beat) = bpm.seconds_per_beat() else {
            return BeatGrid::default();
        };

        let peaks = self.pick_peaks(envelope.values());
        let Some(&first_peak) = peaks.first() else {
            return BeatGrid::default();
        };

        let beat_hop =
            seconds_per_beat * envelope.sample_rate() as f64 / envelope.hop_size() as f64;
        let reach = beat_hop / 2.0;
        let num_frames = envelope.len() as f64;

        let mut target = first_peak as f64;
        let mut frames = Vec::new();

        while target < num_frames {
            // Candidates strictly within half a beat of the target
            let lo = peaks.partition_point(|&p| (p as f64) <= target - reach);
            let hi = peaks.partition_point(|&p| (p as f64) < target + reach);
            let snapped = peaks[lo..hi]
                .iter()
                .map(|&p| (p as f64, (p as f64 - target).abs()))
                .min_by(|a, b| a.1.total_cmp(&b.1))
                .map_or(target, |(p, _)| p);

            frames.push(snapped);
            target += beat_hop;
        }

        log::debug!(
            "Beat tracking: {} peaks, {} grid beats (hop {:.2} frames)",
            peaks.len(),
            frames.len(),
            beat_hop
        );

        BeatGrid::from_times(
            frames
                .into_iter()
                .map(|f| envelope.frame_to_seconds(f))
                .collect(),
        )
    }

    /// Keep a detected grid, or replace it with a synthetic one when too sparse.
    pub fn resolve(
        detected: BeatGrid,
        bpm: BpmEstimate,
        duration_sec: f64,
    ) -> (BeatGrid, GridSource) {
        if detected.len() >= MIN_DETECTED_BEATS {
            return (detected, GridSource::Detected);
        }
        let offset = detected.first().unwrap_or(0.0);
        log::warn!(
            "Detection degraded: only {} beats found, synthesizing a {:.1} BPM grid from {:.3}s",
            detected.len(),
            bpm.bpm,
            offset
        );
        (
            BeatGrid::synthesize(bpm.bpm, offset, duration_sec),
            GridSource::Synthesized,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::test_signals::click_track;
    use crate::audio::AudioSignal;

    #[test]
    fn test_pick_peaks() {
        let env = [0.0, 0.5, 0.2, 0.2, 0.9, 0.9, 0.1, 0.25, 0.1];
        let peaks = BeatTracker::default().pick_peaks(&env);
        // 0.25 is under the threshold; the plateau reports its first frame
        assert_eq!(peaks, vec![1, 4]);
    }

    #[test]
    fn test_pick_peaks_short_input() {
        assert!(BeatTracker::default().pick_peaks(&[1.0, 0.0]).is_empty());
    }

    #[test]
    fn test_synthesize_count_and_spacing() {
        let grid = BeatGrid::synthesize(120.0, 0.25, 10.2);
        assert_eq!(grid.len(), (10.2f64 / 0.5).floor() as usize);
        assert_eq!(grid.first(), Some(0.25));
        for w in grid.times().windows(2) {
            assert!((w[1] - w[0] - 0.5).abs() < 1e-9);
        }
    }

    #[test]
    fn test_synthesize_without_tempo_is_empty() {
        assert!(BeatGrid::synthesize(0.0, 0.0, 30.0).is_empty());
    }

    #[test]
    fn test_anchor_shifts_uniformly() {
        let mut grid = BeatGrid::from_times(vec![0.1, 0.6, 1.1, 1.6]);
        grid.anchor(1.1);
        assert_eq!(grid.first(), Some(1.1));
        let expected = [1.1, 1.6, 2.1, 2.6];
        for (t, e) in grid.times().iter().zip(expected) {
            assert!((t - e).abs() < 1e-9);
        }
    }

    #[test]
    fn test_anchor_is_idempotent() {
        let mut grid = BeatGrid::from_times(vec![0.1, 0.6, 1.1, 1.6]);
        grid.anchor(0.35);
        let once = grid.clone();
        grid.anchor(0.35);
        assert_eq!(grid, once);
    }

    #[test]
    fn test_anchor_ignores_earlier_offset() {
        let mut grid = BeatGrid::from_times(vec![1.0, 2.0]);
        grid.anchor(0.5);
        assert_eq!(grid.times(), &[1.0, 2.0]);
    }

    #[test]
    fn test_next_index_after_is_strict() {
        let grid = BeatGrid::from_times(vec![0.0, 0.5, 1.0]);
        assert_eq!(grid.next_index_after(-1.0), Some(0));
        assert_eq!(grid.next_index_after(0.5), Some(2));
        assert_eq!(grid.next_index_after(1.0), None);
    }

    #[test]
    fn test_truncate_at() {
        let mut grid = BeatGrid::from_times(vec![0.0, 0.5, 1.0, 1.5]);
        grid.truncate_at(1.0);
        assert_eq!(grid.times(), &[0.0, 0.5]);
    }

    #[test]
    fn test_track_click_track_spacing() {
        let samples = click_track(120.0, 20.0, 44100);
        let signal = AudioSignal::new(&samples, 44100).unwrap();
        let env = EnergyEnvelope::compute(&signal);
        let grid = BeatTracker::default().track(&env, BpmEstimate { bpm: 120.0 });

        assert!(grid.len() >= 35, "got {} beats", grid.len());
        // The click at 0s sits in frame 0, which can never be a peak
        assert!((grid.first().unwrap() - 0.5).abs() < 0.05);
        for w in grid.times().windows(2) {
            assert!(w[1] > w[0]);
            assert!((w[1] - w[0] - 0.5).abs() < 0.06, "interval {}", w[1] - w[0]);
        }
    }

    #[test]
    fn test_track_without_tempo_is_empty() {
        let samples = click_track(120.0, 5.0, 44100);
        let signal = AudioSignal::new(&samples, 44100).unwrap();
        let env = EnergyEnvelope::compute(&signal);
        assert!(BeatTracker::default().track(&env, BpmEstimate::NONE).is_empty());
    }

    #[test]
    fn test_resolve_falls_back_when_sparse() {
        let sparse = BeatGrid::from_times(vec![0.2, 0.7]);
        let (grid, source) = BeatTracker::resolve(sparse, BpmEstimate { bpm: 120.0 }, 4.0);
        assert_eq!(source, GridSource::Synthesized);
        assert_eq!(grid.len(), 8);
        assert_eq!(grid.first(), Some(0.2));
    }

    #[test]
    fn test_resolve_keeps_dense_grid() {
        let dense = BeatGrid::from_times(vec![0.0, 0.5, 1.0, 1.5]);
        let (grid, source) = BeatTracker::resolve(dense.clone(), BpmEstimate { bpm: 120.0 }, 4.0);
        assert_eq!(source, GridSource::Detected);
        assert_eq!(grid, dense);
    }
}
