use rustfft::{num_complex::Complex, FftPlanner};
use serde::Serialize;

use super::envelope::EnergyEnvelope;

/// Magnitudes at or below this are treated as no peak at all.
const MIN_PEAK_MAGNITUDE: f32 = 1e-6;

/// Tempo estimate. `0.0` means detection failed.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct BpmEstimate {
    pub bpm: f64,
}

impl BpmEstimate {
    pub const NONE: BpmEstimate = BpmEstimate { bpm: 0.0 };

    pub fn is_detected(&self) -> bool {
        self.bpm > 0.0
    }

    pub fn seconds_per_beat(&self) -> Option<f64> {
        self.is_detected().then(|| 60.0 / self.bpm)
    }
}

/// Finds the dominant periodicity of an energy envelope within a tempo range.
#[derive(Clone, Copy, Debug)]
pub struct BpmEstimator {
    min_bpm: f64,
    max_bpm: f64,
}

impl Default for BpmEstimator {
    fn default() -> Self {
        Self::new(60.0, 185.0)
    }
}

impl BpmEstimator {
    pub fn new(min_bpm: f64, max_bpm: f64) -> Self {
        Self { min_bpm, max_bpm }
    }

    pub fn estimate(&self, envelope: &EnergyEnvelope) -> BpmEstimate {
        let centered = envelope.dc_removed();
        if centered.is_empty() {
            return BpmEstimate::NONE;
        }

        // Zero-pad to the next power of two
        let fft_size = centered.len().next_power_of_two();
        let mut buffer: Vec<Complex<f32>> = vec![Complex::new(0.0, 0.0); fft_size];
        for (slot, &v) in buffer.iter_mut().zip(centered.iter()) {
            *slot = Complex::new(v, 0.0);
        }

        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(fft_size);
        fft.process(&mut buffer);

        let bin_freq = envelope.frame_rate() / fft_size as f64;
        let mut peak: Option<(usize, f32)> = None;

        for (bin, c) in buffer[..fft_size / 2].iter().enumerate().skip(1) {
            let bpm = bin as f64 * bin_freq * 60.0;
            if bpm < self.min_bpm || bpm > self.max_bpm {
                continue;
            }
            let magnitude = c.norm();
            if magnitude > peak.map_or(MIN_PEAK_MAGNITUDE, |(_, m)| m) {
                peak = Some((bin, magnitude));
            }
        }

        match peak {
            Some((bin, magnitude)) => {
                let bpm = (bin as f64 * bin_freq * 60.0 * 10.0).round() / 10.0;
                log::debug!(
                    "Tempo peak at bin {} of {} (magnitude {:.3}) -> {:.1} BPM",
                    bin,
                    fft_size,
                    magnitude,
                    bpm
                );
                BpmEstimate { bpm }
            }
            None => BpmEstimate::NONE,
        }
    }
}
