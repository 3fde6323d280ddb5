use rayon::prelude::*;

use crate::audio::AudioSignal;

/// Length of the energy window in samples (50 ms).
pub fn window_size(sample_rate: u32) -> usize {
    (sample_rate / 20) as usize
}

/// Short-time energy curve, normalized to 0..1 by its global maximum.
///
/// `values[i]` is the energy of the window starting at sample `i * hop_size`.
#[derive(Clone, Debug, Default)]
pub struct EnergyEnvelope {
    values: Vec<f32>,
    window_size: usize,
    hop_size: usize,
    sample_rate: u32,
}

impl EnergyEnvelope {
    pub fn compute(signal: &AudioSignal<'_>) -> Self {
        let samples = signal.samples();
        let sample_rate = signal.sample_rate();
        let window_size = window_size(sample_rate);
        let hop_size = window_size / 2;

        if hop_size == 0 || samples.len() < window_size {
            return Self {
                values: Vec::new(),
                window_size,
                hop_size,
                sample_rate,
            };
        }

        let num_frames = (samples.len() - window_size) / hop_size;
        let mut values: Vec<f32> = (0..num_frames)
            .into_par_iter()
            .map(|frame| {
                let start = frame * hop_size;
                samples[start..start + window_size]
                    .iter()
                    .map(|s| s * s)
                    .sum::<f32>()
            })
            .collect();

        let max = values.iter().copied().fold(0.0f32, f32::max);
        if max > 0.0 {
            for v in &mut values {
                *v /= max;
            }
        }

        log::debug!(
            "Energy envelope: {} frames (window={}, hop={})",
            values.len(),
            window_size,
            hop_size
        );

        Self {
            values,
            window_size,
            hop_size,
            sample_rate,
        }
    }

    /// Normalized view used for peak picking.
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Mean-removed view used for spectral analysis.
    pub fn dc_removed(&self) -> Vec<f32> {
        if self.values.is_empty() {
            return Vec::new();
        }
        let mean = self.values.iter().sum::<f32>() / self.values.len() as f32;
        self.values.iter().map(|v| v - mean).collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// True when no frame carries any energy.
    pub fn is_silent(&self) -> bool {
        self.values.iter().all(|&v| v == 0.0)
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn hop_size(&self) -> usize {
        self.hop_size
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Envelope frames per second.
    pub fn frame_rate(&self) -> f64 {
        if self.hop_size == 0 {
            return 0.0;
        }
        self.sample_rate as f64 / self.hop_size as f64
    }

    pub fn frame_to_seconds(&self, frame: f64) -> f64 {
        frame * self.hop_size as f64 / self.sample_rate as f64
    }
}
