use crate::error::{MixError, Result};

/// Borrowed view over mono PCM. The engine never keeps it past an analysis call.
#[derive(Clone, Copy, Debug)]
pub struct AudioSignal<'a> {
    samples: &'a [f32],
    sample_rate: u32,
}

impl<'a> AudioSignal<'a> {
    pub fn new(samples: &'a [f32], sample_rate: u32) -> Result<Self> {
        if sample_rate == 0 {
            return Err(MixError::InvalidSampleRate);
        }
        Ok(Self {
            samples,
            sample_rate,
        })
    }

    pub fn samples(&self) -> &'a [f32] {
        self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn duration_sec(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}
