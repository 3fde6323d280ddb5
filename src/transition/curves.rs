//! Gain, tempo and filter trajectories evaluated against transition progress.

use serde::Serialize;
use std::f64::consts::PI;

/// Linear gains at or below this are reported as silence.
pub const SILENCE_THRESHOLD: f32 = 0.001;

/// dB value used for silence instead of negative infinity.
pub const SILENCE_DB: f32 = -100.0;

/// Gain in decibels with a finite silence floor.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct Gain {
    db: f32,
}

impl Gain {
    pub const UNITY: Gain = Gain { db: 0.0 };
    pub const SILENCE: Gain = Gain { db: SILENCE_DB };

    pub fn from_linear(value: f32) -> Gain {
        if value <= SILENCE_THRESHOLD {
            return Gain::SILENCE;
        }
        Gain {
            db: (20.0 * value.log10()).max(SILENCE_DB),
        }
    }

    pub fn db(self) -> f32 {
        self.db
    }

    pub fn linear(self) -> f32 {
        if self.is_silent() {
            0.0
        } else {
            10f32.powf(self.db / 20.0)
        }
    }

    pub fn is_silent(self) -> bool {
        self.db <= SILENCE_DB
    }
}

/// Outgoing and incoming linear gains at progress `p`.
///
/// The outgoing deck holds full level for the first half and the incoming
/// deck reaches full level at the midpoint. The cosine phase is clamped to
/// `[0, π/2]` so both curves stay monotonic.
pub fn crossfade_gains(p: f64) -> (f32, f32) {
    let p = p.clamp(0.0, 1.0);
    let sq = p * p;
    let out = if p <= 0.5 {
        1.0
    } else {
        ((sq - 0.5).clamp(0.0, 0.5) * PI).cos()
    };
    let inc = if p >= 0.5 {
        1.0
    } else {
        ((0.5 - sq).clamp(0.0, 0.5) * PI).cos()
    };
    (out.max(0.0) as f32, inc.max(0.0) as f32)
}

/// Raised-cosine ease: slow at both ends of the ramp.
pub fn ease(p: f64) -> f64 {
    0.5 - 0.5 * (p.clamp(0.0, 1.0) * PI).cos()
}

/// Target playback rates `(outgoing, incoming)` at eased progress `e`.
///
/// The outgoing deck bends from its own tempo to the incoming tempo while
/// the incoming deck starts matched to the outgoing tempo and relaxes to 1.
pub fn rate_targets(bpm_out: f64, bpm_in: f64, e: f64) -> (f64, f64) {
    let rate_out = 1.0 - (1.0 - bpm_in / bpm_out) * e;
    let start_in = bpm_out / bpm_in;
    let rate_in = start_in + (1.0 - start_in) * e;
    (rate_out, rate_in)
}

/// Shared tempo reported to observers.
pub fn master_bpm(bpm_out: f64, bpm_in: f64, e: f64) -> f64 {
    bpm_out + (bpm_in - bpm_out) * e
}

/// Moves an applied rate toward its target in bounded steps.
#[derive(Clone, Copy, Debug)]
pub struct RateLimiter {
    pub max_step: f64,
    pub min_rate: f64,
    pub max_rate: f64,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self {
            max_step: 0.02,
            min_rate: 0.5,
            max_rate: 2.0,
        }
    }
}

impl RateLimiter {
    pub fn step(&self, current: f64, target: f64) -> f64 {
        let delta = (target - current).clamp(-self.max_step, self.max_step);
        (current + delta).clamp(self.min_rate, self.max_rate)
    }

    pub fn allows(&self, rate: f64) -> bool {
        rate >= self.min_rate && rate <= self.max_rate
    }
}

/// Filter split between the decks in EQ mode.
///
/// The outgoing deck is low-passed and the incoming deck high-passed at
/// `crossover_hz`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct EqCrossfade {
    pub crossover_hz: f32,
}

/// Logarithmic sweep from `start_hz` to `end_hz` by eased progress.
pub fn eq_crossover(start_hz: f32, end_hz: f32, e: f64) -> EqCrossfade {
    let start = start_hz.max(1.0) as f64;
    let end = end_hz.max(1.0) as f64;
    let hz = start * (end / start).powf(e.clamp(0.0, 1.0));
    EqCrossfade {
        crossover_hz: hz as f32,
    }
}
