use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::beats::{BeatGrid, BeatTracker, GridSource};
use super::bpm::BpmEstimator;
use super::downbeat::DownbeatLocator;
use super::envelope::EnergyEnvelope;
use super::overview::waveform_overview;
use super::phrases::find_phrases;
use crate::audio::AudioSignal;
use crate::config::AnalysisConfig;
use crate::error::{AnalysisFailure, MixError, Result};

/// Shared flag for abandoning an analysis, e.g. when a deck is reloaded.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(MixError::Cancelled);
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum AnalysisOutcome {
    /// Grid built from detected beats
    Detected,
    /// Too few beats were detected; the grid is synthetic
    Degraded,
    Failed(AnalysisFailure),
}

/// Everything the transition stage needs to know about one track.
#[derive(Clone, Debug, Serialize)]
pub struct TrackAnalysis {
    bpm: f64,
    beat_grid: BeatGrid,
    downbeat: f64,
    duration_sec: f64,
    phrases: Vec<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    overview: Vec<f32>,
    outcome: AnalysisOutcome,
}

impl TrackAnalysis {
    /// Analysis from an externally supplied tempo and grid.
    pub fn from_grid(bpm: f64, beat_grid: BeatGrid, duration_sec: f64) -> Self {
        Self {
            bpm,
            downbeat: beat_grid.first().unwrap_or(0.0),
            beat_grid,
            duration_sec,
            phrases: Vec::new(),
            overview: Vec::new(),
            outcome: AnalysisOutcome::Detected,
        }
    }

    fn failed(reason: AnalysisFailure, duration_sec: f64, overview: Vec<f32>) -> Self {
        Self {
            bpm: 0.0,
            beat_grid: BeatGrid::default(),
            downbeat: 0.0,
            duration_sec,
            phrases: Vec::new(),
            overview,
            outcome: AnalysisOutcome::Failed(reason),
        }
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    pub fn beat_grid(&self) -> &BeatGrid {
        &self.beat_grid
    }

    pub fn downbeat(&self) -> f64 {
        self.downbeat
    }

    pub fn duration_sec(&self) -> f64 {
        self.duration_sec
    }

    pub fn phrases(&self) -> &[f64] {
        &self.phrases
    }

    pub fn overview(&self) -> &[f32] {
        &self.overview
    }

    pub fn outcome(&self) -> AnalysisOutcome {
        self.outcome
    }

    /// Beat markers as fractions of the track length.
    pub fn beat_positions(&self) -> Vec<f64> {
        self.beat_grid.normalized_positions(self.duration_sec)
    }

    /// A tempo and at least two beats are needed to time a transition.
    pub fn is_usable(&self) -> bool {
        !matches!(self.outcome, AnalysisOutcome::Failed(_))
            && self.bpm > 0.0
            && self.beat_grid.len() >= 2
    }
}

/// Runs the full per-track pipeline: envelope, tempo, beats, downbeat,
/// phrases and the waveform overview.
#[derive(Clone, Debug)]
pub struct TrackAnalyzer {
    estimator: BpmEstimator,
    tracker: BeatTracker,
    downbeat: DownbeatLocator,
    phrase_length: usize,
    overview_points: usize,
}

impl Default for TrackAnalyzer {
    fn default() -> Self {
        Self::new(&AnalysisConfig::default())
    }
}

impl TrackAnalyzer {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            estimator: BpmEstimator::new(config.min_bpm, config.max_bpm),
            tracker: BeatTracker::new(config.peak_threshold),
            downbeat: DownbeatLocator::new(config.downbeat_threshold, config.downbeat_beats),
            phrase_length: config.phrase_length,
            overview_points: config.overview_points,
        }
    }

    pub fn analyze(&self, signal: &AudioSignal<'_>, cancel: &CancelToken) -> Result<TrackAnalysis> {
        let duration = signal.duration_sec();

        log::info!("Stage 1: energy envelope ({:.1}s of audio)...", duration);
        let envelope = EnergyEnvelope::compute(signal);
        let overview = waveform_overview(signal.samples(), self.overview_points);
        cancel.check()?;

        if envelope.is_empty() {
            log::warn!("Analysis unavailable: signal shorter than one window");
            return Ok(TrackAnalysis::failed(AnalysisFailure::SignalTooShort, duration, overview));
        }
        if envelope.is_silent() {
            log::warn!("Analysis unavailable: signal is silent");
            return Ok(TrackAnalysis::failed(AnalysisFailure::Silent, duration, overview));
        }

        log::info!("Stage 2: tempo estimation ({} envelope frames)...", envelope.len());
        let bpm = self.estimator.estimate(&envelope);
        cancel.check()?;
        if !bpm.is_detected() {
            log::warn!("Analysis unavailable: no tempo peak");
            return Ok(TrackAnalysis::failed(AnalysisFailure::NoTempoPeak, duration, overview));
        }

        log::info!("Stage 3: beat grid at {:.1} BPM...", bpm.bpm);
        let detected = self.tracker.track(&envelope, bpm);
        let downbeat = self.downbeat.locate(signal, &detected);
        cancel.check()?;

        let (mut beat_grid, source) = BeatTracker::resolve(detected, bpm, duration);
        beat_grid.anchor(downbeat);
        beat_grid.truncate_at(duration);

        let phrases = find_phrases(signal, &beat_grid, self.phrase_length);
        cancel.check()?;

        let outcome = match source {
            GridSource::Detected => AnalysisOutcome::Detected,
            GridSource::Synthesized => AnalysisOutcome::Degraded,
        };

        log::info!(
            "Analysis: {:.1} BPM, {} beats, downbeat {:.3}s, {} phrases ({:?})",
            bpm.bpm,
            beat_grid.len(),
            downbeat,
            phrases.len(),
            outcome
        );

        Ok(TrackAnalysis {
            bpm: bpm.bpm,
            beat_grid,
            downbeat,
            duration_sec: duration,
            phrases,
            overview,
            outcome,
        })
    }
}
