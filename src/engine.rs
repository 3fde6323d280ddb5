//! Mixing engine facade
//!
//! Ties per-track analysis to the transition controller. The engine owns
//! the two deck slots and the single transition session; it holds no audio
//! buffers and no playback state of its own.

use crate::analysis::{CancelToken, TrackAnalysis, TrackAnalyzer};
use crate::audio::AudioSignal;
use crate::config::Config;
use crate::deck::{DeckId, Decks};
use crate::error::{Result, TransitionRejected};
use crate::transition::{
    plan_transition, Baseline, TransitionController, TransitionHandle, TransitionPhase,
    TransitionSample, TransitionState,
};

#[derive(Debug)]
pub struct MixEngine {
    analyzer: TrackAnalyzer,
    decks: Decks<Option<TrackAnalysis>>,
    controller: TransitionController,
}

impl Default for MixEngine {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

impl MixEngine {
    pub fn new(config: &Config) -> Self {
        Self {
            analyzer: TrackAnalyzer::new(&config.analysis),
            decks: Decks::default(),
            controller: TransitionController::new(config.transition.clone()),
        }
    }

    pub fn analyze_track(&self, signal: &AudioSignal<'_>) -> Result<TrackAnalysis> {
        self.analyzer.analyze(signal, &CancelToken::new())
    }

    pub fn analyze_track_with_cancel(
        &self,
        signal: &AudioSignal<'_>,
        cancel: &CancelToken,
    ) -> Result<TrackAnalysis> {
        self.analyzer.analyze(signal, cancel)
    }

    /// Analyze two tracks concurrently.
    pub fn analyze_pair(
        &self,
        a: &AudioSignal<'_>,
        b: &AudioSignal<'_>,
    ) -> (Result<TrackAnalysis>, Result<TrackAnalysis>) {
        rayon::join(|| self.analyze_track(a), || self.analyze_track(b))
    }

    /// Replace a deck's analysis, returning the previous one.
    pub fn load(&mut self, deck: DeckId, analysis: TrackAnalysis) -> Option<TrackAnalysis> {
        log::info!(
            "Deck {}: {:.1} BPM, {} beats, {:.1}s",
            deck,
            analysis.bpm(),
            analysis.beat_grid().len(),
            analysis.duration_sec()
        );
        self.decks[deck].replace(analysis)
    }

    pub fn unload(&mut self, deck: DeckId) -> Option<TrackAnalysis> {
        self.decks[deck].take()
    }

    pub fn analysis(&self, deck: DeckId) -> Option<&TrackAnalysis> {
        self.decks[deck].as_ref()
    }

    /// Schedule a transition from `from` to the other deck, `beats` beats
    /// long on the outgoing grid, starting on the next outgoing beat after
    /// `from_position_sec`. `now_sec` is the clock later passed to `tick`.
    pub fn start_transition(
        &mut self,
        from: DeckId,
        beats: u32,
        from_position_sec: f64,
        now_sec: f64,
    ) -> Result<TransitionHandle> {
        self.controller.ensure_idle()?;

        let to = from.other();
        let from_track = self.decks[from]
            .as_ref()
            .ok_or(TransitionRejected::MissingAnalysis(from))?;
        let to_track = self.decks[to]
            .as_ref()
            .ok_or(TransitionRejected::MissingAnalysis(to))?;

        let plan = plan_transition(
            (from, from_track),
            (to, to_track),
            beats,
            from_position_sec,
            now_sec,
            self.controller.config(),
        )?;
        self.controller.start(plan)
    }

    pub fn tick(&mut self, handle: TransitionHandle, now_sec: f64) -> Result<TransitionSample> {
        self.controller.tick(handle, now_sec)
    }

    pub fn cancel(
        &mut self,
        handle: TransitionHandle,
        baseline: Baseline,
        now_sec: f64,
    ) -> Result<TransitionSample> {
        self.controller.cancel(handle, baseline, now_sec)
    }

    pub fn phase(&self) -> TransitionPhase {
        self.controller.phase()
    }

    pub fn state(&self) -> Option<&TransitionState> {
        self.controller.state()
    }

    pub fn config_beats(&self) -> u32 {
        self.controller.config().beats
    }

    pub fn tick_interval_sec(&self) -> f64 {
        self.controller.config().tick_interval_ms as f64 / 1000.0
    }
}
