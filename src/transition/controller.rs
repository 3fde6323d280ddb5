//! Transition state machine
//!
//! `Idle -> Scheduled -> Running -> Complete`. The controller never keeps
//! time itself: every call to `tick` carries the caller's clock, and the
//! returned sample is a function of the stored state and that time only.
//! Only one transition can be active at once.

use serde::Serialize;

use super::curves::{
    crossfade_gains, ease, eq_crossover, master_bpm, rate_targets, EqCrossfade, Gain, RateLimiter,
};
use crate::analysis::TrackAnalysis;
use crate::config::{CrossfadeMode, TransitionConfig};
use crate::deck::DeckId;
use crate::error::{MixError, Result, TransitionRejected};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionPhase {
    Idle,
    Scheduled,
    Running,
    Complete,
}

/// Identifies one started transition. Handles from earlier transitions are stale.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TransitionHandle {
    id: u64,
}

/// Beat-aligned window chosen for a transition, before it is started.
#[derive(Clone, Debug, PartialEq)]
pub struct TransitionPlan {
    pub from: DeckId,
    pub to: DeckId,
    /// Grid index of the outgoing beat the transition starts on
    pub start_beat: usize,
    /// Beat count after clamping to the end of the outgoing grid
    pub beats: u32,
    pub start_time_sec: f64,
    pub duration_sec: f64,
    pub initial_bpm: f64,
    pub target_bpm: f64,
}

/// Choose the transition window on the outgoing track's grid.
///
/// The window starts on the first outgoing beat strictly after
/// `from_position_sec` and spans `beats` beats, fewer near the end of the
/// grid. `now_sec` is the scheduling clock at the moment of the call; the
/// outgoing deck is assumed to play at rate 1 until the window opens.
pub fn plan_transition(
    from: (DeckId, &TrackAnalysis),
    to: (DeckId, &TrackAnalysis),
    beats: u32,
    from_position_sec: f64,
    now_sec: f64,
    config: &TransitionConfig,
) -> Result<TransitionPlan> {
    let (from_deck, from_track) = from;
    let (to_deck, to_track) = to;

    config.validate()?;
    for time in [from_position_sec, now_sec] {
        if !time.is_finite() {
            return Err(MixError::InvalidTime(time));
        }
    }
    if beats == 0 {
        return Err(TransitionRejected::InvalidBeatCount.into());
    }
    if !from_track.is_usable() {
        return Err(TransitionRejected::MissingAnalysis(from_deck).into());
    }
    if !to_track.is_usable() {
        return Err(TransitionRejected::MissingAnalysis(to_deck).into());
    }

    let initial_bpm = from_track.bpm();
    let target_bpm = to_track.bpm();
    let limiter = RateLimiter {
        max_step: config.max_rate_step,
        min_rate: config.min_rate,
        max_rate: config.max_rate,
    };
    if !limiter.allows(target_bpm / initial_bpm) || !limiter.allows(initial_bpm / target_bpm) {
        return Err(MixError::OutOfRangeTempo {
            from_bpm: initial_bpm,
            to_bpm: target_bpm,
            min_rate: config.min_rate,
            max_rate: config.max_rate,
        });
    }

    let grid = from_track.beat_grid();
    let start_beat = grid
        .next_index_after(from_position_sec)
        .ok_or(TransitionRejected::NoBeatsAhead)?;
    let available = grid.len() - 1 - start_beat;
    if available == 0 {
        return Err(TransitionRejected::NoBeatsAhead.into());
    }
    let span = (beats as usize).min(available);
    if span < beats as usize {
        log::info!(
            "Shortening transition from {} to {} beats near the end of deck {}",
            beats,
            span,
            from_deck
        );
    }

    let start = grid.times()[start_beat];
    let end = grid.times()[start_beat + span];

    Ok(TransitionPlan {
        from: from_deck,
        to: to_deck,
        start_beat,
        beats: span as u32,
        start_time_sec: now_sec + (start - from_position_sec),
        duration_sec: end - start,
        initial_bpm,
        target_bpm,
    })
}

/// The one mixing session the controller owns.
#[derive(Clone, Debug, Serialize)]
pub struct TransitionState {
    pub from: DeckId,
    pub to: DeckId,
    pub start_time_sec: f64,
    pub duration_sec: f64,
    pub initial_bpm: f64,
    pub target_bpm: f64,
    pub beats: u32,
    pub phase: TransitionPhase,
    rate_out: f64,
    rate_in: f64,
}

/// Gain and rate the playback layer restores when a transition is cancelled.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DeckControl {
    pub gain: Gain,
    pub rate: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Baseline {
    pub outgoing: DeckControl,
    pub incoming: DeckControl,
}

impl Default for Baseline {
    /// Outgoing deck untouched, incoming deck muted.
    fn default() -> Self {
        Self {
            outgoing: DeckControl {
                gain: Gain::UNITY,
                rate: 1.0,
            },
            incoming: DeckControl {
                gain: Gain::SILENCE,
                rate: 1.0,
            },
        }
    }
}

/// Control values for both decks at one instant.
///
/// When `phase` is `Complete` the playback layer stops the outgoing deck.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct TransitionSample {
    pub time_sec: f64,
    pub from: DeckId,
    pub to: DeckId,
    pub gain_out: Gain,
    pub gain_in: Gain,
    pub rate_out: f64,
    pub rate_in: f64,
    pub master_bpm: f64,
    pub progress: f64,
    pub phase: TransitionPhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eq: Option<EqCrossfade>,
}

#[derive(Debug)]
pub struct TransitionController {
    config: TransitionConfig,
    limiter: RateLimiter,
    state: Option<TransitionState>,
    current: Option<TransitionHandle>,
    next_id: u64,
}

impl Default for TransitionController {
    fn default() -> Self {
        Self::new(TransitionConfig::default())
    }
}

impl TransitionController {
    pub fn new(config: TransitionConfig) -> Self {
        let limiter = RateLimiter {
            max_step: config.max_rate_step,
            min_rate: config.min_rate,
            max_rate: config.max_rate,
        };
        Self {
            config,
            limiter,
            state: None,
            current: None,
            next_id: 0,
        }
    }

    pub fn config(&self) -> &TransitionConfig {
        &self.config
    }

    pub fn phase(&self) -> TransitionPhase {
        self.state
            .as_ref()
            .map_or(TransitionPhase::Idle, |s| s.phase)
    }

    pub fn state(&self) -> Option<&TransitionState> {
        self.state.as_ref()
    }

    /// Scheduled or running.
    pub fn is_active(&self) -> bool {
        matches!(
            self.phase(),
            TransitionPhase::Scheduled | TransitionPhase::Running
        )
    }

    pub fn ensure_idle(&self) -> Result<()> {
        if self.is_active() {
            return Err(TransitionRejected::AlreadyRunning.into());
        }
        Ok(())
    }

    pub fn start(&mut self, plan: TransitionPlan) -> Result<TransitionHandle> {
        self.ensure_idle()?;
        self.config.validate()?;

        log::info!(
            "Transition {} -> {}: {} beats, {:.2}s starting at {:.3}s, {:.1} -> {:.1} BPM",
            plan.from,
            plan.to,
            plan.beats,
            plan.duration_sec,
            plan.start_time_sec,
            plan.initial_bpm,
            plan.target_bpm
        );

        self.state = Some(TransitionState {
            from: plan.from,
            to: plan.to,
            start_time_sec: plan.start_time_sec,
            duration_sec: plan.duration_sec,
            initial_bpm: plan.initial_bpm,
            target_bpm: plan.target_bpm,
            beats: plan.beats,
            phase: TransitionPhase::Scheduled,
            rate_out: 1.0,
            // The incoming deck is still silent, so it can start at the matched tempo
            rate_in: (plan.initial_bpm / plan.target_bpm)
                .clamp(self.config.min_rate, self.config.max_rate),
        });

        self.next_id += 1;
        let handle = TransitionHandle { id: self.next_id };
        self.current = Some(handle);
        Ok(handle)
    }

    /// Advance the transition to `now_sec` and report the control values.
    pub fn tick(&mut self, handle: TransitionHandle, now_sec: f64) -> Result<TransitionSample> {
        if self.current != Some(handle) {
            return Err(MixError::StaleHandle);
        }
        if !now_sec.is_finite() {
            return Err(MixError::InvalidTime(now_sec));
        }
        let config = &self.config;
        let limiter = self.limiter;
        let state = self.state.as_mut().ok_or(MixError::StaleHandle)?;

        if state.phase == TransitionPhase::Complete {
            return Ok(completion_sample(state, now_sec));
        }

        let elapsed = now_sec - state.start_time_sec;
        let progress = if elapsed < 0.0 {
            0.0
        } else if state.duration_sec > 0.0 {
            (elapsed / state.duration_sec).min(1.0)
        } else {
            1.0
        };

        if progress >= 1.0 {
            state.phase = TransitionPhase::Complete;
            state.rate_out = 1.0;
            state.rate_in = 1.0;
            log::info!("Transition {} -> {} complete", state.from, state.to);
            return Ok(completion_sample(state, now_sec));
        }

        if elapsed >= 0.0 && state.phase == TransitionPhase::Scheduled {
            log::debug!("Transition running at {:.3}s", now_sec);
            state.phase = TransitionPhase::Running;
        }

        let e = ease(progress);
        let (target_out, target_in) = rate_targets(state.initial_bpm, state.target_bpm, e);
        state.rate_out = limiter.step(state.rate_out, target_out);
        state.rate_in = limiter.step(state.rate_in, target_in);

        let (gain_out, gain_in) = crossfade_gains(progress);
        let eq = (config.mode == CrossfadeMode::Eq)
            .then(|| eq_crossover(config.eq_sweep_start_hz, config.eq_sweep_end_hz, e));

        Ok(TransitionSample {
            time_sec: now_sec,
            from: state.from,
            to: state.to,
            gain_out: Gain::from_linear(gain_out),
            gain_in: Gain::from_linear(gain_in),
            rate_out: state.rate_out,
            rate_in: state.rate_in,
            master_bpm: master_bpm(state.initial_bpm, state.target_bpm, e),
            progress,
            phase: state.phase,
            eq,
        })
    }

    /// Abandon a scheduled or running transition and hand back the caller's baseline.
    pub fn cancel(
        &mut self,
        handle: TransitionHandle,
        baseline: Baseline,
        now_sec: f64,
    ) -> Result<TransitionSample> {
        if self.current != Some(handle) {
            return Err(MixError::StaleHandle);
        }
        if !self.is_active() {
            return Err(TransitionRejected::NotActive.into());
        }
        let state = self.state.take().ok_or(MixError::StaleHandle)?;
        self.current = None;

        log::info!(
            "Transition {} -> {} cancelled in phase {:?}",
            state.from,
            state.to,
            state.phase
        );

        Ok(TransitionSample {
            time_sec: now_sec,
            from: state.from,
            to: state.to,
            gain_out: baseline.outgoing.gain,
            gain_in: baseline.incoming.gain,
            rate_out: baseline.outgoing.rate.clamp(self.config.min_rate, self.config.max_rate),
            rate_in: baseline.incoming.rate.clamp(self.config.min_rate, self.config.max_rate),
            master_bpm: state.initial_bpm,
            progress: 0.0,
            phase: TransitionPhase::Idle,
            eq: None,
        })
    }
}

fn completion_sample(state: &TransitionState, now_sec: f64) -> TransitionSample {
    TransitionSample {
        time_sec: now_sec,
        from: state.from,
        to: state.to,
        gain_out: Gain::SILENCE,
        gain_in: Gain::UNITY,
        rate_out: 1.0,
        rate_in: 1.0,
        master_bpm: state.target_bpm,
        progress: 1.0,
        phase: TransitionPhase::Complete,
        eq: None,
    }
}
