//! Error types for the mixing engine
//!
//! Analysis problems are reported inside the returned `TrackAnalysis`
//! (see `AnalysisFailure`), so a bad track never aborts the caller.
//! Transition problems are returned synchronously from the call that
//! violates the state machine.

use thiserror::Error;

use crate::deck::DeckId;

/// Why a track could not be analyzed. Carried in the analysis outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisFailure {
    #[error("signal is shorter than one analysis window")]
    SignalTooShort,

    #[error("signal is silent")]
    Silent,

    #[error("no tempo peak found in the search range")]
    NoTempoPeak,
}

/// A transition request that the controller refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransitionRejected {
    #[error("a transition is already in progress")]
    AlreadyRunning,

    #[error("deck {0} has no usable analysis")]
    MissingAnalysis(DeckId),

    #[error("transition length must be at least one beat")]
    InvalidBeatCount,

    #[error("no beat left on the outgoing track after the current position")]
    NoBeatsAhead,

    #[error("no transition is in progress")]
    NotActive,
}

#[derive(Debug, Error)]
pub enum MixError {
    #[error("sample rate must be greater than zero")]
    InvalidSampleRate,

    #[error("analysis was cancelled")]
    Cancelled,

    #[error("transition rejected: {0}")]
    Rejected(#[from] TransitionRejected),

    #[error(
        "cannot match {to_bpm:.1} BPM to {from_bpm:.1} BPM \
         within the {min_rate}..{max_rate} playback rate range"
    )]
    OutOfRangeTempo {
        from_bpm: f64,
        to_bpm: f64,
        min_rate: f64,
        max_rate: f64,
    },

    #[error("transition handle does not refer to the current transition")]
    StaleHandle,

    #[error("time must be finite, got {0}")]
    InvalidTime(f64),

    #[error("invalid transition config: {0}")]
    InvalidConfig(String),
}

impl MixError {
    /// Returns true for errors raised by the transition state machine
    pub fn is_rejection(&self) -> bool {
        matches!(self, MixError::Rejected(_) | MixError::OutOfRangeTempo { .. })
    }
}

pub type Result<T> = std::result::Result<T, MixError>;
