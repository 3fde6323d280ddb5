//! Beat-aligned crossfade and tempo ramp between two decks.

pub mod controller;
pub mod curves;

pub use controller::{
    plan_transition, Baseline, DeckControl, TransitionController, TransitionHandle,
    TransitionPhase, TransitionPlan, TransitionSample, TransitionState,
};
pub use curves::{EqCrossfade, Gain, RateLimiter};
