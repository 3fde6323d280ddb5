//! deckmix - beat-synchronized mixing engine
//!
//! Estimates tempo and beat grids for two tracks and drives a beat-aligned
//! transition between them. The engine only produces control signals
//! (gain, playback rate, master tempo); applying them to real audio is the
//! caller's job.
//!
//! - `analysis`: energy envelope, BPM estimation, beat grid, downbeat, phrases
//! - `transition`: gain/tempo curves and the transition state machine
//! - `engine`: facade over two decks and one transition session
//! - `audio`: borrowed PCM view, plus file decoding for callers that need it
//! - `config`: TOML settings
//!
//! ```no_run
//! use deckmix::{AudioSignal, DeckId, MixEngine};
//!
//! # fn main() -> deckmix::Result<()> {
//! # let (pcm_a, pcm_b): (Vec<f32>, Vec<f32>) = (Vec::new(), Vec::new());
//! let mut engine = MixEngine::default();
//! let a = AudioSignal::new(&pcm_a, 44100)?;
//! let b = AudioSignal::new(&pcm_b, 44100)?;
//! let (track_a, track_b) = engine.analyze_pair(&a, &b);
//! engine.load(DeckId::A, track_a?);
//! engine.load(DeckId::B, track_b?);
//!
//! let handle = engine.start_transition(DeckId::A, 16, 42.0, 0.0)?;
//! let sample = engine.tick(handle, 0.05)?;
//! println!("{:?}", sample);
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod audio;
pub mod config;
pub mod deck;
pub mod engine;
pub mod error;
pub mod transition;

pub use analysis::{AnalysisOutcome, BeatGrid, CancelToken, TrackAnalysis};
pub use audio::AudioSignal;
pub use config::{Config, CrossfadeMode};
pub use deck::DeckId;
pub use engine::MixEngine;
pub use error::{AnalysisFailure, MixError, Result, TransitionRejected};
pub use transition::{Baseline, Gain, TransitionHandle, TransitionPhase, TransitionSample};
