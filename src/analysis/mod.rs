//! Per-track tempo and beat analysis.

pub mod beats;
pub mod bpm;
pub mod downbeat;
pub mod envelope;
pub mod overview;
pub mod phrases;
pub mod track;

pub use beats::{BeatGrid, BeatTracker, GridSource};
pub use bpm::{BpmEstimate, BpmEstimator};
pub use downbeat::DownbeatLocator;
pub use envelope::EnergyEnvelope;
pub use track::{AnalysisOutcome, CancelToken, TrackAnalysis, TrackAnalyzer};
