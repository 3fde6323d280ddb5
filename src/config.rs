use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::MixError;

pub const CONFIG_FILE_NAME: &str = "deckmix.toml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub transition: TransitionConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    /// Minimum normalized envelope energy for a beat peak
    #[serde(default = "default_peak_threshold")]
    pub peak_threshold: f32,
    #[serde(default = "default_downbeat_threshold")]
    pub downbeat_threshold: f32,
    /// How many opening beats the downbeat search inspects
    #[serde(default = "default_downbeat_beats")]
    pub downbeat_beats: usize,
    #[serde(default = "default_min_bpm")]
    pub min_bpm: f64,
    #[serde(default = "default_max_bpm")]
    pub max_bpm: f64,
    #[serde(default = "default_phrase_length")]
    pub phrase_length: usize,
    #[serde(default = "default_overview_points")]
    pub overview_points: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransitionConfig {
    /// Transition length in beats of the outgoing track
    #[serde(default = "default_beats")]
    pub beats: u32,
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Largest playback-rate change applied in one tick
    #[serde(default = "default_max_rate_step")]
    pub max_rate_step: f64,
    #[serde(default = "default_min_rate")]
    pub min_rate: f64,
    #[serde(default = "default_max_rate")]
    pub max_rate: f64,
    #[serde(default)]
    pub mode: CrossfadeMode,
    #[serde(default = "default_eq_sweep_start_hz")]
    pub eq_sweep_start_hz: f32,
    #[serde(default = "default_eq_sweep_end_hz")]
    pub eq_sweep_end_hz: f32,
}

/// How the two decks are blended during a transition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CrossfadeMode {
    /// Gain crossfade only
    #[default]
    Volume,
    /// Gain crossfade plus a sweeping low/high split between the decks
    Eq,
}

impl FromStr for CrossfadeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "volume" => Ok(CrossfadeMode::Volume),
            "eq" => Ok(CrossfadeMode::Eq),
            other => Err(format!("unknown crossfade mode '{}' (expected volume or eq)", other)),
        }
    }
}

impl fmt::Display for CrossfadeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrossfadeMode::Volume => write!(f, "volume"),
            CrossfadeMode::Eq => write!(f, "eq"),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            peak_threshold: default_peak_threshold(),
            downbeat_threshold: default_downbeat_threshold(),
            downbeat_beats: default_downbeat_beats(),
            min_bpm: default_min_bpm(),
            max_bpm: default_max_bpm(),
            phrase_length: default_phrase_length(),
            overview_points: default_overview_points(),
        }
    }
}

impl TransitionConfig {
    /// Reject settings the rate limiter and tick loop cannot run with.
    pub fn validate(&self) -> crate::Result<()> {
        let invalid = |msg: String| Err(MixError::InvalidConfig(msg));
        if !self.max_rate_step.is_finite() || self.max_rate_step <= 0.0 {
            return invalid(format!("max_rate_step must be positive, got {}", self.max_rate_step));
        }
        if !self.min_rate.is_finite() || !self.max_rate.is_finite() || self.min_rate <= 0.0 {
            return invalid(format!(
                "rate range {}..{} must be finite and positive",
                self.min_rate, self.max_rate
            ));
        }
        if self.min_rate > self.max_rate {
            return invalid(format!(
                "min_rate {} is above max_rate {}",
                self.min_rate, self.max_rate
            ));
        }
        if self.tick_interval_ms == 0 {
            return invalid("tick_interval_ms must be greater than zero".to_string());
        }
        Ok(())
    }
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            beats: default_beats(),
            tick_interval_ms: default_tick_interval_ms(),
            max_rate_step: default_max_rate_step(),
            min_rate: default_min_rate(),
            max_rate: default_max_rate(),
            mode: CrossfadeMode::default(),
            eq_sweep_start_hz: default_eq_sweep_start_hz(),
            eq_sweep_end_hz: default_eq_sweep_end_hz(),
        }
    }
}

fn default_peak_threshold() -> f32 { 0.3 }
fn default_downbeat_threshold() -> f32 { 0.5 }
fn default_downbeat_beats() -> usize { 16 }
fn default_min_bpm() -> f64 { 60.0 }
fn default_max_bpm() -> f64 { 185.0 }
fn default_phrase_length() -> usize { 16 }
fn default_overview_points() -> usize { 1000 }
fn default_beats() -> u32 { 16 }
fn default_tick_interval_ms() -> u64 { 50 }
fn default_max_rate_step() -> f64 { 0.02 }
fn default_min_rate() -> f64 { 0.5 }
fn default_max_rate() -> f64 { 2.0 }
fn default_eq_sweep_start_hz() -> f32 { 16_000.0 }
fn default_eq_sweep_end_hz() -> f32 { 40.0 }

pub fn load_config(path: &Path) -> Option<Config> {
    let content = std::fs::read_to_string(path).ok()?;
    let config: Config = match toml::from_str(&content) {
        Ok(config) => config,
        Err(err) => {
            log::warn!("Invalid config {}: {}", path.display(), err);
            return None;
        }
    };
    if let Err(err) = config.transition.validate() {
        log::warn!("Invalid config {}: {}", path.display(), err);
        return None;
    }
    Some(config)
}

/// Explicit path, else `./deckmix.toml`, `~/.config/deckmix/config.toml`,
/// then the platform config directory.
pub fn find_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = dirs::home_dir() {
        let xdg = home.join(".config").join("deckmix").join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join("deckmix").join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}
