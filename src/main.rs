mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::path::{Path, PathBuf};

use cli::{Cli, Command};
use deckmix::audio::decode_audio;
use deckmix::config::{self, Config};
use deckmix::{CrossfadeMode, DeckId, MixEngine, TrackAnalysis, TransitionPhase};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_millis()
        .init();

    let mut cfg = load_settings(cli.config.as_deref());

    match cli.command {
        Command::Analyze { inputs, json } => run_analyze(&cfg, &inputs, json),
        Command::Mix {
            from,
            to,
            beats,
            position,
            tick_ms,
            mode,
            output,
        } => {
            // Config values apply only when the CLI is at its default
            if beats != 16 {
                cfg.transition.beats = beats;
            }
            if tick_ms != 50 {
                cfg.transition.tick_interval_ms = tick_ms;
            }
            if mode != CrossfadeMode::Volume {
                cfg.transition.mode = mode;
            }
            run_mix(&cfg, &from, &to, position, output.as_deref())
        }
    }
}

fn load_settings(explicit: Option<&Path>) -> Config {
    let Some(path) = config::find_config_path(explicit) else {
        return Config::default();
    };
    match config::load_config(&path) {
        Some(cfg) => {
            log::info!("Loaded config from {}", path.display());
            cfg
        }
        None => {
            log::warn!("Failed to load config from {}", path.display());
            Config::default()
        }
    }
}

fn analyze_file(engine: &MixEngine, path: &Path) -> Result<TrackAnalysis> {
    let audio = decode_audio(path)?;
    let signal = audio.signal()?;
    engine
        .analyze_track(&signal)
        .with_context(|| format!("Failed to analyze {}", path.display()))
}

fn run_analyze(cfg: &Config, inputs: &[PathBuf], json: bool) -> Result<()> {
    let engine = MixEngine::new(cfg);

    log::info!("Analyzing {} file(s)...", inputs.len());
    let results: Vec<(&PathBuf, Result<TrackAnalysis>)> = inputs
        .par_iter()
        .map(|path| (path, analyze_file(&engine, path)))
        .collect();

    let mut failed = 0;
    if json {
        let entries: Vec<serde_json::Value> = results
            .iter()
            .map(|(path, result)| match result {
                Ok(analysis) => serde_json::json!({
                    "file": path.display().to_string(),
                    "analysis": analysis,
                }),
                Err(err) => serde_json::json!({
                    "file": path.display().to_string(),
                    "error": format!("{:#}", err),
                }),
            })
            .collect();
        failed = results.iter().filter(|(_, r)| r.is_err()).count();
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        for (path, result) in &results {
            match result {
                Ok(analysis) => println!(
                    "{}: {:.1} BPM, {} beats, downbeat {:.3}s, {} phrases, {:.1}s ({:?})",
                    path.display(),
                    analysis.bpm(),
                    analysis.beat_grid().len(),
                    analysis.downbeat(),
                    analysis.phrases().len(),
                    analysis.duration_sec(),
                    analysis.outcome()
                ),
                Err(err) => {
                    failed += 1;
                    log::error!("{}: {:#}", path.display(), err);
                }
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} file(s) failed", failed, inputs.len());
    }
    Ok(())
}

fn run_mix(
    cfg: &Config,
    from: &Path,
    to: &Path,
    position: f64,
    output: Option<&Path>,
) -> Result<()> {
    cfg.transition.validate()?;

    log::info!("Decoding tracks...");
    let (audio_from, audio_to) = rayon::join(|| decode_audio(from), || decode_audio(to));
    let (audio_from, audio_to) = (audio_from?, audio_to?);

    log::info!("Analyzing tracks...");
    let mut engine = MixEngine::new(cfg);
    let (track_from, track_to) = engine.analyze_pair(&audio_from.signal()?, &audio_to.signal()?);
    engine.load(
        DeckId::A,
        track_from.with_context(|| format!("Failed to analyze {}", from.display()))?,
    );
    engine.load(
        DeckId::B,
        track_to.with_context(|| format!("Failed to analyze {}", to.display()))?,
    );

    let handle = engine
        .start_transition(DeckId::A, cfg.transition.beats, position, 0.0)
        .context("Cannot start transition")?;
    let state = engine
        .state()
        .context("Transition was not scheduled")?;
    let end_time = state.start_time_sec + state.duration_sec;
    log::info!(
        "Mixing {} -> {} over {} beats ({:.2}s, mode {})",
        from.display(),
        to.display(),
        state.beats,
        state.duration_sec,
        cfg.transition.mode
    );

    let step = engine.tick_interval_sec();
    let total_ticks = (end_time / step).ceil() as u64 + 1;
    let pb = ProgressBar::new(total_ticks);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} ticks ({msg})")?
            .progress_chars("=>-"),
    );

    let mut samples = Vec::with_capacity(total_ticks as usize);
    let mut tick = 0u64;
    loop {
        let now = tick as f64 * step;
        let sample = engine.tick(handle, now)?;
        samples.push(sample);
        pb.set_position((tick + 1).min(total_ticks));
        pb.set_message(format!("{:?}, {:.1} BPM", sample.phase, sample.master_bpm));
        if sample.phase == TransitionPhase::Complete {
            break;
        }
        tick += 1;
    }
    pb.finish_with_message("Transition complete");

    let json = serde_json::to_string_pretty(&samples)?;
    match output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write samples to {}", path.display()))?;
            log::info!("Wrote {} samples to {}", samples.len(), path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}
