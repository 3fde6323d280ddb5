//! Integration tests for the deckmix engine
//!
//! These run the full path from PCM (or a WAV file) through analysis into a
//! ticked transition.

use deckmix::audio::decode_audio;
use deckmix::config::{self, Config};
use deckmix::{
    AnalysisFailure, AnalysisOutcome, AudioSignal, Baseline, BeatGrid, CrossfadeMode, DeckId,
    MixEngine, MixError, TrackAnalysis, TransitionPhase, TransitionRejected, TransitionSample,
};
use std::path::Path;
use tempfile::TempDir;

/// Decaying 1 kHz bursts at the given tempo, first click at 0s.
fn click_samples(bpm: f64, duration_secs: f64, sample_rate: u32) -> Vec<f32> {
    let sr = sample_rate as f64;
    let total = (duration_secs * sr) as usize;
    let period = 60.0 / bpm * sr;
    let burst = (0.02 * sr) as usize;
    let mut samples = vec![0.0f32; total];

    let mut beat = 0usize;
    loop {
        let start = (beat as f64 * period).round() as usize;
        if start >= total {
            break;
        }
        for j in 0..burst.min(total - start) {
            let decay = (-5.0 * j as f64 / burst as f64).exp();
            let tone = (2.0 * std::f64::consts::PI * 1000.0 * j as f64 / sr).sin();
            samples[start + j] = (0.8 * decay * tone) as f32;
        }
        beat += 1;
    }
    samples
}

/// Write mono 16-bit PCM to a WAV file.
fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).expect("Failed to create WAV file");
    for &s in samples {
        writer
            .write_sample((s * 32767.0) as i16)
            .expect("Failed to write sample");
    }
    writer.finalize().expect("Failed to finalize WAV");
}

fn analyze(engine: &MixEngine, samples: &[f32], sample_rate: u32) -> TrackAnalysis {
    let signal = AudioSignal::new(samples, sample_rate).unwrap();
    engine.analyze_track(&signal).unwrap()
}

/// Tick every `step` seconds from `now = 0` until the transition completes.
fn run_to_completion(
    engine: &mut MixEngine,
    from: DeckId,
    beats: u32,
    position: f64,
    step: f64,
) -> Vec<TransitionSample> {
    let handle = engine.start_transition(from, beats, position, 0.0).unwrap();
    let mut samples = Vec::new();
    for tick in 0..100_000u32 {
        let sample = engine.tick(handle, tick as f64 * step).unwrap();
        samples.push(sample);
        if sample.phase == TransitionPhase::Complete {
            return samples;
        }
    }
    panic!("transition never completed");
}

#[test]
fn test_silent_track_has_no_tempo() {
    let engine = MixEngine::default();
    let analysis = analyze(&engine, &vec![0.0f32; 44100 * 5], 44100);

    assert_eq!(analysis.bpm(), 0.0);
    assert!(analysis.beat_grid().is_empty());
    assert_eq!(analysis.outcome(), AnalysisOutcome::Failed(AnalysisFailure::Silent));
}

#[test]
fn test_click_track_bpm_within_one() {
    let engine = MixEngine::default();
    let analysis = analyze(&engine, &click_samples(128.0, 30.0, 44100), 44100);

    assert!(
        (analysis.bpm() - 128.0).abs() <= 1.0,
        "BPM {} should be within 1 of 128",
        analysis.bpm()
    );
    let times = analysis.beat_grid().times();
    assert!(times.windows(2).all(|w| w[0] < w[1]), "beat grid must be increasing");
    assert!(times.iter().all(|&t| t >= 0.0 && t < analysis.duration_sec()));
}

#[test]
fn test_analyze_pair_matches_single_analysis() {
    let engine = MixEngine::default();
    let a = click_samples(120.0, 20.0, 44100);
    let b = click_samples(126.0, 20.0, 44100);
    let signal_a = AudioSignal::new(&a, 44100).unwrap();
    let signal_b = AudioSignal::new(&b, 44100).unwrap();

    let (pair_a, pair_b) = engine.analyze_pair(&signal_a, &signal_b);
    let (pair_a, pair_b) = (pair_a.unwrap(), pair_b.unwrap());

    assert_eq!(pair_a.bpm(), engine.analyze_track(&signal_a).unwrap().bpm());
    assert_eq!(pair_b.bpm(), engine.analyze_track(&signal_b).unwrap().bpm());
}

#[test]
fn test_end_to_end_transition() {
    let mut engine = MixEngine::default();
    let track_a = analyze(&engine, &click_samples(120.0, 30.0, 44100), 44100);
    let track_b = analyze(&engine, &click_samples(128.0, 30.0, 44100), 44100);
    let target_bpm = track_b.bpm();
    engine.load(DeckId::A, track_a);
    engine.load(DeckId::B, track_b);

    let samples = run_to_completion(&mut engine, DeckId::A, 16, 5.0, 0.05);
    assert_eq!(samples[0].phase, TransitionPhase::Scheduled);
    assert!(samples.iter().any(|s| s.phase == TransitionPhase::Running));

    for w in samples.windows(2) {
        assert!(
            w[1].gain_out.linear() <= w[0].gain_out.linear() + 1e-6,
            "outgoing gain rose at {:.2}s",
            w[1].time_sec
        );
        assert!(
            w[1].gain_in.linear() + 1e-6 >= w[0].gain_in.linear(),
            "incoming gain fell at {:.2}s",
            w[1].time_sec
        );
    }

    for s in &samples {
        assert!((0.5..=2.0).contains(&s.rate_out));
        assert!((0.5..=2.0).contains(&s.rate_in));
    }

    // Completion snaps rates to 1.0; every earlier step is rate limited
    let ramp: Vec<_> = samples
        .iter()
        .filter(|s| s.phase != TransitionPhase::Complete)
        .collect();
    for w in ramp.windows(2) {
        assert!((w[1].rate_out - w[0].rate_out).abs() <= 0.02 + 1e-9);
        assert!((w[1].rate_in - w[0].rate_in).abs() <= 0.02 + 1e-9);
    }

    let last = samples.last().unwrap();
    assert!(last.gain_out.is_silent());
    assert_eq!(last.gain_in.db(), 0.0);
    assert_eq!(last.rate_out, 1.0);
    assert_eq!(last.rate_in, 1.0);
    assert_eq!(last.master_bpm, target_bpm);
    assert_eq!(engine.phase(), TransitionPhase::Complete);

    // A finished session makes room for the next mix
    assert!(engine.start_transition(DeckId::B, 8, 10.0, 20.0).is_ok());
}

#[test]
fn test_doubling_beats_doubles_duration() {
    let mut engine = MixEngine::default();
    engine.load(
        DeckId::A,
        TrackAnalysis::from_grid(120.0, BeatGrid::synthesize(120.0, 0.0, 120.0), 120.0),
    );
    engine.load(
        DeckId::B,
        TrackAnalysis::from_grid(124.0, BeatGrid::synthesize(124.0, 0.0, 120.0), 120.0),
    );

    let handle = engine.start_transition(DeckId::A, 8, 20.0, 0.0).unwrap();
    let short = engine.state().unwrap().duration_sec;
    engine.cancel(handle, Baseline::default(), 0.0).unwrap();

    engine.start_transition(DeckId::A, 16, 20.0, 0.0).unwrap();
    let long = engine.state().unwrap().duration_sec;

    assert!((short - 4.0).abs() < 1e-9);
    assert!((long - 2.0 * short).abs() < 1e-9);
}

#[test]
fn test_start_rejected_while_running() {
    let mut engine = MixEngine::default();
    engine.load(
        DeckId::A,
        TrackAnalysis::from_grid(120.0, BeatGrid::synthesize(120.0, 0.0, 60.0), 60.0),
    );
    engine.load(
        DeckId::B,
        TrackAnalysis::from_grid(122.0, BeatGrid::synthesize(122.0, 0.0, 60.0), 60.0),
    );

    let handle = engine.start_transition(DeckId::A, 16, 0.0, 0.0).unwrap();
    let sample = engine.tick(handle, 1.0).unwrap();
    assert_eq!(sample.phase, TransitionPhase::Running);

    let err = engine.start_transition(DeckId::A, 8, 2.0, 1.0).unwrap_err();
    assert!(matches!(err, MixError::Rejected(TransitionRejected::AlreadyRunning)));
    assert!(err.is_rejection());

    // Running session is untouched
    let next = engine.tick(handle, 1.05).unwrap();
    assert_eq!(next.phase, TransitionPhase::Running);
    assert_eq!(engine.state().unwrap().beats, 16);
}

#[test]
fn test_cancel_restores_baseline() {
    let mut engine = MixEngine::default();
    engine.load(
        DeckId::A,
        TrackAnalysis::from_grid(120.0, BeatGrid::synthesize(120.0, 0.0, 60.0), 60.0),
    );
    engine.load(
        DeckId::B,
        TrackAnalysis::from_grid(130.0, BeatGrid::synthesize(130.0, 0.0, 60.0), 60.0),
    );

    let handle = engine.start_transition(DeckId::A, 16, 0.0, 0.0).unwrap();
    engine.tick(handle, 3.0).unwrap();
    let restored = engine.cancel(handle, Baseline::default(), 3.05).unwrap();

    assert_eq!(restored.phase, TransitionPhase::Idle);
    assert_eq!(restored.gain_out.db(), 0.0);
    assert!(restored.gain_in.is_silent());
    assert_eq!(restored.rate_out, 1.0);
    assert_eq!(engine.phase(), TransitionPhase::Idle);
    assert!(matches!(engine.tick(handle, 3.1), Err(MixError::StaleHandle)));
}

#[test]
fn test_eq_mode_sweeps_crossover() {
    let mut cfg = Config::default();
    cfg.transition.mode = CrossfadeMode::Eq;
    let mut engine = MixEngine::new(&cfg);
    engine.load(
        DeckId::A,
        TrackAnalysis::from_grid(120.0, BeatGrid::synthesize(120.0, 0.0, 60.0), 60.0),
    );
    engine.load(
        DeckId::B,
        TrackAnalysis::from_grid(120.0, BeatGrid::synthesize(120.0, 0.0, 60.0), 60.0),
    );

    let samples = run_to_completion(&mut engine, DeckId::A, 8, 0.0, 0.1);
    let sweep: Vec<f32> = samples
        .iter()
        .filter_map(|s| s.eq.map(|eq| eq.crossover_hz))
        .collect();
    assert!(sweep.len() > 10);
    assert!(sweep.windows(2).all(|w| w[1] <= w[0] + 1e-3));
    assert!(samples.last().unwrap().eq.is_none());
}

#[test]
fn test_wav_file_decode_and_analyze() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let wav_path = temp_dir.path().join("click_124.wav");
    write_wav(&wav_path, &click_samples(124.0, 20.0, 44100), 44100);

    let audio = decode_audio(&wav_path).expect("Failed to decode WAV");
    assert_eq!(audio.sample_rate, 44100);
    assert!((audio.duration_sec() - 20.0).abs() < 0.01);

    let engine = MixEngine::default();
    let analysis = engine.analyze_track(&audio.signal().unwrap()).unwrap();
    assert!(
        (analysis.bpm() - 124.0).abs() <= 1.0,
        "BPM {} should be within 1 of 124",
        analysis.bpm()
    );
    assert!(analysis.is_usable());
}

#[test]
fn test_decode_missing_file_fails() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    assert!(decode_audio(&temp_dir.path().join("missing.wav")).is_err());
}

#[test]
fn test_config_file_overrides_defaults() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join(config::CONFIG_FILE_NAME);
    std::fs::write(
        &path,
        "[transition]\nbeats = 32\nmode = \"eq\"\n\n[analysis]\nmin_bpm = 80.0\n",
    )
    .unwrap();

    let found = config::find_config_path(Some(&path)).unwrap();
    let cfg = config::load_config(&found).expect("config should parse");
    assert_eq!(cfg.transition.beats, 32);
    assert_eq!(cfg.transition.mode, CrossfadeMode::Eq);
    assert_eq!(cfg.transition.tick_interval_ms, 50);
    assert_eq!(cfg.analysis.min_bpm, 80.0);
    assert_eq!(cfg.analysis.max_bpm, 185.0);

    let engine = MixEngine::new(&cfg);
    assert_eq!(engine.config_beats(), 32);
}

#[test]
fn test_negative_rate_step_fails_at_start() {
    let cfg: Config = toml::from_str("[transition]\nmax_rate_step = -0.02\n").unwrap();
    let mut engine = MixEngine::new(&cfg);
    engine.load(
        DeckId::A,
        TrackAnalysis::from_grid(120.0, BeatGrid::synthesize(120.0, 0.0, 60.0), 60.0),
    );
    engine.load(
        DeckId::B,
        TrackAnalysis::from_grid(124.0, BeatGrid::synthesize(124.0, 0.0, 60.0), 60.0),
    );

    let err = engine.start_transition(DeckId::A, 8, 1.0, 0.0).unwrap_err();
    assert!(matches!(err, MixError::InvalidConfig(_)));
    assert_eq!(engine.phase(), TransitionPhase::Idle);
}

#[test]
fn test_invalid_config_file_is_ignored() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("bad.toml");
    std::fs::write(&path, "transition = [[[").unwrap();
    assert!(config::load_config(&path).is_none());
}
