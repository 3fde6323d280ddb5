use super::beats::BeatGrid;
use crate::audio::AudioSignal;

/// A phrase counts as a new section when it is this much louder than the previous one.
const PHRASE_CONTRAST: f32 = 1.2;

/// Start times of phrases (`phrase_length`-beat spans) that open with a
/// clear energy lift over the phrase before. The first phrase always counts.
pub fn find_phrases(signal: &AudioSignal<'_>, beats: &BeatGrid, phrase_length: usize) -> Vec<f64> {
    if phrase_length == 0 || beats.len() < phrase_length {
        return Vec::new();
    }

    let samples = signal.samples();
    let sample_rate = signal.sample_rate() as f64;
    let times = beats.times();
    let to_index = |t: f64| ((t.max(0.0) * sample_rate).floor() as usize).min(samples.len());

    let mut energies: Vec<f32> = (0..)
        .map(|phrase| phrase * phrase_length)
        .take_while(|&start| start + phrase_length < times.len())
        .map(|start| {
            let from = to_index(times[start]);
            let to = to_index(times[start + phrase_length]);
            if to <= from {
                return 0.0;
            }
            samples[from..to].iter().map(|s| s * s).sum::<f32>() / (to - from) as f32
        })
        .collect();

    let max = energies.iter().copied().fold(0.0f32, f32::max);
    if max > 0.0 {
        for e in &mut energies {
            *e /= max;
        }
    }

    energies
        .iter()
        .enumerate()
        .filter(|&(i, &e)| i == 0 || e > energies[i - 1] * PHRASE_CONTRAST)
        .map(|(i, _)| times[i * phrase_length])
        .collect()
}
