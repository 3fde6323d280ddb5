/// Peak-amplitude summary of a signal in `points` blocks, normalized to 0..1.
pub fn waveform_overview(samples: &[f32], points: usize) -> Vec<f32> {
    if points == 0 || samples.is_empty() {
        return Vec::new();
    }

    let block = (samples.len() / points).max(1);
    let mut peaks: Vec<f32> = samples
        .chunks(block)
        .take(points)
        .map(|chunk| chunk.iter().map(|s| s.abs()).fold(0.0f32, f32::max))
        .collect();

    let max = peaks.iter().copied().fold(0.0f32, f32::max);
    if max > 0.0 {
        for p in &mut peaks {
            *p /= max;
        }
    }
    peaks
}
