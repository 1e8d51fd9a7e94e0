//! Linear resampling for mono audio.

/// Resample mono samples from `from_rate` to `to_rate` by linear
/// interpolation. Returns the input unchanged when the rates match.
///
/// Linear interpolation is plenty for speech at the supported rates; no
/// anti-aliasing filter is applied.
pub fn resample_linear(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let out_len = ((samples.len() as f64) / ratio).round() as usize;
    let out_len = out_len.max(1);

    let mut out = Vec::with_capacity(out_len);
    for i in 0..out_len {
        let src_pos = i as f64 * ratio;
        let idx = src_pos as usize;
        if idx + 1 >= samples.len() {
            out.push(samples[samples.len() - 1]);
        } else {
            let frac = (src_pos - idx as f64) as f32;
            out.push(samples[idx] * (1.0 - frac) + samples[idx + 1] * frac);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_at_equal_rates() {
        let samples = vec![0.1, 0.2, 0.3];
        assert_eq!(resample_linear(&samples, 48000, 48000), samples);
    }

    #[test]
    fn test_duration_preserved() {
        let samples = vec![0.0f32; 44100];
        let out = resample_linear(&samples, 44100, 48000);
        // One second stays one second, within one sample.
        assert!((out.len() as i64 - 48000).abs() <= 1);
    }

    #[test]
    fn test_downsample_halves_length() {
        let samples: Vec<f32> = (0..1000).map(|i| i as f32 / 1000.0).collect();
        let out = resample_linear(&samples, 48000, 24000);
        assert!((out.len() as i64 - 500).abs() <= 1);
        // Monotone input stays monotone under linear interpolation.
        assert!(out.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_empty_input() {
        assert!(resample_linear(&[], 44100, 48000).is_empty());
    }
}
