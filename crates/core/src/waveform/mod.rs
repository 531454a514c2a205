//! Waveform sample generation.
//!
//! Ring waveforms are decorative: new rings get a random envelope. For hosts
//! that do have decoded PCM at hand, [`summarize_pcm`] produces an envelope
//! in the same value range from the real signal.

use rand::{rngs::StdRng, Rng, SeedableRng};

/// Number of samples stored per ring.
pub const WAVEFORM_LEN: usize = 100;
pub const MIN_AMPLITUDE: f32 = 5.0;
pub const MAX_AMPLITUDE: f32 = 30.0;

/// Random whole-number amplitudes within the stored value range.
pub fn synthetic_waveform<R: Rng + ?Sized>(rng: &mut R) -> Vec<f32> {
    (0..WAVEFORM_LEN)
        .map(|_| (rng.gen::<f32>() * (MAX_AMPLITUDE - MIN_AMPLITUDE) + MIN_AMPLITUDE).round())
        .collect()
}

/// Reproducible variant of [`synthetic_waveform`].
pub fn seeded_waveform(seed: u64) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    synthetic_waveform(&mut rng)
}

/// Reduces PCM to `buckets` RMS values scaled into the stored amplitude
/// range, the loudest bucket mapping to [`MAX_AMPLITUDE`].
pub fn summarize_pcm(samples: &[f32], buckets: usize) -> Vec<f32> {
    if buckets == 0 {
        return Vec::new();
    }
    if samples.is_empty() {
        return vec![MIN_AMPLITUDE; buckets];
    }

    let levels: Vec<f32> = (0..buckets)
        .map(|bucket| {
            let start = bucket * samples.len() / buckets;
            let end = ((bucket + 1) * samples.len() / buckets).max(start + 1);
            compute_rms(&samples[start..end.min(samples.len())])
        })
        .collect();

    let peak = levels.iter().copied().fold(0.0_f32, f32::max);
    levels
        .into_iter()
        .map(|level| {
            let normalised = if peak > f32::EPSILON { level / peak } else { 0.0 };
            MIN_AMPLITUDE + normalised * (MAX_AMPLITUDE - MIN_AMPLITUDE)
        })
        .collect()
}

fn compute_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f32 = samples.iter().map(|sample| sample * sample).sum();
    (sum / samples.len() as f32).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_values_stay_in_range() {
        let waveform = seeded_waveform(7);
        assert_eq!(waveform.len(), WAVEFORM_LEN);
        assert!(waveform
            .iter()
            .all(|v| (MIN_AMPLITUDE..=MAX_AMPLITUDE).contains(v) && v.fract() == 0.0));
        assert_eq!(waveform, seeded_waveform(7));
    }

    #[test]
    fn summarizes_loudness_per_bucket() {
        let mut pcm = vec![0.0_f32; 400];
        for sample in &mut pcm[300..] {
            *sample = 0.8;
        }

        let envelope = summarize_pcm(&pcm, 4);

        assert_eq!(envelope.len(), 4);
        assert_eq!(envelope[0], MIN_AMPLITUDE);
        assert!((envelope[3] - MAX_AMPLITUDE).abs() < 1e-4);
    }

    #[test]
    fn handles_degenerate_inputs() {
        assert!(summarize_pcm(&[0.5], 0).is_empty());
        assert_eq!(summarize_pcm(&[], 3), vec![MIN_AMPLITUDE; 3]);
        // More buckets than samples still yields one value per bucket.
        assert_eq!(summarize_pcm(&[0.2, 0.4], 5).len(), 5);
        assert_eq!(summarize_pcm(&[0.0; 8], 2), vec![MIN_AMPLITUDE; 2]);
    }
}
