//! RMS energy and dynamic range

use crate::features::spectrogram::frame_count;
use serde::Serialize;

const EPSILON: f64 = 1e-10;

/// Loudness statistics over the frame RMS curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DynamicsSummary {
    /// Mean frame RMS
    pub rms_mean: f32,
    /// Population standard deviation of frame RMS
    pub rms_std: f32,
    /// `20 * log10(max_rms / (min_rms + 1e-10))` in dB
    pub dynamic_range_db: f32,
}

/// Frame RMS using the shared STFT framing (zero-padded last frame)
pub fn frame_rms(samples: &[f32], frame_size: usize, hop_size: usize) -> Vec<f32> {
    let n_frames = frame_count(samples.len(), frame_size, hop_size);
    (0..n_frames)
        .map(|t| {
            let start = t * hop_size;
            let end = (start + frame_size).min(samples.len());
            let energy: f64 = samples[start..end].iter().map(|&x| (x as f64).powi(2)).sum();
            (energy / frame_size as f64).sqrt() as f32
        })
        .collect()
}

/// Dynamic range in dB
///
/// The numerator is floored at the same epsilon as the denominator, so an
/// all-silent signal gives 0 dB instead of `-inf`.
pub fn dynamic_range_db(rms: &[f32]) -> f32 {
    if rms.is_empty() {
        return 0.0;
    }
    let max = rms.iter().copied().fold(f32::MIN, f32::max) as f64;
    let min = rms.iter().copied().fold(f32::MAX, f32::min) as f64;
    (20.0 * (max.max(EPSILON) / (min + EPSILON)).log10()) as f32
}

/// Summarize a frame RMS curve
pub fn summarize(rms: &[f32]) -> DynamicsSummary {
    if rms.is_empty() {
        return DynamicsSummary {
            rms_mean: 0.0,
            rms_std: 0.0,
            dynamic_range_db: 0.0,
        };
    }
    let n = rms.len() as f64;
    let mean = rms.iter().map(|&x| x as f64).sum::<f64>() / n;
    let var = rms.iter().map(|&x| (x as f64 - mean).powi(2)).sum::<f64>() / n;
    DynamicsSummary {
        rms_mean: mean as f32,
        rms_std: var.sqrt() as f32,
        dynamic_range_db: dynamic_range_db(rms),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silence_is_finite() {
        let rms = frame_rms(&vec![0.0; 44100], 2048, 512);
        let summary = summarize(&rms);
        assert!(summary.dynamic_range_db.is_finite());
        assert_eq!(summary.dynamic_range_db, 0.0);
        assert_eq!(summary.rms_mean, 0.0);
    }

    #[test]
    fn test_constant_signal_rms() {
        let rms = frame_rms(&vec![0.5; 8192], 2048, 512);
        assert!(rms.iter().all(|&r| (r - 0.5).abs() < 1e-6));
        let summary = summarize(&rms);
        assert!(summary.rms_std < 1e-6);
        assert!(summary.dynamic_range_db.abs() < 1e-3);
    }

    #[test]
    fn test_range_between_loud_and_quiet() {
        let rms = vec![1.0, 0.1, 0.5];
        assert!((dynamic_range_db(&rms) - 20.0).abs() < 1e-3);
    }

    #[test]
    fn test_empty() {
        assert_eq!(summarize(&[]).dynamic_range_db, 0.0);
    }
}
