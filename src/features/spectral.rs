//! Spectral shape descriptors

use crate::features::spectrogram::Spectrogram;

const EPSILON: f32 = 1e-10;

/// Magnitude-weighted mean frequency of each frame in Hz (0.0 for silent frames)
pub fn spectral_centroid(spec: &Spectrogram) -> Vec<f32> {
    let freqs = spec.frequencies();
    spec.magnitudes
        .iter()
        .map(|frame| {
            let total: f32 = frame.iter().sum();
            if total <= EPSILON {
                return 0.0;
            }
            frame.iter().zip(&freqs).map(|(m, f)| m * f).sum::<f32>() / total
        })
        .collect()
}

/// Whether a frame holds a spectral peak in `[fmin, fmax]` above `threshold`
fn has_salient_peak(frame: &[f32], lo: usize, hi: usize, threshold: f32) -> bool {
    (lo.max(1)..hi.min(frame.len().saturating_sub(1))).any(|k| {
        frame[k] > threshold && frame[k] > frame[k - 1] && frame[k] >= frame[k + 1]
    })
}

/// Fraction of frames with a salient pitch candidate
///
/// A frame counts as pitched when a local spectral maximum between `fmin`
/// and `fmax` exceeds `threshold` in raw STFT magnitude.
pub fn pitched_frame_ratio(spec: &Spectrogram, fmin: f32, fmax: f32, threshold: f32) -> f32 {
    if spec.n_frames() == 0 {
        return 0.0;
    }
    let bin_hz = spec.bin_frequency(1);
    let lo = (fmin / bin_hz).ceil() as usize;
    let hi = (fmax / bin_hz).floor() as usize + 1;
    let pitched = spec
        .magnitudes
        .iter()
        .filter(|frame| has_salient_peak(frame, lo, hi, threshold))
        .count();
    pitched as f32 / spec.n_frames() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(freq: f32, amplitude: f32) -> Spectrogram {
        let samples: Vec<f32> = (0..22050)
            .map(|i| amplitude * (2.0 * std::f32::consts::PI * freq * i as f32 / 44100.0).sin())
            .collect();
        Spectrogram::compute(&samples, 44100, 2048, 512).unwrap()
    }

    #[test]
    fn test_centroid_tracks_frequency() {
        let low = spectral_centroid(&tone(200.0, 0.5));
        let high = spectral_centroid(&tone(4000.0, 0.5));
        let mean = |v: &[f32]| v.iter().sum::<f32>() / v.len() as f32;
        assert!(mean(&low) < mean(&high));
        assert!((mean(&high) - 4000.0).abs() < 200.0);
    }

    #[test]
    fn test_silence_centroid_is_zero() {
        let spec = Spectrogram::compute(&vec![0.0; 8192], 44100, 2048, 512).unwrap();
        assert!(spectral_centroid(&spec).iter().all(|&c| c == 0.0));
        assert_eq!(pitched_frame_ratio(&spec, 32.7, 4000.0, 0.1), 0.0);
    }

    #[test]
    fn test_bass_tone_is_pitched() {
        let spec = tone(82.4, 0.5);
        assert!((pitched_frame_ratio(&spec, 32.7, 4000.0, 0.1) - 1.0).abs() < 1e-6);
        // above the candidate range
        let spec = tone(8000.0, 0.5);
        assert_eq!(pitched_frame_ratio(&spec, 32.7, 4000.0, 0.1), 0.0);
    }
}
