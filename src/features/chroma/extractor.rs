//! Chroma vector extraction
//!
//! Converts a magnitude spectrogram to 12-element chroma vectors. Each FFT bin
//! is assigned a fractional semitone position relative to the reference
//! frequency; with soft mapping its power is spread over neighbouring pitch
//! classes with a Gaussian of `soft_mapping_sigma` semitones.

use super::normalization::normalize_max;
use super::N_CHROMA;
use crate::config::ChromaConfig;
use crate::features::spectrogram::Spectrogram;

/// Pitch class of the reference frequency (A)
const REFERENCE_CLASS: f32 = 9.0;

/// Semitone position of `freq`, where 0.0 is C and 9.0 is the reference A
fn semitone_position(freq: f32, center_frequency: f32) -> f32 {
    12.0 * (freq / center_frequency).log2() + REFERENCE_CLASS
}

/// Per-bin pitch-class weights (n_bins × 12)
fn chroma_weights(spec: &Spectrogram, config: &ChromaConfig) -> Vec<[f32; N_CHROMA]> {
    (0..spec.n_bins())
        .map(|k| {
            let mut weights = [0.0f32; N_CHROMA];
            let freq = spec.bin_frequency(k);
            if k == 0 || freq < config.min_frequency {
                return weights;
            }
            let semis = semitone_position(freq, config.center_frequency);
            if config.soft_chroma_mapping {
                let sigma = config.soft_mapping_sigma.max(1e-3);
                for (class, w) in weights.iter_mut().enumerate() {
                    // circular distance on the pitch-class wheel, in [-6, 6)
                    let d = (semis - class as f32 + 6.0).rem_euclid(12.0) - 6.0;
                    *w = (-0.5 * (d / sigma).powi(2)).exp();
                }
            } else {
                let class = (semis.round() as i64).rem_euclid(N_CHROMA as i64) as usize;
                weights[class] = 1.0;
            }
            weights
        })
        .collect()
}

/// Extract chroma vectors from a magnitude spectrogram
///
/// # Arguments
///
/// * `spec` - Magnitude spectrogram
/// * `config` - Chroma parameters
///
/// # Returns
///
/// One max-normalized 12-element chroma vector per spectrogram frame
pub fn extract_chroma(spec: &Spectrogram, config: &ChromaConfig) -> Vec<Vec<f32>> {
    log::debug!(
        "Extracting chroma: {} frames, reference {:.1} Hz, soft={}",
        spec.n_frames(),
        config.center_frequency,
        config.soft_chroma_mapping
    );

    let weights = chroma_weights(spec, config);
    spec.magnitudes
        .iter()
        .map(|frame| {
            let mut chroma = vec![0.0f32; N_CHROMA];
            for (mag, w) in frame.iter().zip(&weights) {
                let power = mag * mag;
                for (c, wc) in chroma.iter_mut().zip(w) {
                    *c += power * wc;
                }
            }
            normalize_max(&mut chroma);
            chroma
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine_chroma(freq: f32, soft: bool) -> Vec<f32> {
        let sr = 44100;
        let samples: Vec<f32> = (0..sr)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sr as f32).sin())
            .collect();
        let spec = Spectrogram::compute(&samples, sr as u32, 2048, 512).unwrap();
        let config = ChromaConfig {
            soft_chroma_mapping: soft,
            ..ChromaConfig::default()
        };
        let chroma = extract_chroma(&spec, &config);
        let mut mean = vec![0.0f32; 12];
        for frame in &chroma {
            for (m, c) in mean.iter_mut().zip(frame) {
                *m += c / chroma.len() as f32;
            }
        }
        mean
    }

    fn argmax(v: &[f32]) -> usize {
        v.iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(i, _)| i)
            .unwrap()
    }

    #[test]
    fn test_semitone_position() {
        assert!((semitone_position(440.0, 440.0) - 9.0).abs() < 1e-5);
        assert!((semitone_position(261.63, 440.0) - 0.0).abs() < 0.01);
        assert!((semitone_position(880.0, 440.0) - 21.0).abs() < 1e-5);
    }

    #[test]
    fn test_a440_maps_to_a() {
        assert_eq!(argmax(&sine_chroma(440.0, true)), 9);
        assert_eq!(argmax(&sine_chroma(440.0, false)), 9);
    }

    #[test]
    fn test_middle_c_maps_to_c() {
        assert_eq!(argmax(&sine_chroma(261.63, true)), 0);
    }

    #[test]
    fn test_frames_are_normalized() {
        let mean = sine_chroma(440.0, true);
        assert!(mean.iter().all(|&c| (0.0..=1.0).contains(&c)));
        assert!((mean[9] - 1.0).abs() < 1e-3);
    }
}
