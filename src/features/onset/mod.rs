//! Onset detection modules
//!
//! Onsets are picked from a log-mel spectral flux envelope:
//! - Onset strength envelope (mean positive dB flux across mel bands)
//! - Normalization and windowed peak picking

pub mod spectral_flux;

pub use spectral_flux::onset_strength;

use crate::config::OnsetConfig;
use crate::features::peak_picking::{peak_pick, PeakPickParams};
use crate::features::spectrogram::frames_to_time;

/// Numerical stability epsilon
const EPSILON: f32 = 1e-10;

/// Detected onsets with the envelope they were picked from
#[derive(Debug, Clone, Default)]
pub struct OnsetDetection {
    /// Raw onset strength envelope (one value per STFT frame)
    pub envelope: Vec<f32>,
    /// Onset frame indices, increasing
    pub frames: Vec<usize>,
    /// Onset times in seconds
    pub times: Vec<f32>,
}

impl OnsetDetection {
    /// Number of detected onsets
    pub fn count(&self) -> usize {
        self.frames.len()
    }
}

/// Whether an envelope carries enough flux to contain onsets or a beat
///
/// Steady tones and silence produce only numerical-noise flux, which a
/// normalizing peak picker would otherwise amplify into spurious onsets.
pub fn has_onset_energy(envelope: &[f32], config: &OnsetConfig) -> bool {
    envelope.iter().copied().fold(0.0f32, f32::max) >= config.min_strength_db
}

/// Pick onsets from an onset strength envelope
///
/// The envelope is min-max normalized to `[0, 1]` before peak picking, so
/// `delta` is relative to the strongest onset in the signal.
///
/// # Arguments
///
/// * `envelope` - Onset strength envelope from [`onset_strength`]
/// * `sample_rate` - Sample rate in Hz
/// * `hop_size` - Hop size of the envelope frames
/// * `config` - Onset picking parameters (windows in seconds)
pub fn detect_onsets(
    envelope: Vec<f32>,
    sample_rate: u32,
    hop_size: usize,
    config: &OnsetConfig,
) -> OnsetDetection {
    if !has_onset_energy(&envelope, config) {
        log::debug!(
            "Onset envelope below {:.2} dB flux, no onsets",
            config.min_strength_db
        );
        return OnsetDetection {
            envelope,
            ..OnsetDetection::default()
        };
    }

    let min = envelope.iter().copied().fold(f32::MAX, f32::min);
    let max = envelope.iter().copied().fold(f32::MIN, f32::max);
    let range = (max - min).max(EPSILON);
    let normalized: Vec<f32> = envelope.iter().map(|&x| (x - min) / range).collect();

    let params = PeakPickParams::from_onset(config, sample_rate, hop_size);
    let frames = peak_pick(&normalized, &params);
    let times = frames_to_time(&frames, sample_rate, hop_size);
    log::debug!("Detected {} onsets", frames.len());

    OnsetDetection {
        envelope,
        frames,
        times,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_envelope_has_no_onsets() {
        let detection = detect_onsets(vec![0.01; 500], 44100, 512, &OnsetConfig::default());
        assert_eq!(detection.count(), 0);
        assert_eq!(detection.envelope.len(), 500);
    }

    #[test]
    fn test_spiky_envelope() {
        let mut envelope = vec![0.0f32; 400];
        for t in (20..400).step_by(43) {
            envelope[t] = 30.0;
        }
        let detection = detect_onsets(envelope, 44100, 512, &OnsetConfig::default());
        assert_eq!(detection.frames, (20..400).step_by(43).collect::<Vec<_>>());
        assert!((detection.times[1] - detection.times[0] - 43.0 * 512.0 / 44100.0).abs() < 1e-4);
    }
}
