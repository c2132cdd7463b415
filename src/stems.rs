//! Per-stem feature analysis
//!
//! Every stem gets RMS energy, mean spectral centroid and onset density.
//! Percussion adds tempo and beat count; bass adds pitched-content presence.

use crate::config::StemConfig;
use crate::error::AnalysisError;
use crate::features::spectral::{pitched_frame_ratio, spectral_centroid};
use crate::features::FeatureExtractor;
use serde::Serialize;

/// Stem category driving stem-specific analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StemKind {
    /// Percussion
    Drums,
    /// Bass line
    Bass,
    /// Singing voice
    Vocals,
    /// Everything else
    Other,
}

impl StemKind {
    /// Kind for a model-defined stem name; unknown names map to `Other`
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "drums" => StemKind::Drums,
            "bass" => StemKind::Bass,
            "vocals" => StemKind::Vocals,
            _ => StemKind::Other,
        }
    }
}

/// Features of one stem
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StemFeatures {
    /// Root mean square of the whole stem
    pub rms_mean: f32,
    /// Mean spectral centroid in Hz
    pub spectral_centroid_mean: f32,
    /// Onsets per second
    pub onset_density: f32,
    /// Tempo in BPM (drums only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tempo: Option<f32>,
    /// Number of tracked beats (drums only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub beat_count: Option<usize>,
    /// Whether any frame carries a salient pitch (bass only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_pitched_content: Option<bool>,
    /// Fraction of frames with a salient pitch (bass only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pitched_frame_ratio: Option<f32>,
}

fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let energy: f64 = samples.iter().map(|&x| (x as f64) * (x as f64)).sum();
    (energy / samples.len() as f64).sqrt() as f32
}

/// Analyze one mono stem
///
/// # Arguments
///
/// * `kind` - Stem category
/// * `samples` - Mono stem samples
/// * `sample_rate` - Sample rate in Hz
/// * `extractor` - Feature extractor providing the STFT framing and onsets
///
/// # Errors
///
/// Returns `AnalysisError` if the spectrogram cannot be computed
pub fn analyze_stem(
    kind: StemKind,
    samples: &[f32],
    sample_rate: u32,
    extractor: &FeatureExtractor,
) -> Result<StemFeatures, AnalysisError> {
    let spec = extractor.spectrogram(samples, sample_rate)?;
    let centroid = spectral_centroid(&spec);
    let onsets = extractor.onsets(&spec);
    let duration = samples.len() as f32 / sample_rate as f32;

    let mut features = StemFeatures {
        rms_mean: rms(samples),
        spectral_centroid_mean: if centroid.is_empty() {
            0.0
        } else {
            centroid.iter().sum::<f32>() / centroid.len() as f32
        },
        onset_density: if duration > 0.0 {
            onsets.count() as f32 / duration
        } else {
            0.0
        },
        ..StemFeatures::default()
    };

    match kind {
        StemKind::Drums => {
            let beats = extractor.beats(&onsets.envelope, sample_rate);
            features.tempo = Some(beats.tempo);
            features.beat_count = Some(beats.frames.len());
        }
        StemKind::Bass => {
            let StemConfig {
                pitch_salience_threshold,
                pitch_fmin,
                pitch_fmax,
            } = extractor.config().stems;
            let ratio = pitched_frame_ratio(&spec, pitch_fmin, pitch_fmax, pitch_salience_threshold);
            features.has_pitched_content = Some(ratio > 0.0);
            features.pitched_frame_ratio = Some(ratio);
        }
        StemKind::Vocals | StemKind::Other => {}
    }

    log::debug!(
        "Stem {:?}: rms {:.4}, centroid {:.1} Hz, {:.2} onsets/s",
        kind,
        features.rms_mean,
        features.spectral_centroid_mean,
        features.onset_density
    );
    Ok(features)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;

    fn extractor() -> FeatureExtractor {
        FeatureExtractor::new(AnalysisConfig::default())
    }

    fn sine(freq: f32, amplitude: f32, seconds: f32) -> Vec<f32> {
        (0..(44100.0 * seconds) as usize)
            .map(|i| amplitude * (2.0 * std::f32::consts::PI * freq * i as f32 / 44100.0).sin())
            .collect()
    }

    #[test]
    fn test_stem_kind_dispatch() {
        assert_eq!(StemKind::from_name("drums"), StemKind::Drums);
        assert_eq!(StemKind::from_name("Bass"), StemKind::Bass);
        assert_eq!(StemKind::from_name("vocals"), StemKind::Vocals);
        assert_eq!(StemKind::from_name("guitar"), StemKind::Other);
    }

    #[test]
    fn test_bass_stem() {
        let samples = sine(55.0, 0.5, 2.0);
        let features = analyze_stem(StemKind::Bass, &samples, 44100, &extractor()).unwrap();
        assert_eq!(features.has_pitched_content, Some(true));
        assert!(features.pitched_frame_ratio.unwrap() > 0.9);
        assert!((features.rms_mean - 0.5 / 2f32.sqrt()).abs() < 1e-3);
        assert!(features.tempo.is_none());
    }

    #[test]
    fn test_drum_stem_has_tempo_fields() {
        let features = analyze_stem(StemKind::Drums, &vec![0.0; 44100], 44100, &extractor()).unwrap();
        assert_eq!(features.tempo, Some(0.0));
        assert_eq!(features.beat_count, Some(0));
        assert_eq!(features.onset_density, 0.0);
        assert!(features.has_pitched_content.is_none());
    }

    #[test]
    fn test_other_stem_serialization() {
        let features = analyze_stem(StemKind::Other, &sine(880.0, 0.3, 1.0), 44100, &extractor()).unwrap();
        let json = serde_json::to_value(&features).unwrap();
        assert!(json.get("tempo").is_none());
        assert!(json.get("has_pitched_content").is_none());
        assert!((features.spectral_centroid_mean - 880.0).abs() < 100.0);
    }
}
