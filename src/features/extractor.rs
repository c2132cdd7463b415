//! Feature extraction pass
//!
//! Runs every acoustic primitive over one mono signal with a shared STFT so
//! that chroma, MFCC, RMS and onset frames line up index for index.

use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::features::beat_tracking::{self, BeatTracking};
use crate::features::chroma::{extract_chroma, N_CHROMA};
use crate::features::dynamics::{self, DynamicsSummary};
use crate::features::key::{estimate_key, KeyEstimate};
use crate::features::mfcc::{extract_mfcc, log_mel_spectrogram};
use crate::features::onset::{self, has_onset_energy, onset_strength, OnsetDetection};
use crate::features::spectrogram::Spectrogram;
use serde::Serialize;

/// Per-dimension mean and population standard deviation over frames
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FrameStats {
    /// Mean per dimension
    pub mean: Vec<f32>,
    /// Standard deviation per dimension
    pub std: Vec<f32>,
}

impl FrameStats {
    /// Compute statistics over `frames`; all zeros when there are no frames
    pub fn from_frames(frames: &[Vec<f32>], dims: usize) -> Self {
        if frames.is_empty() {
            return Self {
                mean: vec![0.0; dims],
                std: vec![0.0; dims],
            };
        }
        let n = frames.len() as f64;
        let mut mean = vec![0.0f64; dims];
        for frame in frames {
            for (m, &x) in mean.iter_mut().zip(frame) {
                *m += x as f64;
            }
        }
        mean.iter_mut().for_each(|m| *m /= n);

        let mut var = vec![0.0f64; dims];
        for frame in frames {
            for ((v, &x), m) in var.iter_mut().zip(frame).zip(&mean) {
                *v += (x as f64 - m).powi(2);
            }
        }
        Self {
            mean: mean.iter().map(|&m| m as f32).collect(),
            std: var.iter().map(|&v| (v / n).sqrt() as f32).collect(),
        }
    }
}

/// Beat count and leading beat times
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BeatSummary {
    /// Total number of tracked beats
    pub count: usize,
    /// First beat times in seconds
    pub positions: Vec<f32>,
}

/// Frame-level data kept for downstream stages, not serialized
#[derive(Debug, Clone, Default)]
pub struct FeatureFrames {
    /// Chroma vectors (n_frames × 12)
    pub chroma: Vec<Vec<f32>>,
    /// MFCC vectors (n_frames × n_mfcc)
    pub mfcc: Vec<Vec<f32>>,
    /// Frame RMS
    pub rms: Vec<f32>,
    /// Onset envelope and picked onsets
    pub onsets: OnsetDetection,
    /// Tempo and all beats
    pub beats: BeatTracking,
    /// Key estimate with confidence
    pub key: Option<KeyEstimate>,
    /// Sample rate of the analysed signal
    pub sample_rate: u32,
    /// Hop size shared by every frame sequence
    pub hop_size: usize,
}

/// Named feature bundle for one signal
#[derive(Debug, Clone, Serialize)]
pub struct FeatureBundle {
    /// Global tempo in BPM
    pub tempo: f32,
    /// Beat count and first positions
    pub beats: BeatSummary,
    /// Chroma statistics (12 bins)
    pub chroma: FrameStats,
    /// Estimated key name (argmax of mean chroma)
    pub estimated_key: Option<&'static str>,
    /// MFCC statistics
    pub mfcc: FrameStats,
    /// RMS dynamics
    pub dynamics: DynamicsSummary,
    /// Frame data for structure and pattern stages
    #[serde(skip)]
    pub frames: FeatureFrames,
}

/// Feature extractor bound to one configuration
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    config: AnalysisConfig,
}

impl FeatureExtractor {
    /// Create an extractor
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    /// Configuration in use
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// STFT with the configured framing
    pub fn spectrogram(&self, samples: &[f32], sample_rate: u32) -> Result<Spectrogram, AnalysisError> {
        Spectrogram::compute(
            samples,
            sample_rate,
            self.config.stft.frame_size,
            self.config.stft.hop_size,
        )
    }

    /// Onset detection from a spectrogram
    pub fn onsets(&self, spec: &Spectrogram) -> OnsetDetection {
        let log_mel = log_mel_spectrogram(spec, &self.config.mfcc);
        onset::detect_onsets(
            onset_strength(&log_mel),
            spec.sample_rate,
            spec.hop_size,
            &self.config.onset,
        )
    }

    /// Tempo and beats from an onset envelope
    ///
    /// Envelopes without onset energy yield tempo 0 and no beats.
    pub fn beats(&self, envelope: &[f32], sample_rate: u32) -> BeatTracking {
        if !has_onset_energy(envelope, &self.config.onset) {
            return BeatTracking::default();
        }
        beat_tracking::track(
            envelope,
            sample_rate,
            self.config.stft.hop_size,
            &self.config.beat,
        )
    }

    /// Extract the full feature bundle from mono samples
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` for a zero sample rate
    pub fn extract(&self, samples: &[f32], sample_rate: u32) -> Result<FeatureBundle, AnalysisError> {
        log::debug!(
            "Extracting features: {} samples at {} Hz",
            samples.len(),
            sample_rate
        );
        let spec = self.spectrogram(samples, sample_rate)?;

        let chroma = extract_chroma(&spec, &self.config.chroma);
        let log_mel = log_mel_spectrogram(&spec, &self.config.mfcc);
        let mfcc = extract_mfcc(&log_mel, self.config.mfcc.n_mfcc);
        let rms = dynamics::frame_rms(
            samples,
            self.config.stft.frame_size,
            self.config.stft.hop_size,
        );
        let onsets = onset::detect_onsets(
            onset_strength(&log_mel),
            sample_rate,
            self.config.stft.hop_size,
            &self.config.onset,
        );
        let beats = self.beats(&onsets.envelope, sample_rate);

        let chroma_stats = FrameStats::from_frames(&chroma, N_CHROMA);
        let key = if chroma.is_empty() {
            None
        } else {
            estimate_key(&chroma_stats.mean)
        };
        let mfcc_stats = FrameStats::from_frames(&mfcc, self.config.mfcc.n_mfcc);
        let dynamics = dynamics::summarize(&rms);

        let limit = self.config.report.beat_position_limit;
        let bundle = FeatureBundle {
            tempo: beats.tempo,
            beats: BeatSummary {
                count: beats.times.len(),
                positions: beats.times.iter().take(limit).copied().collect(),
            },
            chroma: chroma_stats,
            estimated_key: key.as_ref().map(|k| k.name),
            mfcc: mfcc_stats,
            dynamics,
            frames: FeatureFrames {
                chroma,
                mfcc,
                rms,
                onsets,
                beats,
                key,
                sample_rate,
                hop_size: self.config.stft.hop_size,
            },
        };

        log::debug!(
            "Features: tempo {:.1} BPM, {} beats, {} onsets, key {:?}, range {:.1} dB",
            bundle.tempo,
            bundle.beats.count,
            bundle.frames.onsets.count(),
            bundle.estimated_key,
            bundle.dynamics.dynamic_range_db
        );
        Ok(bundle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, seconds: f32) -> Vec<f32> {
        (0..(44100.0 * seconds) as usize)
            .map(|i| 0.5 * (2.0 * std::f32::consts::PI * freq * i as f32 / 44100.0).sin())
            .collect()
    }

    fn clicks(interval: f32, seconds: f32) -> Vec<f32> {
        let mut samples = vec![0.0f32; (44100.0 * seconds) as usize];
        let mut t = 0.25;
        while t < seconds {
            let start = (t * 44100.0) as usize;
            for i in 0..441.min(samples.len() - start) {
                // decaying deterministic noise burst
                let noise = ((i * 7919 + 13) % 113) as f32 / 56.0 - 1.0;
                samples[start + i] = 0.8 * noise * (-(i as f32) / 60.0).exp();
            }
            t += interval;
        }
        samples
    }

    #[test]
    fn test_sine_features() {
        let extractor = FeatureExtractor::new(AnalysisConfig::default());
        let bundle = extractor.extract(&sine(440.0, 3.0), 44100).unwrap();
        assert_eq!(bundle.estimated_key, Some("A"));
        assert_eq!(bundle.frames.onsets.count(), 0);
        assert_eq!(bundle.tempo, 0.0);
        assert_eq!(bundle.beats.count, 0);
        assert_eq!(bundle.chroma.mean.len(), 12);
        assert_eq!(bundle.mfcc.mean.len(), 13);
        assert_eq!(bundle.frames.chroma.len(), bundle.frames.mfcc.len());
        assert_eq!(bundle.frames.chroma.len(), bundle.frames.rms.len());
        assert_eq!(bundle.frames.chroma.len(), bundle.frames.onsets.envelope.len());
    }

    #[test]
    fn test_click_track_features() {
        let extractor = FeatureExtractor::new(AnalysisConfig::default());
        let bundle = extractor.extract(&clicks(0.5, 8.0), 44100).unwrap();
        let onsets = &bundle.frames.onsets;
        assert!(
            (14..=17).contains(&onsets.count()),
            "{} onsets",
            onsets.count()
        );
        assert!((bundle.tempo - 120.0).abs() < 5.0, "tempo {}", bundle.tempo);
        assert!(bundle.beats.count > 0);
        assert!(bundle.beats.positions.len() <= 20);
    }

    #[test]
    fn test_silence_is_finite() {
        let extractor = FeatureExtractor::new(AnalysisConfig::default());
        let bundle = extractor.extract(&vec![0.0; 44100], 44100).unwrap();
        assert!(bundle.dynamics.dynamic_range_db.is_finite());
        assert_eq!(bundle.frames.onsets.count(), 0);
        assert!(bundle.mfcc.mean.iter().all(|x| x.is_finite()));
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let extractor = FeatureExtractor::new(AnalysisConfig::default());
        let samples = clicks(0.4, 3.0);
        let a = extractor.extract(&samples, 44100).unwrap();
        let b = extractor.extract(&samples, 44100).unwrap();
        assert_eq!(serde_json::to_string(&a).unwrap(), serde_json::to_string(&b).unwrap());
    }

    #[test]
    fn test_empty_signal() {
        let extractor = FeatureExtractor::new(AnalysisConfig::default());
        let bundle = extractor.extract(&[], 44100).unwrap();
        assert_eq!(bundle.estimated_key, None);
        assert_eq!(bundle.tempo, 0.0);
        assert!(bundle.frames.chroma.is_empty());
    }

    #[test]
    fn test_frame_stats() {
        let stats = FrameStats::from_frames(&[vec![1.0, 2.0], vec![3.0, 2.0]], 2);
        assert_eq!(stats.mean, vec![2.0, 2.0]);
        assert_eq!(stats.std, vec![1.0, 0.0]);
    }
}
