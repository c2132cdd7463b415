//! Reduced pipelines
//!
//! - Basic: mix features and capability flags only
//! - Fancy: separation, transcription and advanced features, each attempted
//!   independently and reported with its own success flag

use super::orchestrator::{load_input, write_stems};
use super::report::StageReport;
use crate::backends::{CapabilityKind, CapabilityMap, CapabilityRegistry};
use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, Result};
use crate::features::key::argmax;
use crate::features::spectrogram::frames_to_time;
use crate::features::FeatureExtractor;
use crate::io;
use crate::structure::agglomerative_boundaries;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Notes listed in the fancy transcription record
const FANCY_NOTE_LIMIT: usize = 10;

/// Feature subset of the basic pipeline
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BasicFeatures {
    /// Duration in seconds
    pub duration: f32,
    /// Tempo in BPM
    pub tempo: f32,
    /// Number of beats
    pub beat_count: usize,
    /// Number of onsets
    pub onset_count: usize,
    /// Pitch class index of the mean chroma maximum (0 = C)
    pub key_estimate: Option<usize>,
    /// Mean absolute sample value
    pub energy_mean: f32,
    /// Standard deviation of the absolute sample value
    pub energy_std: f32,
}

/// Basic pipeline report
#[derive(Debug, Clone, Serialize)]
pub struct BasicReport {
    /// Input path
    pub audio_file: String,
    /// Whether any model capability is usable
    pub ml_available: bool,
    /// Mix features
    pub features: BasicFeatures,
    /// Probed capabilities
    pub capabilities: CapabilityMap,
}

/// Mean and population standard deviation of `|x|`
fn abs_energy(samples: &[f32]) -> (f32, f32) {
    if samples.is_empty() {
        return (0.0, 0.0);
    }
    let n = samples.len() as f64;
    let mean = samples.iter().map(|&x| x.abs() as f64).sum::<f64>() / n;
    let var = samples
        .iter()
        .map(|&x| (x.abs() as f64 - mean).powi(2))
        .sum::<f64>()
        / n;
    (mean as f32, var.sqrt() as f32)
}

/// Basic analysis: features and capability flags
///
/// # Errors
///
/// Returns `AnalysisError` for unusable input or if feature extraction fails
pub fn basic_analysis(
    input: &Path,
    config: &AnalysisConfig,
    registry: &CapabilityRegistry,
) -> Result<BasicReport> {
    let signal = load_input(input, config.sample_rate)?;
    let capabilities = registry.probe_all();
    let mono = signal.to_mono();
    let bundle = FeatureExtractor::new(config.clone()).extract(&mono, signal.sample_rate())?;
    let (energy_mean, energy_std) = abs_energy(&mono);

    let features = BasicFeatures {
        duration: signal.duration_seconds(),
        tempo: bundle.tempo,
        beat_count: bundle.beats.count,
        onset_count: bundle.frames.onsets.count(),
        key_estimate: bundle.frames.key.as_ref().map(|k| k.index),
        energy_mean,
        energy_std,
    };
    log::info!(
        "Basic analysis: {:.1} BPM, {} onsets, key {:?}",
        features.tempo,
        features.onset_count,
        features.key_estimate
    );

    Ok(BasicReport {
        audio_file: input.display().to_string(),
        ml_available: capabilities.any_available(),
        features,
        capabilities,
    })
}

/// Fancy separation record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeparationRecord {
    /// Stem name to written WAV path
    pub stems: BTreeMap<String, String>,
    /// Model file name
    pub model: String,
}

/// Abbreviated note in the fancy transcription record
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BriefNote {
    /// MIDI pitch
    pub pitch: u8,
    /// Onset time in seconds
    pub start: f32,
    /// Duration in seconds
    pub duration: f32,
}

/// Fancy transcription record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscriptionRecord {
    /// Written Standard MIDI File
    pub midi_file: String,
    /// Number of notes
    pub note_count: usize,
    /// Leading notes
    pub first_notes: Vec<BriefNote>,
}

/// Fancy advanced feature record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdvancedFeatures {
    /// Tempo in BPM
    pub tempo: f32,
    /// Pitch class index of the mean chroma maximum
    pub estimated_key: usize,
    /// Mean chroma value at the estimated key
    pub key_confidence: f32,
    /// Agglomerative segment start times in seconds
    pub section_boundaries: Vec<f32>,
    /// Number of segments
    pub section_count: usize,
}

/// The three fancy analyses
#[derive(Debug, Clone, Serialize)]
pub struct FancyAnalyses {
    /// Source separation
    pub source_separation: StageReport<SeparationRecord>,
    /// MIDI transcription
    pub transcription: StageReport<TranscriptionRecord>,
    /// Tempo, key and agglomerative sections
    pub advanced_features: StageReport<AdvancedFeatures>,
}

/// Fancy pipeline report
#[derive(Debug, Clone, Serialize)]
pub struct FancyReport {
    /// Input path
    pub audio_file: String,
    /// Always true
    pub fancy_mode: bool,
    /// Per-analysis outcomes
    pub analyses: FancyAnalyses,
}

impl FancyReport {
    /// Number of analyses that succeeded (out of 3)
    pub fn succeeded(&self) -> usize {
        [
            self.analyses.source_separation.success,
            self.analyses.transcription.success,
            self.analyses.advanced_features.success,
        ]
        .iter()
        .filter(|&&s| s)
        .count()
    }

    /// One-line outcome, e.g. `2/3 analyses succeeded`
    pub fn summary_line(&self) -> String {
        format!("{}/3 analyses succeeded", self.succeeded())
    }
}

fn require_capability(capabilities: &CapabilityMap, kind: CapabilityKind) -> Result<()> {
    if capabilities.is_available(kind) {
        Ok(())
    } else {
        Err(AnalysisError::backend(kind.name(), "capability unavailable"))
    }
}

/// Fancy analysis: every optional analysis attempted on its own
///
/// # Errors
///
/// Returns `AnalysisError` only for unusable input
pub fn fancy_analysis(
    input: &Path,
    config: &AnalysisConfig,
    registry: &CapabilityRegistry,
) -> Result<FancyReport> {
    let signal = load_input(input, config.sample_rate)?;
    let capabilities = registry.probe_all();

    let source_separation = StageReport::run("source_separation", || {
        require_capability(&capabilities, CapabilityKind::Separation)?;
        let stems = registry.separator().separate(&signal)?;
        let paths = write_stems(input, &stems)?;
        let model = config
            .models
            .separation
            .as_ref()
            .and_then(|p| p.file_stem())
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(SeparationRecord {
            stems: stems
                .iter()
                .zip(paths)
                .map(|(s, p)| (s.name.clone(), p.display().to_string()))
                .collect(),
            model,
        })
    });

    let transcription = StageReport::run("transcription", || {
        require_capability(&capabilities, CapabilityKind::Transcription)?;
        let notes = registry.transcriber().transcribe(&signal)?;
        let midi_path = io::report::midi_path(input);
        io::midi::write_midi(&notes, &midi_path)?;
        Ok(TranscriptionRecord {
            midi_file: midi_path.display().to_string(),
            note_count: notes.len(),
            first_notes: notes
                .iter()
                .take(FANCY_NOTE_LIMIT)
                .map(|n| BriefNote {
                    pitch: n.pitch,
                    start: n.start,
                    duration: n.duration,
                })
                .collect(),
        })
    });

    let advanced_features = StageReport::run("advanced_features", || {
        let bundle = FeatureExtractor::new(config.clone())
            .extract(&signal.to_mono(), signal.sample_rate())?;
        let estimated_key = argmax(&bundle.chroma.mean).ok_or_else(|| {
            AnalysisError::ProcessingError("no chroma frames to estimate a key".to_string())
        })?;
        let bounds = agglomerative_boundaries(
            &bundle.frames.mfcc,
            config.structure.agglomerative_segments,
        );
        Ok(AdvancedFeatures {
            tempo: bundle.tempo,
            estimated_key,
            key_confidence: bundle.chroma.mean[estimated_key],
            section_boundaries: frames_to_time(&bounds, signal.sample_rate(), config.stft.hop_size),
            section_count: bounds.len(),
        })
    });

    let report = FancyReport {
        audio_file: input.display().to_string(),
        fancy_mode: true,
        analyses: FancyAnalyses {
            source_separation,
            transcription,
            advanced_features,
        },
    };
    log::info!("Fancy analysis: {}", report.summary_line());
    Ok(report)
}
