//! Full analysis pipeline
//!
//! Capability probe, separation, transcription, mix features, structure,
//! embeddings and patterns, each isolated so one failing stage never stops
//! the run. Only missing or undecodable input aborts, before any artifact is
//! written.

use super::report::{
    AnalysisReport, EmbeddingReport, FileInfo, StageReport, StemReport, StemsReport,
    TranscriptionReport,
};
use crate::backends::{CapabilityKind, CapabilityMap, CapabilityRegistry, SeparatedStem};
use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, Result};
use crate::features::{FeatureBundle, FeatureExtractor};
use crate::io::{self, AudioSignal};
use crate::patterns::{extract_patterns, TranscribedNotes};
use crate::stems::{analyze_stem, StemKind};
use crate::structure::{StructureReport, StructureSegmenter};
use std::path::{Path, PathBuf};

/// Report plus the path it was written to
#[derive(Debug, Clone)]
pub struct AnalysisRun {
    /// Assembled report
    pub report: AnalysisReport,
    /// Written JSON file
    pub report_path: PathBuf,
}

/// Analyzer owning the configuration and model backends
///
/// Backends load their models lazily and keep them for the lifetime of the
/// analyzer, so analysing several files with one instance loads each model
/// once.
#[derive(Debug)]
pub struct Analyzer {
    config: AnalysisConfig,
    registry: CapabilityRegistry,
    extractor: FeatureExtractor,
}

/// Write separated stems as WAV files under the input's stem directory
pub(crate) fn write_stems(input: &Path, stems: &[SeparatedStem]) -> Result<Vec<PathBuf>> {
    let dir = io::report::stems_dir(input);
    std::fs::create_dir_all(&dir)?;
    stems
        .iter()
        .map(|stem| {
            let path = dir.join(format!("{}.wav", stem.name));
            io::wav::write_wav(&stem.signal, &path)?;
            log::info!("Wrote stem {}", path.display());
            Ok(path)
        })
        .collect()
}

/// Load the input, failing fast on missing or undecodable files
pub(crate) fn load_input(input: &Path, sample_rate: u32) -> Result<AudioSignal> {
    if !input.is_file() {
        return Err(AnalysisError::FileNotFound(input.display().to_string()));
    }
    log::info!("Loading audio: {}", input.display());
    io::load_audio(input, sample_rate)
}

impl Analyzer {
    /// Analyzer with backends built from the configured model files
    pub fn new(config: AnalysisConfig) -> Self {
        let registry = CapabilityRegistry::from_config(&config);
        Self::with_registry(config, registry)
    }

    /// Analyzer with explicit backends
    pub fn with_registry(config: AnalysisConfig, registry: CapabilityRegistry) -> Self {
        let extractor = FeatureExtractor::new(config.clone());
        Self {
            config,
            registry,
            extractor,
        }
    }

    /// Configuration in use
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Model backends
    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    /// Feature extractor
    pub fn extractor(&self) -> &FeatureExtractor {
        &self.extractor
    }

    /// Analyze a file and write the JSON report
    ///
    /// # Arguments
    ///
    /// * `input` - Audio file path
    /// * `output` - Report path; defaults to `<input>.analysis.json`
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::FileNotFound` or `AnalysisError::DecodingError`
    /// for unusable input (nothing is written), or an I/O error if the report
    /// cannot be written. Stage failures are recorded in the report instead.
    pub fn analyze(&self, input: &Path, output: Option<&Path>) -> Result<AnalysisRun> {
        let signal = load_input(input, self.config.sample_rate)?;
        let capabilities = self.registry.probe_all();
        let report = self.analyze_signal(input, &signal, &capabilities);

        let report_path = output
            .map(Path::to_path_buf)
            .unwrap_or_else(|| io::report::default_report_path(input));
        io::report::write_json(&report, &report_path)?;
        Ok(AnalysisRun {
            report,
            report_path,
        })
    }

    /// Run every stage on a decoded signal
    ///
    /// `input` names the file for metadata and derives the artifact paths.
    pub fn analyze_signal(
        &self,
        input: &Path,
        signal: &AudioSignal,
        capabilities: &CapabilityMap,
    ) -> AnalysisReport {
        let file_info = FileInfo {
            path: input.display().to_string(),
            duration: signal.duration_seconds(),
            sample_rate: signal.sample_rate(),
            channels: signal.channel_count(),
        };
        log::info!(
            "Analyzing {}: {:.1}s, {} Hz, {} channel(s)",
            file_info.path,
            file_info.duration,
            file_info.sample_rate,
            file_info.channels
        );

        let stems = capabilities
            .is_available(CapabilityKind::Separation)
            .then(|| StageReport::run("separation", || self.separate(input, signal)));

        let transcription = capabilities
            .is_available(CapabilityKind::Transcription)
            .then(|| StageReport::run("transcription", || self.transcribe(input, signal)));

        let mono = signal.to_mono();
        let features = StageReport::run("features", || {
            self.extractor.extract(&mono, signal.sample_rate())
        });

        let structure = StageReport::run("structure", || {
            self.structure(features.require("features")?, file_info.duration)
        });

        let embeddings = capabilities
            .is_available(CapabilityKind::Embeddings)
            .then(|| {
                StageReport::run("embeddings", || {
                    let embedding = self.registry.embedder().embed(signal)?;
                    Ok(EmbeddingReport {
                        shape: embedding.shape(),
                    })
                })
            });

        let patterns = StageReport::run("patterns", || {
            let bundle = features.require("features")?;
            // intervals from the notes kept in the report, range from all notes
            let notes = transcription
                .as_ref()
                .and_then(|t| t.data())
                .map(|t| TranscribedNotes {
                    notes: &t.notes,
                    pitch_range: t.pitch_range,
                });
            Ok(extract_patterns(
                &bundle.frames.onsets.times,
                notes,
                &bundle.frames.chroma,
                &self.config.patterns,
            ))
        });

        AnalysisReport {
            file_info,
            capabilities: capabilities.clone(),
            stems,
            transcription,
            features,
            structure,
            embeddings,
            patterns,
        }
    }

    fn separate(&self, input: &Path, signal: &AudioSignal) -> Result<StemsReport> {
        let stems = self.registry.separator().separate(signal)?;
        let paths = write_stems(input, &stems)?;
        let mut report = StemsReport::new();
        for (stem, path) in stems.iter().zip(paths) {
            let features = analyze_stem(
                StemKind::from_name(&stem.name),
                &stem.signal.to_mono(),
                stem.signal.sample_rate(),
                &self.extractor,
            )?;
            report.insert(
                stem.name.clone(),
                StemReport {
                    path: path.display().to_string(),
                    features,
                },
            );
        }
        Ok(report)
    }

    fn transcribe(&self, input: &Path, signal: &AudioSignal) -> Result<TranscriptionReport> {
        let notes = self.registry.transcriber().transcribe(signal)?;
        let midi_path = io::report::midi_path(input);
        io::midi::write_midi(&notes, &midi_path)?;
        log::info!("Wrote {} notes to {}", notes.len(), midi_path.display());
        Ok(TranscriptionReport::new(
            &midi_path,
            &notes,
            self.config.transcription.report_note_limit,
        ))
    }

    fn structure(&self, bundle: &FeatureBundle, duration: f32) -> Result<StructureReport> {
        StructureSegmenter::new(
            self.config.structure.clone(),
            bundle.frames.sample_rate,
            bundle.frames.hop_size,
        )
        .segment(&bundle.frames.chroma, &bundle.frames.mfcc, duration)
    }
}
