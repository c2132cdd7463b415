//! Analysis report types
//!
//! Every stage result is wrapped in a [`StageReport`], which serializes as the
//! stage data plus `"success": true`, or as `{"success": false, "error": ...}`
//! when the stage failed.

use crate::backends::{CapabilityMap, NoteEvent};
use crate::error::{AnalysisError, Result};
use crate::features::FeatureBundle;
use crate::patterns::{PatternSummary, PitchRange};
use crate::stems::StemFeatures;
use crate::structure::StructureReport;
use serde::Serialize;
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;

/// Outcome of one isolated stage
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageReport<T> {
    /// Whether the stage completed
    pub success: bool,
    /// Stage output, flattened next to `success`
    #[serde(flatten)]
    pub data: Option<T>,
    /// Failure description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> StageReport<T> {
    /// Successful stage
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Failed stage
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }

    /// Run `stage`, capturing errors and panics as a failed report
    pub fn run<F>(name: &str, stage: F) -> Self
    where
        F: FnOnce() -> Result<T>,
    {
        log::info!("Stage {}: running", name);
        match catch_unwind(AssertUnwindSafe(stage)) {
            Ok(Ok(data)) => {
                log::info!("Stage {}: done", name);
                Self::ok(data)
            }
            Ok(Err(e)) => {
                log::warn!("Stage {} failed: {}", name, e);
                Self::failed(e.to_string())
            }
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "stage panicked".to_string());
                log::warn!("Stage {} panicked: {}", name, message);
                Self::failed(message)
            }
        }
    }

    /// Stage output when successful
    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    /// Stage output, or an error naming the failed prerequisite
    pub fn require(&self, name: &str) -> Result<&T> {
        self.data.as_ref().ok_or_else(|| {
            AnalysisError::ProcessingError(format!("{} stage did not complete", name))
        })
    }
}

/// Input file metadata
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileInfo {
    /// Input path as given
    pub path: String,
    /// Duration in seconds
    pub duration: f32,
    /// Analysis sample rate in Hz
    pub sample_rate: u32,
    /// Channel count of the decoded file
    pub channels: usize,
}

/// One written and analysed stem
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StemReport {
    /// Written WAV file
    pub path: String,
    /// Stem features
    pub features: StemFeatures,
}

/// Stems keyed by name
pub type StemsReport = BTreeMap<String, StemReport>;

/// Transcription summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscriptionReport {
    /// Written Standard MIDI File
    pub midi_path: String,
    /// Total number of notes
    pub note_count: usize,
    /// Pitch range over all notes (0/0 when empty)
    pub pitch_range: PitchRange,
    /// Leading notes, in start order
    pub notes: Vec<NoteEvent>,
}

impl TranscriptionReport {
    /// Summarize `notes`, keeping the first `limit`
    pub fn new(midi_path: &Path, notes: &[NoteEvent], limit: usize) -> Self {
        Self {
            midi_path: midi_path.display().to_string(),
            note_count: notes.len(),
            pitch_range: PitchRange::from_notes(notes),
            notes: notes.iter().take(limit).copied().collect(),
        }
    }
}

/// Embedding output shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EmbeddingReport {
    /// `[chunks, dimension]`
    pub shape: [usize; 2],
}

/// Complete analysis report
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    /// Input metadata
    pub file_info: FileInfo,
    /// Probed capabilities
    pub capabilities: CapabilityMap,
    /// Present when separation is available
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stems: Option<StageReport<StemsReport>>,
    /// Present when transcription is available
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcription: Option<StageReport<TranscriptionReport>>,
    /// Mix features
    pub features: StageReport<FeatureBundle>,
    /// Song structure
    pub structure: StageReport<StructureReport>,
    /// Present when embeddings are available
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embeddings: Option<StageReport<EmbeddingReport>>,
    /// Pattern summary
    pub patterns: StageReport<PatternSummary>,
}

/// Name and outcome of one stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageStatus {
    /// Stage name
    pub name: &'static str,
    /// Whether it completed
    pub success: bool,
    /// Failure description
    pub error: Option<String>,
}

fn status<T>(name: &'static str, stage: &StageReport<T>) -> StageStatus {
    StageStatus {
        name,
        success: stage.success,
        error: stage.error.clone(),
    }
}

impl AnalysisReport {
    /// Outcome of every stage that ran, in pipeline order
    pub fn stages(&self) -> Vec<StageStatus> {
        let mut stages = Vec::new();
        if let Some(s) = &self.stems {
            stages.push(status("separation", s));
        }
        if let Some(s) = &self.transcription {
            stages.push(status("transcription", s));
        }
        stages.push(status("features", &self.features));
        stages.push(status("structure", &self.structure));
        if let Some(s) = &self.embeddings {
            stages.push(status("embeddings", s));
        }
        stages.push(status("patterns", &self.patterns));
        stages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Serialize)]
    struct Payload {
        value: u32,
    }

    #[test]
    fn test_stage_serialization() {
        let ok = StageReport::ok(Payload { value: 3 });
        assert_eq!(
            serde_json::to_string(&ok).unwrap(),
            r#"{"success":true,"value":3}"#
        );
        let failed: StageReport<Payload> = StageReport::failed("model crashed");
        assert_eq!(
            serde_json::to_string(&failed).unwrap(),
            r#"{"success":false,"error":"model crashed"}"#
        );
    }

    #[test]
    fn test_stage_isolates_errors_and_panics() {
        let err: StageReport<u32> = StageReport::run("broken", || {
            Err(AnalysisError::ProcessingError("bad frame".to_string()))
        });
        assert!(!err.success);
        assert_eq!(err.error.as_deref(), Some("Processing error: bad frame"));

        let panicked: StageReport<u32> = StageReport::run("panicky", || panic!("boom"));
        assert!(!panicked.success);
        assert_eq!(panicked.error.as_deref(), Some("boom"));

        let fine = StageReport::run("fine", || Ok(7u32));
        assert_eq!(fine.data(), Some(&7));
        assert!(fine.require("fine").is_ok());
        assert!(err.require("broken").is_err());
    }

    #[test]
    fn test_transcription_report() {
        let notes: Vec<NoteEvent> = (0..60u8)
            .map(|i| NoteEvent {
                pitch: 40 + i % 12,
                start: i as f32 * 0.25,
                duration: 0.2,
                velocity: 0.5,
            })
            .collect();
        let report = TranscriptionReport::new(Path::new("song.transcribed.mid"), &notes, 50);
        assert_eq!(report.note_count, 60);
        assert_eq!(report.notes.len(), 50);
        assert_eq!(report.pitch_range, PitchRange { min: 40, max: 51 });

        let empty = TranscriptionReport::new(Path::new("x.mid"), &[], 50);
        assert_eq!(empty.pitch_range, PitchRange { min: 0, max: 0 });
    }
}
