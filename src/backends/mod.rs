//! Optional model backends and capability gating
//!
//! Source separation, polyphonic transcription and audio embeddings are
//! provided by external models. Each is reached through a trait with a
//! uniform `probe()` plus one run method, so the orchestrator can treat an
//! absent model as a normal outcome.
//!
//! With the `ml` feature, ONNX Runtime backends load their model file lazily
//! on first use. Without it every capability reports unavailable.

pub mod notes;
#[cfg(feature = "ml")]
pub mod onnx;

use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, Result};
use crate::io::AudioSignal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Optional analysis capability
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityKind {
    /// Source separation into instrument stems
    Separation,
    /// Polyphonic note transcription
    Transcription,
    /// Fixed-size audio embeddings
    Embeddings,
}

impl CapabilityKind {
    /// All capabilities, in pipeline order
    pub const ALL: [CapabilityKind; 3] = [
        CapabilityKind::Separation,
        CapabilityKind::Transcription,
        CapabilityKind::Embeddings,
    ];

    /// Report name of the capability
    pub fn name(self) -> &'static str {
        match self {
            CapabilityKind::Separation => "separation",
            CapabilityKind::Transcription => "transcription",
            CapabilityKind::Embeddings => "embeddings",
        }
    }
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A transcribed note
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NoteEvent {
    /// MIDI pitch
    pub pitch: u8,
    /// Onset time in seconds
    pub start: f32,
    /// Duration in seconds
    pub duration: f32,
    /// Velocity in `[0, 1]`
    pub velocity: f32,
}

impl NoteEvent {
    /// Offset time in seconds
    pub fn end(&self) -> f32 {
        self.start + self.duration
    }
}

/// One separated stem
#[derive(Debug, Clone)]
pub struct SeparatedStem {
    /// Model-defined stem name (`drums`, `bass`, `vocals`, `other`, ...)
    pub name: String,
    /// Stem audio at the project sample rate
    pub signal: AudioSignal,
}

/// Chunked embedding matrix
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    /// Number of chunks (rows)
    pub chunks: usize,
    /// Embedding dimension (columns)
    pub dim: usize,
    /// Row-major `chunks × dim` values
    pub data: Vec<f32>,
}

impl Embedding {
    /// `[chunks, dim]`
    pub fn shape(&self) -> [usize; 2] {
        [self.chunks, self.dim]
    }
}

/// Common probe interface of all optional backends
pub trait Capability: Send + Sync {
    /// Which capability this backend provides
    fn kind(&self) -> CapabilityKind;

    /// Cheap availability check; `Err` carries the reason
    fn probe(&self) -> std::result::Result<(), String>;
}

/// Splits a mixed recording into stems
pub trait SourceSeparator: Capability {
    /// Separate `signal` into model-defined stems
    fn separate(&self, signal: &AudioSignal) -> Result<Vec<SeparatedStem>>;
}

/// Produces note events from audio
pub trait Transcriber: Capability {
    /// Transcribe `signal`; notes are ordered by start time
    fn transcribe(&self, signal: &AudioSignal) -> Result<Vec<NoteEvent>>;
}

/// Maps audio to embedding vectors
pub trait Embedder: Capability {
    /// Embed `signal` chunk by chunk
    fn embed(&self, signal: &AudioSignal) -> Result<Embedding>;
}

/// Backend standing in for a capability that is not usable
#[derive(Debug, Clone)]
pub struct Unavailable {
    kind: CapabilityKind,
    reason: String,
}

impl Unavailable {
    /// Unavailable backend for `kind`
    pub fn new(kind: CapabilityKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
        }
    }

    fn error(&self) -> AnalysisError {
        AnalysisError::backend(self.kind.name(), self.reason.clone())
    }
}

impl Capability for Unavailable {
    fn kind(&self) -> CapabilityKind {
        self.kind
    }

    fn probe(&self) -> std::result::Result<(), String> {
        Err(self.reason.clone())
    }
}

impl SourceSeparator for Unavailable {
    fn separate(&self, _signal: &AudioSignal) -> Result<Vec<SeparatedStem>> {
        Err(self.error())
    }
}

impl Transcriber for Unavailable {
    fn transcribe(&self, _signal: &AudioSignal) -> Result<Vec<NoteEvent>> {
        Err(self.error())
    }
}

impl Embedder for Unavailable {
    fn embed(&self, _signal: &AudioSignal) -> Result<Embedding> {
        Err(self.error())
    }
}

/// Capability name to availability, computed once per run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CapabilityMap(BTreeMap<CapabilityKind, bool>);

impl CapabilityMap {
    /// Availability of `kind` (false when never probed)
    pub fn is_available(&self, kind: CapabilityKind) -> bool {
        self.0.get(&kind).copied().unwrap_or(false)
    }

    /// Whether any capability is available
    pub fn any_available(&self) -> bool {
        self.0.values().any(|&v| v)
    }

    /// Iterate `(capability, available)` in pipeline order
    pub fn iter(&self) -> impl Iterator<Item = (CapabilityKind, bool)> + '_ {
        self.0.iter().map(|(&k, &v)| (k, v))
    }
}

impl FromIterator<(CapabilityKind, bool)> for CapabilityMap {
    fn from_iter<I: IntoIterator<Item = (CapabilityKind, bool)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Closed registry holding one backend per capability
pub struct CapabilityRegistry {
    separator: Box<dyn SourceSeparator>,
    transcriber: Box<dyn Transcriber>,
    embedder: Box<dyn Embedder>,
}

impl fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityRegistry").finish_non_exhaustive()
    }
}

impl CapabilityRegistry {
    /// Registry from explicit backends
    pub fn new(
        separator: Box<dyn SourceSeparator>,
        transcriber: Box<dyn Transcriber>,
        embedder: Box<dyn Embedder>,
    ) -> Self {
        Self {
            separator,
            transcriber,
            embedder,
        }
    }

    /// Registry where every capability is unavailable for `reason`
    pub fn unavailable(reason: &str) -> Self {
        Self::new(
            Box::new(Unavailable::new(CapabilityKind::Separation, reason)),
            Box::new(Unavailable::new(CapabilityKind::Transcription, reason)),
            Box::new(Unavailable::new(CapabilityKind::Embeddings, reason)),
        )
    }

    /// Registry for the configured model files
    #[cfg(feature = "ml")]
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(
            Box::new(onnx::OnnxSeparator::new(&config.models)),
            Box::new(onnx::OnnxTranscriber::new(
                &config.models,
                config.transcription.clone(),
            )),
            Box::new(onnx::OnnxEmbedder::new(&config.models)),
        )
    }

    /// Registry for the configured model files
    #[cfg(not(feature = "ml"))]
    pub fn from_config(_config: &AnalysisConfig) -> Self {
        Self::unavailable("built without the `ml` feature")
    }

    /// Probe every backend; never fails
    pub fn probe_all(&self) -> CapabilityMap {
        let probes = [
            (self.separator.kind(), self.separator.probe()),
            (self.transcriber.kind(), self.transcriber.probe()),
            (self.embedder.kind(), self.embedder.probe()),
        ];
        probes
            .into_iter()
            .map(|(kind, outcome)| {
                match outcome {
                    Ok(()) => {
                        log::info!("Capability {}: available", kind);
                        (kind, true)
                    }
                    Err(reason) => {
                        log::info!("Capability {}: unavailable ({})", kind, reason);
                        (kind, false)
                    }
                }
            })
            .collect()
    }

    /// Separation backend
    pub fn separator(&self) -> &dyn SourceSeparator {
        self.separator.as_ref()
    }

    /// Transcription backend
    pub fn transcriber(&self) -> &dyn Transcriber {
        self.transcriber.as_ref()
    }

    /// Embedding backend
    pub fn embedder(&self) -> &dyn Embedder {
        self.embedder.as_ref()
    }
}

/// Check that the ML runtime is usable
///
/// # Errors
///
/// Returns the name of the first missing dependency
pub fn dependency_check() -> std::result::Result<(), String> {
    #[cfg(feature = "ml")]
    {
        onnx::runtime_check()
    }
    #[cfg(not(feature = "ml"))]
    {
        Err("onnxruntime".to_string())
    }
}
