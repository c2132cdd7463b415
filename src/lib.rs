//! # Cover Analysis
//!
//! Musical analysis of recorded audio for cover and arrangement pipelines:
//! tempo, key, timbre, song structure and recurring patterns, with optional
//! model-backed source separation, transcription and embeddings.
//!
//! ## Features
//!
//! - **Features**: tempo and beats, chroma, MFCC, RMS dynamics, onsets and key
//! - **Structure**: recurrence-matrix novelty segmentation into labelled sections
//! - **Patterns**: rhythmic, melodic and harmonic summaries
//! - **Capabilities**: optional ONNX backends (feature `ml`), probed per run
//!
//! ## Quick Start
//!
//! ```no_run
//! use cover_analysis::{AnalysisConfig, Analyzer};
//! use std::path::Path;
//!
//! let analyzer = Analyzer::new(AnalysisConfig::default());
//! let run = analyzer.analyze(Path::new("song.mp3"), None)?;
//! println!("Report written to {}", run.report_path.display());
//! # Ok::<(), cover_analysis::AnalysisError>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Decode → Capability probe → Stems → Transcription → Features → Structure → Embeddings → Patterns → Report
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod analysis;
pub mod backends;
pub mod config;
pub mod error;
pub mod features;
pub mod io;
pub mod patterns;
pub mod preprocessing;
pub mod stems;
pub mod structure;

// Re-export main types
pub use analysis::{AnalysisReport, AnalysisRun, Analyzer, StageReport};
pub use backends::{CapabilityKind, CapabilityMap, CapabilityRegistry, NoteEvent};
pub use config::AnalysisConfig;
pub use error::AnalysisError;
pub use features::{FeatureBundle, FeatureExtractor};

/// Extract the feature bundle from mono samples
///
/// # Arguments
///
/// * `samples` - Mono audio samples, normalized to [-1.0, 1.0]
/// * `sample_rate` - Sample rate in Hz
/// * `config` - Analysis configuration parameters
///
/// # Errors
///
/// Returns `AnalysisError` if the configuration is invalid or extraction fails
///
/// # Example
///
/// ```no_run
/// use cover_analysis::{extract_features, AnalysisConfig};
///
/// let samples = vec![0.0f32; 44100 * 30];
/// let bundle = extract_features(&samples, 44100, AnalysisConfig::default())?;
/// println!("Tempo: {:.1} BPM", bundle.tempo);
/// # Ok::<(), cover_analysis::AnalysisError>(())
/// ```
pub fn extract_features(
    samples: &[f32],
    sample_rate: u32,
    config: AnalysisConfig,
) -> Result<FeatureBundle, AnalysisError> {
    config.validate()?;
    if sample_rate == 0 {
        return Err(AnalysisError::InvalidInput("Invalid sample rate".to_string()));
    }
    FeatureExtractor::new(config).extract(samples, sample_rate)
}
