//! Configuration parameters for audio analysis
//!
//! All sections use `#[serde(default)]`, so a JSON config file only needs to
//! name the values it overrides.

use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Sample rate every decoded file is resampled to before analysis
pub const PROJECT_SAMPLE_RATE: u32 = 44_100;

/// Environment variable overriding `models.separation`
pub const SEPARATION_MODEL_ENV: &str = "COVER_SEPARATION_MODEL";
/// Environment variable overriding `models.transcription`
pub const TRANSCRIPTION_MODEL_ENV: &str = "COVER_TRANSCRIPTION_MODEL";
/// Environment variable overriding `models.embeddings`
pub const EMBEDDING_MODEL_ENV: &str = "COVER_EMBEDDING_MODEL";

/// Analysis configuration parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Target sample rate for decoded audio (default: 44100)
    pub sample_rate: u32,
    /// STFT framing shared by every time-indexed feature
    pub stft: StftConfig,
    /// Chroma extraction
    pub chroma: ChromaConfig,
    /// MFCC extraction
    pub mfcc: MfccConfig,
    /// Onset detection
    pub onset: OnsetConfig,
    /// Tempo estimation and beat tracking
    pub beat: BeatConfig,
    /// Structure segmentation
    pub structure: StructureConfig,
    /// Pattern mining
    pub patterns: PatternConfig,
    /// Per-stem analysis
    pub stems: StemConfig,
    /// Transcription decoding and reporting
    pub transcription: TranscriptionConfig,
    /// Optional model locations
    pub models: ModelConfig,
    /// Report layout
    pub report: ReportConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            sample_rate: PROJECT_SAMPLE_RATE,
            stft: StftConfig::default(),
            chroma: ChromaConfig::default(),
            mfcc: MfccConfig::default(),
            onset: OnsetConfig::default(),
            beat: BeatConfig::default(),
            structure: StructureConfig::default(),
            patterns: PatternConfig::default(),
            stems: StemConfig::default(),
            transcription: TranscriptionConfig::default(),
            models: ModelConfig::default(),
            report: ReportConfig::default(),
        }
    }
}

/// STFT parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StftConfig {
    /// Frame size for STFT (default: 2048)
    pub frame_size: usize,
    /// Hop size for STFT (default: 512)
    pub hop_size: usize,
}

impl Default for StftConfig {
    fn default() -> Self {
        Self {
            frame_size: 2048,
            hop_size: 512,
        }
    }
}

/// Chroma extraction parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChromaConfig {
    /// Reference frequency for pitch class A (default: 440.0 Hz)
    pub center_frequency: f32,
    /// Bins below this frequency are ignored (default: 32.7 Hz, C1)
    pub min_frequency: f32,
    /// Spread each bin over neighbouring semitones (default: true)
    pub soft_chroma_mapping: bool,
    /// Soft mapping standard deviation in semitones (default: 0.5)
    pub soft_mapping_sigma: f32,
}

impl Default for ChromaConfig {
    fn default() -> Self {
        Self {
            center_frequency: 440.0,
            min_frequency: 32.7,
            soft_chroma_mapping: true,
            soft_mapping_sigma: 0.5,
        }
    }
}

/// MFCC parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MfccConfig {
    /// Number of cepstral coefficients (default: 13)
    pub n_mfcc: usize,
    /// Number of mel bands (default: 40)
    pub n_mels: usize,
    /// Lowest mel band edge in Hz (default: 0.0)
    pub fmin: f32,
    /// Highest mel band edge in Hz, 0 means Nyquist (default: 0.0)
    pub fmax: f32,
    /// Dynamic range clamp of the log-mel spectrogram in dB (default: 80.0)
    pub top_db: f32,
}

impl Default for MfccConfig {
    fn default() -> Self {
        Self {
            n_mfcc: 13,
            n_mels: 40,
            fmin: 0.0,
            fmax: 0.0,
            top_db: 80.0,
        }
    }
}

/// Onset detection parameters (windows in seconds)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OnsetConfig {
    /// Envelopes whose peak mean flux stays below this (dB) carry no onsets (default: 1.0)
    pub min_strength_db: f32,
    /// Local-max lookbehind (default: 0.03 s)
    pub pre_max: f32,
    /// Local-max lookahead (default: 0.0 s)
    pub post_max: f32,
    /// Local-mean lookbehind (default: 0.1 s)
    pub pre_avg: f32,
    /// Local-mean lookahead (default: 0.1 s)
    pub post_avg: f32,
    /// Minimum gap between onsets (default: 0.03 s)
    pub wait: f32,
    /// Threshold above local mean on the normalized envelope (default: 0.07)
    pub delta: f32,
}

impl Default for OnsetConfig {
    fn default() -> Self {
        Self {
            min_strength_db: 1.0,
            pre_max: 0.03,
            post_max: 0.0,
            pre_avg: 0.1,
            post_avg: 0.1,
            wait: 0.03,
            delta: 0.07,
        }
    }
}

/// Tempo estimation and beat tracking parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BeatConfig {
    /// Centre of the tempo prior (default: 120.0 BPM)
    pub start_bpm: f32,
    /// Width of the log-normal tempo prior in octaves (default: 1.0)
    pub prior_std_octaves: f32,
    /// Minimum BPM to consider (default: 30.0)
    pub min_bpm: f32,
    /// Maximum BPM to consider (default: 300.0)
    pub max_bpm: f32,
    /// Penalty weight for deviating from the tempo period (default: 100.0)
    pub tightness: f32,
}

impl Default for BeatConfig {
    fn default() -> Self {
        Self {
            start_bpm: 120.0,
            prior_std_octaves: 1.0,
            min_bpm: 30.0,
            max_bpm: 300.0,
            tightness: 100.0,
        }
    }
}

/// Policy once more sections exist than vocabulary labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelOverflow {
    /// `section9`, `section10`, ... (1-based position)
    Numbered,
    /// Keep using the last vocabulary label (`outro`)
    RepeatLast,
}

/// Structure segmentation parameters (windows in frames)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StructureConfig {
    /// Local-max lookbehind (default: 10)
    pub pre_max: usize,
    /// Local-max lookahead (default: 10)
    pub post_max: usize,
    /// Local-mean lookbehind (default: 10)
    pub pre_avg: usize,
    /// Local-mean lookahead (default: 10)
    pub post_avg: usize,
    /// Minimum height above local mean of the neighbour-normalized novelty (default: 0.5)
    pub delta: f32,
    /// Minimum frames between accepted peaks (default: 10)
    pub wait: usize,
    /// Frames closer than this on the diagonal are not neighbours (default: 1)
    pub recurrence_width: usize,
    /// Floor for the affinity bandwidth in feature units, i.e. roughly dB of MFCC (default: 10.0)
    pub min_affinity_bandwidth: f32,
    /// Label overflow policy (default: numbered)
    pub label_overflow: LabelOverflow,
    /// Segment count for agglomerative segmentation (default: 8)
    pub agglomerative_segments: usize,
}

impl Default for StructureConfig {
    fn default() -> Self {
        Self {
            pre_max: 10,
            post_max: 10,
            pre_avg: 10,
            post_avg: 10,
            delta: 0.5,
            wait: 10,
            recurrence_width: 1,
            min_affinity_bandwidth: 10.0,
            label_overflow: LabelOverflow::Numbered,
            agglomerative_segments: 8,
        }
    }
}

/// Pattern mining parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternConfig {
    /// Inter-onset interval bucket width in seconds (default: 0.1)
    pub interval_resolution: f32,
    /// Number of common intervals reported (default: 5)
    pub common_interval_count: usize,
    /// Maximum distinct melodic intervals reported (default: 10)
    pub melodic_interval_limit: usize,
    /// Chroma frames between harmonic windows (default: 43, about 0.5 s)
    pub harmonic_window_frames: usize,
    /// Chroma frames averaged per harmonic window (default: 10)
    pub harmonic_span_frames: usize,
    /// Maximum distinct chroma classes reported (default: 8)
    pub harmonic_class_limit: usize,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            interval_resolution: 0.1,
            common_interval_count: 5,
            melodic_interval_limit: 10,
            harmonic_window_frames: 22_050 / 512,
            harmonic_span_frames: 10,
            harmonic_class_limit: 8,
        }
    }
}

/// Per-stem analysis parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StemConfig {
    /// Salient-peak magnitude threshold for bass pitch detection (default: 0.1)
    pub pitch_salience_threshold: f32,
    /// Lowest pitch candidate in Hz (default: 32.7)
    pub pitch_fmin: f32,
    /// Highest pitch candidate in Hz (default: 4000.0)
    pub pitch_fmax: f32,
}

impl Default for StemConfig {
    fn default() -> Self {
        Self {
            pitch_salience_threshold: 0.1,
            pitch_fmin: 32.7,
            pitch_fmax: 4000.0,
        }
    }
}

/// Transcription decoding and reporting parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionConfig {
    /// Notes listed in the report (default: 50)
    pub report_note_limit: usize,
    /// Onset posterior needed to start a note (default: 0.5)
    pub onset_threshold: f32,
    /// Frame posterior needed to sustain a note (default: 0.3)
    pub frame_threshold: f32,
    /// Shortest note kept, in model frames (default: 11)
    pub min_note_frames: usize,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            report_note_limit: 50,
            onset_threshold: 0.5,
            frame_threshold: 0.3,
            min_note_frames: 11,
        }
    }
}

/// Optional model locations and runtime options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Source separation ONNX model
    pub separation: Option<PathBuf>,
    /// Polyphonic transcription ONNX model
    pub transcription: Option<PathBuf>,
    /// Audio embedding ONNX model
    pub embeddings: Option<PathBuf>,
    /// Stem names in separation output order
    pub stem_names: Vec<String>,
    /// Sample rate the separation model was trained at (default: 44100)
    pub separation_sample_rate: u32,
    /// Separation segment length in seconds (default: 7.8)
    pub separation_segment_seconds: f32,
    /// Embedding chunk length in seconds (default: 10.0)
    pub embedding_chunk_seconds: f32,
    /// Inference device (`cpu` or `cuda`)
    pub device: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            separation: None,
            transcription: None,
            embeddings: None,
            stem_names: vec![
                "drums".to_string(),
                "bass".to_string(),
                "other".to_string(),
                "vocals".to_string(),
            ],
            separation_sample_rate: PROJECT_SAMPLE_RATE,
            separation_segment_seconds: 7.8,
            embedding_chunk_seconds: 10.0,
            device: "cpu".to_string(),
        }
    }
}

/// Report layout parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Beat positions listed in the report (default: 20)
    pub beat_position_limit: usize,
    /// Sections printed in the summary (default: 5)
    pub summary_sections: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            beat_position_limit: 20,
            summary_sections: 5,
        }
    }
}

impl AnalysisConfig {
    /// Load a JSON configuration file and validate it
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            AnalysisError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: AnalysisConfig = serde_json::from_str(&text)
            .map_err(|e| AnalysisError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Fill unset model paths from the environment
    pub fn with_env_overrides(mut self) -> Self {
        let read = |name: &str| std::env::var_os(name).map(PathBuf::from);
        if let Some(p) = read(SEPARATION_MODEL_ENV) {
            self.models.separation = Some(p);
        }
        if let Some(p) = read(TRANSCRIPTION_MODEL_ENV) {
            self.models.transcription = Some(p);
        }
        if let Some(p) = read(EMBEDDING_MODEL_ENV) {
            self.models.embeddings = Some(p);
        }
        self
    }

    /// Check parameter ranges
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(AnalysisError::Config("sample_rate must be > 0".to_string()));
        }
        if self.stft.frame_size == 0 || self.stft.hop_size == 0 {
            return Err(AnalysisError::Config(
                "stft.frame_size and stft.hop_size must be > 0".to_string(),
            ));
        }
        if self.stft.hop_size > self.stft.frame_size {
            return Err(AnalysisError::Config(format!(
                "stft.hop_size ({}) must not exceed stft.frame_size ({})",
                self.stft.hop_size, self.stft.frame_size
            )));
        }
        if self.mfcc.n_mfcc == 0 || self.mfcc.n_mels < self.mfcc.n_mfcc {
            return Err(AnalysisError::Config(format!(
                "mfcc.n_mels ({}) must be >= mfcc.n_mfcc ({}) > 0",
                self.mfcc.n_mels, self.mfcc.n_mfcc
            )));
        }
        if self.beat.min_bpm <= 0.0 || self.beat.max_bpm <= self.beat.min_bpm {
            return Err(AnalysisError::Config(format!(
                "beat range [{}, {}] is invalid",
                self.beat.min_bpm, self.beat.max_bpm
            )));
        }
        if self.patterns.interval_resolution <= 0.0 {
            return Err(AnalysisError::Config(
                "patterns.interval_resolution must be > 0".to_string(),
            ));
        }
        if self.patterns.harmonic_window_frames == 0 || self.patterns.harmonic_span_frames == 0 {
            return Err(AnalysisError::Config(
                "patterns harmonic window sizes must be > 0".to_string(),
            ));
        }
        if self.structure.agglomerative_segments == 0 {
            return Err(AnalysisError::Config(
                "structure.agglomerative_segments must be > 0".to_string(),
            ));
        }
        if self.models.separation_sample_rate == 0 {
            return Err(AnalysisError::Config(
                "models.separation_sample_rate must be > 0".to_string(),
            ));
        }
        if self.models.stem_names.is_empty() {
            return Err(AnalysisError::Config(
                "models.stem_names must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = AnalysisConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.sample_rate, 44_100);
        assert_eq!(config.stft.hop_size, 512);
        assert_eq!(config.patterns.harmonic_window_frames, 43);
        assert_eq!(config.structure.label_overflow, LabelOverflow::Numbered);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "structure": {{ "delta": 0.25, "label_overflow": "repeat_last" }} }}"#
        )
        .unwrap();

        let config = AnalysisConfig::load(file.path()).unwrap();
        assert!((config.structure.delta - 0.25).abs() < 1e-6);
        assert_eq!(config.structure.label_overflow, LabelOverflow::RepeatLast);
        assert_eq!(config.structure.wait, 10);
        assert_eq!(config.stft.frame_size, 2048);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = AnalysisConfig::default();
        config.stft.hop_size = 4096;
        assert!(matches!(config.validate(), Err(AnalysisError::Config(_))));

        let mut config = AnalysisConfig::default();
        config.mfcc.n_mels = 8;
        assert!(config.validate().is_err());

        let mut config = AnalysisConfig::default();
        config.beat.max_bpm = 10.0;
        assert!(config.validate().is_err());

        let mut config = AnalysisConfig::default();
        config.models.separation_sample_rate = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_separation_rate_from_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "models": {{ "separation_sample_rate": 48000 }} }}"#).unwrap();

        let config = AnalysisConfig::load(file.path()).unwrap();
        assert_eq!(config.models.separation_sample_rate, 48000);
        assert_eq!(config.models.stem_names.len(), 4);
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let result = AnalysisConfig::load("/nonexistent/config.json");
        assert!(matches!(result, Err(AnalysisError::Config(_))));
    }
}
