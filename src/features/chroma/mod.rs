//! Chroma extraction modules
//!
//! Extract pitch-class distribution (12 semitones) from a magnitude spectrogram:
//! - Chroma vector computation with soft semitone mapping
//! - Per-frame normalization

pub mod extractor;
pub mod normalization;

pub use extractor::extract_chroma;

/// Number of pitch classes
pub const N_CHROMA: usize = 12;
