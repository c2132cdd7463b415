//! Feature extraction modules
//!
//! This module contains the acoustic primitives the analysis stages build on:
//! - STFT framing shared by every time-indexed feature
//! - Chroma, MFCC and RMS dynamics
//! - Onset detection, tempo estimation and beat tracking
//! - Spectral centroid and pitch salience
//! - Key estimation
//! - Windowed peak picking

pub mod beat_tracking;
pub mod chroma;
pub mod dynamics;
pub mod extractor;
pub mod key;
pub mod mfcc;
pub mod onset;
pub mod peak_picking;
pub mod spectral;
pub mod spectrogram;

pub use extractor::{FeatureBundle, FeatureExtractor};
