//! Audio I/O modules
//!
//! Decoding with Symphonia, resampling with rubato, and the artifact writers
//! (stem WAVs, transcription MIDI, JSON reports).

pub mod decoder;
pub mod midi;
pub mod report;
pub mod resample;
pub mod signal;
pub mod wav;

pub use decoder::{decode_audio, load_audio};
pub use signal::AudioSignal;
