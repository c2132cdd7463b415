//! Beat tracking modules
//!
//! Estimate a global tempo from the onset strength envelope, then place beats
//! along it:
//! - Prior-weighted autocorrelation tempo estimation
//! - Dynamic-programming beat tracking

pub mod dynamic_programming;
pub mod tempo;

pub use dynamic_programming::track_beats;
pub use tempo::estimate_tempo;

use crate::config::BeatConfig;
use crate::features::spectrogram::frames_to_time;

/// Tempo and beat positions for one envelope
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BeatTracking {
    /// Global tempo in BPM (0.0 when no periodicity was found)
    pub tempo: f32,
    /// Beat frame indices, increasing
    pub frames: Vec<usize>,
    /// Beat times in seconds
    pub times: Vec<f32>,
}

/// Estimate tempo and track beats
///
/// # Arguments
///
/// * `envelope` - Onset strength envelope
/// * `sample_rate` - Sample rate in Hz
/// * `hop_size` - Hop size of the envelope frames
/// * `config` - Tempo range, prior and tracker tightness
pub fn track(envelope: &[f32], sample_rate: u32, hop_size: usize, config: &BeatConfig) -> BeatTracking {
    let frame_rate = sample_rate as f32 / hop_size as f32;
    let tempo = estimate_tempo(envelope, frame_rate, config);
    let frames = track_beats(envelope, tempo, frame_rate, config.tightness);
    let times = frames_to_time(&frames, sample_rate, hop_size);
    log::debug!("Beat tracking: {:.2} BPM, {} beats", tempo, frames.len());
    BeatTracking {
        tempo,
        frames,
        times,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_click_envelope() {
        let envelope: Vec<f32> = (0..1000)
            .map(|i| if i % 43 == 10 { 5.0 } else { 0.0 })
            .collect();
        let result = track(&envelope, 44100, 512, &BeatConfig::default());
        assert!((result.tempo - 120.0).abs() < 3.0);
        assert!(!result.frames.is_empty());
        assert_eq!(result.frames.len(), result.times.len());
    }

    #[test]
    fn test_silent_envelope() {
        let result = track(&vec![0.0; 600], 44100, 512, &BeatConfig::default());
        assert_eq!(result, BeatTracking::default());
    }
}
