//! Immutable multi-channel audio buffer

use crate::error::{AnalysisError, Result};
use crate::preprocessing::channel_mixer::mix_to_mono;

/// Decoded audio: planar channels at a known sample rate
///
/// The buffer is never mutated after construction; analysis stages borrow it
/// and work on mono reductions produced by [`AudioSignal::to_mono`].
#[derive(Debug, Clone)]
pub struct AudioSignal {
    channels: Vec<Vec<f32>>,
    sample_rate: u32,
}

impl AudioSignal {
    /// Create a signal from planar channel data
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` if there are no channels, the
    /// channels differ in length, or the sample rate is zero.
    pub fn new(channels: Vec<Vec<f32>>, sample_rate: u32) -> Result<Self> {
        if channels.is_empty() {
            return Err(AnalysisError::InvalidInput(
                "Audio signal needs at least one channel".to_string(),
            ));
        }
        if sample_rate == 0 {
            return Err(AnalysisError::InvalidInput("Invalid sample rate".to_string()));
        }
        let len = channels[0].len();
        if let Some((i, ch)) = channels.iter().enumerate().find(|(_, c)| c.len() != len) {
            return Err(AnalysisError::InvalidInput(format!(
                "Inconsistent channel lengths: channel 0 has {} samples, channel {} has {}",
                len,
                i,
                ch.len()
            )));
        }
        Ok(Self {
            channels,
            sample_rate,
        })
    }

    /// Create a single-channel signal
    pub fn from_mono(samples: Vec<f32>, sample_rate: u32) -> Result<Self> {
        Self::new(vec![samples], sample_rate)
    }

    /// Create a signal from interleaved samples
    pub fn from_interleaved(samples: &[f32], channel_count: usize, sample_rate: u32) -> Result<Self> {
        if channel_count == 0 {
            return Err(AnalysisError::InvalidInput(
                "Channel count must be > 0".to_string(),
            ));
        }
        let frames = samples.len() / channel_count;
        let mut channels = vec![Vec::with_capacity(frames); channel_count];
        for frame in samples.chunks_exact(channel_count) {
            for (ch, &s) in channels.iter_mut().zip(frame) {
                ch.push(s);
            }
        }
        Self::new(channels, sample_rate)
    }

    /// Planar channel data
    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    /// Number of channels
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Samples per channel
    pub fn len(&self) -> usize {
        self.channels[0].len()
    }

    /// True if the signal holds no samples
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Duration in seconds
    pub fn duration_seconds(&self) -> f32 {
        self.len() as f32 / self.sample_rate as f32
    }

    /// Channel-averaged mono samples
    pub fn to_mono(&self) -> Vec<f32> {
        mix_to_mono(&self.channels)
    }

    /// Interleaved samples (frame-major), as audio writers expect
    pub fn interleaved(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.len() * self.channel_count());
        for i in 0..self.len() {
            for ch in &self.channels {
                out.push(ch[i]);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_mismatched_channels() {
        let result = AudioSignal::new(vec![vec![0.0; 10], vec![0.0; 9]], 44100);
        assert!(result.is_err());
        assert!(AudioSignal::new(vec![], 44100).is_err());
        assert!(AudioSignal::from_mono(vec![0.0; 4], 0).is_err());
    }

    #[test]
    fn test_interleaved_roundtrip_layout() {
        let signal = AudioSignal::from_interleaved(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 2, 8000).unwrap();
        assert_eq!(signal.channel_count(), 2);
        assert_eq!(signal.channels()[0], vec![1.0, 3.0, 5.0]);
        assert_eq!(signal.channels()[1], vec![2.0, 4.0, 6.0]);
        assert_eq!(signal.interleaved(), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_duration_and_mono() {
        let signal = AudioSignal::new(vec![vec![1.0; 22050], vec![0.0; 22050]], 44100).unwrap();
        assert!((signal.duration_seconds() - 0.5).abs() < 1e-6);
        let mono = signal.to_mono();
        assert_eq!(mono.len(), 22050);
        assert!((mono[0] - 0.5).abs() < 1e-6);
    }
}
