//! Short-time Fourier transform
//!
//! Every time-indexed feature (chroma, MFCC, RMS, onset strength) is derived
//! from the same framing: frame `t` covers samples `[t * hop, t * hop + n_fft)`
//! with no centering, so frame indices are comparable across features and
//! `frames_to_time` is a plain `t * hop / sample_rate`.

use crate::error::AnalysisError;
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

/// Magnitude spectrogram (n_frames × n_bins, n_bins = n_fft / 2 + 1)
#[derive(Debug, Clone)]
pub struct Spectrogram {
    /// Raw STFT magnitudes, one `Vec` per frame
    pub magnitudes: Vec<Vec<f32>>,
    /// Sample rate of the analysed signal
    pub sample_rate: u32,
    /// FFT size in samples
    pub frame_size: usize,
    /// Hop size in samples
    pub hop_size: usize,
}

/// Number of frames produced for `len` samples
///
/// Non-empty signals shorter than one frame still yield a single zero-padded
/// frame.
pub fn frame_count(len: usize, frame_size: usize, hop_size: usize) -> usize {
    if len == 0 {
        0
    } else if len <= frame_size {
        1
    } else {
        1 + (len - frame_size) / hop_size
    }
}

/// Convert frame indices to seconds
pub fn frames_to_time(frames: &[usize], sample_rate: u32, hop_size: usize) -> Vec<f32> {
    frames
        .iter()
        .map(|&f| frame_to_time(f, sample_rate, hop_size))
        .collect()
}

/// Convert a single frame index to seconds
pub fn frame_to_time(frame: usize, sample_rate: u32, hop_size: usize) -> f32 {
    (frame * hop_size) as f32 / sample_rate as f32
}

/// Periodic Hann window
fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| {
            let t = 2.0 * std::f32::consts::PI * i as f32 / size as f32;
            0.5 * (1.0 - t.cos())
        })
        .collect()
}

impl Spectrogram {
    /// Compute the magnitude STFT of mono samples
    ///
    /// # Arguments
    ///
    /// * `samples` - Mono audio samples
    /// * `sample_rate` - Sample rate in Hz
    /// * `frame_size` - FFT size (default: 2048)
    /// * `hop_size` - Hop size (default: 512)
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` for a zero sample rate, frame or hop size
    pub fn compute(
        samples: &[f32],
        sample_rate: u32,
        frame_size: usize,
        hop_size: usize,
    ) -> Result<Self, AnalysisError> {
        if sample_rate == 0 {
            return Err(AnalysisError::InvalidInput("Invalid sample rate".to_string()));
        }
        if frame_size == 0 || hop_size == 0 {
            return Err(AnalysisError::InvalidInput(
                "Frame size and hop size must be > 0".to_string(),
            ));
        }

        let n_frames = frame_count(samples.len(), frame_size, hop_size);
        let n_bins = frame_size / 2 + 1;
        log::debug!(
            "Computing STFT: {} samples, n_fft={}, hop={}, {} frames",
            samples.len(),
            frame_size,
            hop_size,
            n_frames
        );

        let window = hann_window(frame_size);
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(frame_size);
        let mut buffer = vec![Complex::new(0.0f32, 0.0); frame_size];
        let mut magnitudes = Vec::with_capacity(n_frames);

        for t in 0..n_frames {
            let start = t * hop_size;
            for (i, slot) in buffer.iter_mut().enumerate() {
                let x = samples.get(start + i).copied().unwrap_or(0.0);
                *slot = Complex::new(x * window[i], 0.0);
            }
            fft.process(&mut buffer);
            magnitudes.push(buffer[..n_bins].iter().map(|c| c.norm()).collect());
        }

        Ok(Self {
            magnitudes,
            sample_rate,
            frame_size,
            hop_size,
        })
    }

    /// Number of frames
    pub fn n_frames(&self) -> usize {
        self.magnitudes.len()
    }

    /// Number of frequency bins per frame
    pub fn n_bins(&self) -> usize {
        self.frame_size / 2 + 1
    }

    /// Centre frequency of bin `k` in Hz
    pub fn bin_frequency(&self, k: usize) -> f32 {
        k as f32 * self.sample_rate as f32 / self.frame_size as f32
    }

    /// Frequencies of all bins in Hz
    pub fn frequencies(&self) -> Vec<f32> {
        (0..self.n_bins()).map(|k| self.bin_frequency(k)).collect()
    }

    /// Power spectrogram (squared magnitudes)
    pub fn power(&self) -> Vec<Vec<f32>> {
        self.magnitudes
            .iter()
            .map(|frame| frame.iter().map(|m| m * m).collect())
            .collect()
    }

    /// Frame start times in seconds
    pub fn times(&self) -> Vec<f32> {
        (0..self.n_frames())
            .map(|t| frame_to_time(t, self.sample_rate, self.hop_size))
            .collect()
    }
}
