//! Mel-frequency cepstral coefficients
//!
//! Pipeline: power spectrogram → triangular mel filterbank (HTK mel scale)
//! → dB with a `top_db` floor → orthonormal DCT-II → first `n_mfcc`
//! coefficients. The log-mel stage is shared with onset detection.

use crate::config::MfccConfig;
use crate::features::spectrogram::Spectrogram;

/// Power floor before taking the logarithm
const AMIN: f32 = 1e-10;

fn hz_to_mel(hz: f32) -> f32 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

fn mel_to_hz(mel: f32) -> f32 {
    700.0 * (10f32.powf(mel / 2595.0) - 1.0)
}

/// Triangular mel filterbank (n_mels × n_bins), area-normalized
///
/// # Arguments
///
/// * `n_mels` - Number of mel bands
/// * `frame_size` - FFT size
/// * `sample_rate` - Sample rate in Hz
/// * `fmin` - Lowest band edge in Hz
/// * `fmax` - Highest band edge in Hz (clamped to Nyquist)
pub fn mel_filterbank(
    n_mels: usize,
    frame_size: usize,
    sample_rate: u32,
    fmin: f32,
    fmax: f32,
) -> Vec<Vec<f32>> {
    let n_bins = frame_size / 2 + 1;
    let nyquist = sample_rate as f32 / 2.0;
    let fmax = if fmax <= 0.0 || fmax > nyquist { nyquist } else { fmax };

    let mel_min = hz_to_mel(fmin.max(0.0));
    let mel_max = hz_to_mel(fmax);
    let edges: Vec<f32> = (0..n_mels + 2)
        .map(|i| mel_to_hz(mel_min + (mel_max - mel_min) * i as f32 / (n_mels + 1) as f32))
        .collect();
    let bin_freqs: Vec<f32> = (0..n_bins)
        .map(|k| k as f32 * sample_rate as f32 / frame_size as f32)
        .collect();

    (0..n_mels)
        .map(|m| {
            let (lo, centre, hi) = (edges[m], edges[m + 1], edges[m + 2]);
            let norm = 2.0 / (hi - lo).max(f32::EPSILON);
            bin_freqs
                .iter()
                .map(|&f| {
                    let rising = (f - lo) / (centre - lo).max(f32::EPSILON);
                    let falling = (hi - f) / (hi - centre).max(f32::EPSILON);
                    rising.min(falling).max(0.0) * norm
                })
                .collect()
        })
        .collect()
}

/// Convert power values to dB, floored at `max - top_db`
pub fn power_to_db(frames: &mut [Vec<f32>], top_db: f32) {
    let mut global_max = f32::NEG_INFINITY;
    for frame in frames.iter_mut() {
        for x in frame.iter_mut() {
            *x = 10.0 * x.max(AMIN).log10();
            global_max = global_max.max(*x);
        }
    }
    if top_db > 0.0 && global_max.is_finite() {
        let floor = global_max - top_db;
        for x in frames.iter_mut().flat_map(|f| f.iter_mut()) {
            *x = x.max(floor);
        }
    }
}

/// Log-mel spectrogram in dB (n_frames × n_mels)
pub fn log_mel_spectrogram(spec: &Spectrogram, config: &MfccConfig) -> Vec<Vec<f32>> {
    let filterbank = mel_filterbank(
        config.n_mels,
        spec.frame_size,
        spec.sample_rate,
        config.fmin,
        config.fmax,
    );
    let mut mel: Vec<Vec<f32>> = spec
        .magnitudes
        .iter()
        .map(|frame| {
            filterbank
                .iter()
                .map(|band| {
                    band.iter()
                        .zip(frame)
                        .map(|(w, m)| w * m * m)
                        .sum::<f32>()
                })
                .collect()
        })
        .collect();
    power_to_db(&mut mel, config.top_db);
    mel
}

/// Orthonormal DCT-II basis (n_mfcc × n_mels)
fn dct_basis(n_mfcc: usize, n_mels: usize) -> Vec<Vec<f32>> {
    let n = n_mels as f32;
    (0..n_mfcc)
        .map(|k| {
            let scale = if k == 0 { (1.0 / n).sqrt() } else { (2.0 / n).sqrt() };
            (0..n_mels)
                .map(|i| {
                    scale
                        * (std::f32::consts::PI * k as f32 * (i as f32 + 0.5) / n).cos()
                })
                .collect()
        })
        .collect()
}

/// MFCC frames from a log-mel spectrogram
///
/// # Returns
///
/// One `n_mfcc`-element coefficient vector per frame
pub fn extract_mfcc(log_mel: &[Vec<f32>], n_mfcc: usize) -> Vec<Vec<f32>> {
    let n_mels = log_mel.first().map(Vec::len).unwrap_or(0);
    log::debug!(
        "Computing {} MFCCs from {} mel frames ({} bands)",
        n_mfcc,
        log_mel.len(),
        n_mels
    );
    let basis = dct_basis(n_mfcc, n_mels);
    log_mel
        .iter()
        .map(|frame| {
            basis
                .iter()
                .map(|row| row.iter().zip(frame).map(|(b, x)| b * x).sum())
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mel_scale_roundtrip() {
        for hz in [0.0, 440.0, 1000.0, 8000.0] {
            assert!((mel_to_hz(hz_to_mel(hz)) - hz).abs() < 0.05);
        }
        assert!((hz_to_mel(1000.0) - 1000.0).abs() < 1.0);
    }

    #[test]
    fn test_filterbank_shape() {
        let fb = mel_filterbank(40, 2048, 44100, 0.0, 0.0);
        assert_eq!(fb.len(), 40);
        assert!(fb.iter().all(|band| band.len() == 1025));
        assert!(fb.iter().all(|band| band.iter().all(|&w| w >= 0.0)));
        // each band covers at least one bin
        assert!(fb.iter().skip(2).all(|band| band.iter().any(|&w| w > 0.0)));
    }

    #[test]
    fn test_power_to_db_floor() {
        let mut frames = vec![vec![1.0, 1e-3, 0.0]];
        power_to_db(&mut frames, 80.0);
        assert!((frames[0][0] - 0.0).abs() < 1e-5);
        assert!((frames[0][1] + 30.0).abs() < 1e-3);
        assert!((frames[0][2] + 80.0).abs() < 1e-3);
    }

    #[test]
    fn test_constant_log_mel_has_only_dc() {
        let log_mel = vec![vec![-20.0f32; 40]; 3];
        let mfcc = extract_mfcc(&log_mel, 13);
        assert_eq!(mfcc.len(), 3);
        assert_eq!(mfcc[0].len(), 13);
        assert!((mfcc[0][0] - (-20.0 * 40f32.sqrt())).abs() < 1e-3);
        assert!(mfcc[0][1..].iter().all(|c| c.abs() < 1e-3));
    }

    #[test]
    fn test_mfcc_of_sine_is_deterministic() {
        let samples: Vec<f32> = (0..22050)
            .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 44100.0).sin())
            .collect();
        let spec = Spectrogram::compute(&samples, 44100, 2048, 512).unwrap();
        let config = MfccConfig::default();
        let a = extract_mfcc(&log_mel_spectrogram(&spec, &config), 13);
        let b = extract_mfcc(&log_mel_spectrogram(&spec, &config), 13);
        assert_eq!(a, b);
        assert_eq!(a.len(), spec.n_frames());
    }
}
