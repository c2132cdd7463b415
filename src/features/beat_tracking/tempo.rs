//! Global tempo estimation
//!
//! Autocorrelation of the onset strength envelope, weighted by a log-normal
//! prior centred on `start_bpm`:
//!
//! 1. `ACF = IFFT(|FFT(envelope)|²)` (zero-padded, FFT-accelerated)
//! 2. Restrict lags to the `[min_bpm, max_bpm]` range
//! 3. Weight each lag by `exp(-0.5 * (log2(bpm / start_bpm) / std)^2)`
//! 4. Refine the best lag with parabolic interpolation

use crate::config::BeatConfig;
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

const EPSILON: f32 = 1e-10;

/// FFT-accelerated autocorrelation of `signal` (mean removed)
pub fn autocorrelation(signal: &[f32]) -> Vec<f32> {
    let n = signal.len();
    if n == 0 {
        return Vec::new();
    }
    let mean = signal.iter().sum::<f32>() / n as f32;
    let fft_size = (2 * n).next_power_of_two();

    let mut buffer: Vec<Complex<f32>> = signal
        .iter()
        .map(|&x| Complex::new(x - mean, 0.0))
        .collect();
    buffer.resize(fft_size, Complex::new(0.0, 0.0));

    let mut planner = FftPlanner::new();
    planner.plan_fft_forward(fft_size).process(&mut buffer);
    for x in &mut buffer {
        *x = Complex::new(x.norm_sqr(), 0.0);
    }
    planner.plan_fft_inverse(fft_size).process(&mut buffer);

    let scale = 1.0 / fft_size as f32;
    buffer[..n].iter().map(|x| x.re * scale).collect()
}

/// Tempo prior weight for `bpm`
fn prior_weight(bpm: f32, config: &BeatConfig) -> f32 {
    let octaves = (bpm / config.start_bpm).log2() / config.prior_std_octaves.max(EPSILON);
    (-0.5 * octaves * octaves).exp()
}

/// Estimate the global tempo in BPM
///
/// # Arguments
///
/// * `envelope` - Onset strength envelope
/// * `frame_rate` - Envelope frames per second (`sample_rate / hop_size`)
/// * `config` - Tempo range and prior
///
/// # Returns
///
/// Tempo in BPM, or 0.0 when the envelope is too short or carries no
/// periodicity within the configured range
pub fn estimate_tempo(envelope: &[f32], frame_rate: f32, config: &BeatConfig) -> f32 {
    let lag_min = ((60.0 * frame_rate / config.max_bpm).floor() as usize).max(1);
    let lag_max = (60.0 * frame_rate / config.min_bpm).ceil() as usize;

    let acf = autocorrelation(envelope);
    if acf.len() <= lag_min + 1 || acf[0] <= EPSILON {
        log::debug!("Envelope too short or flat for tempo estimation");
        return 0.0;
    }
    let lag_max = lag_max.min(acf.len() - 2);

    let mut best: Option<(usize, f32)> = None;
    for lag in lag_min..=lag_max {
        let bpm = 60.0 * frame_rate / lag as f32;
        let score = acf[lag].max(0.0) * prior_weight(bpm, config);
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((lag, score));
        }
    }

    let (lag, score) = match best {
        Some(b) if b.1 > EPSILON => b,
        _ => return 0.0,
    };

    // parabolic refinement on the raw ACF
    let (a, b, c) = (acf[lag - 1], acf[lag], acf[lag + 1]);
    let denom = a - 2.0 * b + c;
    let offset = if denom.abs() > EPSILON {
        (0.5 * (a - c) / denom).clamp(-0.5, 0.5)
    } else {
        0.0
    };
    let period = lag as f32 + offset;
    let tempo = 60.0 * frame_rate / period;

    log::debug!(
        "Tempo estimate: lag {} (+{:.3}) -> {:.2} BPM (score {:.4})",
        lag,
        offset,
        tempo,
        score
    );
    tempo
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pulse_train(period_frames: usize, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| if i % period_frames == 0 { 1.0 } else { 0.0 })
            .collect()
    }

    #[test]
    fn test_autocorrelation_peaks_at_period() {
        let acf = autocorrelation(&pulse_train(10, 200));
        assert!(acf[10] > acf[5]);
        assert!(acf[20] > acf[15]);
    }

    #[test]
    fn test_120_bpm_pulse_train() {
        // 44100 / 512 ≈ 86.13 fps; 120 BPM ≈ 43.07 frames per beat
        let frame_rate = 44100.0 / 512.0;
        let envelope = pulse_train(43, 1000);
        let tempo = estimate_tempo(&envelope, frame_rate, &BeatConfig::default());
        assert!((tempo - 120.0).abs() < 3.0, "tempo {}", tempo);
    }

    #[test]
    fn test_flat_envelope_has_no_tempo() {
        let frame_rate = 44100.0 / 512.0;
        assert_eq!(estimate_tempo(&vec![0.0; 500], frame_rate, &BeatConfig::default()), 0.0);
        assert_eq!(estimate_tempo(&[], frame_rate, &BeatConfig::default()), 0.0);
    }

    #[test]
    fn test_prior_prefers_start_bpm() {
        let config = BeatConfig::default();
        assert!((prior_weight(120.0, &config) - 1.0).abs() < 1e-6);
        assert!(prior_weight(240.0, &config) < prior_weight(150.0, &config));
    }
}
