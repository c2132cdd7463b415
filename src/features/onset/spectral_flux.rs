//! Spectral flux onset strength
//!
//! Mean over mel bands of the half-wave rectified frame-to-frame difference
//! of the log-mel spectrogram, in dB.

/// Compute the onset strength envelope
///
/// # Arguments
///
/// * `log_mel` - Log-mel spectrogram in dB (n_frames × n_mels)
///
/// # Returns
///
/// One value per frame; frame 0 has no predecessor and is 0.0
pub fn onset_strength(log_mel: &[Vec<f32>]) -> Vec<f32> {
    if log_mel.is_empty() {
        return Vec::new();
    }
    log::debug!("Computing onset strength: {} frames", log_mel.len());

    let mut envelope = Vec::with_capacity(log_mel.len());
    envelope.push(0.0);
    for pair in log_mel.windows(2) {
        let (prev, cur) = (&pair[0], &pair[1]);
        let bands = cur.len().max(1) as f32;
        let flux: f32 = cur
            .iter()
            .zip(prev)
            .map(|(c, p)| (c - p).max(0.0))
            .sum();
        envelope.push(flux / bands);
    }
    envelope
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rising_energy_only() {
        let log_mel = vec![
            vec![-80.0, -80.0],
            vec![-20.0, -40.0],
            vec![-30.0, -50.0],
        ];
        let env = onset_strength(&log_mel);
        assert_eq!(env.len(), 3);
        assert_eq!(env[0], 0.0);
        assert!((env[1] - 50.0).abs() < 1e-5);
        assert_eq!(env[2], 0.0);
    }

    #[test]
    fn test_empty() {
        assert!(onset_strength(&[]).is_empty());
    }
}
