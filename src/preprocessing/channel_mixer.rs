//! Channel mixing utilities (multi-channel to mono conversion)

/// Average planar channels into one mono channel
///
/// Every analysis stage works on this reduction, so a stereo file and its
/// mono fold-down produce the same features.
///
/// # Arguments
///
/// * `channels` - Planar channels of equal length
///
/// # Returns
///
/// Mono samples (empty if there are no channels)
pub fn mix_to_mono(channels: &[Vec<f32>]) -> Vec<f32> {
    match channels {
        [] => Vec::new(),
        [only] => only.clone(),
        _ => {
            let len = channels.iter().map(Vec::len).min().unwrap_or(0);
            let scale = 1.0 / channels.len() as f32;
            log::debug!("Mixing {} channels to mono ({} samples)", channels.len(), len);
            (0..len)
                .map(|i| channels.iter().map(|ch| ch[i]).sum::<f32>() * scale)
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mono_passthrough() {
        let mono = mix_to_mono(&[vec![0.1, -0.2, 0.3]]);
        assert_eq!(mono, vec![0.1, -0.2, 0.3]);
    }

    #[test]
    fn test_stereo_average() {
        let mono = mix_to_mono(&[vec![1.0, 0.0, -1.0], vec![0.0, 0.0, 1.0]]);
        assert_eq!(mono, vec![0.5, 0.0, 0.0]);
    }

    #[test]
    fn test_empty() {
        assert!(mix_to_mono(&[]).is_empty());
    }
}
