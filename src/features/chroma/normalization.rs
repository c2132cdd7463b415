//! Chroma normalization strategies

const EPSILON: f32 = 1e-10;

/// Scale a chroma vector so its largest bin is 1.0
///
/// Frames without energy are left at zero rather than divided by noise.
///
/// # Arguments
///
/// * `chroma` - 12-element chroma vector, modified in place
pub fn normalize_max(chroma: &mut [f32]) {
    let max = chroma.iter().copied().fold(0.0f32, f32::max);
    if max > EPSILON {
        for c in chroma.iter_mut() {
            *c /= max;
        }
    } else {
        chroma.iter_mut().for_each(|c| *c = 0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_max() {
        let mut chroma = vec![0.0, 2.0, 1.0, 0.5];
        normalize_max(&mut chroma);
        assert_eq!(chroma, vec![0.0, 1.0, 0.5, 0.25]);
    }

    #[test]
    fn test_silent_frame_stays_zero() {
        let mut chroma = vec![1e-12; 12];
        normalize_max(&mut chroma);
        assert!(chroma.iter().all(|&c| c == 0.0));
    }
}
