//! Key estimation
//!
//! The key estimate is the pitch class with the highest mean chroma energy,
//! named through the 12-entry table starting at C. No major/minor decision
//! is made.

use serde::Serialize;

/// Pitch class names, index 0 = C
pub const PITCH_CLASS_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Name of pitch class `index` (taken modulo 12)
pub fn pitch_class_name(index: usize) -> &'static str {
    PITCH_CLASS_NAMES[index % 12]
}

/// Key estimation result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyEstimate {
    /// Pitch class index (0 = C, 11 = B)
    pub index: usize,
    /// Pitch class name
    pub name: &'static str,
    /// Mean chroma value at the estimated class
    pub confidence: f32,
}

/// Index of the largest value; ties resolve to the lowest index
pub fn argmax(values: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &v) in values.iter().enumerate() {
        if best.map_or(true, |(_, b)| v > b) {
            best = Some((i, v));
        }
    }
    best.map(|(i, _)| i)
}

/// Estimate the key from a mean chroma vector
///
/// Returns `None` for an empty vector.
pub fn estimate_key(chroma_mean: &[f32]) -> Option<KeyEstimate> {
    let index = argmax(chroma_mean)?;
    let estimate = KeyEstimate {
        index,
        name: pitch_class_name(index),
        confidence: chroma_mean[index],
    };
    log::debug!(
        "Key estimate: {} (confidence {:.3})",
        estimate.name,
        estimate.confidence
    );
    Some(estimate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names() {
        assert_eq!(pitch_class_name(0), "C");
        assert_eq!(pitch_class_name(9), "A");
        assert_eq!(pitch_class_name(13), "C#");
    }

    #[test]
    fn test_estimate_key() {
        let mut chroma = vec![0.1f32; 12];
        chroma[7] = 0.9;
        let key = estimate_key(&chroma).unwrap();
        assert_eq!(key.index, 7);
        assert_eq!(key.name, "G");
        assert!((key.confidence - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_ties_pick_lowest_class() {
        assert_eq!(argmax(&[0.5, 0.5, 0.2]), Some(0));
        assert!(estimate_key(&[]).is_none());
    }
}
