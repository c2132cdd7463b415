//! Section boundaries from recurrence novelty
//!
//! 1. Stack chroma and MFCC frames
//! 2. Build the affinity recurrence matrix
//! 3. Novelty = column-wise first difference of the matrix summed over rows,
//!    divided by the neighbour count and zero-padded at the front
//! 4. Peak-pick the novelty curve
//! 5. Convert peak frames to seconds and cut labelled sections

use super::recurrence::{stack_features, RecurrenceMatrix};
use crate::config::{LabelOverflow, StructureConfig};
use crate::error::AnalysisError;
use crate::features::peak_picking::{peak_pick, PeakPickParams};
use crate::features::spectrogram::frames_to_time;
use serde::Serialize;

/// Section label vocabulary, in song order
pub const SECTION_LABELS: [&str; 8] = [
    "intro", "verse1", "chorus1", "verse2", "chorus2", "bridge", "chorus3", "outro",
];

/// A labelled time span of the song
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section {
    /// Vocabulary label
    pub name: String,
    /// Start time in seconds
    pub start: f32,
    /// End time in seconds
    pub end: f32,
    /// `end - start`
    pub duration: f32,
}

/// Structure stage output
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StructureReport {
    /// Novelty peak times in seconds (may be empty: structure unknown)
    pub boundaries: Vec<f32>,
    /// Sections partitioning `[0, duration]`
    pub sections: Vec<Section>,
    /// Number of novelty peaks found
    pub novelty_peaks: usize,
}

/// Novelty curve from column sums: `n[0] = 0`, `n[j] = (sum(j) - sum(j - 1)) / k`
///
/// Every column holds at most `k` affinities in `(0, 1]`, so the curve lies in
/// `[-1, 1]`.
pub fn novelty_curve(rec: &RecurrenceMatrix) -> Vec<f32> {
    let sums = rec.column_sums();
    if sums.is_empty() {
        return Vec::new();
    }
    let k = rec.neighbours_per_column().max(1) as f32;
    std::iter::once(0.0)
        .chain(sums.windows(2).map(|w| (w[1] - w[0]) / k))
        .collect()
}

/// Label for the section at `position` (0-based)
pub fn section_label(position: usize, overflow: LabelOverflow) -> String {
    match SECTION_LABELS.get(position) {
        Some(label) => label.to_string(),
        None => match overflow {
            LabelOverflow::Numbered => format!("section{}", position + 1),
            LabelOverflow::RepeatLast => SECTION_LABELS[SECTION_LABELS.len() - 1].to_string(),
        },
    }
}

/// Cut `[0, duration]` at the given boundary times
///
/// Boundaries outside `(0, duration)` and duplicates are ignored, so every
/// section has `start < end` and consecutive sections share their edge.
pub fn build_sections(boundaries: &[f32], duration: f32, overflow: LabelOverflow) -> Vec<Section> {
    if duration.is_nan() || duration <= 0.0 {
        return Vec::new();
    }
    let mut edges = vec![0.0f32];
    for &b in boundaries {
        if b > 0.0 && b < duration && edges.last().map_or(true, |&last| b > last) {
            edges.push(b);
        }
    }
    edges.push(duration);

    edges
        .windows(2)
        .enumerate()
        .map(|(i, w)| Section {
            name: section_label(i, overflow),
            start: w[0],
            end: w[1],
            duration: w[1] - w[0],
        })
        .collect()
}

/// Structure segmenter bound to a configuration and frame rate
#[derive(Debug, Clone)]
pub struct StructureSegmenter {
    config: StructureConfig,
    sample_rate: u32,
    hop_size: usize,
}

impl StructureSegmenter {
    /// Create a segmenter for frames at `sample_rate / hop_size`
    pub fn new(config: StructureConfig, sample_rate: u32, hop_size: usize) -> Self {
        Self {
            config,
            sample_rate,
            hop_size,
        }
    }

    /// Segment a song from its chroma and MFCC frames
    ///
    /// # Arguments
    ///
    /// * `chroma` - Chroma frames (n_frames × 12)
    /// * `mfcc` - MFCC frames (n_frames × n_mfcc)
    /// * `duration` - Signal duration in seconds
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError` if the feature frames are malformed
    pub fn segment(
        &self,
        chroma: &[Vec<f32>],
        mfcc: &[Vec<f32>],
        duration: f32,
    ) -> Result<StructureReport, AnalysisError> {
        let features = stack_features(chroma, mfcc);
        let rec = RecurrenceMatrix::affinity(
            &features,
            self.config.recurrence_width,
            self.config.min_affinity_bandwidth,
        )?;
        let novelty = novelty_curve(&rec);
        let peaks = peak_pick(&novelty, &PeakPickParams::from_structure(&self.config));
        let boundaries = frames_to_time(&peaks, self.sample_rate, self.hop_size);
        let sections = build_sections(&boundaries, duration, self.config.label_overflow);

        if boundaries.is_empty() {
            log::info!("No structural boundaries found; structure unknown");
        } else {
            log::debug!(
                "Structure: {} novelty peaks, {} sections",
                peaks.len(),
                sections.len()
            );
        }

        Ok(StructureReport {
            novelty_peaks: peaks.len(),
            boundaries,
            sections,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_partition(sections: &[Section], duration: f32) {
        assert_eq!(sections.first().map(|s| s.start), Some(0.0));
        assert_eq!(sections.last().map(|s| s.end), Some(duration));
        for s in sections {
            assert!(s.start < s.end);
            assert!((s.duration - (s.end - s.start)).abs() < 1e-6);
        }
        for pair in sections.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
    }

    #[test]
    fn test_no_boundaries_single_section() {
        let sections = build_sections(&[], 10.0, LabelOverflow::Numbered);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].name, "intro");
        assert_partition(&sections, 10.0);
    }

    #[test]
    fn test_sections_partition_duration() {
        let sections = build_sections(&[0.0, 12.5, 12.5, 30.0, 45.0, 61.0], 60.0, LabelOverflow::Numbered);
        // 0.0 and 61.0 fall outside (0, duration), 12.5 is deduplicated
        assert_eq!(sections.len(), 4);
        assert_eq!(
            sections.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(),
            vec!["intro", "verse1", "chorus1", "verse2"]
        );
        assert_partition(&sections, 60.0);
    }

    #[test]
    fn test_label_overflow_policies() {
        let boundaries: Vec<f32> = (1..10).map(|i| i as f32 * 10.0).collect();
        let numbered = build_sections(&boundaries, 100.0, LabelOverflow::Numbered);
        assert_eq!(numbered.len(), 10);
        assert!(numbered.len() <= boundaries.len() + 1);
        assert_eq!(numbered[7].name, "outro");
        assert_eq!(numbered[8].name, "section9");
        assert_eq!(numbered[9].name, "section10");
        assert_partition(&numbered, 100.0);

        let repeated = build_sections(&boundaries, 100.0, LabelOverflow::RepeatLast);
        assert_eq!(repeated[9].name, "outro");
    }

    #[test]
    fn test_empty_duration() {
        assert!(build_sections(&[1.0], 0.0, LabelOverflow::Numbered).is_empty());
    }

    #[test]
    fn test_novelty_padding() {
        let features = vec![vec![0.0f32; 2]; 12];
        let rec = RecurrenceMatrix::affinity(&features, 1, 1.0).unwrap();
        let novelty = novelty_curve(&rec);
        assert_eq!(novelty.len(), 12);
        assert_eq!(novelty[0], 0.0);
        assert!(novelty.iter().all(|x| x.abs() < 1e-6));
    }

    #[test]
    fn test_homogeneous_song_has_one_section() {
        let chroma = vec![vec![0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0]; 400];
        let mfcc = vec![vec![-200.0; 13]; 400];
        let segmenter = StructureSegmenter::new(StructureConfig::default(), 44100, 512);
        let report = segmenter.segment(&chroma, &mfcc, 4.64).unwrap();
        assert!(report.boundaries.is_empty());
        assert_eq!(report.novelty_peaks, 0);
        assert_eq!(report.sections.len(), 1);
        assert_partition(&report.sections, 4.64);
    }

    const SR: u32 = 44100;

    /// 0.5-amplitude tone switching from `first` to `second` Hz at `switch` seconds
    fn two_tone(first: f32, second: f32, switch: f32, seconds: f32) -> Vec<f32> {
        let split = (switch * SR as f32) as usize;
        (0..(seconds * SR as f32) as usize)
            .map(|i| {
                let freq = if i < split { first } else { second };
                0.5 * (2.0 * std::f32::consts::PI * freq * i as f32 / SR as f32).sin()
            })
            .collect()
    }

    fn segment_audio(samples: &[f32]) -> StructureReport {
        let config = crate::config::AnalysisConfig::default();
        let hop = config.stft.hop_size;
        let structure = config.structure.clone();
        let bundle = crate::features::FeatureExtractor::new(config)
            .extract(samples, SR)
            .unwrap();
        StructureSegmenter::new(structure, SR, hop)
            .segment(
                &bundle.frames.chroma,
                &bundle.frames.mfcc,
                samples.len() as f32 / SR as f32,
            )
            .unwrap()
    }

    #[test]
    fn test_steady_tone_has_one_section() {
        // 440 Hz drifts against the hop and gives the busiest novelty of the plain tones
        for freq in [261.63, 440.0] {
            let report = segment_audio(&two_tone(freq, freq, 0.0, 6.0));
            assert!(
                report.boundaries.is_empty(),
                "{} Hz: {:?}",
                freq,
                report.boundaries
            );
            assert_eq!(report.sections.len(), 1);
            assert_partition(&report.sections, 6.0);
        }
    }

    #[test]
    fn test_tone_change_is_the_only_boundary() {
        let report = segment_audio(&two_tone(220.0, 330.0, 3.0, 6.0));
        assert_eq!(report.boundaries.len(), 1, "{:?}", report.boundaries);
        assert!((report.boundaries[0] - 3.0).abs() < 1.0, "{:?}", report.boundaries);
        assert_eq!(report.sections.len(), 2);
        assert_eq!(report.sections[1].name, "verse1");
        assert_partition(&report.sections, 6.0);
    }

    #[test]
    fn test_novelty_is_bounded() {
        let mut features = vec![vec![0.0f32, 0.0]; 30];
        features.push(vec![50.0, 50.0]);
        features.extend(vec![vec![10.0f32, 10.0]; 30]);
        let rec = RecurrenceMatrix::affinity(&features, 1, 1.0).unwrap();
        let novelty = novelty_curve(&rec);
        assert!(novelty.iter().all(|x| (-1.0..=1.0).contains(x)));
        // the isolated frame has no close neighbours, the next one does
        assert!(novelty[31] > 0.5, "{}", novelty[31]);
    }
}
