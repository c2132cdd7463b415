//! Musical pattern mining
//!
//! Summaries over the outputs of the lower-level stages:
//! - Rhythmic: inter-onset interval histogram in coarse buckets
//! - Melodic: signed pitch steps between consecutive transcribed notes
//! - Harmonic: dominant chroma class per ~0.5 s window
//!
//! Each part is optional and simply absent when its input is too small.

use crate::backends::NoteEvent;
use crate::config::PatternConfig;
use crate::features::key::argmax;
use serde::Serialize;
use std::collections::BTreeMap;

/// Dominant inter-onset intervals and their spread
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RhythmicPattern {
    /// Most frequent interval buckets in seconds, most frequent first
    pub common_intervals: Vec<f32>,
    /// Standard deviation of the inter-onset intervals in seconds
    pub tempo_stability: f32,
}

/// Lowest and highest MIDI pitch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PitchRange {
    /// Lowest pitch
    pub min: u8,
    /// Highest pitch
    pub max: u8,
}

impl PitchRange {
    /// Range over `notes`; `0..0` when there are none
    pub fn from_notes(notes: &[NoteEvent]) -> Self {
        let min = notes.iter().map(|n| n.pitch).min();
        let max = notes.iter().map(|n| n.pitch).max();
        match (min, max) {
            (Some(min), Some(max)) => Self { min, max },
            _ => Self::default(),
        }
    }
}

/// Transcribed notes handed to melodic analysis
///
/// `notes` may be a leading subset of the transcription while `pitch_range`
/// still covers every note.
#[derive(Debug, Clone, Copy)]
pub struct TranscribedNotes<'a> {
    /// Notes in start order
    pub notes: &'a [NoteEvent],
    /// Range over the whole transcription
    pub pitch_range: PitchRange,
}

impl<'a> TranscribedNotes<'a> {
    /// Wrap a complete transcription
    pub fn complete(notes: &'a [NoteEvent]) -> Self {
        Self {
            notes,
            pitch_range: PitchRange::from_notes(notes),
        }
    }
}

/// Pitch-step statistics over consecutive notes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MelodicPattern {
    /// Distinct signed intervals in semitones, in order of first appearance
    pub common_intervals: Vec<i16>,
    /// Number of distinct intervals
    pub interval_variety: usize,
    /// Pitch range of the notes
    pub pitch_range: PitchRange,
}

/// Dominant chroma classes over fixed windows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HarmonicPattern {
    /// Distinct dominant pitch classes (0 = C), in order of first appearance
    pub common_chords: Vec<usize>,
    /// Number of window-to-window class changes
    pub chord_changes: usize,
}

/// Pattern stage output
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PatternSummary {
    /// Present with at least two onsets
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rhythmic: Option<RhythmicPattern>,
    /// Present with at least two notes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub melodic: Option<MelodicPattern>,
    /// Present when at least one full window fits
    #[serde(skip_serializing_if = "Option::is_none")]
    pub harmonic: Option<HarmonicPattern>,
}

/// Rhythmic pattern from onset times in seconds
///
/// Intervals are bucketed by `ioi / resolution` rounded half to even; the
/// `common_interval_count` most populated buckets are reported (ties go to
/// the shorter interval). Returns `None` with fewer than two onsets.
pub fn rhythmic_pattern(onset_times: &[f32], config: &PatternConfig) -> Option<RhythmicPattern> {
    if onset_times.len() < 2 {
        return None;
    }
    let intervals: Vec<f32> = onset_times.windows(2).map(|w| w[1] - w[0]).collect();
    let resolution = config.interval_resolution;

    let mut histogram: BTreeMap<i64, usize> = BTreeMap::new();
    for &ioi in &intervals {
        *histogram.entry((ioi / resolution).round_ties_even() as i64).or_insert(0) += 1;
    }
    let mut buckets: Vec<(i64, usize)> = histogram.into_iter().collect();
    buckets.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    let common_intervals = buckets
        .iter()
        .take(config.common_interval_count)
        .map(|&(bucket, _)| round3(bucket as f32 * resolution))
        .collect();

    let n = intervals.len() as f64;
    let mean = intervals.iter().map(|&x| x as f64).sum::<f64>() / n;
    let var = intervals
        .iter()
        .map(|&x| (x as f64 - mean).powi(2))
        .sum::<f64>()
        / n;

    Some(RhythmicPattern {
        common_intervals,
        tempo_stability: var.sqrt() as f32,
    })
}

fn round3(x: f32) -> f32 {
    (x * 1000.0).round() / 1000.0
}

/// Push `value` onto `out` unless already present
fn push_distinct<T: PartialEq + Copy>(out: &mut Vec<T>, value: T) {
    if !out.contains(&value) {
        out.push(value);
    }
}

/// Melodic pattern from notes ordered by start time
///
/// Intervals come from `input.notes`, the range from `input.pitch_range`.
/// Returns `None` with fewer than two notes.
pub fn melodic_pattern(input: &TranscribedNotes<'_>, config: &PatternConfig) -> Option<MelodicPattern> {
    if input.notes.len() < 2 {
        return None;
    }
    let mut distinct = Vec::new();
    for pair in input.notes.windows(2) {
        push_distinct(&mut distinct, pair[1].pitch as i16 - pair[0].pitch as i16);
    }
    let interval_variety = distinct.len();
    distinct.truncate(config.melodic_interval_limit);

    Some(MelodicPattern {
        common_intervals: distinct,
        interval_variety,
        pitch_range: input.pitch_range,
    })
}

/// Harmonic pattern from chroma frames
///
/// Windows start every `harmonic_window_frames` frames and average the next
/// `harmonic_span_frames` frames; a window is used only when a frame exists
/// past its span. Returns `None` when no window fits.
pub fn harmonic_pattern(chroma: &[Vec<f32>], config: &PatternConfig) -> Option<HarmonicPattern> {
    let n_frames = chroma.len();
    let span = config.harmonic_span_frames.max(1);
    let step = config.harmonic_window_frames.max(1);

    let classes: Vec<usize> = (0..n_frames)
        .step_by(step)
        .filter(|&i| i + span < n_frames)
        .filter_map(|i| {
            let window = &chroma[i..i + span];
            let dims = window[0].len();
            let mut mean = vec![0.0f32; dims];
            for frame in window {
                for (m, &x) in mean.iter_mut().zip(frame) {
                    *m += x;
                }
            }
            argmax(&mean)
        })
        .collect();

    if classes.is_empty() {
        return None;
    }

    let chord_changes = classes.windows(2).filter(|w| w[0] != w[1]).count();
    let mut common_chords = Vec::new();
    for &c in &classes {
        push_distinct(&mut common_chords, c);
    }
    common_chords.truncate(config.harmonic_class_limit);

    Some(HarmonicPattern {
        common_chords,
        chord_changes,
    })
}

/// Run all pattern analyses
///
/// # Arguments
///
/// * `onset_times` - Onset times in seconds
/// * `notes` - Transcribed notes, `None` when transcription is unavailable or failed
/// * `chroma` - Chroma frames
/// * `config` - Pattern configuration
pub fn extract_patterns(
    onset_times: &[f32],
    notes: Option<TranscribedNotes<'_>>,
    chroma: &[Vec<f32>],
    config: &PatternConfig,
) -> PatternSummary {
    let summary = PatternSummary {
        rhythmic: rhythmic_pattern(onset_times, config),
        melodic: notes.and_then(|n| melodic_pattern(&n, config)),
        harmonic: harmonic_pattern(chroma, config),
    };
    log::debug!(
        "Patterns: rhythmic={}, melodic={}, harmonic={}",
        summary.rhythmic.is_some(),
        summary.melodic.is_some(),
        summary.harmonic.is_some()
    );
    summary
}
