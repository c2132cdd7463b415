//! Note decoding from frame-level posteriorgrams
//!
//! Transcription models emit per-frame activations over the 88 piano keys:
//! a `note` posteriorgram (key sounding) and an `onset` posteriorgram (key
//! struck). A note starts on an onset peak above the onset threshold and
//! lasts while the note activation stays above the frame threshold.

use super::NoteEvent;
use crate::config::TranscriptionConfig;

/// MIDI pitch of the lowest piano key (A0)
pub const LOWEST_MIDI_PITCH: u8 = 21;

/// Number of piano keys in a posteriorgram row
pub const N_KEYS: usize = 88;

fn is_onset_peak(onsets: &[Vec<f32>], t: usize, key: usize, threshold: f32) -> bool {
    let value = onsets[t][key];
    if value < threshold {
        return false;
    }
    let before = t.checked_sub(1).map_or(0.0, |p| onsets[p][key]);
    let after = onsets.get(t + 1).map_or(0.0, |row| row[key]);
    value >= before && value >= after
}

/// Decode note events from posteriorgrams
///
/// # Arguments
///
/// * `note_frames` - Note activations, `[frames][88]`
/// * `onset_frames` - Onset activations, `[frames][88]`
/// * `frame_rate` - Posteriorgram frames per second
/// * `config` - Thresholds and minimum note length
///
/// # Returns
///
/// Notes ordered by start time, then pitch
pub fn decode_notes(
    note_frames: &[Vec<f32>],
    onset_frames: &[Vec<f32>],
    frame_rate: f32,
    config: &TranscriptionConfig,
) -> Vec<NoteEvent> {
    let n_frames = note_frames.len().min(onset_frames.len());
    if n_frames == 0 || frame_rate <= 0.0 {
        return Vec::new();
    }
    let keys = note_frames[0].len().min(N_KEYS);
    let mut notes = Vec::new();

    for key in 0..keys {
        let mut t = 0;
        while t < n_frames {
            if !is_onset_peak(onset_frames, t, key, config.onset_threshold) {
                t += 1;
                continue;
            }
            let start = t;
            let mut end = t + 1;
            while end < n_frames && note_frames[end][key] >= config.frame_threshold {
                end += 1;
            }
            if end - start >= config.min_note_frames {
                let activation: f32 = (start..end).map(|f| note_frames[f][key]).sum();
                notes.push(NoteEvent {
                    pitch: LOWEST_MIDI_PITCH + key as u8,
                    start: start as f32 / frame_rate,
                    duration: (end - start) as f32 / frame_rate,
                    velocity: (activation / (end - start) as f32).clamp(0.0, 1.0),
                });
            }
            t = end;
        }
    }

    notes.sort_by(|a, b| a.start.total_cmp(&b.start).then(a.pitch.cmp(&b.pitch)));
    log::debug!("Decoded {} notes from {} frames", notes.len(), n_frames);
    notes
}
