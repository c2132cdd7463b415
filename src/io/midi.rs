//! Standard MIDI file export for transcribed notes

use crate::backends::NoteEvent;
use crate::error::Result;
use midly::num::{u15, u24, u28, u4, u7};
use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind};
use std::path::Path;

/// Pulses per quarter note
pub const TICKS_PER_BEAT: u16 = 480;

/// Tempo written to the file; note times are absolute so any tempo works
const EXPORT_BPM: f32 = 120.0;

const MIDI_CHANNEL: u8 = 0;

fn seconds_to_ticks(seconds: f32) -> u32 {
    let ticks_per_second = TICKS_PER_BEAT as f32 * EXPORT_BPM / 60.0;
    (seconds.max(0.0) * ticks_per_second).round() as u32
}

fn midi_velocity(velocity: f32) -> u8 {
    (velocity.clamp(0.0, 1.0) * 127.0).round().clamp(1.0, 127.0) as u8
}

/// Build the single track of note events, sorted with delta times
fn build_track(notes: &[NoteEvent]) -> Vec<TrackEvent<'static>> {
    // (tick, is_note_on, key, velocity); note-offs sort first at equal ticks
    let mut timeline: Vec<(u32, bool, u8, u8)> = Vec::with_capacity(notes.len() * 2);
    for note in notes {
        let on = seconds_to_ticks(note.start);
        let off = seconds_to_ticks(note.end()).max(on + 1);
        let key = note.pitch.min(127);
        timeline.push((on, true, key, midi_velocity(note.velocity)));
        timeline.push((off, false, key, 0));
    }
    timeline.sort_by_key(|&(tick, is_on, key, _)| (tick, is_on, key));

    let mut track = Vec::with_capacity(timeline.len() + 2);
    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::new(
            (60_000_000.0 / EXPORT_BPM) as u32,
        ))),
    });

    let mut last_tick = 0u32;
    for (tick, is_on, key, vel) in timeline {
        let message = if is_on {
            MidiMessage::NoteOn {
                key: u7::new(key),
                vel: u7::new(vel),
            }
        } else {
            MidiMessage::NoteOff {
                key: u7::new(key),
                vel: u7::new(0),
            }
        };
        track.push(TrackEvent {
            delta: u28::new(tick - last_tick),
            kind: TrackEventKind::Midi {
                channel: u4::new(MIDI_CHANNEL),
                message,
            },
        });
        last_tick = tick;
    }

    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });
    track
}

/// Write notes to a single-track MIDI file at `path`
pub fn write_midi<P: AsRef<Path>>(notes: &[NoteEvent], path: P) -> Result<()> {
    let path = path.as_ref();
    let mut smf = Smf::new(Header::new(
        Format::SingleTrack,
        Timing::Metrical(u15::new(TICKS_PER_BEAT)),
    ));
    smf.tracks.push(build_track(notes));
    smf.save(path)?;
    log::debug!("Wrote {} notes to {}", notes.len(), path.display());
    Ok(())
}
