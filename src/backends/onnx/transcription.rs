//! Polyphonic transcription through an ONNX model
//!
//! Model contract: input `audio` of shape `[1, samples]`, mono at 22 050 Hz;
//! outputs `note` and `onset` posteriorgrams of shape `[1, frames, 88]`.

use super::{dims, LazySession};
use crate::backends::notes::{decode_notes, N_KEYS};
use crate::backends::{Capability, CapabilityKind, NoteEvent, Transcriber};
use crate::config::{ModelConfig, TranscriptionConfig};
use crate::error::{AnalysisError, Result};
use crate::io::resample::resample_mono;
use crate::io::AudioSignal;
use ort::value::Value;

/// Model input sample rate
pub const TRANSCRIPTION_SAMPLE_RATE: u32 = 22_050;

/// ONNX note transcriber
pub struct OnnxTranscriber {
    session: LazySession,
    decoding: TranscriptionConfig,
}

impl OnnxTranscriber {
    /// Transcriber for the configured model and note decoding thresholds
    pub fn new(config: &ModelConfig, decoding: TranscriptionConfig) -> Self {
        Self {
            session: LazySession::new(
                CapabilityKind::Transcription,
                config.transcription.clone(),
                &config.device,
            ),
            decoding,
        }
    }
}

/// Split a `[1, frames, 88]` tensor into rows
fn rows(shape: &[usize], data: &[f32]) -> Option<Vec<Vec<f32>>> {
    let (frames, keys) = match shape {
        [1, frames, keys] | [frames, keys] => (*frames, *keys),
        _ => return None,
    };
    if keys != N_KEYS || data.len() < frames * keys {
        return None;
    }
    Some(data[..frames * keys].chunks_exact(keys).map(<[f32]>::to_vec).collect())
}

impl Capability for OnnxTranscriber {
    fn kind(&self) -> CapabilityKind {
        CapabilityKind::Transcription
    }

    fn probe(&self) -> std::result::Result<(), String> {
        self.session.probe()
    }
}

impl Transcriber for OnnxTranscriber {
    fn transcribe(&self, signal: &AudioSignal) -> Result<Vec<NoteEvent>> {
        let mono = resample_mono(
            &signal.to_mono(),
            signal.sample_rate(),
            TRANSCRIPTION_SAMPLE_RATE,
        )?;
        if mono.is_empty() {
            return Ok(Vec::new());
        }
        let duration = mono.len() as f32 / TRANSCRIPTION_SAMPLE_RATE as f32;

        let mut session = self.session.lock()?;
        let value = Value::from_array(([1usize, mono.len()], mono))
            .map_err(|e| self.session.error(e))?;
        let outputs = session
            .run(ort::inputs!["audio" => value])
            .map_err(|e| self.session.error(e))?;

        let posteriorgram = |name: &str| -> Result<Vec<Vec<f32>>> {
            let (shape, data) = outputs[name]
                .try_extract_tensor::<f32>()
                .map_err(|e| self.session.error(e))?;
            let shape = dims(shape);
            rows(&shape, data).ok_or_else(|| {
                AnalysisError::backend(
                    CapabilityKind::Transcription.name(),
                    format!("unexpected {} output shape {:?}", name, shape),
                )
            })
        };
        let note = posteriorgram("note")?;
        let onset = posteriorgram("onset")?;

        let frame_rate = note.len() as f32 / duration;
        log::debug!(
            "Transcription posteriorgrams: {} frames at {:.2} fps",
            note.len(),
            frame_rate
        );
        Ok(decode_notes(&note, &onset, frame_rate, &self.decoding))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_shapes() {
        let data = vec![0.5; 2 * N_KEYS];
        assert_eq!(rows(&[1, 2, N_KEYS], &data).map(|r| r.len()), Some(2));
        assert_eq!(rows(&[2, N_KEYS], &data).map(|r| r.len()), Some(2));
        assert!(rows(&[1, 2, 12], &data).is_none());
    }
}
