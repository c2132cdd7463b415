//! Source separation through an ONNX model
//!
//! Model contract: input `mix` of shape `[1, 2, samples]` at the rate set by
//! `models.separation_sample_rate`, output `stems` of shape
//! `[1, n_stems, 2, samples]`. Input at another rate is resampled to the
//! model rate and the stems are resampled back. The signal is fed in
//! fixed-length segments and the outputs concatenated.

use super::{dims, LazySession};
use crate::backends::{Capability, CapabilityKind, SeparatedStem, SourceSeparator};
use crate::config::ModelConfig;
use crate::error::{AnalysisError, Result};
use crate::io::resample::resample_signal;
use crate::io::AudioSignal;
use ort::value::Value;

const MODEL_CHANNELS: usize = 2;

/// ONNX source separator
pub struct OnnxSeparator {
    session: LazySession,
    stem_names: Vec<String>,
    sample_rate: u32,
    segment_samples: usize,
}

impl OnnxSeparator {
    /// Separator for the configured model
    pub fn new(config: &ModelConfig) -> Self {
        let sample_rate = config.separation_sample_rate;
        let segment_samples =
            (config.separation_segment_seconds * sample_rate as f32).round() as usize;
        Self {
            session: LazySession::new(
                CapabilityKind::Separation,
                config.separation.clone(),
                &config.device,
            ),
            stem_names: config.stem_names.clone(),
            sample_rate,
            segment_samples: segment_samples.max(1),
        }
    }

    /// Rate the model consumes and produces
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Segment length in model-rate samples
    pub fn segment_samples(&self) -> usize {
        self.segment_samples
    }

    /// Bring a signal to `rate`, reporting failures against this capability
    fn convert(&self, signal: &AudioSignal, rate: u32) -> Result<AudioSignal> {
        resample_signal(signal, rate).map_err(|e| {
            self.error(format!(
                "cannot convert {} Hz to {} Hz: {}",
                signal.sample_rate(),
                rate,
                e
            ))
        })
    }

    fn error(&self, message: impl Into<String>) -> AnalysisError {
        AnalysisError::backend(CapabilityKind::Separation.name(), message)
    }
}

/// Two model channels: mono is duplicated, extra channels dropped
fn stereo_channels(signal: &AudioSignal) -> [&[f32]; MODEL_CHANNELS] {
    let channels = signal.channels();
    let left = channels[0].as_slice();
    let right = channels.get(1).map_or(left, |c| c.as_slice());
    [left, right]
}

impl Capability for OnnxSeparator {
    fn kind(&self) -> CapabilityKind {
        CapabilityKind::Separation
    }

    fn probe(&self) -> std::result::Result<(), String> {
        self.session.probe()
    }
}

impl SourceSeparator for OnnxSeparator {
    fn separate(&self, signal: &AudioSignal) -> Result<Vec<SeparatedStem>> {
        if signal.is_empty() {
            return Err(self.error("empty signal"));
        }
        if self.sample_rate == 0 {
            return Err(self.error("model sample rate is not set"));
        }
        let input_rate = signal.sample_rate();
        let converted;
        let model_signal = if input_rate == self.sample_rate {
            signal
        } else {
            log::debug!(
                "Resampling separation input {} Hz -> {} Hz",
                input_rate,
                self.sample_rate
            );
            converted = self.convert(signal, self.sample_rate)?;
            &converted
        };
        let input = stereo_channels(model_signal);
        let total = model_signal.len();
        let n_stems = self.stem_names.len();
        // stems[s][c] -> samples
        let mut stems = vec![vec![Vec::with_capacity(total); MODEL_CHANNELS]; n_stems];

        let mut session = self.session.lock()?;
        let mut offset = 0;
        while offset < total {
            let len = self.segment_samples.min(total - offset);
            let mut segment = Vec::with_capacity(MODEL_CHANNELS * len);
            for channel in &input {
                segment.extend_from_slice(&channel[offset..offset + len]);
            }
            let value = Value::from_array(([1usize, MODEL_CHANNELS, len], segment))
                .map_err(|e| self.session.error(e))?;
            let outputs = session
                .run(ort::inputs!["mix" => value])
                .map_err(|e| self.session.error(e))?;
            let (shape, data) = outputs["stems"]
                .try_extract_tensor::<f32>()
                .map_err(|e| self.session.error(e))?;

            let shape = dims(shape);
            if shape.len() != 4 || shape[1] != n_stems || shape[2] != MODEL_CHANNELS || shape[3] < len {
                return Err(self.error(format!(
                    "unexpected output shape {:?} for {} stems",
                    shape, n_stems
                )));
            }
            let out_len = shape[3];
            for (s, stem) in stems.iter_mut().enumerate() {
                for (c, channel) in stem.iter_mut().enumerate() {
                    let base = (s * MODEL_CHANNELS + c) * out_len;
                    channel.extend_from_slice(&data[base..base + len]);
                }
            }
            log::debug!("Separated segment {}..{} of {}", offset, offset + len, total);
            offset += len;
        }

        self.stem_names
            .iter()
            .zip(stems)
            .map(|(name, channels)| {
                let stem = AudioSignal::new(channels, self.sample_rate)?;
                let signal = if input_rate == self.sample_rate {
                    stem
                } else {
                    self.convert(&stem, input_rate)?
                };
                Ok(SeparatedStem {
                    name: name.clone(),
                    signal,
                })
            })
            .collect()
    }
}
