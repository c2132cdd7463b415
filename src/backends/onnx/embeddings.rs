//! Audio embeddings through an ONNX model
//!
//! Model contract: input `input_values` of shape `[1, samples]`, mono at
//! 16 kHz; output `last_hidden_state` of shape `[1, T, D]`. Each chunk is
//! mean-pooled over `T`.

use super::{dims, LazySession};
use crate::backends::{Capability, CapabilityKind, Embedder, Embedding};
use crate::config::ModelConfig;
use crate::error::{AnalysisError, Result};
use crate::io::resample::resample_mono;
use crate::io::AudioSignal;
use ort::value::Value;

/// Model input sample rate
pub const EMBEDDING_SAMPLE_RATE: u32 = 16_000;

/// ONNX embedder
pub struct OnnxEmbedder {
    session: LazySession,
    chunk_samples: usize,
}

impl OnnxEmbedder {
    /// Embedder for the configured model
    pub fn new(config: &ModelConfig) -> Self {
        let chunk_samples =
            (config.embedding_chunk_seconds * EMBEDDING_SAMPLE_RATE as f32).round() as usize;
        Self {
            session: LazySession::new(
                CapabilityKind::Embeddings,
                config.embeddings.clone(),
                &config.device,
            ),
            chunk_samples: chunk_samples.max(1),
        }
    }
}

/// Mean over the time axis of a `[1, T, D]` tensor
fn mean_pool(shape: &[usize], data: &[f32]) -> Option<Vec<f32>> {
    let (steps, dim) = match shape {
        [1, steps, dim] => (*steps, *dim),
        _ => return None,
    };
    if steps == 0 || data.len() < steps * dim {
        return None;
    }
    let mut pooled = vec![0.0f32; dim];
    for row in data[..steps * dim].chunks_exact(dim) {
        for (p, &x) in pooled.iter_mut().zip(row) {
            *p += x;
        }
    }
    pooled.iter_mut().for_each(|p| *p /= steps as f32);
    Some(pooled)
}

impl Capability for OnnxEmbedder {
    fn kind(&self) -> CapabilityKind {
        CapabilityKind::Embeddings
    }

    fn probe(&self) -> std::result::Result<(), String> {
        self.session.probe()
    }
}

impl Embedder for OnnxEmbedder {
    fn embed(&self, signal: &AudioSignal) -> Result<Embedding> {
        let mono = resample_mono(&signal.to_mono(), signal.sample_rate(), EMBEDDING_SAMPLE_RATE)?;
        let mut session = self.session.lock()?;
        let mut data = Vec::new();
        let mut dim = 0;
        let mut chunks = 0;

        for chunk in mono.chunks(self.chunk_samples) {
            let value = Value::from_array(([1usize, chunk.len()], chunk.to_vec()))
                .map_err(|e| self.session.error(e))?;
            let outputs = session
                .run(ort::inputs!["input_values" => value])
                .map_err(|e| self.session.error(e))?;
            let (shape, values) = outputs["last_hidden_state"]
                .try_extract_tensor::<f32>()
                .map_err(|e| self.session.error(e))?;
            let shape = dims(shape);
            let pooled = mean_pool(&shape, values).ok_or_else(|| {
                AnalysisError::backend(
                    CapabilityKind::Embeddings.name(),
                    format!("unexpected output shape {:?}", shape),
                )
            })?;
            dim = pooled.len();
            data.extend(pooled);
            chunks += 1;
        }

        log::debug!("Embeddings: {} chunks × {}", chunks, dim);
        Ok(Embedding { chunks, dim, data })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_pool() {
        let data = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        assert_eq!(mean_pool(&[1, 2, 3], &data), Some(vec![2.5, 3.5, 4.5]));
        assert_eq!(mean_pool(&[2, 3], &data), None);
    }
}
