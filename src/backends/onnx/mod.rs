//! ONNX Runtime backends
//!
//! Each backend holds a [`LazySession`]: the model file is only checked by
//! `probe()`, and loaded into an ONNX Runtime session on the first run. The
//! session is created at most once per backend and shared afterwards.

mod embeddings;
mod separation;
mod transcription;

pub use embeddings::OnnxEmbedder;
pub use separation::OnnxSeparator;
pub use transcription::OnnxTranscriber;

use crate::backends::CapabilityKind;
use crate::error::{AnalysisError, Result};
use once_cell::sync::OnceCell;
use ort::session::{builder::GraphOptimizationLevel, Session};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

/// Model session loaded on first use
pub struct LazySession {
    kind: CapabilityKind,
    path: Option<PathBuf>,
    device: String,
    session: OnceCell<Mutex<Session>>,
}

impl LazySession {
    /// Session for the model at `path` (`None` when not configured)
    pub fn new(kind: CapabilityKind, path: Option<PathBuf>, device: &str) -> Self {
        Self {
            kind,
            path,
            device: device.to_string(),
            session: OnceCell::new(),
        }
    }

    /// Model file is configured and present
    pub fn probe(&self) -> std::result::Result<(), String> {
        match &self.path {
            None => Err("no model configured".to_string()),
            Some(p) if !p.is_file() => Err(format!("model file not found: {}", p.display())),
            Some(_) => Ok(()),
        }
    }

    /// Lock the session, loading it on first call
    pub fn lock(&self) -> Result<MutexGuard<'_, Session>> {
        let cell = self.session.get_or_try_init(|| self.load().map(Mutex::new))?;
        cell.lock()
            .map_err(|_| AnalysisError::backend(self.kind.name(), "session lock poisoned"))
    }

    fn load(&self) -> Result<Session> {
        let path = self.path.as_ref().ok_or_else(|| {
            AnalysisError::backend(self.kind.name(), "no model configured")
        })?;
        if self.device != "cpu" {
            log::warn!(
                "Device '{}' is not supported by this build, using CPU for {}",
                self.device,
                self.kind
            );
        }
        log::info!("Loading {} model from {}", self.kind, path.display());
        Session::builder()
            .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level3))
            .and_then(|b| b.with_intra_threads(1))
            .and_then(|b| b.commit_from_file(path))
            .map_err(|e| self.error(e))
    }

    /// Wrap an ONNX Runtime error for this backend
    pub fn error(&self, err: ort::Error) -> AnalysisError {
        AnalysisError::backend(self.kind.name(), err.to_string())
    }
}

/// Check that an ONNX Runtime environment can be created
pub fn runtime_check() -> std::result::Result<(), String> {
    Session::builder().map(|_| ()).map_err(|e| {
        log::debug!("ONNX Runtime unavailable: {}", e);
        "onnxruntime".to_string()
    })
}

/// Convert an output tensor shape to `usize` dimensions
pub(crate) fn dims(shape: &[i64]) -> Vec<usize> {
    shape.iter().map(|&d| d.max(0) as usize).collect()
}
