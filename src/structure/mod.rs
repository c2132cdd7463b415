//! Song structure analysis
//!
//! Derives section boundaries from chroma and MFCC frames:
//! - Sparse k-NN affinity recurrence matrix
//! - Novelty curve and boundary peak picking with labelled sections
//! - Temporally constrained agglomerative segmentation

pub mod agglomerative;
pub mod recurrence;
pub mod segmenter;

pub use agglomerative::agglomerative_boundaries;
pub use segmenter::{Section, StructureReport, StructureSegmenter};
