//! Analysis orchestration
//!
//! Runs the stages over one input and assembles the report:
//! - Report types and per-stage result wrapper
//! - Full pipeline (`Analyzer`)
//! - Basic and fancy reduced pipelines
//! - Text summary

pub mod orchestrator;
pub mod reduced;
pub mod report;
pub mod summary;

pub use orchestrator::{AnalysisRun, Analyzer};
pub use reduced::{basic_analysis, fancy_analysis, BasicReport, FancyReport};
pub use report::{AnalysisReport, StageReport};
pub use summary::render_summary;
