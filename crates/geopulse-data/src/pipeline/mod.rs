//! Pipeline module.
//!
//! This module provides the orchestrator and its per-dataset executor.

mod builder;
mod executor;
pub mod report;

pub use builder::{Pipeline, PipelineBuilder, run_pipeline};
pub use executor::{DatasetExecutor, PersistedDataset};
pub use report::{DatasetOutcome, DatasetStatus, PipelineReport};
