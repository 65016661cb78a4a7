//! GeoPulse data pipeline library
//!
//! Turns heterogeneous provider files (SIPRI arms-trade statistics, World Bank
//! indicators, Bloomberg industry series) into a uniform collection of
//! labelled tables, built with Rust and Polars.
//!
//! # Overview
//!
//! - **Registry**: a declarative list of sources, each with a raw path, load
//!   options and optional cleaners ([`SourceRegistry`])
//! - **Cleaning**: pure table transforms ([`cleaner`])
//! - **Pipeline**: rebuilds the processed zone from scratch on every run,
//!   isolating per-dataset failures ([`Pipeline`])
//! - **Loader / catalog**: reads the processed zone back into a
//!   [`DatasetCollection`] for read-only front ends
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use geopulse_data::{DatasetLoader, Pipeline, PipelineConfig};
//!
//! let config = PipelineConfig::builder().data_root("data").build()?;
//!
//! // Offline: rebuild data/processed from data/raw
//! let report = Pipeline::builder().config(config.clone()).build()?.run()?;
//! println!("{} datasets written", report.succeeded().count());
//!
//! // At process start: load what the pipeline produced
//! let collection = DatasetLoader::from_config(&config).load_all()?;
//! let gdp = collection.get_dataset("gdp")?;
//! let split = gdp.to_split()?;
//! ```
//!
//! # Filesystem layout
//!
//! ```text
//! data/
//! ├── raw/<provider>/<file>.csv
//! └── processed/
//!     ├── <name>.csv            one per successful dataset
//!     └── _manifest.json        row-label column and provenance per dataset
//! ```

pub mod catalog;
pub mod cleaner;
pub mod config;
pub mod error;
pub mod loader;
pub mod paths;
pub mod pipeline;
pub mod registry;
pub mod storage;
pub mod table;
pub mod utils;

// Re-exports for convenient access
pub use catalog::DatasetCollection;
pub use cleaner::{Cleaner, fill_missing, normalize_year_headers};
pub use config::{ConfigValidationError, PipelineConfig, PipelineConfigBuilder, StorageFormat};
pub use error::{PipelineError, Result as PipelineResult, ResultExt};
pub use loader::DatasetLoader;
pub use paths::{DataLayout, Zone};
pub use pipeline::{
    DatasetOutcome, DatasetStatus, Pipeline, PipelineBuilder, PipelineReport, run_pipeline,
};
pub use registry::{LoadOptions, SourceDescriptor, SourceRegistry};
pub use table::{ColumnSummary, Provider, SplitTable, Table};
