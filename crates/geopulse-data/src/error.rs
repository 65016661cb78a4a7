//! Error types for the ingest pipeline and the read side.
//!
//! This module provides a single error hierarchy using `thiserror`.
//! Errors fall in three groups:
//!
//! - **Dataset-scoped** (`SourceMissing`, `Parse`, `Cleaning`): isolated by the
//!   orchestrator, logged and recorded in the run report.
//! - **Run-scoped** (`Zone`, `InvalidConfig`): abort the whole run.
//! - **Read-side** (`DatasetNotFound`, `NoDataLoaded`): surfaced to callers of
//!   the catalog as structured values.
//!
//! Errors serialize as `{ code, message }` so front ends can render them
//! without access to the error chain.

use serde::Serialize;
use serde::ser::SerializeStruct;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Raw source file does not exist.
    #[error("Source file for dataset '{dataset}' not found: {}", path.display())]
    SourceMissing { dataset: String, path: PathBuf },

    /// Raw or processed content could not be parsed with the declared options.
    #[error("Failed to parse '{}': {reason}", path.display())]
    Parse { path: PathBuf, reason: String },

    /// A cleaning function failed.
    #[error("Cleaner '{cleaner}' failed: {reason}")]
    Cleaning { cleaner: String, reason: String },

    /// The processed zone could not be reset, created, read or written.
    #[error("Zone error at '{}': {source}", path.display())]
    Zone {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid configuration or registry.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Dataset is absent from the collection.
    #[error("Dataset '{0}' not found")]
    DatasetNotFound(String),

    /// The collection is empty; the pipeline has not been run.
    #[error("No processed data available, run the pipeline first")]
    NoDataLoaded,

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<PipelineError>,
    },
}

impl PipelineError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        PipelineError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Build a zone error for `path`.
    pub fn zone(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PipelineError::Zone {
            path: path.into(),
            source,
        }
    }

    /// Stable error code for logs, reports and front ends.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::SourceMissing { .. } => "SOURCE_MISSING",
            Self::Parse { .. } => "PARSE_ERROR",
            Self::Cleaning { .. } => "CLEANING_FAILED",
            Self::Zone { .. } => "ZONE_ERROR",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::DatasetNotFound(_) => "DATASET_NOT_FOUND",
            Self::NoDataLoaded => "NO_DATA_LOADED",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Whether this error concerns a single dataset and must not abort a run.
    ///
    /// Zone and configuration errors are infrastructure preconditions and
    /// always propagate.
    pub fn is_dataset_scoped(&self) -> bool {
        match self {
            Self::Zone { .. } | Self::InvalidConfig(_) => false,
            Self::WithContext { source, .. } => source.is_dataset_scoped(),
            _ => true,
        }
    }

    /// Whether this is a read-side "nothing there" condition.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::DatasetNotFound(_) | Self::NoDataLoaded => true,
            Self::WithContext { source, .. } => source.is_not_found(),
            _ => false,
        }
    }
}

impl Serialize for PipelineError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("PipelineError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}
