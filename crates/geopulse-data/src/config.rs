//! Configuration types for the ingest pipeline.
//!
//! The pipeline takes no per-run arguments beyond the static registry; this
//! module only carries where the data lives and how processed tables are
//! stored. Built with the builder pattern, or from the environment.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable overriding the data root.
pub const DATA_ROOT_ENV: &str = "GEOPULSE_DATA_ROOT";

/// Default data root, relative to the working directory.
pub const DEFAULT_DATA_ROOT: &str = "data";

/// File format of persisted tables in the processed zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StorageFormat {
    /// Comma-separated text with a header row
    #[default]
    Csv,
    /// Apache Parquet, keeps column types exactly
    Parquet,
}

impl StorageFormat {
    /// File extension used for this format, without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            StorageFormat::Csv => "csv",
            StorageFormat::Parquet => "parquet",
        }
    }

    /// Format for a file extension, case-insensitive.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" => Some(StorageFormat::Csv),
            "parquet" | "pq" => Some(StorageFormat::Parquet),
            _ => None,
        }
    }
}

/// Configuration for the pipeline and the loader.
///
/// # Example
///
/// ```rust,ignore
/// use geopulse_data::config::{PipelineConfig, StorageFormat};
///
/// let config = PipelineConfig::builder()
///     .data_root("/srv/geopulse/data")
///     .storage_format(StorageFormat::Parquet)
///     .build()?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Directory holding the `raw/` and `processed/` zones.
    /// Default: "data"
    pub data_root: PathBuf,

    /// Format used when persisting processed tables.
    /// Default: Csv
    pub storage_format: StorageFormat,

    /// Treat any skipped dataset as a failed run.
    /// Default: false
    pub strict: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from(DEFAULT_DATA_ROOT),
            storage_format: StorageFormat::default(),
            strict: false,
        }
    }
}

impl PipelineConfig {
    /// Create a new configuration builder.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Default configuration with the data root taken from
    /// `GEOPULSE_DATA_ROOT` when it is set and non-empty.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(root) = std::env::var(DATA_ROOT_ENV)
            && !root.trim().is_empty()
        {
            config.data_root = PathBuf::from(root);
        }
        config
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.data_root.as_os_str().is_empty() {
            return Err(ConfigValidationError::EmptyDataRoot);
        }
        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Data root must not be empty")]
    EmptyDataRoot,
}

impl From<ConfigValidationError> for crate::error::PipelineError {
    fn from(err: ConfigValidationError) -> Self {
        crate::error::PipelineError::InvalidConfig(err.to_string())
    }
}

/// Builder for [`PipelineConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    data_root: Option<PathBuf>,
    storage_format: Option<StorageFormat>,
    strict: Option<bool>,
}

impl PipelineConfigBuilder {
    /// Set the directory holding the `raw/` and `processed/` zones.
    pub fn data_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_root = Some(path.into());
        self
    }

    /// Set the format of persisted tables.
    pub fn storage_format(mut self, format: StorageFormat) -> Self {
        self.storage_format = Some(format);
        self
    }

    /// Fail the run when any dataset is skipped.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = Some(strict);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `PipelineConfig` or an error if validation fails.
    pub fn build(self) -> Result<PipelineConfig, ConfigValidationError> {
        let config = PipelineConfig {
            data_root: self
                .data_root
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_ROOT)),
            storage_format: self.storage_format.unwrap_or_default(),
            strict: self.strict.unwrap_or(false),
        };

        config.validate()?;
        Ok(config)
    }
}
