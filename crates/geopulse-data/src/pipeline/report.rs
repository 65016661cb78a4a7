//! Run report of a pipeline pass.

use crate::error::PipelineError;
use crate::table::Provider;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Result of processing one dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DatasetStatus {
    Succeeded {
        file: PathBuf,
        rows: usize,
        columns: usize,
    },
    Failed {
        code: String,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetOutcome {
    pub name: String,
    pub provider: Provider,
    #[serde(flatten)]
    pub status: DatasetStatus,
}

impl DatasetOutcome {
    pub fn succeeded(
        name: impl Into<String>,
        provider: Provider,
        file: PathBuf,
        shape: (usize, usize),
    ) -> Self {
        Self {
            name: name.into(),
            provider,
            status: DatasetStatus::Succeeded {
                file,
                rows: shape.0,
                columns: shape.1,
            },
        }
    }

    pub fn failed(name: impl Into<String>, provider: Provider, error: &PipelineError) -> Self {
        Self {
            name: name.into(),
            provider,
            status: DatasetStatus::Failed {
                code: error.error_code().to_string(),
                message: error.to_string(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, DatasetStatus::Succeeded { .. })
    }
}

/// Summary of a full pass over the registry, in registry order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub outcomes: Vec<DatasetOutcome>,
}

impl PipelineReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &DatasetOutcome> {
        self.outcomes.iter().filter(|o| o.is_success())
    }

    pub fn failed(&self) -> impl Iterator<Item = &DatasetOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    pub fn succeeded_names(&self) -> Vec<&str> {
        self.succeeded().map(|o| o.name.as_str()).collect()
    }

    pub fn failed_names(&self) -> Vec<&str> {
        self.failed().map(|o| o.name.as_str()).collect()
    }

    pub fn has_failures(&self) -> bool {
        self.failed().next().is_some()
    }

    /// Datasets were attempted and none succeeded.
    pub fn is_total_failure(&self) -> bool {
        !self.outcomes.is_empty() && self.succeeded().next().is_none()
    }

    /// Whether the run counts as successful.
    ///
    /// A total failure never does; with `strict`, any skipped dataset fails
    /// the run.
    pub fn is_ok(&self, strict: bool) -> bool {
        !self.is_total_failure() && !(strict && self.has_failures())
    }
}
