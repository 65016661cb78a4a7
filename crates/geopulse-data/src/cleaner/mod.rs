//! Table cleaning functions.
//!
//! This module provides the pure `Table -> Table` transforms applied by the
//! pipeline:
//! - [`fill_missing`]: generic, applied to every dataset first
//! - [`normalize_year_headers`]: strips `" [YR1960]"` style header tags
//!
//! Registries refer to cleaners through [`Cleaner`], whose serialized form is
//! a stable snake_case identifier.

mod headers;
mod missing;

pub use headers::normalize_year_headers;
pub use missing::{FILL_TEXT, fill_missing};

use crate::error::{PipelineError, Result};
use crate::table::Table;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// A named cleaning step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cleaner {
    /// Replace missing cells with a neutral value
    FillMissing,
    /// Strip bracketed year tags from column labels
    NormalizeYearHeaders,
}

impl Cleaner {
    /// Stable identifier, as used in JSON registries.
    pub fn id(&self) -> &'static str {
        match self {
            Cleaner::FillMissing => "fill_missing",
            Cleaner::NormalizeYearHeaders => "normalize_year_headers",
        }
    }

    /// Run this cleaner.
    ///
    /// Any failure inside the transform is reported as
    /// [`PipelineError::Cleaning`] naming this cleaner.
    pub fn apply(&self, table: Table) -> Result<Table> {
        debug!("Applying cleaner '{}'", self.id());
        let result = match self {
            Cleaner::FillMissing => fill_missing(table),
            Cleaner::NormalizeYearHeaders => normalize_year_headers(table),
        };

        result.map_err(|e| match e {
            PipelineError::Cleaning { .. } => e,
            other => PipelineError::Cleaning {
                cleaner: self.id().to_string(),
                reason: other.to_string(),
            },
        })
    }
}

impl fmt::Display for Cleaner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Apply `cleaners` in order.
pub fn apply_all(table: Table, cleaners: &[Cleaner]) -> Result<Table> {
    cleaners
        .iter()
        .try_fold(table, |table, cleaner| cleaner.apply(table))
}
