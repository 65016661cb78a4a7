//! The in-memory dataset collection and the read contract over it.
//!
//! Front ends load the processed zone once per process through [`global`]
//! and then only read. The process-wide instance is never refreshed: a new
//! pipeline run becomes visible after a restart.

use crate::error::{PipelineError, Result};
use crate::loader::DatasetLoader;
use crate::paths::DataLayout;
use crate::table::Table;
use once_cell::sync::OnceCell;
use std::collections::BTreeMap;

/// Mapping from dataset name to table, ordered by name.
#[derive(Debug, Clone, Default)]
pub struct DatasetCollection {
    tables: BTreeMap<String, Table>,
}

impl DatasetCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, name: String, table: Table) -> Option<Table> {
        self.tables.insert(name, table)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// No data at all: the pipeline has not been run.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Names of all datasets, sorted.
    pub fn list_datasets(&self) -> Vec<&str> {
        self.tables.keys().map(String::as_str).collect()
    }

    /// Look up a dataset.
    ///
    /// # Errors
    ///
    /// [`PipelineError::NoDataLoaded`] when the collection is empty,
    /// [`PipelineError::DatasetNotFound`] when only `name` is missing.
    pub fn get_dataset(&self, name: &str) -> Result<&Table> {
        if self.tables.is_empty() {
            return Err(PipelineError::NoDataLoaded);
        }
        self.tables
            .get(name)
            .ok_or_else(|| PipelineError::DatasetNotFound(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Table)> {
        self.tables.iter().map(|(k, v)| (k.as_str(), v))
    }
}

static GLOBAL: OnceCell<DatasetCollection> = OnceCell::new();

/// The process-wide collection, loaded from `layout` on first use.
///
/// Later calls return the same instance whatever layout they pass. A failed
/// load leaves the cell empty so the next call retries.
pub fn global(layout: &DataLayout) -> Result<&'static DatasetCollection> {
    GLOBAL.get_or_try_init(|| DatasetLoader::new(layout.clone()).load_all())
}

/// The process-wide collection, if it has been loaded.
pub fn try_global() -> Option<&'static DatasetCollection> {
    GLOBAL.get()
}
