//! Per-dataset execution: load, clean, persist.

use crate::cleaner::{self, Cleaner};
use crate::config::StorageFormat;
use crate::error::{PipelineError, Result, ResultExt};
use crate::paths::{DataLayout, Zone};
use crate::registry::SourceDescriptor;
use crate::storage::{self, ManifestEntry};
use crate::table::Table;
use std::path::PathBuf;
use tracing::{debug, info};

/// A dataset that made it to the processed zone.
#[derive(Debug, Clone)]
pub struct PersistedDataset {
    pub table: Table,
    pub path: PathBuf,
    pub entry: ManifestEntry,
}

/// Runs the load → clean → persist chain for single descriptors.
#[derive(Debug, Clone)]
pub struct DatasetExecutor {
    layout: DataLayout,
    format: StorageFormat,
}

impl DatasetExecutor {
    pub fn new(layout: DataLayout, format: StorageFormat) -> Self {
        Self { layout, format }
    }

    /// Process one descriptor.
    ///
    /// Every error returned here concerns this dataset only.
    pub fn process(&self, source: &SourceDescriptor) -> Result<PersistedDataset> {
        let raw_path = self.layout.resolve(&source.path, Zone::Raw);
        info!(
            "Processing dataset: '{}' from '{}'",
            source.name,
            raw_path.display()
        );

        let table = self.load(source, raw_path)?;
        let table = self.clean(source, table)?;
        self.persist(source, table)
    }

    fn load(&self, source: &SourceDescriptor, raw_path: PathBuf) -> Result<Table> {
        if !raw_path.is_file() {
            return Err(PipelineError::SourceMissing {
                dataset: source.name.clone(),
                path: raw_path,
            });
        }

        let frame = storage::read_raw(&raw_path, &source.load_options)?;
        debug!("Loaded '{}': {:?}", source.name, frame.shape());

        let index = source.load_options.index_column.clone();
        Table::new(frame, index)
            .map(|table| table.with_provider(source.provider))
            .map_err(|e| PipelineError::Parse {
                path: raw_path,
                reason: e.to_string(),
            })
    }

    fn clean(&self, source: &SourceDescriptor, table: Table) -> Result<Table> {
        let table = Cleaner::FillMissing.apply(table)?;
        if source.cleaners.is_empty() {
            return Ok(table);
        }
        debug!(
            "Applying {} specific cleaner(s) to '{}'",
            source.cleaners.len(),
            source.name
        );
        cleaner::apply_all(table, &source.cleaners)
    }

    fn persist(&self, source: &SourceDescriptor, table: Table) -> Result<PersistedDataset> {
        let file = format!("{}.{}", source.name, self.format.extension());
        let path = self.layout.resolve(&file, Zone::Processed);
        storage::write_table(&table, &path, self.format)
            .context(format!("Writing dataset '{}'", source.name))?;
        info!("Successfully saved processed data to '{}'", path.display());

        let entry = ManifestEntry::for_table(&table, file, self.format);
        Ok(PersistedDataset { table, path, entry })
    }
}
