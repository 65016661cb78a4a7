//! Rebuilds the dataset collection from the processed zone.

use crate::catalog::DatasetCollection;
use crate::config::{PipelineConfig, StorageFormat};
use crate::error::{PipelineError, Result};
use crate::paths::{DataLayout, Zone};
use crate::storage::{self, Manifest, ManifestEntry};
use crate::table::Table;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Reads persisted tables back into memory. Never writes.
#[derive(Debug, Clone)]
pub struct DatasetLoader {
    layout: DataLayout,
}

impl DatasetLoader {
    pub fn new(layout: DataLayout) -> Self {
        Self { layout }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(DataLayout::new(&config.data_root))
    }

    /// Load every table of the processed zone, keyed by file stem.
    ///
    /// A missing zone gives an empty collection. A file that cannot be
    /// parsed is logged and skipped.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Zone`] when the zone directory cannot be listed.
    pub fn load_all(&self) -> Result<DatasetCollection> {
        let dir = self.layout.zone_dir(Zone::Processed);
        let mut collection = DatasetCollection::new();

        if !dir.exists() {
            info!(
                "Processed zone '{}' does not exist, pipeline not yet run",
                dir.display()
            );
            return Ok(collection);
        }

        let files = scan_zone(&dir)?;
        let manifest = Manifest::read_or_default(&dir);

        for (name, path, format) in files {
            if collection.contains(&name) {
                warn!(
                    "Ignoring '{}': dataset '{}' already loaded from another file",
                    path.display(),
                    name
                );
                continue;
            }

            let entry = manifest
                .datasets
                .get(&name)
                .filter(|entry| entry_matches(entry, &path));

            match load_table(&path, format, entry) {
                Ok(table) => {
                    debug!("Loaded dataset '{}': {:?}", name, table.shape());
                    collection.insert(name, table);
                }
                Err(e) => {
                    warn!(
                        "Skipping processed file '{}' ({}): {}",
                        path.display(),
                        e.error_code(),
                        e
                    );
                }
            }
        }

        info!("Loaded {} datasets from '{}'", collection.len(), dir.display());
        Ok(collection)
    }
}

/// Table files of the zone as `(stem, path, format)`, sorted by path.
fn scan_zone(dir: &Path) -> Result<Vec<(String, PathBuf, StorageFormat)>> {
    let entries = fs::read_dir(dir).map_err(|e| PipelineError::zone(dir, e))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| PipelineError::zone(dir, e))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(StorageFormat::from_extension);
        let stem = path.file_stem().and_then(|s| s.to_str()).map(str::to_string);

        match (stem, format) {
            (Some(stem), Some(format)) if !stem.is_empty() => files.push((stem, path, format)),
            _ => debug!("Ignoring non-table file '{}'", path.display()),
        }
    }

    files.sort_by(|a, b| a.1.cmp(&b.1));
    Ok(files)
}

fn entry_matches(entry: &ManifestEntry, path: &Path) -> bool {
    path.file_name().and_then(|n| n.to_str()) == Some(entry.file.as_str())
}

fn load_table(path: &Path, format: StorageFormat, entry: Option<&ManifestEntry>) -> Result<Table> {
    let frame = storage::read_processed(path, format)?;

    let Some(entry) = entry else {
        return Ok(Table::positional(frame));
    };

    let table = match Table::new(frame.clone(), entry.index_column.clone()) {
        Ok(table) => table,
        Err(e) => {
            warn!(
                "Row-label column of '{}' unusable ({}), using positional labels",
                path.display(),
                e
            );
            Table::positional(frame)
        }
    };
    Ok(table.with_provider(entry.provider))
}
