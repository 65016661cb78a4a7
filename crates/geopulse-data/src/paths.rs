//! Data root layout and path resolution.
//!
//! ```text
//! <data_root>/
//! ├── raw/<provider>/<file>         untouched source files
//! └── processed/<name>.<ext>        one table per registry entry
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// Storage zone under the data root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Zone {
    /// Untouched source files, read-only to the pipeline
    Raw,
    /// Pipeline output, replaced wholesale on every run
    Processed,
}

impl Zone {
    /// Directory name of the zone under the data root.
    pub fn dir_name(&self) -> &'static str {
        match self {
            Zone::Raw => "raw",
            Zone::Processed => "processed",
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Maps logical paths to filesystem locations under a data root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLayout {
    root: PathBuf,
}

impl DataLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of a zone.
    pub fn zone_dir(&self, zone: Zone) -> PathBuf {
        self.root.join(zone.dir_name())
    }

    /// Resolve `relative_path` inside `zone`.
    ///
    /// Pure path arithmetic: nothing is checked on disk.
    pub fn resolve(&self, relative_path: impl AsRef<Path>, zone: Zone) -> PathBuf {
        self.zone_dir(zone).join(relative_path)
    }
}

/// Whether `path` is relative and cannot climb out of the directory it is
/// joined to.
pub fn is_contained_relative(path: &Path) -> bool {
    !path.as_os_str().is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}
