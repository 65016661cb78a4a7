//! Reading raw files and reading/writing the processed zone.

use crate::config::StorageFormat;
use crate::error::{PipelineError, Result};
use crate::registry::LoadOptions;
use crate::table::{Provider, Table};
use polars::io::csv::read::{CsvReadOptions, NullValues};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// File name of the processed-zone manifest.
pub const MANIFEST_FILE: &str = "_manifest.json";

// ============================================================================
// Raw zone
// ============================================================================

/// Parse a raw file into a frame using `options`.
///
/// Tries a direct read first, then a second one over pre-cleaned content
/// (byte order mark stripped, blank lines dropped). Rows with more fields
/// than the header fail both reads.
pub fn read_raw(path: &Path, options: &LoadOptions) -> Result<DataFrame> {
    match csv_options(options)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .and_then(|reader| reader.finish())
    {
        Ok(df) => return Ok(df),
        Err(e) => {
            debug!("Standard loading of '{}' failed: {}", path.display(), e);
        }
    }

    let content = fs::read_to_string(path)?;
    let cleaned = clean_csv_content(&content);
    csv_options(options)
        .into_reader_with_file_handle(Cursor::new(cleaned))
        .finish()
        .map_err(|e| PipelineError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

fn csv_options(options: &LoadOptions) -> CsvReadOptions {
    // Both characters are checked to be ASCII when the registry is built.
    let separator = options.separator as u8;
    let quote = options.quote_char.map(|c| c as u8);
    let null_values = (!options.null_values.is_empty()).then(|| {
        NullValues::AllColumns(
            options
                .null_values
                .iter()
                .map(|token| token.as_str().into())
                .collect(),
        )
    });

    CsvReadOptions::default()
        .with_has_header(options.has_header)
        .with_skip_rows(options.skip_rows)
        .with_infer_schema_length(options.infer_schema_length)
        .with_parse_options(
            CsvParseOptions::default()
                .with_separator(separator)
                .with_quote_char(quote)
                .with_null_values(null_values),
        )
}

fn clean_csv_content(content: &str) -> String {
    content
        .trim_start_matches('\u{feff}')
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

// ============================================================================
// Processed zone
// ============================================================================

/// Delete the zone directory if present and recreate it empty.
pub fn reset_zone(dir: &Path) -> Result<()> {
    if dir.exists() {
        info!("Removing existing processed data directory: {}", dir.display());
        fs::remove_dir_all(dir).map_err(|e| PipelineError::zone(dir, e))?;
    }
    info!("Creating empty processed data directory: {}", dir.display());
    fs::create_dir_all(dir).map_err(|e| PipelineError::zone(dir, e))
}

/// Persist a table. The row-label column is written as the first column.
///
/// The table is written under a staging name next to `path` and renamed
/// into place once complete, so a failed write leaves nothing the loader
/// would pick up.
pub fn write_table(table: &Table, path: &Path, format: StorageFormat) -> Result<()> {
    let staging = staging_path(path);
    let result = write_frame(table, &staging, format)
        .and_then(|()| fs::rename(&staging, path).map_err(PipelineError::from));

    if result.is_err()
        && staging.exists()
        && let Err(e) = fs::remove_file(&staging)
    {
        warn!("Could not remove '{}': {}", staging.display(), e);
    }
    result
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".partial");
    path.with_file_name(name)
}

fn write_frame(table: &Table, path: &Path, format: StorageFormat) -> Result<()> {
    let mut frame = table.frame().clone();
    let mut file = File::create(path)?;
    match format {
        StorageFormat::Csv => {
            CsvWriter::new(&mut file)
                .include_header(true)
                .finish(&mut frame)?;
        }
        StorageFormat::Parquet => {
            ParquetWriter::new(file).finish(&mut frame)?;
        }
    }
    Ok(())
}

/// Read a persisted frame.
pub fn read_processed(path: &Path, format: StorageFormat) -> Result<DataFrame> {
    let parse_error = |e: PolarsError| PipelineError::Parse {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };

    match format {
        StorageFormat::Csv => CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(None)
            .try_into_reader_with_file_path(Some(path.to_path_buf()))
            .and_then(|reader| reader.finish())
            .map_err(parse_error),
        StorageFormat::Parquet => {
            let file = File::open(path)?;
            ParquetReader::new(file).finish().map_err(parse_error)
        }
    }
}

// ============================================================================
// Manifest
// ============================================================================

/// Metadata of one persisted dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub file: String,
    pub format: StorageFormat,
    pub index_column: Option<String>,
    pub provider: Provider,
    pub rows: usize,
    pub columns: usize,
}

impl ManifestEntry {
    pub fn for_table(table: &Table, file: impl Into<String>, format: StorageFormat) -> Self {
        let (rows, columns) = table.shape();
        Self {
            file: file.into(),
            format,
            index_column: table.index_column().map(str::to_string),
            provider: table.provider(),
            rows,
            columns,
        }
    }
}

/// Processed-zone metadata. Holds no timestamps so reruns are byte-identical.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub datasets: BTreeMap<String, ManifestEntry>,
}

impl Manifest {
    pub fn path_in(dir: &Path) -> PathBuf {
        dir.join(MANIFEST_FILE)
    }

    pub fn write(&self, dir: &Path) -> Result<()> {
        let path = Self::path_in(dir);
        let mut text = serde_json::to_string_pretty(self)?;
        text.push('\n');
        fs::write(&path, text).map_err(|e| PipelineError::zone(path, e))
    }

    /// Read the manifest of `dir`.
    ///
    /// A missing or unreadable manifest yields an empty one; callers fall
    /// back to positional row labels.
    pub fn read_or_default(dir: &Path) -> Self {
        let path = Self::path_in(dir);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Self::default(),
            Err(e) => {
                warn!("Cannot read manifest '{}': {}", path.display(), e);
                return Self::default();
            }
        };
        serde_json::from_str(&text).unwrap_or_else(|e| {
            warn!("Ignoring corrupt manifest '{}': {}", path.display(), e);
            Self::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::is_integer_dtype;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn test_read_raw_with_separator() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.csv");
        fs::write(&path, "Description;2020;2021\nBudget;1.5;\nPersonnel;2;3\n").unwrap();

        let options = LoadOptions {
            separator: ';',
            ..LoadOptions::indexed("Description")
        };
        let df = read_raw(&path, &options).unwrap();
        assert_eq!(df.shape(), (2, 3));
        assert_eq!(df.column("2021").unwrap().null_count(), 1);
    }

    #[test]
    fn test_read_raw_tolerates_bom_and_blank_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gdp.csv");
        fs::write(&path, "\u{feff}Country,1960 [YR1960]\nAruba,1\n\nChad,2\n\n").unwrap();

        let df = read_raw(&path, &LoadOptions::default()).unwrap();
        assert_eq!(df.width(), 2);
        assert!(is_integer_dtype(df.get_columns()[1].dtype()));
    }

    #[test]
    fn test_read_raw_rejects_rows_with_extra_fields() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("budget.csv");
        fs::write(
            &path,
            "Description,2020,2021\nBudget,1,2\nPersonnel,3,4,999,888\n",
        )
        .unwrap();

        let err = read_raw(&path, &LoadOptions::indexed("Description")).unwrap_err();
        assert!(matches!(err, PipelineError::Parse { .. }));
        assert!(err.is_dataset_scoped());
    }

    #[test]
    fn test_read_raw_treats_na_tokens_as_missing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("budget.csv");
        fs::write(
            &path,
            "Description,2020,2021\nBudget,NA,1.5\nPersonnel,3.5,N/A\nOther,#N/A,null\n",
        )
        .unwrap();

        let df = read_raw(&path, &LoadOptions::indexed("Description")).unwrap();
        let col_2020 = df.column("2020").unwrap();
        assert_eq!(col_2020.dtype(), &DataType::Float64);
        assert_eq!(col_2020.null_count(), 2);
        assert_eq!(df.column("2021").unwrap().dtype(), &DataType::Float64);
        assert_eq!(df.column("2021").unwrap().null_count(), 2);
    }

    #[test]
    fn test_read_raw_without_null_tokens_keeps_text() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("codes.csv");
        fs::write(&path, "Country,Code\nNamibia,NA\nChad,TD\n").unwrap();

        let options = LoadOptions {
            null_values: Vec::new(),
            ..LoadOptions::default()
        };
        let df = read_raw(&path, &options).unwrap();
        assert_eq!(df.column("Code").unwrap().null_count(), 0);
    }

    #[test]
    fn test_read_raw_missing_file_is_error() {
        let dir = tempdir().unwrap();
        let result = read_raw(&dir.path().join("nope.csv"), &LoadOptions::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_reset_zone_removes_stale_files() {
        let dir = tempdir().unwrap();
        let zone = dir.path().join("processed");
        fs::create_dir_all(zone.join("nested")).unwrap();
        fs::write(zone.join("old_dataset.csv"), "a\n1\n").unwrap();

        reset_zone(&zone).unwrap();

        assert!(zone.is_dir());
        assert_eq!(fs::read_dir(&zone).unwrap().count(), 0);
    }

    #[test]
    fn test_write_and_read_csv() {
        let dir = tempdir().unwrap();
        let frame = df!("Rank" => [1i64, 2], "2020" => [0.5f64, 1.0]).unwrap();
        let table = Table::new(frame, Some("Rank".to_string())).unwrap();

        let path = dir.path().join("t.csv");
        write_table(&table, &path, StorageFormat::Csv).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("Rank,2020\n"));

        let back = read_processed(&path, StorageFormat::Csv).unwrap();
        assert!(back.equals_missing(table.frame()));
    }

    #[test]
    fn test_failed_write_leaves_no_file_behind() {
        let dir = tempdir().unwrap();
        let frame = df!("a" => [1i64, 2]).unwrap();
        let table = Table::positional(frame);

        // A directory squatting on the target name makes the final rename fail.
        let path = dir.path().join("t.csv");
        fs::create_dir(&path).unwrap();

        assert!(write_table(&table, &path, StorageFormat::Csv).is_err());
        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["t.csv"]);
        assert!(path.is_dir());
    }

    #[test]
    fn test_write_and_read_parquet() {
        let dir = tempdir().unwrap();
        let frame = df!("name" => ["a", "b"], "value" => [1i32, 2]).unwrap();
        let table = Table::positional(frame);

        let path = dir.path().join("t.parquet");
        write_table(&table, &path, StorageFormat::Parquet).unwrap();
        let back = read_processed(&path, StorageFormat::Parquet).unwrap();
        assert!(back.equals_missing(table.frame()));
    }

    #[test]
    fn test_manifest_round_trip_and_fallbacks() {
        let dir = tempdir().unwrap();
        assert_eq!(Manifest::read_or_default(dir.path()), Manifest::default());

        let frame = df!("Description" => ["x"], "v" => [1i64]).unwrap();
        let table = Table::new(frame, Some("Description".to_string()))
            .unwrap()
            .with_provider(Provider::Bloomberg);
        let mut manifest = Manifest::default();
        manifest.datasets.insert(
            "budget".to_string(),
            ManifestEntry::for_table(&table, "budget.csv", StorageFormat::Csv),
        );
        manifest.write(dir.path()).unwrap();

        let back = Manifest::read_or_default(dir.path());
        assert_eq!(back, manifest);
        let entry = &back.datasets["budget"];
        assert_eq!(entry.index_column.as_deref(), Some("Description"));
        assert_eq!((entry.rows, entry.columns), (1, 1));

        fs::write(Manifest::path_in(dir.path()), "{ not json").unwrap();
        assert_eq!(Manifest::read_or_default(dir.path()), Manifest::default());
    }
}
