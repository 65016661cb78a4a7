//! The source registry: which raw files exist and how to turn them into tables.
//!
//! Adding a dataset means adding one [`SourceDescriptor`]; the orchestrator
//! and the cleaners never change.

use crate::cleaner::Cleaner;
use crate::error::{PipelineError, Result};
use crate::paths::is_contained_relative;
use crate::table::Provider;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Parsing directives for a raw file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    /// Column promoted to row labels.
    pub index_column: Option<String>,
    /// Field separator, a single ASCII character.
    pub separator: char,
    /// Quote character, `None` disables quoting.
    pub quote_char: Option<char>,
    /// Whether the first (non-skipped) line is a header.
    pub has_header: bool,
    /// Lines to skip before the header.
    pub skip_rows: usize,
    /// Rows used for dtype inference, `None` scans the whole file.
    pub infer_schema_length: Option<usize>,
    /// Cell texts read as missing, in every column. Empty fields always are.
    pub null_values: Vec<String>,
}

/// Tokens read as missing unless a source overrides them.
pub const DEFAULT_NULL_VALUES: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            index_column: None,
            separator: ',',
            quote_char: Some('"'),
            has_header: true,
            skip_rows: 0,
            infer_schema_length: None,
            null_values: DEFAULT_NULL_VALUES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl LoadOptions {
    /// Options with `column` as the row-label column.
    pub fn indexed(column: impl Into<String>) -> Self {
        Self {
            index_column: Some(column.into()),
            ..Self::default()
        }
    }

    fn validate(&self, dataset: &str) -> Result<()> {
        if !self.separator.is_ascii() {
            return Err(PipelineError::InvalidConfig(format!(
                "dataset '{}': separator {:?} is not ASCII",
                dataset, self.separator
            )));
        }
        if let Some(quote) = self.quote_char
            && !quote.is_ascii()
        {
            return Err(PipelineError::InvalidConfig(format!(
                "dataset '{}': quote character {:?} is not ASCII",
                dataset, quote
            )));
        }
        Ok(())
    }
}

/// Static description of one dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    /// Logical name, also the processed file stem.
    pub name: String,
    #[serde(default)]
    pub provider: Provider,
    /// Location relative to the raw zone.
    pub path: PathBuf,
    #[serde(default)]
    pub load_options: LoadOptions,
    /// Source-specific cleaners, run after `fill_missing`.
    #[serde(default)]
    pub cleaners: Vec<Cleaner>,
}

impl SourceDescriptor {
    pub fn new(name: impl Into<String>, provider: Provider, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            provider,
            path: path.into(),
            load_options: LoadOptions::default(),
            cleaners: Vec::new(),
        }
    }

    pub fn load_options(mut self, options: LoadOptions) -> Self {
        self.load_options = options;
        self
    }

    pub fn index_column(mut self, column: impl Into<String>) -> Self {
        self.load_options.index_column = Some(column.into());
        self
    }

    pub fn cleaner(mut self, cleaner: Cleaner) -> Self {
        self.cleaners.push(cleaner);
        self
    }

    fn validate(&self) -> Result<()> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(PipelineError::InvalidConfig(
                "dataset name must not be empty".to_string(),
            ));
        }
        if name != self.name
            || self.name.starts_with('.')
            || self.name.contains(['/', '\\'])
        {
            return Err(PipelineError::InvalidConfig(format!(
                "dataset name '{}' is not usable as a file name",
                self.name
            )));
        }
        if !is_contained_relative(&self.path) {
            return Err(PipelineError::InvalidConfig(format!(
                "dataset '{}': path '{}' must be relative to the raw zone",
                self.name,
                self.path.display()
            )));
        }
        self.load_options.validate(&self.name)
    }
}

#[derive(Debug, Deserialize, Serialize)]
struct RegistryFile {
    sources: Vec<SourceDescriptor>,
}

/// Ordered, validated collection of source descriptors.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRegistry {
    sources: Vec<SourceDescriptor>,
}

impl SourceRegistry {
    /// Validate and wrap `sources`.
    ///
    /// Names must be unique and usable as file stems; paths must stay inside
    /// the raw zone.
    pub fn new(sources: Vec<SourceDescriptor>) -> Result<Self> {
        let mut names = HashSet::with_capacity(sources.len());
        for source in &sources {
            source.validate()?;
            if !names.insert(source.name.as_str()) {
                return Err(PipelineError::InvalidConfig(format!(
                    "dataset '{}' is registered twice",
                    source.name
                )));
            }
        }
        Ok(Self { sources })
    }

    /// Load a registry from a JSON file of the form `{ "sources": [...] }`.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::InvalidConfig(format!(
                "cannot read registry '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let file: RegistryFile = serde_json::from_str(text)
            .map_err(|e| PipelineError::InvalidConfig(format!("invalid registry: {}", e)))?;
        Self::new(file.sources)
    }

    /// Serialize to the JSON form accepted by [`SourceRegistry::from_json_str`].
    pub fn to_json_string(&self) -> Result<String> {
        let file = RegistryFile {
            sources: self.sources.clone(),
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }

    /// The datasets shipped with the project.
    pub fn builtin() -> Self {
        Self {
            sources: builtin_sources(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &SourceDescriptor> {
        self.sources.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&SourceDescriptor> {
        self.sources.iter().find(|s| s.name == name)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

fn builtin_sources() -> Vec<SourceDescriptor> {
    use Provider::*;

    vec![
        SourceDescriptor::new("all_arms_imports", Sipri, "sipri/TIV-Import-All-1950-2022.csv")
            .index_column("Arms Category"),
        SourceDescriptor::new("all_arms_exports", Sipri, "sipri/TIV-Export-All-1950-2022.csv")
            .index_column("Arms Category"),
        SourceDescriptor::new(
            "top_200_arms_imports",
            Sipri,
            "sipri/TIV-Import-Top-200-1950-2022.csv",
        )
        .index_column("Rank 1950-2022"),
        SourceDescriptor::new(
            "top_200_arms_exports",
            Sipri,
            "sipri/TIV-Export-Top-200-1950-2022.csv",
        )
        .index_column("Rank 1950-2022"),
        SourceDescriptor::new(
            "bloomberg_defense_industry",
            Bloomberg,
            "bloomberg/BI_AEROG_1 Defense Industry.csv",
        )
        .index_column("Description"),
        SourceDescriptor::new(
            "bloomberg_us_can_construction",
            Bloomberg,
            "bloomberg/BI_CONSG_1 DATA US CAN.csv",
        )
        .index_column("Description"),
        SourceDescriptor::new(
            "bloomberg_defense_budget",
            Bloomberg,
            "bloomberg/BI_DEFCG_1Defense Budget.csv",
        )
        .index_column("Description"),
        SourceDescriptor::new(
            "bloomberg_cybersecurity_fundflows",
            Bloomberg,
            "bloomberg/BI_ETFSG_1 Sector keyword cybersecurity fundflows equity.csv",
        )
        .index_column("Description"),
        SourceDescriptor::new("gdp", WorldBank, "world_bank/GDP_1960-2022.csv")
            .cleaner(Cleaner::NormalizeYearHeaders),
    ]
}
