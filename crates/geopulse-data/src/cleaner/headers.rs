//! Column header normalization.

use crate::error::{PipelineError, Result};
use crate::table::{Table, column_names};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use tracing::{debug, info};

/// A space followed by a bracketed word, e.g. `" [YR1960]"`.
static YEAR_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r" \[\w*\]").expect("Invalid regex: year tag"));

/// Strip a bracketed tag from a single label.
pub(crate) fn strip_year_tag(label: &str) -> String {
    YEAR_TAG.replace_all(label, "").into_owned()
}

/// Remove bracketed year tags from data column labels.
///
/// `"1960 [YR1960]"` becomes `"1960"`; labels without a tag are unchanged.
/// Fails if two labels collapse to the same name.
pub fn normalize_year_headers(table: Table) -> Result<Table> {
    info!("Normalizing year headers...");

    let index = table.index_column().map(str::to_string);
    let old_names = column_names(table.frame());
    let new_names: Vec<String> = old_names
        .iter()
        .map(|name| {
            if Some(name) == index.as_ref() {
                name.clone()
            } else {
                strip_year_tag(name)
            }
        })
        .collect();

    if new_names == old_names {
        debug!("No year tags found");
        return Ok(table);
    }

    let mut seen = HashSet::with_capacity(new_names.len());
    for name in &new_names {
        if !seen.insert(name.as_str()) {
            return Err(PipelineError::Cleaning {
                cleaner: "normalize_year_headers".to_string(),
                reason: format!("column '{}' would appear twice", name),
            });
        }
    }

    let renamed = old_names
        .iter()
        .zip(&new_names)
        .filter(|(old, new)| old != new)
        .count();

    let mut frame = table.frame().clone();
    frame.set_column_names(new_names.iter().map(String::as_str))?;
    debug!("Renamed {} columns", renamed);

    table.with_frame(frame)
}
