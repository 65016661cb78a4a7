//! The labelled table type shared by the pipeline and the read side.
//!
//! A [`Table`] is a polars `DataFrame` plus an optional row-label column.
//! The row-label column, when declared, always sits first in the frame and
//! is not a data column: it is excluded from [`Table::column_labels`], from
//! cleaning, and from the `data` grid of the split representation.

use crate::error::{PipelineError, Result};
use crate::utils::is_numeric_dtype;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::fmt;

/// Provenance tag of a dataset.
///
/// Pure tagging: no behavior depends on the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    /// Stockholm International Peace Research Institute
    Sipri,
    /// World Bank open data
    WorldBank,
    /// Bloomberg Intelligence exports
    Bloomberg,
    #[default]
    Other,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Provider::Sipri => "sipri",
            Provider::WorldBank => "world_bank",
            Provider::Bloomberg => "bloomberg",
            Provider::Other => "other",
        };
        f.write_str(name)
    }
}

/// Rectangular, labelled data.
#[derive(Debug, Clone)]
pub struct Table {
    frame: DataFrame,
    index: Option<String>,
    provider: Provider,
}

impl Table {
    /// Wrap a frame, promoting `index` to the row-label column.
    ///
    /// The row-label column is moved to the front of the frame.
    pub fn new(frame: DataFrame, index: Option<String>) -> Result<Self> {
        let frame = match &index {
            Some(name) => {
                let names = column_names(&frame);
                if !names.iter().any(|n| n == name) {
                    return Err(PipelineError::Polars(PolarsError::ColumnNotFound(
                        format!("row-label column '{}' not found", name).into(),
                    )));
                }
                if names.first() == Some(name) {
                    frame
                } else {
                    let order = std::iter::once(name.clone())
                        .chain(names.into_iter().filter(|n| n != name));
                    frame.select(order)?
                }
            }
            None => frame,
        };

        Ok(Self {
            frame,
            index,
            provider: Provider::default(),
        })
    }

    /// Wrap a frame with positional row labels.
    pub fn positional(frame: DataFrame) -> Self {
        Self {
            frame,
            index: None,
            provider: Provider::default(),
        }
    }

    pub fn with_provider(mut self, provider: Provider) -> Self {
        self.provider = provider;
        self
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    /// Name of the row-label column, if one is declared.
    pub fn index_column(&self) -> Option<&str> {
        self.index.as_deref()
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    /// Replace the underlying frame, keeping labels metadata.
    ///
    /// The row-label column must still be present in `frame`.
    pub(crate) fn with_frame(self, frame: DataFrame) -> Result<Self> {
        let provider = self.provider;
        Ok(Table::new(frame, self.index)?.with_provider(provider))
    }

    /// Ordered data column labels (row-label column excluded).
    pub fn column_labels(&self) -> Vec<String> {
        column_names(&self.frame)
            .into_iter()
            .filter(|n| Some(n.as_str()) != self.index.as_deref())
            .collect()
    }

    /// Data columns in order (row-label column excluded).
    pub fn data_columns(&self) -> impl Iterator<Item = &Column> {
        let index = self.index.clone();
        self.frame
            .get_columns()
            .iter()
            .filter(move |c| Some(c.name().as_str()) != index.as_deref())
    }

    /// Ordered row labels: row-label column values, or `0..n`.
    pub fn row_labels(&self) -> Result<Vec<Value>> {
        match &self.index {
            Some(name) => {
                let column = self.frame.column(name)?;
                (0..column.len())
                    .map(|i| Ok(any_value_to_json(column.get(i)?)))
                    .collect()
            }
            None => Ok((0..self.frame.height()).map(Value::from).collect()),
        }
    }

    /// `(rows, data columns)`.
    pub fn shape(&self) -> (usize, usize) {
        let width = self.frame.width() - usize::from(self.index.is_some());
        (self.frame.height(), width)
    }

    /// Serialize to the "split" representation (columns, index, data).
    pub fn to_split(&self) -> Result<SplitTable> {
        let columns = self.column_labels();
        let index = self.row_labels()?;
        let data_columns: Vec<&Column> = self.data_columns().collect();

        let mut data = Vec::with_capacity(self.frame.height());
        for row in 0..self.frame.height() {
            let mut values = Vec::with_capacity(data_columns.len());
            for column in &data_columns {
                values.push(any_value_to_json(column.get(row)?));
            }
            data.push(values);
        }

        Ok(SplitTable {
            columns,
            index,
            data,
        })
    }

    /// Per-column descriptive summary for viewers.
    pub fn describe(&self) -> Result<Vec<ColumnSummary>> {
        self.data_columns()
            .map(|column| {
                let series = column.as_materialized_series();
                let null_count = series.null_count();
                let (mean, min, max) = if is_numeric_dtype(series.dtype()) {
                    let floats = series.cast(&DataType::Float64)?;
                    (
                        floats.mean(),
                        floats.min::<f64>()?,
                        floats.max::<f64>()?,
                    )
                } else {
                    (None, None, None)
                };

                Ok(ColumnSummary {
                    name: series.name().to_string(),
                    dtype: series.dtype().to_string(),
                    count: series.len() - null_count,
                    null_count,
                    mean,
                    min,
                    max,
                })
            })
            .collect()
    }

    /// Structural and value equality, nulls compared equal.
    pub fn same_as(&self, other: &Table) -> bool {
        self.index == other.index && self.frame.equals_missing(&other.frame)
    }
}

/// The "split" exchange shape consumers rely on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitTable {
    pub columns: Vec<String>,
    pub index: Vec<Value>,
    pub data: Vec<Vec<Value>>,
}

/// Descriptive statistics of one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSummary {
    pub name: String,
    pub dtype: String,
    pub count: usize,
    pub null_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

pub(crate) fn column_names(frame: &DataFrame) -> Vec<String> {
    frame
        .get_column_names()
        .into_iter()
        .map(|s| s.to_string())
        .collect()
}

/// Converts a polars cell to JSON.
///
/// NaN and infinite floats become `null`; temporal and nested values are
/// stringified.
pub(crate) fn any_value_to_json(value: AnyValue) -> Value {
    match value {
        AnyValue::Null => Value::Null,
        AnyValue::Boolean(b) => Value::Bool(b),

        AnyValue::Int8(i) => Value::Number(i.into()),
        AnyValue::Int16(i) => Value::Number(i.into()),
        AnyValue::Int32(i) => Value::Number(i.into()),
        AnyValue::Int64(i) => Value::Number(i.into()),

        AnyValue::UInt8(u) => Value::Number(u.into()),
        AnyValue::UInt16(u) => Value::Number(u.into()),
        AnyValue::UInt32(u) => Value::Number(u.into()),
        AnyValue::UInt64(u) => Value::Number(u.into()),

        AnyValue::Float32(f) => Number::from_f64(f as f64)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        AnyValue::Float64(f) => Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),

        AnyValue::String(s) => Value::String(s.to_string()),
        AnyValue::StringOwned(s) => Value::String(s.to_string()),

        _ => Value::String(format!("{}", value)),
    }
}
