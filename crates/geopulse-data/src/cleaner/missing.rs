//! Missing value substitution.

use crate::error::Result;
use crate::table::Table;
use crate::utils::{DtypeCategory, get_dtype_category};
use polars::prelude::*;
use tracing::debug;

/// Fill value for text columns; matches what a numeric `0` fill renders as.
pub const FILL_TEXT: &str = "0";

/// Replace every missing cell of the data columns with a neutral value.
///
/// | dtype   | fill              |
/// |---------|-------------------|
/// | integer | `0` (dtype kept)  |
/// | float   | `0.0`, NaN too    |
/// | boolean | `false`           |
/// | string  | `"0"`             |
///
/// Other dtypes are left as they are. The row-label column is never touched.
pub fn fill_missing(table: Table) -> Result<Table> {
    let mut filled_nulls = 0usize;
    let exprs: Vec<Expr> = table
        .data_columns()
        .filter_map(|column| {
            let expr = fill_expr(column.name().as_str(), column.dtype());
            if expr.is_some() {
                filled_nulls += column.null_count();
            } else if column.null_count() > 0 {
                debug!(
                    "Leaving {} missing values in '{}' ({})",
                    column.null_count(),
                    column.name(),
                    column.dtype()
                );
            }
            expr
        })
        .collect();

    if exprs.is_empty() {
        return Ok(table);
    }

    let frame = table.frame().clone().lazy().with_columns(exprs).collect()?;
    debug!("Filled {} missing values", filled_nulls);
    table.with_frame(frame)
}

fn fill_expr(name: &str, dtype: &DataType) -> Option<Expr> {
    let expr = match get_dtype_category(dtype) {
        DtypeCategory::Integer => col(name).fill_null(lit(0)).cast(dtype.clone()),
        DtypeCategory::Float => col(name)
            .fill_nan(lit(0.0))
            .fill_null(lit(0.0))
            .cast(dtype.clone()),
        DtypeCategory::Boolean => col(name).fill_null(lit(false)),
        DtypeCategory::String => col(name).cast(DataType::String).fill_null(lit(FILL_TEXT)),
        DtypeCategory::Other => return None,
    };
    Some(expr)
}
