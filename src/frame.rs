//! Column access helpers shared by the pipeline stages.

use polars::prelude::*;

use crate::error::{DashboardError, Result};

pub fn require_columns(df: &DataFrame, required: &[&str]) -> Result<()> {
    for &col_name in required {
        if df.column(col_name).is_err() {
            return Err(DashboardError::MissingColumn(col_name.to_string()));
        }
    }
    Ok(())
}

/// Render every value of a column as an owned string, nulls as `None`.
///
/// Floats use Rust's shortest formatting so an age of 8.0 renders as "8" and
/// 7.5 as "7.5"; filter selections compare against these strings.
pub fn rendered_values(df: &DataFrame, column: &str) -> Result<Vec<Option<String>>> {
    let series = df
        .column(column)
        .map_err(|_| DashboardError::MissingColumn(column.to_string()))?
        .as_materialized_series()
        .rechunk();

    let values = series.iter().map(|value| render(&value)).collect();
    Ok(values)
}

pub fn render(value: &AnyValue) -> Option<String> {
    match value {
        AnyValue::Null => None,
        AnyValue::String(s) => Some(s.to_string()),
        AnyValue::StringOwned(s) => Some(s.to_string()),
        AnyValue::Float64(f) => Some(format!("{f}")),
        AnyValue::Float32(f) => Some(format!("{f}")),
        other => Some(format!("{other}")),
    }
}

/// Owned copies of a string column.
pub fn string_values(df: &DataFrame, column: &str) -> Result<Vec<Option<String>>> {
    let values = df
        .column(column)
        .map_err(|_| DashboardError::MissingColumn(column.to_string()))?
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect();
    Ok(values)
}

pub fn int_values(df: &DataFrame, column: &str) -> Result<Vec<Option<i64>>> {
    let values = df
        .column(column)
        .map_err(|_| DashboardError::MissingColumn(column.to_string()))?
        .i64()?
        .into_iter()
        .collect();
    Ok(values)
}

pub fn float_values(df: &DataFrame, column: &str) -> Result<Vec<Option<f64>>> {
    let values = df
        .column(column)
        .map_err(|_| DashboardError::MissingColumn(column.to_string()))?
        .f64()?
        .into_iter()
        .collect();
    Ok(values)
}
