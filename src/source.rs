//! Enrollment record sources and load-time normalization.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::{debug, info};
use once_cell::sync::Lazy;
use polars::prelude::*;
use regex::Regex;

use crate::calendar::Season;
use crate::error::Result;
use crate::frame;
use crate::schema::record;

/// Anything that can hand over a batch of raw roster rows.
pub trait DataSource {
    fn fetch_records(&self) -> Result<DataFrame>;
}

/// In-memory batches, already shaped like roster rows.
impl DataSource for DataFrame {
    fn fetch_records(&self) -> Result<DataFrame> {
        Ok(self.clone())
    }
}

/// A consolidated roster exported as CSV.
#[derive(Debug, Clone)]
pub struct CsvDataSource {
    path: PathBuf,
    rename: Option<HashMap<String, String>>,
}

impl CsvDataSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            rename: None,
        }
    }

    /// Rename source headers to the roster schema, e.g. "Birth Date" -> "BirthDate".
    pub fn with_rename(mut self, rename: HashMap<String, String>) -> Self {
        self.rename = Some(rename);
        self
    }
}

impl DataSource for CsvDataSource {
    /// Read the CSV file with all columns as String dtype.
    /// Trims whitespace from column names and applies the optional rename.
    fn fetch_records(&self) -> Result<DataFrame> {
        let mut df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0)) // all columns as String
            .try_into_reader_with_file_path(Some(self.path.clone()))?
            .finish()?;

        let trimmed: Vec<String> = df
            .get_column_names_str()
            .iter()
            .map(|c| c.trim().to_string())
            .collect();
        df.set_column_names(trimmed.as_slice())?;

        if let Some(map) = &self.rename {
            let old: Vec<&str> = map.keys().map(|s| s.as_str()).collect();
            let new: Vec<&str> = map.values().map(|s| s.as_str()).collect();
            df = df.lazy().rename(old, new, false).collect()?;
        }

        info!("Read {} rows from {}", df.height(), self.path.display());
        Ok(df)
    }
}

static PARENTHETICAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s?\(.*\)").unwrap());

/// Strip a parenthetical note from a surname: "Smith (twin)" -> "Smith".
pub fn clean_last_name(last_name: &str) -> String {
    PARENTHETICAL.replace_all(last_name, "").into_owned()
}

/// Identity of a dancer as the roster consolidation derives it.
pub fn synthesize_dancer_id(first_name: &str, last_name: &str, birth_date: &str) -> String {
    format!("{}_{}_{}", first_name, clean_last_name(last_name), birth_date)
}

/// Bring a raw batch into the shape the calendar expects.
///
/// - optional columns missing from the source are added as all-null strings
/// - `Year` becomes Int64 (unparseable -> null)
/// - `Session` becomes Int64 (unparseable or missing -> 0)
/// - `Season` is trimmed and title-cased
/// - `DancerID` is synthesized where absent
pub fn normalize_records(raw: DataFrame) -> Result<DataFrame> {
    frame::require_columns(&raw, &record::REQUIRED)?;

    let mut df = raw;
    let height = df.height();
    for name in record::OPTIONAL.iter().chain([&record::DANCER_ID]) {
        if df.column(name).is_err() {
            debug!("Source has no '{name}' column; filling with nulls");
            df.with_column(Column::full_null((*name).into(), height, &DataType::String))?;
        }
    }

    let mut text_columns: Vec<Expr> = record::OPTIONAL
        .iter()
        .chain([&record::DANCER_ID, &record::BIRTH_DATE, &record::SEASON])
        .map(|name| col(*name).cast(DataType::String))
        .collect();
    text_columns.push(numeric(record::YEAR));
    text_columns.push(numeric(record::SESSION).fill_null(lit(0i64)));

    let mut df = df.lazy().with_columns(text_columns).collect()?;

    let seasons: Vec<Option<String>> = frame::string_values(&df, record::SEASON)?
        .into_iter()
        .map(|s| s.map(|s| canonical_season(&s)))
        .collect();
    df.with_column(Column::new(record::SEASON.into(), seasons))?;

    let ids = dancer_ids(&df)?;
    df.with_column(Column::new(record::DANCER_ID.into(), ids))?;

    Ok(df)
}

/// Strip and parse a text column as an integer, accepting "2021" and "2021.0".
fn numeric(name: &str) -> Expr {
    col(name)
        .cast(DataType::String)
        .str()
        .strip_chars(lit(" \t\r\n"))
        .cast(DataType::Float64)
        .cast(DataType::Int64)
}

fn canonical_season(raw: &str) -> String {
    match raw.parse::<Season>() {
        Ok(season) => season.as_str().to_string(),
        Err(_) => title_case(raw.trim()),
    }
}

fn title_case(s: &str) -> String {
    s.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

fn dancer_ids(df: &DataFrame) -> Result<Vec<Option<String>>> {
    let existing = frame::string_values(df, record::DANCER_ID)?;
    let first = frame::string_values(df, record::FIRST_NAME)?;
    let last = frame::string_values(df, record::LAST_NAME)?;
    let births = frame::string_values(df, record::BIRTH_DATE)?;

    let mut synthesized = 0usize;
    let ids = existing
        .into_iter()
        .enumerate()
        .map(|(i, id)| match id.filter(|id| !id.trim().is_empty()) {
            Some(id) => Some(id),
            None => {
                let id = synthesize_dancer_id(
                    first[i].as_deref()?,
                    last[i].as_deref()?,
                    births[i].as_deref()?,
                );
                synthesized += 1;
                Some(id)
            }
        })
        .collect();

    if synthesized > 0 {
        debug!("Synthesized {synthesized} dancer ids from name and birth date");
    }
    Ok(ids)
}
