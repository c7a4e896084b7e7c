//! New/returning classification of enrollments.
//!
//! Rows are scanned once in chronological order while a `last_seen` map keeps
//! each dancer's most recent (school year, session index). Whether a row is a
//! new acquisition depends on the display mode:
//!
//! - All Time: the dancer has never been seen.
//! - Intra Year: never seen, or last seen in another school year.
//! - Session (Consecutive): never seen, or at least one bucket was skipped
//!   (`Session_Index` gap greater than one).
//!
//! The two year-crossing rules can disagree. A dancer seen in Summer 2 of one
//! year and Fall 1 of the next is new under Intra Year, but returning under
//! Session (Consecutive) when no bucket lies between the two on the axis.

use std::collections::HashMap;

use log::debug;
use polars::prelude::*;

use crate::axis::DisplayMode;
use crate::error::Result;
use crate::frame;
use crate::schema::{derived, metrics, record};

/// One enrollment as the classifier sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CohortRow {
    pub dancer_id: String,
    pub label: String,
    pub school_year: i64,
    pub school_year_string: Option<String>,
    pub session_index: i64,
    pub sort_key: i64,
    /// Ingestion position; breaks ties between rows sharing a sort key.
    pub row_id: i64,
    pub group: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LastSeen {
    pub school_year: i64,
    pub session_index: i64,
}

impl From<&CohortRow> for LastSeen {
    fn from(row: &CohortRow) -> Self {
        Self {
            school_year: row.school_year,
            session_index: row.session_index,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CohortClassifier {
    mode: DisplayMode,
}

impl CohortClassifier {
    pub fn new(mode: DisplayMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    pub fn is_new(&self, previous: Option<&LastSeen>, current: &LastSeen) -> bool {
        let Some(last) = previous else {
            return true;
        };
        match self.mode {
            DisplayMode::AllTime => false,
            DisplayMode::IntraYear => last.school_year != current.school_year,
            DisplayMode::SessionConsecutive => current.session_index - last.session_index > 1,
        }
    }

    /// The newly acquired rows, in scan order.
    ///
    /// Rows are ordered by `(sort_key, row_id)`; `last_seen` is overwritten
    /// after every row whether or not it was new.
    pub fn classify_rows(&self, mut rows: Vec<CohortRow>) -> Vec<CohortRow> {
        rows.sort_by_key(|row| (row.sort_key, row.row_id));

        let (last_seen, acquired) = rows.into_iter().fold(
            (HashMap::<String, LastSeen>::new(), Vec::new()),
            |(mut last_seen, mut acquired), row| {
                let current = LastSeen::from(&row);
                let is_new = self.is_new(last_seen.get(&row.dancer_id), &current);
                last_seen.insert(row.dancer_id.clone(), current);
                if is_new {
                    acquired.push(row);
                }
                (last_seen, acquired)
            },
        );

        debug!(
            "'{}' scan: {} dancers, {} acquisitions",
            self.mode,
            last_seen.len(),
            acquired.len()
        );
        acquired
    }

    /// Classify a projected frame. Rows lacking a dancer id or any axis
    /// column are skipped.
    pub fn classify(&self, df: &DataFrame, group_by: Option<&str>) -> Result<Vec<CohortRow>> {
        Ok(self.classify_rows(cohort_rows(df, group_by)?))
    }
}

/// Extract classifiable rows from a projected frame.
pub fn cohort_rows(df: &DataFrame, group_by: Option<&str>) -> Result<Vec<CohortRow>> {
    frame::require_columns(
        df,
        &[
            record::DANCER_ID,
            derived::X_AXIS_LABEL,
            derived::SCHOOL_YEAR,
            derived::SCHOOL_YEAR_STRING,
            derived::SESSION_INDEX,
            derived::SORT_KEY,
            derived::ROW_ID,
        ],
    )?;

    let dancers = frame::string_values(df, record::DANCER_ID)?;
    let labels = frame::string_values(df, derived::X_AXIS_LABEL)?;
    let school_years = frame::int_values(df, derived::SCHOOL_YEAR)?;
    let year_strings = frame::string_values(df, derived::SCHOOL_YEAR_STRING)?;
    let indices = frame::int_values(df, derived::SESSION_INDEX)?;
    let keys = frame::int_values(df, derived::SORT_KEY)?;
    let row_ids = frame::int_values(df, derived::ROW_ID)?;
    let groups = match group_by {
        Some(column) => frame::rendered_values(df, column)?,
        None => vec![None; df.height()],
    };

    let rows = dancers
        .into_iter()
        .zip(labels)
        .zip(year_strings)
        .zip(groups)
        .enumerate()
        .filter_map(|(i, (((dancer, label), year_string), group))| {
            Some(CohortRow {
                dancer_id: dancer?,
                label: label?,
                school_year: school_years[i]?,
                school_year_string: year_string,
                session_index: indices[i]?,
                sort_key: keys[i]?,
                row_id: row_ids[i].unwrap_or(i as i64),
                group,
            })
        })
        .collect();
    Ok(rows)
}

/// Acquisition events as a frame, in scan order.
pub fn acquisitions_frame(rows: &[CohortRow]) -> Result<DataFrame> {
    let df = DataFrame::new(vec![
        Column::new(
            record::DANCER_ID.into(),
            rows.iter().map(|r| r.dancer_id.as_str()).collect::<Vec<_>>(),
        ),
        Column::new(
            derived::X_AXIS_LABEL.into(),
            rows.iter().map(|r| r.label.as_str()).collect::<Vec<_>>(),
        ),
        Column::new(
            derived::SCHOOL_YEAR.into(),
            rows.iter().map(|r| r.school_year).collect::<Vec<_>>(),
        ),
        Column::new(
            derived::SCHOOL_YEAR_STRING.into(),
            rows.iter()
                .map(|r| r.school_year_string.as_deref())
                .collect::<Vec<_>>(),
        ),
        Column::new(
            derived::SESSION_INDEX.into(),
            rows.iter().map(|r| r.session_index).collect::<Vec<_>>(),
        ),
        Column::new(
            derived::SORT_KEY.into(),
            rows.iter().map(|r| r.sort_key).collect::<Vec<_>>(),
        ),
        Column::new(
            derived::ROW_ID.into(),
            rows.iter().map(|r| r.row_id).collect::<Vec<_>>(),
        ),
        Column::new(
            metrics::GROUP.into(),
            rows.iter().map(|r| r.group.as_deref()).collect::<Vec<_>>(),
        ),
    ])?;
    Ok(df)
}
