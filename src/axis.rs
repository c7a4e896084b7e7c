//! X-axis projection for the three display granularities.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use log::debug;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::calendar::{self, Season};
use crate::error::{DashboardError, Result};
use crate::frame;
use crate::schema::{derived, mode, record};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum DisplayMode {
    /// One bucket per school year.
    #[default]
    #[serde(rename = "All Time", alias = "all_time")]
    AllTime,
    #[serde(rename = "Intra Year", alias = "intra_year")]
    IntraYear,
    #[serde(rename = "Session (Consecutive)", alias = "session_consecutive")]
    SessionConsecutive,
}

impl DisplayMode {
    pub const ALL: [DisplayMode; 3] = [
        DisplayMode::AllTime,
        DisplayMode::IntraYear,
        DisplayMode::SessionConsecutive,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DisplayMode::AllTime => mode::ALL_TIME,
            DisplayMode::IntraYear => mode::INTRA_YEAR,
            DisplayMode::SessionConsecutive => mode::SESSION_CONSECUTIVE,
        }
    }
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DisplayMode {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            mode::ALL_TIME | "all_time" => Ok(DisplayMode::AllTime),
            mode::INTRA_YEAR | "intra_year" => Ok(DisplayMode::IntraYear),
            mode::SESSION_CONSECUTIVE | "session_consecutive" => {
                Ok(DisplayMode::SessionConsecutive)
            }
            other => Err(DashboardError::InvalidValue(format!(
                "Invalid display mode: '{other}'. Must be one of '{}', '{}', '{}'",
                mode::ALL_TIME,
                mode::INTRA_YEAR,
                mode::SESSION_CONSECUTIVE
            ))),
        }
    }
}

/// Camp is folded into the preceding Summer 2 bucket on the axis.
pub fn normalize_label(label: &str) -> String {
    label.replace("Camp 3", "Summer 2")
}

/// Un-normalized bucket label and sort key of one row.
pub fn bucket(
    mode: DisplayMode,
    school_year: i64,
    season: &str,
    session: i64,
) -> Option<(String, i64)> {
    let label_year = calendar::school_year_string(school_year);
    match mode {
        DisplayMode::AllTime => Some((label_year, school_year)),
        DisplayMode::IntraYear | DisplayMode::SessionConsecutive => {
            let parsed: Season = season.parse().ok()?;
            Some((
                format!("{label_year} {season} {session}"),
                calendar::sort_key(school_year, parsed, session),
            ))
        }
    }
}

/// Dense 0..K-1 index over labels, ordered by the smallest sort key seen for
/// each label and then by the label text.
pub fn session_indices<'a, I>(labelled: I) -> HashMap<String, i64>
where
    I: IntoIterator<Item = (&'a str, i64)>,
{
    let mut min_keys: HashMap<&str, i64> = HashMap::new();
    for (label, key) in labelled {
        min_keys
            .entry(label)
            .and_modify(|k| *k = (*k).min(key))
            .or_insert(key);
    }

    let mut ordered: Vec<(&str, i64)> = min_keys.into_iter().collect();
    ordered.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)));

    ordered
        .into_iter()
        .enumerate()
        .map(|(index, (label, _))| (label.to_string(), index as i64))
        .collect()
}

/// Add `x_axisLabel`, `Sort_Key` and `Session_Index` for `mode`.
///
/// Rows without a school year (or with an unknown season outside All Time)
/// get nulls in all three columns.
pub fn project(df: DataFrame, mode: DisplayMode) -> Result<DataFrame> {
    frame::require_columns(&df, &[derived::SCHOOL_YEAR, record::SEASON, record::SESSION])?;

    let school_years = frame::int_values(&df, derived::SCHOOL_YEAR)?;
    let seasons = frame::string_values(&df, record::SEASON)?;
    let sessions = frame::int_values(&df, record::SESSION)?;

    let buckets: Vec<Option<(String, i64)>> = (0..df.height())
        .map(|i| {
            let school_year = school_years[i]?;
            let season = seasons[i].as_deref().unwrap_or_default();
            let session = sessions[i].unwrap_or(0);
            bucket(mode, school_year, season, session)
                .map(|(label, key)| (normalize_label(&label), key))
        })
        .collect();

    let index = session_indices(
        buckets
            .iter()
            .flatten()
            .map(|(label, key)| (label.as_str(), *key)),
    );
    debug!("Projected {} rows onto {} '{mode}' buckets", df.height(), index.len());

    let labels: Vec<Option<&str>> = buckets
        .iter()
        .map(|b| b.as_ref().map(|(label, _)| label.as_str()))
        .collect();
    let keys: Vec<Option<i64>> = buckets.iter().map(|b| b.as_ref().map(|(_, k)| *k)).collect();
    let indices: Vec<Option<i64>> = buckets
        .iter()
        .map(|b| b.as_ref().and_then(|(label, _)| index.get(label).copied()))
        .collect();

    let mut df = df;
    df.with_column(Column::new(derived::X_AXIS_LABEL.into(), labels))?;
    df.with_column(Column::new(derived::SORT_KEY.into(), keys))?;
    df.with_column(Column::new(derived::SESSION_INDEX.into(), indices))?;
    Ok(df)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn frame_of(rows: &[(Option<i64>, &str, i64)]) -> DataFrame {
        let years: Vec<Option<i64>> = rows.iter().map(|r| r.0).collect();
        let seasons: Vec<&str> = rows.iter().map(|r| r.1).collect();
        let sessions: Vec<i64> = rows.iter().map(|r| r.2).collect();
        DataFrame::new(vec![
            Column::new(derived::SCHOOL_YEAR.into(), years),
            Column::new(record::SEASON.into(), seasons),
            Column::new(record::SESSION.into(), sessions),
        ])
        .unwrap()
    }

    #[test]
    fn mode_names_round_trip() {
        for m in DisplayMode::ALL {
            assert_eq!(m.as_str().parse::<DisplayMode>().unwrap(), m);
        }
        assert!("Weekly".parse::<DisplayMode>().is_err());
        assert_eq!(DisplayMode::default(), DisplayMode::AllTime);
    }

    #[test]
    fn all_time_buckets_by_school_year() {
        let df = frame_of(&[(Some(2021), "Fall", 1), (Some(2020), "Spring", 2), (Some(2021), "Camp", 3)]);
        let out = project(df, DisplayMode::AllTime).unwrap();
        assert_eq!(
            frame::string_values(&out, derived::X_AXIS_LABEL).unwrap(),
            vec![Some("2021-22".to_string()), Some("2020-21".to_string()), Some("2021-22".to_string())]
        );
        assert_eq!(
            frame::int_values(&out, derived::SORT_KEY).unwrap(),
            vec![Some(2021), Some(2020), Some(2021)]
        );
        assert_eq!(
            frame::int_values(&out, derived::SESSION_INDEX).unwrap(),
            vec![Some(1), Some(0), Some(1)]
        );
    }

    #[test]
    fn camp_is_displayed_as_summer_two() {
        let df = frame_of(&[
            (Some(2021), "Camp", 3),
            (Some(2021), "Summer", 2),
            (Some(2021), "Fall", 1),
        ]);
        let out = project(df, DisplayMode::IntraYear).unwrap();
        assert_eq!(
            frame::string_values(&out, derived::X_AXIS_LABEL).unwrap(),
            vec![
                Some("2021-22 Summer 2".to_string()),
                Some("2021-22 Summer 2".to_string()),
                Some("2021-22 Fall 1".to_string())
            ]
        );
        // Sort keys keep the real season.
        assert_eq!(
            frame::int_values(&out, derived::SORT_KEY).unwrap(),
            vec![Some(202153), Some(202142), Some(202111)]
        );
        assert_eq!(
            frame::int_values(&out, derived::SESSION_INDEX).unwrap(),
            vec![Some(1), Some(1), Some(0)]
        );
        assert_eq!(
            frame::string_values(&out, record::SEASON).unwrap()[0].as_deref(),
            Some("Camp")
        );
    }

    #[test]
    fn unmapped_rows_have_no_bucket() {
        let df = frame_of(&[(None, "Fall", 1), (Some(2021), "Fall", 1)]);
        let out = project(df, DisplayMode::SessionConsecutive).unwrap();
        assert_eq!(
            frame::int_values(&out, derived::SESSION_INDEX).unwrap(),
            vec![None, Some(0)]
        );
    }

    #[test]
    fn indices_are_dense_and_chronological() {
        let index = session_indices([("b", 30), ("a", 10), ("c", 20), ("a", 40)]);
        assert_eq!(index["a"], 0);
        assert_eq!(index["c"], 1);
        assert_eq!(index["b"], 2);
    }
}
