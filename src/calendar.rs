//! School-year calendar.
//!
//! A school year starts in the fall of calendar year `Y` and runs through the
//! camp session of `Y + 1`. Rows are tagged with the calendar year printed on
//! the source roster, so the mapping to a school year depends on the season.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use log::{debug, warn};
use polars::prelude::*;

use crate::error::{DashboardError, Result};
use crate::frame;
use crate::schema::{derived, record};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Season {
    Fall,
    Winter,
    Spring,
    Summer,
    Camp,
}

impl Season {
    pub const ALL: [Season; 5] = [
        Season::Fall,
        Season::Winter,
        Season::Spring,
        Season::Summer,
        Season::Camp,
    ];

    /// Position of the season within a school year, 1 through 5.
    pub fn order(self) -> i64 {
        match self {
            Season::Fall => 1,
            Season::Winter => 2,
            Season::Spring => 3,
            Season::Summer => 4,
            Season::Camp => 5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Season::Fall => "Fall",
            Season::Winter => "Winter",
            Season::Spring => "Spring",
            Season::Summer => "Summer",
            Season::Camp => "Camp",
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Season {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        Season::ALL
            .into_iter()
            .find(|season| season.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| DashboardError::InvalidValue(format!("unknown season '{trimmed}'")))
    }
}

/// Display string for a school year: 2021 -> "2021-22".
pub fn school_year_string(school_year: i64) -> String {
    format!("{}-{:02}", school_year, (school_year - 1999).rem_euclid(100))
}

/// Canonical total order over (school year, season, session).
pub fn sort_key(school_year: i64, season: Season, session: i64) -> i64 {
    school_year * 100 + season.order() * 10 + session
}

// Summer terms tagged 2022 belong to the 2021-22 school year. Source rosters
// for that one summer were labelled with the wrong calendar year.
const SUMMER_OVERRIDE_YEAR: i64 = 2022;
const SUMMER_OVERRIDE_SCHOOL_YEAR: i64 = 2021;

/// (calendar-year offset, season, session) of one school-year cycle.
const CYCLE: [(i64, Season, i64); 9] = [
    (0, Season::Fall, 1),
    (0, Season::Fall, 2),
    (1, Season::Winter, 1),
    (1, Season::Winter, 2),
    (1, Season::Spring, 1),
    (1, Season::Spring, 2),
    (1, Season::Summer, 1),
    (1, Season::Summer, 2),
    (1, Season::Camp, 3),
];

/// Lookup table from (calendar year, season, session) to school year.
///
/// The table only covers cycles that start in a calendar year present in the
/// data: a Winter 2022 row maps to 2021 only if some row carries year 2021.
#[derive(Debug, Clone, Default)]
pub struct CalendarMapper {
    table: HashMap<(i64, Season, i64), i64>,
}

impl CalendarMapper {
    pub fn from_years<I: IntoIterator<Item = i64>>(years: I) -> Self {
        let starts: BTreeSet<i64> = years.into_iter().collect();
        let mut table = HashMap::with_capacity(starts.len() * CYCLE.len());
        for &start in &starts {
            for (offset, season, session) in CYCLE {
                table.insert((start + offset, season, session), start);
            }
        }
        debug!(
            "Calendar table built for {} starting years ({} periods)",
            starts.len(),
            table.len()
        );
        Self { table }
    }

    pub fn school_year(&self, year: i64, season: Season, session: i64) -> Option<i64> {
        if year == SUMMER_OVERRIDE_YEAR && season == Season::Summer {
            return Some(SUMMER_OVERRIDE_SCHOOL_YEAR);
        }
        self.table.get(&(year, season, session)).copied()
    }

    /// Add `School Year` and `School Year String` to a normalized frame.
    ///
    /// Rows without a mapping keep null values in both columns.
    pub fn map_frame(df: DataFrame) -> Result<DataFrame> {
        frame::require_columns(&df, &[record::YEAR, record::SEASON, record::SESSION])?;

        let years = frame::int_values(&df, record::YEAR)?;
        let seasons = frame::string_values(&df, record::SEASON)?;
        let sessions = frame::int_values(&df, record::SESSION)?;

        let mapper = Self::from_years(years.iter().flatten().copied());

        let school_years: Vec<Option<i64>> = years
            .iter()
            .zip(&seasons)
            .zip(&sessions)
            .map(|((year, season), session)| {
                let season = season.as_deref()?.parse::<Season>().ok()?;
                mapper.school_year((*year)?, season, (*session)?)
            })
            .collect();
        let labels: Vec<Option<String>> = school_years
            .iter()
            .map(|sy| sy.map(school_year_string))
            .collect();

        let unmapped = school_years.iter().filter(|sy| sy.is_none()).count();
        if unmapped > 0 {
            warn!("{unmapped} rows have no school-year mapping; leaving them unassigned");
        }

        let mut df = df;
        df.with_column(Column::new(derived::SCHOOL_YEAR.into(), school_years))?;
        df.with_column(Column::new(derived::SCHOOL_YEAR_STRING.into(), labels))?;
        Ok(df)
    }
}

/// Add `Season_Order` and the canonical `SortKey` columns.
pub fn with_sort_keys(df: DataFrame) -> Result<DataFrame> {
    let school_years = frame::int_values(&df, derived::SCHOOL_YEAR)?;
    let seasons = frame::string_values(&df, record::SEASON)?;
    let sessions = frame::int_values(&df, record::SESSION)?;

    let parsed: Vec<Option<Season>> = seasons
        .iter()
        .map(|s| s.as_deref().and_then(|s| s.parse().ok()))
        .collect();
    let orders: Vec<Option<i64>> = parsed.iter().map(|s| s.map(Season::order)).collect();
    let keys: Vec<Option<i64>> = school_years
        .iter()
        .zip(&parsed)
        .zip(&sessions)
        .map(|((sy, season), session)| Some(sort_key((*sy)?, (*season)?, (*session)?)))
        .collect();

    let mut df = df;
    df.with_column(Column::new(derived::SEASON_ORDER.into(), orders))?;
    df.with_column(Column::new(derived::SORT_KEY_CANONICAL.into(), keys))?;
    Ok(df)
}
