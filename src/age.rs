//! Dancer age at the start of a season/session.

use chrono::NaiveDate;
use log::{debug, warn};
use polars::prelude::*;

use crate::calendar::Season;
use crate::error::Result;
use crate::frame;
use crate::schema::{derived, record};

pub const DEFAULT_BIRTH_DATE_FORMATS: [&str; 3] = ["%m/%d/%Y", "%b %d, %Y", "%Y-%m-%d"];

const DAYS_PER_YEAR: f64 = 365.25;

/// (month, day) on which a season/session starts.
///
/// Camp has no anchor of its own and uses January 1 of the calendar year,
/// which dates camp ages earlier than the summer sessions around them.
pub fn session_anchor(season: Season, session: i64) -> Option<(u32, u32)> {
    match (season, session) {
        (Season::Fall, 1) => Some((9, 1)),
        (Season::Fall, 2) => Some((11, 1)),
        (Season::Winter, 1) => Some((1, 1)),
        (Season::Winter, 2) => Some((2, 1)),
        (Season::Spring, 1) => Some((4, 1)),
        (Season::Spring, 2) => Some((5, 1)),
        (Season::Summer, 1) => Some((6, 1)),
        (Season::Summer, 2) => Some((7, 1)),
        (Season::Camp, _) => Some((1, 1)),
        _ => None,
    }
}

/// Round to the nearest half year, ties to even (6.25 -> 6.0, 6.75 -> 7.0).
pub fn round_to_half(age: f64) -> f64 {
    (age * 2.0).round_ties_even() / 2.0
}

#[derive(Debug, Clone)]
pub struct AgeCalculator {
    formats: Vec<String>,
}

impl Default for AgeCalculator {
    fn default() -> Self {
        Self::new(DEFAULT_BIRTH_DATE_FORMATS.iter().map(|f| f.to_string()).collect())
    }
}

impl AgeCalculator {
    pub fn new(formats: Vec<String>) -> Self {
        Self { formats }
    }

    pub fn parse_birth_date(&self, raw: &str) -> Option<NaiveDate> {
        let raw = raw.trim();
        self.formats
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
    }

    pub fn event_date(year: i64, season: Season, session: i64) -> Option<NaiveDate> {
        let (month, day) = session_anchor(season, session)?;
        NaiveDate::from_ymd_opt(i32::try_from(year).ok()?, month, day)
    }

    /// Age in half years at the session start, or `None` when any input is
    /// missing or invalid or the dancer was not yet born.
    pub fn compute_age(
        &self,
        birth_date: Option<&str>,
        year: Option<i64>,
        season: Option<Season>,
        session: Option<i64>,
    ) -> Option<f64> {
        let born = self.parse_birth_date(birth_date?)?;
        let event = Self::event_date(year?, season?, session?)?;
        let days = (event - born).num_days();
        if days < 0 {
            return None;
        }
        Some(round_to_half(days as f64 / DAYS_PER_YEAR))
    }

    /// Add the `Age` column to a normalized frame.
    pub fn apply(&self, df: DataFrame) -> Result<DataFrame> {
        frame::require_columns(
            &df,
            &[record::BIRTH_DATE, record::YEAR, record::SEASON, record::SESSION],
        )?;

        let births = frame::string_values(&df, record::BIRTH_DATE)?;
        let years = frame::int_values(&df, record::YEAR)?;
        let seasons = frame::string_values(&df, record::SEASON)?;
        let sessions = frame::int_values(&df, record::SESSION)?;

        let ages: Vec<Option<f64>> = (0..df.height())
            .map(|i| {
                let season = seasons[i].as_deref().and_then(|s| s.parse().ok());
                self.compute_age(births[i].as_deref(), years[i], season, sessions[i])
            })
            .collect();

        let missing = ages.iter().filter(|a| a.is_none()).count();
        if missing > 0 {
            warn!("{missing} rows have no computable age");
        }
        debug!("Computed ages for {} rows", ages.len() - missing);

        let mut df = df;
        df.with_column(Column::new(derived::AGE.into(), ages))?;
        Ok(df)
    }
}

/// Rows whose age falls outside `[min, max]`. Rows without an age are kept
/// out of the report.
pub fn age_outliers(df: &DataFrame, min: f64, max: f64) -> Result<DataFrame> {
    frame::require_columns(df, &[derived::AGE])?;
    let outliers = df
        .clone()
        .lazy()
        .filter(col(derived::AGE).lt(lit(min)).or(col(derived::AGE).gt(lit(max))))
        .collect()?;
    Ok(outliers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn calc() -> AgeCalculator {
        AgeCalculator::default()
    }

    #[test]
    fn age_at_fall_start() {
        // 2015-09-01 -> 2021-09-01 is 2192 days = 6.0014 years.
        let age = calc().compute_age(Some("09/01/2015"), Some(2021), Some(Season::Fall), Some(1));
        assert_eq!(age, Some(6.0));
    }

    #[test]
    fn accepts_roster_date_format() {
        let age = calc().compute_age(
            Some("Mar 15, 2014"),
            Some(2022),
            Some(Season::Spring),
            Some(1),
        );
        // 2014-03-15 -> 2022-04-01: 2939 days = 8.05 years.
        assert_eq!(age, Some(8.0));
    }

    #[test]
    fn rounds_half_ties_to_even() {
        assert_eq!(round_to_half(6.25), 6.0);
        assert_eq!(round_to_half(6.75), 7.0);
        assert_eq!(round_to_half(6.3), 6.5);
        assert_eq!(round_to_half(6.7), 6.5);
    }

    #[test]
    fn camp_falls_back_to_january_first() {
        let c = calc();
        let camp = c.compute_age(Some("01/01/2010"), Some(2022), Some(Season::Camp), Some(3));
        let winter = c.compute_age(Some("01/01/2010"), Some(2022), Some(Season::Winter), Some(1));
        assert_eq!(camp, Some(12.0));
        assert_eq!(camp, winter);
    }

    #[test]
    fn invalid_inputs_have_no_age() {
        let c = calc();
        assert_eq!(c.compute_age(None, Some(2021), Some(Season::Fall), Some(1)), None);
        assert_eq!(c.compute_age(Some("not a date"), Some(2021), Some(Season::Fall), Some(1)), None);
        assert_eq!(c.compute_age(Some("01/01/2010"), None, Some(Season::Fall), Some(1)), None);
        assert_eq!(c.compute_age(Some("01/01/2010"), Some(2021), None, Some(1)), None);
        assert_eq!(c.compute_age(Some("01/01/2010"), Some(2021), Some(Season::Fall), Some(3)), None);
        assert_eq!(c.compute_age(Some("01/01/2010"), Some(2021), Some(Season::Fall), None), None);
    }

    #[test]
    fn born_after_session_start_has_no_age() {
        let age = calc().compute_age(Some("10/01/2021"), Some(2021), Some(Season::Fall), Some(1));
        assert_eq!(age, None);
    }

    #[test]
    fn outliers_skip_missing_ages() {
        let df = DataFrame::new(vec![Column::new(
            derived::AGE.into(),
            &[Some(0.5f64), Some(8.0), None, Some(17.0)],
        )])
        .unwrap();
        let out = age_outliers(&df, 1.0, 16.0).unwrap();
        assert_eq!(
            frame::float_values(&out, derived::AGE).unwrap(),
            vec![Some(0.5), Some(17.0)]
        );
    }
}
