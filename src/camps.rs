//! Camp carry-over: how camp dancers relate to the rest of their school year
//! and to the previous year's camps.

use std::collections::{BTreeMap, BTreeSet};

use log::debug;
use polars::prelude::*;

use crate::calendar::{self, Season};
use crate::error::Result;
use crate::frame;
use crate::schema::{camps, derived, record};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CampYearReport {
    pub school_year: i64,
    /// Camp dancers also enrolled outside Camp in the same school year.
    pub appearing_earlier: u32,
    /// Camp dancers of the previous school year who are camp dancers again.
    /// `None` for the first camp year.
    pub from_previous_camp: Option<u32>,
}

#[derive(Default)]
struct YearDancers<'a> {
    camp: BTreeSet<&'a str>,
    other: BTreeSet<&'a str>,
}

/// One entry per school year with Camp enrollments, oldest first.
pub fn camp_carryover(df: &DataFrame) -> Result<Vec<CampYearReport>> {
    frame::require_columns(df, &[record::DANCER_ID, record::SEASON, derived::SCHOOL_YEAR])?;

    let dancers = frame::string_values(df, record::DANCER_ID)?;
    let seasons = frame::string_values(df, record::SEASON)?;
    let school_years = frame::int_values(df, derived::SCHOOL_YEAR)?;

    let mut years: BTreeMap<i64, YearDancers> = BTreeMap::new();
    for ((dancer, season), school_year) in dancers.iter().zip(&seasons).zip(&school_years) {
        let (Some(dancer), Some(school_year)) = (dancer, school_year) else {
            continue;
        };
        let is_camp = season.as_deref() == Some(Season::Camp.as_str());
        let entry = years.entry(*school_year).or_default();
        if is_camp {
            entry.camp.insert(dancer.as_str());
        } else {
            entry.other.insert(dancer.as_str());
        }
    }

    let camp_years: Vec<i64> = years
        .iter()
        .filter(|(_, d)| !d.camp.is_empty())
        .map(|(y, _)| *y)
        .collect();
    debug!("Camp enrollments found in {} school years", camp_years.len());

    let report = camp_years
        .iter()
        .enumerate()
        .map(|(position, &year)| {
            let current = &years[&year];
            let from_previous_camp = (position > 0).then(|| {
                years
                    .get(&(year - 1))
                    .map_or(0, |prev| prev.camp.intersection(&current.camp).count() as u32)
            });
            CampYearReport {
                school_year: year,
                appearing_earlier: current.camp.intersection(&current.other).count() as u32,
                from_previous_camp,
            }
        })
        .collect();
    Ok(report)
}

pub fn camp_report_frame(report: &[CampYearReport]) -> Result<DataFrame> {
    let df = DataFrame::new(vec![
        Column::new(
            derived::SCHOOL_YEAR.into(),
            report.iter().map(|r| r.school_year).collect::<Vec<_>>(),
        ),
        Column::new(
            derived::SCHOOL_YEAR_STRING.into(),
            report
                .iter()
                .map(|r| calendar::school_year_string(r.school_year))
                .collect::<Vec<_>>(),
        ),
        Column::new(
            camps::APPEARING_EARLIER.into(),
            report.iter().map(|r| r.appearing_earlier).collect::<Vec<_>>(),
        ),
        Column::new(
            camps::FROM_PREVIOUS_CAMP.into(),
            report.iter().map(|r| r.from_previous_camp).collect::<Vec<_>>(),
        ),
    ])?;
    Ok(df)
}
