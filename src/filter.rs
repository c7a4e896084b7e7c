//! Operator filter selections.
//!
//! A [`FilterContext`] is an immutable value describing which values of each
//! filterable field are selected. It is passed explicitly into every entry
//! point; no selection state lives anywhere else.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use log::{debug, warn};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{DashboardError, Result};
use crate::frame;
use crate::schema::{derived, record};

/// Filterable fields, declared in the order their options cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterField {
    SchoolYears,
    Seasons,
    Sessions,
    Cities,
    Locations,
    RegNonreg,
    Classes,
    Ages,
    Teachers,
    Days,
    Times,
}

impl FilterField {
    pub const ALL: [FilterField; 11] = [
        FilterField::SchoolYears,
        FilterField::Seasons,
        FilterField::Sessions,
        FilterField::Cities,
        FilterField::Locations,
        FilterField::RegNonreg,
        FilterField::Classes,
        FilterField::Ages,
        FilterField::Teachers,
        FilterField::Days,
        FilterField::Times,
    ];

    pub fn key(self) -> &'static str {
        match self {
            FilterField::SchoolYears => "school_years",
            FilterField::Seasons => "seasons",
            FilterField::Sessions => "sessions",
            FilterField::Cities => "cities",
            FilterField::Locations => "locations",
            FilterField::RegNonreg => "reg_nonreg",
            FilterField::Classes => "classes",
            FilterField::Ages => "ages",
            FilterField::Teachers => "teachers",
            FilterField::Days => "days",
            FilterField::Times => "times",
        }
    }

    pub fn column(self) -> &'static str {
        match self {
            FilterField::SchoolYears => derived::SCHOOL_YEAR,
            FilterField::Seasons => record::SEASON,
            FilterField::Sessions => record::SESSION,
            FilterField::Cities => record::CITY,
            FilterField::Locations => record::LOCATION,
            FilterField::RegNonreg => record::REG_NONREG,
            FilterField::Classes => record::CLASS,
            FilterField::Ages => derived::AGE,
            FilterField::Teachers => record::TEACHER,
            FilterField::Days => record::DAY,
            FilterField::Times => record::TIME,
        }
    }

    /// Numeric fields list their options in numeric order.
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            FilterField::SchoolYears | FilterField::Sessions | FilterField::Ages
        )
    }
}

impl fmt::Display for FilterField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for FilterField {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self> {
        FilterField::ALL
            .into_iter()
            .find(|field| field.key() == s.trim())
            .ok_or_else(|| DashboardError::InvalidValue(format!("unknown filter field '{s}'")))
    }
}

/// Selected values per field. A field without an entry is unconstrained; a
/// field with an entry keeps only rows whose rendered value is selected, so
/// an empty selection matches nothing and null values never match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterContext {
    selections: BTreeMap<FilterField, BTreeSet<String>>,
}

impl FilterContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<I, S>(mut self, field: FilterField, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selections
            .insert(field, values.into_iter().map(Into::into).collect());
        self
    }

    /// Build from field keys as the front end sends them.
    pub fn from_keyed(keyed: HashMap<String, Vec<String>>) -> Result<Self> {
        let mut ctx = Self::new();
        for (key, values) in keyed {
            let field: FilterField = key.parse()?;
            ctx = ctx.with(field, values);
        }
        Ok(ctx)
    }

    pub fn selection(&self, field: FilterField) -> Option<&BTreeSet<String>> {
        self.selections.get(&field)
    }

    pub fn is_unconstrained(&self) -> bool {
        self.selections.is_empty()
    }

    /// Row mask: AND across all constrained fields.
    pub fn mask(&self, df: &DataFrame) -> Result<Vec<bool>> {
        self.mask_for(df, self.selections.keys().copied())
    }

    fn mask_for<I>(&self, df: &DataFrame, fields: I) -> Result<Vec<bool>>
    where
        I: IntoIterator<Item = FilterField>,
    {
        let mut mask = vec![true; df.height()];
        for field in fields {
            let Some(selected) = self.selections.get(&field) else {
                continue;
            };
            let values = frame::rendered_values(df, field.column())?;
            for (keep, value) in mask.iter_mut().zip(values) {
                *keep = *keep && value.is_some_and(|v| selected.contains(&v));
            }
        }
        Ok(mask)
    }

    /// Rows of `df` matching every constrained field.
    pub fn apply(&self, df: &DataFrame) -> Result<DataFrame> {
        if self.is_unconstrained() {
            return Ok(df.clone());
        }
        let mask = self.mask(df)?;
        let filtered = filter_rows(df, &mask)?;
        if filtered.height() == 0 {
            warn!("No rows match the current filter selection");
        } else {
            debug!("Filter kept {} of {} rows", filtered.height(), df.height());
        }
        Ok(filtered)
    }

    /// Values each field can offer, in cascade order: the options of a field
    /// are taken from the rows that survive the selections of every field
    /// before it.
    pub fn available_values(&self, df: &DataFrame) -> Result<BTreeMap<FilterField, Vec<String>>> {
        let mut options = BTreeMap::new();
        for (position, field) in FilterField::ALL.into_iter().enumerate() {
            let mask = self.mask_for(df, FilterField::ALL[..position].iter().copied())?;
            let values = frame::rendered_values(df, field.column())?;
            let distinct: BTreeSet<String> = values
                .into_iter()
                .zip(&mask)
                .filter_map(|(value, keep)| if *keep { value } else { None })
                .collect();
            let mut distinct: Vec<String> = distinct.into_iter().collect();
            if field.is_numeric() {
                distinct.sort_by(|a, b| numeric_order(a, b));
            }
            options.insert(field, distinct);
        }
        Ok(options)
    }
}

/// Numeric ordering with unparseable values last, as text among themselves.
fn numeric_order(a: &str, b: &str) -> Ordering {
    let parse = |s: &str| s.parse::<f64>().unwrap_or(f64::INFINITY);
    parse(a)
        .partial_cmp(&parse(b))
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.cmp(b))
}

pub fn filter_rows(df: &DataFrame, mask: &[bool]) -> Result<DataFrame> {
    let mask: BooleanChunked = mask.iter().copied().collect();
    Ok(df.filter(&mask)?)
}
