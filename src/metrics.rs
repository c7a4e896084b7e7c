use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;

use log::{debug, warn};
use polars::prelude::*;

use crate::cohort::CohortRow;
use crate::error::{DashboardError, Result};
use crate::frame;
use crate::schema::{derived, metrics, record};

/// Per-bucket metrics a chart can plot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    Dancers,
    UniqueDancers,
    NewStudents,
    NewStudentPct,
    RetainedStudents,
    RetentionPct,
    Classes,
    /// Dancers per class offering. Not a percentage despite the column name.
    EnrollmentRatio,
}

impl Metric {
    pub const ALL: [Metric; 8] = [
        Metric::Dancers,
        Metric::UniqueDancers,
        Metric::NewStudents,
        Metric::NewStudentPct,
        Metric::RetainedStudents,
        Metric::RetentionPct,
        Metric::Classes,
        Metric::EnrollmentRatio,
    ];

    pub fn column(self) -> &'static str {
        match self {
            Metric::Dancers => metrics::NUMBER_OF_DANCERS,
            Metric::UniqueDancers => metrics::NUMBER_OF_UNIQUE_DANCERS,
            Metric::NewStudents => metrics::NUMBER_OF_NEW_STUDENTS,
            Metric::NewStudentPct => metrics::NEW_STUDENT_PCT,
            Metric::RetainedStudents => metrics::RETAINED_STUDENTS,
            Metric::RetentionPct => metrics::RETENTION_PCT,
            Metric::Classes => metrics::NUMBER_OF_CLASSES,
            Metric::EnrollmentRatio => metrics::ENROLLMENT_PCT,
        }
    }

    /// Chart title used by the dashboard.
    pub fn title(self) -> &'static str {
        match self {
            Metric::Dancers => "Dancer Enrollment",
            Metric::UniqueDancers => "Unique Dancers",
            Metric::NewStudents => "New Students",
            Metric::NewStudentPct => "New Dancers",
            Metric::RetainedStudents => "Retained Students",
            Metric::RetentionPct => "Retention",
            Metric::Classes => "Number of Classes",
            Metric::EnrollmentRatio => "Enrollment Ratio",
        }
    }

    pub fn is_percentage(self) -> bool {
        matches!(self, Metric::NewStudentPct | Metric::RetentionPct)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

impl FromStr for Metric {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self> {
        Metric::ALL
            .into_iter()
            .find(|m| m.column() == s.trim())
            .ok_or_else(|| DashboardError::InvalidValue(format!("unknown metric '{s}'")))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BucketMetrics {
    pub label: String,
    pub group: Option<String>,
    pub school_year_string: Option<String>,
    pub sort_key: i64,
    pub session_index: i64,
    pub dancers: u32,
    pub unique_dancers: u32,
    pub new_students: u32,
    pub retained_students: u32,
    pub classes: u32,
    pub new_student_pct: Option<f64>,
    pub retention_pct: Option<f64>,
    pub enrollment_ratio: Option<f64>,
}

impl BucketMetrics {
    pub fn value(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Dancers => Some(self.dancers as f64),
            Metric::UniqueDancers => Some(self.unique_dancers as f64),
            Metric::NewStudents => Some(self.new_students as f64),
            Metric::NewStudentPct => self.new_student_pct,
            Metric::RetainedStudents => Some(self.retained_students as f64),
            Metric::RetentionPct => self.retention_pct,
            Metric::Classes => Some(self.classes as f64),
            Metric::EnrollmentRatio => self.enrollment_ratio,
        }
    }
}

/// Dashboard metric cards.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub total_dancers: u32,
    pub total_unique_dancers: u32,
    pub total_new_students: u32,
    pub total_retained_students: u32,
    pub classes: u32,
    /// Total dancers / total classes.
    pub enrollment_ratio: Option<f64>,
    /// Total dancers / total unique dancers.
    pub slots_attended: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MetricsTable {
    pub group_by: Option<String>,
    pub buckets: Vec<BucketMetrics>,
    /// Distinct class offerings across the whole filtered set.
    pub classes: u32,
}

pub fn ratio(numerator: f64, denominator: f64) -> Option<f64> {
    (denominator != 0.0).then(|| numerator / denominator)
}

fn percentage(numerator: u32, denominator: u32) -> Option<f64> {
    ratio(numerator as f64, denominator as f64).map(|r| r * 100.0)
}

#[derive(Default)]
struct BucketAcc {
    school_year_string: Option<String>,
    sort_key: i64,
    session_index: i64,
    rows: u32,
    dancers: BTreeSet<String>,
    sources: BTreeSet<String>,
}

/// Aggregate a filtered, projected frame against the acquisitions classified
/// over the full dataset.
///
/// A dancer counts as new in a bucket when the classifier produced an
/// acquisition for that dancer on that bucket label and the dancer is present
/// in the bucket after filtering, so new students never exceed unique dancers.
pub fn aggregate(
    filtered: &DataFrame,
    acquisitions: &[CohortRow],
    group_by: Option<&str>,
) -> Result<MetricsTable> {
    frame::require_columns(
        filtered,
        &[
            record::DANCER_ID,
            record::SOURCE,
            derived::X_AXIS_LABEL,
            derived::SCHOOL_YEAR_STRING,
            derived::SORT_KEY,
            derived::SESSION_INDEX,
        ],
    )?;

    let labels = frame::string_values(filtered, derived::X_AXIS_LABEL)?;
    let dancers = frame::string_values(filtered, record::DANCER_ID)?;
    let sources = frame::string_values(filtered, record::SOURCE)?;
    let year_strings = frame::string_values(filtered, derived::SCHOOL_YEAR_STRING)?;
    let keys = frame::int_values(filtered, derived::SORT_KEY)?;
    let indices = frame::int_values(filtered, derived::SESSION_INDEX)?;
    let groups = match group_by {
        Some(column) => frame::rendered_values(filtered, column)?,
        None => vec![None; filtered.height()],
    };

    let mut accs: BTreeMap<(String, Option<String>), BucketAcc> = BTreeMap::new();
    let mut all_sources: BTreeSet<&str> = BTreeSet::new();
    let mut unbucketed = 0usize;

    for i in 0..filtered.height() {
        if let Some(source) = sources[i].as_deref() {
            all_sources.insert(source);
        }
        let (Some(label), Some(key), Some(index)) = (&labels[i], keys[i], indices[i]) else {
            unbucketed += 1;
            continue;
        };
        let acc = accs
            .entry((label.clone(), groups[i].clone()))
            .or_insert_with(|| BucketAcc {
                sort_key: key,
                session_index: index,
                ..Default::default()
            });
        acc.sort_key = acc.sort_key.min(key);
        acc.session_index = acc.session_index.min(index);
        if acc.school_year_string.is_none() {
            acc.school_year_string = year_strings[i].clone();
        }
        if let Some(dancer) = &dancers[i] {
            acc.rows += 1;
            acc.dancers.insert(dancer.clone());
        }
        if let Some(source) = &sources[i] {
            acc.sources.insert(source.clone());
        }
    }

    if unbucketed > 0 {
        debug!("{unbucketed} filtered rows have no axis bucket and are left out of bucket metrics");
    }
    if accs.is_empty() {
        warn!("No enrollments to aggregate");
    }

    let new_by_label: HashSet<(&str, &str)> = acquisitions
        .iter()
        .map(|a| (a.dancer_id.as_str(), a.label.as_str()))
        .collect();

    let mut buckets: Vec<BucketMetrics> = accs
        .into_iter()
        .map(|((label, group), acc)| {
            let unique = acc.dancers.len() as u32;
            let new_students = acc
                .dancers
                .iter()
                .filter(|d| new_by_label.contains(&(d.as_str(), label.as_str())))
                .count() as u32;
            let retained = unique - new_students;
            let classes = acc.sources.len() as u32;
            BucketMetrics {
                school_year_string: acc.school_year_string,
                sort_key: acc.sort_key,
                session_index: acc.session_index,
                dancers: acc.rows,
                unique_dancers: unique,
                new_students,
                retained_students: retained,
                classes,
                new_student_pct: percentage(new_students, unique),
                retention_pct: percentage(retained, unique),
                enrollment_ratio: ratio(acc.rows as f64, classes as f64),
                label,
                group,
            }
        })
        .collect();
    buckets.sort_by(|a, b| {
        (a.sort_key, &a.group, &a.label).cmp(&(b.sort_key, &b.group, &b.label))
    });

    Ok(MetricsTable {
        group_by: group_by.map(str::to_string),
        buckets,
        classes: all_sources.len() as u32,
    })
}

impl MetricsTable {
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn summary(&self) -> Summary {
        let total_dancers: u32 = self.buckets.iter().map(|b| b.dancers).sum();
        let total_unique_dancers: u32 = self.buckets.iter().map(|b| b.unique_dancers).sum();
        Summary {
            total_dancers,
            total_unique_dancers,
            total_new_students: self.buckets.iter().map(|b| b.new_students).sum(),
            total_retained_students: self.buckets.iter().map(|b| b.retained_students).sum(),
            classes: self.classes,
            enrollment_ratio: ratio(total_dancers as f64, self.classes as f64),
            slots_attended: ratio(total_dancers as f64, total_unique_dancers as f64),
        }
    }

    /// Metric table as a frame, one row per bucket in axis order.
    pub fn to_frame(&self) -> Result<DataFrame> {
        let b = &self.buckets;
        let mut columns = vec![Column::new(
            derived::X_AXIS_LABEL.into(),
            b.iter().map(|m| m.label.as_str()).collect::<Vec<_>>(),
        )];
        if self.group_by.is_some() {
            columns.push(Column::new(
                metrics::GROUP.into(),
                b.iter().map(|m| m.group.as_deref()).collect::<Vec<_>>(),
            ));
        }
        columns.extend([
            Column::new(
                derived::SCHOOL_YEAR_STRING.into(),
                b.iter()
                    .map(|m| m.school_year_string.as_deref())
                    .collect::<Vec<_>>(),
            ),
            Column::new(
                derived::SORT_KEY.into(),
                b.iter().map(|m| m.sort_key).collect::<Vec<_>>(),
            ),
            Column::new(
                derived::SESSION_INDEX.into(),
                b.iter().map(|m| m.session_index).collect::<Vec<_>>(),
            ),
        ]);
        for metric in Metric::ALL {
            let values: Vec<Option<f64>> = b.iter().map(|m| m.value(metric)).collect();
            columns.push(Column::new(metric.column().into(), values));
        }
        Ok(DataFrame::new(columns)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn projected(rows: &[(&str, &str, &str, i64, i64)]) -> DataFrame {
        DataFrame::new(vec![
            Column::new(record::DANCER_ID.into(), rows.iter().map(|r| r.0).collect::<Vec<_>>()),
            Column::new(record::SOURCE.into(), rows.iter().map(|r| r.1).collect::<Vec<_>>()),
            Column::new(derived::X_AXIS_LABEL.into(), rows.iter().map(|r| r.2).collect::<Vec<_>>()),
            Column::new(
                derived::SCHOOL_YEAR_STRING.into(),
                rows.iter().map(|r| &r.2[..7]).collect::<Vec<_>>(),
            ),
            Column::new(derived::SORT_KEY.into(), rows.iter().map(|r| r.3).collect::<Vec<_>>()),
            Column::new(derived::SESSION_INDEX.into(), rows.iter().map(|r| r.4).collect::<Vec<_>>()),
        ])
        .unwrap()
    }

    fn event(dancer: &str, label: &str) -> CohortRow {
        CohortRow {
            dancer_id: dancer.to_string(),
            label: label.to_string(),
            school_year: 2021,
            school_year_string: None,
            session_index: 0,
            sort_key: 0,
            row_id: 0,
            group: None,
        }
    }

    #[test]
    fn head_count_versus_unique_dancers() {
        let df = projected(&[
            ("a", "ballet.xlsx", "2021-22 Fall 1", 202111, 0),
            ("a", "tap.xlsx", "2021-22 Fall 1", 202111, 0),
            ("b", "ballet.xlsx", "2021-22 Fall 1", 202111, 0),
            ("b", "tap.xlsx", "2021-22 Fall 1", 202111, 0),
        ]);
        let table = aggregate(&df, &[], None).unwrap();
        let bucket = &table.buckets[0];
        assert_eq!(bucket.dancers, 4);
        assert_eq!(bucket.unique_dancers, 2);
        assert_eq!(bucket.classes, 2);
        assert_eq!(bucket.enrollment_ratio, Some(2.0));
    }

    #[test]
    fn zero_new_students_means_full_retention() {
        let df = projected(&[("a", "s1", "2021-22", 2021, 0), ("b", "s1", "2021-22", 2021, 0)]);
        let table = aggregate(&df, &[], None).unwrap();
        let bucket = &table.buckets[0];
        assert_eq!(bucket.new_students, 0);
        assert_eq!(bucket.retained_students, 2);
        assert_eq!(bucket.retention_pct, Some(100.0));
        assert_eq!(bucket.new_student_pct, Some(0.0));
    }

    #[test]
    fn new_students_only_count_when_present_in_bucket() {
        let df = projected(&[
            ("a", "s1", "2020-21", 2020, 0),
            ("a", "s1", "2021-22", 2021, 1),
            ("b", "s1", "2021-22", 2021, 1),
        ]);
        // "c" was acquired in 2021-22 but is filtered out of it.
        let events = [event("a", "2020-21"), event("b", "2021-22"), event("c", "2021-22")];
        let table = aggregate(&df, &events, None).unwrap();
        let labels: Vec<(&str, u32, u32)> = table
            .buckets
            .iter()
            .map(|b| (b.label.as_str(), b.new_students, b.retained_students))
            .collect();
        assert_eq!(labels, vec![("2020-21", 1, 0), ("2021-22", 1, 1)]);
        assert_eq!(table.buckets[1].new_student_pct, Some(50.0));
    }

    #[test]
    fn empty_input_yields_empty_table() {
        let df = projected(&[]);
        let table = aggregate(&df, &[], None).unwrap();
        assert!(table.is_empty());
        let summary = table.summary();
        assert_eq!(summary.total_dancers, 0);
        assert_eq!(summary.enrollment_ratio, None);
        assert_eq!(summary.slots_attended, None);
    }

    #[test]
    fn ratios_guard_zero_denominators() {
        assert_eq!(ratio(3.0, 0.0), None);
        assert_eq!(percentage(0, 0), None);
        assert_eq!(ratio(3.0, 2.0), Some(1.5));
    }

    #[test]
    fn frame_has_metric_columns_in_axis_order() {
        let df = projected(&[
            ("a", "s1", "2021-22", 2021, 1),
            ("a", "s1", "2020-21", 2020, 0),
        ]);
        let out = aggregate(&df, &[], None).unwrap().to_frame().unwrap();
        assert_eq!(
            frame::string_values(&out, derived::X_AXIS_LABEL).unwrap(),
            vec![Some("2020-21".to_string()), Some("2021-22".to_string())]
        );
        assert_eq!(
            frame::float_values(&out, metrics::NUMBER_OF_DANCERS).unwrap(),
            vec![Some(1.0), Some(1.0)]
        );
        assert!(out.column(metrics::GROUP).is_err());
    }
}
