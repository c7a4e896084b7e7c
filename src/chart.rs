//! Plot-ready series cut from a metrics table.

use std::collections::BTreeMap;

use crate::metrics::{Metric, MetricsTable};

/// One line or bar trace. `name` is the group value when the table is grouped.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSeries {
    pub title: &'static str,
    pub name: Option<String>,
    pub labels: Vec<String>,
    pub values: Vec<Option<f64>>,
    pub is_percentage: bool,
}

impl ChartSeries {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Series for `metric`, one per group (a single unnamed series when the
/// table is not grouped). Points keep the axis order of the table.
pub fn series(table: &MetricsTable, metric: Metric) -> Vec<ChartSeries> {
    let mut by_group: BTreeMap<Option<&str>, ChartSeries> = BTreeMap::new();
    for bucket in &table.buckets {
        let trace = by_group
            .entry(bucket.group.as_deref())
            .or_insert_with(|| ChartSeries {
                title: metric.title(),
                name: bucket.group.clone(),
                labels: Vec::new(),
                values: Vec::new(),
                is_percentage: metric.is_percentage(),
            });
        trace.labels.push(bucket.label.clone());
        trace.values.push(bucket.value(metric));
    }
    by_group.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::BucketMetrics;
    use pretty_assertions::assert_eq;

    fn bucket(label: &str, group: Option<&str>, sort_key: i64, unique: u32, new: u32) -> BucketMetrics {
        BucketMetrics {
            label: label.to_string(),
            group: group.map(str::to_string),
            school_year_string: None,
            sort_key,
            session_index: 0,
            dancers: unique,
            unique_dancers: unique,
            new_students: new,
            retained_students: unique - new,
            classes: 1,
            new_student_pct: Some(new as f64 / unique as f64 * 100.0),
            retention_pct: Some((unique - new) as f64 / unique as f64 * 100.0),
            enrollment_ratio: Some(unique as f64),
        }
    }

    #[test]
    fn ungrouped_table_gives_one_series() {
        let table = MetricsTable {
            group_by: None,
            buckets: vec![bucket("2020-21", None, 2020, 4, 4), bucket("2021-22", None, 2021, 4, 1)],
            classes: 1,
        };
        let out = series(&table, Metric::RetentionPct);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].title, "Retention");
        assert!(out[0].is_percentage);
        assert_eq!(out[0].name, None);
        assert_eq!(out[0].labels, vec!["2020-21", "2021-22"]);
        assert_eq!(out[0].values, vec![Some(0.0), Some(75.0)]);
    }

    #[test]
    fn grouped_table_splits_by_group() {
        let table = MetricsTable {
            group_by: Some("Location".to_string()),
            buckets: vec![
                bucket("2020-21", Some("North"), 2020, 2, 2),
                bucket("2020-21", Some("South"), 2020, 3, 3),
                bucket("2021-22", Some("North"), 2021, 5, 1),
            ],
            classes: 2,
        };
        let out = series(&table, Metric::UniqueDancers);
        let names: Vec<Option<&str>> = out.iter().map(|s| s.name.as_deref()).collect();
        assert_eq!(names, vec![Some("North"), Some("South")]);
        assert_eq!(out[0].values, vec![Some(2.0), Some(5.0)]);
        assert_eq!(out[1].len(), 1);
        assert!(!out[0].is_percentage);
    }
}
