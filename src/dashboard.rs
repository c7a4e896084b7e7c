//! Dashboard session: owns one loaded dataset, the active display mode and a
//! memo cache of pipeline results.

use std::collections::BTreeMap;
use std::sync::Arc;

use log::{info, warn};
use polars::prelude::*;

use crate::age::{self, AgeCalculator};
use crate::axis::{self, DisplayMode};
use crate::cache::{self, CacheKey, MemoCache};
use crate::calendar::{self, CalendarMapper};
use crate::camps::{self, CampYearReport};
use crate::chart::{self, ChartSeries};
use crate::cohort::{self, CohortClassifier, CohortRow};
use crate::config::DashboardConfig;
use crate::error::{DashboardError, Result};
use crate::filter::{FilterContext, FilterField};
use crate::frame;
use crate::metrics::{self, Metric, MetricsTable, Summary};
use crate::schema::derived;
use crate::source::{self, DataSource};

/// Normalize a raw batch and add every mode-independent derived column:
/// school year, age, season order, canonical sort key and `row_id`.
pub fn prepare(raw: DataFrame, config: &DashboardConfig) -> Result<DataFrame> {
    let df = source::normalize_records(raw)?;
    let df = CalendarMapper::map_frame(df)?;
    let df = AgeCalculator::new(config.birth_date_formats.clone()).apply(df)?;
    let mut df = calendar::with_sort_keys(df)?;

    let row_ids: Vec<i64> = (0..df.height() as i64).collect();
    df.with_column(Column::new(derived::ROW_ID.into(), row_ids))?;
    Ok(df)
}

/// Everything one chart page needs for a (filter, mode, grouping) triple.
#[derive(Debug, Clone)]
pub struct DashboardReport {
    pub mode: DisplayMode,
    pub filtered_rows: usize,
    pub metrics: MetricsTable,
    pub summary: Summary,
    /// New-student events over the whole dataset, in scan order.
    pub acquisitions: Vec<CohortRow>,
}

impl DashboardReport {
    pub fn metrics_frame(&self) -> Result<DataFrame> {
        self.metrics.to_frame()
    }

    pub fn acquisitions_frame(&self) -> Result<DataFrame> {
        cohort::acquisitions_frame(&self.acquisitions)
    }

    pub fn series(&self, metric: Metric) -> Vec<ChartSeries> {
        chart::series(&self.metrics, metric)
    }
}

/// Project, classify, filter and aggregate a prepared frame.
///
/// Classification runs over every row so that a dancer's history outside the
/// current selection still decides whether they are new; the filter only
/// narrows the buckets being counted.
pub fn run_pipeline(
    prepared: &DataFrame,
    ctx: &FilterContext,
    mode: DisplayMode,
    group_by: Option<&str>,
) -> Result<DashboardReport> {
    if let Some(column) = group_by {
        frame::require_columns(prepared, &[column])?;
    }

    let projected = axis::project(prepared.clone(), mode)?;
    let acquisitions = CohortClassifier::new(mode).classify(&projected, group_by)?;
    let filtered = ctx.apply(&projected)?;
    let metrics = metrics::aggregate(&filtered, &acquisitions, group_by)?;

    if metrics.is_empty() {
        warn!("Empty cohort for '{mode}'; no metrics to report");
    }
    let summary = metrics.summary();

    Ok(DashboardReport {
        mode,
        filtered_rows: filtered.height(),
        metrics,
        summary,
        acquisitions,
    })
}

#[derive(Debug)]
struct LoadedDataset {
    frame: DataFrame,
    fingerprint: u64,
}

#[derive(Debug)]
pub struct Dashboard {
    config: DashboardConfig,
    dataset: Option<LoadedDataset>,
    mode: DisplayMode,
    cache: MemoCache<Arc<DashboardReport>>,
}

impl Dashboard {
    pub fn new(config: DashboardConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            mode: config.default_mode,
            cache: MemoCache::new(config.cache_capacity),
            dataset: None,
            config,
        })
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    /// Replace the dataset with a fresh batch from `source`. Returns the row
    /// count.
    pub fn load<S: DataSource + ?Sized>(&mut self, source: &S) -> Result<usize> {
        let raw = source.fetch_records()?;
        let frame = prepare(raw, &self.config)?;
        let fingerprint = cache::frame_fingerprint(&frame)?;
        let rows = frame.height();

        self.cache.invalidate_all();
        self.dataset = Some(LoadedDataset { frame, fingerprint });
        info!("Loaded {rows} enrollment rows (fingerprint {fingerprint:016x})");
        Ok(rows)
    }

    pub fn is_loaded(&self) -> bool {
        self.dataset.is_some()
    }

    /// The prepared dataset, before any mode projection or filtering.
    pub fn prepared(&self) -> Result<&DataFrame> {
        self.dataset
            .as_ref()
            .map(|d| &d.frame)
            .ok_or_else(not_loaded)
    }

    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: DisplayMode) {
        if mode != self.mode {
            self.cache.retain_mode(mode);
            self.mode = mode;
        }
    }

    pub fn filter_options(&self, ctx: &FilterContext) -> Result<BTreeMap<FilterField, Vec<String>>> {
        ctx.available_values(self.prepared()?)
    }

    pub fn filtered(&self, ctx: &FilterContext) -> Result<DataFrame> {
        ctx.apply(self.prepared()?)
    }

    /// Metrics for the active mode, memoized per (dataset, filter, mode,
    /// grouping).
    pub fn report(&mut self, ctx: &FilterContext, group_by: Option<&str>) -> Result<Arc<DashboardReport>> {
        let dataset = self.dataset.as_ref().ok_or_else(not_loaded)?;
        let mode = self.mode;
        let key = CacheKey::new(dataset.fingerprint, ctx, mode, group_by);
        self.cache.get_or_try_insert_with(key, || {
            run_pipeline(&dataset.frame, ctx, mode, group_by).map(Arc::new)
        })
    }

    pub fn camp_report(&self) -> Result<Vec<CampYearReport>> {
        camps::camp_carryover(self.prepared()?)
    }

    pub fn age_outliers(&self) -> Result<DataFrame> {
        age::age_outliers(
            self.prepared()?,
            self.config.age_outlier_min,
            self.config.age_outlier_max,
        )
    }

    pub fn cache(&self) -> &MemoCache<Arc<DashboardReport>> {
        &self.cache
    }
}

fn not_loaded() -> DashboardError {
    DashboardError::NotLoaded("no enrollment dataset has been loaded".to_string())
}
