use std::collections::HashMap;
use std::path::PathBuf;

use pyo3::prelude::*;
use pyo3_polars::PyDataFrame;

use crate::axis::DisplayMode;
use crate::camps;
use crate::config::DashboardConfig;
use crate::dashboard::Dashboard;
use crate::filter::FilterContext;
use crate::metrics::Metric;
use crate::source::CsvDataSource;

type Selections = Option<HashMap<String, Vec<String>>>;

fn context(filters: Selections) -> PyResult<FilterContext> {
    Ok(FilterContext::from_keyed(filters.unwrap_or_default())?)
}

#[pyclass(name = "Dashboard")]
pub struct PyDashboard {
    base_path: PathBuf,
    inner: Dashboard,
}

#[pymethods]
impl PyDashboard {
    #[new]
    #[pyo3(signature = (base_path=".", config_file=None))]
    fn new(base_path: &str, config_file: Option<&str>) -> PyResult<Self> {
        let base_path = PathBuf::from(base_path);
        let config = match config_file {
            Some(name) => DashboardConfig::load(base_path.join(name))?,
            None => DashboardConfig::default(),
        };
        Ok(Self {
            base_path,
            inner: Dashboard::new(config)?,
        })
    }

    // ── Data loading ────────────────────────────────────────────────────────

    /// Load a consolidated roster CSV. All columns are read as strings and
    /// normalized; optional `rename` maps source headers to roster names.
    /// Returns the number of enrollment rows.
    #[pyo3(signature = (filename, rename=None))]
    fn load_csv(&mut self, filename: &str, rename: Option<HashMap<String, String>>) -> PyResult<usize> {
        let mut source = CsvDataSource::new(self.base_path.join(filename));
        if let Some(map) = rename {
            source = source.with_rename(map);
        }
        Ok(self.inner.load(&source)?)
    }

    /// Load rows already held in a Polars frame.
    fn load_frame(&mut self, df: PyDataFrame) -> PyResult<usize> {
        Ok(self.inner.load(&df.0)?)
    }

    // ── Mode and filters ────────────────────────────────────────────────────

    #[getter]
    fn mode(&self) -> String {
        self.inner.mode().to_string()
    }

    #[setter]
    fn set_mode(&mut self, mode: &str) -> PyResult<()> {
        let mode: DisplayMode = mode.parse()?;
        self.inner.set_mode(mode);
        Ok(())
    }

    #[staticmethod]
    fn modes() -> Vec<&'static str> {
        DisplayMode::ALL.iter().map(|m| m.as_str()).collect()
    }

    /// Values each filter field can currently offer, keyed by field name.
    #[pyo3(signature = (filters=None))]
    fn filter_options(&self, filters: Selections) -> PyResult<HashMap<String, Vec<String>>> {
        let options = self.inner.filter_options(&context(filters)?)?;
        Ok(options
            .into_iter()
            .map(|(field, values)| (field.key().to_string(), values))
            .collect())
    }

    #[pyo3(signature = (filters=None))]
    fn filtered(&self, filters: Selections) -> PyResult<PyDataFrame> {
        Ok(PyDataFrame(self.inner.filtered(&context(filters)?)?))
    }

    // ── Metrics ─────────────────────────────────────────────────────────────

    /// Per-bucket metric table for the active mode.
    #[pyo3(signature = (filters=None, group_by=None))]
    fn metrics(&mut self, filters: Selections, group_by: Option<&str>) -> PyResult<PyDataFrame> {
        let report = self.inner.report(&context(filters)?, group_by)?;
        Ok(PyDataFrame(report.metrics_frame()?))
    }

    /// New-student events for the active mode.
    #[pyo3(signature = (filters=None, group_by=None))]
    fn acquisitions(&mut self, filters: Selections, group_by: Option<&str>) -> PyResult<PyDataFrame> {
        let report = self.inner.report(&context(filters)?, group_by)?;
        Ok(PyDataFrame(report.acquisitions_frame()?))
    }

    /// Metric cards: totals and the two overall ratios.
    #[pyo3(signature = (filters=None))]
    fn summary(&mut self, filters: Selections) -> PyResult<HashMap<&'static str, Option<f64>>> {
        let report = self.inner.report(&context(filters)?, None)?;
        let s = &report.summary;
        Ok(HashMap::from([
            ("total_dancers", Some(s.total_dancers as f64)),
            ("total_unique_dancers", Some(s.total_unique_dancers as f64)),
            ("total_new_students", Some(s.total_new_students as f64)),
            ("total_retained_students", Some(s.total_retained_students as f64)),
            ("classes", Some(s.classes as f64)),
            ("enrollment_ratio", s.enrollment_ratio),
            ("slots_attended", s.slots_attended),
        ]))
    }

    /// Chart traces for one metric column, as
    /// `(title, name, labels, values, is_percentage)` tuples.
    #[pyo3(signature = (metric, filters=None, group_by=None))]
    #[allow(clippy::type_complexity)]
    fn series(
        &mut self,
        metric: &str,
        filters: Selections,
        group_by: Option<&str>,
    ) -> PyResult<Vec<(&'static str, Option<String>, Vec<String>, Vec<Option<f64>>, bool)>> {
        let metric: Metric = metric.parse()?;
        let report = self.inner.report(&context(filters)?, group_by)?;
        Ok(report
            .series(metric)
            .into_iter()
            .map(|s| (s.title, s.name, s.labels, s.values, s.is_percentage))
            .collect())
    }

    // ── Reports ─────────────────────────────────────────────────────────────

    fn camp_report(&self) -> PyResult<PyDataFrame> {
        let report = self.inner.camp_report()?;
        Ok(PyDataFrame(camps::camp_report_frame(&report)?))
    }

    fn age_outliers(&self) -> PyResult<PyDataFrame> {
        Ok(PyDataFrame(self.inner.age_outliers()?))
    }

    // ── Properties ──────────────────────────────────────────────────────────

    #[getter]
    fn prepared_df(&self) -> Option<PyDataFrame> {
        self.inner.prepared().ok().cloned().map(PyDataFrame)
    }
}
