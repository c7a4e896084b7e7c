pub mod age;
pub mod axis;
pub mod cache;
pub mod calendar;
pub mod camps;
pub mod chart;
pub mod cohort;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod filter;
pub mod frame;
pub mod metrics;
pub mod schema;
pub mod source;

#[cfg(feature = "python")]
mod python;

pub use age::AgeCalculator;
pub use axis::DisplayMode;
pub use calendar::{CalendarMapper, Season};
pub use camps::CampYearReport;
pub use chart::ChartSeries;
pub use cohort::{CohortClassifier, CohortRow};
pub use config::DashboardConfig;
pub use dashboard::{Dashboard, DashboardReport};
pub use error::{DashboardError, Result};
pub use filter::{FilterContext, FilterField};
pub use metrics::{BucketMetrics, Metric, MetricsTable, Summary};
pub use source::{CsvDataSource, DataSource};

#[cfg(feature = "python")]
mod bindings {
    use pyo3::prelude::*;
    use pyo3::types::PyModule;

    use crate::python::PyDashboard;
    use crate::schema;

    /// Export schema constants as Python submodules
    fn add_schema_exports(m: &Bound<'_, PyModule>) -> PyResult<()> {
        // Record
        let record = PyModule::new(m.py(), "record")?;
        record.add("DANCER_ID", schema::record::DANCER_ID)?;
        record.add("BIRTH_DATE", schema::record::BIRTH_DATE)?;
        record.add("YEAR", schema::record::YEAR)?;
        record.add("SEASON", schema::record::SEASON)?;
        record.add("SESSION", schema::record::SESSION)?;
        record.add("CLASS", schema::record::CLASS)?;
        record.add("LOCATION", schema::record::LOCATION)?;
        record.add("TEACHER", schema::record::TEACHER)?;
        record.add("CITY", schema::record::CITY)?;
        record.add("SOURCE", schema::record::SOURCE)?;
        m.add_submodule(&record)?;

        // Derived
        let derived = PyModule::new(m.py(), "derived")?;
        derived.add("SCHOOL_YEAR", schema::derived::SCHOOL_YEAR)?;
        derived.add("SCHOOL_YEAR_STRING", schema::derived::SCHOOL_YEAR_STRING)?;
        derived.add("AGE", schema::derived::AGE)?;
        derived.add("X_AXIS_LABEL", schema::derived::X_AXIS_LABEL)?;
        derived.add("SORT_KEY", schema::derived::SORT_KEY)?;
        derived.add("SESSION_INDEX", schema::derived::SESSION_INDEX)?;
        m.add_submodule(&derived)?;

        // Metrics
        let metrics = PyModule::new(m.py(), "metrics")?;
        metrics.add("GROUP", schema::metrics::GROUP)?;
        metrics.add("NUMBER_OF_DANCERS", schema::metrics::NUMBER_OF_DANCERS)?;
        metrics.add(
            "NUMBER_OF_UNIQUE_DANCERS",
            schema::metrics::NUMBER_OF_UNIQUE_DANCERS,
        )?;
        metrics.add(
            "NUMBER_OF_NEW_STUDENTS",
            schema::metrics::NUMBER_OF_NEW_STUDENTS,
        )?;
        metrics.add("NEW_STUDENT_PCT", schema::metrics::NEW_STUDENT_PCT)?;
        metrics.add("RETAINED_STUDENTS", schema::metrics::RETAINED_STUDENTS)?;
        metrics.add("RETENTION_PCT", schema::metrics::RETENTION_PCT)?;
        metrics.add("NUMBER_OF_CLASSES", schema::metrics::NUMBER_OF_CLASSES)?;
        metrics.add("ENROLLMENT_PCT", schema::metrics::ENROLLMENT_PCT)?;
        m.add_submodule(&metrics)?;

        // Camps
        let camps = PyModule::new(m.py(), "camps")?;
        camps.add("APPEARING_EARLIER", schema::camps::APPEARING_EARLIER)?;
        camps.add("FROM_PREVIOUS_CAMP", schema::camps::FROM_PREVIOUS_CAMP)?;
        m.add_submodule(&camps)?;

        // Mode
        let mode = PyModule::new(m.py(), "mode")?;
        mode.add("ALL_TIME", schema::mode::ALL_TIME)?;
        mode.add("INTRA_YEAR", schema::mode::INTRA_YEAR)?;
        mode.add("SESSION_CONSECUTIVE", schema::mode::SESSION_CONSECUTIVE)?;
        m.add_submodule(&mode)?;

        Ok(())
    }

    #[pymodule]
    fn _core(m: &Bound<'_, PyModule>) -> PyResult<()> {
        m.add_class::<PyDashboard>()?;
        add_schema_exports(m)?;
        Ok(())
    }
}
