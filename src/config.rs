use std::fs;
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::age::DEFAULT_BIRTH_DATE_FORMATS;
use crate::axis::DisplayMode;
use crate::error::{DashboardError, Result};

/// Dashboard settings, loadable from TOML. Every field is optional in the
/// file and falls back to its default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default)]
    pub default_mode: DisplayMode,

    /// Maximum number of memoized pipeline results per session.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    /// chrono formats tried in order when parsing `BirthDate`.
    #[serde(default = "default_birth_date_formats")]
    pub birth_date_formats: Vec<String>,

    #[serde(default = "default_age_outlier_min")]
    pub age_outlier_min: f64,

    #[serde(default = "default_age_outlier_max")]
    pub age_outlier_max: f64,
}

fn default_cache_capacity() -> usize {
    32
}

fn default_birth_date_formats() -> Vec<String> {
    DEFAULT_BIRTH_DATE_FORMATS
        .iter()
        .map(|f| f.to_string())
        .collect()
}

fn default_age_outlier_min() -> f64 {
    1.0
}

fn default_age_outlier_max() -> f64 {
    16.0
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            default_mode: DisplayMode::default(),
            cache_capacity: default_cache_capacity(),
            birth_date_formats: default_birth_date_formats(),
            age_outlier_min: default_age_outlier_min(),
            age_outlier_max: default_age_outlier_max(),
        }
    }
}

impl DashboardConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: DashboardConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&contents)?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.cache_capacity == 0 {
            return Err(DashboardError::Config(
                "cache_capacity must be at least 1".to_string(),
            ));
        }
        if self.birth_date_formats.is_empty() {
            return Err(DashboardError::Config(
                "birth_date_formats must list at least one format".to_string(),
            ));
        }
        let (min, max) = (self.age_outlier_min, self.age_outlier_max);
        if min.is_nan() || max.is_nan() || min > max {
            return Err(DashboardError::Config(format!(
                "age_outlier_min ({min}) exceeds age_outlier_max ({max})"
            )));
        }
        Ok(())
    }
}
