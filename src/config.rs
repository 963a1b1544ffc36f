// Where the CLI finds its tables.

use std::env;
use std::path::{Path, PathBuf};

use crate::analytics::{AnalyticsOptions, FeatureDetection};
use crate::error::{LoadError, Result};

/// Explicit data directory; overrides the candidate search.
pub const DATA_DIR_ENV: &str = "PORTFOLIO_DATA_DIR";
/// Default log filter when `RUST_LOG` is unset.
pub const LOG_ENV: &str = "PORTFOLIO_LOG";
/// `dataset` (default) or `per-resource`.
pub const DETECTION_ENV: &str = "PORTFOLIO_FEATURE_DETECTION";

/// Searched in order when no directory is configured.
pub const CANDIDATE_DIRS: [&str; 2] = ["app/data", "data"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataConfig {
    pub data_dir: Option<PathBuf>,
    pub trials_file: String,
    pub resources_file: String,
    pub allocations_file: String,
    pub log_level: String,
    pub detection: FeatureDetection,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            trials_file: "Trial.csv".to_string(),
            resources_file: "Resource.csv".to_string(),
            allocations_file: "Allocation.csv".to_string(),
            log_level: "info".to_string(),
            detection: FeatureDetection::Dataset,
        }
    }
}

impl DataConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(dir) = lookup(DATA_DIR_ENV).filter(|d| !d.trim().is_empty()) {
            config.data_dir = Some(PathBuf::from(dir.trim()));
        }
        if let Some(level) = lookup(LOG_ENV).filter(|l| !l.trim().is_empty()) {
            config.log_level = level.trim().to_string();
        }
        if let Some(mode) = lookup(DETECTION_ENV) {
            config.detection = match mode.trim().to_lowercase().as_str() {
                "per-resource" | "per_resource" | "resource" => FeatureDetection::PerResource,
                _ => FeatureDetection::Dataset,
            };
        }
        config
    }

    pub fn analytics_options(&self) -> AnalyticsOptions {
        AnalyticsOptions {
            detection: self.detection,
        }
    }

    /// The configured directory if it exists, else the first existing
    /// candidate relative to `base`.
    pub fn resolve_data_dir(&self, base: &Path) -> Result<PathBuf> {
        let candidates: Vec<PathBuf> = match &self.data_dir {
            Some(dir) => vec![base.join(dir)],
            None => CANDIDATE_DIRS.iter().map(|c| base.join(c)).collect(),
        };
        candidates
            .iter()
            .find(|p| p.is_dir())
            .cloned()
            .ok_or_else(|| LoadError::NoDataDirectory {
                searched: candidates
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }
}
