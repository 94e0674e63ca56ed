/// Dashboard configuration
///
/// Every field has a default, so an empty JSON object is a valid config.
/// `DashboardConfig::from_env` layers the sources:
///
/// 1. built-in defaults
/// 2. the JSON file named by `FLIGHTDASH_CONFIG`, if set
/// 3. `FLIGHTDASH_DATASET`, if set, replaces `dataset_path`

use crate::binning::{BinStrategy, LabeledIntervals, DEFAULT_BIN_WIDTH, MAX_FIXED_BINS};
use crate::error::LoadError;
use log::info;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_ENV: &str = "FLIGHTDASH_CONFIG";
pub const DATASET_ENV: &str = "FLIGHTDASH_DATASET";

pub const DEFAULT_DATASET_PATH: &str = "dataSet/cleaned_airlines_flights_data.csv";
pub const DEFAULT_HISTOGRAM_BINS: usize = 40;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub dataset_path: PathBuf,
    /// Width in days of the bins behind the price trend charts
    pub trend_bin_width: f64,
    /// Named `days_left` intervals behind the booking window charts
    pub booking_windows: LabeledIntervals,
    pub histogram_bins: usize,
    pub all_airlines_label: String,
    pub all_classes_label: String,
    pub all_stops_label: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        DashboardConfig {
            dataset_path: PathBuf::from(DEFAULT_DATASET_PATH),
            trend_bin_width: DEFAULT_BIN_WIDTH,
            booking_windows: LabeledIntervals::booking_windows(),
            histogram_bins: DEFAULT_HISTOGRAM_BINS,
            all_airlines_label: "All Airlines".to_string(),
            all_classes_label: "All Classes".to_string(),
            all_stops_label: "All Stops".to_string(),
        }
    }
}

impl DashboardConfig {
    pub fn from_json(json: &str) -> Result<Self, LoadError> {
        let config: DashboardConfig =
            serde_json::from_str(json).map_err(|e| LoadError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Read dashboard configuration from {}", path.display());
        Self::from_json(&json)
    }

    /// Defaults, then `FLIGHTDASH_CONFIG`, then `FLIGHTDASH_DATASET`
    pub fn from_env() -> Result<Self, LoadError> {
        Self::layered(
            std::env::var_os(CONFIG_ENV).map(PathBuf::from),
            std::env::var_os(DATASET_ENV).map(PathBuf::from),
        )
    }

    fn layered(config_file: Option<PathBuf>, dataset: Option<PathBuf>) -> Result<Self, LoadError> {
        let mut config = match config_file {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        if let Some(dataset) = dataset {
            config.dataset_path = dataset;
        }
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), LoadError> {
        self.trend_strategy()
            .validate()
            .and_then(|_| self.booking_windows.validate())
            .map_err(|e| LoadError::Config(e.to_string()))?;
        if self.histogram_bins == 0 || self.histogram_bins > MAX_FIXED_BINS {
            return Err(LoadError::Config(format!(
                "histogram_bins must be between 1 and {}",
                MAX_FIXED_BINS
            )));
        }
        Ok(())
    }

    pub fn trend_strategy(&self) -> BinStrategy {
        BinStrategy::fixed_width(self.trend_bin_width)
    }

    pub fn booking_strategy(&self) -> BinStrategy {
        BinStrategy::Labeled(self.booking_windows.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DashboardConfig::default();
        assert_eq!(config.dataset_path, PathBuf::from(DEFAULT_DATASET_PATH));
        assert_eq!(config.trend_strategy(), BinStrategy::fixed_width(5.0));
        assert_eq!(config.booking_windows.labels().len(), 8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json() {
        let config = DashboardConfig::from_json(r#"{"trend_bin_width": 10, "all_airlines_label": "Any"}"#).unwrap();
        assert_eq!(config.trend_bin_width, 10.0);
        assert_eq!(config.all_airlines_label, "Any");
        assert_eq!(config.histogram_bins, DEFAULT_HISTOGRAM_BINS);

        let config = DashboardConfig::from_json(
            r#"{"booking_windows": {"edges": [0, 7, 30], "labels": ["week", "month", "later"]}}"#,
        )
        .unwrap();
        assert_eq!(config.booking_windows.edges(), &[0.0, 7.0, 30.0]);
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(DashboardConfig::from_json("{"), Err(LoadError::Config(_))));
        assert!(matches!(
            DashboardConfig::from_json(r#"{"trend_bin_width": 0}"#),
            Err(LoadError::Config(_))
        ));
        assert!(matches!(
            DashboardConfig::from_json(r#"{"histogram_bins": 0}"#),
            Err(LoadError::Config(_))
        ));
        assert!(matches!(
            DashboardConfig::from_json(r#"{"booking_windows": {"edges": [0, 5], "labels": ["a"]}}"#),
            Err(LoadError::Config(_))
        ));
    }

    #[test]
    fn test_layered_sources() {
        let path = std::env::temp_dir().join(format!("flightdash-config-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"dataset_path": "from_file.csv", "histogram_bins": 20}"#).unwrap();

        let config = DashboardConfig::layered(Some(path.clone()), None).unwrap();
        assert_eq!(config.dataset_path, PathBuf::from("from_file.csv"));
        assert_eq!(config.histogram_bins, 20);

        let config = DashboardConfig::layered(Some(path.clone()), Some(PathBuf::from("override.csv"))).unwrap();
        assert_eq!(config.dataset_path, PathBuf::from("override.csv"));
        assert_eq!(config.histogram_bins, 20);

        std::fs::remove_file(&path).unwrap();

        assert!(matches!(
            DashboardConfig::layered(Some(path), None),
            Err(LoadError::Io { .. })
        ));
        assert_eq!(DashboardConfig::layered(None, None).unwrap(), DashboardConfig::default());
    }
}
