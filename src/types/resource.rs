//! Defines the dataset (wind or solar) and resource kind (weather, actual
//! power, forecast power) tags that select which repository files a request
//! maps to, together with their wire schemas and native resolutions.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The renewable dataset a request targets.
///
/// The external repository keeps wind and solar data in separate trees with
/// separate site metadata, so every request carries one of these tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dataset {
    /// Wind plant / meteorological tower data.
    Wind,
    /// Solar PV plant / irradiance data.
    Solar,
}

impl Dataset {
    pub(crate) fn path_segment(&self) -> &'static str {
        match self {
            Dataset::Wind => "wind",
            Dataset::Solar => "solar",
        }
    }

    pub(crate) fn site_meta_file(&self) -> String {
        format!("{}_site_meta.json", self.path_segment())
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path_segment())
    }
}

/// The kind of timeseries a request asks for.
///
/// Determines the repository path, the wire schema of the downloaded file
/// and the native temporal resolution of the raw data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    /// Meteorological source data (wind speeds, irradiance, ...).
    Weather,
    /// Power actually produced by the site.
    ActualPower,
    /// Power forecast at discrete leadtimes ahead of each timestamp.
    ForecastPower,
}

impl ResourceKind {
    pub(crate) fn path_segment(&self) -> &'static str {
        match self {
            ResourceKind::Weather => "met",
            ResourceKind::ActualPower => "power",
            ResourceKind::ForecastPower => "fcst",
        }
    }

    /// Column names of the raw repository file, excluding the leading
    /// `timestamp` column (epoch seconds).
    pub(crate) fn schema_column_names(&self, dataset: Dataset) -> Vec<&'static str> {
        match (self, dataset) {
            (ResourceKind::Weather, Dataset::Wind) => vec![
                "wind_speed",
                "wind_direction",
                "temperature",
                "pressure",
                "density",
            ],
            (ResourceKind::Weather, Dataset::Solar) => {
                vec!["ghi", "dni", "dhi", "temperature", "wind_speed"]
            }
            (ResourceKind::ActualPower, _) => vec!["power"],
            (ResourceKind::ForecastPower, _) => {
                vec!["fcst_1h", "fcst_4h", "fcst_6h", "fcst_24h"]
            }
        }
    }

    /// Spacing between consecutive points of the raw repository data.
    pub fn native_resolution(&self, dataset: Dataset) -> Duration {
        match (self, dataset) {
            (ResourceKind::Weather, Dataset::Wind) => Duration::minutes(5),
            (ResourceKind::Weather, Dataset::Solar) => Duration::minutes(30),
            (ResourceKind::ActualPower, _) => Duration::minutes(5),
            (ResourceKind::ForecastPower, _) => Duration::hours(1),
        }
    }

    /// Leadtimes of the raw forecast columns, matching `schema_column_names`.
    pub(crate) fn native_leadtimes(&self) -> Vec<Duration> {
        match self {
            ResourceKind::ForecastPower => vec![
                Duration::hours(1),
                Duration::hours(4),
                Duration::hours(6),
                Duration::hours(24),
            ],
            _ => vec![],
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path_segment())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_segments_are_stable() {
        assert_eq!(Dataset::Wind.to_string(), "wind");
        assert_eq!(Dataset::Solar.to_string(), "solar");
        assert_eq!(ResourceKind::Weather.to_string(), "met");
        assert_eq!(ResourceKind::ActualPower.to_string(), "power");
        assert_eq!(ResourceKind::ForecastPower.to_string(), "fcst");
    }

    #[test]
    fn forecast_schema_matches_leadtimes() {
        let cols = ResourceKind::ForecastPower.schema_column_names(Dataset::Wind);
        let leads = ResourceKind::ForecastPower.native_leadtimes();
        assert_eq!(cols.len(), leads.len());
        assert_eq!(leads[0], Duration::hours(1));
        assert_eq!(leads[3], Duration::hours(24));
    }

    #[test]
    fn native_resolution_is_coarser_for_forecasts() {
        let power = ResourceKind::ActualPower.native_resolution(Dataset::Wind);
        let fcst = ResourceKind::ForecastPower.native_resolution(Dataset::Wind);
        assert!(fcst > power);
    }
}
