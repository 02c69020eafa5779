//! The main entry point for fetching and reshaping resource data.
//!
//! [`R2pd`] wires the site locators, the local cache and a repository
//! implementation together. Requests start from one client accessor per
//! request kind: [`R2pd::weather`], [`R2pd::actual_power`] and
//! [`R2pd::forecast_power`].
//!
//! # Examples
//!
//! ```no_run
//! use r2pd::{Dataset, Node, R2pd, Settings, TemporalShape};
//! use chrono::{TimeZone, Utc};
//!
//! # async fn run() -> Result<(), r2pd::R2pdError> {
//! let client = R2pd::connect(Settings::default()).await?;
//! let nodes = [Node { id: 1, latitude: 40.0, longitude: -105.0 }];
//! let shape = TemporalShape::new(
//!     Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(),
//!     Utc.with_ymd_and_hms(2020, 1, 2, 0, 0, 0).unwrap(),
//! );
//!
//! let results = client
//!     .weather()
//!     .nodes(&nodes)
//!     .dataset(Dataset::Wind)
//!     .shape(shape)
//!     .call()
//!     .await?;
//! assert_eq!(results[0].node_id, 1);
//! # Ok(())
//! # }
//! ```

use crate::cache::fingerprint::Fingerprint;
use crate::cache::store::CacheStore;
use crate::clients::{ActualPowerClient, ForecastPowerClient, WeatherClient};
use crate::error::R2pdError;
use crate::repository::{DrPower, ResourceRepository};
use crate::settings::Settings;
use crate::shaper::forecast::{reshape_forecast, ForecastShape, ShapedForecast};
use crate::shaper::series::reshape;
use crate::shaper::TemporalShape;
use crate::sites::locate::SiteLocator;
use crate::types::node::{GeneratorNode, Node};
use crate::types::resource::{Dataset, ResourceKind};
use crate::types::timeseries::{ForecastSeries, TimePoint, Timeseries};
use bon::bon;
use chrono::DateTime;
use futures_util::future::try_join_all;
use polars::prelude::*;
use std::sync::Arc;
use tracing::debug;

/// Shaped output for one requested node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSeries {
    pub node_id: i64,
    pub series: Vec<Timeseries>,
}

/// Shaped forecast output for one requested node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeForecast {
    pub node_id: i64,
    pub forecast: ShapedForecast,
}

pub struct R2pd {
    repository: Arc<dyn ResourceRepository>,
    store: CacheStore,
    wind_sites: SiteLocator,
    solar_sites: SiteLocator,
}

#[bon]
impl R2pd {
    /// Connects to the hosted repository configured in `settings` and opens
    /// the local cache, fetching site metadata for both datasets if it is
    /// not already cached.
    pub async fn connect(settings: Settings) -> Result<Self, R2pdError> {
        let repository: Arc<dyn ResourceRepository> = Arc::new(DrPower::new(&settings.repository)?);
        Self::with_repository(settings, repository).await
    }

    /// Like [`R2pd::connect`], but against a caller-supplied repository,
    /// e.g. a [`crate::repository::LocalDir`] tree.
    pub async fn with_repository(
        settings: Settings,
        repository: Arc<dyn ResourceRepository>,
    ) -> Result<Self, R2pdError> {
        let cache_root = settings.cache_root()?;
        let store = CacheStore::open(&cache_root, settings.max_cache_bytes()).await?;
        let wind_sites = SiteLocator::new(Dataset::Wind, &cache_root, repository.as_ref()).await?;
        let solar_sites =
            SiteLocator::new(Dataset::Solar, &cache_root, repository.as_ref()).await?;
        Ok(Self {
            repository,
            store,
            wind_sites,
            solar_sites,
        })
    }

    fn locator(&self, dataset: Dataset) -> &SiteLocator {
        match dataset {
            Dataset::Wind => &self.wind_sites,
            Dataset::Solar => &self.solar_sites,
        }
    }

    /// Total size of the local cache in bytes.
    pub async fn cache_size_bytes(&self) -> u64 {
        self.store.size_bytes().await
    }

    /// The configured cache budget in bytes, if any.
    pub fn cache_budget_bytes(&self) -> Option<u64> {
        self.store.budget_bytes()
    }

    /// Fetches weather data for each node from its nearest site and
    /// reshapes every met column to the requested shape.
    #[builder]
    pub(crate) async fn weather_data(
        &self,
        dataset: Dataset,
        nodes: &[Node],
        shape: TemporalShape,
    ) -> Result<Vec<NodeSeries>, R2pdError> {
        let locator = self.locator(dataset);
        try_join_all(nodes.iter().map(|node| async move {
            let (site, distance_km) = locator
                .nearest_site(node.latitude, node.longitude)
                .ok_or(R2pdError::NoSiteForNode {
                    dataset,
                    node_id: node.id,
                    latitude: node.latitude,
                    longitude: node.longitude,
                })?;
            debug!(
                "node {} served by {dataset} site {} ({distance_km:.1} km away)",
                node.id, site.id
            );
            let fingerprint = Fingerprint::for_site(
                dataset,
                ResourceKind::Weather,
                &site,
                shape.start,
                shape.end,
            );
            let raw = self.site_series(&fingerprint).await?;
            let series = raw
                .iter()
                .map(|ts| reshape(ts, &shape))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(NodeSeries {
                node_id: node.id,
                series,
            })
        }))
        .await
    }

    /// Fetches actual power for each generator node, aggregated over its
    /// allocated sites and scaled to the requested capacity.
    #[builder]
    pub(crate) async fn actual_power_data(
        &self,
        dataset: Dataset,
        nodes: &[GeneratorNode],
        shape: TemporalShape,
    ) -> Result<Vec<NodeSeries>, R2pdError> {
        let allocations = self.locator(dataset).allocate(nodes)?;
        try_join_all(allocations.iter().map(|allocation| async move {
            let mut combined: Option<Timeseries> = None;
            for share in &allocation.shares {
                let fingerprint = Fingerprint::for_site(
                    dataset,
                    ResourceKind::ActualPower,
                    &share.site,
                    shape.start,
                    shape.end,
                );
                let mut raw = self.site_series(&fingerprint).await?;
                let scaled = raw.remove(0).scaled(share.fraction);
                combined = Some(match combined {
                    Some(total) => total.checked_add(&scaled)?,
                    None => scaled,
                });
            }
            let total = combined.ok_or(R2pdError::NoSiteForNode {
                dataset,
                node_id: allocation.node_id,
                latitude: f64::NAN,
                longitude: f64::NAN,
            })?;
            Ok(NodeSeries {
                node_id: allocation.node_id,
                series: vec![reshape(&total, &shape)?],
            })
        }))
        .await
    }

    /// Fetches forecast power for each generator node, aggregated over its
    /// allocated sites and reshaped to the requested forecast shape.
    #[builder]
    pub(crate) async fn forecast_power_data(
        &self,
        dataset: Dataset,
        nodes: &[GeneratorNode],
        shape: TemporalShape,
        forecast: ForecastShape,
    ) -> Result<Vec<NodeForecast>, R2pdError> {
        let allocations = self.locator(dataset).allocate(nodes)?;
        let forecast = &forecast;
        try_join_all(allocations.iter().map(|allocation| async move {
            let mut combined: Option<ForecastSeries> = None;
            for share in &allocation.shares {
                let fingerprint = Fingerprint::for_site(
                    dataset,
                    ResourceKind::ForecastPower,
                    &share.site,
                    shape.start,
                    shape.end,
                );
                let scaled = self
                    .site_forecast(&fingerprint)
                    .await?
                    .scaled(share.fraction);
                combined = Some(match combined {
                    Some(total) => total.checked_add(&scaled)?,
                    None => scaled,
                });
            }
            let total = combined.ok_or(R2pdError::NoSiteForNode {
                dataset,
                node_id: allocation.node_id,
                latitude: f64::NAN,
                longitude: f64::NAN,
            })?;
            Ok(NodeForecast {
                node_id: allocation.node_id,
                forecast: reshape_forecast(&total, &shape, forecast)?,
            })
        }))
        .await
    }

    /// Resolves a fingerprint through the cache and extracts every value
    /// column as a timeseries.
    async fn site_series(&self, fingerprint: &Fingerprint) -> Result<Vec<Timeseries>, R2pdError> {
        let frame = self.load_frame(fingerprint).await?;
        let columns = fingerprint
            .kind
            .schema_column_names(fingerprint.dataset);
        frame_to_series(&frame, fingerprint.site_id, &columns)
    }

    /// Resolves a forecast fingerprint and assembles the native leadtime
    /// columns into a forecast series.
    async fn site_forecast(&self, fingerprint: &Fingerprint) -> Result<ForecastSeries, R2pdError> {
        let columns = self.site_series(fingerprint).await?;
        let leadtimes = fingerprint.kind.native_leadtimes();
        Ok(ForecastSeries::from_columns(leadtimes, &columns)?)
    }

    async fn load_frame(&self, fingerprint: &Fingerprint) -> Result<DataFrame, R2pdError> {
        let path = self
            .store
            .resolve(fingerprint, self.repository.as_ref())
            .await?;
        LazyFrame::scan_parquet(&path, Default::default())
            .map_err(|e| R2pdError::ParquetScan(path.clone(), e))?
            .collect()
            .map_err(|e| R2pdError::ParquetScan(path, e))
    }
}

impl R2pd {
    /// Starts a weather data request. See [`WeatherClient`].
    pub fn weather(&self) -> WeatherClient<'_> {
        WeatherClient::new(self)
    }

    /// Starts an actual-power request. See [`ActualPowerClient`].
    pub fn actual_power(&self) -> ActualPowerClient<'_> {
        ActualPowerClient::new(self)
    }

    /// Starts a forecast-power request. See [`ForecastPowerClient`].
    pub fn forecast_power(&self) -> ForecastPowerClient<'_> {
        ForecastPowerClient::new(self)
    }
}

/// Pulls named float columns out of a cached frame as timeseries sharing
/// the frame's `datetime` axis.
fn frame_to_series(
    frame: &DataFrame,
    site_id: i64,
    columns: &[&str],
) -> Result<Vec<Timeseries>, R2pdError> {
    let datetimes = frame
        .column("datetime")
        .map_err(|_| R2pdError::MissingColumn {
            site_id,
            column: "datetime".to_string(),
        })?
        .datetime()?;

    let mut timestamps = Vec::with_capacity(frame.height());
    for row in 0..frame.height() {
        let millis = datetimes
            .get(row)
            .ok_or(R2pdError::InvalidTimestamp { site_id, row })?;
        let timestamp = DateTime::from_timestamp_millis(millis)
            .ok_or(R2pdError::InvalidTimestamp { site_id, row })?;
        timestamps.push(timestamp);
    }

    columns
        .iter()
        .map(|name| {
            let values = frame
                .column(name)
                .map_err(|_| R2pdError::MissingColumn {
                    site_id,
                    column: name.to_string(),
                })?
                .f64()?;
            let points = timestamps
                .iter()
                .enumerate()
                .map(|(row, timestamp)| TimePoint {
                    timestamp: *timestamp,
                    value: values.get(row).unwrap_or(f64::NAN),
                })
                .collect();
            Ok(Timeseries::new(*name, points)?)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::testing::FakeRepository;
    use crate::settings::{CacheSettings, Settings};
    use crate::types::site::Site;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    #[tokio::test]
    async fn opens_cache_and_reports_usage() {
        let dir = TempDir::new().unwrap();
        let repo = Arc::new(FakeRepository::new(vec![Site {
            id: 1,
            latitude: 40.0,
            longitude: -105.0,
            capacity_mw: 16.0,
        }]));
        let settings = Settings {
            cache: CacheSettings {
                root_path: Some(dir.path().to_path_buf()),
                max_size_gb: Some(1.0),
            },
            ..Settings::default()
        };

        let client = R2pd::with_repository(settings, repo).await.unwrap();
        assert_eq!(client.cache_size_bytes().await, 0);
        assert_eq!(client.cache_budget_bytes(), Some(1_000_000_000));
    }

    #[test]
    fn frame_to_series_requires_the_datetime_column() {
        let df = DataFrame::new(vec![
            Series::new("power".into(), vec![1.0f64]).into_column()
        ])
        .unwrap();
        let err = frame_to_series(&df, 7, &["power"]).unwrap_err();
        assert!(matches!(
            err,
            R2pdError::MissingColumn { site_id: 7, .. }
        ));
    }

    #[test]
    fn frame_to_series_extracts_float_columns() {
        let datetimes = Series::new("datetime".into(), vec![0i64, 3_600_000])
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
            .unwrap();
        let power = Series::new("power".into(), vec![1.5f64, 2.5]);
        let df = DataFrame::new(vec![datetimes.into_column(), power.into_column()]).unwrap();

        let series = frame_to_series(&df, 7, &["power"]).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].name(), "power");
        assert_eq!(series[0].points()[1].value, 2.5);
        assert_eq!(
            series[0].points()[1].timestamp,
            Utc.with_ymd_and_hms(1970, 1, 1, 1, 0, 0).unwrap()
        );
    }
}
