//! Provides the [`ForecastPowerClient`] for requesting forecast power data.
//!
//! Obtained via [`R2pd::forecast_power`](crate::R2pd::forecast_power). On
//! top of the power options it takes a [`ForecastShape`] describing either
//! the discrete leadtimes or the dispatch-lookahead table the caller wants.

use crate::error::R2pdError;
use crate::r2pd::{NodeForecast, R2pd};
use crate::shaper::forecast::ForecastShape;
use crate::shaper::TemporalShape;
use crate::types::node::GeneratorNode;
use crate::types::resource::Dataset;
use bon::bon;

/// A client builder for fetching forecast power at requested generator
/// nodes.
///
/// Sites are allocated and aggregated like an actual-power request; the
/// combined forecast columns are then reshaped to the requested
/// [`ForecastShape`].
pub struct ForecastPowerClient<'a> {
    client: &'a R2pd,
}

#[bon]
impl<'a> ForecastPowerClient<'a> {
    pub(crate) fn new(client: &'a R2pd) -> Self {
        Self { client }
    }

    /// Initiates a forecast-power request for a list of generator nodes.
    ///
    /// Required builder methods after `.generators(..)`: `.dataset(Dataset)`,
    /// `.shape(TemporalShape)` and `.forecast(ForecastShape)`. Finish with
    /// `.call().await`.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use r2pd::{Dataset, ForecastShape, GeneratorNode, Node, R2pd, Settings, TemporalShape};
    /// # use chrono::{Duration, TimeZone, Utc};
    /// # async fn run() -> Result<(), r2pd::R2pdError> {
    /// let client = R2pd::connect(Settings::default()).await?;
    /// let generators = [GeneratorNode {
    ///     node: Node { id: 2, latitude: 40.0, longitude: -105.0 },
    ///     capacity_mw: 100.0,
    /// }];
    ///
    /// let results = client
    ///     .forecast_power()
    ///     .generators(&generators)
    ///     .dataset(Dataset::Wind)
    ///     .shape(TemporalShape::new(
    ///         Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(),
    ///         Utc.with_ymd_and_hms(2020, 1, 2, 0, 0, 0).unwrap(),
    ///     ))
    ///     .forecast(ForecastShape::DiscreteLeadtimes {
    ///         leadtimes: vec![Duration::hours(1), Duration::hours(4)],
    ///     })
    ///     .call()
    ///     .await?;
    /// assert_eq!(results[0].node_id, 2);
    /// # Ok(())
    /// # }
    /// ```
    #[builder(start_fn = generators)]
    #[doc(hidden)]
    pub async fn build_generators(
        &self,
        #[builder(start_fn)] generators: &[GeneratorNode],
        dataset: Dataset,
        shape: TemporalShape,
        forecast: ForecastShape,
    ) -> Result<Vec<NodeForecast>, R2pdError> {
        self.client
            .forecast_power_data()
            .dataset(dataset)
            .nodes(generators)
            .shape(shape)
            .forecast(forecast)
            .call()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::testing::FakeRepository;
    use crate::settings::{CacheSettings, Settings};
    use crate::shaper::forecast::ShapedForecast;
    use crate::types::node::Node;
    use crate::types::site::Site;
    use chrono::{Duration, NaiveTime, TimeZone, Utc};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn site(id: i64, capacity_mw: f64) -> Site {
        Site {
            id,
            latitude: 40.0,
            longitude: -105.0,
            capacity_mw,
        }
    }

    async fn client(dir: &TempDir, repo: Arc<FakeRepository>) -> R2pd {
        let settings = Settings {
            cache: CacheSettings {
                root_path: Some(dir.path().to_path_buf()),
                max_size_gb: None,
            },
            ..Settings::default()
        };
        R2pd::with_repository(settings, repo).await.unwrap()
    }

    fn generators() -> [GeneratorNode; 1] {
        [GeneratorNode {
            node: Node {
                id: 5,
                latitude: 40.0,
                longitude: -105.0,
            },
            capacity_mw: 10.0,
        }]
    }

    fn day_shape() -> TemporalShape {
        TemporalShape::new(
            Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2020, 1, 2, 0, 0, 0).unwrap(),
        )
    }

    #[tokio::test]
    async fn forecast_power_reshapes_to_requested_leadtimes() {
        let dir = TempDir::new().unwrap();
        let repo = Arc::new(FakeRepository::new(vec![site(1, 10.0)]));
        let client = client(&dir, repo.clone()).await;

        let generators = generators();
        let results = client
            .forecast_power()
            .generators(&generators)
            .dataset(Dataset::Wind)
            .shape(day_shape())
            .forecast(ForecastShape::DiscreteLeadtimes {
                leadtimes: vec![Duration::hours(4)],
            })
            .call()
            .await
            .unwrap();

        let ShapedForecast::Leadtimes(out) = &results[0].forecast else {
            panic!("expected leadtime output");
        };
        assert_eq!(out.leadtimes(), &[Duration::hours(4)]);
        assert_eq!(out.len(), 25);
        // Fake payload column 2 (the 4h column) carries row * 2.
        assert!((out.value(1, 0) - 2.0).abs() < 1e-9);
        assert_eq!(repo.fetch_count(), 1);
    }

    #[tokio::test]
    async fn dispatch_lookahead_request_builds_a_table() {
        let dir = TempDir::new().unwrap();
        let repo = Arc::new(FakeRepository::new(vec![site(1, 10.0)]));
        let client = client(&dir, repo.clone()).await;

        let generators = generators();
        let results = client
            .forecast_power()
            .generators(&generators)
            .dataset(Dataset::Wind)
            .shape(day_shape())
            .forecast(ForecastShape::DispatchLookahead {
                frequency: Duration::hours(24),
                lookahead: Duration::hours(4),
                leadtime: Duration::hours(6),
                dispatch_time: NaiveTime::from_hms_opt(6, 0, 0).unwrap(),
            })
            .call()
            .await
            .unwrap();

        let ShapedForecast::Dispatch(table) = &results[0].forecast else {
            panic!("expected dispatch output");
        };
        assert!(!table.rows.is_empty());
        assert_eq!(
            table.rows[0].dispatch_time,
            Utc.with_ymd_and_hms(2020, 1, 1, 6, 0, 0).unwrap()
        );
        assert_eq!(
            table.rows[0].forecast_time,
            Utc.with_ymd_and_hms(2020, 1, 1, 12, 0, 0).unwrap()
        );
    }
}
