//! Provides the [`WeatherClient`] for requesting meteorological source data.
//!
//! This client acts as an intermediate builder, obtained via
//! [`R2pd::weather`](crate::R2pd::weather). The caller names the nodes, the
//! dataset and the temporal shape, then executes the request with
//! `.call().await`.

use crate::error::R2pdError;
use crate::r2pd::{NodeSeries, R2pd};
use crate::shaper::TemporalShape;
use crate::types::node::Node;
use crate::types::resource::Dataset;
use bon::bon;

/// A client builder for fetching weather data at requested nodes.
///
/// Each node is served by the dataset's nearest site and every met column of
/// the raw site file is reshaped to the requested temporal shape.
pub struct WeatherClient<'a> {
    client: &'a R2pd,
}

#[bon]
impl<'a> WeatherClient<'a> {
    pub(crate) fn new(client: &'a R2pd) -> Self {
        Self { client }
    }

    /// Initiates a weather request for a list of nodes.
    ///
    /// Required builder methods after `.nodes(..)`: `.dataset(Dataset)` and
    /// `.shape(TemporalShape)`. Finish with `.call().await`.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use r2pd::{Dataset, Node, R2pd, Settings, TemporalShape};
    /// # use chrono::{TimeZone, Utc};
    /// # async fn run() -> Result<(), r2pd::R2pdError> {
    /// let client = R2pd::connect(Settings::default()).await?;
    /// let nodes = [Node { id: 1, latitude: 40.0, longitude: -105.0 }];
    ///
    /// let results = client
    ///     .weather()
    ///     .nodes(&nodes)
    ///     .dataset(Dataset::Wind)
    ///     .shape(TemporalShape::new(
    ///         Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(),
    ///         Utc.with_ymd_and_hms(2020, 1, 2, 0, 0, 0).unwrap(),
    ///     ))
    ///     .call()
    ///     .await?;
    /// assert_eq!(results.len(), 1);
    /// # Ok(())
    /// # }
    /// ```
    #[builder(start_fn = nodes)]
    #[doc(hidden)]
    pub async fn build_nodes(
        &self,
        #[builder(start_fn)] nodes: &[Node],
        dataset: Dataset,
        shape: TemporalShape,
    ) -> Result<Vec<NodeSeries>, R2pdError> {
        self.client
            .weather_data()
            .dataset(dataset)
            .nodes(nodes)
            .shape(shape)
            .call()
            .await
    }
}
