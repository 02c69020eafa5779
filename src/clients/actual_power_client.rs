//! Provides the [`ActualPowerClient`] for requesting generated power data.
//!
//! Obtained via [`R2pd::actual_power`](crate::R2pd::actual_power). The
//! caller names the generator nodes, the dataset and the temporal shape,
//! then executes the request with `.call().await`.

use crate::error::R2pdError;
use crate::r2pd::{NodeSeries, R2pd};
use crate::shaper::TemporalShape;
use crate::types::node::GeneratorNode;
use crate::types::resource::Dataset;
use bon::bon;

/// A client builder for fetching actual power at requested generator nodes.
///
/// Each node's capacity is filled from the nearest sites with free capacity;
/// the site series are scaled by their allocated fractions, summed per node
/// and reshaped to the requested temporal shape.
pub struct ActualPowerClient<'a> {
    client: &'a R2pd,
}

#[bon]
impl<'a> ActualPowerClient<'a> {
    pub(crate) fn new(client: &'a R2pd) -> Self {
        Self { client }
    }

    /// Initiates an actual-power request for a list of generator nodes.
    ///
    /// Required builder methods after `.generators(..)`: `.dataset(Dataset)`
    /// and `.shape(TemporalShape)`. Finish with `.call().await`.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use r2pd::{Dataset, GeneratorNode, Node, R2pd, Settings, TemporalShape};
    /// # use chrono::{TimeZone, Utc};
    /// # async fn run() -> Result<(), r2pd::R2pdError> {
    /// let client = R2pd::connect(Settings::default()).await?;
    /// let generators = [GeneratorNode {
    ///     node: Node { id: 2, latitude: 40.0, longitude: -105.0 },
    ///     capacity_mw: 100.0,
    /// }];
    ///
    /// let results = client
    ///     .actual_power()
    ///     .generators(&generators)
    ///     .dataset(Dataset::Wind)
    ///     .shape(TemporalShape::new(
    ///         Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(),
    ///         Utc.with_ymd_and_hms(2020, 1, 2, 0, 0, 0).unwrap(),
    ///     ))
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
    ) -> Result<Vec<NodeSeries>, R2pdError> {
        self.client
            .actual_power_data()
            .dataset(dataset)
            .nodes(generators)
            .shape(shape)
            .call()
            .await
    }
}
