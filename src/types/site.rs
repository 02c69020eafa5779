//! Resource site metadata as published by the external repository, with the
//! `rstar` implementations needed to index sites spatially.

use rstar::{PointDistance, RTreeObject, AABB};
use serde::{Deserialize, Serialize};

/// A single resource site in the external repository.
///
/// Sites are the repository-side counterpart of requested nodes: each
/// requested node is served from the data of one or more nearby sites.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Site {
    /// Repository-wide site identifier.
    pub id: i64,
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
    /// Nameplate capacity of the site in MW.
    pub capacity_mw: f64,
}

impl RTreeObject for Site {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.latitude, self.longitude])
    }
}

impl PointDistance for Site {
    /// Squared Euclidean distance in degree space. Good enough for R-tree
    /// nearest-neighbor ordering; the locator re-ranks candidates with
    /// haversine distances.
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.latitude - point[0];
        let dy = self.longitude - point[1];
        dx * dx + dy * dy
    }
}
