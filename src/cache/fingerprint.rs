//! The request fingerprint that keys the local cache.

use crate::types::resource::{Dataset, ResourceKind};
use crate::types::site::Site;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Identifies one raw data file in the external repository.
///
/// A fingerprint is immutable once constructed and derives the cache file
/// name deterministically, so two requests with the same parameters always
/// resolve to the same cached file. Caching is at full-request granularity:
/// an overlapping but different date range is a different fingerprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fingerprint {
    pub dataset: Dataset,
    pub kind: ResourceKind,
    pub site_id: i64,
    pub latitude: f64,
    pub longitude: f64,
    /// First requested timestamp (inclusive).
    pub start: DateTime<Utc>,
    /// Last requested timestamp (inclusive).
    pub end: DateTime<Utc>,
    /// Native spacing of the raw data in seconds.
    pub resolution_secs: i64,
}

impl Fingerprint {
    pub fn for_site(
        dataset: Dataset,
        kind: ResourceKind,
        site: &Site,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Self {
        Self {
            dataset,
            kind,
            site_id: site.id,
            latitude: site.latitude,
            longitude: site.longitude,
            start,
            end,
            resolution_secs: kind.native_resolution(dataset).num_seconds(),
        }
    }

    pub fn resolution(&self) -> Duration {
        Duration::seconds(self.resolution_secs)
    }

    /// Deterministic cache file name, also used as the cache index key.
    pub fn cache_file_name(&self) -> String {
        format!(
            "{}-{}-{:05}-{}-{}-{}s.parquet",
            self.dataset,
            self.kind,
            self.site_id,
            self.start.format("%Y%m%dT%H%M"),
            self.end.format("%Y%m%dT%H%M"),
            self.resolution_secs,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn site() -> Site {
        Site {
            id: 42,
            latitude: 40.0,
            longitude: -105.0,
            capacity_mw: 16.0,
        }
    }

    #[test]
    fn file_name_is_deterministic() {
        let start = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2020, 1, 2, 0, 0, 0).unwrap();
        let a = Fingerprint::for_site(Dataset::Wind, ResourceKind::ActualPower, &site(), start, end);
        let b = Fingerprint::for_site(Dataset::Wind, ResourceKind::ActualPower, &site(), start, end);
        assert_eq!(a.cache_file_name(), b.cache_file_name());
        assert_eq!(
            a.cache_file_name(),
            "wind-power-00042-20200101T0000-20200102T0000-300s.parquet"
        );
    }

    #[test]
    fn distinct_ranges_are_distinct_fingerprints() {
        let start = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let end_a = Utc.with_ymd_and_hms(2020, 1, 2, 0, 0, 0).unwrap();
        let end_b = Utc.with_ymd_and_hms(2020, 1, 3, 0, 0, 0).unwrap();
        let a = Fingerprint::for_site(Dataset::Wind, ResourceKind::Weather, &site(), start, end_a);
        let b = Fingerprint::for_site(Dataset::Wind, ResourceKind::Weather, &site(), start, end_b);
        assert_ne!(a.cache_file_name(), b.cache_file_name());
    }
}
