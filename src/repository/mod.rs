//! Access to external stores of resource data.
//!
//! The [`ResourceRepository`] trait is the seam between the cache and
//! whatever actually serves raw site files: the hosted DR Power repository
//! ([`DrPower`]) or a locally mounted repository tree ([`LocalDir`]).

pub mod drpower;
pub mod error;
pub mod local;

pub use drpower::DrPower;
pub use error::FetchError;
pub use local::LocalDir;

use crate::cache::fingerprint::Fingerprint;
use crate::types::resource::Dataset;
use crate::types::site::Site;
use async_trait::async_trait;

/// An external store of per-site resource data.
///
/// `fetch_series` returns the decompressed CSV payload for one fingerprint:
/// a headerless file whose first column is the timestamp in epoch seconds,
/// followed by the value columns of the fingerprint's resource kind.
#[async_trait]
pub trait ResourceRepository: Send + Sync {
    /// Downloads the site metadata listing for a dataset.
    async fn fetch_site_meta(&self, dataset: Dataset) -> Result<Vec<Site>, FetchError>;

    /// Downloads the raw timeseries for one fingerprint.
    async fn fetch_series(&self, fingerprint: &Fingerprint) -> Result<Vec<u8>, FetchError>;
}

#[cfg(test)]
pub(crate) mod testing {
    //! An in-memory repository for exercising cache and client behavior
    //! without a network.

    use super::*;
    use std::fmt::Write as _;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Serves generated series and counts every fetch, so tests can assert
    /// that cache hits never re-contact the repository.
    pub struct FakeRepository {
        sites: Vec<Site>,
        fetches: AtomicUsize,
        meta_fetches: AtomicUsize,
    }

    impl FakeRepository {
        pub fn new(sites: Vec<Site>) -> Self {
            Self {
                sites,
                fetches: AtomicUsize::new(0),
                meta_fetches: AtomicUsize::new(0),
            }
        }

        pub fn fetch_count(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }

        pub fn meta_fetch_count(&self) -> usize {
            self.meta_fetches.load(Ordering::SeqCst)
        }

        /// Generates the CSV payload for a fingerprint: one row per native
        /// step from start to end inclusive, values derived from the row
        /// index so tests can predict them.
        pub fn payload(fingerprint: &Fingerprint) -> Vec<u8> {
            let step = fingerprint.resolution();
            let columns = fingerprint
                .kind
                .schema_column_names(fingerprint.dataset)
                .len();
            let mut body = String::new();
            let mut stamp = fingerprint.start;
            let mut row = 0usize;
            while stamp <= fingerprint.end {
                write!(body, "{}", stamp.timestamp()).unwrap();
                for column in 0..columns {
                    write!(body, ",{:.1}", (row * (column + 1)) as f64).unwrap();
                }
                body.push('\n');
                stamp += step;
                row += 1;
            }
            body.into_bytes()
        }
    }

    #[async_trait]
    impl ResourceRepository for FakeRepository {
        async fn fetch_site_meta(&self, _dataset: Dataset) -> Result<Vec<Site>, FetchError> {
            self.meta_fetches.fetch_add(1, Ordering::SeqCst);
            Ok(self.sites.clone())
        }

        async fn fetch_series(&self, fingerprint: &Fingerprint) -> Result<Vec<u8>, FetchError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(Self::payload(fingerprint))
        }
    }
}
