//! A repository backed by a locally mounted directory tree, laid out the
//! same way as the hosted repository:
//!
//! ```text
//! <root>/wind/wind_site_meta.json
//! <root>/wind/power/<site_id>.csv
//! <root>/solar/met/<site_id>.csv
//! ```
//!
//! Series files are plain CSV (no gzip). Useful on hosts that mount the
//! repository as a network filesystem, and for offline runs.

use crate::cache::fingerprint::Fingerprint;
use crate::repository::error::FetchError;
use crate::repository::ResourceRepository;
use crate::types::resource::Dataset;
use crate::types::site::Site;
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;
use tracing::debug;

pub struct LocalDir {
    root: PathBuf,
}

impl LocalDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ResourceRepository for LocalDir {
    async fn fetch_site_meta(&self, dataset: Dataset) -> Result<Vec<Site>, FetchError> {
        let path = self
            .root
            .join(dataset.path_segment())
            .join(dataset.site_meta_file());
        let bytes = fs::read(&path)
            .await
            .map_err(|e| FetchError::LocalRead(path.clone(), e))?;
        serde_json::from_slice::<Vec<Site>>(&bytes).map_err(|e| FetchError::MalformedSiteMeta {
            url: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    async fn fetch_series(&self, fingerprint: &Fingerprint) -> Result<Vec<u8>, FetchError> {
        let path = self
            .root
            .join(fingerprint.dataset.path_segment())
            .join(fingerprint.kind.path_segment())
            .join(format!("{}.csv", fingerprint.site_id));
        debug!("reading series from {}", path.display());
        fs::read(&path)
            .await
            .map_err(|e| FetchError::LocalRead(path, e))
    }
}
