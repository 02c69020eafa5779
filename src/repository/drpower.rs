//! The hosted DR Power repository: raw site files as gzipped CSV over HTTP,
//! site metadata as JSON.

use crate::cache::fingerprint::Fingerprint;
use crate::repository::error::FetchError;
use crate::repository::ResourceRepository;
use crate::settings::RepositorySettings;
use crate::types::resource::Dataset;
use crate::types::site::Site;
use async_compression::tokio::bufread::GzipDecoder;
use async_trait::async_trait;
use futures_util::TryStreamExt;
use reqwest::Client;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio_util::io::StreamReader;
use tracing::{debug, info, warn};

pub struct DrPower {
    base_url: String,
    client: Client,
    max_retries: u32,
}

impl DrPower {
    pub fn new(settings: &RepositorySettings) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(FetchError::ClientBuild)?;
        Ok(Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            client,
            max_retries: settings.max_retries,
        })
    }

    fn series_url(&self, fingerprint: &Fingerprint) -> String {
        format!(
            "{}/{}/{}/{}.csv.gz?start={}&end={}",
            self.base_url,
            fingerprint.dataset,
            fingerprint.kind,
            fingerprint.site_id,
            fingerprint.start.to_rfc3339(),
            fingerprint.end.to_rfc3339(),
        )
    }

    /// Runs one download attempt, retrying transient failures with doubling
    /// backoff up to the configured retry count.
    async fn with_retries(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let mut attempt = 0u32;
        let mut backoff = Duration::from_millis(500);
        loop {
            match self.download_gzip(url).await {
                Ok(bytes) => return Ok(bytes),
                Err(e) if attempt < self.max_retries && e.is_transient() => {
                    warn!(
                        "fetch attempt {} of {} failed for {url}: {e}; retrying in {:?}",
                        attempt + 1,
                        self.max_retries + 1,
                        backoff
                    );
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Downloads and decompresses one gzipped payload.
    async fn download_gzip(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        debug!("downloading {url}");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::NetworkRequest(url.to_string(), e))?;

        let response = match response.error_for_status() {
            Ok(resp) => resp,
            Err(e) => {
                return Err(if let Some(status) = e.status() {
                    FetchError::HttpStatus {
                        url: url.to_string(),
                        status,
                        source: e,
                    }
                } else {
                    FetchError::NetworkRequest(url.to_string(), e)
                });
            }
        };

        let stream = response
            .bytes_stream()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e));
        let stream_reader = StreamReader::new(stream);
        let mut decoder = GzipDecoder::new(stream_reader);
        let mut decompressed = Vec::new();
        decoder
            .read_to_end(&mut decompressed)
            .await
            .map_err(|e| FetchError::DownloadIo(url.to_string(), e))?;
        info!("downloaded {} bytes from {url}", decompressed.len());
        Ok(decompressed)
    }
}

#[async_trait]
impl ResourceRepository for DrPower {
    async fn fetch_site_meta(&self, dataset: Dataset) -> Result<Vec<Site>, FetchError> {
        let url = format!("{}/{}/{}", self.base_url, dataset, dataset.site_meta_file());
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::NetworkRequest(url.clone(), e))?;
        let response = match response.error_for_status() {
            Ok(resp) => resp,
            Err(e) => {
                return Err(if let Some(status) = e.status() {
                    FetchError::HttpStatus {
                        url,
                        status,
                        source: e,
                    }
                } else {
                    FetchError::NetworkRequest(url, e)
                });
            }
        };
        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::NetworkRequest(url.clone(), e))?;
        let sites = serde_json::from_slice::<Vec<Site>>(&bytes).map_err(|e| {
            FetchError::MalformedSiteMeta {
                url,
                reason: e.to_string(),
            }
        })?;
        info!("loaded {} {dataset} sites from repository", sites.len());
        Ok(sites)
    }

    async fn fetch_series(&self, fingerprint: &Fingerprint) -> Result<Vec<u8>, FetchError> {
        let url = self.series_url(fingerprint);
        self.with_retries(&url).await
    }
}
