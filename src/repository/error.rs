use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network request failed for {0}")]
    NetworkRequest(String, #[source] reqwest::Error),

    #[error("HTTP request failed for {url} with status {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
        #[source]
        source: reqwest::Error,
    },

    #[error("data download or decompression failed for {0}")]
    DownloadIo(String, #[source] std::io::Error),

    #[error("malformed site metadata from {url}: {reason}")]
    MalformedSiteMeta { url: String, reason: String },

    #[error("failed to build repository HTTP client")]
    ClientBuild(#[source] reqwest::Error),

    #[error("failed to read local repository file '{0}'")]
    LocalRead(PathBuf, #[source] std::io::Error),
}

impl FetchError {
    /// Whether a retry can plausibly succeed. Client-side HTTP errors are
    /// permanent; connection problems and server errors are not.
    pub(crate) fn is_transient(&self) -> bool {
        match self {
            FetchError::NetworkRequest(_, _) => true,
            FetchError::DownloadIo(_, _) => true,
            FetchError::HttpStatus { status, .. } => status.is_server_error(),
            _ => false,
        }
    }
}
