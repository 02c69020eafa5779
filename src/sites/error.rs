use crate::repository::error::FetchError;
use crate::types::resource::Dataset;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LocateSiteError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("the {dataset} site metadata lists no sites")]
    NoSites { dataset: Dataset },

    #[error(
        "cannot fill {requested_mw} MW for node {node_id}: only {allocated_mw} MW of site capacity available"
    )]
    InsufficientCapacity {
        node_id: i64,
        requested_mw: f64,
        allocated_mw: f64,
    },

    #[error("failed to read site metadata cache '{0}'")]
    CacheRead(PathBuf, #[source] std::io::Error),

    #[error("failed to decode site metadata cache '{0}'")]
    CacheDecode(PathBuf, #[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("failed to encode site metadata cache")]
    CacheEncode(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("failed to write site metadata cache '{0}'")]
    CacheWrite(PathBuf, #[source] std::io::Error),

    #[error("background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}
