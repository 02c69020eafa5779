use crate::repository::error::FetchError;
use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(
        "cache cannot hold entry of {needed_bytes} bytes within its budget of {budget_bytes} bytes"
    )]
    CacheFull { needed_bytes: u64, budget_bytes: u64 },

    #[error("failed to create cache directory '{0}'")]
    DirCreation(PathBuf, #[source] std::io::Error),

    #[error("I/O error processing CSV data for '{file}'")]
    CsvReadIo {
        file: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing error processing CSV data for '{file}'")]
    CsvReadPolars {
        file: String,
        #[source]
        source: PolarsError,
    },

    #[error("CSV column count ({found}) does not match schema length ({expected}) for '{file}'")]
    SchemaMismatch {
        file: String,
        expected: usize,
        found: usize,
    },

    #[error("I/O error writing parquet cache file '{0}'")]
    ParquetWriteIo(PathBuf, #[source] std::io::Error),

    #[error("encoding error writing parquet cache file '{0}'")]
    ParquetWritePolars(PathBuf, #[source] PolarsError),

    #[error("failed to read cache entry metadata for '{0}'")]
    EntryMetadata(PathBuf, #[source] std::io::Error),

    #[error("failed to delete cache entry '{0}'")]
    EntryDelete(PathBuf, #[source] std::io::Error),

    #[error("failed to read cache index '{0}'")]
    IndexRead(PathBuf, #[source] std::io::Error),

    #[error("cache index '{0}' is corrupt: {1}")]
    IndexDecode(PathBuf, String),

    #[error("failed to write cache index '{0}'")]
    IndexWrite(PathBuf, #[source] std::io::Error),

    #[error("background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}
