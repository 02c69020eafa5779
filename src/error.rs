use crate::cache::error::CacheError;
use crate::output::OutputError;
use crate::repository::error::FetchError;
use crate::settings::SettingsError;
use crate::shaper::error::ShapeError;
use crate::sites::error::LocateSiteError;
use crate::types::node::NodeListError;
use crate::types::resource::Dataset;
use crate::types::timeseries::SeriesError;
use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum R2pdError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    LocateSite(#[from] LocateSiteError),

    #[error(transparent)]
    Shape(#[from] ShapeError),

    #[error(transparent)]
    Series(#[from] SeriesError),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    NodeList(#[from] NodeListError),

    #[error(transparent)]
    Output(#[from] OutputError),

    #[error("no {dataset} site found for node {node_id} at ({latitude}, {longitude})")]
    NoSiteForNode {
        dataset: Dataset,
        node_id: i64,
        latitude: f64,
        longitude: f64,
    },

    #[error("failed to scan cached data file '{0}'")]
    ParquetScan(PathBuf, #[source] PolarsError),

    #[error("failed processing cached data frame")]
    DataFrame(#[from] PolarsError),

    #[error("cached data for site {site_id} is missing column '{column}'")]
    MissingColumn { site_id: i64, column: String },

    #[error("cached data for site {site_id} holds an unreadable timestamp at row {row}")]
    InvalidTimestamp { site_id: i64, row: usize },
}
