use crate::types::timeseries::SeriesError;
use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShapeError {
    #[error(transparent)]
    Series(#[from] SeriesError),

    #[error(
        "requested resolution of {}s is finer than the native resolution of {}s",
        requested.num_seconds(),
        native.num_seconds()
    )]
    InvalidResolution { requested: Duration, native: Duration },

    #[error(
        "requested resolution of {}s is not a whole multiple of the native resolution of {}s",
        requested.num_seconds(),
        native.num_seconds()
    )]
    MisalignedResolution { requested: Duration, native: Duration },

    #[error("requested extent starts at {start} but ends at {end}")]
    InvalidExtent {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error(
        "requested extent {requested_start} to {requested_end} is not covered by the source data ({source_start} to {source_end})"
    )]
    ExtentOutOfBounds {
        requested_start: DateTime<Utc>,
        requested_end: DateTime<Utc>,
        source_start: DateTime<Utc>,
        source_end: DateTime<Utc>,
    },

    #[error("no source points fall in the resample window ending at {at}")]
    EmptyResampleWindow { at: DateTime<Utc> },

    #[error("forecast shaping requires at least one requested leadtime")]
    NoLeadtimes,

    #[error("cannot interpolate leadtime {}m from {available} native leadtime column(s)", requested.num_minutes())]
    InsufficientLeadtimes { requested: Duration, available: usize },

    #[error("{what} must be a positive duration")]
    NonPositiveDuration { what: &'static str },
}
