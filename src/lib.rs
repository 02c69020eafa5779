pub mod cache;
pub mod cli;
pub mod clients;
mod error;
pub mod logging;
pub mod output;
mod r2pd;
pub mod repository;
pub mod settings;
pub mod shaper;
pub mod sites;
pub mod types;

pub use error::R2pdError;
pub use r2pd::*;

pub use cache::{CacheEntry, CacheError, CacheStore, Fingerprint};
pub use clients::{ActualPowerClient, ForecastPowerClient, WeatherClient};
pub use output::OutputError;
pub use repository::{DrPower, FetchError, LocalDir, ResourceRepository};
pub use settings::{CacheSettings, RepositorySettings, Settings, SettingsError};
pub use shaper::{
    reshape, reshape_forecast, DispatchForecast, DispatchRow, ForecastShape, PointInterpretation,
    ShapeError, ShapedForecast, TemporalShape,
};
pub use sites::{LocateSiteError, NodeAllocation, SiteLocator, SiteShare};
pub use types::node::{GeneratorNode, Node, NodeListError};
pub use types::resource::{Dataset, ResourceKind};
pub use types::site::Site;
pub use types::timeseries::{ForecastSeries, SeriesError, TimePoint, Timeseries};
