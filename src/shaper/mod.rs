//! Temporal conventions for timeseries and forecasts, and the reshapers
//! that convert raw data to a caller-requested shape.

pub mod error;
pub mod forecast;
pub mod series;

pub use error::ShapeError;
pub use forecast::{
    reshape_forecast, DispatchForecast, DispatchRow, ForecastShape, ShapedForecast,
};
pub use series::reshape;

use chrono::{DateTime, Duration, Utc};

/// How a timeseries value relates to its timestamp.
///
/// `Instantaneous` values are samples at the timestamp itself. The
/// `Average*` and `Integrated*` variants describe values derived from a
/// window of source points, with the suffix naming where the output
/// timestamp sits relative to that window (end, start or middle).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointInterpretation {
    Instantaneous,
    AveragePrev,
    AverageNext,
    AverageMidpoint,
    IntegratedPrev,
    IntegratedNext,
    IntegratedMidpoint,
}

impl PointInterpretation {
    pub(crate) fn is_average(&self) -> bool {
        matches!(
            self,
            PointInterpretation::AveragePrev
                | PointInterpretation::AverageNext
                | PointInterpretation::AverageMidpoint
        )
    }

    pub(crate) fn is_integrated(&self) -> bool {
        matches!(
            self,
            PointInterpretation::IntegratedPrev
                | PointInterpretation::IntegratedNext
                | PointInterpretation::IntegratedMidpoint
        )
    }
}

/// The temporal shape requested for output data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemporalShape {
    /// First output timestamp (inclusive).
    pub start: DateTime<Utc>,
    /// Last output timestamp (inclusive).
    pub end: DateTime<Utc>,
    /// Output spacing. `None` keeps the data's native resolution.
    pub resolution: Option<Duration>,
    pub interpretation: PointInterpretation,
}

impl TemporalShape {
    /// An instantaneous shape over `[start, end]` at the native resolution.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start,
            end,
            resolution: None,
            interpretation: PointInterpretation::Instantaneous,
        }
    }

    pub fn with_resolution(mut self, resolution: Duration) -> Self {
        self.resolution = Some(resolution);
        self
    }

    pub fn with_interpretation(mut self, interpretation: PointInterpretation) -> Self {
        self.interpretation = interpretation;
        self
    }
}
