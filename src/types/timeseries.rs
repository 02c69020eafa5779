//! In-memory timeseries types shared by the cache extraction, shaping and
//! output layers.
//!
//! A [`Timeseries`] is a named column of (timestamp, value) points with
//! strictly increasing timestamps. A [`ForecastSeries`] carries one value
//! column per discrete forecast leadtime over a shared timestamp axis.

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SeriesError {
    #[error("timeseries '{name}' is empty")]
    Empty { name: String },

    #[error("timeseries '{name}' timestamps are not strictly increasing at index {index}")]
    NonMonotonic { name: String, index: usize },

    #[error(
        "timeseries '{name}' spacing is irregular: {found_secs}s at index {index}, expected {expected_secs}s"
    )]
    IrregularSpacing {
        name: String,
        index: usize,
        expected_secs: i64,
        found_secs: i64,
    },

    #[error("cannot combine timeseries '{left}' and '{right}': timestamps differ")]
    TimestampMismatch { left: String, right: String },

    #[error("forecast series has {values} value rows for {timestamps} timestamps")]
    ForecastShapeMismatch { timestamps: usize, values: usize },

    #[error("forecast row {row} has {found} values for {leadtimes} leadtimes")]
    ForecastRowMismatch {
        row: usize,
        leadtimes: usize,
        found: usize,
    },
}

/// One observation of a timeseries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimePoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// An ordered, named sequence of (timestamp, value) pairs.
#[derive(Debug, Clone, PartialEq)]
pub struct Timeseries {
    name: String,
    points: Vec<TimePoint>,
}

impl Timeseries {
    /// Builds a timeseries, rejecting empty input and any timestamp that is
    /// not strictly greater than its predecessor.
    pub fn new(name: impl Into<String>, points: Vec<TimePoint>) -> Result<Self, SeriesError> {
        let name = name.into();
        if points.is_empty() {
            return Err(SeriesError::Empty { name });
        }
        for (index, pair) in points.windows(2).enumerate() {
            if pair[1].timestamp <= pair[0].timestamp {
                return Err(SeriesError::NonMonotonic {
                    name,
                    index: index + 1,
                });
            }
        }
        Ok(Self { name, points })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn points(&self) -> &[TimePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.points[0].timestamp
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.points[self.points.len() - 1].timestamp
    }

    /// The constant spacing between consecutive points.
    ///
    /// Single-point series have no measurable spacing and irregular spacing
    /// means the data cannot be reshaped, so both are errors.
    pub fn native_resolution(&self) -> Result<Duration, SeriesError> {
        if self.points.len() < 2 {
            return Err(SeriesError::IrregularSpacing {
                name: self.name.clone(),
                index: 0,
                expected_secs: 0,
                found_secs: 0,
            });
        }
        let expected = self.points[1].timestamp - self.points[0].timestamp;
        for (index, pair) in self.points.windows(2).enumerate() {
            let found = pair[1].timestamp - pair[0].timestamp;
            if found != expected {
                return Err(SeriesError::IrregularSpacing {
                    name: self.name.clone(),
                    index: index + 1,
                    expected_secs: expected.num_seconds(),
                    found_secs: found.num_seconds(),
                });
            }
        }
        Ok(expected)
    }

    /// Multiplies every value by `factor`, e.g. to take a capacity fraction
    /// of a site's output.
    pub fn scaled(mut self, factor: f64) -> Self {
        for point in &mut self.points {
            point.value *= factor;
        }
        self
    }

    /// Pointwise sum of two series over identical timestamps.
    pub fn checked_add(&self, other: &Timeseries) -> Result<Timeseries, SeriesError> {
        if self.points.len() != other.points.len()
            || self
                .points
                .iter()
                .zip(&other.points)
                .any(|(a, b)| a.timestamp != b.timestamp)
        {
            return Err(SeriesError::TimestampMismatch {
                left: self.name.clone(),
                right: other.name.clone(),
            });
        }
        let points = self
            .points
            .iter()
            .zip(&other.points)
            .map(|(a, b)| TimePoint {
                timestamp: a.timestamp,
                value: a.value + b.value,
            })
            .collect();
        Ok(Timeseries {
            name: self.name.clone(),
            points,
        })
    }

    /// Renames the series in place and returns it.
    pub fn renamed(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// Discrete-leadtime forecast data: for each timestamp, the value predicted
/// for that time `leadtimes[i]` in advance.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastSeries {
    leadtimes: Vec<Duration>,
    timestamps: Vec<DateTime<Utc>>,
    /// Row-major: `values[row][leadtime_index]`.
    values: Vec<Vec<f64>>,
}

impl ForecastSeries {
    pub fn new(
        leadtimes: Vec<Duration>,
        timestamps: Vec<DateTime<Utc>>,
        values: Vec<Vec<f64>>,
    ) -> Result<Self, SeriesError> {
        if timestamps.len() != values.len() {
            return Err(SeriesError::ForecastShapeMismatch {
                timestamps: timestamps.len(),
                values: values.len(),
            });
        }
        for (row, row_values) in values.iter().enumerate() {
            if row_values.len() != leadtimes.len() {
                return Err(SeriesError::ForecastRowMismatch {
                    row,
                    leadtimes: leadtimes.len(),
                    found: row_values.len(),
                });
            }
        }
        for (index, pair) in timestamps.windows(2).enumerate() {
            if pair[1] <= pair[0] {
                return Err(SeriesError::NonMonotonic {
                    name: "forecast".to_string(),
                    index: index + 1,
                });
            }
        }
        Ok(Self {
            leadtimes,
            timestamps,
            values,
        })
    }

    pub fn leadtimes(&self) -> &[Duration] {
        &self.leadtimes
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn value(&self, row: usize, leadtime_index: usize) -> f64 {
        self.values[row][leadtime_index]
    }

    /// Extracts one leadtime column as a plain timeseries.
    pub fn column(&self, leadtime_index: usize) -> Result<Timeseries, SeriesError> {
        let points = self
            .timestamps
            .iter()
            .zip(&self.values)
            .map(|(timestamp, row)| TimePoint {
                timestamp: *timestamp,
                value: row[leadtime_index],
            })
            .collect();
        Timeseries::new(leadtime_label(self.leadtimes[leadtime_index]), points)
    }

    /// Rebuilds a forecast series from per-leadtime columns sharing one
    /// timestamp axis.
    pub fn from_columns(
        leadtimes: Vec<Duration>,
        columns: &[Timeseries],
    ) -> Result<Self, SeriesError> {
        let first = columns.first().ok_or(SeriesError::ForecastShapeMismatch {
            timestamps: 0,
            values: 0,
        })?;
        for other in &columns[1..] {
            if other.len() != first.len()
                || other
                    .points()
                    .iter()
                    .zip(first.points())
                    .any(|(a, b)| a.timestamp != b.timestamp)
            {
                return Err(SeriesError::TimestampMismatch {
                    left: first.name().to_string(),
                    right: other.name().to_string(),
                });
            }
        }
        let timestamps = first.points().iter().map(|p| p.timestamp).collect();
        let values = (0..first.len())
            .map(|row| columns.iter().map(|c| c.points()[row].value).collect())
            .collect();
        Self::new(leadtimes, timestamps, values)
    }

    pub fn scaled(mut self, factor: f64) -> Self {
        for row in &mut self.values {
            for value in row {
                *value *= factor;
            }
        }
        self
    }

    /// Pointwise sum over identical timestamps and leadtimes.
    pub fn checked_add(&self, other: &ForecastSeries) -> Result<ForecastSeries, SeriesError> {
        if self.timestamps != other.timestamps || self.leadtimes != other.leadtimes {
            return Err(SeriesError::TimestampMismatch {
                left: "forecast".to_string(),
                right: "forecast".to_string(),
            });
        }
        let values = self
            .values
            .iter()
            .zip(&other.values)
            .map(|(a, b)| a.iter().zip(b).map(|(x, y)| x + y).collect())
            .collect();
        ForecastSeries::new(self.leadtimes.clone(), self.timestamps.clone(), values)
    }
}

/// Human-readable column label for a leadtime, e.g. `fcst_4h` or `fcst_90m`.
pub fn leadtime_label(leadtime: Duration) -> String {
    let minutes = leadtime.num_minutes();
    if minutes % 60 == 0 {
        format!("fcst_{}h", minutes / 60)
    } else {
        format!("fcst_{}m", minutes)
    }
}
