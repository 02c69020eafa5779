//! Reshapes discrete-leadtime forecast data.
//!
//! Forecast data arrives as one column per native leadtime. It can be
//! refined to a different set of discrete leadtimes (interpolating between
//! the two nearest native columns) or unrolled into a dispatch-lookahead
//! table mimicking how operational models consume forecasts: one forecast
//! run per dispatch time, covering a lookahead window issued some leadtime
//! ahead of the modeled period.

use crate::shaper::error::ShapeError;
use crate::shaper::series::reshape;
use crate::shaper::TemporalShape;
use crate::types::timeseries::{leadtime_label, ForecastSeries, TimePoint, Timeseries};
use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};

/// The forecast shape requested for output data.
#[derive(Debug, Clone, PartialEq)]
pub enum ForecastShape {
    /// Repeated timeseries of the value predicted each given amount of time
    /// in advance.
    DiscreteLeadtimes { leadtimes: Vec<Duration> },
    /// Forecast runs issued `leadtime` ahead of each modeled window of
    /// `lookahead` length, every `frequency`, starting at `dispatch_time`
    /// each day.
    DispatchLookahead {
        frequency: Duration,
        lookahead: Duration,
        leadtime: Duration,
        dispatch_time: NaiveTime,
    },
}

/// One row of a dispatch-lookahead table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DispatchRow {
    pub dispatch_time: DateTime<Utc>,
    pub forecast_time: DateTime<Utc>,
    pub value: f64,
}

/// Dispatch-lookahead output, sorted by dispatch time then forecast time.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchForecast {
    pub rows: Vec<DispatchRow>,
}

/// Output of forecast reshaping.
#[derive(Debug, Clone, PartialEq)]
pub enum ShapedForecast {
    Leadtimes(ForecastSeries),
    Dispatch(DispatchForecast),
}

/// Reshapes `fc` to the requested temporal and forecast shape.
///
/// Each native leadtime column is first reshaped like any other timeseries;
/// the forecast-specific transformation then runs on the shaped columns.
pub fn reshape_forecast(
    fc: &ForecastSeries,
    temporal: &TemporalShape,
    shape: &ForecastShape,
) -> Result<ShapedForecast, ShapeError> {
    let shaped_columns = (0..fc.leadtimes().len())
        .map(|index| reshape(&fc.column(index)?, temporal))
        .collect::<Result<Vec<_>, _>>()?;
    let shaped = ForecastSeries::from_columns(fc.leadtimes().to_vec(), &shaped_columns)?;

    match shape {
        ForecastShape::DiscreteLeadtimes { leadtimes } => {
            if leadtimes.is_empty() {
                return Err(ShapeError::NoLeadtimes);
            }
            let columns = leadtimes
                .iter()
                .map(|leadtime| interp_leadtime(&shaped, *leadtime))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(ShapedForecast::Leadtimes(ForecastSeries::from_columns(
                leadtimes.clone(),
                &columns,
            )?))
        }
        ForecastShape::DispatchLookahead {
            frequency,
            lookahead,
            leadtime,
            dispatch_time,
        } => dispatch_lookahead(
            &shaped, temporal, *frequency, *lookahead, *leadtime, *dispatch_time,
        )
        .map(ShapedForecast::Dispatch),
    }
}

/// How a requested leadtime maps onto the native columns.
enum LeadtimeBlend {
    Exact(usize),
    /// Linear blend: `v = (1 - weight) * v[lower] + weight * v[upper]`.
    Between {
        lower: usize,
        upper: usize,
        weight: f64,
    },
}

fn leadtime_blend(leadtimes: &[Duration], requested: Duration) -> Result<LeadtimeBlend, ShapeError> {
    if let Some(index) = leadtimes.iter().position(|lt| *lt == requested) {
        return Ok(LeadtimeBlend::Exact(index));
    }
    if leadtimes.len() < 2 {
        return Err(ShapeError::InsufficientLeadtimes {
            requested,
            available: leadtimes.len(),
        });
    }

    let below = leadtimes
        .iter()
        .enumerate()
        .filter(|(_, lt)| **lt < requested)
        .max_by_key(|(_, lt)| **lt)
        .map(|(index, _)| index);
    let above = leadtimes
        .iter()
        .enumerate()
        .filter(|(_, lt)| **lt > requested)
        .min_by_key(|(_, lt)| **lt)
        .map(|(index, _)| index);

    let (lower, upper) = match (below, above) {
        (Some(lower), Some(upper)) => (lower, upper),
        // Outside the native range: extrapolate from the two nearest.
        _ => {
            let mut order: Vec<usize> = (0..leadtimes.len()).collect();
            order.sort_by_key(|i| (leadtimes[*i] - requested).abs());
            let mut pair = [order[0], order[1]];
            pair.sort_by_key(|i| leadtimes[*i]);
            (pair[0], pair[1])
        }
    };

    let span = (leadtimes[upper] - leadtimes[lower]).num_seconds() as f64;
    let offset = (requested - leadtimes[lower]).num_seconds() as f64;
    Ok(LeadtimeBlend::Between {
        lower,
        upper,
        weight: offset / span,
    })
}

/// Builds the timeseries for one requested leadtime.
fn interp_leadtime(fc: &ForecastSeries, requested: Duration) -> Result<Timeseries, ShapeError> {
    let blend = leadtime_blend(fc.leadtimes(), requested)?;
    let points = fc
        .timestamps()
        .iter()
        .enumerate()
        .map(|(row, timestamp)| {
            let value = match &blend {
                LeadtimeBlend::Exact(index) => fc.value(row, *index),
                LeadtimeBlend::Between {
                    lower,
                    upper,
                    weight,
                } => {
                    let v1 = fc.value(row, *lower);
                    let v2 = fc.value(row, *upper);
                    v1 + (v2 - v1) * weight
                }
            };
            TimePoint {
                timestamp: *timestamp,
                value,
            }
        })
        .collect();
    Ok(Timeseries::new(leadtime_label(requested), points)?)
}

fn dispatch_lookahead(
    fc: &ForecastSeries,
    temporal: &TemporalShape,
    frequency: Duration,
    lookahead: Duration,
    leadtime: Duration,
    dispatch_time: NaiveTime,
) -> Result<DispatchForecast, ShapeError> {
    if frequency <= Duration::zero() {
        return Err(ShapeError::NonPositiveDuration { what: "frequency" });
    }
    if lookahead <= Duration::zero() {
        return Err(ShapeError::NonPositiveDuration { what: "lookahead" });
    }
    if leadtime < Duration::zero() {
        return Err(ShapeError::NonPositiveDuration { what: "leadtime" });
    }

    let step = fc
        .column(0)?
        .native_resolution()
        .map_err(ShapeError::Series)?;

    // First dispatch of the extent's first day, advanced into the extent.
    let mut dispatch = Utc.from_utc_datetime(
        &temporal
            .start
            .date_naive()
            .and_time(dispatch_time),
    );
    while dispatch < temporal.start {
        dispatch += frequency;
    }

    let mut rows = Vec::new();
    while dispatch <= temporal.end {
        let window_start = dispatch + leadtime;
        let mut forecast_time = window_start;
        while forecast_time < window_start + lookahead {
            // Dispatch windows reaching past the shaped extent are clipped.
            if let Ok(row) = fc.timestamps().binary_search(&forecast_time) {
                let blend = leadtime_blend(fc.leadtimes(), forecast_time - dispatch)?;
                let value = match blend {
                    LeadtimeBlend::Exact(index) => fc.value(row, index),
                    LeadtimeBlend::Between {
                        lower,
                        upper,
                        weight,
                    } => {
                        let v1 = fc.value(row, lower);
                        let v2 = fc.value(row, upper);
                        v1 + (v2 - v1) * weight
                    }
                };
                rows.push(DispatchRow {
                    dispatch_time: dispatch,
                    forecast_time,
                    value,
                });
            }
            forecast_time += step;
        }
        dispatch += frequency;
    }
    Ok(DispatchForecast { rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shaper::PointInterpretation;
    use chrono::TimeZone;

    fn stamp(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 1, day, hour, 0, 0).unwrap()
    }

    /// Hourly forecast over two days. Column values are
    /// `row + 10 * leadtime_hours` so blends are easy to predict.
    fn hourly_forecast() -> ForecastSeries {
        let leadtimes = vec![Duration::hours(1), Duration::hours(4), Duration::hours(6)];
        let timestamps: Vec<DateTime<Utc>> = (0..48).map(|h| stamp(1, 0) + Duration::hours(h)).collect();
        let values = (0..48)
            .map(|row| {
                leadtimes
                    .iter()
                    .map(|lt| row as f64 + 10.0 * lt.num_hours() as f64)
                    .collect()
            })
            .collect();
        ForecastSeries::new(leadtimes, timestamps, values).unwrap()
    }

    fn full_shape() -> TemporalShape {
        TemporalShape {
            start: stamp(1, 0),
            end: stamp(2, 23),
            resolution: None,
            interpretation: PointInterpretation::Instantaneous,
        }
    }

    #[test]
    fn exact_leadtime_copies_the_column() {
        let fc = hourly_forecast();
        let shaped = reshape_forecast(
            &fc,
            &full_shape(),
            &ForecastShape::DiscreteLeadtimes {
                leadtimes: vec![Duration::hours(4)],
            },
        )
        .unwrap();
        let ShapedForecast::Leadtimes(out) = shaped else {
            panic!("expected leadtime output");
        };
        assert_eq!(out.leadtimes(), &[Duration::hours(4)]);
        assert_eq!(out.value(0, 0), 40.0);
        assert_eq!(out.value(5, 0), 45.0);
    }

    #[test]
    fn between_leadtimes_interpolates_linearly() {
        let fc = hourly_forecast();
        // 2h30m sits halfway between the 1h and 4h columns.
        let shaped = reshape_forecast(
            &fc,
            &full_shape(),
            &ForecastShape::DiscreteLeadtimes {
                leadtimes: vec![Duration::minutes(150)],
            },
        )
        .unwrap();
        let ShapedForecast::Leadtimes(out) = shaped else {
            panic!("expected leadtime output");
        };
        // Row 0: blend of 10 and 40 at weight 0.5.
        assert!((out.value(0, 0) - 25.0).abs() < 1e-9);
    }

    #[test]
    fn leadtime_beyond_range_extrapolates_from_nearest_pair() {
        let fc = hourly_forecast();
        let shaped = reshape_forecast(
            &fc,
            &full_shape(),
            &ForecastShape::DiscreteLeadtimes {
                leadtimes: vec![Duration::hours(8)],
            },
        )
        .unwrap();
        let ShapedForecast::Leadtimes(out) = shaped else {
            panic!("expected leadtime output");
        };
        // Row 0: columns 4h=40 and 6h=60, extrapolated to 8h = 80.
        assert!((out.value(0, 0) - 80.0).abs() < 1e-9);
    }

    #[test]
    fn empty_leadtime_list_is_rejected() {
        let fc = hourly_forecast();
        let err = reshape_forecast(
            &fc,
            &full_shape(),
            &ForecastShape::DiscreteLeadtimes { leadtimes: vec![] },
        )
        .unwrap_err();
        assert!(matches!(err, ShapeError::NoLeadtimes));
    }

    #[test]
    fn dispatch_lookahead_builds_sorted_clipped_table() {
        let fc = hourly_forecast();
        let shaped = reshape_forecast(
            &fc,
            &full_shape(),
            &ForecastShape::DispatchLookahead {
                frequency: Duration::hours(24),
                lookahead: Duration::hours(4),
                leadtime: Duration::hours(6),
                dispatch_time: NaiveTime::from_hms_opt(6, 0, 0).unwrap(),
            },
        )
        .unwrap();
        let ShapedForecast::Dispatch(table) = shaped else {
            panic!("expected dispatch output");
        };

        // Two dispatches (day 1 and day 2 at 06:00), four hourly rows each.
        assert_eq!(table.rows.len(), 8);
        assert_eq!(table.rows[0].dispatch_time, stamp(1, 6));
        assert_eq!(table.rows[0].forecast_time, stamp(1, 12));
        // Leadtime is exactly the 6h column: row index 12 → 12 + 60.
        assert_eq!(table.rows[0].value, 72.0);

        for pair in table.rows.windows(2) {
            assert!(
                (pair[0].dispatch_time, pair[0].forecast_time)
                    < (pair[1].dispatch_time, pair[1].forecast_time)
            );
        }
    }
}
