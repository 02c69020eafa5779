//! Reshapes a raw timeseries to a requested temporal shape.
//!
//! The output grid runs from the requested start to the requested end at
//! the requested resolution, both endpoints inclusive. Down-sampling is
//! block aggregation (mean for averages, sum for integrated values) or
//! plain grid subsampling for instantaneous data. There is no up-sampling:
//! a resolution finer than the source data is rejected.

use crate::shaper::error::ShapeError;
use crate::shaper::{PointInterpretation, TemporalShape};
use crate::types::timeseries::{TimePoint, Timeseries};
use chrono::{DateTime, Duration, Utc};

/// Reshapes `ts` to `shape`.
///
/// At the native resolution this returns the extent slice unchanged,
/// whatever the point interpretation, so reshaping is idempotent.
pub fn reshape(ts: &Timeseries, shape: &TemporalShape) -> Result<Timeseries, ShapeError> {
    if shape.start > shape.end {
        return Err(ShapeError::InvalidExtent {
            start: shape.start,
            end: shape.end,
        });
    }

    let native = ts.native_resolution()?;
    let out_res = shape.resolution.unwrap_or(native);
    if out_res < native {
        return Err(ShapeError::InvalidResolution {
            requested: out_res,
            native,
        });
    }
    if ts.start() > shape.start || ts.end() < shape.end {
        return Err(ShapeError::ExtentOutOfBounds {
            requested_start: shape.start,
            requested_end: shape.end,
            source_start: ts.start(),
            source_end: ts.end(),
        });
    }

    if out_res == native {
        let points: Vec<TimePoint> = ts
            .points()
            .iter()
            .filter(|p| p.timestamp >= shape.start && p.timestamp <= shape.end)
            .copied()
            .collect();
        return Ok(Timeseries::new(ts.name(), points)?);
    }

    if out_res.num_seconds() % native.num_seconds() != 0 {
        return Err(ShapeError::MisalignedResolution {
            requested: out_res,
            native,
        });
    }

    let points = match shape.interpretation {
        PointInterpretation::Instantaneous => subsample(ts, shape, out_res),
        _ => aggregate(ts, shape, out_res)?,
    };
    Ok(Timeseries::new(ts.name(), points)?)
}

/// Picks the source points that land exactly on the output grid.
fn subsample(ts: &Timeseries, shape: &TemporalShape, out_res: Duration) -> Vec<TimePoint> {
    let step = out_res.num_seconds();
    ts.points()
        .iter()
        .filter(|p| {
            p.timestamp >= shape.start
                && p.timestamp <= shape.end
                && (p.timestamp - shape.start).num_seconds() % step == 0
        })
        .copied()
        .collect()
}

/// Aggregates source points into one output point per grid timestamp.
fn aggregate(
    ts: &Timeseries,
    shape: &TemporalShape,
    out_res: Duration,
) -> Result<Vec<TimePoint>, ShapeError> {
    let mut points = Vec::new();
    let mut stamp = shape.start;
    while stamp <= shape.end {
        let mut sum = 0.0;
        let mut count = 0usize;
        for point in ts.points() {
            if in_window(point.timestamp, stamp, out_res, shape.interpretation) {
                sum += point.value;
                count += 1;
            }
        }
        if count == 0 {
            return Err(ShapeError::EmptyResampleWindow { at: stamp });
        }
        let value = if shape.interpretation.is_average() {
            sum / count as f64
        } else {
            sum
        };
        points.push(TimePoint {
            timestamp: stamp,
            value,
        });
        stamp += out_res;
    }
    Ok(points)
}

/// Whether a source timestamp feeds the output point at `stamp`.
///
/// Windows are closed on the side touching the output stamp and open on the
/// far side, so an output grid spanning the whole source extent never
/// reaches past the data: `prev` uses `(stamp - res, stamp]`, `next` uses
/// `[stamp, stamp + res)` and `midpoint` uses `[stamp - res/2, stamp + res/2)`.
fn in_window(
    t: DateTime<Utc>,
    stamp: DateTime<Utc>,
    out_res: Duration,
    interpretation: PointInterpretation,
) -> bool {
    match interpretation {
        PointInterpretation::AveragePrev | PointInterpretation::IntegratedPrev => {
            t > stamp - out_res && t <= stamp
        }
        PointInterpretation::AverageNext | PointInterpretation::IntegratedNext => {
            t >= stamp && t < stamp + out_res
        }
        PointInterpretation::AverageMidpoint | PointInterpretation::IntegratedMidpoint => {
            t >= stamp - out_res / 2 && t < stamp + out_res / 2
        }
        // Instantaneous data never reaches the aggregation path.
        PointInterpretation::Instantaneous => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn stamp(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 1, day, hour, minute, 0).unwrap()
    }

    /// 5-minute series over two days, value == minutes since start / 5.
    fn five_minute_series() -> Timeseries {
        let start = stamp(1, 0, 0);
        let points = (0..=(2 * 24 * 12))
            .map(|i| TimePoint {
                timestamp: start + Duration::minutes(5 * i),
                value: i as f64,
            })
            .collect();
        Timeseries::new("power", points).unwrap()
    }

    #[test]
    fn native_resolution_is_identity_over_extent() {
        let ts = five_minute_series();
        let shape = TemporalShape::new(stamp(1, 1, 0), stamp(1, 2, 0));
        let reshaped = reshape(&ts, &shape).unwrap();
        assert_eq!(reshaped.len(), 13);
        assert_eq!(reshaped.points()[0].value, 12.0);
        assert_eq!(
            reshaped.points(),
            &ts.points()[12..=24],
            "native-resolution reshape must return the extent slice unchanged"
        );
    }

    #[test]
    fn hourly_instantaneous_subsample_gives_25_points_per_day() {
        let ts = five_minute_series();
        let shape =
            TemporalShape::new(stamp(1, 0, 0), stamp(2, 0, 0)).with_resolution(Duration::hours(1));
        let reshaped = reshape(&ts, &shape).unwrap();
        assert_eq!(reshaped.len(), 25);
        for pair in reshaped.points().windows(2) {
            assert_eq!(pair[1].timestamp - pair[0].timestamp, Duration::hours(1));
        }
        // Every 12th source point lands on the hour.
        assert_eq!(reshaped.points()[1].value, 12.0);
        assert_eq!(reshaped.points()[24].value, 288.0);
    }

    #[test]
    fn average_prev_takes_the_mean_of_the_preceding_block() {
        let ts = five_minute_series();
        let shape = TemporalShape::new(stamp(1, 1, 0), stamp(1, 2, 0))
            .with_resolution(Duration::hours(1))
            .with_interpretation(PointInterpretation::AveragePrev);
        let reshaped = reshape(&ts, &shape).unwrap();
        assert_eq!(reshaped.len(), 2);
        // Window (00:00, 01:00] holds source values 1..=12.
        assert_eq!(reshaped.points()[0].value, 6.5);
        assert_eq!(reshaped.points()[1].value, 18.5);
    }

    #[test]
    fn integrated_next_sums_the_following_block() {
        let ts = five_minute_series();
        let shape = TemporalShape::new(stamp(1, 0, 0), stamp(1, 1, 0))
            .with_resolution(Duration::hours(1))
            .with_interpretation(PointInterpretation::IntegratedNext);
        let reshaped = reshape(&ts, &shape).unwrap();
        // Window [00:00, 01:00) holds values 0..=11, window [01:00, 02:00)
        // holds 12..=23.
        assert_eq!(reshaped.points()[0].value, 66.0);
        assert_eq!(reshaped.points()[1].value, 210.0);
    }

    #[test]
    fn finer_than_native_is_rejected() {
        let ts = five_minute_series();
        let shape = TemporalShape::new(stamp(1, 0, 0), stamp(1, 6, 0))
            .with_resolution(Duration::minutes(1));
        let err = reshape(&ts, &shape).unwrap_err();
        assert!(matches!(err, ShapeError::InvalidResolution { .. }));
    }

    #[test]
    fn non_multiple_resolution_is_rejected() {
        let ts = five_minute_series();
        let shape = TemporalShape::new(stamp(1, 0, 0), stamp(1, 6, 0))
            .with_resolution(Duration::minutes(7));
        let err = reshape(&ts, &shape).unwrap_err();
        assert!(matches!(err, ShapeError::MisalignedResolution { .. }));
    }

    #[test]
    fn uncovered_extent_is_rejected() {
        let ts = five_minute_series();
        let shape = TemporalShape::new(stamp(1, 0, 0), stamp(3, 12, 0));
        let err = reshape(&ts, &shape).unwrap_err();
        assert!(matches!(err, ShapeError::ExtentOutOfBounds { .. }));
    }

    #[test]
    fn reversed_extent_is_rejected() {
        let ts = five_minute_series();
        let shape = TemporalShape::new(stamp(2, 0, 0), stamp(1, 0, 0));
        let err = reshape(&ts, &shape).unwrap_err();
        assert!(matches!(err, ShapeError::InvalidExtent { .. }));
    }
}
