//! Writes shaped data to per-node CSV files in a caller-chosen directory.

use crate::shaper::forecast::DispatchForecast;
use crate::types::resource::ResourceKind;
use crate::types::timeseries::{leadtime_label, ForecastSeries, Timeseries};
use polars::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("output series for node {node_id} have mismatched timestamps")]
    MisalignedSeries { node_id: i64 },

    #[error("nothing to write for node {node_id}")]
    EmptyOutput { node_id: i64 },

    #[error("failed to create output directory '{0}'")]
    DirCreation(PathBuf, #[source] std::io::Error),

    #[error("failed to write output file '{0}'")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("failed to encode output file '{0}'")]
    Encode(PathBuf, #[source] PolarsError),
}

fn output_path(out_dir: &Path, kind: ResourceKind, node_id: i64) -> PathBuf {
    out_dir.join(format!("{kind}_{node_id}.csv"))
}

fn write_csv(path: &Path, mut df: DataFrame) -> Result<(), OutputError> {
    let mut file =
        std::fs::File::create(path).map_err(|e| OutputError::Io(path.to_path_buf(), e))?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut df)
        .map_err(|e| OutputError::Encode(path.to_path_buf(), e))?;
    Ok(())
}

fn ensure_dir(out_dir: &Path) -> Result<(), OutputError> {
    std::fs::create_dir_all(out_dir).map_err(|e| OutputError::DirCreation(out_dir.to_path_buf(), e))
}

/// Writes one node's timeseries columns as `<kind>_<node_id>.csv` with a
/// leading RFC 3339 `timestamp` column.
pub fn write_node_series(
    out_dir: &Path,
    kind: ResourceKind,
    node_id: i64,
    series: &[Timeseries],
) -> Result<PathBuf, OutputError> {
    let first = series.first().ok_or(OutputError::EmptyOutput { node_id })?;
    for other in &series[1..] {
        if other.len() != first.len()
            || other
                .points()
                .iter()
                .zip(first.points())
                .any(|(a, b)| a.timestamp != b.timestamp)
        {
            return Err(OutputError::MisalignedSeries { node_id });
        }
    }

    ensure_dir(out_dir)?;
    let path = output_path(out_dir, kind, node_id);

    let timestamps: Vec<String> = first
        .points()
        .iter()
        .map(|p| p.timestamp.to_rfc3339())
        .collect();
    let mut columns: Vec<Column> = vec![Series::new("timestamp".into(), timestamps).into_column()];
    for ts in series {
        let values: Vec<f64> = ts.points().iter().map(|p| p.value).collect();
        columns.push(Series::new(ts.name().into(), values).into_column());
    }
    let df = DataFrame::new(columns).map_err(|e| OutputError::Encode(path.clone(), e))?;
    write_csv(&path, df)?;
    info!("wrote {} rows to {}", first.len(), path.display());
    Ok(path)
}

/// Writes discrete-leadtime forecast output as `fcst_<node_id>.csv` with one
/// column per leadtime.
pub fn write_forecast(
    out_dir: &Path,
    node_id: i64,
    forecast: &ForecastSeries,
) -> Result<PathBuf, OutputError> {
    ensure_dir(out_dir)?;
    let path = output_path(out_dir, ResourceKind::ForecastPower, node_id);

    let timestamps: Vec<String> = forecast
        .timestamps()
        .iter()
        .map(|t| t.to_rfc3339())
        .collect();
    let mut columns: Vec<Column> = vec![Series::new("timestamp".into(), timestamps).into_column()];
    for (index, leadtime) in forecast.leadtimes().iter().enumerate() {
        let values: Vec<f64> = (0..forecast.len())
            .map(|row| forecast.value(row, index))
            .collect();
        columns.push(Series::new(leadtime_label(*leadtime).into(), values).into_column());
    }
    let df = DataFrame::new(columns).map_err(|e| OutputError::Encode(path.clone(), e))?;
    write_csv(&path, df)?;
    info!("wrote {} rows to {}", forecast.len(), path.display());
    Ok(path)
}

/// Writes dispatch-lookahead forecast output as `fcst_<node_id>.csv` with
/// `dispatch_time,forecast_time,value` rows.
pub fn write_dispatch(
    out_dir: &Path,
    node_id: i64,
    table: &DispatchForecast,
) -> Result<PathBuf, OutputError> {
    ensure_dir(out_dir)?;
    let path = output_path(out_dir, ResourceKind::ForecastPower, node_id);

    let dispatch: Vec<String> = table
        .rows
        .iter()
        .map(|r| r.dispatch_time.to_rfc3339())
        .collect();
    let forecast: Vec<String> = table
        .rows
        .iter()
        .map(|r| r.forecast_time.to_rfc3339())
        .collect();
    let values: Vec<f64> = table.rows.iter().map(|r| r.value).collect();

    let columns: Vec<Column> = vec![
        Series::new("dispatch_time".into(), dispatch).into_column(),
        Series::new("forecast_time".into(), forecast).into_column(),
        Series::new("value".into(), values).into_column(),
    ];
    let df = DataFrame::new(columns).map_err(|e| OutputError::Encode(path.clone(), e))?;
    write_csv(&path, df)?;
    info!("wrote {} rows to {}", table.rows.len(), path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shaper::forecast::DispatchRow;
    use crate::types::timeseries::TimePoint;
    use chrono::{Duration, TimeZone, Utc};
    use tempfile::TempDir;

    fn stamp(hour: u32) -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 1, 1, hour, 0, 0).unwrap()
    }

    fn series(name: &str, values: &[f64]) -> Timeseries {
        let points = values
            .iter()
            .enumerate()
            .map(|(i, v)| TimePoint {
                timestamp: stamp(i as u32),
                value: *v,
            })
            .collect();
        Timeseries::new(name, points).unwrap()
    }

    #[test]
    fn writes_weather_columns_side_by_side() {
        let dir = TempDir::new().unwrap();
        let path = write_node_series(
            dir.path(),
            ResourceKind::Weather,
            3,
            &[
                series("wind_speed", &[4.0, 5.0]),
                series("temperature", &[271.0, 272.5]),
            ],
        )
        .unwrap();

        assert_eq!(path, dir.path().join("met_3.csv"));
        let body = std::fs::read_to_string(&path).unwrap();
        let mut lines = body.lines();
        assert_eq!(lines.next().unwrap(), "timestamp,wind_speed,temperature");
        assert!(lines.next().unwrap().contains("2020-01-01T00:00:00"));
        assert!(body.contains("272.5"));
    }

    #[test]
    fn mismatched_columns_are_rejected() {
        let dir = TempDir::new().unwrap();
        let err = write_node_series(
            dir.path(),
            ResourceKind::Weather,
            1,
            &[series("a", &[1.0, 2.0]), series("b", &[1.0])],
        )
        .unwrap_err();
        assert!(matches!(err, OutputError::MisalignedSeries { node_id: 1 }));
    }

    #[test]
    fn writes_forecast_leadtime_columns() {
        let dir = TempDir::new().unwrap();
        let forecast = ForecastSeries::new(
            vec![Duration::hours(1), Duration::hours(4)],
            vec![stamp(0), stamp(1)],
            vec![vec![1.0, 2.0], vec![3.0, 4.0]],
        )
        .unwrap();

        let path = write_forecast(dir.path(), 9, &forecast).unwrap();
        assert_eq!(path, dir.path().join("fcst_9.csv"));
        let body = std::fs::read_to_string(&path).unwrap();
        assert!(body.starts_with("timestamp,fcst_1h,fcst_4h"));
    }

    #[test]
    fn writes_dispatch_table() {
        let dir = TempDir::new().unwrap();
        let table = DispatchForecast {
            rows: vec![DispatchRow {
                dispatch_time: stamp(6),
                forecast_time: stamp(12),
                value: 12.5,
            }],
        };
        let path = write_dispatch(dir.path(), 2, &table).unwrap();
        let body = std::fs::read_to_string(&path).unwrap();
        assert!(body.starts_with("dispatch_time,forecast_time,value"));
        assert!(body.contains("12.5"));
    }
}
