//! Command-line interface definitions and argument conversions.

use crate::shaper::forecast::ForecastShape;
use crate::shaper::{PointInterpretation, TemporalShape};
use crate::types::node::{GeneratorNode, Node, NodeListError};
use crate::types::resource::Dataset;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("must supply either '--node LAT LON' or '--nodes <csv>'")]
    MissingNodes,

    #[error("must supply either '--capacity <MW>' or '--generators <csv>'")]
    MissingCapacity,

    #[error("'--forecast-type discrete-leadtimes' requires '--leadtimes'")]
    MissingLeadtimes,

    #[error("'--forecast-type dispatch-lookahead' requires '--{0}'")]
    MissingDispatchOption(&'static str),

    #[error(transparent)]
    NodeList(#[from] NodeListError),
}

/// Get wind or solar weather or power data for power system modeling.
#[derive(Parser, Debug)]
#[command(name = "r2pd", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Get source weather data for the nearest site to each node.
    Weather(WeatherArgs),
    /// Get actual power aggregated to the requested capacity at each node.
    ActualPower(PowerArgs),
    /// Get forecast power aggregated to the requested capacity at each node.
    ForecastPower(ForecastArgs),
}

#[derive(Args, Debug)]
pub struct CommonArgs {
    /// Path to a TOML settings file.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Dataset to query.
    #[arg(short = 't', long, value_enum)]
    pub dataset: DatasetArg,

    /// CSV file describing nodes: node_id,latitude,longitude.
    #[arg(long)]
    pub nodes: Option<PathBuf>,

    /// Single node given as latitude and longitude; its node_id is 0.
    #[arg(long, num_args = 2, value_names = ["LAT", "LON"], conflicts_with = "nodes",
          allow_negative_numbers = true)]
    pub node: Option<Vec<f64>>,

    /// Start and end of the output extent (RFC 3339 or YYYY-MM-DD), both
    /// inclusive.
    #[arg(long, num_args = 2, value_names = ["START", "END"], required = true,
          value_parser = parse_datetime_arg)]
    pub extent: Vec<DateTime<Utc>>,

    /// Output resolution such as 300s, 5m or 1h. Keeps the data's native
    /// resolution when omitted.
    #[arg(long, value_parser = parse_duration_arg)]
    pub resolution: Option<Duration>,

    /// Interpretation assumed for output timeseries values.
    #[arg(long, value_enum, default_value = "instantaneous")]
    pub point_interpretation: InterpArg,

    /// Directory output files are written to.
    #[arg(short = 'o', long)]
    pub out_dir: PathBuf,
}

#[derive(Args, Debug)]
pub struct WeatherArgs {
    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Args, Debug)]
pub struct PowerArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Capacity of the generator on each node in MW.
    #[arg(short = 'c', long)]
    pub capacity: Option<f64>,

    /// CSV file describing generators: node_id,capacity_mw.
    #[arg(short = 'g', long, conflicts_with = "capacity")]
    pub generators: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ForecastArgs {
    #[command(flatten)]
    pub power: PowerArgs,

    /// Shape of the forecast output.
    #[arg(long, value_enum, default_value = "discrete-leadtimes")]
    pub forecast_type: ForecastTypeArg,

    /// Comma-separated leadtimes for discrete-leadtimes output, e.g. 1h,4h.
    #[arg(long, value_delimiter = ',', value_parser = parse_duration_arg)]
    pub leadtimes: Option<Vec<Duration>>,

    /// How often dispatch-lookahead forecasts are issued, e.g. 24h.
    #[arg(long, value_parser = parse_duration_arg)]
    pub frequency: Option<Duration>,

    /// How much modeled time each dispatch-lookahead forecast covers.
    #[arg(long, value_parser = parse_duration_arg)]
    pub lookahead: Option<Duration>,

    /// How far ahead of the modeled time each forecast is issued.
    #[arg(long, value_parser = parse_duration_arg)]
    pub leadtime: Option<Duration>,

    /// Time of day the forecast model runs, as HH:MM.
    #[arg(long, value_parser = parse_time_arg)]
    pub dispatch_time: Option<NaiveTime>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DatasetArg {
    Wind,
    Solar,
}

impl From<DatasetArg> for Dataset {
    fn from(arg: DatasetArg) -> Self {
        match arg {
            DatasetArg::Wind => Dataset::Wind,
            DatasetArg::Solar => Dataset::Solar,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InterpArg {
    Instantaneous,
    AveragePrev,
    AverageNext,
    AverageMidpoint,
    IntegratedPrev,
    IntegratedNext,
    IntegratedMidpoint,
}

impl From<InterpArg> for PointInterpretation {
    fn from(arg: InterpArg) -> Self {
        match arg {
            InterpArg::Instantaneous => PointInterpretation::Instantaneous,
            InterpArg::AveragePrev => PointInterpretation::AveragePrev,
            InterpArg::AverageNext => PointInterpretation::AverageNext,
            InterpArg::AverageMidpoint => PointInterpretation::AverageMidpoint,
            InterpArg::IntegratedPrev => PointInterpretation::IntegratedPrev,
            InterpArg::IntegratedNext => PointInterpretation::IntegratedNext,
            InterpArg::IntegratedMidpoint => PointInterpretation::IntegratedMidpoint,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ForecastTypeArg {
    DiscreteLeadtimes,
    DispatchLookahead,
}

impl CommonArgs {
    /// The node list from `--node` or `--nodes`.
    pub fn node_list(&self) -> Result<Vec<Node>, CliError> {
        if let Some(pair) = &self.node {
            return Ok(vec![Node {
                id: 0,
                latitude: pair[0],
                longitude: pair[1],
            }]);
        }
        if let Some(path) = &self.nodes {
            return Ok(Node::list_from_csv(path)?);
        }
        Err(CliError::MissingNodes)
    }

    /// The requested temporal shape.
    pub fn temporal_shape(&self) -> TemporalShape {
        let mut shape = TemporalShape::new(self.extent[0], self.extent[1])
            .with_interpretation(self.point_interpretation.into());
        if let Some(resolution) = self.resolution {
            shape = shape.with_resolution(resolution);
        }
        shape
    }
}

impl PowerArgs {
    /// Attaches generator capacities to the node list.
    pub fn generator_list(&self, nodes: &[Node]) -> Result<Vec<GeneratorNode>, CliError> {
        if let Some(capacity_mw) = self.capacity {
            return Ok(GeneratorNode::with_uniform_capacity(nodes, capacity_mw)?);
        }
        if let Some(path) = &self.generators {
            return Ok(GeneratorNode::from_capacity_csv(nodes, path)?);
        }
        Err(CliError::MissingCapacity)
    }
}

impl ForecastArgs {
    /// The requested forecast shape.
    pub fn forecast_shape(&self) -> Result<ForecastShape, CliError> {
        match self.forecast_type {
            ForecastTypeArg::DiscreteLeadtimes => {
                let leadtimes = self
                    .leadtimes
                    .clone()
                    .filter(|l| !l.is_empty())
                    .ok_or(CliError::MissingLeadtimes)?;
                Ok(ForecastShape::DiscreteLeadtimes { leadtimes })
            }
            ForecastTypeArg::DispatchLookahead => Ok(ForecastShape::DispatchLookahead {
                frequency: self
                    .frequency
                    .ok_or(CliError::MissingDispatchOption("frequency"))?,
                lookahead: self
                    .lookahead
                    .ok_or(CliError::MissingDispatchOption("lookahead"))?,
                leadtime: self
                    .leadtime
                    .ok_or(CliError::MissingDispatchOption("leadtime"))?,
                dispatch_time: self
                    .dispatch_time
                    .ok_or(CliError::MissingDispatchOption("dispatch-time"))?,
            }),
        }
    }
}

/// Parses durations like `300s`, `5m`, `1h` or `2d`; a bare number is
/// seconds.
pub fn parse_duration_arg(raw: &str) -> Result<Duration, String> {
    let raw = raw.trim();
    let (number, unit) = match raw.find(|c: char| !c.is_ascii_digit()) {
        Some(split) => raw.split_at(split),
        None => (raw, "s"),
    };
    let value: i64 = number
        .parse()
        .map_err(|_| format!("'{raw}' is not a valid duration"))?;
    if value <= 0 {
        return Err(format!("duration '{raw}' must be positive"));
    }
    match unit {
        "s" => Ok(Duration::seconds(value)),
        "m" => Ok(Duration::minutes(value)),
        "h" => Ok(Duration::hours(value)),
        "d" => Ok(Duration::days(value)),
        other => Err(format!("unknown duration unit '{other}' in '{raw}'")),
    }
}

/// Parses an extent bound: RFC 3339, `YYYY-MM-DDTHH:MM:SS`,
/// `YYYY-MM-DD HH:MM` or a bare `YYYY-MM-DD` (midnight). Naive inputs are
/// taken as UTC.
pub fn parse_datetime_arg(raw: &str) -> Result<DateTime<Utc>, String> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).expect("midnight exists")));
    }
    Err(format!("'{raw}' is not a valid datetime"))
}

/// Parses a time of day as `HH:MM` or `HH:MM:SS`.
pub fn parse_time_arg(raw: &str) -> Result<NaiveTime, String> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .map_err(|_| format!("'{raw}' is not a valid time of day"))
}
