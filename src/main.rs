use anyhow::Result;
use clap::Parser;
use r2pd::cli::{Cli, Command, CommonArgs, ForecastArgs, PowerArgs, WeatherArgs};
use r2pd::{output, NodeForecast, NodeSeries, R2pd, ResourceKind, Settings, ShapedForecast};
use std::path::Path;
use tracing::info;

#[tokio::main]
async fn main() {
    r2pd::logging::init();
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Weather(args) => weather(args).await,
        Command::ActualPower(args) => actual_power(args).await,
        Command::ForecastPower(args) => forecast_power(args).await,
    }
}

/// Loads settings, connects the client and logs the cache state, the way
/// every subcommand starts.
async fn connect(common: &CommonArgs) -> Result<R2pd> {
    let settings = Settings::load_or_default(common.config.as_deref()).await?;
    let client = R2pd::connect(settings).await?;
    let in_use = client.cache_size_bytes().await as f64 / 1e9;
    match client.cache_budget_bytes() {
        Some(budget) => info!(
            "local cache initialized: {in_use:.2} GB of {:.2} GB in use",
            budget as f64 / 1e9
        ),
        None => info!("local cache initialized: {in_use:.2} GB in use, no size budget"),
    }
    Ok(client)
}

fn write_series(out_dir: &Path, kind: ResourceKind, results: &[NodeSeries]) -> Result<()> {
    for result in results {
        output::write_node_series(out_dir, kind, result.node_id, &result.series)?;
    }
    Ok(())
}

async fn weather(args: WeatherArgs) -> Result<()> {
    let client = connect(&args.common).await?;
    let nodes = args.common.node_list()?;
    let results = client
        .weather()
        .nodes(&nodes)
        .dataset(args.common.dataset.into())
        .shape(args.common.temporal_shape())
        .call()
        .await?;
    write_series(&args.common.out_dir, ResourceKind::Weather, &results)
}

async fn actual_power(args: PowerArgs) -> Result<()> {
    let client = connect(&args.common).await?;
    let nodes = args.common.node_list()?;
    let generators = args.generator_list(&nodes)?;
    let results = client
        .actual_power()
        .generators(&generators)
        .dataset(args.common.dataset.into())
        .shape(args.common.temporal_shape())
        .call()
        .await?;
    write_series(&args.common.out_dir, ResourceKind::ActualPower, &results)
}

async fn forecast_power(args: ForecastArgs) -> Result<()> {
    let common = &args.power.common;
    let client = connect(common).await?;
    let nodes = common.node_list()?;
    let generators = args.power.generator_list(&nodes)?;
    let results = client
        .forecast_power()
        .generators(&generators)
        .dataset(common.dataset.into())
        .shape(common.temporal_shape())
        .forecast(args.forecast_shape()?)
        .call()
        .await?;
    for NodeForecast { node_id, forecast } in &results {
        match forecast {
            ShapedForecast::Leadtimes(series) => {
                output::write_forecast(&common.out_dir, *node_id, series)?;
            }
            ShapedForecast::Dispatch(table) => {
                output::write_dispatch(&common.out_dir, *node_id, table)?;
            }
        }
    }
    Ok(())
}
