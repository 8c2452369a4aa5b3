// THEORY:
// `severity-sorter` is the operator's front end to the `leaf_severity`
// library. It resolves settings (TOML file first, then command-line flags),
// installs logging, and runs one of the two data-preparation steps:
//
//   sort     raw/<class>/*.{png,jpg,jpeg}  ->  processed/<label>/
//   weather  processed/<label>/*           ->  weather_data.csv
//
// All real work lives in the library; this binary only wires it to the local
// file system and reports the outcome.

mod cli;
mod logging;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Command, SortArgs, WeatherArgs};
use leaf_severity::config::Settings;
use leaf_severity::corpus::{CorpusSorter, FsStorage, SortReport};
use leaf_severity::weather::generate_weather_data;
use std::path::Path;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_tracing(cli.log_format);

    let settings = match &cli.config {
        Some(path) => Settings::load(path).with_context(|| format!("loading settings from {}", path.display()))?,
        None => Settings::default(),
    };

    match cli.command {
        Command::Sort(args) => run_sort(settings, &args).await,
        Command::Weather(args) => run_weather(settings, &args),
    }
}

async fn run_sort(mut settings: Settings, args: &SortArgs) -> anyhow::Result<()> {
    args.apply(&mut settings);
    let validated = settings.validate().context("invalid sort settings")?;

    let sorter = CorpusSorter::new(Arc::new(FsStorage), validated.pipeline, validated.layout)
        .with_decode_failure_policy(validated.decode_failure)
        .with_workers(validated.workers);
    let report = sorter.run().await.context("image sorting failed")?;

    tracing::info!("final image counts:");
    for (label, count) in &report.final_counts {
        tracing::info!("- {label}: {count} images");
    }

    if let Some(path) = &args.report {
        write_report(&report, path).with_context(|| format!("writing report to {}", path.display()))?;
        tracing::info!(path = %path.display(), "sorting report written");
    }
    Ok(())
}

fn write_report(report: &SortReport, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(path)?;
    serde_json::to_writer_pretty(std::io::BufWriter::new(file), report)?;
    Ok(())
}

fn run_weather(mut settings: Settings, args: &WeatherArgs) -> anyhow::Result<()> {
    args.apply(&mut settings);
    let validated = settings.validate().context("invalid weather settings")?;

    let rows = generate_weather_data(
        &FsStorage,
        &validated.layout.processed_dir,
        &validated.weather.output_csv,
        &validated.weather.generator(),
    )
    .context("weather data generation failed")?;

    tracing::info!(rows, "weather data ready");
    Ok(())
}
