//! Energy Insights - batch analytics over a timestamped energy-usage CSV.
//!
//! Reads a CSV with `Date` and `Energy_Usage_kWh` columns, runs the
//! anomaly / forecast / recommendation pipeline, logs the summary metrics,
//! and writes the annotated table as CSV.
//!
//! # Usage
//! ```sh
//! energy-insights --input usage.csv --output energy_insights.csv --contamination 0.05
//! ```
//!
//! # Environment Variables
//! - `CONTAMINATION_RATE` - Expected fraction of anomalous points (default: 0.05)
//! - `TEST_FRACTION` - Held-out fraction for forecast evaluation (default: 0.2)
//! - `RECOMMENDATION_THRESHOLD_KWH` - Turn-off threshold in kWh (default: 100)
//! - `ROLLING_WINDOW` - Trailing rolling-mean window (default: 3)
//! - `RANDOM_SEED` - Seed for both models (default: 42)

use anyhow::{Context, Result};
use clap::Parser;
use energy_insights::application::pipeline::AnalyticsPipeline;
use energy_insights::config::PipelineConfig;
use energy_insights::infrastructure::csv_io::{read_readings, write_annotated};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;
use tracing::{Level, info};
use tracing_subscriber::prelude::*;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to input CSV with Date and Energy_Usage_kWh columns
    #[arg(long)]
    input: PathBuf,

    /// Path for the annotated output CSV (stdout when omitted)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Expected fraction of anomalous points, in (0, 0.5)
    #[arg(long)]
    contamination: Option<f64>,

    /// Held-out fraction for forecast evaluation, in (0, 1)
    #[arg(long)]
    test_fraction: Option<f64>,

    /// Usage above this many kWh triggers the turn-off recommendation
    #[arg(long)]
    threshold: Option<f64>,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stdout_layer)
        .init();

    let args = Args::parse();

    let mut config = PipelineConfig::from_env()?;
    if let Some(contamination) = args.contamination {
        config.contamination = contamination;
    }
    if let Some(test_fraction) = args.test_fraction {
        config.test_fraction = test_fraction;
    }
    if let Some(threshold) = args.threshold {
        config.recommendation_threshold = threshold;
    }

    info!("Energy Insights {} starting", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration: contamination={}, test_fraction={}, threshold={} kWh",
        config.contamination, config.test_fraction, config.recommendation_threshold
    );

    let file = File::open(&args.input)
        .with_context(|| format!("failed to open input CSV {:?}", args.input))?;
    let readings = read_readings(BufReader::new(file))?;
    info!("Dataset contains {} rows", readings.len());

    let output = AnalyticsPipeline::new(config).run(&readings)?;

    info!(
        "Mean Absolute Error: {:.2} kWh",
        output.metrics.mean_absolute_error
    );
    info!("R² Score: {:.2}", output.metrics.r_squared);
    info!("Total Anomalies Detected: {}", output.metrics.anomaly_count);

    match &args.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create output CSV {path:?}"))?;
            write_annotated(BufWriter::new(file), &output.rows)?;
            info!("Annotated CSV written to {path:?}");
        }
        None => {
            write_annotated(std::io::stdout().lock(), &output.rows)?;
        }
    }

    Ok(())
}
