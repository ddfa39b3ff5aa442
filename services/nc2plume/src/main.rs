//! nc2plume: contour plume extraction.
//!
//! Reads a gridded field (NetCDF, OPeNDAP or JSON grid document), averages
//! it over a daily window, traces the requested levels into polygons and
//! writes them as a GeoJSON feature collection with a diagnostic map.

mod args;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use plume_pipeline::Pipeline;

use args::Args;

fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true);
    if args.log_json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }

    let config = args.to_config().context("Failed to load configuration")?;
    info!(
        input = %config.input,
        variables = ?config.variables,
        levels = ?config.levels,
        reducer = ?config.reducer,
        policy = %config.geometry_policy,
        "Starting contour plume extraction"
    );

    let pipeline = Pipeline::with_tracing(config).context("Invalid configuration")?;
    let today = Utc::now().date_naive();

    match pipeline.run(today) {
        Ok(report) => {
            info!(
                output = %report.collection.path.display(),
                summary = %report.collection,
                rejected = report.rejected,
                figures = report.figures.len(),
                figure_failures = report.figure_failures,
                "Extraction complete"
            );
            Ok(())
        }
        Err(e) => {
            error!(stage = e.stage(), error = %e, "Extraction failed");
            Err(e).context("Contour plume extraction failed")
        }
    }
}
