//! pricecast - headless price sampler and up-move predictor
//!
//! Polls a quote source at a fixed interval, appends admitted samples to a
//! CSV history, and prints the probability that the next sample is higher.
//! Metrics are pushed via structured JSON lines to stdout.
//!
//! # Usage
//! ```sh
//! QUOTE_SOURCE=p2p POLL_INTERVAL_SECS=60 cargo run -- --history-file hist.csv
//! cargo run -- --once
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use pricecast::application::system::Application;
use pricecast::config::Config;
use std::path::PathBuf;
use tracing::{Level, info};
use tracing_subscriber::prelude::*;

#[derive(Parser, Debug)]
#[command(author, version, about = "Samples a price series and predicts the next move")]
struct Args {
    /// Run a single cycle, print the report as JSON and exit
    #[arg(long)]
    once: bool,

    /// CSV history file (overrides HISTORY_FILE)
    #[arg(long)]
    history_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false).pretty();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stdout_layer)
        .init();

    let args = Args::parse();

    info!("pricecast {} starting...", env!("CARGO_PKG_VERSION"));

    let mut config = Config::from_env()?;
    if let Some(path) = args.history_file {
        config.history_file = path;
    }
    info!(
        "Configuration loaded: Source={:?}, Interval={:?}, Spacing={:?}, Windows={:?}, History={:?}",
        config.quote_source,
        config.poll_interval,
        config.min_sample_spacing,
        config.windows,
        config.history_file
    );

    let mut app = Application::build(config)?;

    if args.once {
        if let Some(report) = app.tick().await {
            let json =
                serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
            println!("{}", json);
        }
        return Ok(());
    }

    info!("Running. Press Ctrl+C to shutdown.");
    app.run(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    })
    .await?;

    if let Some(reporter) = &app.reporter {
        info!("Final metrics:\n{}", reporter.dump());
    }
    info!("Shutdown complete.");

    Ok(())
}
