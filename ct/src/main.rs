//! channeltour - CLI entry point for the channel demos

use std::fs;
use std::path::PathBuf;

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use tracing::info;

use channeltour::cli::{Cli, Command};
use channeltour::config::Config;
use channeltour::console::Console;
use channeltour::fanin::FanIn;
use channeltour::{fanout, pipeline};

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

    // Keep stdout for demo output only: log to a file, or stderr if that fails
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("channeltour")
        .join("logs");

    match fs::create_dir_all(&log_dir).and_then(|_| fs::File::create(log_dir.join("ct.log"))) {
        Ok(log_file) => {
            tracing_subscriber::fmt()
                .with_writer(log_file)
                .with_ansi(false)
                .with_env_filter(filter)
                .init();
        }
        Err(_) => {
            tracing_subscriber::fmt()
                .with_writer(std::io::stderr)
                .with_env_filter(filter)
                .init();
        }
    }

    info!("Logging initialized (verbose: {})", verbose);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    let console = Console::Stdout;
    match cli.command.unwrap_or(Command::FanIn) {
        Command::FanIn => cmd_fan_in(&config, &console).await,
        Command::FanOut => cmd_fan_out(&config, &console).await,
        Command::Pipeline => cmd_pipeline(&config, &console).await,
        Command::All => {
            cmd_pipeline(&config, &console).await?;
            cmd_fan_out(&config, &console).await?;
            cmd_fan_in(&config, &console).await
        }
        Command::List => cmd_list(),
    }
}

async fn cmd_fan_in(config: &Config, console: &Console) -> Result<()> {
    let summary = FanIn::new(config.fan_in.clone(), console.clone())
        .run()
        .await
        .context("Fan-in failed")?;
    info!(
        deliveries = summary.deliveries.len(),
        drained = summary.drained_after_done,
        elapsed = ?summary.elapsed,
        "fan-in complete"
    );
    Ok(())
}

async fn cmd_fan_out(config: &Config, console: &Console) -> Result<()> {
    let summary = fanout::run(&config.fan_out, console).await.context("Fan-out failed")?;
    info!(completed = summary.completed, elapsed = ?summary.elapsed, "fan-out complete");
    Ok(())
}

async fn cmd_pipeline(config: &Config, console: &Console) -> Result<()> {
    let received = pipeline::run(&config.pipeline, console)
        .await
        .context("Pipeline failed")?;
    info!(received = received.len(), "pipeline complete");
    Ok(())
}

fn cmd_list() -> Result<()> {
    for (name, about) in Command::demos() {
        println!("{:<10} {}", name.as_str().cyan(), about.as_str().dimmed());
    }
    Ok(())
}
