//! Pizza harness CLI
//!
//! Runs the load test, the scenario suite, or the local mock service.

use std::path::PathBuf;

use clap::Parser;
use commands::Commands;
use pizza_harness::common::{config::Config, logging};
use pizza_harness::{cli, commands};

#[derive(Parser)]
#[command(name = "pizza-harness", about = "Load and end-to-end testing for the pizza service")]
#[command(version, long_about = None)]
struct Cli {
    /// Configuration file (default: the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let (verbose, log_file) = match &cli.command {
        Commands::Test { verbose, .. } => (*verbose, false),
        Commands::Load { log_file, .. } => (false, *log_file),
        Commands::Serve { .. } => (false, false),
    };
    let guard = if log_file {
        logging::init_with_file(verbose).map(|(path, guard)| {
            tracing::info!(path = %path.display(), "Writing log file");
            guard
        })
    } else {
        logging::init_cli(verbose);
        None
    };

    let result = match Config::load(cli.config.as_deref()) {
        Ok(config) => cli::dispatch(cli.command, config).await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        drop(guard);
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
