//! CLI command definitions
//!
//! Defines the clap commands for the pizza harness CLI.

use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Run the ramping virtual-user load test
    Load {
        /// Storefront URL (overrides targets.site_url)
        #[arg(long)]
        site: Option<String>,

        /// Pizza service URL (overrides targets.service_url)
        #[arg(long)]
        service: Option<String>,

        /// Pizza factory URL (overrides targets.factory_url)
        #[arg(long)]
        factory: Option<String>,

        /// Multiply every think-time pause, 0 disables them
        #[arg(long)]
        think_time_scale: Option<f64>,

        /// Print the report as JSON instead of a summary
        #[arg(long)]
        json: bool,

        /// Also write a detailed log file to the data directory
        #[arg(long)]
        log_file: bool,
    },

    /// Run YAML test scenarios against the headless storefront
    Test {
        /// Scenario files or directories containing them
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Number of scenarios run concurrently (overrides scenarios.jobs)
        #[arg(long, short)]
        jobs: Option<usize>,

        /// Verbose output
        #[arg(long, short)]
        verbose: bool,
    },

    /// Serve the in-memory pizza service over HTTP
    Serve {
        /// Listen address (overrides serve.addr)
        #[arg(long)]
        addr: Option<String>,
    },
}
