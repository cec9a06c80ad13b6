//! CLI command handling
//!
//! Applies command-line overrides to the loaded configuration and runs the
//! selected harness.

use std::path::PathBuf;
use std::sync::Arc;

use colored::Colorize;
use tokio::net::TcpListener;

use crate::commands::Commands;
use crate::common::config::Config;
use crate::common::{Error, Result};
use crate::fixtures;
use crate::load::LoadTest;
use crate::mock;
use crate::testing::{collect_scenarios, run_suite, RunOptions};

/// Dispatch a CLI command
pub async fn dispatch(command: Commands, config: Config) -> Result<()> {
    match command {
        Commands::Load {
            site,
            service,
            factory,
            think_time_scale,
            json,
            log_file: _,
        } => {
            let mut config = config;
            if let Some(site) = site {
                config.targets.site_url = site;
            }
            if let Some(service) = service {
                config.targets.service_url = service;
            }
            if let Some(factory) = factory {
                config.targets.factory_url = factory;
            }
            if let Some(scale) = think_time_scale {
                if !(scale >= 0.0 && scale.is_finite()) {
                    return Err(Error::Config(format!(
                        "--think-time-scale must be a non-negative number, got {}",
                        scale
                    )));
                }
                config.load.think_time_scale = scale;
            }

            let report = LoadTest::new(config).run(!json).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                report.print();
            }

            if report.passed() {
                Ok(())
            } else {
                Err(Error::ThresholdsCrossed(report.threshold_failures.join("; ")))
            }
        }

        Commands::Test {
            paths,
            jobs,
            verbose,
        } => run_tests(&paths, jobs, verbose, &config).await,

        Commands::Serve { addr } => {
            let addr = addr.unwrap_or(config.serve.addr);
            let listener = TcpListener::bind(&addr).await?;
            let router = Arc::new(fixtures::pizza_service()?);
            println!(
                "Serving the pizza service on {}",
                format!("http://{}", listener.local_addr()?).cyan()
            );
            println!("Press Ctrl+C to stop.");
            mock::server::serve(router, listener).await
        }
    }
}

async fn run_tests(
    paths: &[PathBuf],
    jobs: Option<usize>,
    verbose: bool,
    config: &Config,
) -> Result<()> {
    let files = collect_scenarios(paths)?;
    let mut options = RunOptions::from_config(&config.scenarios);
    options.verbose = verbose;
    options.request_timeout = config.load.request_timeout;
    let jobs = jobs.unwrap_or(config.scenarios.jobs);

    let results = run_suite(&files, &options, jobs).await;
    for result in &results {
        result.print();
    }

    let failed: Vec<_> = results.iter().filter(|r| !r.passed).collect();
    println!(
        "{} passed, {} failed",
        (results.len() - failed.len()).to_string().green(),
        failed.len().to_string().red()
    );
    for result in &failed {
        println!(
            "  {} {} [{}]",
            "✗".red(),
            result.name,
            result.category.unwrap_or("unknown")
        );
    }

    if failed.is_empty() {
        Ok(())
    } else {
        Err(Error::TestAssertion(format!(
            "{} of {} scenarios failed",
            failed.len(),
            results.len()
        )))
    }
}
