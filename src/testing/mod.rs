//! Scenario runner
//!
//! Reads YAML test scenarios, installs their mock routes and drives the
//! headless storefront through their steps, reporting contract failures
//! separately from UI failures.

mod config;
mod runner;

pub use config::*;
pub use runner::{
    build_router, collect_scenarios, run, run_scenario, run_suite, RunOptions, TestResult,
};
