//! Load-generation driver
//!
//! Replays a user journey against a live deployment under a ramping
//! virtual-user schedule and aggregates request timings and check results.

pub mod executor;
pub mod metrics;
pub mod profile;
pub mod report;
pub mod scenario;

use std::sync::Arc;
use std::time::Instant;

use crate::common::config::Config;
use crate::common::Result;

pub use executor::RampingExecutor;
pub use metrics::Metrics;
pub use profile::{RampProfile, Stage};
pub use report::LoadReport;
pub use scenario::{LoginAndOrder, Scenario, VirtualUser};

/// A configured load run
pub struct LoadTest {
    config: Config,
}

impl LoadTest {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Execute the run and summarize it
    pub async fn run(&self, show_progress: bool) -> Result<LoadReport> {
        let scenario = scenario::by_name(&self.config.load.scenario, &self.config)?;
        let executor = RampingExecutor::new(&self.config.load);
        let metrics = Arc::new(Metrics::default());

        tracing::info!(
            site = %self.config.targets.site_url,
            service = %self.config.targets.service_url,
            factory = %self.config.targets.factory_url,
            "Load test targets"
        );

        let progress = show_progress.then(|| executor.progress_bar());
        let started = Instant::now();
        executor
            .run(Arc::clone(&scenario), Arc::clone(&metrics), progress.as_ref())
            .await?;

        let report = LoadReport::from_metrics(
            scenario.name(),
            started.elapsed(),
            &metrics,
            &self.config.load.thresholds,
        );
        tracing::info!(
            completed = report.iterations.completed,
            failed = report.iterations.failed,
            interrupted = report.iterations.interrupted,
            "Load test finished"
        );
        Ok(report)
    }
}
