//! Ramping virtual-user executor
//!
//! A controller ticks the ramp profile. When the target rises it spawns VU
//! tasks; when it falls it signals the highest-numbered VUs to stop after
//! their current iteration and gives them `graceful_ramp_down` to do so.
//! At the end of the profile every VU is signalled and gets `graceful_stop`.
//! A VU still running at its deadline is aborted and its iteration counted
//! as interrupted.

use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::common::config::LoadConfig;
use crate::common::{Error, Result};

use super::metrics::Metrics;
use super::profile::RampProfile;
use super::scenario::{Scenario, VirtualUser};

struct VuHandle {
    id: usize,
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
    deadline: Option<Instant>,
}

impl VuHandle {
    fn retire(&mut self, grace: Duration) {
        let _ = self.stop.send(true);
        let deadline = Instant::now() + grace;
        self.deadline = Some(self.deadline.map_or(deadline, |d| d.min(deadline)));
    }
}

pub struct RampingExecutor {
    profile: RampProfile,
    graceful_stop: Duration,
    graceful_ramp_down: Duration,
    request_timeout: Duration,
    tick: Duration,
}

impl RampingExecutor {
    pub fn new(config: &LoadConfig) -> Self {
        Self {
            profile: RampProfile::new(config.start_vus, config.stages.clone()),
            graceful_stop: config.graceful_stop,
            graceful_ramp_down: config.graceful_ramp_down,
            request_timeout: config.request_timeout,
            tick: config.tick,
        }
    }

    pub fn profile(&self) -> &RampProfile {
        &self.profile
    }

    /// Progress bar over the profile's duration, in seconds
    pub fn progress_bar(&self) -> ProgressBar {
        let pb = ProgressBar::new(self.profile.total_duration().as_secs().max(1));
        pb.set_style(
            ProgressStyle::default_bar()
                .template("  [{bar:40.cyan/blue}] {pos}/{len}s {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        pb
    }

    fn spawn_vu(
        &self,
        id: usize,
        scenario: &Arc<dyn Scenario>,
        metrics: &Arc<Metrics>,
    ) -> Result<VuHandle> {
        let client = reqwest::Client::builder()
            .timeout(self.request_timeout)
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build HTTP client: {}", e)))?;
        let vu = VirtualUser::new(id, client, Arc::clone(metrics));
        let (stop, stopped) = watch::channel(false);
        let task = tokio::spawn(vu_loop(
            vu,
            Arc::clone(scenario),
            stopped,
            Arc::clone(metrics),
        ));
        tracing::debug!(vu = id, "Started VU");
        Ok(VuHandle {
            id,
            stop,
            task,
            deadline: None,
        })
    }

    /// Run the profile to completion
    pub async fn run(
        &self,
        scenario: Arc<dyn Scenario>,
        metrics: Arc<Metrics>,
        progress: Option<&ProgressBar>,
    ) -> Result<()> {
        let total = self.profile.total_duration();
        let start = Instant::now();
        let mut active: Vec<VuHandle> = Vec::new();
        let mut retiring: Vec<VuHandle> = Vec::new();
        let mut next_id = 1;

        tracing::info!(
            scenario = scenario.name(),
            start_vus = self.profile.start_vus(),
            stages = self.profile.stages().len(),
            duration = ?total,
            max_vus = self.profile.max_target(),
            "Starting ramping executor"
        );

        let mut ticker = tokio::time::interval(self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let elapsed = start.elapsed();
            if elapsed >= total {
                break;
            }

            let target = self.profile.target_at(elapsed);
            while active.len() < target {
                active.push(self.spawn_vu(next_id, &scenario, &metrics)?);
                next_id += 1;
            }
            while active.len() > target {
                let Some(mut vu) = active.pop() else { break };
                tracing::debug!(vu = vu.id, "Retiring VU");
                vu.retire(self.graceful_ramp_down);
                retiring.push(vu);
            }

            reap(&mut retiring, &metrics);
            metrics.set_active_vus(active.len() + retiring.len());
            if let Some(pb) = progress {
                pb.set_position(elapsed.as_secs());
                pb.set_message(format!("{} VUs", active.len()));
            }
        }

        tracing::info!(
            running = active.len() + retiring.len(),
            "Profile finished, stopping VUs"
        );
        for mut vu in active.drain(..) {
            vu.retire(self.graceful_stop);
            retiring.push(vu);
        }
        for vu in retiring.iter_mut() {
            vu.retire(self.graceful_stop);
        }

        while !retiring.is_empty() {
            reap(&mut retiring, &metrics);
            metrics.set_active_vus(retiring.len());
            if retiring.is_empty() {
                break;
            }
            tokio::time::sleep(self.tick).await;
        }

        if let Some(pb) = progress {
            pb.set_position(total.as_secs());
            pb.finish_and_clear();
        }
        Ok(())
    }
}

/// Drop finished VUs and abort the ones past their deadline
fn reap(retiring: &mut Vec<VuHandle>, metrics: &Metrics) {
    let now = Instant::now();
    retiring.retain(|vu| {
        if vu.task.is_finished() {
            tracing::debug!(vu = vu.id, "VU stopped");
            return false;
        }
        if vu.deadline.is_some_and(|d| now >= d) {
            tracing::debug!(vu = vu.id, "VU missed its deadline, interrupting");
            vu.task.abort();
            metrics.iteration_interrupted();
            return false;
        }
        true
    });
}

async fn vu_loop(
    mut vu: VirtualUser,
    scenario: Arc<dyn Scenario>,
    stop: watch::Receiver<bool>,
    metrics: Arc<Metrics>,
) {
    loop {
        let stopped = *stop.borrow();
        if stopped {
            break;
        }
        vu.iteration += 1;
        vu.vars.clear();
        match scenario.iteration(&mut vu).await {
            Ok(()) => metrics.iteration_completed(),
            Err(e) => {
                tracing::debug!(vu = vu.id, iteration = vu.iteration, error = %e, "Iteration failed");
                metrics.iteration_failed();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load::profile::Stage;
    use async_trait::async_trait;

    struct Sleeper(Duration);

    #[async_trait]
    impl Scenario for Sleeper {
        fn name(&self) -> &str {
            "sleeper"
        }

        async fn iteration(&self, vu: &mut VirtualUser) -> Result<()> {
            tokio::time::sleep(self.0).await;
            if vu.iteration % 2 == 0 {
                return Err(Error::check_failed("even", "even iteration"));
            }
            Ok(())
        }
    }

    fn config(stages: Vec<Stage>, grace: Duration) -> LoadConfig {
        LoadConfig {
            stages,
            graceful_stop: grace,
            graceful_ramp_down: grace,
            tick: Duration::from_millis(10),
            ..LoadConfig::default()
        }
    }

    #[tokio::test]
    async fn test_runs_iterations_and_reaches_peak() {
        let executor = RampingExecutor::new(&config(
            vec![
                Stage::new(3, Duration::from_millis(100)),
                Stage::new(3, Duration::from_millis(200)),
            ],
            Duration::from_secs(1),
        ));
        let metrics = Arc::new(Metrics::default());
        executor
            .run(Arc::new(Sleeper(Duration::from_millis(20))), Arc::clone(&metrics), None)
            .await
            .unwrap();

        let (completed, failed, interrupted) = metrics.iterations();
        assert!(completed > 0);
        assert!(failed > 0);
        assert_eq!(interrupted, 0);
        assert_eq!(metrics.peak_vus(), 3);
        assert_eq!(metrics.active_vus(), 0);
    }

    #[tokio::test]
    async fn test_slow_iteration_is_interrupted_after_graceful_stop() {
        let executor = RampingExecutor::new(&config(
            vec![Stage::new(1, Duration::from_millis(50))],
            Duration::from_millis(50),
        ));
        let metrics = Arc::new(Metrics::default());
        executor
            .run(Arc::new(Sleeper(Duration::from_secs(30))), Arc::clone(&metrics), None)
            .await
            .unwrap();

        let (completed, _, interrupted) = metrics.iterations();
        assert_eq!(completed, 0);
        assert_eq!(interrupted, 1);
    }

    #[tokio::test]
    async fn test_ramp_down_interrupts_retired_vus_after_grace() {
        let executor = RampingExecutor::new(&LoadConfig {
            stages: vec![
                Stage::new(4, Duration::ZERO),
                Stage::new(4, Duration::from_millis(50)),
                Stage::new(1, Duration::ZERO),
                Stage::new(1, Duration::from_millis(400)),
            ],
            graceful_ramp_down: Duration::from_millis(30),
            graceful_stop: Duration::from_secs(1),
            tick: Duration::from_millis(10),
            ..LoadConfig::default()
        });
        let metrics = Arc::new(Metrics::default());
        executor
            .run(Arc::new(Sleeper(Duration::from_millis(200))), Arc::clone(&metrics), None)
            .await
            .unwrap();

        let (_, _, interrupted) = metrics.iterations();
        assert_eq!(interrupted, 3);
        assert_eq!(metrics.peak_vus(), 4);
        assert_eq!(metrics.active_vus(), 0);
    }
}
