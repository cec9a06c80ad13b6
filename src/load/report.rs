//! End-of-run summary

use std::time::Duration;

use colored::Colorize;
use serde::Serialize;

use crate::common::config::Thresholds;

use super::metrics::Metrics;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct IterationSummary {
    pub completed: u64,
    pub failed: u64,
    pub interrupted: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckSummary {
    pub group: String,
    pub name: String,
    pub passes: u64,
    pub fails: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestSummary {
    pub group: String,
    pub name: String,
    pub count: u64,
    pub failures: u64,
    #[serde(with = "humantime_serde")]
    pub min: Duration,
    #[serde(with = "humantime_serde")]
    pub avg: Duration,
    #[serde(with = "humantime_serde")]
    pub max: Duration,
}

/// Aggregated outcome of a load run
#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    pub scenario: String,
    #[serde(with = "humantime_serde")]
    pub duration: Duration,
    pub vus_max: usize,
    pub iterations: IterationSummary,
    pub checks: Vec<CheckSummary>,
    pub requests: Vec<RequestSummary>,
    /// Thresholds that were crossed; empty when the run passes
    pub threshold_failures: Vec<String>,
}

impl LoadReport {
    pub fn from_metrics(
        scenario: &str,
        duration: Duration,
        metrics: &Metrics,
        thresholds: &Thresholds,
    ) -> Self {
        let (completed, failed, interrupted) = metrics.iterations();
        let checks = metrics
            .checks()
            .into_iter()
            .map(|((group, name), stats)| CheckSummary {
                group,
                name,
                passes: stats.passes,
                fails: stats.fails,
            })
            .collect();
        let requests = metrics
            .requests()
            .into_iter()
            .map(|((group, name), stats)| RequestSummary {
                group,
                name,
                count: stats.count,
                failures: stats.failures,
                min: stats.min,
                avg: stats.avg(),
                max: stats.max,
            })
            .collect();

        let mut report = Self {
            scenario: scenario.to_string(),
            duration,
            vus_max: metrics.peak_vus(),
            iterations: IterationSummary {
                completed,
                failed,
                interrupted,
            },
            checks,
            requests,
            threshold_failures: Vec::new(),
        };
        report.threshold_failures = report.evaluate(thresholds);
        report
    }

    /// Fraction of passing checks, `None` when no check ran
    pub fn checks_pass_rate(&self) -> Option<f64> {
        let passes: u64 = self.checks.iter().map(|c| c.passes).sum();
        let total: u64 = self.checks.iter().map(|c| c.passes + c.fails).sum();
        (total > 0).then(|| passes as f64 / total as f64)
    }

    fn evaluate(&self, thresholds: &Thresholds) -> Vec<String> {
        let mut crossed = Vec::new();
        if let Some(min) = thresholds.checks_min_pass_rate {
            let rate = self.checks_pass_rate().unwrap_or(1.0);
            if rate < min {
                crossed.push(format!("checks pass rate {:.2} < {:.2}", rate, min));
            }
        }
        if let Some(max) = thresholds.max_failed_iterations {
            if self.iterations.failed > max {
                crossed.push(format!("failed iterations {} > {}", self.iterations.failed, max));
            }
        }
        crossed
    }

    pub fn passed(&self) -> bool {
        self.threshold_failures.is_empty()
    }

    /// Print a human-readable summary to stdout
    pub fn print(&self) {
        println!(
            "\n{} {} ({:.1}s, max {} VUs)",
            "Load test:".blue().bold(),
            self.scenario.white().bold(),
            self.duration.as_secs_f64(),
            self.vus_max
        );

        let mut group: Option<&str> = None;
        for check in &self.checks {
            if group != Some(check.group.as_str()) {
                println!("\n  {}", format!("█ {}", check.group).cyan());
                group = Some(check.group.as_str());
            }
            let mark = if check.fails == 0 {
                "✓".green()
            } else {
                "✗".red()
            };
            println!(
                "    {} {} ({} passed, {} failed)",
                mark, check.name, check.passes, check.fails
            );
        }

        println!("\n  {}", "Requests:".cyan());
        for request in &self.requests {
            let failures = if request.failures > 0 {
                format!("{} failed", request.failures).red()
            } else {
                "0 failed".dimmed()
            };
            println!(
                "    {:<10} {:>5} reqs  {}  min={:?} avg={:?} max={:?}",
                request.name, request.count, failures, request.min, request.avg, request.max
            );
        }

        println!(
            "\n  iterations: {} completed, {} failed, {} interrupted",
            self.iterations.completed, self.iterations.failed, self.iterations.interrupted
        );

        if self.passed() {
            println!("\n{}", "✓ Load test passed".green().bold());
        } else {
            for failure in &self.threshold_failures {
                println!("  {} {}", "✗".red(), failure);
            }
            println!("\n{}", "✗ Thresholds crossed".red().bold());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics() -> Metrics {
        let metrics = Metrics::default();
        metrics.record_check("g", "status equals 200", true);
        metrics.record_check("g", "status equals 200", false);
        metrics.iteration_completed();
        metrics.iteration_failed();
        metrics.iteration_failed();
        metrics
    }

    #[test]
    fn test_no_thresholds_passes() {
        let report =
            LoadReport::from_metrics("s", Duration::from_secs(1), &metrics(), &Thresholds::default());
        assert!(report.passed());
        assert_eq!(report.checks_pass_rate(), Some(0.5));
        assert_eq!(report.iterations.failed, 2);
    }

    #[test]
    fn test_thresholds_crossed() {
        let thresholds = Thresholds {
            checks_min_pass_rate: Some(0.9),
            max_failed_iterations: Some(1),
        };
        let report = LoadReport::from_metrics("s", Duration::from_secs(1), &metrics(), &thresholds);
        assert!(!report.passed());
        assert_eq!(report.threshold_failures.len(), 2);
    }

    #[test]
    fn test_serializes_to_json() {
        let report =
            LoadReport::from_metrics("s", Duration::from_secs(2), &metrics(), &Thresholds::default());
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["duration"], "2s");
        assert_eq!(value["checks"][0]["fails"], 1);
    }
}
