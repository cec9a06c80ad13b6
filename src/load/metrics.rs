//! Metrics sink shared by all virtual users

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use serde::Serialize;

/// Pass/fail counts for one named check
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct CheckStats {
    pub passes: u64,
    pub fails: u64,
}

/// Timing and failure counts for one named request
#[derive(Debug, Clone, Default, Serialize)]
pub struct RequestStats {
    pub count: u64,
    /// Responses with a non-2xx status or no response at all
    pub failures: u64,
    #[serde(with = "humantime_serde")]
    pub min: Duration,
    #[serde(with = "humantime_serde")]
    pub max: Duration,
    #[serde(skip)]
    total: Duration,
}

impl RequestStats {
    pub fn avg(&self) -> Duration {
        if self.count == 0 {
            return Duration::ZERO;
        }
        self.total.div_f64(self.count as f64)
    }

    fn observe(&mut self, duration: Duration, failed: bool) {
        if self.count == 0 || duration < self.min {
            self.min = duration;
        }
        if duration > self.max {
            self.max = duration;
        }
        self.count += 1;
        self.total += duration;
        if failed {
            self.failures += 1;
        }
    }
}

/// (group, name) key
type Tagged = (String, String);

#[derive(Debug, Default)]
pub struct Metrics {
    checks: Mutex<BTreeMap<Tagged, CheckStats>>,
    requests: Mutex<BTreeMap<Tagged, RequestStats>>,
    completed: AtomicU64,
    failed: AtomicU64,
    interrupted: AtomicU64,
    active_vus: AtomicUsize,
    peak_vus: AtomicUsize,
}

impl Metrics {
    pub fn record_check(&self, group: &str, name: &str, passed: bool) {
        let mut checks = self.checks.lock().unwrap_or_else(PoisonError::into_inner);
        let stats = checks
            .entry((group.to_string(), name.to_string()))
            .or_default();
        if passed {
            stats.passes += 1;
        } else {
            stats.fails += 1;
        }
    }

    pub fn record_request(&self, group: &str, name: &str, duration: Duration, failed: bool) {
        let mut requests = self.requests.lock().unwrap_or_else(PoisonError::into_inner);
        requests
            .entry((group.to_string(), name.to_string()))
            .or_default()
            .observe(duration, failed);
    }

    pub fn iteration_completed(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn iteration_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn iteration_interrupted(&self) {
        self.interrupted.fetch_add(1, Ordering::Relaxed);
    }

    /// Track the number of live VUs and remember the peak
    pub fn set_active_vus(&self, active: usize) {
        self.active_vus.store(active, Ordering::Relaxed);
        self.peak_vus.fetch_max(active, Ordering::Relaxed);
    }

    pub fn active_vus(&self) -> usize {
        self.active_vus.load(Ordering::Relaxed)
    }

    pub fn iterations(&self) -> (u64, u64, u64) {
        (
            self.completed.load(Ordering::Relaxed),
            self.failed.load(Ordering::Relaxed),
            self.interrupted.load(Ordering::Relaxed),
        )
    }

    pub fn peak_vus(&self) -> usize {
        self.peak_vus.load(Ordering::Relaxed)
    }

    pub fn checks(&self) -> BTreeMap<Tagged, CheckStats> {
        self.checks.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn requests(&self) -> BTreeMap<Tagged, RequestStats> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_stats() {
        let metrics = Metrics::default();
        metrics.record_request("g", "login", Duration::from_millis(30), false);
        metrics.record_request("g", "login", Duration::from_millis(10), true);

        let requests = metrics.requests();
        let login = &requests[&("g".to_string(), "login".to_string())];
        assert_eq!(login.count, 2);
        assert_eq!(login.failures, 1);
        assert_eq!(login.min, Duration::from_millis(10));
        assert_eq!(login.max, Duration::from_millis(30));
        assert_eq!(login.avg(), Duration::from_millis(20));
    }

    #[test]
    fn test_avg_past_u32_count() {
        let stats = RequestStats {
            count: u64::from(u32::MAX) + 2,
            total: Duration::from_secs(u64::from(u32::MAX) + 2),
            ..RequestStats::default()
        };
        assert_eq!(stats.avg(), Duration::from_secs(1));
    }

    #[test]
    fn test_peak_vus_is_sticky() {
        let metrics = Metrics::default();
        metrics.set_active_vus(3);
        metrics.set_active_vus(7);
        metrics.set_active_vus(2);
        assert_eq!(metrics.active_vus(), 2);
        assert_eq!(metrics.peak_vus(), 7);
    }

    #[test]
    fn test_checks_by_group() {
        let metrics = Metrics::default();
        metrics.record_check("a", "status equals 200", true);
        metrics.record_check("a", "status equals 200", false);
        metrics.record_check("b", "status equals 200", true);
        let checks = metrics.checks();
        assert_eq!(checks.len(), 2);
        assert_eq!(
            checks[&("a".to_string(), "status equals 200".to_string())],
            CheckStats { passes: 1, fails: 1 }
        );
    }
}
