//! Ramp profile
//!
//! A profile is an ordered list of stages. During each stage the target VU
//! count moves linearly from the previous stage's target (`start_vus` for
//! the first stage) to the stage's own target.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// One ramp stage: reach `target` VUs over `duration`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Stage {
    pub target: usize,
    #[serde(with = "humantime_serde")]
    pub duration: Duration,
}

impl Stage {
    pub fn new(target: usize, duration: Duration) -> Self {
        Self { target, duration }
    }
}

#[derive(Debug, Clone)]
pub struct RampProfile {
    start_vus: usize,
    stages: Vec<Stage>,
}

impl RampProfile {
    pub fn new(start_vus: usize, stages: Vec<Stage>) -> Self {
        Self { start_vus, stages }
    }

    pub fn start_vus(&self) -> usize {
        self.start_vus
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn total_duration(&self) -> Duration {
        self.stages.iter().map(|s| s.duration).sum()
    }

    pub fn max_target(&self) -> usize {
        self.stages
            .iter()
            .map(|s| s.target)
            .max()
            .unwrap_or(0)
            .max(self.start_vus)
    }

    /// Target VU count `elapsed` after the start of the run
    ///
    /// Past the end of the profile the last stage's target holds.
    pub fn target_at(&self, elapsed: Duration) -> usize {
        let mut from = self.start_vus;
        let mut stage_start = Duration::ZERO;

        for stage in &self.stages {
            let stage_end = stage_start + stage.duration;
            if elapsed < stage_end {
                let progress = (elapsed - stage_start).as_secs_f64() / stage.duration.as_secs_f64();
                let delta = stage.target as f64 - from as f64;
                return (from as f64 + delta * progress).round().max(0.0) as usize;
            }
            from = stage.target;
            stage_start = stage_end;
        }

        from
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_profile() -> RampProfile {
        RampProfile::new(1, vec![
            Stage::new(5, Duration::from_secs(30)),
            Stage::new(15, Duration::from_secs(60)),
            Stage::new(10, Duration::from_secs(30)),
            Stage::new(0, Duration::from_secs(30)),
        ])
    }

    #[test]
    fn test_total_duration() {
        assert_eq!(default_profile().total_duration(), Duration::from_secs(150));
        assert_eq!(default_profile().max_target(), 15);
    }

    #[test]
    fn test_interpolates_within_stages() {
        let profile = default_profile();
        assert_eq!(profile.target_at(Duration::ZERO), 1);
        assert_eq!(profile.target_at(Duration::from_secs(2)), 1);
        assert_eq!(profile.target_at(Duration::from_secs(15)), 3);
        assert_eq!(profile.target_at(Duration::from_secs(30)), 5);
        assert_eq!(profile.target_at(Duration::from_secs(60)), 10);
        assert_eq!(profile.target_at(Duration::from_secs(90)), 15);
        assert_eq!(profile.target_at(Duration::from_secs(105)), 13);
        assert_eq!(profile.target_at(Duration::from_secs(135)), 5);
    }

    #[test]
    fn test_holds_last_target_after_end() {
        let profile = default_profile();
        assert_eq!(profile.target_at(Duration::from_secs(150)), 0);
        assert_eq!(profile.target_at(Duration::from_secs(999)), 0);

        let hold = RampProfile::new(1, vec![Stage::new(2, Duration::from_secs(1))]);
        assert_eq!(hold.target_at(Duration::from_secs(5)), 2);
    }

    #[test]
    fn test_zero_length_stage_jumps() {
        let profile = RampProfile::new(1, vec![
            Stage::new(4, Duration::ZERO),
            Stage::new(4, Duration::from_secs(10)),
        ]);
        assert_eq!(profile.target_at(Duration::ZERO), 4);
        assert_eq!(profile.target_at(Duration::from_secs(5)), 4);
    }

    #[test]
    fn test_first_stage_ramps_from_start_vus() {
        let profile = RampProfile::new(1, vec![Stage::new(5, Duration::from_secs(30))]);
        assert_eq!(profile.target_at(Duration::ZERO), 1);
        assert_eq!(profile.target_at(Duration::from_secs(2)), 1);
        assert_eq!(profile.target_at(Duration::from_secs(15)), 3);

        let from_zero = RampProfile::new(0, vec![Stage::new(5, Duration::from_secs(30))]);
        assert_eq!(from_zero.target_at(Duration::ZERO), 0);
        assert_eq!(from_zero.max_target(), 5);
    }
}
