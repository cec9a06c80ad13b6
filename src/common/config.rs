//! Configuration file handling
//!
//! Every setting has a default matching the recorded production run, so an
//! absent config file is valid. Durations use humantime syntax (`"30s"`,
//! `"1m"`).

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use super::paths::config_path;
use super::{Error, Result};
use crate::load::profile::Stage;

/// Main configuration structure
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    /// Deployment URLs the load driver targets
    #[serde(default)]
    pub targets: Targets,

    /// Load test settings
    #[serde(default)]
    pub load: LoadConfig,

    /// Credentials used by the login step
    #[serde(default)]
    pub credentials: Credentials,

    /// Scenario runner settings
    #[serde(default)]
    pub scenarios: ScenarioConfig,

    /// Mock server settings
    #[serde(default)]
    pub serve: ServeConfig,
}

/// Deployment URLs
#[derive(Debug, Deserialize, Clone)]
pub struct Targets {
    /// Storefront origin, fetched first and sent as `origin`
    #[serde(default = "default_site_url")]
    pub site_url: String,

    /// Pizza service API base
    #[serde(default = "default_service_url")]
    pub service_url: String,

    /// Pizza factory base, used for order verification
    #[serde(default = "default_factory_url")]
    pub factory_url: String,
}

impl Default for Targets {
    fn default() -> Self {
        Self {
            site_url: default_site_url(),
            service_url: default_service_url(),
            factory_url: default_factory_url(),
        }
    }
}

fn default_site_url() -> String {
    "https://www.tokenzza.click".to_string()
}
fn default_service_url() -> String {
    "https://pizza-service.tokenzza.click".to_string()
}
fn default_factory_url() -> String {
    "https://pizza-factory.cs329.click".to_string()
}

/// How the verify request body embeds the order JWT
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum VerifyBody {
    /// `{"jwt":"<jwt>"}`, a valid JSON string
    #[default]
    Json,
    /// `{"jwt":<jwt>}`, the raw interpolation of the recorded script
    Verbatim,
}

/// Load test settings
#[derive(Debug, Deserialize, Clone)]
pub struct LoadConfig {
    /// Scenario to execute
    #[serde(default = "default_scenario")]
    pub scenario: String,

    /// VUs running before the first stage starts ramping
    #[serde(default = "default_start_vus")]
    pub start_vus: usize,

    /// Ramp profile
    #[serde(default = "default_stages")]
    pub stages: Vec<Stage>,

    /// Time a VU gets to finish its iteration once the run is over
    #[serde(default = "default_graceful", with = "humantime_serde")]
    pub graceful_stop: Duration,

    /// Time a retired VU gets to finish its iteration when the target drops
    #[serde(default = "default_graceful", with = "humantime_serde")]
    pub graceful_ramp_down: Duration,

    /// Multiplier applied to every think-time sleep
    #[serde(default = "default_think_time_scale")]
    pub think_time_scale: f64,

    /// Verify request body format
    #[serde(default)]
    pub verify_body: VerifyBody,

    /// Per-request timeout
    #[serde(default = "default_request_timeout", with = "humantime_serde")]
    pub request_timeout: Duration,

    /// How often the executor re-evaluates the ramp profile
    #[serde(default = "default_tick", with = "humantime_serde")]
    pub tick: Duration,

    /// Pass/fail thresholds; none by default
    #[serde(default)]
    pub thresholds: Thresholds,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            scenario: default_scenario(),
            start_vus: default_start_vus(),
            stages: default_stages(),
            graceful_stop: default_graceful(),
            graceful_ramp_down: default_graceful(),
            think_time_scale: default_think_time_scale(),
            verify_body: VerifyBody::default(),
            request_timeout: default_request_timeout(),
            tick: default_tick(),
            thresholds: Thresholds::default(),
        }
    }
}

fn default_scenario() -> String {
    "login_and_order".to_string()
}
fn default_start_vus() -> usize {
    1
}
fn default_stages() -> Vec<Stage> {
    vec![
        Stage::new(5, Duration::from_secs(30)),
        Stage::new(15, Duration::from_secs(60)),
        Stage::new(10, Duration::from_secs(30)),
        Stage::new(0, Duration::from_secs(30)),
    ]
}
fn default_graceful() -> Duration {
    Duration::from_secs(30)
}
fn default_think_time_scale() -> f64 {
    1.0
}
fn default_request_timeout() -> Duration {
    Duration::from_secs(60)
}
fn default_tick() -> Duration {
    Duration::from_millis(100)
}

/// Load test thresholds
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Thresholds {
    /// Minimum fraction of passing checks (0.0 - 1.0)
    pub checks_min_pass_rate: Option<f64>,
    /// Maximum number of failed iterations
    pub max_failed_iterations: Option<u64>,
}

/// Login credentials
#[derive(Debug, Deserialize, Clone)]
pub struct Credentials {
    #[serde(default = "default_email")]
    pub email: String,
    #[serde(default = "default_password")]
    pub password: String,
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            email: default_email(),
            password: default_password(),
        }
    }
}

fn default_email() -> String {
    "d@jwt.com".to_string()
}
fn default_password() -> String {
    "diner".to_string()
}

/// Scenario runner settings
#[derive(Debug, Deserialize, Clone)]
pub struct ScenarioConfig {
    /// Base URL the storefront believes it is served from
    #[serde(default = "default_page_origin")]
    pub page_origin: String,

    /// API base the storefront sends requests to
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Where unmocked requests are forwarded; unset means they get a 404
    pub upstream: Option<String>,

    /// Number of scenarios run concurrently
    #[serde(default = "default_jobs")]
    pub jobs: usize,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            page_origin: default_page_origin(),
            api_base: default_api_base(),
            upstream: None,
            jobs: default_jobs(),
        }
    }
}

fn default_page_origin() -> String {
    "http://localhost:5173".to_string()
}
fn default_api_base() -> String {
    "http://localhost:3000".to_string()
}
fn default_jobs() -> usize {
    1
}

/// Mock server settings
#[derive(Debug, Deserialize, Clone)]
pub struct ServeConfig {
    #[serde(default = "default_addr")]
    pub addr: String,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
        }
    }
}

fn default_addr() -> String {
    "127.0.0.1:3000".to_string()
}

impl Config {
    /// Load configuration from an explicit path, or the default config file
    ///
    /// An explicit path must exist. The default file is optional and
    /// defaults are returned when it is absent.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => match config_path() {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    /// Parse a configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text and validate it
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| Error::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.load.stages.is_empty() {
            return Err(Error::Config("load.stages must not be empty".to_string()));
        }
        if !(self.load.think_time_scale >= 0.0 && self.load.think_time_scale.is_finite()) {
            return Err(Error::Config(format!(
                "load.think_time_scale must be a non-negative number, got {}",
                self.load.think_time_scale
            )));
        }
        if self.load.tick.is_zero() {
            return Err(Error::Config("load.tick must be greater than zero".to_string()));
        }
        if let Some(rate) = self.load.thresholds.checks_min_pass_rate {
            if !(0.0..=1.0).contains(&rate) {
                return Err(Error::Config(format!(
                    "load.thresholds.checks_min_pass_rate must be within 0.0..=1.0, got {}",
                    rate
                )));
            }
        }
        if self.scenarios.jobs == 0 {
            return Err(Error::Config("scenarios.jobs must be at least 1".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_recorded_run() {
        let config = Config::default();
        let targets: Vec<usize> = config.load.stages.iter().map(|s| s.target).collect();
        assert_eq!(targets, vec![5, 15, 10, 0]);
        assert_eq!(config.load.start_vus, 1);
        assert_eq!(config.load.stages[1].duration, Duration::from_secs(60));
        assert_eq!(config.load.graceful_stop, Duration::from_secs(30));
        assert_eq!(config.load.graceful_ramp_down, Duration::from_secs(30));
        assert_eq!(config.credentials.email, "d@jwt.com");
        assert_eq!(config.load.verify_body, VerifyBody::Json);
    }

    #[test]
    fn test_parse_overrides() {
        let config = Config::parse(
            r#"
            [targets]
            site_url = "http://127.0.0.1:8080"

            [load]
            graceful_stop = "5s"
            start_vus = 0
            think_time_scale = 0.0
            verify_body = "verbatim"

            [[load.stages]]
            target = 2
            duration = "1m 30s"

            [load.thresholds]
            checks_min_pass_rate = 0.9
            "#,
        )
        .unwrap();

        assert_eq!(config.targets.site_url, "http://127.0.0.1:8080");
        assert_eq!(config.targets.service_url, default_service_url());
        assert_eq!(config.load.graceful_stop, Duration::from_secs(5));
        assert_eq!(config.load.start_vus, 0);
        assert_eq!(config.load.stages.len(), 1);
        assert_eq!(config.load.stages[0].duration, Duration::from_secs(90));
        assert_eq!(config.load.verify_body, VerifyBody::Verbatim);
        assert_eq!(config.load.thresholds.checks_min_pass_rate, Some(0.9));
    }

    #[test]
    fn test_rejects_empty_stages() {
        let err = Config::parse("[load]\nstages = []\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_rejects_bad_pass_rate() {
        let err = Config::parse("[load.thresholds]\nchecks_min_pass_rate = 1.5\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("harness.toml");
        std::fs::write(&path, "[serve]\naddr = \"0.0.0.0:4000\"\n").unwrap();
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.serve.addr, "0.0.0.0:4000");
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let err = Config::load(Some(Path::new("/nonexistent/harness.toml"))).unwrap_err();
        assert!(matches!(err, Error::FileRead { .. }));
    }
}
