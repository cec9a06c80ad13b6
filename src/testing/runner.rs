//! Test runner implementation
//!
//! Executes test scenarios against the headless storefront. Each scenario
//! gets its own mock router, call counters and storefront; steps run
//! strictly in order and the first failure ends the scenario.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use colored::Colorize;
use futures_util::stream::{self, StreamExt};

use crate::common::config::ScenarioConfig;
use crate::common::{Error, Result};
use crate::mock::{HttpTransport, MockRouter};
use crate::storefront::Storefront;

use super::config::{TestScenario, TestStep};

/// Where the storefront lives and where its requests go
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Origin stripped from absolute `goto` URLs
    pub page_origin: String,
    /// API base the storefront sends requests to
    pub api_base: String,
    /// Default upstream for scenarios that don't name one
    pub upstream: Option<String>,
    pub request_timeout: Duration,
    pub verbose: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self::from_config(&ScenarioConfig::default())
    }
}

impl RunOptions {
    pub fn from_config(config: &ScenarioConfig) -> Self {
        Self {
            page_origin: config.page_origin.clone(),
            api_base: config.api_base.clone(),
            upstream: config.upstream.clone(),
            request_timeout: Duration::from_secs(30),
            verbose: false,
        }
    }
}

/// Result of a test run
#[derive(Debug)]
pub struct TestResult {
    pub name: String,
    pub passed: bool,
    pub steps_run: usize,
    pub steps_total: usize,
    pub error: Option<String>,
    /// `contract`, `ui`, `backend`, ... for failed runs
    pub category: Option<&'static str>,
    /// Lines printed for this scenario
    pub transcript: Vec<String>,
}

impl TestResult {
    /// Print the transcript to stdout
    pub fn print(&self) {
        for line in &self.transcript {
            println!("{}", line);
        }
    }
}

/// Build the mock router for a scenario
pub fn build_router(scenario: &TestScenario, options: &RunOptions) -> Result<MockRouter> {
    let upstream = scenario.upstream.clone().or_else(|| options.upstream.clone());
    let mut router = match upstream {
        Some(base) => {
            tracing::debug!(upstream = %base, "Unmocked requests pass through");
            MockRouter::with_upstream(Arc::new(HttpTransport::new(
                Some(base),
                options.request_timeout,
            )?))
        }
        None => MockRouter::new(),
    };

    for mock in &scenario.mocks {
        router.route(&mock.url, mock.method()?, mock.responder()?)?;
    }
    Ok(router)
}

/// Run a test scenario from a YAML file
pub async fn run_scenario(path: &Path, options: &RunOptions) -> Result<TestResult> {
    let scenario = TestScenario::from_file(path)?;
    run(scenario, options).await
}

/// Run a parsed scenario
pub async fn run(scenario: TestScenario, options: &RunOptions) -> Result<TestResult> {
    let steps_total = scenario.steps.len();
    let mut transcript = vec![format!(
        "\n{} {}",
        "Running Test:".blue().bold(),
        scenario.name.white().bold()
    )];
    if let Some(desc) = &scenario.description {
        transcript.push(format!("  {}", desc.dimmed()));
    }

    let router = Arc::new(build_router(&scenario, options)?);
    if options.verbose {
        transcript.push(format!("\n{} {} route(s)", "Mocks:".cyan(), router.len()));
        for mock in &scenario.mocks {
            transcript.push(format!(
                "  {} {}",
                mock.method.as_deref().unwrap_or("*").dimmed(),
                mock.url
            ));
        }
    }

    let mut storefront = Storefront::new(router.clone(), &options.api_base);
    transcript.push(format!("\n{}", "Steps:".cyan()));

    for (i, step) in scenario.steps.iter().enumerate() {
        let step_num = i + 1;
        tracing::debug!(scenario = %scenario.name, step = step_num, "{}", step.describe());

        match execute_step(&mut storefront, step, options).await {
            Ok(()) => {
                transcript.push(format!(
                    "  {} Step {}: {}",
                    "✓".green(),
                    step_num,
                    step.describe().dimmed()
                ));
            }
            Err(e) => {
                let category = e.category();
                transcript.push(format!(
                    "  {} Step {}: {} [{}]",
                    "✗".red(),
                    step_num,
                    e,
                    category
                ));
                if options.verbose {
                    push_journal(&mut transcript, &router);
                }
                transcript.push(format!(
                    "\n{} {}\n",
                    "✗".red().bold(),
                    "Test Failed".red().bold()
                ));
                return Ok(TestResult {
                    name: scenario.name,
                    passed: false,
                    steps_run: step_num,
                    steps_total,
                    error: Some(e.to_string()),
                    category: Some(category),
                    transcript,
                });
            }
        }
    }

    if options.verbose {
        push_journal(&mut transcript, &router);
    }
    transcript.push(format!(
        "\n{} {}\n",
        "✓".green().bold(),
        "Test Passed".green().bold()
    ));

    Ok(TestResult {
        name: scenario.name,
        passed: true,
        steps_run: steps_total,
        steps_total,
        error: None,
        category: None,
        transcript,
    })
}

fn push_journal(transcript: &mut Vec<String>, router: &MockRouter) {
    transcript.push(format!("\n{}", "Requests:".cyan()));
    for exchange in router.journal() {
        transcript.push(format!(
            "  {} {} {}",
            exchange.method,
            exchange.url,
            format!("{:?}", exchange.outcome).dimmed()
        ));
    }
}

/// Execute a single test step
async fn execute_step(
    storefront: &mut Storefront,
    step: &TestStep,
    options: &RunOptions,
) -> Result<()> {
    match step {
        TestStep::Goto { path } => {
            let path = path
                .strip_prefix(options.page_origin.trim_end_matches('/'))
                .unwrap_or(path);
            storefront.goto(path).await
        }
        TestStep::Click { target } => storefront.click(target).await,
        TestStep::Fill { target, value } => storefront.fill(target, value),
        TestStep::Press { target, key } => storefront.press(target, key),
        TestStep::SelectOption { target, value } => storefront.select_option(target, value),
        TestStep::ExpectText { target, contains } => storefront.expect_text(target, contains),
        TestStep::ExpectVisible { target } => storefront.expect_visible(target),
        TestStep::ExpectHidden { target } => storefront.expect_hidden(target),
    }
}

/// Run scenario files with up to `jobs` in flight, results in input order
///
/// A file that cannot be loaded counts as a failed scenario.
pub async fn run_suite(paths: &[PathBuf], options: &RunOptions, jobs: usize) -> Vec<TestResult> {
    stream::iter(paths.iter().map(|path| async move {
        match run_scenario(path, options).await {
            Ok(result) => result,
            Err(e) => load_failure(path, e),
        }
    }))
    .buffered(jobs.max(1))
    .collect()
    .await
}

fn load_failure(path: &Path, error: Error) -> TestResult {
    let name = path.display().to_string();
    TestResult {
        transcript: vec![format!(
            "\n{} {}: {}",
            "✗".red().bold(),
            name.white().bold(),
            error
        )],
        name,
        passed: false,
        steps_run: 0,
        steps_total: 0,
        error: Some(error.to_string()),
        category: Some(error.category()),
    }
}

/// Expand directories into the `.yaml`/`.yml` files they contain, sorted
pub fn collect_scenarios(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut found: Vec<PathBuf> = std::fs::read_dir(path)?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| {
                    p.extension()
                        .and_then(|ext| ext.to_str())
                        .is_some_and(|ext| ext == "yaml" || ext == "yml")
                })
                .collect();
            found.sort();
            files.extend(found);
        } else {
            files.push(path.clone());
        }
    }
    if files.is_empty() {
        return Err(Error::Config("No test scenarios found".to_string()));
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_contract_failure_is_reported() {
        let scenario = TestScenario::from_yaml(
            r#"
name: wrong login body
mocks:
  - url: "*/**/api/auth"
    expect:
      method: PUT
      body: { email: d@jwt.com, password: a }
    respond:
      - json: { user: { id: 3, name: Kai Chen, email: d@jwt.com, roles: [] }, token: abcdef }
steps:
  - action: goto
    path: /login
  - action: fill
    target: { placeholder: Email address }
    value: d@jwt.com
  - action: fill
    target: { placeholder: Password }
    value: wrong
  - action: click
    target: { role: button, name: Login }
"#,
        )
        .unwrap();

        let result = run(scenario, &RunOptions::default()).await.unwrap();
        assert!(!result.passed);
        assert_eq!(result.category, Some("contract"));
        assert_eq!(result.steps_run, 4);
    }

    #[tokio::test]
    async fn test_ui_failure_is_reported() {
        let scenario = TestScenario::from_yaml(
            r#"
name: missing text
steps:
  - action: goto
    path: http://localhost:5173/about
  - action: expect_visible
    target: { text: Mama Rucci }
"#,
        )
        .unwrap();

        let result = run(scenario, &RunOptions::default()).await.unwrap();
        assert!(!result.passed);
        assert_eq!(result.category, Some("ui"));
        assert!(result.error.unwrap().contains("/about"));
    }

    #[tokio::test]
    async fn test_missing_file_fails_in_suite() {
        let results = run_suite(
            &[PathBuf::from("/nonexistent/scenario.yaml")],
            &RunOptions::default(),
            2,
        )
        .await;
        assert_eq!(results.len(), 1);
        assert!(!results[0].passed);
        assert_eq!(results[0].category, Some("config"));
    }

    #[test]
    fn test_collect_scenarios_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.yaml"), "name: b\nsteps: []\n").unwrap();
        std::fs::write(dir.path().join("a.yml"), "name: a\nsteps: []\n").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "").unwrap();

        let files = collect_scenarios(&[dir.path().to_path_buf()]).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.yml", "b.yaml"]);
    }
}
