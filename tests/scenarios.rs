//! Runs the shipped YAML scenarios against the headless storefront

use std::path::{Path, PathBuf};
use std::sync::Arc;

use pizza_harness::mock::Method;
use pizza_harness::storefront::{Locator, Role, Storefront};
use pizza_harness::testing::{self, build_router, run_suite, RunOptions, TestScenario};

fn scenario_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("scenarios")
        .join(name)
}

async fn assert_passes(name: &str) {
    let result = testing::run_scenario(&scenario_path(name), &RunOptions::default())
        .await
        .expect("scenario should load");
    if !result.passed {
        result.print();
    }
    assert!(
        result.passed,
        "{} failed at step {}: {:?}",
        result.name, result.steps_run, result.error
    );
    assert_eq!(result.steps_run, result.steps_total);
}

#[tokio::test]
async fn test_purchase_with_login() {
    assert_passes("purchase_with_login.yaml").await;
}

#[tokio::test]
async fn test_static_pages() {
    assert_passes("static_pages.yaml").await;
}

#[tokio::test]
async fn test_register_and_logout() {
    assert_passes("register_and_logout.yaml").await;
}

#[tokio::test]
async fn test_admin_create_franchise() {
    assert_passes("admin_create_franchise.yaml").await;
}

#[tokio::test]
async fn test_create_store() {
    assert_passes("create_store.yaml").await;
}

#[tokio::test]
async fn test_suite_runs_in_parallel() {
    let files = testing::collect_scenarios(&[scenario_path("")]).unwrap();
    assert_eq!(files.len(), 5);

    let results = run_suite(&files, &RunOptions::default(), 3).await;
    assert_eq!(results.len(), 5);
    assert!(results.iter().all(|r| r.passed));
}

#[tokio::test]
async fn test_logout_carries_registration_token() {
    let scenario = TestScenario::from_file(&scenario_path("register_and_logout.yaml")).unwrap();
    let router = Arc::new(build_router(&scenario, &RunOptions::default()).unwrap());

    let mut storefront = Storefront::new(router.clone(), "http://localhost:3000");
    storefront.goto("/register").await.unwrap();
    for (placeholder, value) in [("Full name", "a"), ("Email address", "d@jwt.com"), ("Password", "a")] {
        storefront.fill(&Locator::placeholder(placeholder), value).unwrap();
    }
    storefront
        .click(&Locator::role(Role::Button, "Register"))
        .await
        .unwrap();
    assert_eq!(storefront.token(), Some("abcdef"));

    storefront.goto("/logout").await.unwrap();
    assert_eq!(storefront.token(), None);
    assert_eq!(storefront.path(), "/");
    assert_eq!(router.requests_to(&Method::DELETE, "/api/auth"), 1);
}

#[tokio::test]
async fn test_wrong_order_body_is_a_contract_failure() {
    let yaml = std::fs::read_to_string(scenario_path("purchase_with_login.yaml"))
        .unwrap()
        .replace("storeId: \"4\"\n        franchiseId: 2", "storeId: \"5\"\n        franchiseId: 2");
    let scenario = TestScenario::from_yaml(&yaml).unwrap();

    let result = testing::run(scenario, &RunOptions::default()).await.unwrap();
    assert!(!result.passed);
    assert_eq!(result.category, Some("contract"));
    assert!(result.error.unwrap().contains("storeId"));
}
