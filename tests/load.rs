//! Load driver against the in-memory pizza service over real HTTP

use std::sync::Arc;
use std::time::Duration;

use pizza_harness::common::config::{Config, Thresholds};
use pizza_harness::fixtures::pizza_service;
use pizza_harness::load::{LoadTest, Stage};
use pizza_harness::mock::{server, Method, MockRouter};
use tokio::net::TcpListener;

async fn spawn_service() -> (String, Arc<MockRouter>) {
    let router = Arc::new(pizza_service().unwrap());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let app = server::app(Arc::clone(&router));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (base, router)
}

fn quick_config(base: &str) -> Config {
    let mut config = Config::default();
    config.targets.site_url = base.to_string();
    config.targets.service_url = base.to_string();
    config.targets.factory_url = base.to_string();
    config.load.stages = vec![
        Stage::new(2, Duration::from_millis(100)),
        Stage::new(2, Duration::from_millis(300)),
    ];
    config.load.think_time_scale = 0.0;
    config.load.graceful_stop = Duration::from_secs(5);
    config.load.graceful_ramp_down = Duration::from_secs(5);
    config.load.tick = Duration::from_millis(10);
    config.load.request_timeout = Duration::from_secs(5);
    config
}

#[tokio::test]
async fn test_login_and_order_journey() {
    let (base, router) = spawn_service().await;
    let report = LoadTest::new(quick_config(&base)).run(false).await.unwrap();

    assert!(report.passed());
    assert!(report.iterations.completed > 0);
    assert_eq!(report.iterations.failed, 0);
    assert_eq!(report.iterations.interrupted, 0);
    assert_eq!(report.vus_max, 2);
    assert_eq!(report.checks_pass_rate(), Some(1.0));

    let group = format!("Login and order - {}/", base);
    assert!(report.checks.iter().all(|c| c.group == group));
    for name in ["navigate", "login", "menu", "franchise", "order", "verify"] {
        let request = report
            .requests
            .iter()
            .find(|r| r.name == name)
            .unwrap_or_else(|| panic!("no {} requests", name));
        assert_eq!(request.failures, 0, "{} had failures", name);
    }

    let orders = router.requests_to(&Method::POST, "/api/order");
    assert_eq!(orders as u64, report.iterations.completed);
}

#[tokio::test]
async fn test_failed_login_stops_the_iteration() {
    let (base, router) = spawn_service().await;
    let mut config = quick_config(&base);
    config.credentials.password = "wrong".to_string();
    config.load.thresholds = Thresholds {
        checks_min_pass_rate: Some(0.99),
        max_failed_iterations: None,
    };

    let report = LoadTest::new(config).run(false).await.unwrap();

    assert_eq!(report.iterations.completed, 0);
    assert!(report.iterations.failed > 0);
    assert!(!report.passed());
    assert_eq!(report.checks_pass_rate(), Some(0.0));

    assert!(router.requests_to(&Method::PUT, "/api/auth") > 0);
    assert_eq!(router.requests_to(&Method::GET, "/api/order/menu"), 0);
    assert_eq!(router.requests_to(&Method::GET, "/api/franchise"), 0);
    assert_eq!(router.requests_to(&Method::POST, "/api/order"), 0);
    assert_eq!(router.requests_to(&Method::POST, "/api/order/verify"), 0);
}

#[tokio::test]
async fn test_verbatim_verify_body_is_rejected_but_counted() {
    let (base, router) = spawn_service().await;
    let mut config = quick_config(&base);
    config.load.verify_body = pizza_harness::common::config::VerifyBody::Verbatim;

    let report = LoadTest::new(config).run(false).await.unwrap();

    let verify = report.requests.iter().find(|r| r.name == "verify").unwrap();
    assert_eq!(verify.failures, verify.count);
    assert_eq!(report.iterations.failed, 0);
    assert!(router.requests_to(&Method::POST, "/api/order/verify") > 0);
}
