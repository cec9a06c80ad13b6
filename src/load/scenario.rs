//! Load scenarios and the virtual user they run on

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;

use crate::common::config::{Config, Credentials, Targets, VerifyBody};
use crate::common::{join_url, Error, Result};

use super::metrics::Metrics;

/// Order placed by every iteration
pub const ORDER_BODY: &str =
    r#"{"items":[{"menuId":1,"description":"Veggie","price":0.0038}],"storeId":"1","franchiseId":1}"#;

/// Name of the login status check
pub const LOGIN_CHECK: &str = "status equals 200";

/// Response as seen by a scenario
///
/// A transport failure is reported as status 0 with an empty body, so the
/// journey continues the same way it does after an error status.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    /// String field of a JSON body, or `"undefined"` when absent
    pub fn json_field(&self, field: &str) -> String {
        serde_json::from_str::<Value>(&self.body)
            .ok()
            .and_then(|v| v.get(field).and_then(Value::as_str).map(str::to_string))
            .unwrap_or_else(|| "undefined".to_string())
    }
}

/// One simulated client
pub struct VirtualUser {
    pub id: usize,
    /// Iterations started by this VU, 1-based while one is running
    pub iteration: u64,
    /// Values carried from one response to later requests of an iteration
    pub vars: HashMap<String, String>,
    client: reqwest::Client,
    metrics: Arc<Metrics>,
    group: String,
}

impl VirtualUser {
    pub fn new(id: usize, client: reqwest::Client, metrics: Arc<Metrics>) -> Self {
        Self {
            id,
            iteration: 0,
            vars: HashMap::new(),
            client,
            metrics,
            group: String::new(),
        }
    }

    /// Tag subsequent checks and requests with a group name
    pub fn group(&mut self, name: impl Into<String>) {
        self.group = name.into();
    }

    pub fn var(&self, name: &str) -> &str {
        self.vars.get(name).map(String::as_str).unwrap_or("undefined")
    }

    /// Issue one request and record its timing
    pub async fn send(
        &self,
        name: &str,
        method: Method,
        url: &str,
        headers: &[(&str, String)],
        body: Option<String>,
    ) -> HttpResponse {
        let mut request = self.client.request(method.clone(), url);
        for (header, value) in headers {
            request = request.header(*header, value.as_str());
        }
        if let Some(body) = body {
            request = request.body(body);
        }

        let started = Instant::now();
        let outcome = async {
            let response = request.send().await?;
            let status = response.status().as_u16();
            let body = response.text().await?;
            Ok::<_, reqwest::Error>(HttpResponse { status, body })
        }
        .await;
        let elapsed = started.elapsed();

        let response = match outcome {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(vu = self.id, %method, url, error = %Error::http(url, e), "Request failed");
                HttpResponse {
                    status: 0,
                    body: String::new(),
                }
            }
        };

        let failed = !(200..300).contains(&response.status);
        tracing::debug!(vu = self.id, request = name, status = response.status, ?elapsed, "Response");
        self.metrics.record_request(&self.group, name, elapsed, failed);
        response
    }

    /// Record a check result and return whether it passed
    pub fn check(&self, name: &str, passed: bool) -> bool {
        self.metrics.record_check(&self.group, name, passed);
        passed
    }
}

/// A user journey the executor runs in a loop
#[async_trait]
pub trait Scenario: Send + Sync {
    fn name(&self) -> &str;

    /// Run one iteration; an error fails this iteration only
    async fn iteration(&self, vu: &mut VirtualUser) -> Result<()>;
}

/// Resolve a scenario by name
pub fn by_name(name: &str, config: &Config) -> Result<Arc<dyn Scenario>> {
    match name {
        "login_and_order" => Ok(Arc::new(LoginAndOrder::new(config))),
        other => Err(Error::Config(format!(
            "unknown scenario '{}' (available: login_and_order)",
            other
        ))),
    }
}

/// Pauses between the journey's steps
#[derive(Debug, Clone, Copy)]
pub struct ThinkTimes {
    pub after_navigate: Duration,
    pub after_login: Duration,
    pub after_menu: Duration,
    pub after_order: Duration,
}

impl ThinkTimes {
    pub fn scaled(scale: f64) -> Self {
        let secs = |s: f64| Duration::from_secs_f64(s * scale);
        Self {
            after_navigate: secs(34.5),
            after_login: secs(3.6),
            after_menu: secs(6.5),
            after_order: secs(1.6),
        }
    }
}

async fn think(pause: Duration) {
    if !pause.is_zero() {
        tokio::time::sleep(pause).await;
    }
}

#[derive(Serialize)]
struct LoginBody<'a> {
    email: &'a str,
    password: &'a str,
}

/// Navigate, log in, browse the menu and franchises, order, verify
pub struct LoginAndOrder {
    targets: Targets,
    credentials: Credentials,
    think: ThinkTimes,
    verify_body: VerifyBody,
}

impl LoginAndOrder {
    pub fn new(config: &Config) -> Self {
        Self {
            targets: config.targets.clone(),
            credentials: config.credentials.clone(),
            think: ThinkTimes::scaled(config.load.think_time_scale),
            verify_body: config.load.verify_body,
        }
    }

    fn site_root(&self) -> String {
        join_url(&self.targets.site_url, "/")
    }

    fn origin(&self) -> String {
        self.targets.site_url.trim_end_matches('/').to_string()
    }

    fn verify_payload(&self, jwt: &str) -> String {
        match self.verify_body {
            VerifyBody::Json => serde_json::json!({ "jwt": jwt }).to_string(),
            VerifyBody::Verbatim => format!("{{\"jwt\":{}}}", jwt),
        }
    }
}

#[async_trait]
impl Scenario for LoginAndOrder {
    fn name(&self) -> &str {
        "login_and_order"
    }

    async fn iteration(&self, vu: &mut VirtualUser) -> Result<()> {
        vu.group(format!("Login and order - {}", self.site_root()));
        let accept = ("accept", "*/*".to_string());
        let origin = ("origin", self.origin());
        let json = ("content-type", "application/json".to_string());
        let service = |path: &str| join_url(&self.targets.service_url, path);

        vu.send("navigate", Method::GET, &self.site_root(), &[accept.clone()], None)
            .await;
        think(self.think.after_navigate).await;

        let login = serde_json::to_string(&LoginBody {
            email: &self.credentials.email,
            password: &self.credentials.password,
        })?;
        let response = vu
            .send(
                "login",
                Method::PUT,
                &service("/api/auth"),
                &[accept.clone(), json.clone(), origin.clone()],
                Some(login),
            )
            .await;
        if !vu.check(LOGIN_CHECK, response.status == 200) {
            tracing::info!(vu = vu.id, status = response.status, body = %response.body, "Login response");
            return Err(Error::check_failed(LOGIN_CHECK, "Login was *not* 200"));
        }
        vu.vars.insert("token".to_string(), response.json_field("token"));
        think(self.think.after_login).await;

        let bearer = ("authorization", format!("Bearer {}", vu.var("token")));
        vu.send(
            "menu",
            Method::GET,
            &service("/api/order/menu"),
            &[accept.clone(), bearer.clone(), origin.clone()],
            None,
        )
        .await;
        vu.send(
            "franchise",
            Method::GET,
            &service("/api/franchise"),
            &[accept.clone(), bearer.clone(), json.clone(), origin.clone()],
            None,
        )
        .await;
        think(self.think.after_menu).await;

        let response = vu
            .send(
                "order",
                Method::POST,
                &service("/api/order"),
                &[accept.clone(), bearer.clone(), json.clone(), origin.clone()],
                Some(ORDER_BODY.to_string()),
            )
            .await;
        vu.vars.insert("jwt".to_string(), response.json_field("jwt"));
        think(self.think.after_order).await;

        let verify = self.verify_payload(vu.var("jwt"));
        vu.send(
            "verify",
            Method::POST,
            &join_url(&self.targets.factory_url, "/api/order/verify"),
            &[accept, bearer, json, origin],
            Some(verify),
        )
        .await;

        Ok(())
    }
}
