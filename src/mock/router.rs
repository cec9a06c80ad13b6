//! Mock route table
//!
//! Routes are tried in registration order. A route is offered a request
//! when its pattern matches the URL and its method filter (if any) matches
//! the method; the first route that fulfills wins. Routes that fall back
//! pass the request on to later routes; if none fulfills, the upstream
//! answers.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use crate::common::Result;

use super::message::{ApiRequest, ApiResponse, Method};
use super::pattern::UrlPattern;
use super::responder::{Responder, RouteAction, RouteContext, ScenarioState};
use super::transport::{Transport, Unrouted};

/// One registered interceptor
pub struct MockRoute {
    pattern: UrlPattern,
    method: Option<Method>,
    responder: Arc<dyn Responder>,
}

impl MockRoute {
    fn accepts(&self, request: &ApiRequest) -> bool {
        self.method.as_ref().map_or(true, |m| *m == request.method)
            && self.pattern.matches(&request.url)
    }

    fn describe(&self) -> String {
        match &self.method {
            Some(m) => format!("{} {}", m, self.pattern),
            None => format!("* {}", self.pattern),
        }
    }
}

/// How a request was answered
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Fulfilled by the route at this index
    Fulfilled(usize),
    /// Answered by the upstream
    PassedThrough,
    /// The route at this index rejected the request shape
    Rejected(usize),
}

/// Journal entry for one dispatched request
#[derive(Debug, Clone)]
pub struct Exchange {
    pub method: Method,
    pub url: String,
    pub outcome: Outcome,
}

impl Exchange {
    pub fn path(&self) -> &str {
        super::message::split_origin(super::message::strip_query(&self.url)).1
    }
}

/// Ordered set of mock routes with an upstream for everything else
pub struct MockRouter {
    routes: Vec<MockRoute>,
    upstream: Arc<dyn Transport>,
    state: Arc<ScenarioState>,
    calls: Mutex<HashMap<(usize, Method), usize>>,
    totals: Mutex<HashMap<usize, usize>>,
    journal: Mutex<Vec<Exchange>>,
}

impl Default for MockRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRouter {
    /// Router with no routes whose upstream answers 404
    pub fn new() -> Self {
        Self::with_upstream(Arc::new(Unrouted))
    }

    pub fn with_upstream(upstream: Arc<dyn Transport>) -> Self {
        Self {
            routes: Vec::new(),
            upstream,
            state: Arc::new(ScenarioState::default()),
            calls: Mutex::new(HashMap::new()),
            totals: Mutex::new(HashMap::new()),
            journal: Mutex::new(Vec::new()),
        }
    }

    /// Register a route; earlier registrations take precedence
    pub fn route<R>(&mut self, pattern: &str, method: Option<Method>, responder: R) -> Result<&mut Self>
    where
        R: Responder + 'static,
    {
        let route = MockRoute {
            pattern: UrlPattern::new(pattern)?,
            method,
            responder: Arc::new(responder),
        };
        tracing::debug!(route = %route.describe(), index = self.routes.len(), "Registered mock route");
        self.routes.push(route);
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Counters shared by this router's responders
    pub fn state(&self) -> Arc<ScenarioState> {
        Arc::clone(&self.state)
    }

    /// Every request dispatched so far, in arrival order
    pub fn journal(&self) -> Vec<Exchange> {
        self.journal.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Requests whose method and path match
    pub fn requests_to(&self, method: &Method, path: &str) -> usize {
        self.journal()
            .iter()
            .filter(|e| &e.method == method && e.path() == path)
            .count()
    }

    fn context_for(&self, index: usize, method: &Method) -> RouteContext {
        let method_call = {
            let mut calls = self.calls.lock().unwrap_or_else(PoisonError::into_inner);
            let count = calls.entry((index, method.clone())).or_insert(0);
            *count += 1;
            *count
        };
        let call = {
            let mut totals = self.totals.lock().unwrap_or_else(PoisonError::into_inner);
            let count = totals.entry(index).or_insert(0);
            *count += 1;
            *count
        };
        RouteContext {
            route: index,
            method_call,
            call,
            state: Arc::clone(&self.state),
        }
    }

    fn record(&self, request: &ApiRequest, outcome: Outcome) {
        self.journal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Exchange {
                method: request.method.clone(),
                url: request.url.clone(),
                outcome,
            });
    }

    /// Answer a request from the first fulfilling route or the upstream
    ///
    /// A responder that rejects the request shape fails the dispatch with a
    /// contract violation.
    pub async fn dispatch(&self, request: ApiRequest) -> Result<ApiResponse> {
        for (index, route) in self.routes.iter().enumerate() {
            if !route.accepts(&request) {
                continue;
            }

            let ctx = self.context_for(index, &request.method);
            match route.responder.respond(&request, &ctx).await {
                Ok(RouteAction::Fulfill(response)) => {
                    tracing::debug!(
                        method = %request.method,
                        url = %request.url,
                        route = %route.describe(),
                        status = response.status,
                        "Fulfilled"
                    );
                    self.record(&request, Outcome::Fulfilled(index));
                    return Ok(response);
                }
                Ok(RouteAction::Fallback) => {
                    tracing::trace!(route = %route.describe(), "Fallback");
                    continue;
                }
                Ok(RouteAction::Continue) => break,
                Err(e) => {
                    tracing::warn!(route = %route.describe(), error = %e, "Responder rejected request");
                    self.record(&request, Outcome::Rejected(index));
                    return Err(e);
                }
            }
        }

        self.record(&request, Outcome::PassedThrough);
        self.upstream.send(request).await
    }
}

#[async_trait]
impl Transport for MockRouter {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        self.dispatch(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Error;
    use crate::mock::expect::RequestExpectation;
    use crate::mock::responder::{from_fn, CannedResponder};
    use serde_json::json;

    fn get(url: &str) -> ApiRequest {
        ApiRequest::new(Method::GET, url)
    }

    #[tokio::test]
    async fn test_first_registered_route_wins() {
        let mut router = MockRouter::new();
        router
            .route("*/**/api/franchise", None, CannedResponder::json(json!("first")))
            .unwrap()
            .route("*/**/api/franchise", None, CannedResponder::json(json!("second")))
            .unwrap();

        let response = router.dispatch(get("http://localhost:3000/api/franchise")).await.unwrap();
        assert_eq!(response.json_body().unwrap(), json!("first"));
    }

    #[tokio::test]
    async fn test_method_filter_skips_route() {
        let mut router = MockRouter::new();
        router
            .route("*/**/api/auth", Some(Method::POST), CannedResponder::json(json!("register")))
            .unwrap()
            .route("*/**/api/auth", Some(Method::PUT), CannedResponder::json(json!("login")))
            .unwrap();

        let request = ApiRequest::new(Method::PUT, "http://localhost:3000/api/auth");
        let response = router.dispatch(request).await.unwrap();
        assert_eq!(response.json_body().unwrap(), json!("login"));
    }

    #[tokio::test]
    async fn test_fallback_reaches_later_route_then_upstream() {
        let mut router = MockRouter::new();
        router
            .route("*/**/api/franchise/*/store", None, from_fn(|req, _| {
                if req.method == Method::POST {
                    Ok(RouteAction::Fulfill(ApiResponse::json(&json!({ "id": 1 }))))
                } else {
                    Ok(RouteAction::Fallback)
                }
            }))
            .unwrap();

        let created = router
            .dispatch(ApiRequest::new(Method::POST, "http://localhost:3000/api/franchise/2/store"))
            .await
            .unwrap();
        assert_eq!(created.status, 200);

        let unrouted = router
            .dispatch(get("http://localhost:3000/api/franchise/2/store"))
            .await
            .unwrap();
        assert_eq!(unrouted.status, 404);

        let outcomes: Vec<Outcome> = router.journal().into_iter().map(|e| e.outcome).collect();
        assert_eq!(outcomes, vec![Outcome::Fulfilled(0), Outcome::PassedThrough]);
    }

    #[tokio::test]
    async fn test_call_count_switches_payload() {
        let mut router = MockRouter::new();
        router
            .route("*/**/api/franchise", Some(Method::GET), from_fn(|_, ctx| {
                let body = if ctx.is_first() { json!(["base"]) } else { json!(["test"]) };
                Ok(RouteAction::Fulfill(ApiResponse::json(&body)))
            }))
            .unwrap();

        let url = "http://localhost:3000/api/franchise";
        let first = router.dispatch(get(url)).await.unwrap();
        let second = router.dispatch(get(url)).await.unwrap();
        let third = router.dispatch(get(url)).await.unwrap();
        assert_eq!(first.json_body().unwrap(), json!(["base"]));
        assert_eq!(second.json_body().unwrap(), json!(["test"]));
        assert_eq!(third.json_body().unwrap(), json!(["test"]));
    }

    #[tokio::test]
    async fn test_contract_violation_fails_dispatch() {
        let mut router = MockRouter::new();
        router
            .route(
                "*/**/api/auth",
                None,
                CannedResponder::json(json!({ "token": "abcdef" }))
                    .expect(RequestExpectation::default().method(Method::PUT)),
            )
            .unwrap();

        let err = router
            .dispatch(ApiRequest::new(Method::POST, "http://localhost:3000/api/auth"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MockContract { .. }));
        assert_eq!(router.journal()[0].outcome, Outcome::Rejected(0));
    }

    #[tokio::test]
    async fn test_continue_skips_remaining_routes() {
        let mut router = MockRouter::new();
        router
            .route("*/**/api/order", None, from_fn(|_, _| Ok(RouteAction::Continue)))
            .unwrap()
            .route("*/**/api/order", None, CannedResponder::json(json!("unreachable")))
            .unwrap();

        let response = router.dispatch(get("http://localhost:3000/api/order")).await.unwrap();
        assert_eq!(response.status, 404);
        assert_eq!(router.requests_to(&Method::GET, "/api/order"), 1);
    }
}
