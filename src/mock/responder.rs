//! Route responders
//!
//! A responder decides what a matched request gets: a canned response, a
//! fallback to the next matching route, or a pass-through to the upstream.
//! Anything that varies between calls is read from the [`RouteContext`]
//! handed in by the router, never from state captured in the responder.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use serde_json::Value;

use crate::common::Result;

use super::expect::RequestExpectation;
use super::message::{ApiRequest, ApiResponse, Method};

/// What a responder does with a request
#[derive(Debug, Clone)]
pub enum RouteAction {
    /// Answer with this response
    Fulfill(ApiResponse),
    /// Offer the request to the next matching route, then the upstream
    Fallback,
    /// Send the request straight to the upstream
    Continue,
}

/// Named counters shared by all routes of one scenario
#[derive(Debug, Default)]
pub struct ScenarioState {
    counters: Mutex<HashMap<String, usize>>,
}

impl ScenarioState {
    /// Increment a counter and return its new value
    pub fn bump(&self, name: &str) -> usize {
        let mut counters = self.counters.lock().unwrap_or_else(PoisonError::into_inner);
        let value = counters.entry(name.to_string()).or_insert(0);
        *value += 1;
        *value
    }

    pub fn get(&self, name: &str) -> usize {
        self.counters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .copied()
            .unwrap_or(0)
    }
}

/// Call-count information for one dispatch to one route
#[derive(Debug, Clone)]
pub struct RouteContext {
    /// Registration index of the route
    pub route: usize,
    /// 1-based count of requests with this method offered to this route
    pub method_call: usize,
    /// 1-based count of all requests offered to this route
    pub call: usize,
    pub state: Arc<ScenarioState>,
}

impl RouteContext {
    /// Whether this is the first request with this method on this route
    pub fn is_first(&self) -> bool {
        self.method_call == 1
    }
}

/// Produces the outcome for an intercepted request
#[async_trait]
pub trait Responder: Send + Sync {
    async fn respond(&self, request: &ApiRequest, ctx: &RouteContext) -> Result<RouteAction>;
}

/// Responder backed by a plain function or closure
pub struct FnResponder<F>(F);

#[async_trait]
impl<F> Responder for FnResponder<F>
where
    F: Fn(&ApiRequest, &RouteContext) -> Result<RouteAction> + Send + Sync,
{
    async fn respond(&self, request: &ApiRequest, ctx: &RouteContext) -> Result<RouteAction> {
        (self.0)(request, ctx)
    }
}

/// Wrap a closure as a responder
pub fn from_fn<F>(f: F) -> FnResponder<F>
where
    F: Fn(&ApiRequest, &RouteContext) -> Result<RouteAction> + Send + Sync,
{
    FnResponder(f)
}

/// Declarative responder: verify the request, then answer from a sequence
///
/// The n-th request gets the n-th response; once the sequence is exhausted
/// the last response repeats. Requests whose method is not accepted fall
/// back to the next route.
#[derive(Debug, Clone)]
pub struct CannedResponder {
    accepts: Option<Method>,
    expect: RequestExpectation,
    responses: Vec<ApiResponse>,
}

impl CannedResponder {
    /// Always answer with one JSON value
    pub fn json(value: Value) -> Self {
        Self::sequence(vec![ApiResponse::json(&value)])
    }

    /// Answer with successive responses
    pub fn sequence(responses: Vec<ApiResponse>) -> Self {
        Self {
            accepts: None,
            expect: RequestExpectation::default(),
            responses,
        }
    }

    /// Only handle this method; others fall back
    pub fn accepts(mut self, method: Method) -> Self {
        self.accepts = Some(method);
        self
    }

    pub fn expect(mut self, expect: RequestExpectation) -> Self {
        self.expect = expect;
        self
    }
}

#[async_trait]
impl Responder for CannedResponder {
    async fn respond(&self, request: &ApiRequest, ctx: &RouteContext) -> Result<RouteAction> {
        if let Some(method) = &self.accepts {
            if &request.method != method {
                return Ok(RouteAction::Fallback);
            }
        }

        self.expect.verify(request)?;

        let index = ctx.method_call.saturating_sub(1).min(self.responses.len().saturating_sub(1));
        match self.responses.get(index) {
            Some(response) => Ok(RouteAction::Fulfill(response.clone())),
            None => Ok(RouteAction::Fallback),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx(method_call: usize) -> RouteContext {
        RouteContext {
            route: 0,
            method_call,
            call: method_call,
            state: Arc::new(ScenarioState::default()),
        }
    }

    #[tokio::test]
    async fn test_sequence_repeats_last_response() {
        let responder = CannedResponder::sequence(vec![
            ApiResponse::json(&json!(["before"])),
            ApiResponse::json(&json!(["after"])),
        ]);
        let request = ApiRequest::new(Method::GET, "http://h/api/franchise");

        let mut bodies = Vec::new();
        for n in 1..=3 {
            match responder.respond(&request, &ctx(n)).await.unwrap() {
                RouteAction::Fulfill(r) => bodies.push(r.json_body().unwrap()),
                other => panic!("unexpected {:?}", other),
            }
        }

        assert_eq!(bodies, vec![json!(["before"]), json!(["after"]), json!(["after"])]);
    }

    #[tokio::test]
    async fn test_other_methods_fall_back() {
        let responder = CannedResponder::json(json!({})).accepts(Method::POST);
        let request = ApiRequest::new(Method::GET, "http://h/api/franchise/2/store");
        let action = responder.respond(&request, &ctx(1)).await.unwrap();
        assert!(matches!(action, RouteAction::Fallback));
    }

    #[test]
    fn test_scenario_state_counts() {
        let state = ScenarioState::default();
        assert_eq!(state.get("franchise"), 0);
        assert_eq!(state.bump("franchise"), 1);
        assert_eq!(state.bump("franchise"), 2);
        assert_eq!(state.get("franchise"), 2);
    }
}
