//! Test scenario configuration types
//!
//! Defines the data structures for deserializing YAML test scenarios.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::common::{Error, Result};
use crate::mock::{ApiResponse, CannedResponder, Method, RequestExpectation};
use crate::storefront::Locator;

/// A complete test scenario loaded from a YAML file
#[derive(Deserialize, Debug)]
pub struct TestScenario {
    /// Name of the test scenario
    pub name: String,
    /// Optional description of what the test verifies
    pub description: Option<String>,
    /// Base URL unmocked requests are forwarded to; unset means they get a 404
    pub upstream: Option<String>,
    /// Routes installed before the first step, in precedence order
    #[serde(default)]
    pub mocks: Vec<MockSpec>,
    /// The sequence of test steps to execute
    pub steps: Vec<TestStep>,
}

impl TestScenario {
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse test scenario: {}", e)))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read test scenario '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_yaml(&content)
    }
}

/// A mock route
#[derive(Deserialize, Debug)]
pub struct MockSpec {
    /// URL glob, e.g. `*/**/api/franchise/*`
    pub url: String,
    /// Only intercept this method; other methods fall through to later routes
    pub method: Option<String>,
    /// Request shape the route insists on
    pub expect: Option<ExpectSpec>,
    /// Responses for the 1st, 2nd, ... matching request; the last repeats.
    /// An empty list falls back to later routes.
    #[serde(default)]
    pub respond: Vec<ResponseSpec>,
}

impl MockSpec {
    pub fn method(&self) -> Result<Option<Method>> {
        self.method.as_deref().map(parse_method).transpose()
    }

    /// Build the responder for this route
    pub fn responder(&self) -> Result<CannedResponder> {
        let responses = self.respond.iter().map(ResponseSpec::to_response).collect();
        let mut responder = CannedResponder::sequence(responses);
        if let Some(expect) = &self.expect {
            responder = responder.expect(expect.to_expectation()?);
        }
        Ok(responder)
    }
}

/// Assertions on an intercepted request
#[derive(Deserialize, Debug)]
pub struct ExpectSpec {
    /// Expected method
    pub method: Option<String>,
    /// JSON the body must contain (object subset)
    pub body: Option<Value>,
    /// Header name to substring the value must contain
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl ExpectSpec {
    fn to_expectation(&self) -> Result<RequestExpectation> {
        let mut expectation = RequestExpectation::default();
        if let Some(method) = &self.method {
            expectation = expectation.method(parse_method(method)?);
        }
        if let Some(body) = &self.body {
            expectation = expectation.body(body.clone());
        }
        for (name, contains) in &self.headers {
            expectation = expectation.header(name.clone(), contains.clone());
        }
        Ok(expectation)
    }
}

/// A canned response
#[derive(Deserialize, Debug)]
pub struct ResponseSpec {
    #[serde(default = "default_status")]
    pub status: u16,
    /// JSON body
    pub json: Option<Value>,
    /// Plain text body, used when `json` is absent
    pub text: Option<String>,
}

fn default_status() -> u16 {
    200
}

impl ResponseSpec {
    fn to_response(&self) -> ApiResponse {
        let response = match (&self.json, &self.text) {
            (Some(json), _) => ApiResponse::json(json),
            (None, Some(text)) => ApiResponse::text(text.clone()),
            (None, None) => ApiResponse::json(&Value::Object(Default::default())),
        };
        response.with_status(self.status)
    }
}

fn parse_method(method: &str) -> Result<Method> {
    Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .map_err(|_| Error::Config(format!("Invalid HTTP method: {}", method)))
}

/// A single test step in the execution flow
#[derive(Deserialize, Debug)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TestStep {
    /// Navigate to a path (or a URL under the page origin)
    Goto { path: String },
    /// Click the first matching element
    Click { target: Locator },
    /// Type into a text input
    Fill { target: Locator, value: String },
    /// Press a key on an element
    Press { target: Locator, key: String },
    /// Choose an option of a select by value or label
    SelectOption { target: Locator, value: String },
    /// Some matching element's text contains a substring
    ExpectText { target: Locator, contains: String },
    /// At least one element matches
    ExpectVisible { target: Locator },
    /// No element matches
    ExpectHidden { target: Locator },
}

impl TestStep {
    /// One-line description used in the transcript
    pub fn describe(&self) -> String {
        match self {
            Self::Goto { path } => format!("goto {}", path),
            Self::Click { target } => format!("click {}", target),
            Self::Fill { target, value } => format!("fill {} with '{}'", target, value),
            Self::Press { target, key } => format!("press {} on {}", key, target),
            Self::SelectOption { target, value } => format!("select '{}' in {}", value, target),
            Self::ExpectText { target, contains } => {
                format!("expect {} to contain '{}'", target, contains)
            }
            Self::ExpectVisible { target } => format!("expect {} visible", target),
            Self::ExpectHidden { target } => format!("expect {} hidden", target),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storefront::Role;

    #[test]
    fn test_parse_scenario() {
        let scenario = TestScenario::from_yaml(
            r#"
name: admin
mocks:
  - url: "*/**/api/franchise"
    method: get
    respond:
      - json: [{ id: 1, name: base, stores: [] }]
      - json: [{ id: 2, name: test, stores: [] }]
  - url: "*/**/api/franchise"
    method: POST
    expect:
      body: { name: test, admins: [{ email: a@jwt.com }] }
      headers:
        authorization: Bearer abcdef
    respond:
      - json: { id: 2, name: test }
steps:
  - action: goto
    path: /
  - action: click
    target: { role: link, name: Franchise, within: { label: Global } }
  - action: expect_text
    target: { tag: h2 }
    contains: Awesome
"#,
        )
        .unwrap();

        assert_eq!(scenario.mocks.len(), 2);
        assert_eq!(scenario.mocks[0].method().unwrap(), Some(Method::GET));
        assert_eq!(scenario.mocks[0].respond.len(), 2);
        assert_eq!(scenario.mocks[1].respond[0].status, 200);
        assert!(scenario.mocks[1].responder().is_ok());

        match &scenario.steps[1] {
            TestStep::Click { target } => {
                assert_eq!(target.role, Some(Role::Link));
                assert_eq!(target.within.as_ref().unwrap().label.as_deref(), Some("Global"));
            }
            other => panic!("unexpected step {:?}", other),
        }
    }

    #[test]
    fn test_unknown_locator_field_is_rejected() {
        let result = TestScenario::from_yaml(
            r#"
name: bad
steps:
  - action: click
    target: { css: "div > a" }
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_method() {
        let spec = MockSpec {
            url: "*/**/api/auth".to_string(),
            method: Some("FE TCH".to_string()),
            expect: None,
            respond: Vec::new(),
        };
        assert!(spec.method().is_err());
    }

    #[test]
    fn test_describe_step() {
        let step = TestStep::Fill {
            target: Locator::placeholder("Password"),
            value: "a".to_string(),
        };
        assert_eq!(step.describe(), "fill [placeholder=\"Password\"] with 'a'");
    }
}
