//! Error types for the pizza harness
//!
//! Scenario failures are split into two families so a report can tell a
//! broken request contract apart from a storefront that rendered the wrong
//! thing.

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the pizza harness
#[derive(Error, Debug)]
pub enum Error {
    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    #[error("Invalid URL pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    // === HTTP Errors ===
    #[error("HTTP request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Unexpected response from {url}: {message}")]
    UnexpectedResponse { url: String, message: String },

    // === Load Test Errors ===
    #[error("Check '{check}' failed: {detail}")]
    CheckFailed { check: String, detail: String },

    #[error("Load test thresholds crossed: {0}")]
    ThresholdsCrossed(String),

    // === Mock Routing Errors ===
    #[error("Mock contract violated on {method} {url}: {message}")]
    MockContract {
        method: String,
        url: String,
        message: String,
    },

    // === Storefront Errors ===
    #[error("No element matches {0}")]
    ElementNotFound(String),

    #[error("Element {locator} cannot {action}")]
    ElementNotInteractive { locator: String, action: String },

    #[error("Storefront request {method} {path} returned {status}: {message}")]
    Api {
        method: String,
        path: String,
        status: u16,
        message: String,
    },

    // === Test Errors ===
    #[error("Test assertion failed: {0}")]
    TestAssertion(String),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Internal Errors ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an HTTP transport error for a URL
    pub fn http(url: &str, source: reqwest::Error) -> Self {
        Self::Http {
            url: url.to_string(),
            source,
        }
    }

    /// Create a failed check error
    pub fn check_failed(check: &str, detail: &str) -> Self {
        Self::CheckFailed {
            check: check.to_string(),
            detail: detail.to_string(),
        }
    }

    /// Create a mock contract violation for a request
    pub fn mock_contract(method: &str, url: &str, message: impl Into<String>) -> Self {
        Self::MockContract {
            method: method.to_string(),
            url: url.to_string(),
            message: message.into(),
        }
    }

    /// Create a non-interactive element error
    pub fn not_interactive(locator: impl ToString, action: &str) -> Self {
        Self::ElementNotInteractive {
            locator: locator.to_string(),
            action: action.to_string(),
        }
    }

    /// Whether this error came from a responder rejecting a request shape
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Self::MockContract { .. })
    }

    /// Short failure category used in scenario reports
    pub fn category(&self) -> &'static str {
        match self {
            Self::MockContract { .. } => "contract",
            Self::TestAssertion(_)
            | Self::ElementNotFound(_)
            | Self::ElementNotInteractive { .. } => "ui",
            Self::Api { .. } => "backend",
            Self::Config(_) | Self::ConfigParse(_) | Self::InvalidPattern { .. } => "config",
            _ => "internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contract_errors_are_classified_apart_from_ui_errors() {
        let contract = Error::mock_contract("PUT", "http://localhost/api/auth", "body mismatch");
        assert!(contract.is_contract_violation());
        assert_eq!(contract.category(), "contract");

        let ui = Error::TestAssertion("missing text".to_string());
        assert!(!ui.is_contract_violation());
        assert_eq!(ui.category(), "ui");
    }

    #[test]
    fn test_contract_message_names_request() {
        let e = Error::mock_contract("DELETE", "http://x/api/auth", "expected header");
        assert_eq!(
            e.to_string(),
            "Mock contract violated on DELETE http://x/api/auth: expected header"
        );
    }
}
