//! Request and response values exchanged with mock routes

use serde::Serialize;
use serde_json::Value;

pub use reqwest::Method;

use crate::common::{Error, Result};

/// An HTTP request as seen by a mock route
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Absolute URL including scheme and host
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl ApiRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Add a header
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Attach a JSON body and the matching content type
    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self> {
        self.body = Some(serde_json::to_vec(body)?);
        Ok(self.header("content-type", "application/json"))
    }

    /// Attach `Authorization: Bearer <token>`
    pub fn bearer(self, token: &str) -> Self {
        self.header("authorization", format!("Bearer {}", token))
    }

    /// Look up a header value, ignoring name case
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Parse the body as JSON; a missing body is `null`
    pub fn json_body(&self) -> Result<Value> {
        match &self.body {
            Some(bytes) if !bytes.is_empty() => Ok(serde_json::from_slice(bytes)?),
            _ => Ok(Value::Null),
        }
    }

    /// URL without query string or fragment
    pub fn url_without_query(&self) -> &str {
        strip_query(&self.url)
    }

    /// Path component of the URL (`/api/auth` for `http://host/api/auth?x`)
    pub fn path(&self) -> &str {
        split_origin(self.url_without_query()).1
    }
}

/// A response produced by a route or an upstream
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl ApiResponse {
    /// A 200 response with a JSON body
    pub fn json(value: &Value) -> Self {
        Self {
            status: 200,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: value.to_string().into_bytes(),
        }
    }

    /// A 200 response with a plain text body
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            headers: vec![("content-type".to_string(), "text/plain; charset=utf-8".to_string())],
            body: body.into().into_bytes(),
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json_body(&self) -> Result<Value> {
        if self.body.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&self.body).map_err(Error::from)
    }
}

/// Strip `?query` and `#fragment` from a URL
pub fn strip_query(url: &str) -> &str {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    &url[..end]
}

/// Split `scheme://host[:port]/path` into origin and path
///
/// A URL without a path yields `/` as the path.
pub fn split_origin(url: &str) -> (&str, &str) {
    let after_scheme = url.find("://").map(|i| i + 3).unwrap_or(0);
    match url[after_scheme..].find('/') {
        Some(i) => url.split_at(after_scheme + i),
        None => (url, "/"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_origin() {
        assert_eq!(
            split_origin("http://localhost:5173/api/auth"),
            ("http://localhost:5173", "/api/auth")
        );
        assert_eq!(split_origin("http://localhost"), ("http://localhost", "/"));
    }

    #[test]
    fn test_path_ignores_query() {
        let req = ApiRequest::new(Method::GET, "http://h/api/franchise?page=1");
        assert_eq!(req.path(), "/api/franchise");
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let req = ApiRequest::new(Method::DELETE, "http://h/api/auth").bearer("abcdef");
        assert_eq!(req.header_value("Authorization"), Some("Bearer abcdef"));
    }

    #[test]
    fn test_missing_body_is_null() {
        let req = ApiRequest::new(Method::GET, "http://h/");
        assert_eq!(req.json_body().unwrap(), Value::Null);
    }
}
