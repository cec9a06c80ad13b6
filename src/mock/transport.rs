//! Request transports
//!
//! A [`Transport`] turns an [`ApiRequest`] into an [`ApiResponse`]. The mock
//! router is one; the upstream it passes unmatched requests to is another.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use crate::common::{join_url, Error, Result};

use super::message::{split_origin, ApiRequest, ApiResponse};

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse>;
}

/// Upstream used when no real backend is configured
///
/// Answers every request with a 404 so an unmocked call shows up as a
/// backend error rather than hanging.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unrouted;

#[async_trait]
impl Transport for Unrouted {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        tracing::debug!(method = %request.method, url = %request.url, "No route for request");
        Ok(ApiResponse::json(&json!({ "message": "unknown endpoint" })).with_status(404))
    }
}

/// Forwards requests over HTTP
///
/// With a base URL set, the request's origin is replaced by the base, so a
/// storefront request for `http://localhost:3000/api/order` can be served
/// by a backend elsewhere.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base: Option<String>,
}

impl HttpTransport {
    pub fn new(base: Option<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client, base })
    }

    fn target_url(&self, url: &str) -> String {
        match &self.base {
            Some(base) => {
                let (_, rest) = split_origin(url);
                join_url(base, rest)
            }
            None => url.to_string(),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let url = self.target_url(&request.url);
        tracing::debug!(method = %request.method, url = %url, "Forwarding request");

        let mut builder = self.client.request(request.method.clone(), &url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| Error::http(&url, e))?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(n, v)| v.to_str().ok().map(|v| (n.to_string(), v.to_string())))
            .collect();
        let body = response.bytes().await.map_err(|e| Error::http(&url, e))?;

        Ok(ApiResponse {
            status,
            headers,
            body: body.to_vec(),
        })
    }
}
