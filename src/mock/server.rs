//! HTTP front end for a mock router
//!
//! Every incoming request is rebuilt as an absolute URL from the `Host`
//! header and dispatched through the router, so the same route table that
//! backs headless scenarios can back a real client.

use std::future::Future;
use std::io;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::extract::{Request, State};
use axum::http::{header::HOST, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Router;
use serde_json::json;
use tokio::net::TcpListener;

use crate::common::{Error, Result};

use super::message::{ApiRequest, ApiResponse};
use super::router::MockRouter;

/// Largest request body the server will buffer
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Headers recomputed by the server rather than copied from upstream
const HOP_BY_HOP: &[&str] = &["content-length", "transfer-encoding", "connection"];

/// Build the axum application serving `router`
pub fn app(router: Arc<MockRouter>) -> Router {
    Router::new().fallback(handle).with_state(router)
}

/// Serve until the listener fails or ctrl-c is received
pub async fn serve(router: Arc<MockRouter>, listener: TcpListener) -> Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!(%addr, routes = router.len(), "Mock server listening");

    axum::serve(listener, app(router))
        .with_graceful_shutdown(shutdown_on(tokio::signal::ctrl_c()))
        .await?;

    Ok(())
}

/// Resolve once `signal` fires
///
/// If the signal handler cannot be installed the server keeps running
/// until the process is killed.
async fn shutdown_on(signal: impl Future<Output = io::Result<()>>) {
    match signal.await {
        Ok(()) => tracing::info!("Received Ctrl+C, shutting down mock server"),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to listen for Ctrl+C, serving until killed");
            std::future::pending::<()>().await;
        }
    }
}

async fn handle(State(router): State<Arc<MockRouter>>, request: Request) -> Response {
    let intercepted = match intercept(request).await {
        Ok(r) => r,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, &e),
    };

    match router.dispatch(intercepted).await {
        Ok(response) => into_response(response),
        Err(e) if e.is_contract_violation() => error_response(StatusCode::UNPROCESSABLE_ENTITY, &e),
        Err(e) => error_response(StatusCode::BAD_GATEWAY, &e),
    }
}

async fn intercept(request: Request) -> Result<ApiRequest> {
    let (parts, body) = request.into_parts();

    let host = parts
        .headers
        .get(HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("localhost");
    let path = parts
        .uri
        .path_and_query()
        .map(|p| p.as_str())
        .unwrap_or("/");

    let headers = parts
        .headers
        .iter()
        .filter_map(|(n, v)| v.to_str().ok().map(|v| (n.to_string(), v.to_string())))
        .collect();

    let bytes = to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|e| Error::Internal(format!("Failed to read request body: {}", e)))?;

    Ok(ApiRequest {
        method: parts.method,
        url: format!("http://{}{}", host, path),
        headers,
        body: (!bytes.is_empty()).then(|| bytes.to_vec()),
    })
}

fn into_response(response: ApiResponse) -> Response {
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut out = Response::new(Body::from(response.body));
    *out.status_mut() = status;
    for (name, value) in response.headers {
        if HOP_BY_HOP.iter().any(|h| name.eq_ignore_ascii_case(h)) {
            continue;
        }
        if let (Ok(name), Ok(value)) = (
            HeaderName::try_from(name.as_str()),
            HeaderValue::try_from(value.as_str()),
        ) {
            out.headers_mut().insert(name, value);
        }
    }
    out
}

fn error_response(status: StatusCode, error: &Error) -> Response {
    (status, axum::Json(json!({ "message": error.to_string() }))).into_response()
}
