//! Mock HTTP routing
//!
//! Interceptors matched on URL glob and HTTP method that answer with canned
//! JSON, verify request shapes, and pass everything else through to an
//! upstream. Used in-process by the scenario runner and over real HTTP by
//! `pizza-harness serve`.

pub mod expect;
pub mod message;
pub mod pattern;
pub mod responder;
pub mod router;
pub mod server;
pub mod transport;

pub use expect::{json_subset, RequestExpectation};
pub use message::{ApiRequest, ApiResponse, Method};
pub use pattern::UrlPattern;
pub use responder::{from_fn, CannedResponder, Responder, RouteAction, RouteContext, ScenarioState};
pub use router::{Exchange, MockRouter, Outcome};
pub use transport::{HttpTransport, Transport, Unrouted};
