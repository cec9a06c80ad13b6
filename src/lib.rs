//! Pizza harness - load and end-to-end testing for the JWT Pizza service
//!
//! Two independent harnesses share this crate: a ramping virtual-user load
//! driver that replays the login-and-order journey over HTTP, and a
//! scenario runner that drives a headless storefront against mock routes.

pub mod cli;
pub mod commands;
pub mod common;
pub mod fixtures;
pub mod load;
pub mod mock;
pub mod storefront;
pub mod testing;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use mock::{MockRouter, RouteAction};
