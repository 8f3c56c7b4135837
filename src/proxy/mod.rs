//! Request forwarding subsystem.
//!
//! # Data Flow
//! ```text
//! Matched route (method + path)
//!     → forwarder.rs (request span, middleware chain)
//!     → forwarder.rs (rewrite to backend origin, X-Forwarded-For)
//!     → shared reqwest client (streamed body, no timeout, no retry)
//!     → forwarder.rs (relay status + headers + streamed body, or 500)
//! ```
//!
//! # Design Decisions
//! - One outbound client shared by every endpoint
//! - Redirects are relayed to the caller, not followed
//! - All transport failures look the same to the caller

pub mod backend;
pub mod forwarder;
pub mod middleware;

pub use backend::{BackendError, BackendOrigin};
pub use forwarder::{EndpointProxy, INTERNAL_ERROR_BODY};
pub use middleware::{Flow, Middleware, MiddlewareChain, MiddlewareRegistry};

use crate::config::EndpointConfig;

/// Endpoint identity carried into request logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointMeta {
    pub id: u32,
    pub name: String,
    pub method: String,
}

impl EndpointMeta {
    pub fn from_config(endpoint: &EndpointConfig) -> Self {
        Self {
            id: endpoint.id,
            name: endpoint.name.clone(),
            method: endpoint.method.clone(),
        }
    }
}

/// Build the outbound client shared by all endpoints.
pub fn build_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .no_proxy()
        .build()
}
