//! Per-endpoint middleware chain.
//!
//! Endpoints name the middleware they want in their `middleware` list. The
//! route builder resolves those names against a [`MiddlewareRegistry`] and
//! the proxy runs the resolved chain, in declaration order, before the
//! request is rewritten and forwarded. Any middleware may answer the request
//! itself, which stops the chain.
//!
//! The default registry is empty: rate-limit and CORS settings are carried
//! in the configuration but nothing enforces them unless a middleware for
//! them is registered.

use axum::body::Body;
use axum::http::{Request, Response};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::proxy::EndpointMeta;

/// Outcome of one middleware step.
pub enum Flow {
    /// Pass the (possibly modified) request to the next step.
    Continue(Request<Body>),
    /// Answer the caller directly; the backend is not contacted.
    Respond(Response<Body>),
}

pub trait Middleware: Send + Sync + 'static {
    fn name(&self) -> &str;

    fn handle(&self, request: Request<Body>, endpoint: &EndpointMeta) -> Flow;
}

/// Named middleware available to endpoints.
#[derive(Clone, Default)]
pub struct MiddlewareRegistry {
    entries: HashMap<String, Arc<dyn Middleware>>,
}

impl MiddlewareRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a middleware under its own name, replacing any previous one.
    pub fn register(&mut self, middleware: impl Middleware) -> &mut Self {
        self.entries
            .insert(middleware.name().to_string(), Arc::new(middleware));
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Middleware>> {
        self.entries.get(name).cloned()
    }

    /// Resolve `names` in order. Returns the chain and the unknown names.
    pub fn resolve(&self, names: &[String]) -> (MiddlewareChain, Vec<String>) {
        let mut chain = Vec::with_capacity(names.len());
        let mut unknown = Vec::new();
        for name in names {
            match self.get(name) {
                Some(m) => chain.push(m),
                None => unknown.push(name.clone()),
            }
        }
        (MiddlewareChain(chain), unknown)
    }
}

impl fmt::Debug for MiddlewareRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.entries.keys().collect();
        names.sort();
        f.debug_struct("MiddlewareRegistry").field("names", &names).finish()
    }
}

/// Ordered middleware for one endpoint.
#[derive(Clone, Default)]
pub struct MiddlewareChain(Vec<Arc<dyn Middleware>>);

impl MiddlewareChain {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.0.iter().map(|m| m.name()).collect()
    }

    pub fn run(&self, mut request: Request<Body>, endpoint: &EndpointMeta) -> Flow {
        for middleware in &self.0 {
            match middleware.handle(request, endpoint) {
                Flow::Continue(next) => request = next,
                Flow::Respond(response) => {
                    tracing::debug!(middleware = middleware.name(), "Middleware answered request");
                    return Flow::Respond(response);
                }
            }
        }
        Flow::Continue(request)
    }
}

impl fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
