//! Per-endpoint request forwarding.
//!
//! # Request lifecycle
//! ```text
//! received ─► rewritten ─► forwarded ─┬─► relayed   (backend answered)
//!                                     └─► failed    (transport error → 500)
//! ```
//!
//! # Design Decisions
//! - Only scheme and authority change; path and query are kept verbatim
//! - `X-Forwarded-For` is overwritten with the immediate caller, not appended
//! - Request and response bodies are streamed, never buffered
//! - Backend headers and status are relayed without filtering
//! - No timeout and no retry on the outbound call

use axum::body::{Body, HttpBody};
use axum::extract::ConnectInfo;
use axum::http::{header, request::Parts, HeaderMap, HeaderValue, Method, Request, Response, StatusCode};
use axum::response::IntoResponse;
use std::net::{IpAddr, SocketAddr};
use tracing::Instrument;
use uuid::Uuid;

use crate::observability::GatewayIdentity;
use crate::proxy::backend::BackendOrigin;
use crate::proxy::middleware::{Flow, MiddlewareChain};
use crate::proxy::EndpointMeta;

pub const X_FORWARDED_FOR: &str = "x-forwarded-for";
pub const X_REQUEST_ID: &str = "x-request-id";

/// Body sent to the caller when the backend cannot be reached.
pub const INTERNAL_ERROR_BODY: &str = "Internal server error";

/// A request rewritten for the backend, minus its body.
#[derive(Debug, Clone)]
pub struct Outbound {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
}

/// Caller address recorded by the listener, without its port.
pub fn client_ip(parts: &Parts) -> Option<IpAddr> {
    parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
}

/// Point a request at `backend`.
///
/// The inbound `Host` header is dropped so the client derives it from the
/// backend authority.
pub fn rewrite(backend: &BackendOrigin, parts: &Parts) -> Outbound {
    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    let mut headers = parts.headers.clone();
    headers.remove(header::HOST);
    if let Some(ip) = client_ip(parts) {
        if let Ok(value) = HeaderValue::from_str(&ip.to_string()) {
            headers.insert(X_FORWARDED_FOR, value);
        }
    }

    Outbound {
        method: parts.method.clone(),
        url: backend.target(path_and_query),
        headers,
    }
}

/// Copy status, headers and a streaming body from the backend response.
pub fn relay(response: reqwest::Response) -> Response<Body> {
    let status = response.status();
    let headers = response.headers().clone();

    let mut relayed = Response::new(Body::from_stream(response.bytes_stream()));
    *relayed.status_mut() = status;
    *relayed.headers_mut() = headers;
    relayed
}

/// The fixed response for a failed forward.
pub fn failure_response() -> Response<Body> {
    (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_BODY).into_response()
}

/// Handler state for one endpoint.
#[derive(Debug)]
pub struct EndpointProxy {
    meta: EndpointMeta,
    backend: BackendOrigin,
    chain: MiddlewareChain,
    client: reqwest::Client,
    gateway: GatewayIdentity,
}

impl EndpointProxy {
    pub fn new(
        meta: EndpointMeta,
        backend: BackendOrigin,
        chain: MiddlewareChain,
        client: reqwest::Client,
        gateway: GatewayIdentity,
    ) -> Self {
        Self {
            meta,
            backend,
            chain,
            client,
            gateway,
        }
    }

    pub fn meta(&self) -> &EndpointMeta {
        &self.meta
    }

    pub fn backend(&self) -> &BackendOrigin {
        &self.backend
    }

    /// Handle one inbound request inside its own request span.
    pub async fn handle(&self, request: Request<Body>) -> Response<Body> {
        let request_id = request
            .headers()
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let span = self.gateway.request_span(
            self.meta.id,
            &self.meta.name,
            &self.meta.method,
            &request_id,
        );
        self.proxy(request).instrument(span).await
    }

    async fn proxy(&self, request: Request<Body>) -> Response<Body> {
        tracing::info!(
            method = %request.method(),
            uri = %request.uri(),
            "New request"
        );

        let request = match self.chain.run(request, &self.meta) {
            Flow::Continue(request) => request,
            Flow::Respond(response) => return response,
        };

        let (parts, body) = request.into_parts();
        let outbound = rewrite(&self.backend, &parts);

        let mut builder = self
            .client
            .request(outbound.method, &outbound.url)
            .headers(outbound.headers);
        if !body.is_end_stream() && body.size_hint().exact() != Some(0) {
            builder = builder.body(reqwest::Body::wrap_stream(body.into_data_stream()));
        }

        match builder.send().await {
            Ok(response) => {
                tracing::debug!(
                    backend = %self.backend,
                    status = response.status().as_u16(),
                    "Backend responded"
                );
                relay(response)
            }
            Err(e) => {
                tracing::error!(
                    backend = %self.backend,
                    url = %outbound.url,
                    error = %e,
                    "Request forwarding failed"
                );
                failure_response()
            }
        }
    }
}
