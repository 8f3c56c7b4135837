//! Shared utilities for integration testing.

#![allow(dead_code)]

use api_gateway::config::{Config, EndpointConfig};
use api_gateway::http::GatewayServer;
use api_gateway::lifecycle::Shutdown;
use api_gateway::proxy::MiddlewareRegistry;
use api_gateway::routing::GatewayRouter;
use axum::body::Body;
use axum::http::{HeaderValue, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Start a backend that answers every request with a JSON description of
/// what it received.
///
/// `/status/{code}` answers with that status instead, plus two
/// `set-cookie` headers and an `x-backend` header.
pub async fn start_echo_backend() -> SocketAddr {
    let app = Router::new()
        .route("/status/{code}", get(status))
        .fallback(echo);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

async fn echo(request: Request<Body>) -> Json<Value> {
    let (parts, body) = request.into_parts();
    let body = axum::body::to_bytes(body, usize::MAX).await.unwrap();

    let mut headers = serde_json::Map::new();
    for name in parts.headers.keys() {
        let values: Vec<Value> = parts
            .headers
            .get_all(name)
            .iter()
            .map(|v| Value::String(v.to_str().unwrap_or_default().to_string()))
            .collect();
        headers.insert(name.as_str().to_string(), Value::Array(values));
    }

    Json(json!({
        "method": parts.method.as_str(),
        "path": parts.uri.path(),
        "query": parts.uri.query(),
        "headers": headers,
        "body": String::from_utf8_lossy(&body),
    }))
}

async fn status(axum::extract::Path(code): axum::extract::Path<u16>) -> Response {
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::OK);
    let mut response = (status, "from backend").into_response();
    let headers = response.headers_mut();
    headers.append("set-cookie", HeaderValue::from_static("a=1"));
    headers.append("set-cookie", HeaderValue::from_static("b=2"));
    headers.insert("x-backend", HeaderValue::from_static("echo"));
    response
}

pub fn endpoint(id: u32, method: &str, path: &str, backend: &str) -> EndpointConfig {
    EndpointConfig {
        id,
        name: format!("endpoint-{id}"),
        method: method.to_string(),
        path: path.to_string(),
        backend: backend.to_string(),
        ..Default::default()
    }
}

pub fn gateway_config(endpoints: Vec<EndpointConfig>) -> Config {
    let mut config = Config::default();
    config.initialized = true;
    config.gateway.name = "test-gateway".to_string();
    config.gateway.endpoints = endpoints;
    config
}

/// A gateway serving on an ephemeral local port.
pub struct TestGateway {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    handle: tokio::task::JoinHandle<()>,
}

impl TestGateway {
    pub async fn start(config: Config) -> Self {
        Self::start_with(config, &MiddlewareRegistry::new()).await
    }

    pub async fn start_with(config: Config, registry: &MiddlewareRegistry) -> Self {
        let router = GatewayRouter::build(&config, registry).unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let shutdown = Shutdown::new();
        let server = GatewayServer::new(Arc::new(config), router);
        let stop = shutdown.clone();
        let handle = tokio::spawn(async move {
            server.run(listener, stop).await.unwrap();
        });

        Self {
            addr,
            shutdown,
            handle,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Trigger shutdown and wait for the server task to finish.
    pub async fn stop(self) {
        self.shutdown.trigger();
        let _ = self.handle.await;
    }
}
