//! Dispatch table construction.
//!
//! # Responsibilities
//! - Compile each endpoint's path, method and backend
//! - Bind one proxy handler per endpoint
//! - Register handlers under (method, path) through the method table
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Duplicate (method, path) pairs are a build error, never last-wins
//! - Routes the dispatch table cannot hold side by side are a build error,
//!   checked before insertion so registration never panics
//! - Unknown middleware names are logged and skipped
//! - Handlers for the same path share one method router, so a wrong
//!   method on a known path answers 405 and an unknown path answers 404
//! - HEAD is only proxied when an endpoint declares it

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{MethodFilter, MethodRouter};
use axum::Router;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::observability::GatewayIdentity;
use crate::proxy::{
    build_client, BackendError, BackendOrigin, EndpointMeta, EndpointProxy, MiddlewareRegistry,
};
use crate::routing::methods::method_filter;
use crate::routing::pattern::{PatternError, RoutePattern};

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("endpoint {id} '{name}' declares unsupported method '{method}'")]
    UnsupportedMethod { id: u32, name: String, method: String },

    #[error("endpoint {id} '{name}' has an invalid path: {source}")]
    InvalidPath {
        id: u32,
        name: String,
        #[source]
        source: PatternError,
    },

    #[error("endpoint {id} '{name}' has an invalid backend: {source}")]
    InvalidBackend {
        id: u32,
        name: String,
        #[source]
        source: BackendError,
    },

    #[error("endpoint {id} '{name}' registers {method} {path}, already registered by endpoint '{existing}'")]
    DuplicateRoute {
        id: u32,
        name: String,
        method: String,
        path: String,
        existing: String,
    },

    #[error("endpoint {id} '{name}' path '{path}' uses '{ours}' where endpoint '{existing}' uses '{theirs}'")]
    ConflictingRoute {
        id: u32,
        name: String,
        path: String,
        ours: String,
        existing: String,
        theirs: String,
    },

    #[error("failed to build the outbound HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// One registered route, for startup logs and `--check` output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteEntry {
    pub method: String,
    pub path: String,
    pub endpoint_id: u32,
    pub endpoint_name: String,
    pub backend: String,
}

/// Handlers registered under one path.
struct PathHandlers {
    route: String,
    handlers: Vec<(String, MethodFilter, Arc<EndpointProxy>)>,
}

impl PathHandlers {
    fn declares(&self, method: &str) -> bool {
        self.handlers.iter().any(|(m, _, _)| m == method)
    }

    fn into_method_router(self) -> MethodRouter {
        let answers_head = self.declares("GET") && !self.declares("HEAD");
        let allow = self
            .handlers
            .iter()
            .map(|(m, _, _)| m.as_str())
            .collect::<Vec<_>>()
            .join(",");

        let mut method_router = self
            .handlers
            .into_iter()
            .fold(MethodRouter::new(), |mr, (_, filter, proxy)| {
                mr.on(filter, move |request: Request<Body>| async move {
                    proxy.handle(request).await
                })
            });

        // The method router would otherwise serve HEAD with the GET handler.
        if answers_head {
            method_router = method_router.on(MethodFilter::HEAD, move || async move {
                (StatusCode::METHOD_NOT_ALLOWED, [(header::ALLOW, allow)]).into_response()
            });
        }
        method_router
    }
}

/// The live dispatch table.
#[derive(Debug, Clone)]
pub struct GatewayRouter {
    router: Router,
    routes: Vec<RouteEntry>,
}

impl GatewayRouter {
    /// Build the dispatch table for every endpoint in `config`.
    pub fn build(config: &Config, registry: &MiddlewareRegistry) -> Result<Self, BuildError> {
        let client = build_client()?;
        let gateway = GatewayIdentity::from_config(&config.gateway);

        let mut paths: Vec<PathHandlers> = Vec::new();
        let mut registered: Vec<(String, String, RoutePattern)> = Vec::new();
        let mut routes = Vec::with_capacity(config.gateway.endpoints.len());

        for ep in &config.gateway.endpoints {
            let filter = method_filter(&ep.method).ok_or_else(|| BuildError::UnsupportedMethod {
                id: ep.id,
                name: ep.name.clone(),
                method: ep.method.clone(),
            })?;
            let method = ep.method.to_ascii_uppercase();

            let pattern = RoutePattern::parse(&ep.path).map_err(|source| BuildError::InvalidPath {
                id: ep.id,
                name: ep.name.clone(),
                source,
            })?;
            let backend =
                BackendOrigin::parse(&ep.backend).map_err(|source| BuildError::InvalidBackend {
                    id: ep.id,
                    name: ep.name.clone(),
                    source,
                })?;

            if let Some((existing, _, _)) = registered
                .iter()
                .find(|(_, m, p)| *m == method && p.shape() == pattern.shape())
            {
                return Err(BuildError::DuplicateRoute {
                    id: ep.id,
                    name: ep.name.clone(),
                    method,
                    path: ep.path.clone(),
                    existing: existing.clone(),
                });
            }
            if let Some((existing, conflict)) = registered
                .iter()
                .find_map(|(name, _, p)| pattern.conflicts_with(p).map(|c| (name, c)))
            {
                return Err(BuildError::ConflictingRoute {
                    id: ep.id,
                    name: ep.name.clone(),
                    path: ep.path.clone(),
                    ours: conflict.ours,
                    existing: existing.clone(),
                    theirs: conflict.theirs,
                });
            }

            let (chain, unknown) = registry.resolve(&ep.middleware);
            for name in unknown {
                tracing::warn!(
                    endpoint_id = ep.id,
                    endpoint_name = %ep.name,
                    middleware = %name,
                    "Unknown middleware, skipping"
                );
            }

            let mut meta = EndpointMeta::from_config(ep);
            meta.method = method.clone();

            let route = pattern.as_route().to_string();
            routes.push(RouteEntry {
                method: method.clone(),
                path: route.clone(),
                endpoint_id: ep.id,
                endpoint_name: ep.name.clone(),
                backend: backend.to_string(),
            });

            let proxy = Arc::new(EndpointProxy::new(
                meta,
                backend,
                chain,
                client.clone(),
                gateway.clone(),
            ));
            match paths.iter_mut().find(|p| p.route == route) {
                Some(group) => group.handlers.push((method.clone(), filter, proxy)),
                None => paths.push(PathHandlers {
                    route,
                    handlers: vec![(method.clone(), filter, proxy)],
                }),
            }
            registered.push((ep.name.clone(), method, pattern));
        }

        let mut router = Router::new();
        for group in paths {
            let route = group.route.clone();
            router = router.route(&route, group.into_method_router());
        }

        for r in &routes {
            tracing::info!(
                endpoint_id = r.endpoint_id,
                endpoint_name = %r.endpoint_name,
                method = %r.method,
                path = %r.path,
                backend = %r.backend,
                "Route registered"
            );
        }

        // Connection tasks do not inherit the caller's span, so every
        // request span carries the gateway identity itself.
        let trace = TraceLayer::new_for_http().make_span_with(move |request: &Request<Body>| {
            gateway.http_span(request.method(), request.uri())
        });

        Ok(Self {
            router: router.layer(trace),
            routes,
        })
    }

    pub fn routes(&self) -> &[RouteEntry] {
        &self.routes
    }

    /// The axum router serving every registered route.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn into_router(self) -> Router {
        self.router
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EndpointConfig;
    use crate::proxy::{Flow, Middleware, INTERNAL_ERROR_BODY};
    use axum::extract::ConnectInfo;
    use axum::http::Response;
    use std::net::SocketAddr;
    use std::sync::Mutex;
    use tower::ServiceExt;

    fn endpoint(id: u32, method: &str, path: &str, backend: &str) -> EndpointConfig {
        EndpointConfig {
            id,
            name: format!("ep{id}"),
            method: method.to_string(),
            path: path.to_string(),
            backend: backend.to_string(),
            ..Default::default()
        }
    }

    fn config(endpoints: Vec<EndpointConfig>) -> Config {
        let mut config = Config::default();
        config.gateway.name = "edge".to_string();
        config.gateway.endpoints = endpoints;
        config
    }

    fn request(method: &str, uri: &str) -> Request<Body> {
        let mut req = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let addr: SocketAddr = "127.0.0.1:40000".parse().unwrap();
        req.extensions_mut().insert(ConnectInfo(addr));
        req
    }

    #[test]
    fn test_method_case_registers_identically() {
        let lower = GatewayRouter::build(
            &config(vec![endpoint(1, "get", "/users", "http://svc:8080")]),
            &MiddlewareRegistry::new(),
        )
        .unwrap();
        let upper = GatewayRouter::build(
            &config(vec![endpoint(1, "GET", "/users", "http://svc:8080")]),
            &MiddlewareRegistry::new(),
        )
        .unwrap();
        assert_eq!(lower.routes(), upper.routes());
        assert_eq!(lower.routes()[0].method, "GET");
        assert_eq!(lower.routes()[0].backend, "http://svc:8080");
    }

    #[test]
    fn test_colon_path_translated() {
        let built = GatewayRouter::build(
            &config(vec![endpoint(1, "GET", "/users/:id", "http://svc:8080")]),
            &MiddlewareRegistry::new(),
        )
        .unwrap();
        assert_eq!(built.routes()[0].path, "/users/{id}");
    }

    #[test]
    fn test_unsupported_method_is_fatal() {
        let err = GatewayRouter::build(
            &config(vec![endpoint(1, "TRACE", "/users", "http://svc:8080")]),
            &MiddlewareRegistry::new(),
        )
        .unwrap_err();
        assert!(matches!(err, BuildError::UnsupportedMethod { id: 1, .. }));
    }

    #[test]
    fn test_invalid_backend_is_fatal() {
        let err = GatewayRouter::build(
            &config(vec![endpoint(1, "GET", "/users", "svc:8080")]),
            &MiddlewareRegistry::new(),
        )
        .unwrap_err();
        assert!(matches!(err, BuildError::InvalidBackend { .. }));
    }

    #[test]
    fn test_duplicate_route_rejected() {
        let err = GatewayRouter::build(
            &config(vec![
                endpoint(1, "GET", "/users/:id", "http://a:1"),
                endpoint(2, "get", "/users/{id}", "http://b:2"),
            ]),
            &MiddlewareRegistry::new(),
        )
        .unwrap_err();
        match err {
            BuildError::DuplicateRoute { id, existing, .. } => {
                assert_eq!(id, 2);
                assert_eq!(existing, "ep1");
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_conflicting_parameter_names_rejected() {
        let err = GatewayRouter::build(
            &config(vec![
                endpoint(1, "GET", "/users/:id", "http://a:1"),
                endpoint(2, "DELETE", "/users/:user_id", "http://a:1"),
            ]),
            &MiddlewareRegistry::new(),
        )
        .unwrap_err();
        match err {
            BuildError::ConflictingRoute {
                id,
                ours,
                existing,
                theirs,
                ..
            } => {
                assert_eq!(id, 2);
                assert_eq!(ours, "{user_id}");
                assert_eq!(existing, "ep1");
                assert_eq!(theirs, "{id}");
            }
            other => panic!("unexpected error {other}"),
        }

        let err = GatewayRouter::build(
            &config(vec![
                endpoint(1, "GET", "/files/*rest", "http://a:1"),
                endpoint(2, "GET", "/files/{*other}", "http://a:1"),
            ]),
            &MiddlewareRegistry::new(),
        )
        .unwrap_err();
        assert!(matches!(err, BuildError::DuplicateRoute { id: 2, .. }));

        let err = GatewayRouter::build(
            &config(vec![
                endpoint(1, "GET", "/files/*rest", "http://a:1"),
                endpoint(2, "PUT", "/files/{*other}", "http://a:1"),
            ]),
            &MiddlewareRegistry::new(),
        )
        .unwrap_err();
        assert!(matches!(err, BuildError::ConflictingRoute { id: 2, .. }));
    }

    #[test]
    fn test_shared_parameter_names_build() {
        let built = GatewayRouter::build(
            &config(vec![
                endpoint(1, "GET", "/users/:id", "http://a:1"),
                endpoint(2, "DELETE", "/users/{id}", "http://a:1"),
                endpoint(3, "GET", "/users/:id/posts", "http://a:1"),
                endpoint(4, "GET", "/users/me", "http://a:1"),
            ]),
            &MiddlewareRegistry::new(),
        )
        .unwrap();
        assert_eq!(built.routes().len(), 4);
    }

    #[test]
    fn test_unknown_middleware_skipped() {
        let mut ep = endpoint(1, "GET", "/users", "http://svc:8080");
        ep.middleware = vec!["auth".to_string()];
        assert!(GatewayRouter::build(&config(vec![ep]), &MiddlewareRegistry::new()).is_ok());
    }

    #[tokio::test]
    async fn test_unknown_path_and_method() {
        let built = GatewayRouter::build(
            &config(vec![endpoint(1, "POST", "/users", "http://127.0.0.1:1")]),
            &MiddlewareRegistry::new(),
        )
        .unwrap();

        let res = built.router().oneshot(request("GET", "/nope")).await.unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);

        let res = built.router().oneshot(request("DELETE", "/users")).await.unwrap();
        assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_unreachable_backend_yields_500() {
        let built = GatewayRouter::build(
            &config(vec![endpoint(1, "GET", "/users", "http://127.0.0.1:1")]),
            &MiddlewareRegistry::new(),
        )
        .unwrap();

        let res = built.router().oneshot(request("GET", "/users?x=1")).await.unwrap();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = axum::body::to_bytes(res.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], INTERNAL_ERROR_BODY.as_bytes());
    }

    #[tokio::test]
    async fn test_head_not_proxied_for_get_only_path() {
        let built = GatewayRouter::build(
            &config(vec![
                endpoint(1, "GET", "/users", "http://127.0.0.1:1"),
                endpoint(2, "POST", "/users", "http://127.0.0.1:1"),
            ]),
            &MiddlewareRegistry::new(),
        )
        .unwrap();

        let res = built.router().oneshot(request("HEAD", "/users")).await.unwrap();
        assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(res.headers().get(header::ALLOW).unwrap(), "GET,POST");
    }

    #[tokio::test]
    async fn test_declared_head_is_proxied() {
        let built = GatewayRouter::build(
            &config(vec![
                endpoint(1, "GET", "/users", "http://127.0.0.1:1"),
                endpoint(2, "HEAD", "/users", "http://127.0.0.1:1"),
            ]),
            &MiddlewareRegistry::new(),
        )
        .unwrap();

        let res = built.router().oneshot(request("HEAD", "/users")).await.unwrap();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_request_logs_carry_gateway_identity() {
        let mut cfg = config(vec![endpoint(1, "GET", "/users", "http://127.0.0.1:1")]);
        cfg.gateway.id = 7;
        cfg.gateway.instance_id = 3;
        let built = GatewayRouter::build(&cfg, &MiddlewareRegistry::new()).unwrap();

        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::new(
                "api_gateway=debug,tower_http=debug",
            ))
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let res = built.router().oneshot(request("GET", "/users")).await.unwrap();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert!(lines.iter().any(|l| l.contains("Request forwarding failed")));
        assert!(lines.iter().any(|l| l.contains("finished processing request")));
        for line in lines {
            assert!(line.contains("gateway_id=7"), "{line}");
            assert!(line.contains("instance_id=3"), "{line}");
            assert!(line.contains("gateway_name=edge"), "{line}");
        }
    }

    struct Teapot;

    impl Middleware for Teapot {
        fn name(&self) -> &str {
            "teapot"
        }

        fn handle(&self, _: Request<Body>, _: &EndpointMeta) -> Flow {
            let mut response = Response::new(Body::from("short and stout"));
            *response.status_mut() = StatusCode::IM_A_TEAPOT;
            Flow::Respond(response)
        }
    }

    #[tokio::test]
    async fn test_middleware_answers_before_forwarding() {
        let mut registry = MiddlewareRegistry::new();
        registry.register(Teapot);
        let mut ep = endpoint(1, "GET", "/brew", "http://127.0.0.1:1");
        ep.middleware = vec!["teapot".to_string()];

        let built = GatewayRouter::build(&config(vec![ep]), &registry).unwrap();
        let res = built.router().oneshot(request("GET", "/brew")).await.unwrap();
        assert_eq!(res.status(), StatusCode::IM_A_TEAPOT);
    }
}
