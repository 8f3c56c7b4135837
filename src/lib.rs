//! Config-driven HTTP API gateway.
//!
//! Each endpoint in the configuration file maps one `(method, path)` pair to
//! one backend origin. Requests are forwarded with the path and query kept
//! verbatim and the response is relayed back unchanged.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod proxy;
pub mod routing;

pub use config::{Config, ConfigError, ConfigStore};
pub use http::GatewayServer;
pub use lifecycle::Shutdown;
pub use proxy::{Middleware, MiddlewareRegistry};
pub use routing::GatewayRouter;
