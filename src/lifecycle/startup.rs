//! Startup orchestration.
//!
//! # Responsibilities
//! - Load, validate and optimize configuration exactly once
//! - Build the dispatch table from the loaded configuration
//! - Bind the listener and serve until a shutdown signal
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Logging is initialized by the caller between loading and building,
//!   because the log settings come from the configuration itself
//! - The listener starts last (traffic only when the routes are ready)

use std::sync::Arc;
use thiserror::Error;

use crate::config::{Config, ConfigError, ConfigStore};
use crate::http::{GatewayServer, ServerError};
use crate::lifecycle::{signals, Shutdown};
use crate::observability::LoggingError;
use crate::proxy::MiddlewareRegistry;
use crate::routing::{BuildError, GatewayRouter};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to initialize logging: {0}")]
    Logging(#[from] LoggingError),
    #[error("failed to build routes: {0}")]
    Build(#[from] BuildError),
    #[error(transparent)]
    Server(#[from] ServerError),
}

/// Load the configuration held by `store`.
pub fn load(store: &ConfigStore) -> Result<Arc<Config>, StartupError> {
    Ok(store.load()?)
}

/// Build the routes and serve until SIGINT or SIGTERM.
///
/// Run this inside the gateway span from
/// [`GatewayIdentity::span`](crate::observability::GatewayIdentity::span) so
/// startup and shutdown lines carry the gateway identity.
pub async fn start(config: Arc<Config>, registry: &MiddlewareRegistry) -> Result<(), StartupError> {
    let router = GatewayRouter::build(&config, registry)?;

    let shutdown = Shutdown::new();
    signals::spawn_signal_handler(shutdown.clone());

    GatewayServer::new(config, router).serve(shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
