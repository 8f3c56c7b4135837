//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Resolve the configured listen address
//! - Serve the dispatch table over plain HTTP or rustls TLS
//! - Record each caller's socket address for `X-Forwarded-For`
//! - Stop accepting and drain on the shutdown signal

use axum_server::tls_rustls::RustlsConfig;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::listen::{parse_listen_address, PortError};
use crate::config::Config;
use crate::lifecycle::Shutdown;
use crate::net::tls::{load_tls_config, TlsError};
use crate::routing::GatewayRouter;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid listen address: {0}")]
    Listen(#[from] PortError),
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Tls(#[from] TlsError),
    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// HTTP server for the gateway.
pub struct GatewayServer {
    config: Arc<Config>,
    router: GatewayRouter,
}

impl GatewayServer {
    pub fn new(config: Arc<Config>, router: GatewayRouter) -> Self {
        Self { config, router }
    }

    /// Bind the configured port and serve until `shutdown` fires.
    pub async fn serve(self, shutdown: Shutdown) -> Result<(), ServerError> {
        let listen = parse_listen_address(&self.config.gateway.port)?;
        let addr = listen.bind_address();

        if self.config.gateway.enable_tls {
            let socket_addr = tokio::net::lookup_host(&addr)
                .await
                .ok()
                .and_then(|mut addrs| addrs.next())
                .ok_or_else(|| ServerError::Bind {
                    addr: addr.clone(),
                    source: std::io::Error::new(
                        std::io::ErrorKind::AddrNotAvailable,
                        "listen host did not resolve",
                    ),
                })?;
            let tls = load_tls_config(
                Path::new(&self.config.gateway.tls_cert),
                Path::new(&self.config.gateway.tls_key),
            )
            .await?;
            self.run_tls(socket_addr, tls, shutdown).await
        } else {
            let listener = TcpListener::bind(&addr)
                .await
                .map_err(|source| ServerError::Bind { addr, source })?;
            self.run(listener, shutdown).await
        }
    }

    /// Serve plain HTTP on an already-bound listener.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), ServerError> {
        let addr = listener.local_addr().map_err(ServerError::Serve)?;
        tracing::info!(address = %addr, routes = self.router.routes().len(), "HTTP server starting");

        let app = self
            .router
            .into_router()
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown.wait())
            .await
            .map_err(ServerError::Serve)?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Serve HTTPS on `addr`.
    pub async fn run_tls(
        self,
        addr: SocketAddr,
        tls: RustlsConfig,
        shutdown: Shutdown,
    ) -> Result<(), ServerError> {
        tracing::info!(address = %addr, routes = self.router.routes().len(), "HTTPS server starting");

        let handle = axum_server::Handle::new();
        let stopper = handle.clone();
        let stopped = shutdown.wait();
        tokio::spawn(async move {
            stopped.await;
            stopper.graceful_shutdown(None);
        });

        let app = self
            .router
            .into_router()
            .into_make_service_with_connect_info::<SocketAddr>();

        axum_server::bind_rustls(addr, tls)
            .handle(handle)
            .serve(app)
            .await
            .map_err(ServerError::Serve)?;

        tracing::info!("HTTPS server stopped");
        Ok(())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}
