//! API gateway binary.
//!
//! ```text
//!     Client Request
//!     ──────────────▶ listener (HTTP or TLS)
//!                        │
//!                        ▼
//!                   dispatch table ── 404 / 405
//!                        │ (method, path)
//!                        ▼
//!                   endpoint proxy ── middleware chain
//!                        │
//!                        ▼
//!                   backend origin
//!     Client Response    │
//!     ◀──────────────────┘ status + headers + body relayed, or 500
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::Instrument;

use api_gateway::config::{Config, ConfigStore};
use api_gateway::lifecycle::startup;
use api_gateway::observability::{init_logging, GatewayIdentity};
use api_gateway::proxy::MiddlewareRegistry;
use api_gateway::routing::GatewayRouter;

#[derive(Parser, Debug)]
#[command(name = "api-gateway", version, about = "Config-driven HTTP API gateway")]
struct Args {
    /// Path to the configuration file (YAML, or TOML by extension)
    #[arg(short, long, default_value = "./config.yml")]
    config: PathBuf,

    /// Load and validate the configuration, print it with the route table, then exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let store = ConfigStore::new(args.config);

    // Logging is configured by the document, so failures before this point go to stderr.
    let config = match startup::load(&store) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let registry = MiddlewareRegistry::new();

    if args.check {
        return check(&config, &registry);
    }

    if let Err(e) = init_logging(&config.gateway) {
        eprintln!("failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    let span = GatewayIdentity::from_config(&config.gateway).span();
    run(store.path().to_path_buf(), config, registry)
        .instrument(span)
        .await
}

async fn run(path: PathBuf, config: Arc<Config>, registry: MiddlewareRegistry) -> ExitCode {
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %path.display(),
        endpoints = config.gateway.endpoints.len(),
        "api-gateway starting"
    );

    match startup::start(config, &registry).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Gateway stopped with an error");
            ExitCode::FAILURE
        }
    }
}

fn check(config: &Config, registry: &MiddlewareRegistry) -> ExitCode {
    let router = match GatewayRouter::build(config, registry) {
        Ok(router) => router,
        Err(e) => {
            eprintln!("failed to build routes: {e}");
            return ExitCode::FAILURE;
        }
    };

    let report = serde_json::json!({
        "config": config,
        "routes": router.routes(),
    });
    match serde_json::to_string_pretty(&report) {
        Ok(text) => {
            println!("{text}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("failed to render configuration: {e}");
            ExitCode::FAILURE
        }
    }
}
