//! Configuration schema definitions.
//!
//! This module defines the complete configuration tree for the gateway.
//! All types derive Serde traits for deserialization from config files, and
//! every field has a default so a minimal document is enough to start.
//!
//! Fields marked `skip_deserializing` are runtime values filled in by the
//! optimizer; they are never read from the document.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration aggregate.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Set once the document has been parsed into this tree.
    #[serde(skip_deserializing)]
    pub initialized: bool,

    /// Set on the first failed validation rule and never cleared.
    #[serde(skip_deserializing)]
    pub validation_failed: bool,

    /// Set once a validation pass has accepted the tree.
    #[serde(skip_deserializing)]
    pub validated: bool,

    /// Absolute path of the document this tree was read from.
    #[serde(skip)]
    pub path: PathBuf,

    pub gateway: GatewayConfig,
}

/// Gateway-wide settings and the endpoint list.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct GatewayConfig {
    pub id: u32,
    pub instance_id: u32,

    /// Identifies the gateway in logs; must not be empty.
    pub name: String,
    pub description: String,

    /// Listen address in `:<port>` or `<host>:<port>` form.
    pub port: String,

    #[serde(rename = "enable_TLS")]
    pub enable_tls: bool,

    #[serde(rename = "TLS_cert")]
    pub tls_cert: String,

    #[serde(rename = "TLS_key")]
    pub tls_key: String,

    /// Default log filter directive (trace, debug, info, warn, error).
    pub log_level: String,

    /// `stdout`, `stderr` or a file path opened in append mode.
    pub log_output: String,

    /// Credentials file for remote log shipping. Carried, not consumed.
    pub log_credentials: String,

    /// Gateway-wide rate limiter defaults.
    pub rate_limit: RateLimiterConfig,

    /// Gateway-wide CORS defaults.
    pub cors: CorsConfig,

    pub endpoints: Vec<EndpointConfig>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            id: 0,
            instance_id: 0,
            name: String::new(),
            description: String::new(),
            port: ":8080".to_string(),
            enable_tls: false,
            tls_cert: String::new(),
            tls_key: String::new(),
            log_level: "info".to_string(),
            log_output: "stdout".to_string(),
            log_credentials: String::new(),
            rate_limit: RateLimiterConfig::default(),
            cors: CorsConfig::default(),
            endpoints: Vec::new(),
        }
    }
}

/// Rate limiting settings: a request quota per window plus an optional
/// penalty applied to clients that exceed it.
///
/// Window and penalty are written as `<length><unit>` where the unit is
/// `S`, `M` or `H` (case-insensitive), e.g. `10S`, `2M`, `1H`. The penalty
/// may also be `-` for "no penalty". The optimizer converts both strings
/// into [`Duration`]s once validation has accepted them.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RateLimiterConfig {
    #[serde(rename = "enable")]
    pub enabled: bool,

    pub requests: u32,

    #[serde(rename = "window")]
    pub window: String,

    #[serde(rename = "penalty")]
    pub penalty: String,

    #[serde(skip_deserializing)]
    pub window_duration: Duration,

    #[serde(skip_deserializing)]
    pub penalty_duration: Duration,

    /// True iff the parsed penalty is non-zero.
    #[serde(skip_deserializing)]
    pub penalty_enabled: bool,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            requests: 0,
            window: String::new(),
            penalty: "-".to_string(),
            window_duration: Duration::ZERO,
            penalty_duration: Duration::ZERO,
            penalty_enabled: false,
        }
    }
}

/// CORS settings, at gateway or endpoint scope.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct CorsConfig {
    #[serde(rename = "enable")]
    pub enabled: bool,
    pub allowed_methods: Vec<String>,
    pub allowed_domains: Vec<String>,
    pub allowed_headers: Vec<String>,
    pub exposed_headers: Vec<String>,
}

/// A single proxied endpoint.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct EndpointConfig {
    pub id: u32,

    /// Identifies the endpoint in logs; must not be empty.
    pub name: String,
    pub description: String,

    /// HTTP method, matched case-insensitively and uppercased on optimize.
    pub method: String,

    /// Route path, e.g. `/users` or `/users/:id`.
    pub path: String,

    /// Endpoint-scoped rate limiter override.
    pub rate_limit: RateLimiterConfig,

    /// Endpoint-scoped CORS override.
    pub cors: CorsConfig,

    /// Names of middleware to run, in order, before forwarding.
    pub middleware: Vec<String>,

    /// Backend origin, e.g. `http://users-svc:8080`.
    pub backend: String,
}
