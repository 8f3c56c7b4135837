//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Resolve TLS file paths to absolute form and check they exist
//! - Validate value grammars (listen port, durations, methods, paths, backends)
//! - Detect duplicate (method, path) routes
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Rules run in a fixed order: gateway, gateway rate limiter, then each
//!   endpoint in declaration order, then cross-endpoint checks
//! - A rate limiter that breaks any rule is also switched off
//! - Never exits the process; the caller decides what to do with the report

use std::fmt;

use crate::config::duration::{parse_duration, parse_penalty, NO_PENALTY};
use crate::config::listen::parse_listen_address;
use crate::config::paths::{full_path, is_valid_path};
use crate::config::schema::{Config, EndpointConfig, GatewayConfig, RateLimiterConfig};
use crate::proxy::backend::BackendOrigin;
use crate::routing::methods::is_supported_method;
use crate::routing::pattern::RoutePattern;

/// Stable identifier of a validation rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rule {
    InvalidGatewayName,
    InvalidPort,
    InvalidCertPath,
    InvalidKeyPath,
    InvalidNumberOfRequests,
    InvalidRateLimitWindow,
    InvalidRateLimitPenalty,
    InvalidEndpointName,
    InvalidMethod,
    InvalidPath,
    InvalidBackend,
    DuplicateRoute,
    ConflictingRoute,
}

impl Rule {
    pub fn id(&self) -> &'static str {
        match self {
            Rule::InvalidGatewayName => "Error.InvalidGatewayName",
            Rule::InvalidPort => "Error.InvalidPort",
            Rule::InvalidCertPath => "Error.InvalidCertPath",
            Rule::InvalidKeyPath => "Error.InvalidKeyPath",
            Rule::InvalidNumberOfRequests => "Error.InvalidNumberOfRequests",
            Rule::InvalidRateLimitWindow => "Error.InvalidRateLimitWindow",
            Rule::InvalidRateLimitPenalty => "Error.InvalidRateLimitPenalty",
            Rule::InvalidEndpointName => "Error.InvalidEndpointName",
            Rule::InvalidMethod => "Error.InvalidMethod",
            Rule::InvalidPath => "Error.InvalidPath",
            Rule::InvalidBackend => "Error.InvalidBackend",
            Rule::DuplicateRoute => "Error.DuplicateRoute",
            Rule::ConflictingRoute => "Error.ConflictingRoute",
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// One violated rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub rule: Rule,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} :: {}", self.rule, self.message)
    }
}

/// Every diagnostic collected in one validation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    diagnostics: Vec<Diagnostic>,
}

impl ValidationReport {
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    /// Rule ids in the order they were reported.
    pub fn rules(&self) -> Vec<Rule> {
        self.diagnostics.iter().map(|d| d.rule).collect()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} validation rule(s) failed:", self.diagnostics.len())?;
        for d in &self.diagnostics {
            writeln!(f, "\t - {}", d)?;
        }
        write!(
            f,
            "Please fix the above errors in the configuration file before continuing."
        )
    }
}

/// Which rate limiter is being checked, for messages.
#[derive(Clone, Copy)]
enum Scope<'a> {
    Gateway,
    Endpoint(&'a str),
}

impl fmt::Display for Scope<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Gateway => f.write_str("the gateway"),
            Scope::Endpoint(name) => write!(f, "endpoint '{}'", name),
        }
    }
}

struct Validator {
    report: ValidationReport,
    failed: bool,
}

impl Validator {
    fn new() -> Self {
        Self {
            report: ValidationReport::default(),
            failed: false,
        }
    }

    fn record(&mut self, rule: Rule, message: String) {
        self.failed = true;
        self.report.diagnostics.push(Diagnostic { rule, message });
    }

    fn gateway(&mut self, gw: &mut GatewayConfig) {
        if gw.name.is_empty() {
            self.record(
                Rule::InvalidGatewayName,
                "Invalid value '' provided. The name field identifies the gateway in logs and monitoring systems. Please provide a valid name".to_string(),
            );
        }

        if let Err(e) = parse_listen_address(&gw.port) {
            self.record(
                Rule::InvalidPort,
                format!(
                    "Invalid value '{}' provided ({}). Please provide a port in the format ':<portnumber>'",
                    gw.port, e
                ),
            );
        }

        self.tls(gw);
        self.rate_limiter(&mut gw.rate_limit, Scope::Gateway);
    }

    fn tls(&mut self, gw: &mut GatewayConfig) {
        if !gw.enable_tls {
            return;
        }

        let cert = full_path(&gw.tls_cert);
        let key = full_path(&gw.tls_key);
        gw.tls_cert = cert.to_string_lossy().into_owned();
        gw.tls_key = key.to_string_lossy().into_owned();

        if !is_valid_path(&cert) {
            self.record(
                Rule::InvalidCertPath,
                format!("Invalid filepath '{}' provided for TLS certificate file", gw.tls_cert),
            );
        }
        if !is_valid_path(&key) {
            self.record(
                Rule::InvalidKeyPath,
                format!("Invalid filepath '{}' provided for TLS key file", gw.tls_key),
            );
        }
    }

    fn rate_limiter(&mut self, rl: &mut RateLimiterConfig, scope: Scope<'_>) {
        if !rl.enabled {
            return;
        }

        if rl.requests == 0 {
            self.record(
                Rule::InvalidNumberOfRequests,
                format!(
                    "Invalid value '0' provided for the rate limiter's allowed number of requests for {}. Please provide a positive number of requests per window or set enable to false",
                    scope
                ),
            );
            rl.enabled = false;
        }

        if let Err(e) = parse_duration(&rl.window) {
            self.record(
                Rule::InvalidRateLimitWindow,
                format!(
                    "Invalid value '{}' provided for the rate limiter window for {} ({}). Ex: 10S or 2M or 1H, or set enable to false",
                    rl.window, scope, e
                ),
            );
            rl.enabled = false;
        }

        if let Err(e) = parse_penalty(&rl.penalty) {
            self.record(
                Rule::InvalidRateLimitPenalty,
                format!(
                    "Invalid value '{}' provided for the rate limiter penalty for {} ({}). Ex: 10S or 2M or 1H, or '{}' for no penalty",
                    rl.penalty, scope, e, NO_PENALTY
                ),
            );
            rl.enabled = false;
        }
    }

    fn endpoint(&mut self, ep: &mut EndpointConfig) {
        if ep.name.is_empty() {
            self.record(
                Rule::InvalidEndpointName,
                format!(
                    "Invalid value '' provided for endpoint {}. The name field identifies the endpoint in logs and monitoring systems. Please provide a valid name",
                    ep.id
                ),
            );
        }

        if !is_supported_method(&ep.method) {
            self.record(
                Rule::InvalidMethod,
                format!(
                    "Invalid value '{}' provided for endpoint '{}'. Ex. GET, PUT, POST, DELETE, PATCH, OPTIONS, HEAD (case insensitive)",
                    ep.method, ep.name
                ),
            );
        }

        if let Err(e) = RoutePattern::parse(&ep.path) {
            self.record(
                Rule::InvalidPath,
                format!("Invalid value '{}' provided for endpoint '{}': {}", ep.path, ep.name, e),
            );
        }

        if let Err(e) = BackendOrigin::parse(&ep.backend) {
            self.record(
                Rule::InvalidBackend,
                format!(
                    "Invalid value '{}' provided for endpoint '{}': {}. Please provide a valid http or https backend",
                    ep.backend, ep.name, e
                ),
            );
        }

        self.rate_limiter(&mut ep.rate_limit, Scope::Endpoint(&ep.name));
    }

    /// Cross-endpoint rules. Each endpoint is reported at most once, against
    /// the first earlier endpoint it collides with.
    fn route_collisions(&mut self, endpoints: &[EndpointConfig]) {
        let mut seen: Vec<(&EndpointConfig, String, RoutePattern)> = Vec::new();
        for ep in endpoints {
            // Only well-formed routes can collide; malformed ones were reported above.
            let Ok(pattern) = RoutePattern::parse(&ep.path) else {
                continue;
            };
            if !is_supported_method(&ep.method) {
                continue;
            }
            let method = ep.method.to_ascii_uppercase();

            let duplicate = seen
                .iter()
                .find(|(_, m, p)| *m == method && p.shape() == pattern.shape());
            if let Some((first, _, _)) = duplicate {
                self.record(
                    Rule::DuplicateRoute,
                    format!(
                        "Endpoint '{}' registers {} {} which is already registered by endpoint '{}'",
                        ep.name, method, ep.path, first.name
                    ),
                );
            } else if let Some((first, conflict)) = seen
                .iter()
                .find_map(|(first, _, p)| pattern.conflicts_with(p).map(|c| (first, c)))
            {
                self.record(
                    Rule::ConflictingRoute,
                    format!(
                        "Endpoint '{}' path '{}' uses '{}' where endpoint '{}' path '{}' uses '{}'. Routes sharing a prefix must name their parameters identically",
                        ep.name, ep.path, conflict.ours, first.name, first.path, conflict.theirs
                    ),
                );
            }

            seen.push((ep, method, pattern));
        }
    }
}

/// Validate the whole tree, collecting every violation.
///
/// Besides checking, this rewrites TLS paths to absolute form and switches
/// off rate limiters that failed a rule. `config.validation_failed` is set
/// if any rule failed; otherwise `config.validated` is set.
pub fn validate_config(config: &mut Config) -> Result<(), ValidationReport> {
    let mut validator = Validator::new();

    validator.gateway(&mut config.gateway);
    for ep in config.gateway.endpoints.iter_mut() {
        validator.endpoint(ep);
    }
    validator.route_collisions(&config.gateway.endpoints);

    if validator.failed {
        config.validation_failed = true;
        config.validated = false;
        return Err(validator.report);
    }
    config.validated = true;
    Ok(())
}
