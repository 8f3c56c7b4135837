//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber from the gateway config
//! - Carry the gateway identity on every log line
//! - Build request spans with endpoint identity and request id
//!
//! # Design Decisions
//! - Plain `fmt` output with span fields on every line
//! - `RUST_LOG` overrides the configured `log_level`
//! - Gateway identity lives on spans, not on a global logger

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use axum::http::{Method, Uri};
use thiserror::Error;
use tracing::Span;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::GatewayConfig;

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log level '{level}': {source}")]
    Level {
        level: String,
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },
    #[error("cannot open log output '{}': {source}", .path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("logger already initialized: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

/// Where log lines are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogOutput {
    Stdout,
    Stderr,
    File(PathBuf),
}

impl LogOutput {
    pub fn from_config(value: &str) -> Self {
        match value.trim() {
            "" => LogOutput::Stdout,
            v if v.eq_ignore_ascii_case("stdout") => LogOutput::Stdout,
            v if v.eq_ignore_ascii_case("stderr") => LogOutput::Stderr,
            path => LogOutput::File(PathBuf::from(path)),
        }
    }

    fn make_writer(&self) -> Result<BoxMakeWriter, LoggingError> {
        Ok(match self {
            LogOutput::Stdout => BoxMakeWriter::new(std::io::stdout),
            LogOutput::Stderr => BoxMakeWriter::new(std::io::stderr),
            LogOutput::File(path) => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .map_err(|source| LoggingError::Output {
                        path: path.clone(),
                        source,
                    })?;
                BoxMakeWriter::new(Mutex::new(file))
            }
        })
    }
}

/// Install the global subscriber for this gateway.
pub fn init_logging(gateway: &GatewayConfig) -> Result<(), LoggingError> {
    let level = if gateway.log_level.is_empty() {
        "info"
    } else {
        gateway.log_level.as_str()
    };
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level).map_err(|source| LoggingError::Level {
            level: level.to_string(),
            source,
        })?,
    };

    let writer = LogOutput::from_config(&gateway.log_output).make_writer()?;

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_ansi(false)
                .with_writer(writer),
        )
        .try_init()?;

    Ok(())
}

/// Identity fields attached to every log line of this gateway instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayIdentity {
    pub id: u32,
    pub instance_id: u32,
    pub name: String,
}

impl GatewayIdentity {
    pub fn from_config(gateway: &GatewayConfig) -> Self {
        Self {
            id: gateway.id,
            instance_id: gateway.instance_id,
            name: gateway.name.clone(),
        }
    }

    /// Process-wide root span; enter it for startup and shutdown logs.
    pub fn span(&self) -> Span {
        tracing::info_span!(
            "gateway",
            gateway_id = self.id,
            instance_id = self.instance_id,
            gateway_name = %self.name,
        )
    }

    /// Span for one HTTP exchange, opened by the trace layer.
    pub fn http_span(&self, method: &Method, uri: &Uri) -> Span {
        tracing::info_span!(
            "http",
            gateway_id = self.id,
            instance_id = self.instance_id,
            gateway_name = %self.name,
            method = %method,
            uri = %uri,
        )
    }

    /// Span for one proxied request.
    pub fn request_span(
        &self,
        endpoint_id: u32,
        endpoint_name: &str,
        endpoint_method: &str,
        request_id: &str,
    ) -> Span {
        tracing::info_span!(
            "request",
            gateway_id = self.id,
            instance_id = self.instance_id,
            gateway_name = %self.name,
            endpoint_id,
            endpoint_name,
            endpoint_method,
            request_id,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_output_from_config() {
        assert_eq!(LogOutput::from_config(""), LogOutput::Stdout);
        assert_eq!(LogOutput::from_config("STDOUT"), LogOutput::Stdout);
        assert_eq!(LogOutput::from_config("stderr"), LogOutput::Stderr);
        assert_eq!(
            LogOutput::from_config("/var/log/gateway.log"),
            LogOutput::File(PathBuf::from("/var/log/gateway.log"))
        );
    }

    #[test]
    fn test_unwritable_file_output() {
        let output = LogOutput::File(PathBuf::from("/definitely/missing/dir/gateway.log"));
        assert!(matches!(output.make_writer(), Err(LoggingError::Output { .. })));
    }

    #[test]
    fn test_identity_from_config() {
        let gw = GatewayConfig {
            id: 4,
            instance_id: 9,
            name: "edge".to_string(),
            ..Default::default()
        };
        let identity = GatewayIdentity::from_config(&gw);
        assert_eq!(identity.id, 4);
        assert_eq!(identity.instance_id, 9);
        assert_eq!(identity.name, "edge");
    }
}
