//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! main.rs
//!     → logging.rs (subscriber from gateway config)
//!     → gateway root span (gateway_id, instance_id, gateway_name)
//!
//! Per request:
//!     → request span (gateway identity + endpoint id/name/method + request_id)
//!     → tower-http TraceLayer events (debug level)
//! ```
//!
//! # Design Decisions
//! - Structured key=value fields, carried by spans
//! - Request ID flows through every request-scoped line
//! - No metrics endpoint: the gateway serves configured endpoints only

pub mod logging;

pub use logging::{init_logging, GatewayIdentity, LogOutput, LoggingError};
