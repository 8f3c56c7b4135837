//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Compilation (at startup):
//!     EndpointConfig[]
//!     → methods.rs (method name → dispatch filter)
//!     → pattern.rs (path → dispatch-table syntax)
//!     → router.rs (one proxy handler per endpoint)
//!     → Freeze as immutable GatewayRouter
//!
//! Incoming Request (method, path)
//!     → axum dispatch table
//!     → matched endpoint handler, 405, or 404
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - One method table used by validation and registration alike
//! - Deterministic: same input always matches same route

pub mod methods;
pub mod pattern;
pub mod router;

pub use router::{BuildError, GatewayRouter, RouteEntry};
