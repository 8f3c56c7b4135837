//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (axum serve, connect info, graceful shutdown)
//!     → routing (dispatch table)
//!     → proxy (forward to backend, relay response)
//!     → Send to client
//! ```

pub mod server;

pub use server::{GatewayServer, ServerError};
