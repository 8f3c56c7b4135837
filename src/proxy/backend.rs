//! Backend origin parsing.

use axum::http::uri::{Authority, Scheme};
use std::fmt;
use thiserror::Error;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("backend is empty")]
    Empty,
    #[error("backend '{backend}' is not a valid URL: {reason}")]
    Unparsable { backend: String, reason: String },
    #[error("backend '{0}' must use the http or https scheme")]
    UnsupportedScheme(String),
    #[error("backend '{0}' has no host")]
    MissingHost(String),
}

/// Scheme and authority every request for an endpoint is sent to.
///
/// Only the origin is kept: any path on the configured backend URL is
/// ignored and the inbound request path is forwarded as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendOrigin {
    scheme: Scheme,
    authority: Authority,
}

impl BackendOrigin {
    pub fn parse(backend: &str) -> Result<Self, BackendError> {
        if backend.trim().is_empty() {
            return Err(BackendError::Empty);
        }

        let url = Url::parse(backend).map_err(|e| BackendError::Unparsable {
            backend: backend.to_string(),
            reason: e.to_string(),
        })?;

        let scheme = match url.scheme() {
            "http" => Scheme::HTTP,
            "https" => Scheme::HTTPS,
            _ => return Err(BackendError::UnsupportedScheme(backend.to_string())),
        };

        let host = match url.host_str() {
            Some(h) if !h.is_empty() => h,
            _ => return Err(BackendError::MissingHost(backend.to_string())),
        };
        let authority = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        let authority = authority
            .parse::<Authority>()
            .map_err(|e| BackendError::Unparsable {
                backend: backend.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self { scheme, authority })
    }

    pub fn scheme(&self) -> &Scheme {
        &self.scheme
    }

    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    /// Absolute URL for `path_and_query` on this origin.
    pub fn target(&self, path_and_query: &str) -> String {
        format!("{}://{}{}", self.scheme, self.authority, path_and_query)
    }
}

impl fmt::Display for BackendOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.authority)
    }
}
