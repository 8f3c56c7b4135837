//! Listen address grammar: `:<port>` or `<host>:<port>`.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PortError {
    #[error("'{0}' has no ':' before the port number")]
    MissingColon(String),
    #[error("'{0}' must end with a port number")]
    MissingPort(String),
    #[error("'{0}' port must contain only digits")]
    NotNumeric(String),
    #[error("'{0}' port is out of range (1-65535)")]
    OutOfRange(String),
}

/// A parsed listen address. An absent host means all interfaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenAddress {
    pub host: Option<String>,
    pub port: u16,
}

impl ListenAddress {
    /// `host:port` string suitable for binding.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host.as_deref().unwrap_or("0.0.0.0"), self.port)
    }
}

impl fmt::Display for ListenAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bind_address())
    }
}

/// Parse a listen string such as `:8080` or `127.0.0.1:8080`.
pub fn parse_listen_address(s: &str) -> Result<ListenAddress, PortError> {
    let (host, port) = s
        .rsplit_once(':')
        .ok_or_else(|| PortError::MissingColon(s.to_string()))?;

    if port.is_empty() {
        return Err(PortError::MissingPort(s.to_string()));
    }
    if !port.bytes().all(|b| b.is_ascii_digit()) {
        return Err(PortError::NotNumeric(s.to_string()));
    }
    let port: u16 = port
        .parse()
        .map_err(|_| PortError::OutOfRange(s.to_string()))?;
    if port == 0 {
        return Err(PortError::OutOfRange(s.to_string()));
    }

    Ok(ListenAddress {
        host: (!host.is_empty()).then(|| host.to_string()),
        port,
    })
}
