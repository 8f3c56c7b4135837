//! TLS configuration and certificate loading.

use axum_server::tls_rustls::RustlsConfig;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TlsError {
    #[error("certificate file not found: {}", .0.display())]
    MissingCert(PathBuf),
    #[error("private key file not found: {}", .0.display())]
    MissingKey(PathBuf),
    #[error("failed to load certificate/key pair: {0}")]
    Load(#[source] std::io::Error),
}

/// Load a rustls server config from PEM certificate and key files.
pub async fn load_tls_config(cert_path: &Path, key_path: &Path) -> Result<RustlsConfig, TlsError> {
    // Validation already checked these; the files may have moved since.
    if !cert_path.exists() {
        return Err(TlsError::MissingCert(cert_path.to_path_buf()));
    }
    if !key_path.exists() {
        return Err(TlsError::MissingKey(key_path.to_path_buf()));
    }

    RustlsConfig::from_pem_file(cert_path, key_path)
        .await
        .map_err(TlsError::Load)
}
