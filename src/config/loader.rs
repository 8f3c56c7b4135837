//! Configuration loading from disk.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use crate::config::optimizer::{optimize_config, OptimizeError};
use crate::config::paths::{full_path, is_valid_path};
use crate::config::schema::Config;
use crate::config::validation::{validate_config, ValidationReport};

/// Error type for configuration loading.
///
/// Cloneable so a single failed build can be handed to every caller of
/// [`ConfigStore::load`](crate::config::ConfigStore::load).
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("configuration file '{}' does not exist", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read configuration file '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: Arc<std::io::Error>,
    },

    #[error("failed to parse configuration file '{}': {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("InvalidConfigError :: {0}")]
    Validation(ValidationReport),

    #[error(transparent)]
    Optimize(#[from] OptimizeError),
}

/// Document formats the parser understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Yaml,
    Toml,
}

impl DocumentFormat {
    /// `.toml` selects TOML; anything else is read as YAML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => DocumentFormat::Toml,
            _ => DocumentFormat::Yaml,
        }
    }
}

/// Resolve a user-supplied config path to an absolute path that exists.
pub fn resolve_config_path(path: impl AsRef<Path>) -> Result<PathBuf, ConfigError> {
    let abs = full_path(path);
    if !is_valid_path(&abs) {
        return Err(ConfigError::NotFound(abs));
    }
    Ok(abs)
}

/// Read the raw document.
pub fn read_document(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        source: Arc::new(e),
    })
}

/// Deserialize a document into an unvalidated [`Config`].
pub fn parse_document(
    content: &str,
    format: DocumentFormat,
    path: &Path,
) -> Result<Config, ConfigError> {
    let parsed = match format {
        DocumentFormat::Yaml => serde_yaml::from_str::<Config>(content).map_err(|e| e.to_string()),
        DocumentFormat::Toml => toml::from_str::<Config>(content).map_err(|e| e.to_string()),
    };
    let mut config = parsed.map_err(|message| ConfigError::Parse {
        path: path.to_path_buf(),
        message,
    })?;

    config.initialized = true;
    config.path = path.to_path_buf();
    Ok(config)
}

/// Load, parse, validate and optimize the configuration at `path`.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let path = resolve_config_path(path)?;
    let content = read_document(&path)?;
    let mut config = parse_document(&content, DocumentFormat::from_path(&path), &path)?;

    validate_config(&mut config).map_err(ConfigError::Validation)?;
    optimize_config(&mut config)?;

    Ok(config)
}
