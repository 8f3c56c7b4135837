//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (YAML/TOML)
//!     → paths.rs (resolve absolute path, check existence)
//!     → loader.rs (read & deserialize)
//!     → validation.rs (semantic checks, all diagnostics collected)
//!     → optimizer.rs (durations parsed, methods uppercased)
//!     → Config (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is built exactly once per process and never reloaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - No stage exits the process; errors flow back to the caller

pub mod duration;
pub mod listen;
pub mod loader;
pub mod optimizer;
pub mod paths;
pub mod schema;
pub mod validation;

use once_cell::sync::OnceCell;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use loader::{load_config, ConfigError};
pub use schema::{Config, CorsConfig, EndpointConfig, GatewayConfig, RateLimiterConfig};
pub use validation::{Diagnostic, Rule, ValidationReport};

/// One-time guard around the configuration pipeline.
///
/// The first call to [`load`](Self::load) runs the pipeline; every other
/// call, concurrent or later, waits for and returns that same result.
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    cell: OnceCell<Result<Arc<Config>, ConfigError>>,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cell: OnceCell::new(),
        }
    }

    /// Build the configuration on first use and return it.
    pub fn load(&self) -> Result<Arc<Config>, ConfigError> {
        self.cell
            .get_or_init(|| load_config(&self.path).map(Arc::new))
            .clone()
    }

    /// The built configuration, if the pipeline has already succeeded.
    pub fn get(&self) -> Option<Arc<Config>> {
        self.cell.get().and_then(|r| r.as_ref().ok()).cloned()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn store_for(doc: &str) -> (tempfile::NamedTempFile, ConfigStore) {
        let mut file = tempfile::Builder::new().suffix(".yml").tempfile().unwrap();
        file.write_all(doc.as_bytes()).unwrap();
        let store = ConfigStore::new(file.path());
        (file, store)
    }

    #[test]
    fn test_load_runs_once() {
        let (file, store) = store_for("gateway:\n  name: edge\n");
        assert!(store.get().is_none());

        let first = store.load().unwrap();
        // Later edits are not observed: the tree is never rebuilt.
        std::fs::write(file.path(), "gateway:\n  name: changed\n").unwrap();
        let second = store.load().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert!(second.initialized);
        assert_eq!(second.gateway.name, "edge");
        assert!(Arc::ptr_eq(&store.get().unwrap(), &first));
    }

    #[test]
    fn test_concurrent_loads_share_result() {
        let (_file, store) = store_for("gateway:\n  name: edge\n");
        let store = Arc::new(store);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || store.load().unwrap())
            })
            .collect();
        let configs: Vec<Arc<Config>> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        for c in &configs[1..] {
            assert!(Arc::ptr_eq(&configs[0], c));
        }
    }

    #[test]
    fn test_failure_is_remembered() {
        let (file, store) = store_for("gateway:\n  name: \"\"\n");
        assert!(matches!(store.load(), Err(ConfigError::Validation(_))));

        std::fs::write(file.path(), "gateway:\n  name: edge\n").unwrap();
        assert!(matches!(store.load(), Err(ConfigError::Validation(_))));
        assert!(store.get().is_none());
    }
}
