//! Binding configuration.
//!
//! Values come from three places, later ones overriding earlier ones:
//! built-in defaults, a JSON file and the process environment.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;

/// Explicit path to the engine library.
pub const ENV_LIB_PATH: &str = "YGGDRASIL_LIB_PATH";
/// Extra directory searched for the engine library.
pub const ENV_LIB_DIR: &str = "YGGDRASIL_LIB_DIR";
/// Host name reported to the engine with every evaluation.
pub const ENV_HOSTNAME: &str = "HOSTNAME";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BindingConfig {
    /// Load exactly this library file, skipping the search.
    pub library_path: Option<PathBuf>,
    /// Directories probed, in order, for the platform's library file.
    pub search_paths: Vec<PathBuf>,
    /// Sent as `runtime_hostname` in every evaluation request. Strategies
    /// such as `applicationHostname` match against it.
    pub runtime_hostname: Option<String>,
}

impl Default for BindingConfig {
    fn default() -> Self {
        Self {
            library_path: None,
            search_paths: vec![
                PathBuf::from("./lib"),
                PathBuf::from("/usr/local/lib/yggdrasil"),
                PathBuf::from("/usr/lib/yggdrasil"),
            ],
            runtime_hostname: None,
        }
    }
}

impl BindingConfig {
    /// Defaults overridden by the process environment.
    pub fn from_env() -> Self {
        Self::default().with_vars(|key| std::env::var(key).ok())
    }

    /// Read a JSON configuration file. Missing keys keep their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Reading binding config");
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Apply environment overrides read through `lookup`.
    pub fn with_vars<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let set = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(path) = set(ENV_LIB_PATH) {
            self.library_path = Some(PathBuf::from(path));
        }
        if let Some(dir) = set(ENV_LIB_DIR) {
            self.search_paths.insert(0, PathBuf::from(dir));
        }
        if let Some(host) = set(ENV_HOSTNAME) {
            self.runtime_hostname = Some(host);
        }
        self
    }
}
