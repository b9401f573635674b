//! Backend address configuration
//!
//! The analytics backend address is injected, never hard-coded at call
//! sites. Resolution priority order:
//! 1. Explicit override from the embedding application (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable consulted at resolution tier 2.
pub const BACKEND_URL_ENV: &str = "IRVIS_BACKEND_URL";

/// Compiled default, the analytics backend's conventional local address.
pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:5000";

/// Resolved backend configuration handed to the HTTP client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub base_url: String,
}

/// On-disk configuration file schema (`~/.config/irvis/config.toml`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Analytics backend base address
    pub backend_url: Option<String>,
}

/// Resolve the backend base address using the default config file location.
pub fn resolve_backend_url(override_url: Option<&str>) -> BackendConfig {
    resolve_backend_url_with_file(override_url, default_config_path().as_deref())
}

/// Resolve the backend base address against an explicit config file path.
///
/// A missing or unreadable file degrades to the next tier; it never aborts
/// resolution.
pub fn resolve_backend_url_with_file(
    override_url: Option<&str>,
    config_path: Option<&Path>,
) -> BackendConfig {
    // Priority 1: explicit override
    if let Some(url) = override_url {
        return BackendConfig {
            base_url: normalized(url),
        };
    }

    // Priority 2: environment variable
    if let Ok(url) = std::env::var(BACKEND_URL_ENV) {
        if !url.trim().is_empty() {
            info!("Backend address loaded from environment variable");
            return BackendConfig {
                base_url: normalized(&url),
            };
        }
    }

    // Priority 3: TOML config file
    if let Some(path) = config_path {
        if path.exists() {
            match load_toml_config(path) {
                Ok(config) => {
                    if let Some(url) = config.backend_url {
                        info!("Backend address loaded from {}", path.display());
                        return BackendConfig {
                            base_url: normalized(&url),
                        };
                    }
                }
                Err(e) => {
                    warn!("Ignoring config file {}: {}", path.display(), e);
                }
            }
        }
    }

    // Priority 4: compiled default
    BackendConfig {
        base_url: DEFAULT_BACKEND_URL.to_string(),
    }
}

/// Read and parse a TOML config file.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed: {}", e)))?;
    toml::from_str(&content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
}

/// Default configuration file path for the platform
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("irvis").join("config.toml"))
}

/// Strip trailing slashes so endpoint paths join cleanly.
fn normalized(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}
