//! # Server Configuration
//!
//! Optional TOML configuration for the HTTP server. Everything has a
//! sensible default; the config file only overrides what it names.
//! CLI flags override the file, environment variables override neither
//! (they configure the middleware directly, see the api module).

use registra_core::RegistryError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default bind host.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default bind port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default active semester when no seed file supplies one.
pub const DEFAULT_SEMESTER: u16 = 1;

// =============================================================================
// SERVER CONFIG
// =============================================================================

/// Server configuration loaded from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to.
    pub host: String,
    /// Port to bind to.
    pub port: u16,
    /// Active semester for a fresh registry.
    pub semester: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            semester: DEFAULT_SEMESTER,
        }
    }
}

impl ServerConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, RegistryError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            RegistryError::Io(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        toml::from_str(&raw).map_err(|e| {
            RegistryError::Serialization(format!(
                "Invalid config '{}': {}",
                path.display(),
                e
            ))
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_apply_for_missing_keys() {
        let config: ServerConfig = toml::from_str("port = 9001").expect("parse");
        assert_eq!(config.port, 9001);
        assert_eq!(config.host, DEFAULT_HOST);
        assert_eq!(config.semester, DEFAULT_SEMESTER);
    }

    #[test]
    fn load_rejects_malformed_file() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        write!(file, "port = \"not a number\"").expect("write");
        assert!(ServerConfig::load(file.path()).is_err());
    }

    #[test]
    fn load_reads_full_config() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        write!(file, "host = \"0.0.0.0\"\nport = 9000\nsemester = 3").expect("write");
        let config = ServerConfig::load(file.path()).expect("load");
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 9000);
        assert_eq!(config.semester, 3);
    }
}
