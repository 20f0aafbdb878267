//! Configuration management for the PDF inspector server

use std::env;
use std::path::PathBuf;

use serde::Deserialize;

/// Default request body limit for uploads: 512 MiB
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 512 * 1024 * 1024;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the documents; identifiers are file names inside it
    pub uploads: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
                max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            },
            storage: StorageConfig {
                uploads: PathBuf::from("./uploads"),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup, falling back to defaults for missing or
    /// unparseable values
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Config::default();
        Config {
            server: ServerConfig {
                host: lookup("SERVER_HOST").unwrap_or(defaults.server.host),
                port: parsed(&lookup, "SERVER_PORT").unwrap_or(defaults.server.port),
                max_upload_bytes: parsed(&lookup, "MAX_UPLOAD_BYTES")
                    .unwrap_or(defaults.server.max_upload_bytes),
            },
            storage: StorageConfig {
                uploads: lookup("UPLOADS")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.storage.uploads),
            },
        }
    }
}

fn parsed<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Ignoring invalid {}={:?}, using default", key, raw);
            None
        }
    }
}
