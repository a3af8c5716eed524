//! Service configuration
//!
//! Defaults, then an optional JSON document, then `RESERVE__`-prefixed
//! environment overrides. Unknown fields in the document are ignored;
//! missing or invalid required values are a startup-time fatal error.

use config::{ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server settings
    pub server: ServerConfig,
    /// Ledger store settings
    pub ledger: LedgerConfig,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind host
    pub host: String,
    /// Bind port
    pub port: u16,
    /// Worker threads
    pub workers: usize,
}

/// Ledger store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Path of the JSON-lines transaction store
    pub store_path: PathBuf,
}

impl Config {
    /// Load configuration
    ///
    /// `path` points at a JSON document; when absent the `RESERVE_CONFIG`
    /// environment variable is consulted, and with neither set only the
    /// defaults and environment overrides apply.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.workers", 4)?
            .set_default("ledger.store_path", "./data/ledger.jsonl")?;

        if let Some(path) = path {
            builder = builder.add_source(File::new(path, FileFormat::Json));
        } else if let Ok(path) = env::var("RESERVE_CONFIG") {
            builder = builder.add_source(File::new(&path, FileFormat::Json));
        }

        builder = builder.add_source(Environment::with_prefix("RESERVE").separator("__"));

        builder.build()?.try_deserialize()
    }

    /// Reject configurations the service cannot start with
    pub fn validate(&self) -> Result<(), String> {
        if self.server.host.is_empty() {
            return Err("server host must not be empty".to_string());
        }
        if self.ledger.store_path.as_os_str().is_empty() {
            return Err("ledger store path must not be empty".to_string());
        }
        Ok(())
    }
}
