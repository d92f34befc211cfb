//! Server configuration
//!
//! Loaded from the JSON file named by `CONFIG_PATH`, then overridden from
//! the environment. Every field has a default so a partial file is fine.

use std::path::{Path, PathBuf};

use rentflow_mpesa::MpesaConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default config location
pub const DEFAULT_CONFIG_PATH: &str = "config/rentflow.json";

/// Shortest accepted HS256 signing secret, in bytes
pub const MIN_JWT_SECRET_LEN: usize = 32;

/// Placeholder secrets that must never sign production tokens
const PLACEHOLDER_SECRETS: &[&str] = &["rentflow-dev-secret-change-me", "change-me", "secret"];

/// Configuration the server refuses to start with
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("JWT secret is not set; provide jwt.secret or JWT_SECRET")]
    MissingJwtSecret,

    #[error("JWT secret is a published placeholder")]
    PlaceholderJwtSecret,

    #[error("JWT secret must be at least {MIN_JWT_SECRET_LEN} bytes")]
    WeakJwtSecret,
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub jwt: JwtConfig,
    pub mpesa: MpesaConfig,
    pub storage: StorageConfig,
    pub reconciliation: ReconciliationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins; empty allows any
    pub cors_origins: Vec<String>,
    /// Mark the refresh cookie `Secure`
    pub secure_cookies: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            cors_origins: Vec::new(),
            secure_cookies: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JwtConfig {
    /// HS256 signing secret. No default: the server will not start without one.
    pub secret: String,
    pub access_ttl_secs: i64,
    pub refresh_ttl_secs: i64,
    pub issuer: String,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            access_ttl_secs: 15 * 60,
            refresh_ttl_secs: 7 * 24 * 60 * 60,
            issuer: "rentflow".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON snapshot loaded at boot and written on shutdown
    pub data_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconciliationConfig {
    pub queue_capacity: usize,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self { queue_capacity: 1024 }
    }
}

impl AppConfig {
    /// Load from file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Apply overrides from the process environment
    pub fn with_env(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`, keyed by environment variable name
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(host) = lookup("HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
        if let Some(secret) = lookup("JWT_SECRET") {
            self.jwt.secret = secret;
        }
        if let Some(path) = lookup("DATA_FILE") {
            self.storage.data_file = Some(PathBuf::from(path));
        }

        let mpesa = &mut self.mpesa;
        for (key, slot) in [
            ("MPESA_BASE_URL", &mut mpesa.base_url),
            ("MPESA_CONSUMER_KEY", &mut mpesa.consumer_key),
            ("MPESA_CONSUMER_SECRET", &mut mpesa.consumer_secret),
            ("MPESA_SHORTCODE", &mut mpesa.shortcode),
            ("MPESA_PASSKEY", &mut mpesa.passkey),
            ("MPESA_CALLBACK_URL", &mut mpesa.callback_url),
        ] {
            if let Some(value) = lookup(key) {
                *slot = value;
            }
        }
        self
    }

    /// Reject settings that would let anyone mint tokens
    pub fn validate(&self) -> Result<(), ConfigError> {
        let secret = self.jwt.secret.trim();
        if secret.is_empty() {
            return Err(ConfigError::MissingJwtSecret);
        }
        if PLACEHOLDER_SECRETS.contains(&secret) {
            return Err(ConfigError::PlaceholderJwtSecret);
        }
        if secret.len() < MIN_JWT_SECRET_LEN {
            return Err(ConfigError::WeakJwtSecret);
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
