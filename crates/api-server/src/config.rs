//! Server configuration
//!
//! Read once at startup from `TASKDESK_*` environment variables.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_DATA_DIR: &str = ".taskdesk-data";
const DEFAULT_JWT_SECRET: &str = "dev-jwt-secret-change-me";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub data_dir: PathBuf,
    pub jwt_secret: String,
    pub request_timeout: Duration,
    /// Email of a manager account created at startup if missing
    pub bootstrap_manager: Option<String>,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let value = |name: &str| {
            lookup(name)
                .map(|raw| raw.trim().to_string())
                .filter(|raw| !raw.is_empty())
        };

        let bind_addr = value("TASKDESK_BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|err| ConfigError::Invalid {
                name: "TASKDESK_BIND_ADDR",
                reason: err.to_string(),
            })?;

        let request_timeout = match value("TASKDESK_REQUEST_TIMEOUT_SECS") {
            Some(raw) => raw
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| ConfigError::Invalid {
                    name: "TASKDESK_REQUEST_TIMEOUT_SECS",
                    reason: format!("expected a positive number of seconds, got '{}'", raw),
                })?,
            None => DEFAULT_REQUEST_TIMEOUT_SECS,
        };

        Ok(Self {
            bind_addr,
            data_dir: PathBuf::from(
                value("TASKDESK_DATA_DIR").unwrap_or_else(|| DEFAULT_DATA_DIR.to_string()),
            ),
            jwt_secret: value("TASKDESK_JWT_SECRET")
                .unwrap_or_else(|| DEFAULT_JWT_SECRET.to_string()),
            request_timeout: Duration::from_secs(request_timeout),
            bootstrap_manager: value("TASKDESK_BOOTSTRAP_MANAGER"),
        })
    }

    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join("store.json")
    }
}
