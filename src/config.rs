//! Server configuration from environment variables
//!
//! - ALERTS_HOST: Bind address (default: 0.0.0.0)
//! - ALERTS_PORT: Port number (default: 3000)
//! - ALERTS_DATA_FILE: JSON file for alert storage (default: unset, in-memory)
//! - USER_SERVICE_URI: Identity service base URI
//!   (default: http://$USER_SERVICE_HOST:$USER_SERVICE_PORT, i.e. http://user-service:3001)
//! - ALERTS_HEARTBEAT_SECS: Stream keep-alive interval (default: 30)
//! - ALERTS_DELIVERY_TIMEOUT_SECS: Bound on one delivery attempt (default: 10)
//! - ALERTS_CLIENT_BUFFER: Frames buffered per stream viewer (default: 64)

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::api::ServerConfig;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid numeric env var {name}=\"{value}\"")]
    InvalidNumber { name: String, value: String },

    #[error("Env var {name} must be greater than zero")]
    NotPositive { name: String },
}

impl ServerConfig {
    /// Build the configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = ServerConfig::default();
        let text = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let user_service_uri = match text("USER_SERVICE_URI") {
            Some(uri) => uri,
            None => {
                let host = text("USER_SERVICE_HOST").unwrap_or_else(|| "user-service".to_string());
                let port: u16 = number(&lookup, "USER_SERVICE_PORT", 3001)?;
                format!("http://{}:{}", host, port)
            }
        };

        Ok(Self {
            host: text("ALERTS_HOST").unwrap_or(defaults.host),
            port: number(&lookup, "ALERTS_PORT", defaults.port)?,
            data_file: text("ALERTS_DATA_FILE").map(PathBuf::from),
            user_service_uri,
            heartbeat_interval: Duration::from_secs(positive(
                &lookup,
                "ALERTS_HEARTBEAT_SECS",
                defaults.heartbeat_interval.as_secs(),
            )?),
            delivery_timeout: Duration::from_secs(positive(
                &lookup,
                "ALERTS_DELIVERY_TIMEOUT_SECS",
                defaults.delivery_timeout.as_secs(),
            )?),
            client_buffer: positive(&lookup, "ALERTS_CLIENT_BUFFER", defaults.client_buffer)?,
        })
    }
}

fn number<T, F>(lookup: &F, name: &str, fallback: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(raw) if !raw.trim().is_empty() => {
            raw.trim().parse().map_err(|_| ConfigError::InvalidNumber {
                name: name.to_string(),
                value: raw,
            })
        }
        _ => Ok(fallback),
    }
}

/// Like [`number`], but zero is rejected
fn positive<T, F>(lookup: &F, name: &str, fallback: T) -> Result<T, ConfigError>
where
    T: FromStr + Default + PartialEq,
    F: Fn(&str) -> Option<String>,
{
    let value = number(lookup, name, fallback)?;
    if value == T::default() {
        return Err(ConfigError::NotPositive {
            name: name.to_string(),
        });
    }
    Ok(value)
}
