//! Process settings read from the environment (after `.env` is loaded by the binary).

use crate::error::ConfigError;
use std::net::SocketAddr;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
/// 1 MiB.
pub const DEFAULT_BODY_LIMIT_BYTES: usize = 1024 * 1024;

#[derive(Clone, Debug)]
pub struct Settings {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub body_limit_bytes: usize,
}

impl Settings {
    /// `DATABASE_URL` is required. `BIND_ADDR` and `BODY_LIMIT_BYTES` fall back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::MissingVar("DATABASE_URL"))?;

        let bind_raw = lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.into());
        let bind_addr = bind_raw.parse().map_err(|_| ConfigError::Invalid {
            name: "BIND_ADDR",
            reason: format!("not a socket address: {}", bind_raw),
        })?;

        let body_limit_bytes = match lookup("BODY_LIMIT_BYTES") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
                name: "BODY_LIMIT_BYTES",
                reason: format!("not a byte count: {}", raw),
            })?,
            None => DEFAULT_BODY_LIMIT_BYTES,
        };

        Ok(Settings {
            database_url,
            bind_addr,
            body_limit_bytes,
        })
    }
}
