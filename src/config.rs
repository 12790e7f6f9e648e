//! Process configuration.
//!
//! The only knob is the listening port, taken from `PORT`. The listener
//! always binds all interfaces.

use std::net::{Ipv4Addr, SocketAddr};

use crate::error::ConfigError;

/// Port used when `PORT` is unset or empty.
pub const DEFAULT_PORT: u16 = 8080;

/// Name of the environment variable holding the port.
pub const PORT_VAR: &str = "PORT";

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Config {
    pub port: u16,
}

impl Config {
    /// Builds the configuration from an arbitrary variable lookup.
    ///
    /// An unset, empty or whitespace-only `PORT` selects [`DEFAULT_PORT`].
    /// Anything else must parse as a `u16`; a non-numeric or out-of-range
    /// value is an error rather than a silent fallback.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match lookup(PORT_VAR) {
            Some(raw) if !raw.trim().is_empty() => raw
                .trim()
                .parse()
                .map_err(|source| ConfigError::InvalidPort { value: raw.clone(), source })?,
            _ => DEFAULT_PORT,
        };
        Ok(Self { port })
    }

    /// `0.0.0.0:<port>`.
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self { port: DEFAULT_PORT }
    }
}

/// Reads the configuration from the process environment.
pub fn load_config() -> Result<Config, ConfigError> {
    Config::from_lookup(|key| std::env::var(key).ok())
}
