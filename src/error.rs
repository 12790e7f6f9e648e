//! Error types.
//!
//! Application-level outcomes (404, 405, 500, 504) are expressed as
//! [`Response`](crate::Response) values, not as errors. These types cover
//! what can stop the process: bad configuration and listener failures.

use std::net::SocketAddr;
use std::num::ParseIntError;

use thiserror::Error;

/// Infrastructure failure surfaced by [`Server`](crate::Server).
#[derive(Debug, Error)]
pub enum Error {
    /// The listener could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// The listener stopped accepting connections for good.
    #[error("accept failed: {0}")]
    Accept(#[source] std::io::Error),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Invalid process configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// `PORT` is set but is not a port number in `0..=65535`.
    #[error("invalid PORT value {value:?}: {source}")]
    InvalidPort {
        value: String,
        #[source]
        source: ParseIntError,
    },
}
