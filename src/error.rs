//! Error types for the update server
//!
//! Request handling never produces these: resolution failures are answered by the
//! static file handler and transfer failures stay `io::Error`s at the sink boundary.
//! `ServerError` covers configuration, bootstrap and registry setup.

use std::net::SocketAddr;
use thiserror::Error;

/// Result type alias for server setup operations
pub type Result<T> = std::result::Result<T, ServerError>;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Metrics registry error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("Logging setup failed: {0}")]
    Logging(String),
}

impl ServerError {
    /// Builds an [`ServerError::InvalidConfig`] from anything printable
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }
}
