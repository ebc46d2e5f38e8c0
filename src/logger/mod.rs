//! Logger module
//!
//! Provides logging utilities for the update server including:
//! - Subscriber setup from configuration
//! - Server lifecycle logging
//! - Access logging with multiple formats, emitted under the `access` target

mod format;

pub use format::AccessLogEntry;

use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

use crate::config::{Config, LoggingConfig};
use crate::error::{Result, ServerError};

/// Target access log lines are emitted under, so they can be filtered separately
pub const ACCESS_TARGET: &str = "access";

/// Initialize the global subscriber
///
/// `RUST_LOG` takes precedence over the configured level. Should be called once at
/// application startup.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => filter_for(&config.level)?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|e| ServerError::Logging(e.to_string()))
}

/// Builds a filter from a level or directive list such as `info,swupd_server=debug`
fn filter_for(level: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(level)
        .map_err(|e| ServerError::Logging(format!("invalid level '{level}': {e}")))
}

pub fn log_server_start(addr: &SocketAddr, config: &Config) {
    tracing::info!(
        root = %config.files.root.display(),
        workers = ?config.server.workers,
        access_log = config.logging.access_log,
        "Serving updates on http://{addr}"
    );
}

pub fn log_info(message: &str) {
    tracing::info!("{message}");
}

pub fn log_debug(message: &str) {
    tracing::debug!("{message}");
}

pub fn log_warning(message: &str) {
    tracing::warn!("{message}");
}

pub fn log_error(message: &str) {
    tracing::error!("{message}");
}

pub fn log_connection_error(err: &impl std::fmt::Display) {
    tracing::debug!("Failed to serve connection: {err}");
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    tracing::info!(target: ACCESS_TARGET, "{}", entry.format(format));
}
