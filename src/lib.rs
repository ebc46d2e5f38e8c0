//! Update artifact server
//!
//! Serves OS images and delta updates from a directory, answers completion probes
//! (`Range: bytes=<size>-`) without transferring data, and records Prometheus metrics
//! for every request, broken down per release image and update version.

pub mod config;
pub mod error;
pub mod handler;
pub mod http;
pub mod logger;
pub mod metrics;
pub mod server;

pub use error::{Result, ServerError};
