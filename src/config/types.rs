// Configuration types module
// Defines all configuration-related data structures

use serde::Deserialize;
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub files: FilesConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
    pub metrics: MetricsConfig,
}

/// Listener configuration for the update and metrics servers
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub metrics_host: String,
    pub metrics_port: u16,
    pub workers: Option<usize>,
}

/// Served directory configuration
#[derive(Debug, Deserialize, Clone)]
pub struct FilesConfig {
    /// Root directory holding `images/` and `update/`
    pub root: PathBuf,
    /// Files tried in order when a directory is requested
    #[serde(default = "default_index_files")]
    pub index_files: Vec<String>,
    /// Size of the chunks streamed to the client
    pub read_buffer_size: usize,
}

fn default_index_files() -> Vec<String> {
    vec!["index.html".to_string()]
}

impl FilesConfig {
    /// Configuration serving `root` with default settings, mostly useful in tests
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            index_files: default_index_files(),
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
        }
    }
}

pub const DEFAULT_READ_BUFFER_SIZE: usize = 64 * 1024;

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub access_log: bool,
    /// Access log format (combined, common, json, or custom pattern)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
}

#[allow(clippy::missing_const_for_fn)]
fn default_access_log_format() -> String {
    "combined".to_string()
}

/// Connection handling configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    pub keep_alive: bool,
    pub max_connections: Option<u64>,
}

/// Metric naming and histogram layout
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct MetricsConfig {
    pub namespace: String,
    #[serde(default = "default_duration_buckets")]
    pub duration_buckets: Vec<f64>,
    #[serde(default = "default_size_buckets")]
    pub size_buckets: Vec<f64>,
    #[serde(default = "default_throughput_buckets")]
    pub throughput_buckets: Vec<f64>,
}

const KIB: f64 = 1024.0;
const MIB: f64 = 1024.0 * KIB;
const GIB: f64 = 1024.0 * MIB;

/// Seconds, from sub-second probes to ten minute image downloads
pub fn default_duration_buckets() -> Vec<f64> {
    vec![0.1, 1.0, 10.0, 60.0, 600.0]
}

/// Bytes per response
pub fn default_size_buckets() -> Vec<f64> {
    vec![100.0 * KIB, MIB, 10.0 * MIB, 100.0 * MIB, GIB]
}

/// Bytes per second
pub fn default_throughput_buckets() -> Vec<f64> {
    vec![KIB, 100.0 * KIB, MIB, 10.0 * MIB, 100.0 * MIB]
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            namespace: "swupd".to_string(),
            duration_buckets: default_duration_buckets(),
            size_buckets: default_size_buckets(),
            throughput_buckets: default_throughput_buckets(),
        }
    }
}
