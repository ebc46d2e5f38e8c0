// Configuration module entry point
// Loads layered configuration (file, environment, defaults) and validates it

mod types;

use std::net::SocketAddr;

use crate::error::{Result, ServerError};

pub use types::{
    Config, FilesConfig, LoggingConfig, MetricsConfig, PerformanceConfig, ServerConfig,
    DEFAULT_READ_BUFFER_SIZE,
};

/// Default config file, looked up without extension so any format `config` knows works
pub const DEFAULT_CONFIG_PATH: &str = "config";

impl Config {
    /// Load configuration from specified file path (without extension)
    ///
    /// The file is optional. Environment variables prefixed with `SWUPD` override it,
    /// nested keys are separated by `__` (e.g. `SWUPD_FILES__ROOT=/srv/www`).
    pub fn load_from(config_path: &str) -> Result<Self> {
        let defaults = MetricsConfig::default();
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("SWUPD")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 80)?
            .set_default("server.metrics_host", "0.0.0.0")?
            .set_default("server.metrics_port", 9700)?
            .set_default("files.root", "/www")?
            .set_default("files.index_files", vec!["index.html"])?
            .set_default("files.read_buffer_size", DEFAULT_READ_BUFFER_SIZE as i64)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", false)?
            .set_default("logging.access_log_format", "combined")?
            .set_default("performance.keep_alive", true)?
            .set_default("metrics.namespace", defaults.namespace)?
            .set_default("metrics.duration_buckets", defaults.duration_buckets)?
            .set_default("metrics.size_buckets", defaults.size_buckets)?
            .set_default("metrics.throughput_buckets", defaults.throughput_buckets)?
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Checks everything that deserialization alone cannot
    pub fn validate(&self) -> Result<()> {
        self.get_socket_addr()?;
        self.get_metrics_socket_addr()?;

        if !self.files.root.is_dir() {
            return Err(ServerError::invalid_config(format!(
                "served root {} is not a directory",
                self.files.root.display()
            )));
        }

        if self.files.read_buffer_size == 0 {
            return Err(ServerError::invalid_config(
                "files.read_buffer_size must be positive",
            ));
        }

        if self.metrics.namespace.is_empty() {
            return Err(ServerError::invalid_config(
                "metrics.namespace must not be empty",
            ));
        }

        check_buckets("metrics.duration_buckets", &self.metrics.duration_buckets)?;
        check_buckets("metrics.size_buckets", &self.metrics.size_buckets)?;
        check_buckets(
            "metrics.throughput_buckets",
            &self.metrics.throughput_buckets,
        )?;

        Ok(())
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr> {
        parse_addr(&self.server.host, self.server.port)
    }

    pub fn get_metrics_socket_addr(&self) -> Result<SocketAddr> {
        parse_addr(&self.server.metrics_host, self.server.metrics_port)
    }
}

fn parse_addr(host: &str, port: u16) -> Result<SocketAddr> {
    // Bare IPv6 literals need brackets to be combined with a port
    let addr = if host.contains(':') && !host.starts_with('[') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    };
    addr.parse()
        .map_err(|e| ServerError::InvalidAddress(format!("{addr}: {e}")))
}

/// Histogram buckets must be non-empty and strictly increasing
fn check_buckets(name: &str, buckets: &[f64]) -> Result<()> {
    if buckets.is_empty() {
        return Err(ServerError::invalid_config(format!("{name} is empty")));
    }
    if buckets.iter().any(|b| b.is_nan()) {
        return Err(ServerError::invalid_config(format!("{name} contains NaN")));
    }
    if buckets.windows(2).any(|pair| pair[0] >= pair[1]) {
        return Err(ServerError::invalid_config(format!(
            "{name} must be strictly increasing"
        )));
    }
    Ok(())
}
