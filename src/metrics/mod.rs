//! Prometheus metrics for the update server
//!
//! All families live in a [`Registry`] supplied by the caller, so tests can use a
//! private one and the process exposes its own through [`endpoint`].

pub mod endpoint;
mod resource;

pub use resource::ResourcePath;

use hyper::{Method, StatusCode};
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry};
use std::time::Duration;

use crate::config::MetricsConfig;

/// Outcome of one completed request
#[derive(Debug, Clone)]
pub struct MetricSample<'a> {
    pub status: StatusCode,
    pub method: &'a Method,
    pub duration: Duration,
    pub bytes: u64,
    pub resource: ResourcePath<'a>,
}

impl MetricSample<'_> {
    /// Bytes per second. A zero duration yields an infinite or NaN rate, which is recorded
    /// as is.
    #[allow(clippy::cast_precision_loss)]
    pub fn throughput(&self) -> f64 {
        self.bytes as f64 / self.duration.as_secs_f64()
    }
}

/// Metric families describing update traffic
#[derive(Clone)]
pub struct ServerMetrics {
    /// Requests currently being served
    pub in_flight: IntGauge,
    pub requests_total: IntCounterVec,
    pub response_bytes_total: IntCounterVec,
    pub request_duration_seconds: HistogramVec,
    pub response_size_bytes: HistogramVec,
    pub response_throughput: HistogramVec,
    /// Requests for `/images/<release>/<image>`
    pub image_downloads_total: IntCounterVec,
    /// Requests for `/update/<release>/<version>/...`
    pub update_downloads_total: IntCounterVec,
}

const CODE_METHOD: &[&str] = &["code", "method"];

impl ServerMetrics {
    /// Creates every family and registers it with `registry`
    pub fn new(registry: &Registry, config: &MetricsConfig) -> Result<Self, prometheus::Error> {
        let ns = config.namespace.as_str();

        let in_flight = IntGauge::with_opts(
            Opts::new(
                "http_requests_inflight",
                "Number of HTTP requests currently being served",
            )
            .namespace(ns),
        )?;
        registry.register(Box::new(in_flight.clone()))?;

        let requests_total = IntCounterVec::new(
            Opts::new("http_requests_total", "Total number of HTTP requests").namespace(ns),
            CODE_METHOD,
        )?;
        registry.register(Box::new(requests_total.clone()))?;

        let response_bytes_total = IntCounterVec::new(
            Opts::new(
                "http_response_bytes_total",
                "Total number of response body bytes written",
            )
            .namespace(ns),
            CODE_METHOD,
        )?;
        registry.register(Box::new(response_bytes_total.clone()))?;

        let request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "Time spent serving HTTP requests in seconds",
            )
            .namespace(ns)
            .buckets(config.duration_buckets.clone()),
            CODE_METHOD,
        )?;
        registry.register(Box::new(request_duration_seconds.clone()))?;

        let response_size_bytes = HistogramVec::new(
            HistogramOpts::new("http_response_size_bytes", "Size of HTTP responses in bytes")
                .namespace(ns)
                .buckets(config.size_buckets.clone()),
            CODE_METHOD,
        )?;
        registry.register(Box::new(response_size_bytes.clone()))?;

        let response_throughput = HistogramVec::new(
            HistogramOpts::new(
                "http_response_throughput",
                "Response transfer rate in bytes per second",
            )
            .namespace(ns)
            .buckets(config.throughput_buckets.clone()),
            CODE_METHOD,
        )?;
        registry.register(Box::new(response_throughput.clone()))?;

        let image_downloads_total = IntCounterVec::new(
            Opts::new("image_downloads_total", "Requests for release images").namespace(ns),
            &["code", "release", "image"],
        )?;
        registry.register(Box::new(image_downloads_total.clone()))?;

        let update_downloads_total = IntCounterVec::new(
            Opts::new("update_downloads_total", "Requests for update content").namespace(ns),
            &["code", "release", "version"],
        )?;
        registry.register(Box::new(update_downloads_total.clone()))?;

        Ok(Self {
            in_flight,
            requests_total,
            response_bytes_total,
            request_duration_seconds,
            response_size_bytes,
            response_throughput,
            image_downloads_total,
            update_downloads_total,
        })
    }

    /// Records a completed request in every applicable family
    pub fn observe(&self, sample: &MetricSample<'_>) {
        let code = sample.status.as_u16().to_string();
        let method = sample.method.as_str().to_ascii_lowercase();
        let labels = [code.as_str(), method.as_str()];

        self.requests_total.with_label_values(&labels).inc();
        self.response_bytes_total
            .with_label_values(&labels)
            .inc_by(sample.bytes);
        self.request_duration_seconds
            .with_label_values(&labels)
            .observe(sample.duration.as_secs_f64());
        #[allow(clippy::cast_precision_loss)]
        let size = sample.bytes as f64;
        self.response_size_bytes
            .with_label_values(&labels)
            .observe(size);
        self.response_throughput
            .with_label_values(&labels)
            .observe(sample.throughput());

        match sample.resource {
            ResourcePath::Image { release, image } => self
                .image_downloads_total
                .with_label_values(&[code.as_str(), release, image])
                .inc(),
            ResourcePath::Update { release, version } => self
                .update_downloads_total
                .with_label_values(&[code.as_str(), release, version])
                .inc(),
            ResourcePath::Other => {}
        }
    }
}
