//! Request instrumentation
//!
//! Wraps a handler and records every request it serves in [`ServerMetrics`], plus an
//! optional access log line. The wrapped handler is never altered: only status, body size,
//! elapsed time, method and path are observed.

use async_trait::async_trait;
use prometheus::IntGauge;
use std::io;
use std::sync::Arc;
use std::time::Instant;

use super::capture::ResponseCapturer;
use super::sink::ResponseWriter;
use super::{FileRequest, Handler};
use crate::http::path;
use crate::logger::{self, AccessLogEntry};
use crate::metrics::{MetricSample, ResourcePath, ServerMetrics};

/// Handler decorator feeding [`ServerMetrics`]
pub struct InstrumentedServer<H> {
    inner: H,
    metrics: Arc<ServerMetrics>,
    access_log: Option<String>,
}

impl<H: Handler> InstrumentedServer<H> {
    pub const fn new(inner: H, metrics: Arc<ServerMetrics>) -> Self {
        Self {
            inner,
            metrics,
            access_log: None,
        }
    }

    /// Also log every request in the given access log format
    #[must_use]
    pub fn with_access_log(mut self, format: impl Into<String>) -> Self {
        self.access_log = Some(format.into());
        self
    }
}

/// Holds one unit of the in-flight gauge, released on drop so that errors, panics and
/// cancelled futures all give it back
struct InFlight<'a>(&'a IntGauge);

impl<'a> InFlight<'a> {
    fn enter(gauge: &'a IntGauge) -> Self {
        gauge.inc();
        Self(gauge)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.dec();
    }
}

#[async_trait]
impl<H: Handler> Handler for InstrumentedServer<H> {
    async fn serve(
        &self,
        request: &mut FileRequest,
        response: &mut dyn ResponseWriter,
    ) -> io::Result<()> {
        let _in_flight = InFlight::enter(&self.metrics.in_flight);

        let mut capturer = ResponseCapturer::new(response);
        let start = Instant::now();
        let result = self.inner.serve(request, &mut capturer).await;
        let duration = start.elapsed();

        let status = capturer.status_or_ok();
        let bytes = capturer.written();
        let canonical = path::canonicalize(&request.path);
        self.metrics.observe(&MetricSample {
            status,
            method: &request.method,
            duration,
            bytes,
            resource: ResourcePath::parse(&canonical),
        });

        if let Some(format) = &self.access_log {
            let entry = AccessLogEntry::from_request(request, status.as_u16(), bytes, duration);
            logger::log_access(&entry, format);
        }
        result
    }
}
