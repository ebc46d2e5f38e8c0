//! Metrics scrape endpoint
//!
//! Serves the registry in the Prometheus text format on its own listener, separate from
//! the update traffic it describes.

use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use prometheus::{Encoder, Registry, TextEncoder};
use std::convert::Infallible;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::http::response::{build_metrics_response, build_text_response};
use crate::logger;
use crate::server::signal::Shutdown;

pub const METRICS_PATH: &str = "/metrics";

/// Encodes every family in `registry`
pub fn render(registry: &Registry) -> Result<(Vec<u8>, String), prometheus::Error> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&registry.gather(), &mut buffer)?;
    Ok((buffer, encoder.format_type().to_string()))
}

/// Answers one request against the metrics listener
pub fn route(method: &Method, path: &str, registry: &Registry) -> Response<Full<Bytes>> {
    if path != METRICS_PATH {
        return build_text_response(StatusCode::NOT_FOUND);
    }
    if *method != Method::GET && *method != Method::HEAD {
        return build_text_response(StatusCode::METHOD_NOT_ALLOWED);
    }
    match render(registry) {
        Ok((body, content_type)) => build_metrics_response(body, &content_type),
        Err(e) => {
            logger::log_error(&format!("Failed to encode metrics: {e}"));
            build_text_response(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Serves scrapes until shutdown is requested
pub async fn serve(listener: TcpListener, registry: Registry, shutdown: Shutdown) {
    if let Ok(addr) = listener.local_addr() {
        logger::log_info(&format!("Metrics endpoint listening on http://{addr}{METRICS_PATH}"));
    }
    let registry = Arc::new(registry);
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, _) = match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        logger::log_error(&format!("Metrics listener failed to accept: {e}"));
                        continue;
                    }
                };
                let registry = Arc::clone(&registry);
                tokio::spawn(async move {
                    let service = service_fn(move |req: Request<Incoming>| {
                        let registry = Arc::clone(&registry);
                        async move {
                            Ok::<_, Infallible>(route(req.method(), req.uri().path(), &registry))
                        }
                    });
                    if let Err(err) = http1::Builder::new()
                        .serve_connection(TokioIo::new(stream), service)
                        .await
                    {
                        logger::log_connection_error(&err);
                    }
                });
            }
            () = shutdown.wait() => {
                logger::log_info("Metrics endpoint stopped");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MetricsConfig;
    use crate::metrics::ServerMetrics;

    #[test]
    fn test_scrape() {
        let registry = Registry::new();
        let metrics = ServerMetrics::new(&registry, &MetricsConfig::default()).unwrap();
        metrics.in_flight.inc();
        metrics.requests_total.with_label_values(&["200", "get"]).inc();

        let (body, content_type) = render(&registry).unwrap();
        let text = String::from_utf8(body).unwrap();
        assert!(content_type.starts_with("text/plain"));
        assert!(text.contains("swupd_http_requests_inflight 1"));
        assert!(text.contains("swupd_http_requests_total{code=\"200\",method=\"get\"} 1"));

        let response = route(&Method::GET, "/metrics", &registry);
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_other_paths() {
        let registry = Registry::new();
        assert_eq!(
            route(&Method::GET, "/", &registry).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            route(&Method::POST, "/metrics", &registry).status(),
            StatusCode::METHOD_NOT_ALLOWED
        );
    }
}
