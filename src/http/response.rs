//! HTTP response building module
//!
//! Small responses that don't come from files: error statuses written into a
//! [`ResponseWriter`], and complete responses for the metrics endpoint.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderValue, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, ETAG};
use hyper::{Response, StatusCode};
use std::io;

use crate::handler::sink::{write_all, ResponseWriter};

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// Write a short plain text response, e.g. `404 Not Found`
pub async fn send_text(
    sink: &mut dyn ResponseWriter,
    status: StatusCode,
    is_head: bool,
) -> io::Result<()> {
    let body = format!(
        "{} {}\n",
        status.as_u16(),
        status.canonical_reason().unwrap_or_default()
    );
    let headers = sink.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN));
    headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len()));
    sink.write_head(status);
    if is_head {
        return Ok(());
    }
    write_all(sink, Bytes::from(body)).await
}

/// Write 404 Not Found
pub async fn send_404(sink: &mut dyn ResponseWriter, is_head: bool) -> io::Result<()> {
    send_text(sink, StatusCode::NOT_FOUND, is_head).await
}

/// Write 416 Range Not Satisfiable
pub async fn send_416(
    sink: &mut dyn ResponseWriter,
    file_size: u64,
    is_head: bool,
) -> io::Result<()> {
    if let Ok(value) = HeaderValue::from_str(&format!("bytes */{file_size}")) {
        sink.headers_mut().insert(CONTENT_RANGE, value);
    }
    send_text(sink, StatusCode::RANGE_NOT_SATISFIABLE, is_head).await
}

/// Write 304 Not Modified, which never carries a body
pub fn send_304(sink: &mut dyn ResponseWriter, etag: &str) {
    if let Ok(value) = HeaderValue::from_str(etag) {
        sink.headers_mut().insert(ETAG, value);
    }
    sink.write_head(StatusCode::NOT_MODIFIED);
}

/// Build a complete plain text response
pub fn build_text_response(status: StatusCode) -> Response<Full<Bytes>> {
    let body = format!(
        "{} {}\n",
        status.as_u16(),
        status.canonical_reason().unwrap_or_default()
    );
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, TEXT_PLAIN)
        .body(Full::new(Bytes::from(body)))
        .unwrap_or_else(|e| {
            log_build_error(status, &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Build the response for a metrics scrape
pub fn build_metrics_response(body: Vec<u8>, content_type: &str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, content_type)
        .body(Full::new(Bytes::from(body)))
        .unwrap_or_else(|e| {
            log_build_error(StatusCode::OK, &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Log response build error
fn log_build_error(status: StatusCode, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::testing::RecordingWriter;

    #[tokio::test]
    async fn test_send_404() {
        let mut sink = RecordingWriter::default();
        send_404(&mut sink, false).await.unwrap();
        assert_eq!(sink.status(), Some(StatusCode::NOT_FOUND));
        assert_eq!(sink.body, b"404 Not Found\n");
        assert_eq!(sink.headers[CONTENT_LENGTH], "14");
    }

    #[tokio::test]
    async fn test_head_has_no_body() {
        let mut sink = RecordingWriter::default();
        send_416(&mut sink, 42, true).await.unwrap();
        assert_eq!(sink.status(), Some(StatusCode::RANGE_NOT_SATISFIABLE));
        assert_eq!(sink.headers[CONTENT_RANGE], "bytes */42");
        assert!(sink.body.is_empty());
    }

    #[test]
    fn test_build_text_response() {
        let response = build_text_response(StatusCode::NOT_FOUND);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers()[CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
    }
}
