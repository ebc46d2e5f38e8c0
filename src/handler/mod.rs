//! Request handler module
//!
//! Handlers are composable: each one serves a request into a [`ResponseWriter`] and may
//! wrap another handler. The production chain is
//! [`InstrumentedServer`] around [`CompletionFileServer`] around [`StaticFiles`].

pub mod capture;
pub mod completion;
pub mod instrument;
pub mod sink;
pub mod static_files;

#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;
use hyper::header::{HeaderMap, HeaderName};
use hyper::{Method, Version};
use std::io;
use std::net::SocketAddr;

use crate::http::path::decode_path;

pub use capture::ResponseCapturer;
pub use completion::CompletionFileServer;
pub use instrument::InstrumentedServer;
pub use sink::ResponseWriter;
pub use static_files::StaticFiles;

/// Request as seen by handlers
///
/// Handlers may rewrite `path`; every later stage observes the rewritten value.
#[derive(Debug, Clone)]
pub struct FileRequest {
    pub method: Method,
    /// Percent-decoded URL path
    pub path: String,
    /// Raw query string, without `?`
    pub query: Option<String>,
    pub version: Version,
    pub headers: HeaderMap,
    pub remote_addr: Option<SocketAddr>,
}

impl FileRequest {
    /// Request with no headers, mostly useful in tests
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: None,
            version: Version::HTTP_11,
            headers: HeaderMap::new(),
            remote_addr: None,
        }
    }

    pub fn from_parts(parts: &hyper::http::request::Parts, remote_addr: Option<SocketAddr>) -> Self {
        Self {
            method: parts.method.clone(),
            path: decode_path(parts.uri.path()),
            query: parts.uri.query().map(str::to_string),
            version: parts.version,
            headers: parts.headers.clone(),
            remote_addr,
        }
    }

    /// Adds a header, builder style
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: &str) -> Self {
        if let Ok(value) = value.parse() {
            self.headers.insert(name, value);
        }
        self
    }

    pub fn is_head(&self) -> bool {
        self.method == Method::HEAD
    }

    pub fn header(&self, name: &HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Something that can serve a request
///
/// An `Err` means the response could not be completed, typically because the client went
/// away mid-transfer. Whatever was already written stays written.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn serve(
        &self,
        request: &mut FileRequest,
        response: &mut dyn ResponseWriter,
    ) -> io::Result<()>;
}
