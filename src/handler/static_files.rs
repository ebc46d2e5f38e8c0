//! Static file serving module
//!
//! Serves files below a root directory with conditional request, byte range and
//! directory index support. File contents are streamed in fixed size chunks, never
//! loaded whole.

use async_trait::async_trait;
use hyper::body::Bytes;
use hyper::header::{
    HeaderValue, ACCEPT_RANGES, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, ETAG, LAST_MODIFIED,
};
use hyper::StatusCode;
use std::fs::Metadata;
use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use super::sink::{write_all, ResponseWriter};
use super::{FileRequest, Handler};
use crate::config::FilesConfig;
use crate::http::cache::{Precondition, Validators};
use crate::http::range::{effective_range, parse_range_header, RangeParseResult};
use crate::http::{mime, path, response};
use crate::logger;

/// Plain file server rooted at a directory
#[derive(Debug, Clone)]
pub struct StaticFiles {
    root: PathBuf,
    index_files: Vec<String>,
    read_buffer_size: usize,
}

impl StaticFiles {
    pub fn new(config: &FilesConfig) -> Self {
        Self {
            root: path::canonical_root(&config.root),
            index_files: config.index_files.clone(),
            read_buffer_size: config.read_buffer_size.max(1),
        }
    }

    /// The served root with symlinks resolved
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Finds the regular file a canonical request path refers to, trying index files for
    /// directories. Symlinks may not lead outside the root.
    async fn locate(&self, canonical: &str) -> Option<(PathBuf, Metadata)> {
        let mut file_path = path::resolve(&self.root, canonical);
        let mut metadata = fs::metadata(&file_path).await.ok()?;

        if metadata.is_dir() {
            let mut found = None;
            for index_file in &self.index_files {
                let candidate = file_path.join(index_file);
                if let Ok(m) = fs::metadata(&candidate).await {
                    if m.is_file() {
                        found = Some((candidate, m));
                        break;
                    }
                }
            }
            (file_path, metadata) = found?;
        }

        if !metadata.is_file() {
            return None;
        }

        if path::confine(&self.root, &file_path).await.is_none() {
            logger::log_warning(&format!("Path traversal attempt blocked: {canonical}"));
            return None;
        }

        Some((file_path, metadata))
    }

    async fn stream(
        &self,
        file: &mut File,
        start: u64,
        length: u64,
        response: &mut dyn ResponseWriter,
    ) -> io::Result<()> {
        if start > 0 {
            file.seek(SeekFrom::Start(start)).await?;
        }

        let mut buf = vec![0u8; self.read_buffer_size];
        let mut remaining = length;
        while remaining > 0 {
            let want = usize::try_from(remaining).map_or(buf.len(), |r| r.min(buf.len()));
            let n = file.read(&mut buf[..want]).await?;
            if n == 0 {
                // Truncated while being served
                return Err(io::Error::from(io::ErrorKind::UnexpectedEof));
            }
            write_all(response, Bytes::copy_from_slice(&buf[..n])).await?;
            remaining -= n as u64;
        }
        Ok(())
    }
}

/// Status reported when a located file can't be opened
fn status_for_error(err: &io::Error) -> StatusCode {
    match err.kind() {
        io::ErrorKind::NotFound => StatusCode::NOT_FOUND,
        io::ErrorKind::PermissionDenied => StatusCode::FORBIDDEN,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[async_trait]
impl Handler for StaticFiles {
    async fn serve(
        &self,
        request: &mut FileRequest,
        response: &mut dyn ResponseWriter,
    ) -> io::Result<()> {
        let is_head = request.is_head();
        let canonical = path::canonicalize(&request.path);

        let Some((file_path, metadata)) = self.locate(&canonical).await else {
            return response::send_404(response, is_head).await;
        };
        let size = metadata.len();
        let validators = Validators::new(size, metadata.modified().ok());

        match validators.evaluate(&request.headers) {
            Precondition::Failed => {
                return response::send_text(response, StatusCode::PRECONDITION_FAILED, is_head)
                    .await;
            }
            Precondition::NotModified => {
                response::send_304(response, &validators.etag);
                return Ok(());
            }
            Precondition::Proceed => {}
        }

        let range = effective_range(
            &request.headers,
            &validators.etag,
            validators.last_modified.as_deref(),
        );
        let (status, start, length) = match parse_range_header(range, size) {
            RangeParseResult::Valid(r) => (StatusCode::PARTIAL_CONTENT, r.start, r.content_length()),
            RangeParseResult::NotSatisfiable => {
                return response::send_416(response, size, is_head).await;
            }
            RangeParseResult::None => (StatusCode::OK, 0, size),
        };

        let mut file = match File::open(&file_path).await {
            Ok(file) => file,
            Err(e) => {
                logger::log_error(&format!(
                    "Failed to open file '{}': {e}",
                    file_path.display()
                ));
                return response::send_text(response, status_for_error(&e), is_head).await;
            }
        };

        let headers = response.headers_mut();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static(mime::content_type_for(&file_path)),
        );
        headers.insert(CONTENT_LENGTH, HeaderValue::from(length));
        headers.insert(ACCEPT_RANGES, HeaderValue::from_static("bytes"));
        if let Ok(value) = HeaderValue::from_str(&validators.etag) {
            headers.insert(ETAG, value);
        }
        if let Some(value) = validators
            .last_modified
            .as_deref()
            .and_then(|m| HeaderValue::from_str(m).ok())
        {
            headers.insert(LAST_MODIFIED, value);
        }
        if status == StatusCode::PARTIAL_CONTENT {
            let end = start + length - 1;
            if let Ok(value) = HeaderValue::from_str(&format!("bytes {start}-{end}/{size}")) {
                headers.insert(CONTENT_RANGE, value);
            }
        }

        response.write_head(status);
        if is_head || length == 0 {
            return Ok(());
        }
        self.stream(&mut file, start, length, response).await
    }
}
