//! Completion probe handling
//!
//! A client that believes it already holds every byte of a file asks for the range
//! starting at the file size, `Range: bytes=<size>-`. Rather than answering with 416 the
//! server confirms with an empty `200 OK`, so the client learns it is up to date without
//! transferring anything. All other requests go to the wrapped file server.

use async_trait::async_trait;
use hyper::StatusCode;
use std::io;
use std::path::PathBuf;
use tokio::fs::File;

use super::sink::ResponseWriter;
use super::static_files::StaticFiles;
use super::{FileRequest, Handler};
use crate::http::{is_completion_probe, path};

/// File server that answers completion probes itself
pub struct CompletionFileServer<H = StaticFiles> {
    root: PathBuf,
    fallback: H,
}

impl CompletionFileServer<StaticFiles> {
    /// Serves `files` and answers completion probes for the same root
    pub fn new(files: StaticFiles) -> Self {
        let root = files.root().to_path_buf();
        Self::with_fallback(root, files)
    }
}

impl<H: Handler> CompletionFileServer<H> {
    /// Answers probes for files below `root` and hands everything else to `fallback`
    pub fn with_fallback(root: impl Into<PathBuf>, fallback: H) -> Self {
        Self {
            root: path::canonical_root(&root.into()),
            fallback,
        }
    }

    /// Size of the regular file a canonical path names, if it stays inside the root and
    /// can be opened
    async fn openable_size(&self, canonical: &str) -> Option<u64> {
        let file_path = path::resolve(&self.root, canonical);
        path::confine(&self.root, &file_path).await?;
        let metadata = File::open(&file_path).await.ok()?.metadata().await.ok()?;
        metadata.is_file().then(|| metadata.len())
    }
}

#[async_trait]
impl<H: Handler> Handler for CompletionFileServer<H> {
    async fn serve(
        &self,
        request: &mut FileRequest,
        response: &mut dyn ResponseWriter,
    ) -> io::Result<()> {
        request.path = path::canonicalize(&request.path);

        // Escaping symlinks and files that can't be opened are the fallback's business
        if let Some(size) = self.openable_size(&request.path).await {
            if is_completion_probe(&request.headers, size) {
                tracing::debug!(path = %request.path, size, "completion probe");
                response.write_head(StatusCode::OK);
                return Ok(());
            }
        }

        tracing::trace!(path = %request.path, "serving from files");
        self.fallback.serve(request, response).await
    }
}
