//! URL path handling
//!
//! Request paths are percent-decoded once when the request is read, then canonicalized
//! lexically before they are mapped onto the served root.

use percent_encoding::percent_decode_str;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Percent-decodes the path component of a request URI. Invalid UTF-8 is replaced rather
/// than rejected, such paths simply won't match anything on disk.
pub fn decode_path(raw: &str) -> String {
    percent_decode_str(raw).decode_utf8_lossy().into_owned()
}

/// Canonicalizes a request path: makes it absolute, then collapses `.`, `..` and repeated
/// separators. `..` never climbs above the root and trailing separators are dropped.
///
/// The result always starts with `/` and the function is idempotent.
///
/// # Examples
/// ```
/// use swupd_server::http::path::canonicalize;
/// assert_eq!(canonicalize("update//10/./files/../Manifest.MoM"), "/update/10/Manifest.MoM");
/// assert_eq!(canonicalize("/../../etc/passwd"), "/etc/passwd");
/// assert_eq!(canonicalize(""), "/");
/// ```
pub fn canonicalize(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            name => segments.push(name),
        }
    }

    let mut canonical = String::with_capacity(path.len() + 1);
    canonical.push('/');
    canonical.push_str(&segments.join("/"));
    canonical
}

/// Maps a canonical request path onto the served root. The path must already be
/// canonical, so it cannot contain `..` components.
pub fn resolve(root: &Path, canonical: &str) -> PathBuf {
    let mut path = root.to_path_buf();
    for segment in canonical.split('/').filter(|s| !s.is_empty()) {
        path.push(segment);
    }
    path
}

/// Resolves symlinks in the served root once, so containment checks can compare against
/// it directly. A root that can't be resolved is kept as given.
pub fn canonical_root(root: &Path) -> PathBuf {
    std::fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf())
}

/// Resolves symlinks in `file` and returns the result if it is still below `root`.
/// `root` must come from [`canonical_root`].
pub async fn confine(root: &Path, file: &Path) -> Option<PathBuf> {
    let resolved = fs::canonicalize(file).await.ok()?;
    resolved.starts_with(root).then_some(resolved)
}
