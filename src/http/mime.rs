//! MIME type detection module
//!
//! Returns the Content-Type for the artifacts found under an update root.

use std::path::Path;

/// Get MIME Content-Type based on file extension
///
/// # Examples
/// ```
/// use swupd_server::http::mime::get_content_type;
/// assert_eq!(get_content_type(Some("xz")), "application/x-xz");
/// assert_eq!(get_content_type(Some("html")), "text/html; charset=utf-8");
/// assert_eq!(get_content_type(None), "application/octet-stream");
/// ```
pub fn get_content_type(extension: Option<&str>) -> &'static str {
    match extension {
        // Text
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("txt" | "md") => "text/plain; charset=utf-8",
        Some("json") => "application/json",
        Some("xml") => "application/xml",

        // Signatures and checksums published next to artifacts
        Some("sig" | "asc") => "application/pgp-signature",
        Some("sha256" | "sha512" | "sha256sum" | "sha512sum") => "text/plain; charset=utf-8",

        // Archives and compressed payloads
        Some("tar") => "application/x-tar",
        Some("gz" | "gzip" | "tgz") => "application/gzip",
        Some("xz") => "application/x-xz",
        Some("bz2") => "application/x-bzip2",
        Some("zst") => "application/zstd",
        Some("zip") => "application/zip",

        // Disk images
        Some("iso") => "application/x-iso9660-image",
        Some("img" | "raw") => "application/octet-stream",
        Some("qcow2") => "application/x-qemu-disk",
        Some("vhd" | "vhdx") => "application/x-vhd",
        Some("vmdk") => "application/x-vmdk",

        // Default
        _ => "application/octet-stream",
    }
}

/// Content-Type for a path on disk
pub fn content_type_for(path: &Path) -> &'static str {
    get_content_type(path.extension().and_then(|e| e.to_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_types() {
        assert_eq!(get_content_type(Some("iso")), "application/x-iso9660-image");
        assert_eq!(get_content_type(Some("xz")), "application/x-xz");
        assert_eq!(get_content_type(Some("tar")), "application/x-tar");
        assert_eq!(get_content_type(Some("sig")), "application/pgp-signature");
        assert_eq!(get_content_type(Some("img")), "application/octet-stream");
    }

    #[test]
    fn test_unknown_extension() {
        assert_eq!(get_content_type(Some("xyz")), "application/octet-stream");
        assert_eq!(get_content_type(None), "application/octet-stream");
    }

    #[test]
    fn test_content_type_for_path() {
        assert_eq!(
            content_type_for(Path::new("/www/images/r1/clear.img.xz")),
            "application/x-xz"
        );
        // Update manifests carry no extension
        assert_eq!(
            content_type_for(Path::new("/www/update/10/Manifest.MoM")),
            "application/octet-stream"
        );
    }
}
