//! Artifact recognition in request paths
//!
//! Two path shapes identify downloadable artifacts:
//!
//! - `/images/<release>/<image...>` where the image name may span several segments
//! - `/update/<release>/<version>/<file...>` where the version is all decimal digits
//!
//! Paths are expected in canonical form (see [`crate::http::path::canonicalize`]).

/// Artifact a request path refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourcePath<'a> {
    Image { release: &'a str, image: &'a str },
    Update { release: &'a str, version: &'a str },
    Other,
}

impl<'a> ResourcePath<'a> {
    /// Classifies a canonical path
    ///
    /// # Examples
    /// ```
    /// use swupd_server::metrics::ResourcePath;
    ///
    /// assert_eq!(
    ///     ResourcePath::parse("/update/31000/31010/Manifest.MoM"),
    ///     ResourcePath::Update { release: "31000", version: "31010" },
    /// );
    /// assert_eq!(ResourcePath::parse("/status"), ResourcePath::Other);
    /// ```
    pub fn parse(path: &'a str) -> Self {
        parse_image(path)
            .or_else(|| parse_update(path))
            .unwrap_or(Self::Other)
    }
}

fn parse_image(path: &str) -> Option<ResourcePath<'_>> {
    let rest = path.strip_prefix("/images/")?;
    let (release, image) = rest.split_once('/')?;
    if release.is_empty() || image.is_empty() {
        return None;
    }
    Some(ResourcePath::Image { release, image })
}

fn parse_update(path: &str) -> Option<ResourcePath<'_>> {
    let rest = path.strip_prefix("/update/")?;
    let (release, rest) = rest.split_once('/')?;
    // Only the separator after the version is required, the file name may be anything
    let (version, _file) = rest.split_once('/')?;
    if release.is_empty() || version.is_empty() || !version.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(ResourcePath::Update { release, version })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::path::canonicalize;
    use proptest::prelude::*;

    #[test]
    fn test_images() {
        assert_eq!(
            ResourcePath::parse("/images/r1/foo/bar.img"),
            ResourcePath::Image { release: "r1", image: "foo/bar.img" }
        );
        assert_eq!(
            ResourcePath::parse("/images/31000/clear-31000-live.img.xz"),
            ResourcePath::Image { release: "31000", image: "clear-31000-live.img.xz" }
        );
        assert_eq!(ResourcePath::parse("/images/r1"), ResourcePath::Other);
        assert_eq!(ResourcePath::parse("/images"), ResourcePath::Other);
        assert_eq!(ResourcePath::parse("/images//foo.img"), ResourcePath::Other);
    }

    #[test]
    fn test_updates() {
        assert_eq!(
            ResourcePath::parse("/update/r1/42/delta.pack"),
            ResourcePath::Update { release: "r1", version: "42" }
        );
        assert_eq!(
            ResourcePath::parse("/update/r1/42/files/abc.tar"),
            ResourcePath::Update { release: "r1", version: "42" }
        );
        assert_eq!(ResourcePath::parse("/update/r1/4a2/delta.pack"), ResourcePath::Other);
        assert_eq!(ResourcePath::parse("/update/r1/42"), ResourcePath::Other);
        assert_eq!(ResourcePath::parse("/update/r1//delta.pack"), ResourcePath::Other);
        assert_eq!(ResourcePath::parse("/update/version/latest"), ResourcePath::Other);
    }

    #[test]
    fn test_other_paths() {
        assert_eq!(ResourcePath::parse("/"), ResourcePath::Other);
        assert_eq!(ResourcePath::parse("/status"), ResourcePath::Other);
        assert_eq!(ResourcePath::parse("/imagesx/r1/a.img"), ResourcePath::Other);
        assert_eq!(ResourcePath::parse("/mirror/images/r1/a.img"), ResourcePath::Other);
    }

    #[test]
    fn test_after_canonicalization() {
        let path = canonicalize("images/r1/./tmp/../foo.img");
        assert_eq!(
            ResourcePath::parse(&path),
            ResourcePath::Image { release: "r1", image: "foo.img" }
        );
    }

    proptest! {
        #[test]
        fn image_paths_round_trip(release in "[a-z0-9]{1,8}", image in "[a-z0-9.]{1,8}(/[a-z0-9.]{1,8}){0,3}") {
            let path = format!("/images/{release}/{image}");
            prop_assert_eq!(
                ResourcePath::parse(&path),
                ResourcePath::Image { release: &release, image: &image }
            );
        }

        #[test]
        fn update_versions_are_digits(release in "[a-z0-9]{1,8}", version in "[0-9a-z]{1,6}") {
            let path = format!("/update/{release}/{version}/Manifest.MoM");
            let parsed = ResourcePath::parse(&path);
            if version.bytes().all(|b| b.is_ascii_digit()) {
                prop_assert_eq!(parsed, ResourcePath::Update { release: &release, version: &version });
            } else {
                prop_assert_eq!(parsed, ResourcePath::Other);
            }
        }
    }
}
