//! Shared test fixtures for the image-template test suite.
//!
//! Three URL shapes cover every branch: an asset-server URL, an absolute URL
//! on some other host, and a path-only URL with no host at all.

use crate::template::ImageRequest;

pub const ASSET_URL: &str = "https://assets.ubuntu.com/v1/479958ed-vivid-hero-takeover-kylin.jpg";

/// `ASSET_URL` run through the asset-embedding percent-encoding.
pub const ENCODED_ASSET_URL: &str =
    "https%3A//assets.ubuntu.com/v1/479958ed-vivid-hero-takeover-kylin.jpg";

pub const NON_ASSET_URL: &str = "https://dashboard.snapcraft.io/site_media/appmedia/2018/10/Screenshot_from_2018-10-26_14-20-14.png";

pub const NON_HOSTNAME_URL: &str = "/static/images/Screenshot_from_2018-10-26_14-20-14.png";

/// A 1920x1080 request with alt text "test", the shape most tests start from.
pub fn request(url: &str) -> ImageRequest {
    ImageRequest::new(url, "test", "1920", "1080")
}

/// Count non-overlapping occurrences of `needle` in `haystack`.
pub fn count(haystack: &str, needle: &str) -> usize {
    haystack.matches(needle).count()
}
