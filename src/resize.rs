//! Resized image URLs.
//!
//! Every rendered image goes through the image-fetch service configured in
//! [`FetchConfig`]. What differs between the two host kinds is where the
//! target size lives:
//!
//! ```text
//! asset server
//!   <base>/f_auto,q_auto,fl_sanitize/https%3A//assets.ubuntu.com/v1/a.jpg%3Fw%3D1920%26h%3D1080
//! generic
//!   <base>/f_auto,q_auto,fl_sanitize,w_1920,h_1080/https://example.com/a.png
//! ```
//!
//! Asset-server URLs carry the size as their own `?w=&h=` query, and the whole
//! URL (query included) is percent-encoded once so the fetch service passes it
//! through untouched. Generic URLs get `w_`/`h_` tokens and are embedded as
//! given. Protocol-relative input gets an `https:` scheme first.

use crate::config::FetchConfig;
use crate::host::{ImageHost, absolutize};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

/// Characters left alone when embedding an asset URL: ASCII alphanumerics,
/// `-._~` and `/`. Everything else, including `:`, `?`, `=` and `&`, is
/// escaped with uppercase hex.
const EMBEDDED_URL: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'/');

/// Target pixel size of one image variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// The 2x variant. `None` if either side overflows.
    pub fn doubled(self) -> Option<Self> {
        Some(Self {
            width: self.width.checked_mul(2)?,
            height: self.height.checked_mul(2)?,
        })
    }
}

/// The 1x URL and, for hi-def images, the 2x URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResizedUrls {
    pub src: String,
    pub hi_def: Option<String>,
}

/// Percent-encode `url` for embedding as a single opaque path segment.
pub fn encode_embedded(url: &str) -> String {
    utf8_percent_encode(url, EMBEDDED_URL).to_string()
}

/// Build the fetch URL for one variant of `url`.
///
/// `filters` are extra fetch-service tokens rendered as `<key>_<value>`
/// (or bare `<key>` when the value is empty), after the size tokens.
pub fn resize_url(
    url: &str,
    host: ImageHost,
    size: Size,
    filters: &[(String, String)],
    fetch: &FetchConfig,
) -> String {
    let url = absolutize(url);
    let mut tokens: Vec<String> = fetch.options.clone();

    let embedded = match host {
        ImageHost::AssetServer => {
            let separator = if url.contains('?') { '&' } else { '?' };
            let sized = format!("{url}{separator}w={}&h={}", size.width, size.height);
            encode_embedded(&sized)
        }
        ImageHost::Generic => {
            tokens.push(format!("w_{}", size.width));
            tokens.push(format!("h_{}", size.height));
            // A leading slash would double up with the separator below.
            match url.strip_prefix('/') {
                Some(rest) if !rest.starts_with('/') => rest.to_string(),
                _ => url.to_string(),
            }
        }
    };

    tokens.extend(filters.iter().map(|(key, value)| filter_token(key, value)));

    let base = fetch.base_url.trim_end_matches('/');
    if tokens.is_empty() {
        format!("{base}/{embedded}")
    } else {
        format!("{base}/{}/{embedded}", tokens.join(","))
    }
}

/// Build the 1x URL, plus the 2x URL when `hi_def` is set.
///
/// Returns `None` if doubling `size` overflows.
pub fn resized_urls(
    url: &str,
    host: ImageHost,
    size: Size,
    hi_def: bool,
    filters: &[(String, String)],
    fetch: &FetchConfig,
) -> Option<ResizedUrls> {
    let src = resize_url(url, host, size, filters, fetch);
    let hi_def = if hi_def {
        Some(resize_url(url, host, size.doubled()?, filters, fetch))
    } else {
        None
    };
    tracing::debug!(url, ?host, %src, ?hi_def, "resized image urls");
    Some(ResizedUrls { src, hi_def })
}

fn filter_token(key: &str, value: &str) -> String {
    if value.is_empty() {
        key.to_string()
    } else {
        format!("{key}_{value}")
    }
}
