//! Image host classification.
//!
//! Decides which resize convention applies to a URL. Asset-server URLs take
//! `?w=&h=` query parameters; everything else is resized by the fetch service
//! through `w_`/`h_` path tokens (see [`crate::resize`]).
//!
//! Classification is a plain string match against the configured
//! `asset_server.hosts` entries:
//!
//! - `"assets.ubuntu.com"` matches any URL on that host.
//! - `"assets.example/v1"` matches `https://assets.example/v1/...` but not
//!   `https://assets.example/v10/...` or `https://assets.example/other/...`.
//!
//! Path-only input (`/static/images/hero.png`) has no host and is always
//! [`ImageHost::Generic`]. Protocol-relative input (`//host/path`) is treated
//! as `https:` everywhere, see [`absolutize`].

use crate::config::AssetServerConfig;
use std::borrow::Cow;
use url::Url;

/// The resize convention a URL belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageHost {
    /// Asset server: resized with `?w=<width>&h=<height>`.
    AssetServer,
    /// Anything else: resized with fetch-service `w_<width>` tokens.
    Generic,
}

/// Classify `url` against the configured asset hosts.
pub fn classify(url: &str, assets: &AssetServerConfig) -> ImageHost {
    let Some(parsed) = parse_absolute(url) else {
        return ImageHost::Generic;
    };
    let Some(host) = parsed.host_str() else {
        return ImageHost::Generic;
    };

    let matched = assets
        .hosts
        .iter()
        .any(|entry| entry_matches(entry, host, parsed.path()));

    if matched {
        ImageHost::AssetServer
    } else {
        ImageHost::Generic
    }
}

/// Resolve protocol-relative `//host/path` input against `https:`. Anything
/// else is returned trimmed but otherwise untouched.
pub fn absolutize(url: &str) -> Cow<'_, str> {
    let url = url.trim();
    if url.starts_with("//") {
        Cow::Owned(format!("https:{url}"))
    } else {
        Cow::Borrowed(url)
    }
}

/// Parse `url` as an absolute URL; anything relative yields `None`.
fn parse_absolute(url: &str) -> Option<Url> {
    Url::parse(&absolutize(url)).ok()
}

fn entry_matches(entry: &str, host: &str, path: &str) -> bool {
    let entry = entry.trim();
    let (entry_host, prefix) = match entry.split_once('/') {
        Some((h, p)) => (h, p.trim_matches('/')),
        None => (entry, ""),
    };
    if !entry_host.eq_ignore_ascii_case(host) {
        return false;
    }
    if prefix.is_empty() {
        return true;
    }
    let Some(rest) = path.strip_prefix('/').and_then(|p| p.strip_prefix(prefix)) else {
        return false;
    };
    rest.is_empty() || rest.starts_with('/')
}
