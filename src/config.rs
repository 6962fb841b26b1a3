//! Template configuration module.
//!
//! Handles loading, validating, and merging `template.toml` files. The stock
//! defaults target Canonical's asset server and the Cloudinary fetch service;
//! a user file only needs the keys it wants to change.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! lazy_class = "lazyload"   # Marker class always present on the <img>
//!
//! [asset_server]
//! hosts = ["assets.ubuntu.com"]  # "host" or "host/path-prefix" entries
//!
//! [fetch]
//! base_url = "https://res.cloudinary.com/canonical/image/fetch"
//! options = ["f_auto", "q_auto", "fl_sanitize"]
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Template configuration loaded from `template.toml`.
///
/// All fields have sensible defaults. Unknown keys are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TemplateConfig {
    /// CSS class that marks the image for client-side lazy loading.
    pub lazy_class: String,
    /// Hosts whose URLs take `?w=&h=` resize parameters.
    pub asset_server: AssetServerConfig,
    /// Image-fetch service that every rendered URL goes through.
    pub fetch: FetchConfig,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            lazy_class: "lazyload".to_string(),
            asset_server: AssetServerConfig::default(),
            fetch: FetchConfig::default(),
        }
    }
}

impl TemplateConfig {
    /// Validate config values are usable for rendering.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lazy_class.trim().is_empty() {
            return Err(ConfigError::Validation(
                "lazy_class must not be empty".into(),
            ));
        }
        if self.lazy_class.chars().any(char::is_whitespace) {
            return Err(ConfigError::Validation(
                "lazy_class must be a single class name".into(),
            ));
        }
        if self.fetch.base_url.trim().is_empty() {
            return Err(ConfigError::Validation(
                "fetch.base_url must not be empty".into(),
            ));
        }
        if self.fetch.options.iter().any(|o| o.trim().is_empty()) {
            return Err(ConfigError::Validation(
                "fetch.options entries must not be empty".into(),
            ));
        }
        if self.asset_server.hosts.iter().any(|h| h.trim().is_empty()) {
            return Err(ConfigError::Validation(
                "asset_server.hosts entries must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// Asset server settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AssetServerConfig {
    /// Either a bare hostname (`assets.ubuntu.com`) or a hostname followed by
    /// a path prefix (`assets.example/v1`).
    pub hosts: Vec<String>,
}

impl Default for AssetServerConfig {
    fn default() -> Self {
        Self {
            hosts: vec!["assets.ubuntu.com".to_string()],
        }
    }
}

/// Image-fetch service settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FetchConfig {
    /// Base URL of the fetch endpoint, without a trailing slash.
    pub base_url: String,
    /// Transformation tokens applied to every image (format, quality, ...).
    pub options: Vec<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            base_url: "https://res.cloudinary.com/canonical/image/fetch".to_string(),
            options: vec![
                "f_auto".to_string(),
                "q_auto".to_string(),
                "fl_sanitize".to_string(),
            ],
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(TemplateConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely, so an
///   `options` array in a user file replaces the stock list.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto the stock defaults, then deserialize and validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<TemplateConfig, ConfigError> {
    let base = stock_defaults_value();
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: TemplateConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from the TOML file at `path`.
///
/// A missing file yields the stock defaults.
pub fn load_config(path: &Path) -> Result<TemplateConfig, ConfigError> {
    let overlay = load_raw_config(path)?;
    resolve_config(overlay)
}

/// Returns a fully-commented stock `template.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# image-template configuration
# ============================
# All settings are optional. Values shown below are the defaults.
# Unknown keys will cause an error.

# CSS class always present on rendered images. Client-side lazy loading
# scripts (lazysizes and friends) look for it.
lazy_class = "lazyload"

# ---------------------------------------------------------------------------
# Asset server
# ---------------------------------------------------------------------------
[asset_server]
# URLs on these hosts are resized with `?w=<width>&h=<height>` and embedded,
# fully percent-encoded, into the fetch URL.
# An entry may carry a path prefix: "assets.example/v1".
hosts = ["assets.ubuntu.com"]

# ---------------------------------------------------------------------------
# Image-fetch service
# ---------------------------------------------------------------------------
[fetch]
# Every image is served through this endpoint.
base_url = "https://res.cloudinary.com/canonical/image/fetch"

# Tokens applied to every image. Other URLs additionally get w_<width> and
# h_<height> tokens.
options = ["f_auto", "q_auto", "fl_sanitize"]
"##
}

// ============================================================================
// Tests
// ============================================================================
