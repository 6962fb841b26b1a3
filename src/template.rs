//! `<img>` markup generation.
//!
//! Takes an [`ImageRequest`] and produces one self-closing `<img>` element
//! with resized `src`, an optional `2x` srcset, lazy-loading class and
//! passthrough attributes:
//!
//! ```text
//! <img src="…" srcset="… 2x" data-srcset="… 2x" sizes="…" width="1920"
//!      height="1080" class="lazyload hero" id="…" title="…" alt="…"
//!      data-foo="…" loading="lazy" />
//! ```
//!
//! ## Attribute Order
//!
//! Attributes always come out in the order above; optional ones are skipped
//! when unset. Passthrough attributes keep their insertion order and sit
//! between `alt` and the trailing `loading` attribute. Identical requests
//! render byte-identical markup.
//!
//! ## Passthrough Attributes
//!
//! A passthrough attribute whose name matches a built-in one (`id`, `class`,
//! `alt`, `src`, ...) replaces the built-in value in place, so every name
//! appears at most once. Names match ASCII case-insensitively. A passthrough
//! `loading` overrides the strategy and stays last.
//!
//! ## Escaping
//!
//! Names and values are written verbatim, wrapped in [`PreEscaped`]. Text is
//! expected to arrive already HTML-safe: `"Tom &amp; Jerry"` renders as
//! `alt="Tom &amp; Jerry"`. The only encoding applied anywhere is the single
//! percent-encoding pass on asset-server URLs.

use crate::config::TemplateConfig;
use crate::host;
use crate::resize::{self, Size};
use maud::{Markup, PreEscaped, Render};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TemplateError {
    #[error("missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("{name} must be a positive integer, got {value:?}")]
    InvalidDimension { name: &'static str, value: String },
    #[error("hi-def size overflows for {width}x{height}")]
    HiDefOverflow { width: u32, height: u32 },
    #[error("unknown loading strategy {0:?} (expected lazy, eager or auto)")]
    InvalidLoading(String),
}

/// Value of the trailing `loading` attribute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Loading {
    #[default]
    Lazy,
    Eager,
    Auto,
}

impl Loading {
    pub fn as_str(self) -> &'static str {
        match self {
            Loading::Lazy => "lazy",
            Loading::Eager => "eager",
            Loading::Auto => "auto",
        }
    }
}

impl fmt::Display for Loading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Loading {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lazy" => Ok(Loading::Lazy),
            "eager" => Ok(Loading::Eager),
            "auto" => Ok(Loading::Auto),
            _ => Err(TemplateError::InvalidLoading(s.to_string())),
        }
    }
}

/// Everything needed to render one image.
///
/// `width` and `height` are kept in their string form and validated at render
/// time, so both `"1920"` and `1920` are accepted by [`ImageRequest::new`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageRequest {
    pub url: String,
    pub alt: String,
    pub width: String,
    pub height: String,
    /// Also reference a 2x variant through `srcset`/`data-srcset`.
    pub hi_def: bool,
    pub id: Option<String>,
    pub title: Option<String>,
    /// Appended after the lazy-load class.
    pub extra_classes: Option<String>,
    /// Rendered as the `sizes` attribute.
    pub sizes: Option<String>,
    pub loading: Loading,
    /// Extra fetch-service tokens, rendered as `<key>_<value>`.
    pub filters: Vec<(String, String)>,
    /// Passthrough HTML attributes, in insertion order.
    pub attributes: Vec<(String, String)>,
}

impl ImageRequest {
    pub fn new(
        url: impl Into<String>,
        alt: impl Into<String>,
        width: impl ToString,
        height: impl ToString,
    ) -> Self {
        Self {
            url: url.into(),
            alt: alt.into(),
            width: width.to_string(),
            height: height.to_string(),
            ..Self::default()
        }
    }

    pub fn hi_def(mut self, hi_def: bool) -> Self {
        self.hi_def = hi_def;
        self
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn extra_classes(mut self, classes: impl Into<String>) -> Self {
        self.extra_classes = Some(classes.into());
        self
    }

    pub fn sizes(mut self, sizes: impl Into<String>) -> Self {
        self.sizes = Some(sizes.into());
        self
    }

    pub fn loading(mut self, loading: Loading) -> Self {
        self.loading = loading;
        self
    }

    pub fn filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push((key.into(), value.into()));
        self
    }

    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    /// Render with the stock [`TemplateConfig`].
    pub fn render(&self) -> Result<String, TemplateError> {
        Ok(build(self, &TemplateConfig::default())?.into_string())
    }
}

/// Ordered `(name, value)` pairs of a rendered `<img>`.
///
/// Serializes as a JSON object with keys in tag order; renders as the tag
/// itself through [`Render`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageAttributes(Vec<(String, String)>);

impl ImageAttributes {
    fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.push((name.into(), value.into()));
    }

    /// Replace the value of an existing `name` in place, or append it.
    fn set(&mut self, name: &str, value: &str) {
        for (n, existing) in &mut self.0 {
            if n.eq_ignore_ascii_case(name) {
                *existing = value.to_string();
                return;
            }
        }
        self.push(name, value);
    }

    /// First value for `name`, if present.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

impl Render for ImageAttributes {
    fn render_to(&self, buffer: &mut String) {
        buffer.push_str("<img");
        for (name, value) in &self.0 {
            buffer.push(' ');
            PreEscaped(name.as_str()).render_to(buffer);
            buffer.push_str("=\"");
            PreEscaped(value.as_str()).render_to(buffer);
            buffer.push('"');
        }
        buffer.push_str(" />");
    }
}

impl Serialize for ImageAttributes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in &self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Compute the ordered attribute list for `request`.
pub fn attributes(
    request: &ImageRequest,
    config: &TemplateConfig,
) -> Result<ImageAttributes, TemplateError> {
    let url = request.url.trim();
    if url.is_empty() {
        return Err(TemplateError::MissingParameter("url"));
    }
    let width = parse_dimension("width", &request.width)?;
    let height = parse_dimension("height", &request.height)?;

    let host = host::classify(url, &config.asset_server);
    tracing::debug!(url, ?host, "classified image url");

    let urls = resize::resized_urls(
        url,
        host,
        Size::new(width, height),
        request.hi_def,
        &request.filters,
        &config.fetch,
    )
    .ok_or(TemplateError::HiDefOverflow { width, height })?;

    let mut attrs = ImageAttributes::default();
    attrs.push("src", urls.src);
    if let Some(hi_def) = urls.hi_def {
        let srcset = format!("{hi_def} 2x");
        attrs.push("srcset", srcset.clone());
        attrs.push("data-srcset", srcset);
    }
    if let Some(sizes) = non_blank(&request.sizes) {
        attrs.push("sizes", sizes);
    }
    attrs.push("width", width.to_string());
    attrs.push("height", height.to_string());
    let class = match non_blank(&request.extra_classes) {
        Some(extra) => format!("{} {extra}", config.lazy_class),
        None => config.lazy_class.clone(),
    };
    attrs.push("class", class);
    if let Some(id) = non_blank(&request.id) {
        attrs.push("id", id);
    }
    if let Some(title) = non_blank(&request.title) {
        attrs.push("title", title);
    }
    attrs.push("alt", request.alt.as_str());

    let mut loading = request.loading.as_str().to_string();
    for (name, value) in &request.attributes {
        if name.eq_ignore_ascii_case("loading") {
            loading = value.clone();
        } else {
            attrs.set(name, value);
        }
    }
    attrs.push("loading", loading);

    Ok(attrs)
}

/// Render `request` as a single `<img ... />` element.
pub fn build(request: &ImageRequest, config: &TemplateConfig) -> Result<Markup, TemplateError> {
    Ok(attributes(request, config)?.render())
}

fn parse_dimension(name: &'static str, value: &str) -> Result<u32, TemplateError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(TemplateError::MissingParameter(name));
    }
    match trimmed.parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(TemplateError::InvalidDimension {
            name,
            value: value.to_string(),
        }),
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use maud::html;

    fn render(request: &ImageRequest) -> String {
        request.render().unwrap()
    }

    fn stock_attrs(request: &ImageRequest) -> ImageAttributes {
        attributes(request, &TemplateConfig::default()).unwrap()
    }

    fn names(attrs: &ImageAttributes) -> Vec<&str> {
        attrs.iter().map(|(n, _)| n).collect()
    }

    #[test]
    fn renders_single_img_element() {
        let html = render(&request(ASSET_URL));
        assert!(html.starts_with("<img "));
        assert!(html.ends_with(" />"));
        assert_eq!(count(&html, "<img"), 1);
    }

    #[test]
    fn asset_url_src_embeds_encoded_size() {
        let html = render(&request(ASSET_URL));
        let expected = format!("{ENCODED_ASSET_URL}%3Fw%3D1920%26h%3D1080");
        assert!(html.contains(&expected));
        assert!(!html.contains("w_1920"));
        assert!(html.contains(r#"alt="test""#));
    }

    #[test]
    fn non_asset_url_uses_size_tokens() {
        let html = render(&request(NON_ASSET_URL));
        assert!(html.contains("w_1920"));
        assert!(html.contains("h_1080"));
        assert!(!html.contains("w%3D1920"));
    }

    #[test]
    fn path_only_url_uses_size_tokens() {
        let html = render(&request(NON_HOSTNAME_URL));
        assert!(html.contains("w_1920,h_1080/static/images/"));
    }

    #[test]
    fn protocol_relative_asset_url_renders_with_scheme() {
        let html = render(&request("//assets.ubuntu.com/v1/a.jpg"));
        assert!(html.contains("/https%3A//assets.ubuntu.com/v1/a.jpg%3Fw%3D1920%26h%3D1080\""));
        assert!(!html.contains("///"));
    }

    #[test]
    fn id_and_title_rendered_once() {
        let html = render(&request(ASSET_URL).id("test").title("test title"));
        assert_eq!(count(&html, r#"id="test""#), 1);
        assert_eq!(count(&html, r#"title="test title""#), 1);
    }

    #[test]
    fn id_and_title_absent_by_default() {
        let html = render(&request(ASSET_URL));
        assert!(!html.contains(" id="));
        assert!(!html.contains(" title="));
    }

    #[test]
    fn class_is_lazyload_only_by_default() {
        let attrs = stock_attrs(&request(ASSET_URL));
        assert_eq!(attrs.get("class"), Some("lazyload"));
    }

    #[test]
    fn extra_classes_follow_lazyload() {
        let html = render(&request(ASSET_URL).extra_classes("test-title"));
        assert!(html.contains(r#"class="lazyload test-title""#));
    }

    #[test]
    fn blank_extra_classes_ignored() {
        let attrs = stock_attrs(&request(ASSET_URL).extra_classes("   "));
        assert_eq!(attrs.get("class"), Some("lazyload"));
    }

    #[test]
    fn custom_lazy_class() {
        let config = TemplateConfig {
            lazy_class: "js-lazy".to_string(),
            ..TemplateConfig::default()
        };
        let req = request(ASSET_URL).extra_classes("hero");
        let attrs = attributes(&req, &config).unwrap();
        assert_eq!(attrs.get("class"), Some("js-lazy hero"));
    }

    #[test]
    fn hi_def_adds_doubled_srcset() {
        let attrs = stock_attrs(&request(NON_ASSET_URL).hi_def(true));
        let srcset = attrs.get("srcset").unwrap();
        assert!(srcset.ends_with(" 2x"));
        assert!(srcset.contains("w_3840,h_2160"));
        assert_eq!(attrs.get("data-srcset"), Some(srcset));
        // src stays at 1x
        assert!(attrs.get("src").unwrap().contains("w_1920,h_1080"));
        assert_eq!(attrs.get("width"), Some("1920"));
    }

    #[test]
    fn hi_def_asset_url_doubles_query() {
        let html = render(&request(ASSET_URL).hi_def(true));
        assert!(html.contains("srcset="));
        assert!(html.contains("data-srcset="));
        assert!(html.contains("w%3D3840%26h%3D2160 2x"));
        assert!(html.contains("w%3D1920%26h%3D1080"));
    }

    #[test]
    fn no_srcset_without_hi_def() {
        let html = render(&request(ASSET_URL));
        assert!(!html.contains("srcset"));
    }

    #[test]
    fn attribute_order_is_fixed() {
        let req = request(ASSET_URL)
            .hi_def(true)
            .sizes("100vw")
            .id("hero")
            .title("Hero")
            .extra_classes("wide")
            .attribute("data-b", "2")
            .attribute("data-a", "1");
        let attrs = stock_attrs(&req);
        assert_eq!(
            names(&attrs),
            vec![
                "src",
                "srcset",
                "data-srcset",
                "sizes",
                "width",
                "height",
                "class",
                "id",
                "title",
                "alt",
                "data-b",
                "data-a",
                "loading",
            ]
        );
    }

    #[test]
    fn minimal_attribute_order() {
        let attrs = stock_attrs(&request(ASSET_URL));
        assert_eq!(
            names(&attrs),
            vec!["src", "width", "height", "class", "alt", "loading"]
        );
    }

    #[test]
    fn passthrough_replaces_builtin_in_place() {
        let req = request(ASSET_URL).id("a").attribute("id", "b");
        let html = render(&req);
        assert_eq!(count(&html, " id=\""), 1);
        assert!(html.contains(r#" id="b""#));

        let attrs = stock_attrs(&req);
        assert_eq!(
            names(&attrs),
            vec!["src", "width", "height", "class", "id", "alt", "loading"]
        );
    }

    #[test]
    fn passthrough_names_match_case_insensitively() {
        let attrs = stock_attrs(&request(ASSET_URL).attribute("CLASS", "plain"));
        assert_eq!(attrs.get("class"), Some("plain"));
        assert!(!names(&attrs).contains(&"CLASS"));
    }

    #[test]
    fn repeated_passthrough_keeps_last_value() {
        let req = request(ASSET_URL)
            .attribute("data-a", "1")
            .attribute("data-a", "2");
        let html = render(&req);
        assert_eq!(count(&html, "data-a="), 1);
        assert!(html.contains(r#"data-a="2""#));
    }

    #[test]
    fn passthrough_loading_overrides_strategy() {
        let html = render(&request(ASSET_URL).attribute("loading", "eager"));
        assert_eq!(count(&html, "loading="), 1);
        assert!(html.ends_with(r#"loading="eager" />"#));
    }

    #[test]
    fn loading_strategy_rendered_last() {
        let html = render(&request(ASSET_URL).loading(Loading::Eager));
        assert!(html.ends_with(r#"loading="eager" />"#));
    }

    #[test]
    fn loading_parses_case_insensitively() {
        assert_eq!("Lazy".parse::<Loading>(), Ok(Loading::Lazy));
        assert_eq!("auto".parse::<Loading>(), Ok(Loading::Auto));
        assert!(matches!(
            "sometimes".parse::<Loading>(),
            Err(TemplateError::InvalidLoading(_))
        ));
    }

    #[test]
    fn numeric_dimensions_accepted() {
        let req = ImageRequest::new(ASSET_URL, "test", 1920, 1080);
        assert_eq!(render(&req), render(&request(ASSET_URL)));
    }

    #[test]
    fn dimensions_are_trimmed() {
        let req = ImageRequest::new(NON_ASSET_URL, "test", " 1920 ", "1080");
        let attrs = stock_attrs(&req);
        assert_eq!(attrs.get("width"), Some("1920"));
    }

    #[test]
    fn missing_url_is_error() {
        let req = ImageRequest::new("  ", "test", "1920", "1080");
        assert_eq!(req.render(), Err(TemplateError::MissingParameter("url")));
    }

    #[test]
    fn missing_dimensions_are_errors() {
        let req = ImageRequest::new(ASSET_URL, "test", "", "1080");
        assert_eq!(req.render(), Err(TemplateError::MissingParameter("width")));
        let req = ImageRequest::new(ASSET_URL, "test", "1920", "");
        assert_eq!(req.render(), Err(TemplateError::MissingParameter("height")));
    }

    #[test]
    fn invalid_dimensions_are_errors() {
        for bad in ["wide", "0", "-5", "12.5"] {
            let req = ImageRequest::new(ASSET_URL, "test", bad, "1080");
            assert!(
                matches!(
                    req.render(),
                    Err(TemplateError::InvalidDimension { name: "width", .. })
                ),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn hi_def_overflow_is_error() {
        let mut req = ImageRequest::new(ASSET_URL, "test", u32::MAX, 10);
        req.hi_def = true;
        assert!(matches!(req.render(), Err(TemplateError::HiDefOverflow { .. })));
    }

    #[test]
    fn empty_alt_is_rendered() {
        let html = render(&ImageRequest::new(ASSET_URL, "", "10", "10"));
        assert!(html.contains(r#"alt="""#));
    }

    #[test]
    fn alt_is_written_verbatim() {
        let req = ImageRequest::new(ASSET_URL, "Tom &amp; Jerry", "10", "10");
        let html = render(&req);
        assert!(html.contains(r#"alt="Tom &amp; Jerry""#));
        assert!(!html.contains("&amp;amp;"));

        let req = ImageRequest::new(ASSET_URL, "Tom & Jerry", "10", "10");
        let html = render(&req);
        assert!(html.contains(r#"alt="Tom & Jerry""#));
    }

    #[test]
    fn passthrough_values_written_verbatim() {
        let html = render(&request(ASSET_URL).attribute("data-caption", "<b>bold</b>"));
        assert!(html.contains(r#"data-caption="<b>bold</b>""#));
    }

    #[test]
    fn generic_query_written_verbatim() {
        let html = render(&request("https://example.com/a.png?x=1&y=2"));
        assert!(html.contains("/https://example.com/a.png?x=1&y=2\""));
        assert!(!html.contains("&amp;"));
    }

    #[test]
    fn render_is_deterministic() {
        let req = request(ASSET_URL)
            .hi_def(true)
            .attribute("data-a", "1")
            .filter("c", "fill");
        assert_eq!(render(&req), render(&req));
    }

    #[test]
    fn markup_embeds_in_maud_templates() {
        let config = TemplateConfig::default();
        let img = build(&request(ASSET_URL), &config).unwrap();
        let page = html! { figure { (img) } }.into_string();
        assert!(page.starts_with("<figure><img src="));
        assert!(!page.contains("&lt;img"));
    }

    #[test]
    fn attributes_serialize_in_order() {
        let attrs = stock_attrs(&request(ASSET_URL).id("hero"));
        let json = serde_json::to_string(&attrs).unwrap();
        let src = json.find("\"src\"").unwrap();
        let id = json.find("\"id\"").unwrap();
        let loading = json.find("\"loading\"").unwrap();
        assert!(src < id && id < loading);
        assert!(json.contains(r#""alt":"test""#));
    }
}
