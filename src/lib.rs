//! # image-template
//!
//! Responsive `<img>` markup from a URL, a size and some alt text.
//!
//! ```
//! use image_template::ImageRequest;
//!
//! let html = ImageRequest::new(
//!     "https://assets.ubuntu.com/v1/hero.jpg",
//!     "Hero image",
//!     1920,
//!     1080,
//! )
//! .hi_def(true)
//! .extra_classes("p-hero")
//! .render()
//! .unwrap();
//!
//! assert!(html.contains("hero.jpg%3Fw%3D1920%26h%3D1080"));
//! assert!(html.contains(r#"class="lazyload p-hero""#));
//! ```
//!
//! # Two Resize Conventions
//!
//! Every image is served through an image-fetch service. URLs on a configured
//! asset server carry their size as a `?w=<width>&h=<height>` query and are
//! embedded percent-encoded; any other URL is sized with fetch-service
//! `w_<width>,h_<height>` tokens. [`host::classify`] picks the branch and
//! [`resize`] builds the URLs.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`template`] | `ImageRequest`, attribute ordering and `<img>` rendering |
//! | [`host`] | Asset-server vs. generic URL classification |
//! | [`resize`] | 1x/2x fetch URLs and the embedded-URL percent-encoding |
//! | [`config`] | `template.toml` loading, merging over stock defaults, validation |
//!
//! # Output
//!
//! [`build`] returns a [`maud::Markup`], so the tag drops straight into a maud
//! template without being escaped a second time. [`ImageRequest::render`] is
//! the shortcut for a plain `String` with the stock configuration.
//!
//! Rendering is pure: no I/O, no shared state, identical input gives
//! byte-identical output.

pub mod config;
pub mod host;
pub mod resize;
pub mod template;

pub use config::TemplateConfig;
pub use template::{ImageAttributes, ImageRequest, Loading, TemplateError, attributes, build};

#[cfg(test)]
pub(crate) mod test_helpers;
