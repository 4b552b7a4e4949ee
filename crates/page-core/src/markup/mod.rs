//! Conversion between documents and portable HTML markup.
//!
//! Both directions are total. Foreign or malformed markup degrades to
//! defaults (unknown elements are transparent, bad numbers become absent)
//! instead of failing.

mod parse;
mod render;
pub mod style;

pub use parse::parse_markup;
pub use render::render_markup;

use crate::config::DEFAULT_HIGHLIGHT_COLOR;
use crate::schema::{
    CellAttrs, ImageAlign, ImageAttrs, ImageDisplay, ImageFloat, ImageSize, VideoAttrs,
    DEFAULT_VIDEO_HEIGHT, DEFAULT_VIDEO_WIDTH,
};
use style::{parse_dimension, style_value};

pub const ATTR_DISPLAY: &str = "data-display";
pub const ATTR_FLOAT: &str = "data-float";
pub const ATTR_ALIGN: &str = "data-align";
pub const ATTR_BACKGROUND_COLOR: &str = "data-background-color";
pub const ATTR_VIDEO_WRAPPER: &str = "data-vk-video";
pub const ATTR_HIGHLIGHT_COLOR: &str = "data-color";

pub const VIDEO_ALLOW: &str = "autoplay; encrypted-media; fullscreen; picture-in-picture";

/// Ordered attribute list of one markup element. Names are lowercase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkupAttrs {
    entries: Vec<(String, String)>,
}

impl MarkupAttrs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Replaces an existing value in place or appends a new attribute.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into().to_ascii_lowercase();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Non-empty, trimmed value.
    fn get_trimmed(&self, name: &str) -> Option<&str> {
        self.get(name).map(str::trim).filter(|v| !v.is_empty())
    }

    fn style(&self, prop: &str) -> Option<String> {
        self.get("style").and_then(|s| style_value(s, prop))
    }
}

impl<N, V> FromIterator<(N, V)> for MarkupAttrs
where
    N: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut attrs = MarkupAttrs::new();
        for (name, value) in iter {
            attrs.set(name, value);
        }
        attrs
    }
}

/// Per-node attribute codec. `from_markup(&x.to_markup()) == x` holds for
/// every value the editing commands can produce.
pub trait NodeMarkup: Sized {
    fn from_markup(attrs: &MarkupAttrs) -> Self;
    fn to_markup(&self) -> MarkupAttrs;
}

impl NodeMarkup for ImageAttrs {
    fn from_markup(attrs: &MarkupAttrs) -> Self {
        let dimension = |name: &str| {
            attrs
                .get(name)
                .and_then(parse_dimension)
                .or_else(|| attrs.style(name).as_deref().and_then(parse_dimension))
        };
        let size = match (dimension("width"), dimension("height")) {
            (Some(width), Some(height)) => ImageSize::new(width, height),
            _ => None,
        };

        ImageAttrs {
            src: attrs.get("src").map(str::to_string),
            alt: attrs.get("alt").map(str::to_string),
            title: attrs.get("title").map(str::to_string),
            size,
            display: attrs
                .get(ATTR_DISPLAY)
                .and_then(ImageDisplay::parse)
                .unwrap_or_default(),
            float: attrs
                .get(ATTR_FLOAT)
                .and_then(ImageFloat::parse)
                .unwrap_or_default(),
            align: attrs
                .get(ATTR_ALIGN)
                .and_then(ImageAlign::parse)
                .unwrap_or_default(),
        }
    }

    fn to_markup(&self) -> MarkupAttrs {
        let mut attrs = MarkupAttrs::new();
        if let Some(src) = &self.src {
            attrs.set("src", src.as_str());
        }
        if let Some(alt) = &self.alt {
            attrs.set("alt", alt.as_str());
        }
        if let Some(title) = &self.title {
            attrs.set("title", title.as_str());
        }
        if let Some(size) = self.size {
            attrs.set("width", size.width().to_string());
            attrs.set("height", size.height().to_string());
        }
        attrs.set(ATTR_DISPLAY, self.display.as_str());
        attrs.set(ATTR_FLOAT, self.float.as_str());
        attrs.set(ATTR_ALIGN, self.align.as_str());
        attrs
    }
}

impl NodeMarkup for CellAttrs {
    fn from_markup(attrs: &MarkupAttrs) -> Self {
        let background_color = attrs
            .get_trimmed(ATTR_BACKGROUND_COLOR)
            .map(str::to_string)
            .or_else(|| attrs.style("background-color"));
        CellAttrs { background_color }
    }

    fn to_markup(&self) -> MarkupAttrs {
        let mut attrs = MarkupAttrs::new();
        if let Some(color) = &self.background_color {
            attrs.set(ATTR_BACKGROUND_COLOR, color.as_str());
            attrs.set("style", format!("background-color:{color}"));
        }
        attrs
    }
}

/// Attributes of the player element inside the video wrapper.
impl NodeMarkup for VideoAttrs {
    fn from_markup(attrs: &MarkupAttrs) -> Self {
        VideoAttrs {
            src: attrs.get("src").unwrap_or_default().to_string(),
            width: attrs
                .get("width")
                .and_then(parse_dimension)
                .unwrap_or(DEFAULT_VIDEO_WIDTH),
            height: attrs
                .get("height")
                .and_then(parse_dimension)
                .unwrap_or(DEFAULT_VIDEO_HEIGHT),
        }
    }

    fn to_markup(&self) -> MarkupAttrs {
        let mut attrs = MarkupAttrs::new();
        attrs.set("src", self.src.as_str());
        attrs.set("width", self.width.to_string());
        attrs.set("height", self.height.to_string());
        attrs.set("allowfullscreen", "");
        attrs.set("allow", VIDEO_ALLOW);
        attrs.set("frameborder", "0");
        attrs
    }
}

/// Highlight color of a `<mark>` element, falling back to the default color
/// for a plain `<mark>`.
pub(crate) fn highlight_from_markup(attrs: &MarkupAttrs) -> String {
    attrs
        .get_trimmed(ATTR_HIGHLIGHT_COLOR)
        .map(str::to_string)
        .or_else(|| attrs.style("background-color"))
        .unwrap_or_else(|| DEFAULT_HIGHLIGHT_COLOR.to_string())
}

pub(crate) fn text_color_from_markup(attrs: &MarkupAttrs) -> Option<String> {
    attrs.style("color")
}
