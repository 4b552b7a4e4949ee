use serde::{Deserialize, Serialize};

pub const DEFAULT_VIDEO_WIDTH: u32 = 640;
pub const DEFAULT_VIDEO_HEIGHT: u32 = 360;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum HeadingLevel {
    H1,
    H2,
    H3,
}

impl HeadingLevel {
    /// Out-of-range levels clamp into 1..=3.
    pub fn new(level: u64) -> Self {
        match level {
            0 | 1 => HeadingLevel::H1,
            2 => HeadingLevel::H2,
            _ => HeadingLevel::H3,
        }
    }

    pub fn get(self) -> u8 {
        match self {
            HeadingLevel::H1 => 1,
            HeadingLevel::H2 => 2,
            HeadingLevel::H3 => 3,
        }
    }
}

impl From<u8> for HeadingLevel {
    fn from(value: u8) -> Self {
        HeadingLevel::new(value as u64)
    }
}

impl From<HeadingLevel> for u8 {
    fn from(value: HeadingLevel) -> Self {
        value.get()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildConstraint {
    None,
    BlockOnly,
    InlineOnly,
}

/// Attribute sets of container and text-block nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ElementKind {
    Paragraph,
    Heading { level: HeadingLevel },
    BulletList,
    OrderedList,
    ListItem,
    Blockquote,
    CodeBlock,
    Table,
    TableRow,
    TableCell(CellAttrs),
    TableHeader(CellAttrs),
}

impl ElementKind {
    pub fn heading(level: u64) -> Self {
        ElementKind::Heading {
            level: HeadingLevel::new(level),
        }
    }

    pub fn children(&self) -> ChildConstraint {
        match self {
            ElementKind::Paragraph | ElementKind::Heading { .. } | ElementKind::CodeBlock => {
                ChildConstraint::InlineOnly
            }
            ElementKind::BulletList
            | ElementKind::OrderedList
            | ElementKind::ListItem
            | ElementKind::Blockquote
            | ElementKind::Table
            | ElementKind::TableRow
            | ElementKind::TableCell(_)
            | ElementKind::TableHeader(_) => ChildConstraint::BlockOnly,
        }
    }

    pub fn is_text_block(&self) -> bool {
        self.children() == ChildConstraint::InlineOnly
    }

    pub fn is_table_cell(&self) -> bool {
        matches!(self, ElementKind::TableCell(_) | ElementKind::TableHeader(_))
    }

    pub fn cell_attrs(&self) -> Option<&CellAttrs> {
        match self {
            ElementKind::TableCell(attrs) | ElementKind::TableHeader(attrs) => Some(attrs),
            _ => None,
        }
    }

    /// Same cell flavor (header or body) carrying `attrs`.
    pub fn with_cell_attrs(&self, attrs: CellAttrs) -> Option<Self> {
        match self {
            ElementKind::TableCell(_) => Some(ElementKind::TableCell(attrs)),
            ElementKind::TableHeader(_) => Some(ElementKind::TableHeader(attrs)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellAttrs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
}

impl CellAttrs {
    pub fn with_background(color: impl Into<String>) -> Self {
        Self {
            background_color: Some(color.into()),
        }
    }
}

/// Leaf blocks that carry no inline content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VoidNode {
    HorizontalRule,
    Image(ImageAttrs),
    Video(VideoAttrs),
}

impl VoidNode {
    pub fn as_image(&self) -> Option<&ImageAttrs> {
        match self {
            VoidNode::Image(attrs) => Some(attrs),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageDisplay {
    #[default]
    Inline,
    Block,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFloat {
    #[default]
    None,
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageAlign {
    #[default]
    Left,
    Center,
    Right,
}

impl ImageDisplay {
    pub const ALL: [ImageDisplay; 2] = [ImageDisplay::Inline, ImageDisplay::Block];

    pub fn as_str(self) -> &'static str {
        match self {
            ImageDisplay::Inline => "inline",
            ImageDisplay::Block => "block",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.as_str() == value.trim())
    }
}

impl ImageFloat {
    pub const ALL: [ImageFloat; 3] = [ImageFloat::None, ImageFloat::Left, ImageFloat::Right];

    pub fn as_str(self) -> &'static str {
        match self {
            ImageFloat::None => "none",
            ImageFloat::Left => "left",
            ImageFloat::Right => "right",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.as_str() == value.trim())
    }
}

impl ImageAlign {
    pub const ALL: [ImageAlign; 3] = [ImageAlign::Left, ImageAlign::Center, ImageAlign::Right];

    pub fn as_str(self) -> &'static str {
        match self {
            ImageAlign::Left => "left",
            ImageAlign::Center => "center",
            ImageAlign::Right => "right",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.as_str() == value.trim())
    }
}

/// Explicit image dimensions. Both sides are always set together and positive;
/// absence of a size means intrinsic sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageSize {
    width: u32,
    height: u32,
}

impl ImageSize {
    pub fn new(width: u32, height: u32) -> Option<Self> {
        (width > 0 && height > 0).then_some(Self { width, height })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageAttrs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<ImageSize>,
    #[serde(default)]
    pub display: ImageDisplay,
    #[serde(default)]
    pub float: ImageFloat,
    #[serde(default)]
    pub align: ImageAlign,
}

impl ImageAttrs {
    pub fn new(src: impl Into<String>) -> Self {
        Self {
            src: Some(src.into()),
            ..Default::default()
        }
    }

    pub fn width(&self) -> Option<u32> {
        self.size.map(|s| s.width())
    }

    pub fn height(&self) -> Option<u32> {
        self.size.map(|s| s.height())
    }
}

/// Partial image attributes as accepted by `image.insert` and `image.update`.
/// Absent fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageAttrsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<ImageDisplay>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub float: Option<ImageFloat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub align: Option<ImageAlign>,
}

impl ImageAttrsPatch {
    pub fn apply_to(&self, attrs: &ImageAttrs) -> Result<ImageAttrs, String> {
        let size = match (self.width, self.height) {
            (None, None) => attrs.size,
            (Some(width), Some(height)) => Some(
                ImageSize::new(width, height)
                    .ok_or_else(|| "Image width and height must be positive".to_string())?,
            ),
            _ => return Err("Image width and height must be set together".into()),
        };

        Ok(ImageAttrs {
            src: self.src.clone().or_else(|| attrs.src.clone()),
            alt: self.alt.clone().or_else(|| attrs.alt.clone()),
            title: self.title.clone().or_else(|| attrs.title.clone()),
            size,
            display: self.display.unwrap_or(attrs.display),
            float: self.float.unwrap_or(attrs.float),
            align: self.align.unwrap_or(attrs.align),
        })
    }
}

impl From<&ImageAttrs> for ImageAttrsPatch {
    fn from(attrs: &ImageAttrs) -> Self {
        Self {
            src: attrs.src.clone(),
            alt: attrs.alt.clone(),
            title: attrs.title.clone(),
            width: attrs.width(),
            height: attrs.height(),
            display: Some(attrs.display),
            float: Some(attrs.float),
            align: Some(attrs.align),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoAttrs {
    pub src: String,
    #[serde(default = "default_video_width")]
    pub width: u32,
    #[serde(default = "default_video_height")]
    pub height: u32,
}

fn default_video_width() -> u32 {
    DEFAULT_VIDEO_WIDTH
}

fn default_video_height() -> u32 {
    DEFAULT_VIDEO_HEIGHT
}

impl VideoAttrs {
    pub fn new(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            width: DEFAULT_VIDEO_WIDTH,
            height: DEFAULT_VIDEO_HEIGHT,
        }
    }
}
