//! The user's design: image source, text, and per-layer transforms.
//!
//! A [`DesignSpec`] is plain data. It is read from RON design files or
//! built in code, and handed to the [`Compositor`](crate::Compositor).
//!
//! ```
//! use mugprint_texturing::design::DesignSpec;
//!
//! let spec = DesignSpec::from_ron_str(r##"(
//!     text: "Café",
//!     text_color: "#663300",
//!     wrap_offset: 0.25,
//! )"##).unwrap();
//! assert_eq!(spec.text_layer(), Some("Café"));
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config;
use crate::error::DesignError;

/// Opaque sRGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Self = Self::new(0, 0, 0);
    pub const WHITE: Self = Self::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// As straight RGBA with full alpha.
    pub const fn to_rgba(self) -> [u8; 4] {
        [self.r, self.g, self.b, 255]
    }
}

impl Default for Rgb {
    fn default() -> Self {
        Self::BLACK
    }
}

impl FromStr for Rgb {
    type Err = DesignError;

    /// Parses `#rrggbb` or the shorthand `#rgb`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || DesignError::Color(s.to_string());
        let hex = s.trim().strip_prefix('#').ok_or_else(err)?;
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(err());
        }
        let digit = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).map_err(|_| err());
        let pair = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| err());
        match hex.len() {
            3 => Ok(Self::new(digit(0)? * 17, digit(1)? * 17, digit(2)? * 17)),
            6 => Ok(Self::new(pair(0)?, pair(2)?, pair(4)?)),
            _ => Err(err()),
        }
    }
}

impl TryFrom<String> for Rgb {
    type Error = DesignError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Rgb> for String {
    fn from(c: Rgb) -> Self {
        c.to_string()
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Where the image layer comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ImageSource {
    /// `data:image/...;base64,...`
    DataUrl(String),
    /// Bare base64 payload (a data URL prefix is tolerated).
    Base64(String),
    /// Path to an image file.
    File(PathBuf),
    /// Encoded image bytes already in memory.
    #[serde(skip)]
    Bytes(Arc<[u8]>),
}

/// How the image's base size is derived before `scale_x`/`scale_y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ImageFit {
    /// Natural pixel size.
    #[default]
    Natural,
    /// Largest size that fits inside the canvas, keeping aspect ratio.
    Contain,
}

/// Placement of the image layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageTransform {
    /// Horizontal size multiplier (> 0).
    pub scale_x: f32,
    /// Vertical size multiplier (> 0).
    pub scale_y: f32,
    /// Signed pixels from the canvas center.
    pub offset_x: f32,
    /// Signed pixels from the canvas center.
    pub offset_y: f32,
    /// Clockwise degrees around the image's own center.
    pub rotation_degrees: f32,
}

impl Default for ImageTransform {
    fn default() -> Self {
        Self {
            scale_x: 1.0,
            scale_y: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
            rotation_degrees: 0.0,
        }
    }
}

/// Placement of the text layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextTransform {
    /// Font size multiplier (> 0).
    pub scale_y: f32,
    /// Signed pixels from the canvas center.
    pub offset_x: f32,
    /// Signed pixels from the canvas center.
    pub offset_y: f32,
    /// Clockwise degrees around the text anchor.
    pub rotation_degrees: f32,
}

impl Default for TextTransform {
    fn default() -> Self {
        Self {
            scale_y: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
            rotation_degrees: 0.0,
        }
    }
}

/// Everything needed to compose one design canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DesignSpec {
    /// Image layer source; `None` means no image layer.
    pub image_source: Option<ImageSource>,
    /// Text layer; blank text is treated as absent.
    pub text: Option<String>,
    pub text_color: Rgb,
    pub font_family: String,
    pub base_font_size: f32,
    pub image_fit: ImageFit,
    pub image: ImageTransform,
    pub text_transform: TextTransform,
    /// Horizontal UV offset around the mug, `0.0..=1.0`.
    pub wrap_offset: f32,
}

impl Default for DesignSpec {
    fn default() -> Self {
        Self {
            image_source: None,
            text: None,
            text_color: Rgb::BLACK,
            font_family: "Arial".to_string(),
            base_font_size: 120.0,
            image_fit: ImageFit::Natural,
            image: ImageTransform::default(),
            text_transform: TextTransform::default(),
            wrap_offset: 0.0,
        }
    }
}

impl DesignSpec {
    /// An empty design: composes to a plain white canvas.
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_image(mut self, source: ImageSource) -> Self {
        self.image_source = Some(source);
        self
    }

    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    #[must_use]
    pub fn with_text_color(mut self, color: Rgb) -> Self {
        self.text_color = color;
        self
    }

    #[must_use]
    pub fn with_image_transform(mut self, transform: ImageTransform) -> Self {
        self.image = transform;
        self
    }

    #[must_use]
    pub fn with_text_transform(mut self, transform: TextTransform) -> Self {
        self.text_transform = transform;
        self
    }

    #[must_use]
    pub fn with_wrap_offset(mut self, wrap_offset: f32) -> Self {
        self.wrap_offset = wrap_offset;
        self
    }

    /// The text to draw, or `None` when absent or whitespace only.
    pub fn text_layer(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.trim().is_empty())
    }

    /// Font size in pixels after `text_transform.scale_y`.
    pub fn font_size(&self) -> f32 {
        self.base_font_size * self.text_transform.scale_y
    }

    /// `wrap_offset` clamped to `0.0..=1.0` (NaN becomes 0).
    pub fn clamped_wrap_offset(&self) -> f32 {
        if self.wrap_offset.is_nan() {
            0.0
        } else {
            self.wrap_offset.clamp(0.0, 1.0)
        }
    }

    /// Parse a RON design document. Missing fields take their defaults.
    pub fn from_ron_str(s: &str) -> Result<Self, DesignError> {
        config::from_ron_str(s)
    }

    /// Read a RON design file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DesignError> {
        config::read_ron_file(path.as_ref())
    }
}
