//! Configuration for the compositor and the binder.
//!
//! All types deserialize from RON with every field optional:
//!
//! ```ron
//! (
//!     compositor: (
//!         canvas: (width: 2100, height: 970),
//!         fonts: (
//!             families: [(family: "Arial", path: "fonts/Arial.ttf")],
//!             dirs: ["fonts"],
//!             sans_serif_family: "DejaVu Sans",
//!         ),
//!     ),
//!     binder: (luminance_threshold: 0.75),
//! )
//! ```

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::binder::SelectionStrategy;
use crate::error::DesignError;

/// Default print area of the mug wrap, in pixels.
pub const DEFAULT_CANVAS_WIDTH: u32 = 2100;
pub const DEFAULT_CANVAS_HEIGHT: u32 = 970;

/// Size of the design canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_CANVAS_WIDTH,
            height: DEFAULT_CANVAS_HEIGHT,
        }
    }
}

impl CanvasConfig {
    /// Canvas center in pixels.
    pub fn center(&self) -> [f32; 2] {
        [self.width as f32 * 0.5, self.height as f32 * 0.5]
    }
}

/// A font file registered under a family name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FontEntry {
    pub family: String,
    pub path: PathBuf,
}

/// Fonts available to the text layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontConfig {
    /// Font files registered by family name, taking precedence over
    /// installed fonts.
    pub families: Vec<FontEntry>,
    /// Used when a family is neither registered nor installed.
    pub fallback: Option<PathBuf>,
    /// Search the fonts installed on the system.
    pub system_fonts: bool,
    /// Extra directories searched for font files.
    pub dirs: Vec<PathBuf>,
    /// Family used as the generic sans-serif, last resort for unknown families.
    pub sans_serif_family: Option<String>,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            families: Vec::new(),
            fallback: None,
            system_fonts: true,
            dirs: Vec::new(),
            sans_serif_family: None,
        }
    }
}

/// Compositor settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositorConfig {
    pub canvas: CanvasConfig,
    pub fonts: FontConfig,
    /// Extra UV rotation written into every texture transform, in degrees.
    pub uv_rotation_degrees: f32,
}

/// Material selection settings for [`apply_texture`](crate::apply_texture).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BinderConfig {
    /// Case-insensitive substrings identifying a printable body material.
    pub name_hints: Vec<String>,
    /// Minimum base color luminance for the `Luminance` strategy.
    pub luminance_threshold: f32,
    /// Strategies tried in order; the first non-empty selection wins.
    pub strategies: Vec<SelectionStrategy>,
}

impl Default for BinderConfig {
    fn default() -> Self {
        Self {
            name_hints: ["corpo", "body", "shell", "cup", "caneca", "mug", "outer"]
                .into_iter()
                .map(String::from)
                .collect(),
            luminance_threshold: 0.8,
            strategies: vec![
                SelectionStrategy::NameHint,
                SelectionStrategy::Luminance,
                SelectionStrategy::FirstSlot,
            ],
        }
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MugprintConfig {
    pub compositor: CompositorConfig,
    pub binder: BinderConfig,
}

impl MugprintConfig {
    pub fn from_ron_str(s: &str) -> Result<Self, DesignError> {
        from_ron_str(s)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, DesignError> {
        read_ron_file(path.as_ref())
    }
}

fn ron_options() -> ron::Options {
    ron::Options::default().with_default_extension(ron::extensions::Extensions::IMPLICIT_SOME)
}

pub(crate) fn from_ron_str<T: DeserializeOwned>(s: &str) -> Result<T, DesignError> {
    Ok(ron_options().from_str(s)?)
}

pub(crate) fn read_ron_file<T: DeserializeOwned>(path: &Path) -> Result<T, DesignError> {
    let text = std::fs::read_to_string(path).map_err(|source| DesignError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    from_ron_str(&text)
}
