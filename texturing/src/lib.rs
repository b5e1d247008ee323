//! # Mugprint Texturing
//!
//! Turns a user's mug design into a texture and binds it onto a 3D mug.
//!
//! - [`compositor`]: Flattens a [`DesignSpec`] (image + text) onto a white
//!   print-area canvas and wraps it as a [`CompositedTexture`]
//! - [`binder`]: Clones a scene and puts the texture on its printable material
//! - [`pipeline`]: Asynchronous image decoding with last-request-wins semantics
//! - [`export`]: PNG export of rendered frames and of the flat design
//!
//! # Example
//!
//! ```no_run
//! use mugprint_texturing::{BinderConfig, Compositor, CompositorConfig, DesignSpec, apply_texture};
//! use mugprint_core::scene::Scene;
//!
//! let mut compositor = Compositor::new(CompositorConfig::default());
//! let texture = compositor.compose(&DesignSpec::new().with_text("Café"));
//!
//! let mug = Scene::new();
//! let textured = apply_texture(Some(&mug), Some(&texture), &BinderConfig::default());
//! # let _ = textured;
//! ```

pub mod binder;
pub mod compositor;
pub mod config;
pub mod decode;
pub mod design;
pub mod error;
pub mod export;
pub mod pipeline;
pub mod surface;
pub mod text;

pub use binder::{MaterialSummary, SelectionStrategy, apply_texture, describe_materials};
pub use compositor::{CompositedTexture, Compositor, CompositorObserver, TextureId};
pub use config::{BinderConfig, CanvasConfig, CompositorConfig, FontConfig, MugprintConfig};
pub use decode::{DecodedImage, decode_image};
pub use design::{DesignSpec, ImageFit, ImageSource, ImageTransform, Rgb, TextTransform};
pub use error::{DecodeError, DesignError, ExportError, FontError};
pub use export::{RenderSurface, export_design, export_frame};
pub use pipeline::{DesignPipeline, RequestId, SceneSink, TextureSink};
pub use surface::DesignSurface;
pub use text::{FontLibrary, FontdueRasterizer, GlyphRasterizer};

/// Texturing library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Logs the library versions.
pub fn init() {
    mugprint_core::init();
    log::info!("Mugprint Texturing v{} initialized", VERSION);
}
