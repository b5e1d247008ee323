//! Common utilities for texturing integration tests.
//!
//! Provides a font-free glyph rasterizer, a task runner whose jobs complete
//! on demand, and a small mug scene built from the core mesh generators.

#![allow(dead_code)]

use std::io::Cursor;
use std::path::Path;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};

use image::{ImageFormat, RgbaImage};
use mugprint_core::compute::{TaskHandle, TaskRunner};
use mugprint_core::material::{
    AlphaMode, CpuMaterial, MaterialProperty, MaterialSemantic, MaterialValue,
};
use mugprint_core::mesh::generators::{generate_cylinder, generate_cylinder_untextured};
use mugprint_core::scene::{NodeTransform, Scene, SceneNode};
use mugprint_texturing::error::FontError;
use mugprint_texturing::text::{GlyphBitmap, GlyphRasterizer, LineMetrics};
use mugprint_texturing::{
    CompositedTexture, DesignSurface, FontConfig, ImageSource, TextureSink,
};

pub const WHITE: [u8; 4] = [255, 255, 255, 255];
pub const BLACK: [u8; 4] = [0, 0, 0, 255];

// ============================================================================
// Text
// ============================================================================

/// Draws every non-space character as a solid block 0.5em wide and 0.7em
/// tall on the baseline, advancing 0.6em. Line box is 0.8em up, 0.2em down.
pub struct BlockRasterizer;

impl GlyphRasterizer for BlockRasterizer {
    fn line_metrics(&self, _family: &str, px: f32) -> Result<LineMetrics, FontError> {
        Ok(LineMetrics {
            ascent: px * 0.8,
            descent: -px * 0.2,
        })
    }

    fn rasterize(&self, _family: &str, ch: char, px: f32) -> Result<GlyphBitmap, FontError> {
        let (width, height) = if ch.is_whitespace() {
            (0, 0)
        } else {
            ((px * 0.5) as usize, (px * 0.7) as usize)
        };
        Ok(GlyphBitmap {
            width,
            height,
            coverage: vec![255; width * height],
            xmin: 0,
            ymin: 0,
            advance: px * 0.6,
        })
    }
}

/// Only the fonts shipped under `tests/fonts`, with DejaVu Sans standing in
/// for every unknown family.
pub fn bundled_fonts() -> FontConfig {
    FontConfig {
        system_fonts: false,
        dirs: vec![Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fonts")],
        sans_serif_family: Some("DejaVu Sans".into()),
        ..Default::default()
    }
}

// ============================================================================
// Tasks
// ============================================================================

type Job = Box<dyn FnOnce() + Send>;

/// Runner that queues jobs until the test completes them, in any order.
#[derive(Clone, Default)]
pub struct ManualRunner {
    jobs: Arc<Mutex<Vec<Option<Job>>>>,
}

impl ManualRunner {
    /// Run the `index`-th submitted job, if it has not run yet.
    pub fn complete(&self, index: usize) {
        let job = self.jobs.lock().unwrap()[index].take();
        if let Some(job) = job {
            job();
        }
    }

    pub fn submitted(&self) -> usize {
        self.jobs.lock().unwrap().len()
    }
}

impl TaskRunner for ManualRunner {
    fn run<T, F>(&self, job: F) -> TaskHandle<T>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        self.jobs.lock().unwrap().push(Some(Box::new(move || {
            let _ = tx.send(job());
        })));
        TaskHandle::new(rx)
    }
}

/// Sink that only remembers what it was given.
#[derive(Default)]
pub struct CollectingSink {
    pub installed: Vec<Arc<CompositedTexture>>,
    pub released: usize,
}

impl TextureSink for CollectingSink {
    fn install(&mut self, texture: &Arc<CompositedTexture>) {
        self.installed.push(Arc::clone(texture));
    }

    fn release(&mut self, _texture: Arc<CompositedTexture>) {
        self.released += 1;
    }
}

// ============================================================================
// Fixtures
// ============================================================================

pub fn material(name: &str, base_color: [f32; 4]) -> Arc<CpuMaterial> {
    Arc::new(
        CpuMaterial::new()
            .with_name(name)
            .with_property(MaterialProperty {
                semantic: MaterialSemantic::BaseColorFactor,
                value: MaterialValue::Vec4(base_color),
            }),
    )
}

/// A mug node with a glass shell (slot 0), a printable body (slot 1) and an
/// untextured handle node.
pub fn mug_scene() -> Scene {
    let glass = material("Glass", [0.95, 0.95, 0.95, 0.3]);
    let body = material("Caneca-corpo", [0.8, 0.8, 0.8, 1.0]);
    let handle = Arc::new(
        CpuMaterial::new()
            .with_name("Handle")
            .with_alpha_mode(AlphaMode::Opaque),
    );

    let meshes = vec![
        generate_cylinder(0.41, 0.95, 48)
            .with_material(glass)
            .with_label("glass"),
        generate_cylinder(0.4, 0.95, 48)
            .with_material(body)
            .with_label("body"),
        generate_cylinder_untextured(0.05, 0.5, 12)
            .with_material(handle)
            .with_label("handle"),
    ];

    let handle_node = SceneNode::new()
        .with_name("Handle")
        .with_transform(NodeTransform::IDENTITY.with_translation([0.45, 0.0, 0.0]))
        .with_meshes(vec![2]);
    let mug = SceneNode::new()
        .with_name("Mug")
        .with_meshes(vec![0, 1])
        .with_children(vec![handle_node]);

    Scene::new()
        .with_name("mug")
        .with_nodes(vec![mug])
        .with_meshes(meshes)
}

/// Solid-color PNG as an in-memory image source.
pub fn png_source(width: u32, height: u32, rgba: [u8; 4]) -> ImageSource {
    let img = RgbaImage::from_pixel(width, height, image::Rgba(rgba));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    ImageSource::Bytes(out.into_inner().into())
}

/// Bounding box of non-white pixels, `(x0, y0, x1, y1)` with exclusive ends.
pub fn ink_bounds(surface: &DesignSurface) -> Option<(u32, u32, u32, u32)> {
    let mut bounds: Option<(u32, u32, u32, u32)> = None;
    for (x, y, px) in surface.pixels().enumerate_pixels() {
        if px.0 != WHITE {
            let b = bounds.get_or_insert((x, y, x + 1, y + 1));
            b.0 = b.0.min(x);
            b.1 = b.1.min(y);
            b.2 = b.2.max(x + 1);
            b.3 = b.3.max(y + 1);
        }
    }
    bounds
}
