//! The design surface: a fixed-size RGBA8 raster with a 2D transform stack.
//!
//! Drawing follows the usual canvas conventions: y grows downward, positive
//! angles rotate clockwise on screen, and `save`/`restore` bracket any
//! transform change. Every draw samples its source per destination pixel
//! through the inverse transform, so rotated layers stay gap-free.

use std::sync::Arc;

use glam::{Affine2, Vec2};
use image::RgbaImage;
use mugprint_core::texture::{CpuTexture, TextureFormat};

use crate::decode::DecodedImage;
use crate::text::CoverageMask;

/// Reusable raster the compositor draws into.
pub struct DesignSurface {
    pixels: RgbaImage,
    transform: Affine2,
    stack: Vec<Affine2>,
}

impl DesignSurface {
    /// Allocate a transparent surface.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            pixels: RgbaImage::new(width, height),
            transform: Affine2::IDENTITY,
            stack: Vec::new(),
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Reallocate if the size changed. Returns whether it did.
    pub fn ensure_size(&mut self, width: u32, height: u32) -> bool {
        if self.width() == width && self.height() == height {
            return false;
        }
        log::debug!(
            "Resizing design surface {}x{} -> {}x{}",
            self.width(),
            self.height(),
            width,
            height
        );
        self.pixels = RgbaImage::new(width, height);
        true
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Straight RGBA at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        (x < self.width() && y < self.height()).then(|| self.pixels.get_pixel(x, y).0)
    }

    /// Overwrite every pixel and reset the transform state.
    pub fn fill(&mut self, rgba: [u8; 4]) {
        for px in self.pixels.pixels_mut() {
            px.0 = rgba;
        }
        self.transform = Affine2::IDENTITY;
        self.stack.clear();
    }

    // -- Transform stack --

    pub fn save(&mut self) {
        self.stack.push(self.transform);
    }

    /// Pop the last saved transform. An unbalanced restore is ignored.
    pub fn restore(&mut self) {
        match self.stack.pop() {
            Some(t) => self.transform = t,
            None => log::warn!("DesignSurface::restore without matching save"),
        }
    }

    pub fn translate(&mut self, dx: f32, dy: f32) {
        self.transform = self.transform * Affine2::from_translation(Vec2::new(dx, dy));
    }

    /// Rotate subsequent drawing by `radians` (clockwise on screen).
    pub fn rotate(&mut self, radians: f32) {
        if radians != 0.0 {
            self.transform = self.transform * Affine2::from_angle(radians);
        }
    }

    pub fn transform(&self) -> Affine2 {
        self.transform
    }

    // -- Drawing --

    /// Draw `image` stretched into the local rect `(x, y, w, h)`, bilinear
    /// filtered, source-over.
    pub fn draw_image(&mut self, image: &DecodedImage, x: f32, y: f32, w: f32, h: f32) {
        if w <= 0.0 || h <= 0.0 {
            return;
        }
        let sx = image.width() as f32 / w;
        let sy = image.height() as f32 / h;
        self.draw_sampled(x, y, w, h, |lx, ly| {
            image.sample_premultiplied(lx * sx, ly * sy)
        });
    }

    /// Draw a coverage mask at local `(x, y)` in a solid color.
    pub fn draw_mask(&mut self, mask: &CoverageMask, x: f32, y: f32, rgba: [u8; 4]) {
        if mask.width == 0 || mask.height == 0 {
            return;
        }
        let color = [
            rgba[0] as f32 / 255.0,
            rgba[1] as f32 / 255.0,
            rgba[2] as f32 / 255.0,
            rgba[3] as f32 / 255.0,
        ];
        self.draw_sampled(
            x,
            y,
            mask.width as f32,
            mask.height as f32,
            |lx, ly| {
                let a = mask.sample(lx, ly) * color[3];
                [color[0] * a, color[1] * a, color[2] * a, a]
            },
        );
    }

    /// Core rasterization loop.
    ///
    /// Visits every destination pixel whose center maps inside the local rect
    /// and blends `sample(local_x - x, local_y - y)` (premultiplied) over it.
    fn draw_sampled(
        &mut self,
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        sample: impl Fn(f32, f32) -> [f32; 4],
    ) {
        let (width, height) = (self.width(), self.height());
        if width == 0 || height == 0 {
            return;
        }

        let corners = [
            Vec2::new(x, y),
            Vec2::new(x + w, y),
            Vec2::new(x, y + h),
            Vec2::new(x + w, y + h),
        ]
        .map(|c| self.transform.transform_point2(c));

        let min = corners.iter().fold(Vec2::splat(f32::INFINITY), |a, &c| a.min(c));
        let max = corners
            .iter()
            .fold(Vec2::splat(f32::NEG_INFINITY), |a, &c| a.max(c));
        if !min.is_finite() || !max.is_finite() {
            return;
        }

        let x0 = min.x.floor().max(0.0) as u32;
        let y0 = min.y.floor().max(0.0) as u32;
        let x1 = (max.x.ceil().max(0.0) as u32).min(width);
        let y1 = (max.y.ceil().max(0.0) as u32).min(height);

        let inverse = self.transform.inverse();

        for py in y0..y1 {
            for px in x0..x1 {
                let local =
                    inverse.transform_point2(Vec2::new(px as f32 + 0.5, py as f32 + 0.5));
                let (lx, ly) = (local.x - x, local.y - y);
                if lx < 0.0 || ly < 0.0 || lx >= w || ly >= h {
                    continue;
                }
                let src = sample(lx, ly);
                if src[3] <= 0.0 {
                    continue;
                }
                blend_over(self.pixels.get_pixel_mut(px, py), src);
            }
        }
    }

    /// Snapshot the surface as an sRGB CPU texture.
    pub fn to_texture(&self, label: &str) -> CpuTexture {
        CpuTexture {
            label: Some(label.to_string()),
            width: self.width(),
            height: self.height(),
            format: TextureFormat::Rgba8UnormSrgb,
            mip_level_count: 1,
            data: self.pixels.as_raw().clone(),
        }
    }

    /// Snapshot the surface as a shared texture.
    pub fn to_shared_texture(&self, label: &str) -> Arc<CpuTexture> {
        Arc::new(self.to_texture(label))
    }
}

impl std::fmt::Debug for DesignSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DesignSurface")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("stack_depth", &self.stack.len())
            .finish()
    }
}

/// Premultiplied source-over onto a straight-alpha destination pixel.
fn blend_over(dst: &mut image::Rgba<u8>, src: [f32; 4]) {
    let da = dst[3] as f32 / 255.0;
    let sa = src[3].clamp(0.0, 1.0);
    let out_a = sa + da * (1.0 - sa);
    if out_a <= 0.0 {
        dst.0 = [0, 0, 0, 0];
        return;
    }
    for i in 0..3 {
        let dc = dst[i] as f32 / 255.0 * da;
        let premul = src[i] + dc * (1.0 - sa);
        dst[i] = to_u8(premul / out_a);
    }
    dst[3] = to_u8(out_a);
}

fn to_u8(v: f32) -> u8 {
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}
