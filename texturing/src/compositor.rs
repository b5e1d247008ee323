//! The texture compositor: flattens a [`DesignSpec`] into a print-ready
//! canvas and wraps it as a GPU-ready [`CompositedTexture`].

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use glam::Vec2;
use mugprint_core::material::{TextureRef, TextureSource, TextureTransform};
use mugprint_core::sampler::{AddressMode, CpuSampler};
use mugprint_core::texture::CpuTexture;

use crate::config::CompositorConfig;
use crate::decode::{DecodedImage, decode_image};
use crate::design::{DesignSpec, ImageFit};
use crate::surface::DesignSurface;
use crate::text::{FontLibrary, FontdueRasterizer, GlyphRasterizer, layout_line};

const WHITE: [u8; 4] = [255, 255, 255, 255];

/// Process-wide unique, monotonically increasing texture identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TextureId(u64);

impl TextureId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

/// An immutable, upload-ready snapshot of the design canvas.
///
/// The canvas is non-power-of-two, so the sampler is linear without mips
/// and `generate_mipmaps` is always false.
#[derive(Debug, Clone)]
pub struct CompositedTexture {
    pub id: TextureId,
    pub texture: Arc<CpuTexture>,
    pub sampler: Arc<CpuSampler>,
    /// `offset = [wrap_offset, 0]`; `flip_y` is false.
    pub transform: TextureTransform,
    pub generate_mipmaps: bool,
    pub needs_update: bool,
}

impl CompositedTexture {
    pub(crate) fn new(texture: Arc<CpuTexture>, wrap_offset: f32, uv_rotation: f32) -> Self {
        Self {
            id: TextureId::next(),
            texture,
            sampler: Arc::new(design_sampler()),
            transform: TextureTransform {
                offset: [wrap_offset, 0.0],
                rotation: uv_rotation,
                flip_y: false,
            },
            generate_mipmaps: false,
            needs_update: true,
        }
    }

    pub fn width(&self) -> u32 {
        self.texture.width
    }

    pub fn height(&self) -> u32 {
        self.texture.height
    }

    /// Material texture reference (UV set 0) pointing at this texture.
    pub fn texture_ref(&self) -> TextureRef {
        TextureRef {
            texture: TextureSource::Cpu(Arc::clone(&self.texture)),
            sampler: Some(Arc::clone(&self.sampler)),
            tex_coord: 0,
            transform: self.transform,
        }
    }

    /// Sample the texture at a mesh UV, applying the UV transform.
    pub fn sample_uv(&self, uv: [f32; 2]) -> [u8; 4] {
        let [u, v] = self.transform.apply(uv);
        self.texture.sample(u, v, &self.sampler)
    }
}

/// Repeat around the mug, clamp at the rims, linear, no mips.
fn design_sampler() -> CpuSampler {
    CpuSampler::linear_no_mips()
        .with_name("design")
        .with_address_modes(AddressMode::Repeat, AddressMode::ClampToEdge)
}

/// Diagnostic hook called after every composition.
pub trait CompositorObserver: Send {
    fn on_composed(&mut self, surface: &DesignSurface, texture: &CompositedTexture);
}

/// Flattens designs onto a reused [`DesignSurface`].
pub struct Compositor {
    config: CompositorConfig,
    surface: DesignSurface,
    rasterizer: Box<dyn GlyphRasterizer>,
    observer: Option<Box<dyn CompositorObserver>>,
}

impl Compositor {
    /// Compositor using the fonts named in `config`.
    pub fn new(config: CompositorConfig) -> Self {
        let library = FontLibrary::from_config(&config.fonts);
        Self::with_rasterizer(config, FontdueRasterizer::new(library))
    }

    /// Compositor with a custom text rasterizer.
    pub fn with_rasterizer(
        config: CompositorConfig,
        rasterizer: impl GlyphRasterizer + 'static,
    ) -> Self {
        let surface = DesignSurface::new(config.canvas.width, config.canvas.height);
        Self {
            config,
            surface,
            rasterizer: Box::new(rasterizer),
            observer: None,
        }
    }

    pub fn set_observer(&mut self, observer: impl CompositorObserver + 'static) {
        self.observer = Some(Box::new(observer));
    }

    pub fn clear_observer(&mut self) {
        self.observer = None;
    }

    pub fn config(&self) -> &CompositorConfig {
        &self.config
    }

    /// Change configuration; the surface is reallocated on the next compose
    /// if the canvas size changed.
    pub fn set_config(&mut self, config: CompositorConfig) {
        self.config = config;
    }

    /// The canvas as of the last composition.
    pub fn surface(&self) -> &DesignSurface {
        &self.surface
    }

    /// Compose `spec`, decoding its image synchronously.
    ///
    /// Never fails: an undecodable image or a missing font only drops that
    /// layer (logged at `warn`).
    pub fn compose(&mut self, spec: &DesignSpec) -> CompositedTexture {
        let image = spec
            .image_source
            .as_ref()
            .and_then(|source| match decode_image(source) {
                Ok(img) => Some(img),
                Err(e) => {
                    log::warn!("Image layer omitted: {}", e);
                    None
                }
            });
        self.compose_with(spec, image.as_ref())
    }

    /// Compose `spec` with an already decoded image layer.
    pub fn compose_with(
        &mut self,
        spec: &DesignSpec,
        image: Option<&DecodedImage>,
    ) -> CompositedTexture {
        let canvas = self.config.canvas;
        self.surface.ensure_size(canvas.width, canvas.height);
        self.surface.fill(WHITE);

        if let Some(image) = image {
            self.draw_image_layer(spec, image);
        }
        if let Some(text) = spec.text_layer() {
            self.draw_text_layer(spec, text);
        }

        let texture = CompositedTexture::new(
            self.surface.to_shared_texture("design"),
            spec.clamped_wrap_offset(),
            self.config.uv_rotation_degrees.to_radians(),
        );
        log::debug!(
            "Composed texture {:?} ({}x{})",
            texture.id,
            texture.width(),
            texture.height()
        );

        if let Some(observer) = self.observer.as_mut() {
            observer.on_composed(&self.surface, &texture);
        }
        texture
    }

    fn draw_image_layer(&mut self, spec: &DesignSpec, image: &DecodedImage) {
        let t = &spec.image;
        let (base_w, base_h) = image_base_size(
            spec.image_fit,
            image.width() as f32,
            image.height() as f32,
            self.surface.width() as f32,
            self.surface.height() as f32,
        );
        let w = base_w * t.scale_x;
        let h = base_h * t.scale_y;
        if !(w > 0.0 && h > 0.0) {
            log::warn!("Image layer omitted: non-positive size {}x{}", w, h);
            return;
        }

        let [cx, cy] = self.config.canvas.center();
        let x = cx - w * 0.5 + t.offset_x;
        let y = cy - h * 0.5 + t.offset_y;
        let pivot = (x + w * 0.5, y + h * 0.5);

        self.surface.save();
        self.surface.translate(pivot.0, pivot.1);
        self.surface.rotate(t.rotation_degrees.to_radians());
        self.surface.draw_image(image, -w * 0.5, -h * 0.5, w, h);
        self.surface.restore();
    }

    fn draw_text_layer(&mut self, spec: &DesignSpec, text: &str) {
        let mut size = spec.font_size();
        if !(size > 0.0) {
            log::warn!("Text layer omitted: non-positive font size {}", size);
            return;
        }
        let max_size = self.max_font_size();
        if size > max_size {
            log::warn!("Font size {} exceeds the canvas, drawing at {}", size, max_size);
            size = max_size;
        }

        let t = &spec.text_transform;
        let [cx, cy] = self.config.canvas.center();
        self.surface.save();
        self.surface.translate(cx + t.offset_x, cy + t.offset_y);
        self.surface.rotate(t.rotation_degrees.to_radians());

        let clip = self.visible_local_rect();
        match layout_line(
            self.rasterizer.as_ref(),
            &spec.font_family,
            text,
            size,
            Some(clip),
        ) {
            Ok(mask) => {
                let [ox, oy] = mask.centered_origin();
                self.surface
                    .draw_mask(&mask, ox, oy, spec.text_color.to_rgba());
            }
            Err(e) => log::warn!("Text layer omitted: {}", e),
        }
        self.surface.restore();
    }

    /// Twice the canvas diagonal: a single glyph at this size already
    /// covers the whole canvas.
    fn max_font_size(&self) -> f32 {
        let w = self.surface.width() as f32;
        let h = self.surface.height() as f32;
        2.0 * (w * w + h * h).sqrt()
    }

    /// Bounding box of the canvas in the surface's current local space.
    fn visible_local_rect(&self) -> [f32; 4] {
        let inverse = self.surface.transform().inverse();
        let (w, h) = (self.surface.width() as f32, self.surface.height() as f32);
        let corners = [
            Vec2::new(0.0, 0.0),
            Vec2::new(w, 0.0),
            Vec2::new(0.0, h),
            Vec2::new(w, h),
        ]
        .map(|c| inverse.transform_point2(c));
        let min = corners.iter().fold(Vec2::splat(f32::INFINITY), |a, &c| a.min(c));
        let max = corners
            .iter()
            .fold(Vec2::splat(f32::NEG_INFINITY), |a, &c| a.max(c));
        [min.x, min.y, max.x, max.y]
    }
}

impl std::fmt::Debug for Compositor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Compositor")
            .field("config", &self.config)
            .field("surface", &self.surface)
            .field("has_observer", &self.observer.is_some())
            .finish()
    }
}

/// Size of the image before `scale_x`/`scale_y`.
fn image_base_size(fit: ImageFit, w: f32, h: f32, canvas_w: f32, canvas_h: f32) -> (f32, f32) {
    match fit {
        ImageFit::Natural => (w, h),
        ImageFit::Contain => {
            if w / h > canvas_w / canvas_h {
                (canvas_w, canvas_w * h / w)
            } else {
                (canvas_h * w / h, canvas_h)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CanvasConfig;
    use crate::design::{ImageTransform, Rgb, TextTransform};
    use crate::text::tests::BlockRasterizer;
    use rstest::rstest;
    use std::sync::Mutex;

    const RED: [u8; 4] = [255, 0, 0, 255];

    fn small_config() -> CompositorConfig {
        CompositorConfig {
            canvas: CanvasConfig {
                width: 210,
                height: 97,
            },
            ..Default::default()
        }
    }

    fn compositor() -> Compositor {
        Compositor::with_rasterizer(small_config(), BlockRasterizer)
    }

    fn ink_bounds(surface: &DesignSurface) -> Option<(u32, u32, u32, u32)> {
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

    fn red_image(w: u32, h: u32) -> DecodedImage {
        DecodedImage::solid(w, h, RED).unwrap()
    }

    #[test]
    fn blank_spec_is_uniform_white() {
        let mut c = compositor();
        let tex = c.compose(&DesignSpec::new());
        assert!(tex.texture.data.chunks_exact(4).all(|px| px == WHITE));
        assert_eq!((tex.width(), tex.height()), (210, 97));
    }

    #[test]
    fn default_canvas_is_npot_print_area() {
        let mut c = Compositor::with_rasterizer(CompositorConfig::default(), BlockRasterizer);
        let tex = c.compose(&DesignSpec::new());
        assert_eq!((tex.width(), tex.height()), (2100, 970));
        assert!(!tex.texture.is_power_of_two());
    }

    #[test]
    fn descriptor_has_fixed_properties() {
        let mut c = compositor();
        let tex = c.compose(&DesignSpec::new().with_wrap_offset(0.3));

        assert_eq!(tex.texture.mip_level_count, 1);
        assert!(tex.texture.format.is_srgb());
        assert_eq!(tex.sampler.address_mode_u, AddressMode::Repeat);
        assert_eq!(tex.sampler.address_mode_v, AddressMode::ClampToEdge);
        assert!(tex.sampler.mipmap_filter.is_none());
        assert!(tex.sampler.is_npot_safe());
        assert_eq!(tex.transform.offset, [0.3, 0.0]);
        assert_eq!(tex.transform.rotation, 0.0);
        assert!(!tex.transform.flip_y);
        assert!(!tex.generate_mipmaps);
        assert!(tex.needs_update);
    }

    #[test]
    fn ids_increase() {
        let mut c = compositor();
        let a = c.compose(&DesignSpec::new());
        let b = c.compose(&DesignSpec::new());
        assert!(b.id > a.id);
    }

    #[test]
    fn image_is_centered_with_offset() {
        let mut c = compositor();
        let spec = DesignSpec::new().with_image_transform(ImageTransform {
            offset_x: 10.0,
            offset_y: -5.0,
            ..Default::default()
        });
        c.compose_with(&spec, Some(&red_image(20, 10)));
        // center (105, 48.5) - (10, 5) + (10, -5) = (105, 38.5)
        assert_eq!(ink_bounds(c.surface()), Some((105, 38, 125, 48)));
    }

    #[test]
    fn zero_rotation_is_identity_on_position() {
        let mut a = compositor();
        let mut b = compositor();
        let img = red_image(30, 12);
        let plain = DesignSpec::new();
        let rotated = DesignSpec::new().with_image_transform(ImageTransform {
            rotation_degrees: 0.0,
            ..Default::default()
        });
        let ta = a.compose_with(&plain, Some(&img));
        let tb = b.compose_with(&rotated, Some(&img));
        assert_eq!(ta.texture.data, tb.texture.data);
        assert_eq!(ink_bounds(a.surface()), Some((90, 42, 120, 54)));
    }

    #[test]
    fn compose_is_idempotent() {
        let mut c = compositor();
        let spec = DesignSpec::new()
            .with_text("Hi")
            .with_image_transform(ImageTransform {
                scale_x: 1.3,
                rotation_degrees: 33.0,
                ..Default::default()
            });
        let img = red_image(25, 15);
        let first = c.compose_with(&spec, Some(&img));
        let second = c.compose_with(&spec, Some(&img));
        assert_eq!(first.texture.data, second.texture.data);
        assert_ne!(first.id, second.id);
    }

    #[rstest]
    #[case(0.5, 1.0)]
    #[case(1.0, 1.5)]
    #[case(1.5, 2.75)]
    fn larger_scale_x_widens_image(#[case] smaller: f32, #[case] larger: f32) {
        let img = red_image(40, 10);
        let width_at = |scale_x: f32| {
            let mut c = compositor();
            let spec = DesignSpec::new().with_image_transform(ImageTransform {
                scale_x,
                ..Default::default()
            });
            c.compose_with(&spec, Some(&img));
            let (x0, _, x1, _) = ink_bounds(c.surface()).unwrap();
            x1 - x0
        };
        assert!(width_at(larger) > width_at(smaller));
    }

    #[test]
    fn contain_fit_fills_canvas_height() {
        let mut c = compositor();
        let spec = DesignSpec {
            image_fit: ImageFit::Contain,
            ..Default::default()
        };
        // Square image on a wide canvas: fitted to 97x97.
        c.compose_with(&spec, Some(&red_image(10, 10)));
        let (x0, y0, x1, y1) = ink_bounds(c.surface()).unwrap();
        assert_eq!((y0, y1), (0, 97));
        assert_eq!(x1 - x0, 97);
    }

    #[test]
    fn undecodable_image_only_drops_image_layer() {
        let mut c = compositor();
        let spec = DesignSpec::new()
            .with_image(crate::design::ImageSource::Base64("%%%".into()))
            .with_text("A");
        c.compose(&spec);
        let (x0, _, x1, _) = ink_bounds(c.surface()).expect("text still drawn");
        assert!(c.surface().pixels().pixels().all(|p| p.0 != RED));
        // One block glyph at 120px is 60px wide.
        assert_eq!(x1 - x0, 60);
    }

    #[test]
    fn text_is_centered_and_drawn_over_image() {
        let mut c = compositor();
        let spec = DesignSpec {
            text: Some("X".into()),
            text_color: Rgb::new(0, 0, 255),
            base_font_size: 20.0,
            ..Default::default()
        };
        c.compose_with(&spec, Some(&red_image(60, 40)));

        // Block glyph: 10x14 on baseline 16 of a 20px line box, advance 12.
        // Box top-left = center (105, 48.5) + (-6, -10) = (99, 38.5), so ink
        // spans x 99..109 and y 40.5..54.5 (half-covered edge rows).
        let blue = [0, 0, 255, 255];
        assert_eq!(c.surface().pixel(104, 47), Some(blue));
        assert_eq!(c.surface().pixel(98, 47), Some(RED));
        assert_eq!(c.surface().pixel(109, 47), Some(RED));
        assert_eq!(c.surface().pixel(104, 39), Some(RED));
        assert_eq!(c.surface().pixel(104, 41), Some(blue));
        assert_eq!(c.surface().pixel(104, 53), Some(blue));
        assert_eq!(c.surface().pixel(104, 55), Some(RED));
    }

    #[test]
    fn text_offset_and_scale() {
        let mut c = compositor();
        let spec = DesignSpec {
            text: Some("X".into()),
            base_font_size: 10.0,
            text_transform: TextTransform {
                scale_y: 2.0,
                offset_x: -50.0,
                offset_y: 20.0,
                ..Default::default()
            },
            ..Default::default()
        };
        c.compose(&spec);
        let (x0, y0, x1, y1) = ink_bounds(c.surface()).unwrap();
        // 20px: block 10x14, anchor (55, 68.5), box top-left (49, 58.5)
        assert_eq!((x0, x1), (49, 59));
        assert_eq!((y0, y1), (60, 75));
    }

    #[test]
    fn oversized_text_is_capped_and_clipped() {
        let mut c = compositor();
        let spec = DesignSpec::new()
            .with_text("MUGPRINT")
            .with_text_transform(TextTransform {
                scale_y: 1.0e4,
                ..Default::default()
            });
        c.compose(&spec);

        // Capped at twice the 210x97 diagonal (~462px): glyphs 231px wide
        // every ~278px, so the canvas shows the gap before the fifth glyph
        // and the start of that glyph.
        assert_eq!(c.surface().pixel(80, 48), Some(WHITE));
        assert_eq!(c.surface().pixel(150, 48), Some([0, 0, 0, 255]));
        assert_eq!(c.surface().pixel(150, 0), Some([0, 0, 0, 255]));
        assert_eq!(c.surface().pixel(150, 96), Some([0, 0, 0, 255]));
    }

    #[test]
    fn missing_font_only_drops_text_layer() {
        let mut config = small_config();
        config.fonts.system_fonts = false;
        let mut c = Compositor::new(config);
        let tex = c.compose(&DesignSpec::new().with_text("Café"));
        assert!(tex.texture.data.chunks_exact(4).all(|px| px == WHITE));
    }

    #[test]
    fn uv_rotation_comes_from_config() {
        let mut config = small_config();
        config.uv_rotation_degrees = 180.0;
        let mut c = Compositor::with_rasterizer(config, BlockRasterizer);
        let tex = c.compose(&DesignSpec::new());
        assert!((tex.transform.rotation - std::f32::consts::PI).abs() < 1e-6);
    }

    #[test]
    fn surface_follows_config_size() {
        let mut c = compositor();
        c.compose(&DesignSpec::new());
        let mut config = small_config();
        config.canvas.width = 64;
        c.set_config(config);
        let tex = c.compose(&DesignSpec::new());
        assert_eq!(tex.width(), 64);
        assert_eq!(c.surface().width(), 64);
    }

    struct Recorder(Arc<Mutex<Vec<(u32, TextureId)>>>);

    impl CompositorObserver for Recorder {
        fn on_composed(&mut self, surface: &DesignSurface, texture: &CompositedTexture) {
            self.0.lock().unwrap().push((surface.width(), texture.id));
        }
    }

    #[test]
    fn observer_sees_every_composition() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut c = compositor();
        c.set_observer(Recorder(Arc::clone(&seen)));
        let a = c.compose(&DesignSpec::new());
        let b = c.compose(&DesignSpec::new());
        assert_eq!(*seen.lock().unwrap(), vec![(210, a.id), (210, b.id)]);

        c.clear_observer();
        c.compose(&DesignSpec::new());
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[test]
    fn sample_uv_applies_wrap_offset() {
        let mut c = compositor();
        // Left half red: image 105 wide at offset -52.5 covers x 0..105.
        let spec = DesignSpec::new()
            .with_image_transform(ImageTransform {
                offset_x: -52.5,
                ..Default::default()
            })
            .with_wrap_offset(0.5);
        let tex = c.compose_with(&spec, Some(&DecodedImage::solid(105, 97, RED).unwrap()));
        // u = 0.75 + 0.5 wraps to 0.25 -> red half.
        assert_eq!(tex.sample_uv([0.75, 0.5]), RED);
        assert_eq!(tex.sample_uv([0.25, 0.5]), WHITE);
    }
}
