//! CPU preview surface.
//!
//! Renders every textured primitive of a scene flattened into UV space, so
//! the frame shows the mug wrap exactly as the shader would sample it:
//! base color texture (with its sampler and UV transform) times the base
//! color factor. Primitives without UVs or with a non-triangle topology are
//! not drawn.

use image::{Rgba, RgbaImage};
use mugprint_core::material::{CpuMaterial, MaterialSemantic, TextureSource, TextureTransform};
use mugprint_core::mesh::{CpuMesh, PrimitiveTopology};
use mugprint_core::sampler::CpuSampler;
use mugprint_core::scene::Scene;
use mugprint_core::texture::CpuTexture;
use mugprint_texturing::ExportError;
use mugprint_texturing::export::RenderSurface;

const BACKGROUND: [u8; 4] = [48, 48, 52, 255];

/// Offscreen surface drawing scenes as a UV-space unwrap.
pub struct UnwrapPreview {
    width: u32,
    height: u32,
    background: [u8; 4],
    preserve_drawing_buffer: bool,
    frame: Option<RgbaImage>,
}

impl UnwrapPreview {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            background: BACKGROUND,
            preserve_drawing_buffer: true,
            frame: None,
        }
    }

    /// A surface that discards its buffer after presenting cannot be exported.
    pub fn with_preserve_drawing_buffer(mut self, preserve: bool) -> Self {
        self.preserve_drawing_buffer = preserve;
        self
    }

    pub fn with_background(mut self, rgba: [u8; 4]) -> Self {
        self.background = rgba;
        self
    }

    fn draw_mesh(&self, frame: &mut RgbaImage, mesh: &CpuMesh) {
        if mesh.topology() != PrimitiveTopology::TriangleList {
            log::debug!("Preview skips {:?} primitive {:?}", mesh.topology(), mesh.label());
            return;
        }
        let Some(uvs) = mesh.read_uvs() else {
            return;
        };
        let shading = Shading::from_material(mesh.material().map(|m| &**m));

        let scale = [self.width as f32, self.height as f32];
        for tri in mesh.read_indices().chunks_exact(3) {
            let corners = [tri[0], tri[1], tri[2]].map(|i| uvs.get(i as usize).copied());
            if let [Some(a), Some(b), Some(c)] = corners {
                fill_triangle(frame, [a, b, c], scale, &shading);
            }
        }
    }
}

impl RenderSurface for UnwrapPreview {
    fn present(&mut self, scene: &Scene) {
        let mut frame = RgbaImage::from_pixel(self.width, self.height, Rgba(self.background));
        scene.visit_nodes(|node, _| {
            for mesh in scene.node_meshes(node) {
                self.draw_mesh(&mut frame, mesh);
            }
        });
        self.frame = self.preserve_drawing_buffer.then_some(frame);
    }

    fn capture_frame(&mut self) -> Result<RgbaImage, ExportError> {
        self.frame.clone().ok_or(ExportError::NothingPresented)
    }

    fn preserves_drawing_buffer(&self) -> bool {
        self.preserve_drawing_buffer
    }
}

/// What a primitive's material contributes per pixel.
struct Shading<'a> {
    factor: [f32; 4],
    texture: Option<(&'a CpuTexture, CpuSampler, TextureTransform)>,
}

impl<'a> Shading<'a> {
    fn from_material(material: Option<&'a CpuMaterial>) -> Self {
        let Some(material) = material else {
            return Self {
                factor: [1.0; 4],
                texture: None,
            };
        };
        let texture = material
            .get_texture(&MaterialSemantic::BaseColorTexture)
            .and_then(|t| match &t.texture {
                TextureSource::Cpu(tex) => {
                    let sampler = t
                        .sampler
                        .as_deref()
                        .cloned()
                        .unwrap_or_else(CpuSampler::linear_no_mips);
                    Some((&**tex, sampler, t.transform))
                }
                TextureSource::Named(name) => {
                    log::debug!("Preview cannot resolve texture '{}'", name);
                    None
                }
            });
        Self {
            factor: material.base_color(),
            texture,
        }
    }

    fn shade(&self, uv: [f32; 2]) -> [f32; 4] {
        let texel = match &self.texture {
            Some((tex, sampler, transform)) => {
                let [u, v] = transform.apply(uv);
                tex.sample(u, v, sampler).map(|c| c as f32 / 255.0)
            }
            None => [1.0; 4],
        };
        [
            texel[0] * self.factor[0],
            texel[1] * self.factor[1],
            texel[2] * self.factor[2],
            texel[3] * self.factor[3],
        ]
    }
}

fn edge(a: [f32; 2], b: [f32; 2], p: [f32; 2]) -> f32 {
    (b[0] - a[0]) * (p[1] - a[1]) - (b[1] - a[1]) * (p[0] - a[0])
}

/// Rasterize one UV triangle, interpolating UVs at pixel centers.
fn fill_triangle(frame: &mut RgbaImage, uv: [[f32; 2]; 3], scale: [f32; 2], shading: &Shading) {
    let p = uv.map(|[u, v]| [u * scale[0], v * scale[1]]);
    let area = edge(p[0], p[1], p[2]);
    if area.abs() < f32::EPSILON {
        return;
    }

    let min_x = p.iter().map(|q| q[0]).fold(f32::INFINITY, f32::min);
    let max_x = p.iter().map(|q| q[0]).fold(f32::NEG_INFINITY, f32::max);
    let min_y = p.iter().map(|q| q[1]).fold(f32::INFINITY, f32::min);
    let max_y = p.iter().map(|q| q[1]).fold(f32::NEG_INFINITY, f32::max);

    let x0 = min_x.floor().max(0.0) as u32;
    let y0 = min_y.floor().max(0.0) as u32;
    let x1 = (max_x.ceil().max(0.0) as u32).min(frame.width());
    let y1 = (max_y.ceil().max(0.0) as u32).min(frame.height());

    for y in y0..y1 {
        for x in x0..x1 {
            let c = [x as f32 + 0.5, y as f32 + 0.5];
            let w0 = edge(p[1], p[2], c) / area;
            let w1 = edge(p[2], p[0], c) / area;
            let w2 = edge(p[0], p[1], c) / area;
            if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                continue;
            }
            let at = [
                w0 * uv[0][0] + w1 * uv[1][0] + w2 * uv[2][0],
                w0 * uv[0][1] + w1 * uv[1][1] + w2 * uv[2][1],
            ];
            blend(frame.get_pixel_mut(x, y), shading.shade(at));
        }
    }
}

fn blend(dst: &mut Rgba<u8>, src: [f32; 4]) {
    let a = src[3].clamp(0.0, 1.0);
    for i in 0..3 {
        let d = dst[i] as f32 / 255.0;
        dst[i] = ((src[i] * a + d * (1.0 - a)) * 255.0).round().clamp(0.0, 255.0) as u8;
    }
    dst[3] = 255;
}
