//! Material data types for CPU-side material definitions.
//!
//! Materials use a property-based system where each property has a
//! [`MaterialSemantic`] tag and a typed [`MaterialValue`]. This bridges
//! format-specific loaders (glTF) with code that edits materials without
//! knowing the source format.

use std::sync::Arc;

use crate::sampler::CpuSampler;
use crate::texture::CpuTexture;

/// Well-known material property semantics.
///
/// Standard PBR metallic-roughness properties plus extensibility via [`Custom`](Self::Custom).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MaterialSemantic {
    // -- PBR Metallic-Roughness --
    /// Base color factor `[r, g, b, a]` (linear).
    BaseColorFactor,
    /// Base color texture.
    BaseColorTexture,
    /// Metallic factor (0.0–1.0).
    MetallicFactor,
    /// Roughness factor (0.0–1.0).
    RoughnessFactor,
    /// Metallic-roughness texture (B=metallic, G=roughness).
    MetallicRoughnessTexture,
    /// Normal map texture.
    NormalTexture,
    /// Occlusion texture.
    OcclusionTexture,
    /// Emissive factor `[r, g, b]`.
    EmissiveFactor,
    /// Emissive texture.
    EmissiveTexture,
    /// Alpha cutoff threshold (for [`AlphaMode::Mask`]).
    AlphaCutoff,

    // -- Extension --
    /// Custom property for non-standard semantics.
    Custom(String),
}

/// A typed material property value.
#[derive(Debug, Clone, PartialEq)]
pub enum MaterialValue {
    /// Single float (metallic, roughness, alpha cutoff).
    Float(f32),
    /// 3-component vector (emissive factor).
    Vec3([f32; 3]),
    /// 4-component vector (base color factor).
    Vec4([f32; 4]),
    /// Texture reference.
    Texture(TextureRef),
}

/// How a texture is sourced.
#[derive(Debug, Clone)]
pub enum TextureSource {
    /// Owned CPU texture data (Arc-shared across materials).
    Cpu(Arc<CpuTexture>),
    /// Named texture reference (resolved externally, e.g. a glTF image index).
    Named(String),
}

/// UV transform applied when sampling a texture.
///
/// Matches the subset of `KHR_texture_transform` used by the renderer:
/// an offset, a rotation about the texture center and a vertical flip flag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureTransform {
    /// UV offset added after rotation.
    pub offset: [f32; 2],
    /// Rotation in radians around `(0.5, 0.5)`.
    pub rotation: f32,
    /// Whether the image rows are flipped on upload.
    pub flip_y: bool,
}

impl TextureTransform {
    /// No offset, no rotation, no flip.
    pub const IDENTITY: Self = Self {
        offset: [0.0, 0.0],
        rotation: 0.0,
        flip_y: false,
    };

    /// Map a mesh UV to the texture coordinate actually sampled.
    pub fn apply(&self, uv: [f32; 2]) -> [f32; 2] {
        let (mut u, mut v) = (uv[0], uv[1]);
        if self.rotation != 0.0 {
            let (s, c) = self.rotation.sin_cos();
            let (du, dv) = (u - 0.5, v - 0.5);
            u = du * c - dv * s + 0.5;
            v = du * s + dv * c + 0.5;
        }
        u += self.offset[0];
        v += self.offset[1];
        if self.flip_y {
            v = 1.0 - v;
        }
        [u, v]
    }
}

impl Default for TextureTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Reference to a texture with sampler, UV set and UV transform.
#[derive(Debug, Clone)]
pub struct TextureRef {
    /// The texture source (owned data or named reference).
    pub texture: TextureSource,
    /// Shared sampler configuration.
    pub sampler: Option<Arc<CpuSampler>>,
    /// Texture coordinate set index (0, 1, …).
    pub tex_coord: u32,
    /// UV transform.
    pub transform: TextureTransform,
}

impl PartialEq for TextureRef {
    fn eq(&self, other: &Self) -> bool {
        self.tex_coord == other.tex_coord
            && self.transform == other.transform
            && match (&self.texture, &other.texture) {
                (TextureSource::Cpu(a), TextureSource::Cpu(b)) => Arc::ptr_eq(a, b),
                (TextureSource::Named(a), TextureSource::Named(b)) => a == b,
                _ => false,
            }
            && match (&self.sampler, &other.sampler) {
                (Some(a), Some(b)) => **a == **b,
                (None, None) => true,
                _ => false,
            }
    }
}

/// A single material property: semantic tag + typed value.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialProperty {
    /// What this property represents.
    pub semantic: MaterialSemantic,
    /// The property value.
    pub value: MaterialValue,
}

/// Alpha rendering mode.
///
/// Affects pipeline state (blend configuration), not shader bindings.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum AlphaMode {
    /// Fully opaque (alpha ignored).
    #[default]
    Opaque,
    /// Alpha masking with cutoff threshold.
    Mask,
    /// Full alpha blending.
    Blend,
}

/// CPU-side material definition.
///
/// All material data is stored as a flat list of [`MaterialProperty`] entries
/// with semantic tags. Pipeline state ([`alpha_mode`](Self::alpha_mode),
/// [`double_sided`](Self::double_sided)) is separate since it affects
/// rendering configuration, not shader bindings.
///
/// Materials are shared via `Arc` between meshes. Editing a shared material
/// means cloning it first; [`needs_update`](Self::needs_update) marks a
/// clone whose GPU copy must be re-uploaded.
///
/// # Example
///
/// ```
/// use mugprint_core::material::*;
///
/// let mat = CpuMaterial::new()
///     .with_name("Caneca-corpo")
///     .with_property(MaterialProperty {
///         semantic: MaterialSemantic::BaseColorFactor,
///         value: MaterialValue::Vec4([0.9, 0.9, 0.9, 1.0]),
///     });
/// assert_eq!(mat.base_color(), [0.9, 0.9, 0.9, 1.0]);
/// ```
#[derive(Debug, Clone)]
pub struct CpuMaterial {
    /// Material name.
    pub name: Option<String>,
    /// Alpha rendering mode.
    pub alpha_mode: AlphaMode,
    /// Whether the material is double-sided.
    pub double_sided: bool,
    /// Material properties (PBR factors, textures, custom data).
    pub properties: Vec<MaterialProperty>,
    /// Set when the material was edited and its GPU copy is stale.
    pub needs_update: bool,
}

impl CpuMaterial {
    /// Creates a new empty material (opaque, single-sided, no properties).
    pub fn new() -> Self {
        Self {
            name: None,
            alpha_mode: AlphaMode::Opaque,
            double_sided: false,
            properties: Vec::new(),
            needs_update: false,
        }
    }

    /// Set the material name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the alpha rendering mode.
    #[must_use]
    pub fn with_alpha_mode(mut self, alpha_mode: AlphaMode) -> Self {
        self.alpha_mode = alpha_mode;
        self
    }

    /// Set double-sided rendering.
    #[must_use]
    pub fn with_double_sided(mut self, double_sided: bool) -> Self {
        self.double_sided = double_sided;
        self
    }

    /// Add or replace a property.
    #[must_use]
    pub fn with_property(mut self, property: MaterialProperty) -> Self {
        self.set(property.semantic, property.value);
        self
    }

    /// Insert a property value, replacing any existing value with the same semantic.
    pub fn set(&mut self, semantic: MaterialSemantic, value: MaterialValue) {
        match self.properties.iter_mut().find(|p| p.semantic == semantic) {
            Some(existing) => existing.value = value,
            None => self.properties.push(MaterialProperty { semantic, value }),
        }
    }

    /// Find a property value by semantic.
    pub fn get(&self, semantic: &MaterialSemantic) -> Option<&MaterialValue> {
        self.properties
            .iter()
            .find(|p| &p.semantic == semantic)
            .map(|p| &p.value)
    }

    /// Get a float property by semantic.
    pub fn get_float(&self, semantic: &MaterialSemantic) -> Option<f32> {
        match self.get(semantic)? {
            MaterialValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Get a vec3 property by semantic.
    pub fn get_vec3(&self, semantic: &MaterialSemantic) -> Option<[f32; 3]> {
        match self.get(semantic)? {
            MaterialValue::Vec3(v) => Some(*v),
            _ => None,
        }
    }

    /// Get a vec4 property by semantic.
    pub fn get_vec4(&self, semantic: &MaterialSemantic) -> Option<[f32; 4]> {
        match self.get(semantic)? {
            MaterialValue::Vec4(v) => Some(*v),
            _ => None,
        }
    }

    /// Get a texture reference by semantic.
    pub fn get_texture(&self, semantic: &MaterialSemantic) -> Option<&TextureRef> {
        match self.get(semantic)? {
            MaterialValue::Texture(t) => Some(t),
            _ => None,
        }
    }

    /// Base color factor, white if unset (the glTF default).
    pub fn base_color(&self) -> [f32; 4] {
        self.get_vec4(&MaterialSemantic::BaseColorFactor)
            .unwrap_or([1.0, 1.0, 1.0, 1.0])
    }

    /// Relative luminance of the base color (Rec. 709 weights, linear input).
    pub fn base_color_luminance(&self) -> f32 {
        let [r, g, b, _] = self.base_color();
        0.2126 * r + 0.7152 * g + 0.0722 * b
    }
}

impl Default for CpuMaterial {
    fn default() -> Self {
        Self::new()
    }
}
