//! CPU-side sampler types and filter/address mode definitions.

/// Texture filtering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FilterMode {
    /// Nearest neighbor filtering.
    #[default]
    Nearest,
    /// Linear filtering.
    Linear,
}

/// Texture address mode (wrapping behavior).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AddressMode {
    /// Clamp to edge.
    #[default]
    ClampToEdge,
    /// Repeat.
    Repeat,
    /// Mirrored repeat.
    MirrorRepeat,
}

impl AddressMode {
    /// Map a texture coordinate into `[0, 1]` according to this mode.
    pub fn apply(self, coord: f32) -> f32 {
        match self {
            Self::ClampToEdge => coord.clamp(0.0, 1.0),
            Self::Repeat => coord.rem_euclid(1.0),
            Self::MirrorRepeat => {
                let t = coord.rem_euclid(2.0);
                if t > 1.0 { 2.0 - t } else { t }
            }
        }
    }
}

/// CPU-side sampler configuration.
///
/// Describes how a texture is sampled: filtering and address modes for the
/// two texture axes. `mipmap_filter` is `None` when the texture carries no
/// mip chain, which is the only valid choice for non-power-of-two textures
/// on some GPUs.
#[derive(Debug, Clone, PartialEq)]
pub struct CpuSampler {
    /// Sampler name.
    pub name: Option<String>,
    /// Address mode for the U (horizontal) coordinate.
    pub address_mode_u: AddressMode,
    /// Address mode for the V (vertical) coordinate.
    pub address_mode_v: AddressMode,
    /// Magnification filter.
    pub mag_filter: FilterMode,
    /// Minification filter.
    pub min_filter: FilterMode,
    /// Mipmap filter, `None` if mipmapping is disabled.
    pub mipmap_filter: Option<FilterMode>,
}

impl CpuSampler {
    /// Create a linear filtering sampler with linear mip blending.
    pub fn linear() -> Self {
        Self {
            mag_filter: FilterMode::Linear,
            min_filter: FilterMode::Linear,
            mipmap_filter: Some(FilterMode::Linear),
            ..Default::default()
        }
    }

    /// Create a nearest neighbor filtering sampler.
    pub fn nearest() -> Self {
        Self::default()
    }

    /// Linear min/mag filtering with mipmapping disabled.
    ///
    /// Suitable for non-power-of-two textures.
    pub fn linear_no_mips() -> Self {
        Self {
            mag_filter: FilterMode::Linear,
            min_filter: FilterMode::Linear,
            mipmap_filter: None,
            ..Default::default()
        }
    }

    /// Set the sampler name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set address mode for both coordinates.
    #[must_use]
    pub fn with_address_mode(mut self, mode: AddressMode) -> Self {
        self.address_mode_u = mode;
        self.address_mode_v = mode;
        self
    }

    /// Set address modes per coordinate.
    #[must_use]
    pub fn with_address_modes(mut self, u: AddressMode, v: AddressMode) -> Self {
        self.address_mode_u = u;
        self.address_mode_v = v;
        self
    }

    /// Whether this sampler is valid for a non-power-of-two texture.
    pub fn is_npot_safe(&self) -> bool {
        self.mipmap_filter.is_none()
            && self.min_filter == FilterMode::Linear
            && self.mag_filter == FilterMode::Linear
    }
}

impl Default for CpuSampler {
    fn default() -> Self {
        Self {
            name: None,
            address_mode_u: AddressMode::ClampToEdge,
            address_mode_v: AddressMode::ClampToEdge,
            mag_filter: FilterMode::Nearest,
            min_filter: FilterMode::Nearest,
            mipmap_filter: Some(FilterMode::Nearest),
        }
    }
}
