//! CPU-side texture data.

use crate::sampler::{AddressMode, CpuSampler, FilterMode};

/// Texture pixel format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureFormat {
    /// 8-bit RGBA channels, unsigned normalized (linear).
    #[default]
    Rgba8Unorm,
    /// 8-bit RGBA channels, sRGB-encoded color.
    Rgba8UnormSrgb,
}

impl TextureFormat {
    /// Returns the size in bytes per pixel.
    pub fn block_size(&self) -> u32 {
        match self {
            Self::Rgba8Unorm | Self::Rgba8UnormSrgb => 4,
        }
    }

    /// Returns true if the format stores sRGB-encoded color.
    pub fn is_srgb(&self) -> bool {
        matches!(self, Self::Rgba8UnormSrgb)
    }
}

/// A 2D texture held in CPU memory.
///
/// Pixel rows are stored top to bottom without padding. The texture carries
/// no sampling state; pair it with a [`CpuSampler`].
#[derive(Clone, PartialEq)]
pub struct CpuTexture {
    /// Debug label.
    pub label: Option<String>,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel format.
    pub format: TextureFormat,
    /// Number of mip levels stored or to be generated (1 = base level only).
    pub mip_level_count: u32,
    /// Raw pixel bytes, `width * height * block_size` long.
    pub data: Vec<u8>,
}

impl CpuTexture {
    /// Create a texture from raw RGBA8 pixels.
    ///
    /// Returns `None` if `data` does not match the dimensions.
    pub fn from_rgba8(width: u32, height: u32, format: TextureFormat, data: Vec<u8>) -> Option<Self> {
        let expected = width as usize * height as usize * format.block_size() as usize;
        if data.len() != expected {
            return None;
        }
        Some(Self {
            label: None,
            width,
            height,
            format,
            mip_level_count: 1,
            data,
        })
    }

    /// Set a debug label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Whether both dimensions are powers of two.
    pub fn is_power_of_two(&self) -> bool {
        self.width.is_power_of_two() && self.height.is_power_of_two()
    }

    /// Read the pixel at integer coordinates.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        let p = self.data.get(i..i + 4)?;
        Some([p[0], p[1], p[2], p[3]])
    }

    /// Sample the texture at normalized coordinates using the sampler's
    /// address modes and magnification filter.
    ///
    /// `v = 0` is the first (top) row.
    pub fn sample(&self, u: f32, v: f32, sampler: &CpuSampler) -> [u8; 4] {
        if self.width == 0 || self.height == 0 {
            return [0, 0, 0, 0];
        }
        let u = sampler.address_mode_u.apply(u);
        let v = sampler.address_mode_v.apply(v);
        match sampler.mag_filter {
            FilterMode::Nearest => {
                let x = ((u * self.width as f32) as u32).min(self.width - 1);
                let y = ((v * self.height as f32) as u32).min(self.height - 1);
                self.pixel(x, y).unwrap_or([0, 0, 0, 0])
            }
            FilterMode::Linear => self.sample_linear(u, v, sampler),
        }
    }

    fn sample_linear(&self, u: f32, v: f32, sampler: &CpuSampler) -> [u8; 4] {
        let fx = u * self.width as f32 - 0.5;
        let fy = v * self.height as f32 - 0.5;
        let x0 = fx.floor();
        let y0 = fy.floor();
        let tx = fx - x0;
        let ty = fy - y0;

        let texel = |x: i64, y: i64| -> [f32; 4] {
            let x = wrap_index(x, self.width, sampler.address_mode_u);
            let y = wrap_index(y, self.height, sampler.address_mode_v);
            let p = self.pixel(x, y).unwrap_or([0, 0, 0, 0]);
            [p[0] as f32, p[1] as f32, p[2] as f32, p[3] as f32]
        };

        let (x0, y0) = (x0 as i64, y0 as i64);
        let c00 = texel(x0, y0);
        let c10 = texel(x0 + 1, y0);
        let c01 = texel(x0, y0 + 1);
        let c11 = texel(x0 + 1, y0 + 1);

        let mut out = [0u8; 4];
        for i in 0..4 {
            let top = c00[i] + (c10[i] - c00[i]) * tx;
            let bottom = c01[i] + (c11[i] - c01[i]) * tx;
            out[i] = (top + (bottom - top) * ty).round().clamp(0.0, 255.0) as u8;
        }
        out
    }
}

fn wrap_index(i: i64, size: u32, mode: AddressMode) -> u32 {
    let n = size as i64;
    let wrapped = match mode {
        AddressMode::ClampToEdge => i.clamp(0, n - 1),
        AddressMode::Repeat => i.rem_euclid(n),
        AddressMode::MirrorRepeat => {
            let t = i.rem_euclid(2 * n);
            if t >= n { 2 * n - 1 - t } else { t }
        }
    };
    wrapped as u32
}

impl std::fmt::Debug for CpuTexture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CpuTexture")
            .field("label", &self.label)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("mip_level_count", &self.mip_level_count)
            .field("bytes", &self.data.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_by_one() -> CpuTexture {
        CpuTexture::from_rgba8(
            2,
            1,
            TextureFormat::Rgba8UnormSrgb,
            vec![255, 0, 0, 255, 0, 0, 255, 255],
        )
        .unwrap()
    }

    #[test]
    fn rejects_mismatched_data() {
        assert!(CpuTexture::from_rgba8(4, 4, TextureFormat::Rgba8Unorm, vec![0; 10]).is_none());
    }

    #[test]
    fn npot_detection() {
        let tex = CpuTexture::from_rgba8(3, 2, TextureFormat::Rgba8Unorm, vec![0; 24]).unwrap();
        assert!(!tex.is_power_of_two());
        assert!(two_by_one().is_power_of_two());
    }

    #[test]
    fn nearest_sampling_picks_texel() {
        let tex = two_by_one();
        let s = CpuSampler::nearest();
        assert_eq!(tex.sample(0.25, 0.5, &s), [255, 0, 0, 255]);
        assert_eq!(tex.sample(0.75, 0.5, &s), [0, 0, 255, 255]);
    }

    #[test]
    fn repeat_sampling_wraps_across_seam() {
        let tex = two_by_one();
        let s = CpuSampler::linear_no_mips().with_address_mode(AddressMode::Repeat);
        // u = 0 sits halfway between the last and first texel.
        let p = tex.sample(0.0, 0.5, &s);
        assert!((p[0] as i32 - 128).abs() <= 1);
        assert!((p[2] as i32 - 128).abs() <= 1);
    }

    #[test]
    fn clamp_sampling_stays_on_edge() {
        let tex = two_by_one();
        let s = CpuSampler::linear_no_mips();
        assert_eq!(tex.sample(0.0, 0.5, &s), [255, 0, 0, 255]);
    }
}
