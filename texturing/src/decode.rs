//! Image decoding for the image layer.

use base64::Engine as _;
use base64::engine::general_purpose;
use image::RgbaImage;

use crate::design::ImageSource;
use crate::error::DecodeError;

/// A decoded image in straight-alpha RGBA8.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedImage {
    pixels: RgbaImage,
}

impl DecodedImage {
    /// Wrap already decoded pixels. Fails on a zero-sized image.
    pub fn from_rgba(pixels: RgbaImage) -> Result<Self, DecodeError> {
        if pixels.width() == 0 || pixels.height() == 0 {
            return Err(DecodeError::Empty);
        }
        Ok(Self { pixels })
    }

    /// A single-color image, mostly useful for fixtures.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Result<Self, DecodeError> {
        Self::from_rgba(RgbaImage::from_pixel(width, height, image::Rgba(rgba)))
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Premultiplied bilinear sample at pixel-space `(x, y)`, edges clamped.
    ///
    /// Pixel centers sit at half-integer coordinates.
    pub(crate) fn sample_premultiplied(&self, x: f32, y: f32) -> [f32; 4] {
        let max_x = self.pixels.width() as i64 - 1;
        let max_y = self.pixels.height() as i64 - 1;
        let fx = x - 0.5;
        let fy = y - 0.5;
        let x0 = fx.floor();
        let y0 = fy.floor();
        let tx = fx - x0;
        let ty = fy - y0;

        let texel = |ix: i64, iy: i64| -> [f32; 4] {
            let px = self.pixels.get_pixel(
                ix.clamp(0, max_x) as u32,
                iy.clamp(0, max_y) as u32,
            );
            let a = px[3] as f32 / 255.0;
            [
                px[0] as f32 / 255.0 * a,
                px[1] as f32 / 255.0 * a,
                px[2] as f32 / 255.0 * a,
                a,
            ]
        };

        let (x0, y0) = (x0 as i64, y0 as i64);
        let c00 = texel(x0, y0);
        let c10 = texel(x0 + 1, y0);
        let c01 = texel(x0, y0 + 1);
        let c11 = texel(x0 + 1, y0 + 1);

        let mut out = [0.0; 4];
        for i in 0..4 {
            let top = c00[i] + (c10[i] - c00[i]) * tx;
            let bottom = c01[i] + (c11[i] - c01[i]) * tx;
            out[i] = top + (bottom - top) * ty;
        }
        out
    }
}

/// Decode any [`ImageSource`] to RGBA8.
pub fn decode_image(source: &ImageSource) -> Result<DecodedImage, DecodeError> {
    match source {
        ImageSource::DataUrl(url) => decode_bytes(&decode_data_url(url)?),
        ImageSource::Base64(payload) => {
            let payload = match payload.trim_start().strip_prefix("data:") {
                Some(_) => return decode_bytes(&decode_data_url(payload)?),
                None => payload,
            };
            decode_bytes(&decode_base64(payload)?)
        }
        ImageSource::File(path) => {
            let bytes = std::fs::read(path).map_err(|source| DecodeError::Io {
                path: path.clone(),
                source,
            })?;
            decode_bytes(&bytes)
        }
        ImageSource::Bytes(bytes) => decode_bytes(bytes),
    }
}

/// Decode encoded image bytes (PNG, JPEG, GIF, WebP, BMP).
pub fn decode_bytes(bytes: &[u8]) -> Result<DecodedImage, DecodeError> {
    let decoded = image::load_from_memory(bytes)?;
    log::debug!(
        "Decoded image {}x{} ({:?})",
        decoded.width(),
        decoded.height(),
        decoded.color()
    );
    DecodedImage::from_rgba(decoded.to_rgba8())
}

/// Extract the payload of a `data:<mime>;base64,<payload>` URL.
fn decode_data_url(url: &str) -> Result<Vec<u8>, DecodeError> {
    let malformed = || DecodeError::MalformedDataUrl(truncate(url, 48));
    let rest = url.trim().strip_prefix("data:").ok_or_else(malformed)?;
    let (header, payload) = rest.split_once(',').ok_or_else(malformed)?;
    if !header.ends_with(";base64") {
        return Err(malformed());
    }
    decode_base64(payload)
}

fn decode_base64(payload: &str) -> Result<Vec<u8>, DecodeError> {
    let cleaned: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    Ok(general_purpose::STANDARD.decode(cleaned)?)
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((i, _)) => format!("{}…", &s[..i]),
        None => s.to_string(),
    }
}
