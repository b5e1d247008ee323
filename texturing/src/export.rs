//! PNG export of rendered mockups and of the flattened design.

use std::io::Cursor;
use std::path::Path;

use base64::Engine as _;
use base64::engine::general_purpose;
use image::{ImageFormat, RgbaImage};
use mugprint_core::scene::Scene;

use crate::compositor::CompositedTexture;
use crate::error::ExportError;

/// File name used for mockup downloads.
pub const DEFAULT_MOCKUP_FILE_NAME: &str = "mockup-caneca.png";

/// File name used for the flattened print design.
pub const DEFAULT_DESIGN_FILE_NAME: &str = "design-caneca.png";

/// Something that renders a scene and can read the result back.
pub trait RenderSurface {
    /// Render `scene` as the current frame.
    fn present(&mut self, scene: &Scene);

    /// Read back the last presented frame.
    fn capture_frame(&mut self) -> Result<RgbaImage, ExportError>;

    /// Whether the last frame stays readable after it was presented.
    fn preserves_drawing_buffer(&self) -> bool;
}

/// Capture the surface's current frame and write it as a PNG.
pub fn export_frame(
    surface: &mut dyn RenderSurface,
    path: impl AsRef<Path>,
) -> Result<(), ExportError> {
    let frame = capture(surface)?;
    write_png(&frame, path.as_ref())
}

/// The surface's current frame as a `data:image/png;base64,` URL.
pub fn frame_data_url(surface: &mut dyn RenderSurface) -> Result<String, ExportError> {
    let frame = capture(surface)?;
    let png = encode_png(&frame)?;
    Ok(format!(
        "data:image/png;base64,{}",
        general_purpose::STANDARD.encode(png)
    ))
}

fn capture(surface: &mut dyn RenderSurface) -> Result<RgbaImage, ExportError> {
    if !surface.preserves_drawing_buffer() {
        return Err(ExportError::BufferNotPreserved);
    }
    surface.capture_frame()
}

/// Write the flattened print-ready canvas as a PNG.
pub fn export_design(
    texture: &CompositedTexture,
    path: impl AsRef<Path>,
) -> Result<(), ExportError> {
    let tex = &texture.texture;
    let image = RgbaImage::from_raw(tex.width, tex.height, tex.data.clone()).ok_or_else(|| {
        ExportError::Capture(format!(
            "texture data does not match {}x{}",
            tex.width, tex.height
        ))
    })?;
    write_png(&image, path.as_ref())
}

/// Encode an image as PNG bytes.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, ExportError> {
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, ImageFormat::Png)?;
    Ok(out.into_inner())
}

fn write_png(image: &RgbaImage, path: &Path) -> Result<(), ExportError> {
    let bytes = encode_png(image)?;
    std::fs::write(path, bytes).map_err(|source| ExportError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    log::info!(
        "Exported {}x{} PNG to {}",
        image.width(),
        image.height(),
        path.display()
    );
    Ok(())
}
