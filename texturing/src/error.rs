//! Error types for the texturing pipeline.
//!
//! Compositing never fails as a whole: [`DecodeError`] and [`FontError`]
//! only drop the layer they belong to. [`ExportError`] and [`DesignError`]
//! are returned to the caller.

use std::path::PathBuf;

/// Failure to turn an [`ImageSource`](crate::design::ImageSource) into pixels.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The data URL has no `data:` prefix or no `;base64,` marker.
    #[error("malformed data URL: {0}")]
    MalformedDataUrl(String),

    /// The base64 payload could not be decoded.
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The source file could not be read.
    #[error("failed to read image {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The bytes are not a supported image format.
    #[error("unsupported or corrupt image: {0}")]
    Image(#[from] image::ImageError),

    /// The image decoded to zero pixels.
    #[error("image has zero width or height")]
    Empty,
}

/// Failure to load or resolve a font.
#[derive(Debug, thiserror::Error)]
pub enum FontError {
    /// No font is registered for the family and there is no fallback.
    #[error("no font registered for family '{0}' and no fallback font loaded")]
    Missing(String),

    /// The font file could not be read.
    #[error("failed to read font {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The font bytes could not be parsed.
    #[error("failed to parse font '{family}': {reason}")]
    Parse { family: String, reason: String },
}

/// Failure to capture or write an exported PNG.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// Captures need a surface that keeps its last presented frame.
    #[error(
        "render surface does not preserve its drawing buffer; \
         create it with preserve_drawing_buffer enabled before exporting"
    )]
    BufferNotPreserved,

    /// `capture_frame` was called before anything was presented.
    #[error("nothing has been presented to the render surface")]
    NothingPresented,

    /// The surface failed to read back its frame.
    #[error("frame capture failed: {0}")]
    Capture(String),

    /// PNG encoding failed.
    #[error("failed to encode PNG: {0}")]
    Encode(#[from] image::ImageError),

    /// Writing the PNG to disk failed.
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure to read a design or configuration file.
#[derive(Debug, thiserror::Error)]
pub enum DesignError {
    /// The file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The RON document is malformed.
    #[error("invalid RON: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// A color string is not `#rgb` or `#rrggbb`.
    #[error("invalid color '{0}', expected #rgb or #rrggbb")]
    Color(String),
}
