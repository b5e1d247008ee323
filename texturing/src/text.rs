//! Text rasterization for the text layer.
//!
//! - [`GlyphRasterizer`]: per-glyph coverage bitmaps for a font family
//! - [`FontLibrary`]: family names to fonts, through configured files and a
//!   `fontdb` database of system and directory fonts
//! - [`FontdueRasterizer`]: TrueType/OpenType rasterization via `fontdue`
//! - [`layout_line`]: lays out one line into a single [`CoverageMask`]

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use fontdb::{Database, Family, Query, Stretch, Style, Weight};
use fontdue::{Font, FontSettings};

use crate::config::FontConfig;
use crate::error::FontError;

/// Vertical metrics of a font at a pixel size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineMetrics {
    /// Distance from baseline to the top of the line box (positive).
    pub ascent: f32,
    /// Distance from baseline to the bottom of the line box (negative).
    pub descent: f32,
}

/// One rasterized glyph.
#[derive(Debug, Clone, PartialEq)]
pub struct GlyphBitmap {
    pub width: usize,
    pub height: usize,
    /// Row-major coverage, top row first.
    pub coverage: Vec<u8>,
    /// Left edge of the bitmap relative to the pen position.
    pub xmin: i32,
    /// Bottom edge of the bitmap relative to the baseline, positive up.
    pub ymin: i32,
    /// Horizontal pen advance.
    pub advance: f32,
}

/// Turns characters of a font family into coverage bitmaps.
pub trait GlyphRasterizer: Send {
    /// Line metrics for `family` at `px` pixels.
    fn line_metrics(&self, family: &str, px: f32) -> Result<LineMetrics, FontError>;

    /// Rasterize `ch` from `family` at `px` pixels.
    fn rasterize(&self, family: &str, ch: char, px: f32) -> Result<GlyphBitmap, FontError>;
}

/// A laid-out line of text as one coverage raster.
///
/// The raster may cover only part of the line when layout was clipped.
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageMask {
    pub width: usize,
    pub height: usize,
    pub coverage: Vec<u8>,
    /// X of the mask's left edge relative to the pen start (<= 0 when the
    /// first glyph overhangs to the left).
    pub left: f32,
    /// Y of the mask's top edge relative to the top of the line box.
    pub top: f32,
    /// Height of the full line box (`ascent - descent`, rounded up).
    pub line_height: f32,
    /// Total pen advance of the line.
    pub advance: f32,
}

impl CoverageMask {
    /// Bilinear coverage in `0.0..=1.0` at mask-space `(x, y)`; zero outside.
    pub fn sample(&self, x: f32, y: f32) -> f32 {
        let fx = x - 0.5;
        let fy = y - 0.5;
        let x0 = fx.floor();
        let y0 = fy.floor();
        let tx = fx - x0;
        let ty = fy - y0;
        let (x0, y0) = (x0 as i64, y0 as i64);

        let at = |ix: i64, iy: i64| -> f32 {
            if ix < 0 || iy < 0 || ix as usize >= self.width || iy as usize >= self.height {
                0.0
            } else {
                self.coverage[iy as usize * self.width + ix as usize] as f32 / 255.0
            }
        };

        let top = at(x0, y0) + (at(x0 + 1, y0) - at(x0, y0)) * tx;
        let bottom = at(x0, y0 + 1) + (at(x0 + 1, y0 + 1) - at(x0, y0 + 1)) * tx;
        top + (bottom - top) * ty
    }

    /// Local top-left for drawing centered on an anchor at the origin
    /// (horizontally on the advance, vertically on the line box).
    pub fn centered_origin(&self) -> [f32; 2] {
        [
            -self.advance * 0.5 + self.left,
            -self.line_height * 0.5 + self.top,
        ]
    }
}

/// Lay out `text` on a single line and merge its glyphs into one mask.
///
/// The line box is `ascent - descent` tall, so centering it vertically
/// matches a "middle" text baseline. With `clip` (`[min_x, min_y, max_x,
/// max_y]` relative to the center of the line) only that part of the line
/// is rasterized into the mask.
pub fn layout_line(
    rasterizer: &dyn GlyphRasterizer,
    family: &str,
    text: &str,
    px: f32,
    clip: Option<[f32; 4]>,
) -> Result<CoverageMask, FontError> {
    let metrics = rasterizer.line_metrics(family, px)?;
    let baseline = metrics.ascent;
    let line_height = (metrics.ascent - metrics.descent).ceil().max(1.0);

    let mut glyphs = Vec::new();
    let mut pen = 0.0f32;
    let mut left = 0.0f32;
    let mut right = 0.0f32;
    for ch in text.chars() {
        let glyph = rasterizer.rasterize(family, ch, px)?;
        let gx = pen.round() + glyph.xmin as f32;
        left = left.min(gx);
        right = right.max(gx + glyph.width as f32);
        pen += glyph.advance;
        glyphs.push((gx, glyph));
    }
    right = right.max(pen);

    let (mut x0, mut x1) = (left.floor(), right.ceil());
    let (mut y0, mut y1) = (0.0f32, line_height);
    if let Some([min_x, min_y, max_x, max_y]) = clip {
        let (cx, cy) = (pen * 0.5, line_height * 0.5);
        x0 = x0.max((min_x + cx).floor());
        x1 = x1.min((max_x + cx).ceil());
        y0 = y0.max((min_y + cy).floor());
        y1 = y1.min((max_y + cy).ceil());
    }
    let width = (x1 - x0).max(0.0) as usize;
    let height = (y1 - y0).max(0.0) as usize;
    let mut coverage = vec![0u8; width * height];

    for (gx, glyph) in &glyphs {
        let ox = (gx - x0) as i64;
        let oy = (baseline - glyph.ymin as f32 - glyph.height as f32).round() as i64 - y0 as i64;
        for row in 0..glyph.height {
            let ty = oy + row as i64;
            if ty < 0 || ty as usize >= height {
                continue;
            }
            for col in 0..glyph.width {
                let tx = ox + col as i64;
                if tx < 0 || tx as usize >= width {
                    continue;
                }
                let dst = &mut coverage[ty as usize * width + tx as usize];
                *dst = (*dst).max(glyph.coverage[row * glyph.width + col]);
            }
        }
    }

    Ok(CoverageMask {
        width,
        height,
        coverage,
        left: x0,
        top: y0,
        line_height,
        advance: pen,
    })
}

/// Resolves font families to loaded fonts.
///
/// Lookup order for a family: fonts registered by name, then a face of that
/// family in the font database, then the fallback font, then the database's
/// sans-serif face.
#[derive(Default, Clone)]
pub struct FontLibrary {
    fonts: HashMap<String, Arc<Font>>,
    fallback: Option<Arc<Font>>,
    database: Option<Arc<Database>>,
    /// Database lookups, misses included.
    resolved: Arc<Mutex<HashMap<String, Option<Arc<Font>>>>>,
}

impl FontLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the library the config describes. Unreadable files are logged
    /// and skipped.
    pub fn from_config(config: &FontConfig) -> Self {
        let mut library = Self::new();
        for entry in &config.families {
            if let Err(e) = library.load_file(&entry.family, &entry.path) {
                log::warn!("Skipping font '{}': {}", entry.family, e);
            }
        }
        if let Some(path) = &config.fallback {
            match read_font(path).and_then(|bytes| parse_font("fallback", &bytes)) {
                Ok(font) => library.fallback = Some(Arc::new(font)),
                Err(e) => log::warn!("Skipping fallback font: {}", e),
            }
        }

        if config.system_fonts || !config.dirs.is_empty() {
            let mut database = Database::new();
            if config.system_fonts {
                database.load_system_fonts();
            }
            for dir in &config.dirs {
                database.load_fonts_dir(dir);
            }
            if let Some(family) = &config.sans_serif_family {
                database.set_sans_serif_family(family.clone());
            }
            library.set_database(database);
        }

        log::debug!("Font library ready: {:?}", library);
        library
    }

    /// Register a font file under `family`.
    pub fn load_file(&mut self, family: &str, path: &Path) -> Result<(), FontError> {
        let bytes = read_font(path)?;
        self.load_bytes(family, &bytes)
    }

    /// Register font bytes under `family`.
    pub fn load_bytes(&mut self, family: &str, bytes: &[u8]) -> Result<(), FontError> {
        let font = parse_font(family, bytes)?;
        self.fonts.insert(family.to_lowercase(), Arc::new(font));
        Ok(())
    }

    /// Use `bytes` when a requested family is found nowhere else.
    pub fn set_fallback_bytes(&mut self, bytes: &[u8]) -> Result<(), FontError> {
        self.fallback = Some(Arc::new(parse_font("fallback", bytes)?));
        Ok(())
    }

    /// Look families up in `database` after the registered fonts.
    pub fn set_database(&mut self, database: Database) {
        self.database = Some(Arc::new(database));
        self.resolved
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Whether `family` was registered by name.
    pub fn contains(&self, family: &str) -> bool {
        self.fonts.contains_key(&family.to_lowercase())
    }

    /// The font used for `family`.
    pub fn resolve(&self, family: &str) -> Result<Arc<Font>, FontError> {
        let key = family.to_lowercase();
        self.fonts
            .get(&key)
            .cloned()
            .or_else(|| self.query(&format!("family:{key}"), Family::Name(family)))
            .or_else(|| self.fallback.clone())
            .or_else(|| self.query("generic:sans-serif", Family::SansSerif))
            .ok_or_else(|| FontError::Missing(family.to_string()))
    }

    fn query(&self, key: &str, family: Family<'_>) -> Option<Arc<Font>> {
        let database = self.database.as_ref()?;
        let mut resolved = self.resolved.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(hit) = resolved.get(key) {
            return hit.clone();
        }

        let query = Query {
            families: &[family],
            weight: Weight::NORMAL,
            stretch: Stretch::Normal,
            style: Style::Normal,
        };
        let font = database
            .query(&query)
            .and_then(|id| load_face(database, id, key));
        resolved.insert(key.to_string(), font.clone());
        font
    }
}

fn load_face(database: &Database, id: fontdb::ID, key: &str) -> Option<Arc<Font>> {
    let parsed = database.with_face_data(id, |data, index| {
        Font::from_bytes(
            data,
            FontSettings {
                collection_index: index,
                ..FontSettings::default()
            },
        )
    })?;
    let name = database
        .face(id)
        .and_then(|face| face.families.first())
        .map_or("?", |(name, _)| name.as_str());
    match parsed {
        Ok(font) => {
            log::debug!("Font {} resolved to '{}'", key, name);
            Some(Arc::new(font))
        }
        Err(e) => {
            log::warn!("Skipping font face '{}': {}", name, e);
            None
        }
    }
}

impl std::fmt::Debug for FontLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut families: Vec<_> = self.fonts.keys().collect();
        families.sort();
        f.debug_struct("FontLibrary")
            .field("families", &families)
            .field("has_fallback", &self.fallback.is_some())
            .field("database_faces", &self.database.as_ref().map_or(0, |db| db.len()))
            .finish()
    }
}

fn read_font(path: &Path) -> Result<Vec<u8>, FontError> {
    std::fs::read(path).map_err(|source| FontError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_font(family: &str, bytes: &[u8]) -> Result<Font, FontError> {
    Font::from_bytes(bytes, FontSettings::default()).map_err(|e| FontError::Parse {
        family: family.to_string(),
        reason: e.to_string(),
    })
}

/// [`GlyphRasterizer`] backed by a [`FontLibrary`].
#[derive(Debug, Clone, Default)]
pub struct FontdueRasterizer {
    library: FontLibrary,
}

impl FontdueRasterizer {
    pub fn new(library: FontLibrary) -> Self {
        Self { library }
    }

    pub fn library(&self) -> &FontLibrary {
        &self.library
    }
}

impl GlyphRasterizer for FontdueRasterizer {
    fn line_metrics(&self, family: &str, px: f32) -> Result<LineMetrics, FontError> {
        let font = self.library.resolve(family)?;
        Ok(match font.horizontal_line_metrics(px) {
            Some(m) => LineMetrics {
                ascent: m.ascent,
                descent: m.descent,
            },
            // Fonts without hhea metrics: approximate a Latin line box.
            None => LineMetrics {
                ascent: px * 0.8,
                descent: -px * 0.2,
            },
        })
    }

    fn rasterize(&self, family: &str, ch: char, px: f32) -> Result<GlyphBitmap, FontError> {
        let font = self.library.resolve(family)?;
        let (metrics, coverage) = font.rasterize(ch, px);
        Ok(GlyphBitmap {
            width: metrics.width,
            height: metrics.height,
            coverage,
            xmin: metrics.xmin,
            ymin: metrics.ymin,
            advance: metrics.advance_width,
        })
    }
}
