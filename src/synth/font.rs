//! Font providers for the text watermark.
//!
//! Providers are probed in order and the first one that yields a face wins.
//! The list always ends with the built-in bitmap face, so selection cannot
//! fail.

use super::bitmap::BitmapFace;
use ab_glyph::{point, Font, FontVec, Glyph, PxScale, ScaleFont};
use image::{Rgba, RgbaImage};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Ink bounding box in pixels, relative to the pen origin (top of the line).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InkBounds {
    pub min_x: i64,
    pub min_y: i64,
    pub max_x: i64,
    pub max_y: i64,
}

impl InkBounds {
    pub fn width(&self) -> i64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> i64 {
        self.max_y - self.min_y
    }

    fn union(self, other: InkBounds) -> InkBounds {
        InkBounds {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }
}

/// A font loaded at a fixed pixel size.
pub trait TextFace {
    /// `None` when nothing would be inked.
    fn measure(&self, text: &str) -> Option<InkBounds>;
    /// Draw with the pen origin at `origin` (canvas pixels).
    fn draw(&self, canvas: &mut RgbaImage, origin: (i64, i64), text: &str, fill: Rgba<u8>);
}

pub trait FontProvider {
    fn name(&self) -> String;
    fn load(&self, px_size: u32) -> Option<Box<dyn TextFace>>;
}

/// Write `fill` scaled by `coverage`, keeping the stronger alpha where
/// glyphs overlap. Out-of-canvas coordinates are ignored.
pub(crate) fn plot(canvas: &mut RgbaImage, x: i64, y: i64, coverage: f32, fill: Rgba<u8>) {
    if x < 0 || y < 0 || x >= canvas.width() as i64 || y >= canvas.height() as i64 {
        return;
    }
    let alpha = (coverage.clamp(0.0, 1.0) * fill[3] as f32).round() as u8;
    if alpha == 0 {
        return;
    }
    let px = canvas.get_pixel_mut(x as u32, y as u32);
    if alpha > px[3] {
        *px = Rgba([fill[0], fill[1], fill[2], alpha]);
    }
}

// ========== outline fonts ==========

/// TrueType/OpenType face rasterized with ab_glyph.
pub struct OutlineFace {
    font: FontVec,
    scale: PxScale,
}

impl OutlineFace {
    /// `px_size` is the em size in pixels.
    pub fn new(font: FontVec, px_size: u32) -> Self {
        // PxScale is ascent-to-descent height, not em size
        let height = font.height_unscaled();
        let upem = font.units_per_em().unwrap_or(height);
        let scale = PxScale::from(px_size as f32 * height / upem);
        Self { font, scale }
    }

    fn layout(&self, text: &str, origin: (f32, f32)) -> Vec<Glyph> {
        let scaled = self.font.as_scaled(self.scale);
        let line_advance = scaled.height() + scaled.line_gap();
        let mut baseline = origin.1 + scaled.ascent();
        let mut caret = origin.0;
        let mut prev = None;
        let mut glyphs = Vec::new();

        for c in text.chars() {
            if c == '\n' {
                caret = origin.0;
                baseline += line_advance;
                prev = None;
                continue;
            }
            if c.is_control() {
                continue;
            }
            let id = scaled.glyph_id(c);
            if let Some(p) = prev {
                caret += scaled.kern(p, id);
            }
            glyphs.push(id.with_scale_and_position(self.scale, point(caret, baseline)));
            caret += scaled.h_advance(id);
            prev = Some(id);
        }
        glyphs
    }
}

impl TextFace for OutlineFace {
    fn measure(&self, text: &str) -> Option<InkBounds> {
        let mut bounds: Option<InkBounds> = None;
        for glyph in self.layout(text, (0.0, 0.0)) {
            let Some(outlined) = self.font.outline_glyph(glyph) else {
                continue;
            };
            let b = outlined.px_bounds();
            let ink = InkBounds {
                min_x: b.min.x.floor() as i64,
                min_y: b.min.y.floor() as i64,
                max_x: b.max.x.ceil() as i64,
                max_y: b.max.y.ceil() as i64,
            };
            bounds = Some(match bounds {
                Some(acc) => acc.union(ink),
                None => ink,
            });
        }
        bounds
    }

    fn draw(&self, canvas: &mut RgbaImage, origin: (i64, i64), text: &str, fill: Rgba<u8>) {
        for glyph in self.layout(text, (origin.0 as f32, origin.1 as f32)) {
            let Some(outlined) = self.font.outline_glyph(glyph) else {
                continue;
            };
            let b = outlined.px_bounds();
            let (left, top) = (b.min.x as i64, b.min.y as i64);
            outlined.draw(|px, py, coverage| {
                plot(canvas, left + px as i64, top + py as i64, coverage, fill);
            });
        }
    }
}

// ========== providers ==========

/// A single font file on disk (collections use their first face).
pub struct FontFile {
    path: PathBuf,
}

impl FontFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl FontProvider for FontFile {
    fn name(&self) -> String {
        self.path.display().to_string()
    }

    fn load(&self, px_size: u32) -> Option<Box<dyn TextFace>> {
        load_outline(&self.path, px_size)
    }
}

/// First loadable font among the files matching a glob pattern, in sorted
/// path order.
pub struct FontDirScan {
    pattern: String,
}

impl FontDirScan {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
        }
    }
}

impl FontProvider for FontDirScan {
    fn name(&self) -> String {
        format!("scan:{}", self.pattern)
    }

    fn load(&self, px_size: u32) -> Option<Box<dyn TextFace>> {
        let mut paths: Vec<PathBuf> = glob::glob(&self.pattern)
            .ok()?
            .filter_map(|e| e.ok())
            .collect();
        paths.sort();
        paths.iter().find_map(|p| load_outline(p, px_size))
    }
}

/// The bitmap face; always loads.
pub struct BuiltinFont;

impl FontProvider for BuiltinFont {
    fn name(&self) -> String {
        "builtin".to_string()
    }

    fn load(&self, px_size: u32) -> Option<Box<dyn TextFace>> {
        Some(Box::new(BitmapFace::new(px_size)))
    }
}

fn load_outline(path: &Path, px_size: u32) -> Option<Box<dyn TextFace>> {
    let data = std::fs::read(path).ok()?;
    let font = FontVec::try_from_vec_and_index(data, 0).ok()?;
    Some(Box::new(OutlineFace::new(font, px_size)))
}

fn platform_font_paths() -> &'static [&'static str] {
    const WINDOWS: &[&str] = &[
        "C:/Windows/Fonts/arial.ttf",
        "C:/Windows/Fonts/tahoma.ttf",
        "C:/Windows/Fonts/verdana.ttf",
    ];
    const MACOS: &[&str] = &[
        "/Library/Fonts/Arial.ttf",
        "/Library/Fonts/Verdana.ttf",
        "/System/Library/Fonts/Helvetica.ttc",
        "/System/Library/Fonts/Arial.ttf",
    ];
    const LINUX: &[&str] = &[
        "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/truetype/ubuntu/Ubuntu-R.ttf",
        "/usr/share/fonts/truetype/freefont/FreeSans.ttf",
    ];

    if cfg!(target_os = "windows") {
        WINDOWS
    } else if cfg!(target_os = "macos") {
        MACOS
    } else {
        LINUX
    }
}

fn platform_font_scan() -> Option<&'static str> {
    if cfg!(target_os = "windows") || cfg!(target_os = "macos") {
        None
    } else {
        Some("/usr/share/fonts/**/*.ttf")
    }
}

/// Provider list for this platform: user font, well-known system fonts,
/// a font directory scan, then the built-in face.
pub fn default_providers(user_font: Option<&Path>) -> Vec<Box<dyn FontProvider>> {
    let mut providers: Vec<Box<dyn FontProvider>> = Vec::new();
    if let Some(path) = user_font {
        providers.push(Box::new(FontFile::new(path)));
    }
    for path in platform_font_paths() {
        providers.push(Box::new(FontFile::new(*path)));
    }
    if let Some(pattern) = platform_font_scan() {
        providers.push(Box::new(FontDirScan::new(pattern)));
    }
    providers.push(Box::new(BuiltinFont));
    providers
}

/// Probe `providers` in order; falls back to the built-in face.
pub fn select_face(providers: &[Box<dyn FontProvider>], px_size: u32) -> Box<dyn TextFace> {
    for provider in providers {
        if let Some(face) = provider.load(px_size) {
            debug!(provider = %provider.name(), px_size, "font selected");
            return face;
        }
        debug!(provider = %provider.name(), "font unavailable");
    }
    debug!(px_size, "no font provider loaded, using built-in face");
    Box::new(BitmapFace::new(px_size))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_font_file_does_not_load() {
        let provider = FontFile::new("/nonexistent/dir/NoSuchFont.ttf");
        assert!(provider.load(100).is_none());
    }

    #[test]
    fn test_garbage_font_file_does_not_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.ttf");
        std::fs::write(&path, b"definitely not a font").unwrap();
        assert!(FontFile::new(&path).load(100).is_none());
    }

    #[test]
    fn test_scan_without_matches_does_not_load() {
        let dir = tempfile::tempdir().unwrap();
        let pattern = format!("{}/**/*.ttf", dir.path().display());
        assert!(FontDirScan::new(pattern).load(100).is_none());
    }

    #[test]
    fn test_select_face_falls_back_to_builtin() {
        let providers: Vec<Box<dyn FontProvider>> =
            vec![Box::new(FontFile::new("/nonexistent/a.ttf"))];
        let face = select_face(&providers, 16);
        let expected = BitmapFace::new(16).measure("HI");
        assert_eq!(face.measure("HI"), expected);
    }

    #[test]
    fn test_default_providers_end_with_builtin() {
        let providers = default_providers(Some(Path::new("/tmp/custom.ttf")));
        assert_eq!(providers.first().unwrap().name(), "/tmp/custom.ttf");
        assert_eq!(providers.last().unwrap().name(), "builtin");
    }

    #[test]
    fn test_outline_newline_stacks_lines() {
        // needs a system font; the builtin face has its own coverage
        let Some(face) = platform_font_scan().and_then(|p| FontDirScan::new(p).load(100)) else {
            return;
        };
        let one = face.measure("AB").unwrap();
        let two = face.measure("AB\nAB").unwrap();
        assert_eq!(two.width(), one.width());
        assert!(two.height() >= 2 * one.height());
    }

    #[test]
    fn test_plot_keeps_stronger_alpha() {
        let mut canvas = RgbaImage::new(2, 2);
        let fill = Rgba([1, 2, 3, 200]);
        plot(&mut canvas, 0, 0, 1.0, fill);
        plot(&mut canvas, 0, 0, 0.25, fill);
        assert_eq!(canvas.get_pixel(0, 0)[3], 200);
        plot(&mut canvas, 1, 1, 0.5, fill);
        assert_eq!(canvas.get_pixel(1, 1)[3], 100);
        plot(&mut canvas, -1, 5, 1.0, fill);
    }
}
