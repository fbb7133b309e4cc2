//! Watermark raster synthesis.
//!
//! Renders the watermark (text or image) once into an RGBA raster with
//! opacity and rotation already applied. Text is rendered at a fixed
//! 300 DPI so it stays crisp when scaled back into page points.

pub mod bitmap;
pub mod font;
pub mod rotate;

use crate::error::{Result, WatermarkError};
use crate::params::{WatermarkKind, WatermarkSpec};
use font::{default_providers, select_face, FontProvider};
use image::{Rgba, RgbaImage};
use tracing::debug;

pub const SYNTHESIS_DPI: f64 = 300.0;
/// points per inch
pub const PDF_DPI: f64 = 72.0;
/// per-side padding, as a fraction of the scaled font size
const TEXT_PADDING: f64 = 0.8;
/// Largest raster synthesis will allocate, before and after rotation.
pub const MAX_RASTER_PIXELS: u64 = 64 * 1024 * 1024;

/// The synthesized watermark. Built once per request and only ever read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRaster {
    image: RgbaImage,
    kind: WatermarkKind,
}

impl ResolvedRaster {
    pub fn new(image: RgbaImage, kind: WatermarkKind) -> Self {
        Self { image, kind }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn kind(&self) -> WatermarkKind {
        self.kind
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Row-major RGBA bytes.
    pub fn pixels(&self) -> &[u8] {
        self.image.as_raw()
    }
}

/// Renders watermark specs with a fixed list of font providers.
pub struct Synthesizer {
    providers: Vec<Box<dyn FontProvider>>,
}

impl Synthesizer {
    pub fn new(providers: Vec<Box<dyn FontProvider>>) -> Self {
        Self { providers }
    }

    /// Platform providers, preceded by the requested font file if one is set.
    pub fn for_spec(spec: &WatermarkSpec) -> Self {
        Self::new(default_providers(spec.font_path.as_deref()))
    }

    pub fn synthesize(&self, spec: &WatermarkSpec) -> Result<ResolvedRaster> {
        let image = match spec.kind {
            WatermarkKind::Text => self.render_text(spec)?,
            WatermarkKind::Image => load_image(spec)?,
        };
        let degrees = spec.rotation_degrees.rem_euclid(360) as f64;
        let (rw, rh) = rotate::expanded_size(image.width(), image.height(), degrees);
        checked_canvas(rw as i64, rh as i64)?;
        let image = rotate::rotate_expand(&image, spec.rotation_degrees);
        debug!(
            kind = spec.kind.as_str(),
            width = image.width(),
            height = image.height(),
            "watermark raster synthesized"
        );
        Ok(ResolvedRaster::new(image, spec.kind))
    }

    fn render_text(&self, spec: &WatermarkSpec) -> Result<RgbaImage> {
        let scaled_size = spec.font_size as f64 * SYNTHESIS_DPI / PDF_DPI;
        let face = select_face(&self.providers, scaled_size as u32);

        let padding = (scaled_size * TEXT_PADDING) as i64;
        let (ink_x, ink_y, ink_w, ink_h) = match face.measure(&spec.text) {
            Some(b) => (b.min_x, b.min_y, b.width(), b.height()),
            None => (0, 0, 0, 0),
        };
        let width = (ink_w + 2 * padding).max(1);
        let height = (ink_h + 2 * padding).max(1);
        let (canvas_w, canvas_h) = checked_canvas(width, height)?;

        let mut canvas = RgbaImage::new(canvas_w, canvas_h);
        let origin = ((width - ink_w) / 2 - ink_x, (height - ink_h) / 2 - ink_y);
        let c = spec.color;
        let fill = Rgba([c.r, c.g, c.b, opacity_alpha(spec.opacity_percent)]);
        face.draw(&mut canvas, origin, &spec.text, fill);
        Ok(canvas)
    }
}

/// Canvas dimensions as `u32`, rejecting rasters over [`MAX_RASTER_PIXELS`].
fn checked_canvas(width: i64, height: i64) -> Result<(u32, u32)> {
    let too_large = || {
        WatermarkError::invalid_argument(format!(
            "watermark raster of {width}x{height} pixels is too large"
        ))
    };
    let w = u32::try_from(width).map_err(|_| too_large())?;
    let h = u32::try_from(height).map_err(|_| too_large())?;
    if w as u64 * h as u64 > MAX_RASTER_PIXELS {
        return Err(too_large());
    }
    Ok((w, h))
}

/// Synthesize with the platform font providers.
pub fn synthesize(spec: &WatermarkSpec) -> Result<ResolvedRaster> {
    Synthesizer::for_spec(spec).synthesize(spec)
}

/// Fill alpha for text: `round(255 * opacity / 100)`.
pub fn opacity_alpha(opacity_percent: u8) -> u8 {
    (255.0 * opacity_percent.min(100) as f64 / 100.0).round() as u8
}

/// Scale every alpha byte by `opacity / 100`, rounding down.
pub fn apply_opacity(image: &mut RgbaImage, opacity_percent: u8) {
    if opacity_percent >= 100 {
        return;
    }
    for px in image.pixels_mut() {
        px[3] = (px[3] as u32 * opacity_percent as u32 / 100) as u8;
    }
}

fn load_image(spec: &WatermarkSpec) -> Result<RgbaImage> {
    let path = spec
        .image_path
        .as_deref()
        .ok_or_else(|| WatermarkError::invalid_argument("image watermark requires an image path"))?;
    if !path.exists() {
        return Err(WatermarkError::ImageNotFound {
            path: path.to_path_buf(),
        });
    }
    let mut image = image::open(path)?.to_rgba8();
    apply_opacity(&mut image, spec.opacity_percent);
    Ok(image)
}
