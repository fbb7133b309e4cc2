//! Watermark placement on a page.
//!
//! All rectangles are in page points with the origin at the top-left of the
//! page box. Nothing is clamped: a watermark larger than the page simply
//! overhangs its edges.

use crate::params::{PlacementRect, Position, WatermarkKind, WatermarkSpec};
use crate::synth::{PDF_DPI, SYNTHESIS_DPI};

/// Corner margin as a fraction of the page dimension.
const MARGIN: f64 = 0.05;

/// Size of the raster once placed on the page, in points.
pub fn raster_size_pt(width_px: u32, height_px: u32, kind: WatermarkKind, spec: &WatermarkSpec) -> (f64, f64) {
    let factor = match kind {
        WatermarkKind::Text => PDF_DPI / SYNTHESIS_DPI,
        WatermarkKind::Image => spec.image_scale_percent as f64 / 100.0,
    };
    (width_px as f64 * factor, height_px as f64 * factor)
}

/// One rectangle for the single positions, three for `Tiled`.
pub fn place(
    page_w: f64,
    page_h: f64,
    width_px: u32,
    height_px: u32,
    kind: WatermarkKind,
    spec: &WatermarkSpec,
) -> Vec<PlacementRect> {
    let (w, h) = raster_size_pt(width_px, height_px, kind, spec);
    match spec.position {
        Position::Tiled => tiled(page_w, page_h, w, h),
        position => vec![single(position, page_w, page_h, w, h)],
    }
}

fn single(position: Position, page_w: f64, page_h: f64, w: f64, h: f64) -> PlacementRect {
    let mx = page_w * MARGIN;
    let my = page_h * MARGIN;
    let (x, y) = match position {
        Position::TopLeft => (mx, my),
        Position::TopRight => (page_w - w - mx, my),
        Position::BottomLeft => (mx, page_h - h - my),
        Position::BottomRight => (page_w - w - mx, page_h - h - my),
        Position::Center | Position::Tiled => ((page_w - w) / 2.0, (page_h - h) / 2.0),
    };
    PlacementRect {
        x,
        y,
        width: w,
        height: h,
    }
}

/// Centre, then top, then bottom. The vertical centres sit at 1/2, 1/6 and
/// 5/6 of the page height, not at even thirds.
fn tiled(page_w: f64, page_h: f64, w: f64, h: f64) -> Vec<PlacementRect> {
    let cx = page_w / 2.0;
    let cy = page_h / 2.0;
    [cy, cy / 3.0, cy * 5.0 / 3.0]
        .into_iter()
        .map(|centre_y| PlacementRect {
            x: cx - w / 2.0,
            y: centre_y - h / 2.0,
            width: w,
            height: h,
        })
        .collect()
}
