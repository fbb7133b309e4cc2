//! Rotation with canvas expansion.

use image::{imageops, Rgba, RgbaImage};

/// Rotate clockwise by `degrees`, growing the canvas so the whole rotated
/// image fits. Exposed area is fully transparent. Right angles are exact
/// transposes; other angles are resampled bicubically.
pub fn rotate_expand(image: &RgbaImage, degrees: i32) -> RgbaImage {
    match degrees.rem_euclid(360) {
        0 => image.clone(),
        90 => imageops::rotate90(image),
        180 => imageops::rotate180(image),
        270 => imageops::rotate270(image),
        d => rotate_bicubic(image, d as f64),
    }
}

/// Snap trig values so angles like 30 degrees produce exact bounds.
fn snap(v: f64) -> f64 {
    (v * 1e15).round() / 1e15
}

/// Expanded canvas size for a clockwise rotation.
pub fn expanded_size(width: u32, height: u32, degrees: f64) -> (u32, u32) {
    let rad = degrees.to_radians();
    let (cos, sin) = (snap(rad.cos()).abs(), snap(rad.sin()).abs());
    let (w, h) = (width as f64, height as f64);
    let half_w = (w * cos + h * sin) / 2.0;
    let half_h = (w * sin + h * cos) / 2.0;
    let nw = (w / 2.0 + half_w).ceil() - (w / 2.0 - half_w).floor();
    let nh = (h / 2.0 + half_h).ceil() - (h / 2.0 - half_h).floor();
    ((nw as u32).max(1), (nh as u32).max(1))
}

fn rotate_bicubic(src: &RgbaImage, degrees: f64) -> RgbaImage {
    let (sw, sh) = (src.width() as f64, src.height() as f64);
    let (dw, dh) = expanded_size(src.width(), src.height(), degrees);
    let rad = degrees.to_radians();
    let (cos, sin) = (snap(rad.cos()), snap(rad.sin()));

    let mut dst = RgbaImage::new(dw, dh);
    let (dcx, dcy) = (dw as f64 / 2.0, dh as f64 / 2.0);
    let (scx, scy) = (sw / 2.0, sh / 2.0);

    for (ox, oy, px) in dst.enumerate_pixels_mut() {
        let rx = ox as f64 + 0.5 - dcx;
        let ry = oy as f64 + 0.5 - dcy;
        // inverse of the clockwise rotation (y axis points down)
        let sx = rx * cos + ry * sin + scx;
        let sy = -rx * sin + ry * cos + scy;
        if sx < 0.0 || sy < 0.0 || sx >= sw || sy >= sh {
            continue;
        }
        *px = sample_bicubic(src, sx - 0.5, sy - 0.5);
    }
    dst
}

/// Keys cubic kernel, a = -0.5.
fn cubic_weight(t: f64) -> f64 {
    const A: f64 = -0.5;
    let t = t.abs();
    if t <= 1.0 {
        ((A + 2.0) * t - (A + 3.0)) * t * t + 1.0
    } else if t < 2.0 {
        ((A * t - 5.0 * A) * t + 8.0 * A) * t - 4.0 * A
    } else {
        0.0
    }
}

/// Interpolate in premultiplied space so transparent neighbours do not
/// darken edges.
fn sample_bicubic(src: &RgbaImage, x: f64, y: f64) -> Rgba<u8> {
    let (x0, y0) = (x.floor() as i64, y.floor() as i64);
    let (fx, fy) = (x - x0 as f64, y - y0 as f64);
    let max_x = src.width() as i64 - 1;
    let max_y = src.height() as i64 - 1;

    let mut acc = [0.0f64; 4];
    for j in -1..=2i64 {
        let wy = cubic_weight(j as f64 - fy);
        let sy = (y0 + j).clamp(0, max_y) as u32;
        for i in -1..=2i64 {
            let wx = cubic_weight(i as f64 - fx);
            let sx = (x0 + i).clamp(0, max_x) as u32;
            let p = src.get_pixel(sx, sy);
            let a = p[3] as f64;
            let w = wx * wy;
            acc[0] += w * p[0] as f64 * a / 255.0;
            acc[1] += w * p[1] as f64 * a / 255.0;
            acc[2] += w * p[2] as f64 * a / 255.0;
            acc[3] += w * a;
        }
    }

    let alpha = acc[3].clamp(0.0, 255.0);
    if alpha < 0.5 {
        return Rgba([0, 0, 0, 0]);
    }
    let unpremultiply = |c: f64| (c * 255.0 / alpha).round().clamp(0.0, 255.0) as u8;
    Rgba([
        unpremultiply(acc[0]),
        unpremultiply(acc[1]),
        unpremultiply(acc[2]),
        alpha.round() as u8,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opaque(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba([200, 10, 10, 255]))
    }

    #[test]
    fn test_right_angles_swap_dimensions() {
        let img = opaque(100, 20);
        let r = rotate_expand(&img, 90);
        assert_eq!(r.dimensions(), (20, 100));
        let r = rotate_expand(&img, -90);
        assert_eq!(r.dimensions(), (20, 100));
        let r = rotate_expand(&img, 180);
        assert_eq!(r.dimensions(), (100, 20));
    }

    #[test]
    fn test_ninety_is_clockwise() {
        let mut img = RgbaImage::new(3, 1);
        img.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        let r = rotate_expand(&img, 90);
        // left end of a horizontal strip ends up on top
        assert_eq!(r.get_pixel(0, 0)[0], 255);
    }

    #[test]
    fn test_full_turn_is_identity() {
        let img = opaque(7, 3);
        assert_eq!(rotate_expand(&img, 360), img);
        assert_eq!(rotate_expand(&img, 0), img);
    }

    #[test]
    fn test_expanded_size() {
        assert_eq!(expanded_size(100, 20, 90.0), (20, 100));
        assert_eq!(expanded_size(100, 20, 45.0), (86, 86));
    }

    #[test]
    fn test_diagonal_rotation_has_transparent_corners() {
        let img = opaque(100, 20);
        let r = rotate_expand(&img, 45);
        assert_eq!(r.dimensions(), (86, 86));
        let (w, h) = r.dimensions();
        for (x, y) in [(0, 0), (w - 1, 0), (0, h - 1), (w - 1, h - 1)] {
            assert_eq!(r.get_pixel(x, y)[3], 0);
        }
        let centre = r.get_pixel(w / 2, h / 2);
        assert_eq!(*centre, Rgba([200, 10, 10, 255]));
    }

    #[test]
    fn test_cubic_weights_partition_unity() {
        for f in [0.0, 0.25, 0.5, 0.9] {
            let sum: f64 = (-1..=2).map(|i| cubic_weight(i as f64 - f)).sum();
            assert!((sum - 1.0).abs() < 1e-9);
        }
    }
}
