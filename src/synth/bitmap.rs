//! Built-in 5x7 bitmap face.
//!
//! Last entry of every font provider list. It needs no font file, so text
//! rendering always has somewhere to land.

use super::font::{plot, InkBounds, TextFace};
use image::{Rgba, RgbaImage};

const GLYPH_W: i64 = 5;
const GLYPH_H: i64 = 7;
/// glyph width plus one column of spacing
const ADVANCE: i64 = 6;
/// glyph height plus one row of leading
const LINE: u32 = 8;

const TOFU: [u8; 7] = [
    0b11111, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b11111,
];

#[rustfmt::skip]
fn glyph(c: char) -> [u8; 7] {
    match c.to_ascii_uppercase() {
        ' ' => [0, 0, 0, 0, 0, 0, 0],
        'A' => [0b01110, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'B' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10001, 0b10001, 0b11110],
        'C' => [0b01110, 0b10001, 0b10000, 0b10000, 0b10000, 0b10001, 0b01110],
        'D' => [0b11100, 0b10010, 0b10001, 0b10001, 0b10001, 0b10010, 0b11100],
        'E' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b11111],
        'F' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b10000],
        'G' => [0b01110, 0b10001, 0b10000, 0b10111, 0b10001, 0b10001, 0b01111],
        'H' => [0b10001, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'I' => [0b01110, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        'J' => [0b00111, 0b00010, 0b00010, 0b00010, 0b00010, 0b10010, 0b01100],
        'K' => [0b10001, 0b10010, 0b10100, 0b11000, 0b10100, 0b10010, 0b10001],
        'L' => [0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b11111],
        'M' => [0b10001, 0b11011, 0b10101, 0b10101, 0b10001, 0b10001, 0b10001],
        'N' => [0b10001, 0b10001, 0b11001, 0b10101, 0b10011, 0b10001, 0b10001],
        'O' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'P' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10000, 0b10000, 0b10000],
        'Q' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10101, 0b10010, 0b01101],
        'R' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10100, 0b10010, 0b10001],
        'S' => [0b01111, 0b10000, 0b10000, 0b01110, 0b00001, 0b00001, 0b11110],
        'T' => [0b11111, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100],
        'U' => [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'V' => [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01010, 0b00100],
        'W' => [0b10001, 0b10001, 0b10001, 0b10101, 0b10101, 0b10101, 0b01010],
        'X' => [0b10001, 0b10001, 0b01010, 0b00100, 0b01010, 0b10001, 0b10001],
        'Y' => [0b10001, 0b10001, 0b01010, 0b00100, 0b00100, 0b00100, 0b00100],
        'Z' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b10000, 0b11111],
        '0' => [0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110],
        '1' => [0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        '2' => [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111],
        '3' => [0b11111, 0b00010, 0b00100, 0b00010, 0b00001, 0b10001, 0b01110],
        '4' => [0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010],
        '5' => [0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110],
        '6' => [0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110],
        '7' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000],
        '8' => [0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110],
        '9' => [0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100],
        '.' => [0, 0, 0, 0, 0, 0b01100, 0b01100],
        ',' => [0, 0, 0, 0, 0b01100, 0b00100, 0b01000],
        '-' => [0, 0, 0, 0b11111, 0, 0, 0],
        '_' => [0, 0, 0, 0, 0, 0, 0b11111],
        '+' => [0, 0b00100, 0b00100, 0b11111, 0b00100, 0b00100, 0],
        '=' => [0, 0, 0b11111, 0, 0b11111, 0, 0],
        '!' => [0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0, 0b00100],
        '?' => [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0, 0b00100],
        ':' => [0, 0b01100, 0b01100, 0, 0b01100, 0b01100, 0],
        '/' => [0b00001, 0b00001, 0b00010, 0b00100, 0b01000, 0b10000, 0b10000],
        '(' => [0b00010, 0b00100, 0b01000, 0b01000, 0b01000, 0b00100, 0b00010],
        ')' => [0b01000, 0b00100, 0b00010, 0b00010, 0b00010, 0b00100, 0b01000],
        '&' => [0b01100, 0b10010, 0b10100, 0b01000, 0b10101, 0b10010, 0b01101],
        '@' => [0b01110, 0b10001, 0b00001, 0b01101, 0b10101, 0b10101, 0b01110],
        '#' => [0b01010, 0b01010, 0b11111, 0b01010, 0b11111, 0b01010, 0b01010],
        '\'' => [0b00100, 0b00100, 0b01000, 0, 0, 0, 0],
        '"' => [0b01010, 0b01010, 0b01010, 0, 0, 0, 0],
        _ => TOFU,
    }
}

/// Bitmap glyphs magnified by an integer factor so one line is roughly
/// `px_size` pixels tall.
#[derive(Debug, Clone, Copy)]
pub struct BitmapFace {
    scale: u32,
}

impl BitmapFace {
    pub fn new(px_size: u32) -> Self {
        let scale = ((px_size as f32 / LINE as f32).round() as u32).max(1);
        Self { scale }
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }
}

impl TextFace for BitmapFace {
    fn measure(&self, text: &str) -> Option<InkBounds> {
        let mut widest = 0;
        let mut inked_lines = None;
        for (row, line) in text.split('\n').enumerate() {
            let n = line.chars().filter(|c| !c.is_control()).count() as i64;
            if n == 0 {
                continue;
            }
            widest = widest.max(n);
            let row = row as i64;
            inked_lines = Some(match inked_lines {
                Some((first, _)) => (first, row),
                None => (row, row),
            });
        }
        let (first, last) = inked_lines?;
        let s = self.scale as i64;
        let line = LINE as i64;
        Some(InkBounds {
            min_x: 0,
            min_y: first * line * s,
            max_x: (widest * ADVANCE - 1) * s,
            max_y: (last * line + GLYPH_H) * s,
        })
    }

    fn draw(&self, canvas: &mut RgbaImage, origin: (i64, i64), text: &str, fill: Rgba<u8>) {
        let s = self.scale as i64;
        for (row, line) in text.split('\n').enumerate() {
            let line_y = origin.1 + row as i64 * LINE as i64 * s;
            let chars = line.chars().filter(|c| !c.is_control());
            for (i, c) in chars.enumerate() {
                let rows = glyph(c);
                let cell_x = origin.0 + i as i64 * ADVANCE * s;
                for (r, bits) in rows.iter().enumerate() {
                    for col in 0..GLYPH_W {
                        if bits & (1 << (GLYPH_W - 1 - col)) == 0 {
                            continue;
                        }
                        let x0 = cell_x + col * s;
                        let y0 = line_y + r as i64 * s;
                        for dy in 0..s {
                            for dx in 0..s {
                                plot(canvas, x0 + dx, y0 + dy, 1.0, fill);
                            }
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_tracks_pixel_size() {
        assert_eq!(BitmapFace::new(1).scale(), 1);
        assert_eq!(BitmapFace::new(8).scale(), 1);
        assert_eq!(BitmapFace::new(150).scale(), 19);
    }

    #[test]
    fn test_measure() {
        let face = BitmapFace::new(16);
        let b = face.measure("AB").unwrap();
        assert_eq!((b.width(), b.height()), (22, 14));
        assert!(face.measure("").is_none());
    }

    #[test]
    fn test_draw_fills_glyph_pixels() {
        let face = BitmapFace::new(8);
        let mut canvas = RgbaImage::new(6, 7);
        face.draw(&mut canvas, (0, 0), "I", Rgba([10, 20, 30, 200]));
        // top bar of 'I' is columns 1..=3
        assert_eq!(canvas.get_pixel(0, 0)[3], 0);
        assert_eq!(*canvas.get_pixel(2, 0), Rgba([10, 20, 30, 200]));
        assert_eq!(*canvas.get_pixel(2, 3), Rgba([10, 20, 30, 200]));
    }

    #[test]
    fn test_newline_starts_a_new_line() {
        let face = BitmapFace::new(8);
        let b = face.measure("TOP\nSECRET").unwrap();
        // widest line is six glyphs; two lines one LINE apart
        assert_eq!((b.width(), b.height()), (35, 15));

        let mut canvas = RgbaImage::new(35, 15);
        face.draw(&mut canvas, (0, 0), "I\nI", Rgba([0, 0, 0, 255]));
        assert_eq!(canvas.get_pixel(2, 0)[3], 255);
        assert_eq!(canvas.get_pixel(2, 7)[3], 0);
        assert_eq!(canvas.get_pixel(2, 8)[3], 255);
    }

    #[test]
    fn test_leading_blank_line_is_not_ink() {
        let face = BitmapFace::new(8);
        let b = face.measure("\nAB").unwrap();
        assert_eq!((b.min_y, b.height()), (8, 7));
        assert!(face.measure("\n\n").is_none());
    }

    #[test]
    fn test_unknown_chars_render_as_box() {
        assert_eq!(glyph('€'), TOFU);
        assert_eq!(glyph('a'), glyph('A'));
    }
}
