use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What the watermark is made of
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum WatermarkKind {
    Text,
    Image,
}

impl WatermarkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WatermarkKind::Text => "text",
            WatermarkKind::Image => "image",
        }
    }
}

/// Where the watermark lands on each page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[value(rename_all = "PascalCase")]
pub enum Position {
    Center,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    /// three copies stacked down the vertical axis
    Tiled,
}

/// `--pages-range` selector; `Custom` reads `--custom-pages`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PagesRange {
    All,
    First,
    Last,
    Custom,
}

/// Resolved page selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageRangeSpec {
    All,
    First,
    Last,
    /// inclusive, 1-based; `end <= 0` means "through the last page"
    Explicit { start: i64, end: i64 },
    /// comma separated list such as `1-5,7,9-12`
    Custom(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    /// `#3498db`, used whenever the requested color cannot be parsed
    pub const DEFAULT: Color = Color::new(52, 152, 219);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#RRGGBB` or `#RGB`.
    pub fn parse_hex(hex: &str) -> Option<Color> {
        let hex = hex.trim().strip_prefix('#')?;
        if !hex.is_ascii() {
            return None;
        }
        let channel = |s: &str| u8::from_str_radix(s, 16).ok();
        match hex.len() {
            6 => Some(Color::new(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            )),
            // each digit doubled: 0xA -> 0xAA
            3 => Some(Color::new(
                channel(&hex[0..1])? * 17,
                channel(&hex[1..2])? * 17,
                channel(&hex[2..3])? * 17,
            )),
            _ => None,
        }
    }

    pub fn from_hex_or_default(hex: &str) -> Color {
        Self::parse_hex(hex).unwrap_or(Self::DEFAULT)
    }
}

/// Everything needed to synthesize and place one watermark.
#[derive(Debug, Clone, PartialEq)]
pub struct WatermarkSpec {
    pub kind: WatermarkKind,
    pub text: String,
    /// in points
    pub font_size: u32,
    pub color: Color,
    /// user font probed before the platform candidates
    pub font_path: Option<PathBuf>,
    pub image_path: Option<PathBuf>,
    pub image_scale_percent: u32,
    /// 1..=100
    pub opacity_percent: u8,
    /// clockwise, any integer
    pub rotation_degrees: i32,
    pub position: Position,
}

impl Default for WatermarkSpec {
    fn default() -> Self {
        Self {
            kind: WatermarkKind::Text,
            text: "CONFIDENTIAL".to_string(),
            font_size: 36,
            color: Color::DEFAULT,
            font_path: None,
            image_path: None,
            image_scale_percent: 50,
            opacity_percent: 60,
            rotation_degrees: 45,
            position: Position::Center,
        }
    }
}

/// Page box of one target page, in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageTarget {
    /// 1-based
    pub index: u32,
    pub width: f64,
    pub height: f64,
}

/// Placement in page space: origin at the top-left corner, y growing down.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl PlacementRect {
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}
