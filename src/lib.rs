//! Stamp a text or image watermark onto selected pages of a PDF.
//!
//! The watermark is rendered once into an RGBA raster at 300 DPI, embedded
//! once into the document as an image with a soft mask, and then placed on
//! every selected page (once, or three times for the tiled layout).

pub mod compositor;
pub mod error;
pub mod layout;
pub mod page_range;
pub mod params;
pub mod process_pages;
pub mod report;
pub mod synth;

pub use compositor::{watermark_pdf, ApplyOutcome, PageCompositor, PageDocument, PageFailure};
pub use error::{Result, WatermarkError};
pub use params::{Color, PageRangeSpec, PagesRange, PageTarget, PlacementRect, Position, WatermarkKind, WatermarkSpec};
pub use process_pages::LopdfDocument;
pub use report::Report;
pub use synth::{synthesize, ResolvedRaster, Synthesizer};
