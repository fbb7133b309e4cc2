//! Request orchestration.
//!
//! Pages are resolved once and the raster is synthesized once; every target
//! page then gets one or three placements of that same raster. All changes
//! are staged in the in-memory document and written by a single save.

use crate::error::{Result, WatermarkError};
use crate::layout;
use crate::page_range;
use crate::params::{PageRangeSpec, PageTarget, PlacementRect, WatermarkKind, WatermarkSpec};
use crate::process_pages::LopdfDocument;
use crate::synth::{ResolvedRaster, Synthesizer};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info, warn};

/// The paginated document the watermark is stamped into.
pub trait PageDocument {
    /// Handle to a raster that has been added to the document once.
    type Raster: Copy;

    fn page_count(&self) -> u32;
    fn page_target(&self, page: u32) -> Result<PageTarget>;
    fn embed_raster(&mut self, raster: &ResolvedRaster) -> Result<Self::Raster>;
    /// Alpha-composite the raster over the page at `rect`.
    fn insert_raster(&mut self, page: u32, raster: Self::Raster, rect: &PlacementRect) -> Result<()>;
    fn save(&mut self, path: &Path) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageFailure {
    pub page: u32,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ApplyOutcome {
    pub total_pages: u32,
    pub watermarked_pages: u32,
    pub insertions: usize,
    pub failed_pages: Vec<PageFailure>,
}

pub struct PageCompositor {
    synthesizer: Synthesizer,
}

impl PageCompositor {
    pub fn new(synthesizer: Synthesizer) -> Self {
        Self { synthesizer }
    }

    pub fn for_spec(spec: &WatermarkSpec) -> Self {
        Self::new(Synthesizer::for_spec(spec))
    }

    /// Stage the watermark on every selected page of `doc`. Nothing is
    /// written; the caller saves once afterwards.
    pub fn apply<D: PageDocument>(
        &self,
        doc: &mut D,
        range: &PageRangeSpec,
        spec: &WatermarkSpec,
    ) -> Result<ApplyOutcome> {
        let total_pages = doc.page_count();
        let targets = page_range::resolve(total_pages, range);
        debug!(total_pages, targets = ?targets, "pages resolved");

        let mut outcome = ApplyOutcome {
            total_pages,
            ..ApplyOutcome::default()
        };
        if targets.is_empty() {
            return Ok(outcome);
        }

        let raster = self.synthesizer.synthesize(spec)?;
        let handle = doc.embed_raster(&raster)?;

        for page in targets {
            if page < 1 || page > total_pages {
                warn!(page, total_pages, "skipping page outside the document");
                continue;
            }
            match stamp_page(doc, page, &raster, handle, spec) {
                Ok(count) => {
                    outcome.watermarked_pages += 1;
                    outcome.insertions += count;
                }
                Err(e) if !e.is_fatal() => {
                    warn!(page, error = %e, "page not watermarked");
                    outcome.failed_pages.push(PageFailure {
                        page,
                        reason: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }
        Ok(outcome)
    }
}

fn stamp_page<D: PageDocument>(
    doc: &mut D,
    page: u32,
    raster: &ResolvedRaster,
    handle: D::Raster,
    spec: &WatermarkSpec,
) -> Result<usize> {
    let target = doc.page_target(page)?;
    let rects = layout::place(
        target.width,
        target.height,
        raster.width(),
        raster.height(),
        raster.kind(),
        spec,
    );
    for rect in &rects {
        debug!(page, x = rect.x, y = rect.y, w = rect.width, h = rect.height, "placing watermark");
        doc.insert_raster(page, handle, rect)?;
    }
    Ok(rects.len())
}

/// Open `input`, watermark it and write the result to `output`.
pub fn watermark_pdf(
    input: &Path,
    output: &Path,
    range: &PageRangeSpec,
    spec: &WatermarkSpec,
) -> Result<ApplyOutcome> {
    if spec.kind == WatermarkKind::Image {
        match spec.image_path.as_deref() {
            Some(path) if path.exists() => {}
            Some(path) => {
                return Err(WatermarkError::ImageNotFound {
                    path: path.to_path_buf(),
                });
            }
            None => return Err(WatermarkError::invalid_argument("image watermark requires an image path")),
        }
    }
    let mut doc = LopdfDocument::open(input)?;
    info!(input = %input.display(), kind = spec.kind.as_str(), "adding watermark");

    let outcome = PageCompositor::for_spec(spec).apply(&mut doc, range, spec)?;
    doc.save(output)?;

    info!(
        output = %output.display(),
        pages = outcome.watermarked_pages,
        insertions = outcome.insertions,
        "watermark saved"
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::Position;
    use crate::synth::font::BuiltinFont;
    use std::collections::HashMap;

    /// In-memory document recording every insertion.
    #[derive(Default)]
    struct Recorder {
        sizes: Vec<Option<(f64, f64)>>,
        embedded: usize,
        inserted: Vec<(u32, PlacementRect)>,
        fail_insert_fatally: bool,
    }

    impl Recorder {
        fn letter(pages: usize) -> Self {
            Self {
                sizes: vec![Some((612.0, 792.0)); pages],
                ..Self::default()
            }
        }

        fn per_page(&self) -> HashMap<u32, usize> {
            let mut m = HashMap::new();
            for (p, _) in &self.inserted {
                *m.entry(*p).or_default() += 1;
            }
            m
        }
    }

    impl PageDocument for Recorder {
        type Raster = ();

        fn page_count(&self) -> u32 {
            self.sizes.len() as u32
        }

        fn page_target(&self, page: u32) -> Result<PageTarget> {
            match self.sizes.get(page as usize - 1).copied().flatten() {
                Some((width, height)) => Ok(PageTarget {
                    index: page,
                    width,
                    height,
                }),
                None => Err(WatermarkError::page(page, "page has no MediaBox")),
            }
        }

        fn embed_raster(&mut self, _raster: &ResolvedRaster) -> Result<()> {
            self.embedded += 1;
            Ok(())
        }

        fn insert_raster(&mut self, page: u32, _raster: (), rect: &PlacementRect) -> Result<()> {
            if self.fail_insert_fatally {
                return Err(WatermarkError::corrupt("broken xref"));
            }
            self.inserted.push((page, *rect));
            Ok(())
        }

        fn save(&mut self, _path: &Path) -> Result<()> {
            Ok(())
        }
    }

    fn compositor() -> PageCompositor {
        PageCompositor::new(Synthesizer::new(vec![Box::new(BuiltinFont)]))
    }

    #[test]
    fn test_tiled_text_on_three_pages() {
        let spec = WatermarkSpec {
            text: "CONFIDENTIAL".to_string(),
            position: Position::Tiled,
            rotation_degrees: 45,
            opacity_percent: 60,
            ..WatermarkSpec::default()
        };
        let mut doc = Recorder::letter(3);
        let outcome = compositor()
            .apply(&mut doc, &PageRangeSpec::All, &spec)
            .unwrap();

        assert_eq!(outcome.total_pages, 3);
        assert_eq!(outcome.watermarked_pages, 3);
        assert_eq!(outcome.insertions, 9);
        assert_eq!(doc.embedded, 1);
        assert_eq!(doc.inserted.len(), 9);
        assert!(doc.per_page().values().all(|n| *n == 3));
    }

    #[test]
    fn test_invalid_custom_range_is_a_no_op() {
        let mut doc = Recorder::letter(4);
        let range = PageRangeSpec::Custom("abc,x-y,99".to_string());
        let outcome = compositor()
            .apply(&mut doc, &range, &WatermarkSpec::default())
            .unwrap();
        assert_eq!(outcome.total_pages, 4);
        assert_eq!(outcome.watermarked_pages, 0);
        assert_eq!(doc.embedded, 0);
        assert!(doc.inserted.is_empty());
    }

    #[test]
    fn test_single_position_inserts_once_per_page() {
        let spec = WatermarkSpec {
            position: Position::BottomRight,
            ..WatermarkSpec::default()
        };
        let mut doc = Recorder::letter(5);
        let range = PageRangeSpec::Custom("2,4".to_string());
        let outcome = compositor().apply(&mut doc, &range, &spec).unwrap();
        assert_eq!(outcome.watermarked_pages, 2);
        let pages: Vec<u32> = doc.inserted.iter().map(|(p, _)| *p).collect();
        assert_eq!(pages, vec![2, 4]);
    }

    #[test]
    fn test_page_failure_does_not_stop_other_pages() {
        let mut doc = Recorder::letter(3);
        doc.sizes[1] = None;
        let outcome = compositor()
            .apply(&mut doc, &PageRangeSpec::All, &WatermarkSpec::default())
            .unwrap();
        assert_eq!(outcome.watermarked_pages, 2);
        assert_eq!(outcome.failed_pages.len(), 1);
        assert_eq!(outcome.failed_pages[0].page, 2);
    }

    #[test]
    fn test_fatal_insert_error_aborts() {
        let mut doc = Recorder::letter(2);
        doc.fail_insert_fatally = true;
        let err = compositor()
            .apply(&mut doc, &PageRangeSpec::All, &WatermarkSpec::default())
            .unwrap_err();
        assert!(matches!(err, WatermarkError::Corrupt { .. }));
    }

    #[test]
    fn test_placements_use_raster_size() {
        let spec = WatermarkSpec {
            position: Position::Center,
            rotation_degrees: 0,
            ..WatermarkSpec::default()
        };
        let raster = compositor().synthesizer.synthesize(&spec).unwrap();
        let mut doc = Recorder::letter(1);
        compositor()
            .apply(&mut doc, &PageRangeSpec::First, &spec)
            .unwrap();
        let rect = doc.inserted[0].1;
        assert!((rect.width - raster.width() as f64 * 72.0 / 300.0).abs() < 1e-9);
        let (cx, cy) = rect.center();
        assert!((cx - 306.0).abs() < 1e-9 && (cy - 396.0).abs() < 1e-9);
        assert_eq!(raster.kind(), WatermarkKind::Text);
    }
}
