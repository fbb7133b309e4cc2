//! Target page selection.
//!
//! Turns a [`PageRangeSpec`] into the sorted, de-duplicated list of 1-based
//! page numbers to watermark. Resolution never fails: malformed tokens in a
//! custom expression are skipped and an empty selection is a valid result.

use crate::params::PageRangeSpec;
use std::collections::BTreeSet;
use tracing::debug;

/// Resolve `spec` against a document of `total_pages` pages.
pub fn resolve(total_pages: u32, spec: &PageRangeSpec) -> Vec<u32> {
    if total_pages == 0 {
        return Vec::new();
    }

    match spec {
        PageRangeSpec::All => (1..=total_pages).collect(),
        PageRangeSpec::First => vec![1],
        PageRangeSpec::Last => vec![total_pages],
        PageRangeSpec::Explicit { start, end } => explicit_range(total_pages, *start, *end),
        PageRangeSpec::Custom(expr) => parse_custom(expr, total_pages),
    }
}

fn explicit_range(total_pages: u32, start: i64, end: i64) -> Vec<u32> {
    let total = total_pages as i64;
    let start = start.max(1);
    let end = if end > 0 { end.min(total) } else { total };
    (start..=end).map(|p| p as u32).collect()
}

/// Parse `1-5,7,9-12` style lists. Out-of-range numbers are dropped.
pub fn parse_custom(expr: &str, total_pages: u32) -> Vec<u32> {
    let total = total_pages as i64;
    let mut pages = BTreeSet::new();

    for token in expr.split(',') {
        let token = token.trim();
        let Some((lo, hi)) = parse_token(token) else {
            debug!(token, "skipping malformed page token");
            continue;
        };
        // clamp first so `1-999999999` does not iterate past the document
        let lo = lo.max(1);
        let hi = hi.min(total);
        for p in lo..=hi {
            pages.insert(p as u32);
        }
    }

    pages.into_iter().collect()
}

fn parse_token(token: &str) -> Option<(i64, i64)> {
    if token.contains('-') {
        let mut parts = token.split('-');
        let (a, b) = (parts.next()?, parts.next()?);
        if parts.next().is_some() {
            return None;
        }
        Some((a.trim().parse().ok()?, b.trim().parse().ok()?))
    } else {
        let p = token.parse().ok()?;
        Some((p, p))
    }
}
