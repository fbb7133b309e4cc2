//! Result payload printed by the CLI.

use crate::compositor::{ApplyOutcome, PageFailure};
use crate::error::Result;
use crate::params::WatermarkKind;
use serde::Serialize;
use std::path::Path;

/// `{"success": true, ...}` or `{"success": false, "error": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watermarked_pages: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed_pages: Vec<PageFailure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Report {
    pub fn success(outcome: ApplyOutcome, output: &Path) -> Self {
        Self {
            success: true,
            page_count: Some(outcome.total_pages),
            watermarked_pages: Some(outcome.watermarked_pages),
            output: Some(output.display().to_string()),
            failed_pages: outcome.failed_pages,
            error: None,
        }
    }

    pub fn failure(error: impl ToString) -> Self {
        Self {
            success: false,
            page_count: None,
            watermarked_pages: None,
            output: None,
            failed_pages: Vec::new(),
            error: Some(error.to_string()),
        }
    }

    pub fn from_result(result: Result<ApplyOutcome>, output: &Path) -> Self {
        match result {
            Ok(outcome) => Self::success(outcome, output),
            Err(e) => Self::failure(e),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"success":false,"error":"failed to encode result: {e}"}}"#)
        })
    }

    /// One line for humans.
    pub fn summary_line(&self, kind: WatermarkKind) -> String {
        match &self.error {
            Some(err) => format!("Error: {err}"),
            None => format!(
                "Added {} watermark to {} pages",
                kind.as_str(),
                self.watermarked_pages.unwrap_or_default()
            ),
        }
    }
}
