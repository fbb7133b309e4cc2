use std::path::PathBuf;

/// Errors raised while watermarking a document.
#[derive(Debug, thiserror::Error)]
pub enum WatermarkError {
    #[error("Input file not found: {}", path.display())]
    InputNotFound { path: PathBuf },

    #[error("Image file not found: {}", path.display())]
    ImageNotFound { path: PathBuf },

    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// The document is structurally broken.
    #[error("Corrupt document: {message}")]
    Corrupt { message: String },

    /// Page-local failure; the remaining pages are still processed.
    #[error("Page {page}: {reason}")]
    Page { page: u32, reason: String },

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("Failed to decode watermark image: {0}")]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, WatermarkError>;

impl WatermarkError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: msg.into(),
        }
    }

    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::Corrupt {
            message: msg.into(),
        }
    }

    pub fn page(page: u32, reason: impl Into<String>) -> Self {
        Self::Page {
            page,
            reason: reason.into(),
        }
    }

    /// Whether this error must abort the whole request.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Page { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = WatermarkError::InputNotFound {
            path: PathBuf::from("missing.pdf"),
        };
        assert_eq!(err.to_string(), "Input file not found: missing.pdf");

        let err = WatermarkError::page(3, "page has no MediaBox");
        assert_eq!(err.to_string(), "Page 3: page has no MediaBox");

        let err = WatermarkError::invalid_argument("opacity must be between 1 and 100");
        assert_eq!(
            err.to_string(),
            "Invalid argument: opacity must be between 1 and 100"
        );
    }

    #[test]
    fn test_only_page_errors_are_recoverable() {
        assert!(!WatermarkError::page(1, "x").is_fatal());
        assert!(WatermarkError::invalid_argument("x").is_fatal());
        assert!(
            WatermarkError::ImageNotFound {
                path: PathBuf::from("logo.png")
            }
            .is_fatal()
        );
    }
}
