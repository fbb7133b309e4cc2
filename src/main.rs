use clap::Parser;
use pdf_watermark::{
    watermark_pdf, Color, PageRangeSpec, PagesRange, Position, Report, Result, WatermarkError,
    WatermarkKind, WatermarkSpec,
};
use std::path::PathBuf;
use std::process::ExitCode;

/// Add a text or image watermark to PDF pages
#[derive(Parser, Debug)]
#[command(name = "pdf_watermark", about = "Add watermark to PDF pages")]
struct Args {
    /// Path to input PDF file
    input: PathBuf,
    /// Path to output PDF file
    output: PathBuf,

    /// Watermark type
    #[arg(long, value_enum, default_value_t = WatermarkKind::Text)]
    watermark_type: WatermarkKind,

    /// Watermark text; each `\n` starts a new line
    #[arg(long, default_value = "CONFIDENTIAL")]
    text: String,
    /// Font size in points
    #[arg(long, default_value_t = 36)]
    font_size: u32,
    /// Text color in hex (#RRGGBB or #RGB); unparseable values fall back to blue
    #[arg(long, default_value = "#3498db")]
    text_color: String,
    /// Font file tried before the system fonts
    #[arg(long)]
    font_path: Option<PathBuf>,

    /// Path to image file for image watermark
    #[arg(long)]
    image_path: Option<PathBuf>,
    /// Image scale percentage (10-100)
    #[arg(long, default_value_t = 50)]
    image_scale: u32,

    /// Watermark position
    #[arg(long, value_enum, default_value_t = Position::Center)]
    position: Position,
    /// Rotation angle in degrees (clockwise)
    #[arg(long, default_value_t = 45, allow_negative_numbers = true)]
    rotation: i32,
    /// Opacity percentage (1-100)
    #[arg(long, default_value_t = 60)]
    opacity: u32,

    /// Start page (1-based)
    #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
    start_page: i64,
    /// End page (0 for last page)
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    end_page: i64,
    /// Pages range type
    #[arg(long, value_enum, default_value_t = PagesRange::All)]
    pages_range: PagesRange,
    /// Custom pages (e.g. "1-5,7,9-12")
    #[arg(long, default_value = "")]
    custom_pages: String,

    /// Print a JSON result instead of a summary line
    #[arg(long, default_value_t = false)]
    json: bool,
    /// Emit log lines (stderr) as JSON
    #[arg(long, default_value_t = false)]
    log_json: bool,
}

impl Args {
    fn watermark_spec(&self) -> Result<WatermarkSpec> {
        if !(1..=100).contains(&self.opacity) {
            return Err(WatermarkError::invalid_argument(format!(
                "opacity must be between 1 and 100, got {}",
                self.opacity
            )));
        }
        if self.font_size == 0 {
            return Err(WatermarkError::invalid_argument("font size must be positive"));
        }
        if self.watermark_type == WatermarkKind::Image {
            if !(10..=100).contains(&self.image_scale) {
                return Err(WatermarkError::invalid_argument(format!(
                    "image scale must be between 10 and 100, got {}",
                    self.image_scale
                )));
            }
            match &self.image_path {
                Some(p) if p.exists() => {}
                Some(p) => return Err(WatermarkError::ImageNotFound { path: p.clone() }),
                None => {
                    return Err(WatermarkError::invalid_argument(
                        "--image-path is required for image watermarks",
                    ));
                }
            }
        }

        Ok(WatermarkSpec {
            kind: self.watermark_type,
            text: self.text.clone(),
            font_size: self.font_size,
            color: Color::from_hex_or_default(&self.text_color),
            font_path: self.font_path.clone(),
            image_path: self.image_path.clone(),
            image_scale_percent: self.image_scale,
            opacity_percent: self.opacity as u8,
            rotation_degrees: self.rotation,
            position: self.position,
        })
    }

    /// An empty custom list falls back to the start/end pages.
    fn page_range(&self) -> PageRangeSpec {
        match self.pages_range {
            PagesRange::All => PageRangeSpec::All,
            PagesRange::First => PageRangeSpec::First,
            PagesRange::Last => PageRangeSpec::Last,
            PagesRange::Custom if !self.custom_pages.trim().is_empty() => {
                PageRangeSpec::Custom(self.custom_pages.clone())
            }
            PagesRange::Custom => PageRangeSpec::Explicit {
                start: self.start_page,
                end: self.end_page,
            },
        }
    }

    fn run(&self) -> Result<pdf_watermark::ApplyOutcome> {
        let spec = self.watermark_spec()?;
        watermark_pdf(&self.input, &self.output, &self.page_range(), &spec)
    }
}

/// Logs go to stderr; stdout carries only the result.
fn init_logging(json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    if json {
        let subscriber = fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber).ok();
    } else {
        let subscriber = fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .finish();
        tracing::subscriber::set_global_default(subscriber).ok();
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.log_json);

    let report = Report::from_result(args.run(), &args.output);
    if args.json {
        println!("{}", report.to_json());
    } else {
        println!("{}", report.summary_line(args.watermark_type));
    }

    if report.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Args {
        let mut argv = vec!["pdf_watermark", "in.pdf", "out.pdf"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let args = parse(&[]);
        let spec = args.watermark_spec().unwrap();
        assert_eq!(spec, WatermarkSpec::default());
        assert_eq!(args.page_range(), PageRangeSpec::All);
        assert!(!args.json);
    }

    #[test]
    fn test_options() {
        let args = parse(&[
            "--position",
            "BottomRight",
            "--rotation",
            "-30",
            "--opacity",
            "25",
            "--text-color",
            "#ff0000",
            "--pages-range",
            "custom",
            "--custom-pages",
            "1-3,8",
            "--json",
        ]);
        let spec = args.watermark_spec().unwrap();
        assert_eq!(spec.position, Position::BottomRight);
        assert_eq!(spec.rotation_degrees, -30);
        assert_eq!(spec.opacity_percent, 25);
        assert_eq!(spec.color, Color::new(255, 0, 0));
        assert_eq!(args.page_range(), PageRangeSpec::Custom("1-3,8".into()));
        assert!(args.json);
    }

    #[test]
    fn test_empty_custom_list_uses_start_and_end() {
        let args = parse(&["--pages-range", "custom", "--start-page", "2", "--end-page", "4"]);
        assert_eq!(args.page_range(), PageRangeSpec::Explicit { start: 2, end: 4 });
    }

    #[test]
    fn test_opacity_out_of_range() {
        let err = parse(&["--opacity", "0"]).watermark_spec().unwrap_err();
        assert!(matches!(err, WatermarkError::InvalidArgument { .. }));
        assert!(parse(&["--opacity", "101"]).watermark_spec().is_err());
    }

    #[test]
    fn test_image_watermark_requires_existing_file() {
        let err = parse(&["--watermark-type", "image"]).watermark_spec().unwrap_err();
        assert!(matches!(err, WatermarkError::InvalidArgument { .. }));

        let err = parse(&["--watermark-type", "image", "--image-path", "/nonexistent/x.png"])
            .watermark_spec()
            .unwrap_err();
        assert!(matches!(err, WatermarkError::ImageNotFound { .. }));
    }

    #[test]
    fn test_image_scale_range() {
        let dir = tempfile::tempdir().unwrap();
        let logo = dir.path().join("logo.png");
        std::fs::write(&logo, b"png").unwrap();
        let logo = logo.to_str().unwrap();
        let args = parse(&["--watermark-type", "image", "--image-path", logo, "--image-scale", "5"]);
        assert!(args.watermark_spec().is_err());
        let args = parse(&["--watermark-type", "image", "--image-path", logo, "--image-scale", "80"]);
        assert_eq!(args.watermark_spec().unwrap().image_scale_percent, 80);
    }

    #[test]
    fn test_missing_input_is_a_failure_report() {
        let args = parse(&[]);
        let report = Report::from_result(args.run(), &args.output);
        assert!(!report.success);
        assert_eq!(report.error.as_deref(), Some("Input file not found: in.pdf"));
    }
}
