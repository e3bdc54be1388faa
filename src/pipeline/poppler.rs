//! PDF page rendering via `pdftoppm` (poppler-utils).
//!
//! ```text
//! pdftoppm -f N -l N -r DPI -cropbox -png [-gray] -singlefile <in.pdf> <prefix>
//! ```
//!
//! writes `<prefix>.png`, which is decoded with the `image` crate.

use crate::config::{ImageConverterConfig, PixelFormat};
use crate::error::DocViewError;
use crate::pipeline::input::{PdfSource, TEMP_PREFIX};
use crate::pipeline::process::{CommandLine, ProcessOutput};
use crate::pipeline::render::{apply_pixel_format, PageRenderer};
use image::DynamicImage;
use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;
use tracing::info;

/// "Wrong page range given: the first page (5) can not be after the last page (3)."
static WRONG_RANGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Wrong page range.*last page \((\d+)\)").unwrap());

/// [`PageRenderer`] that shells out to poppler's `pdftoppm`.
#[derive(Debug, Clone)]
pub struct PdftoppmRenderer {
    config: ImageConverterConfig,
}

impl PdftoppmRenderer {
    pub fn new(config: ImageConverterConfig) -> Self {
        Self { config }
    }

    fn command(&self, page_number: usize) -> CommandLine {
        let page = page_number.to_string();
        let mut cmd = CommandLine::new(&self.config.pdftoppm_path)
            .arg("-f")
            .arg(page.as_str())
            .arg("-l")
            .arg(page.as_str())
            .arg("-r")
            .arg(self.config.resolution.to_string())
            .arg("-cropbox")
            .arg("-png");
        if self.config.pixel_format == PixelFormat::Gray8 {
            cmd = cmd.arg("-gray");
        }
        cmd.arg("-singlefile").arg("${inFile}").arg("${outPrefix}")
    }

    fn classify_failure(
        &self,
        output: &ProcessOutput,
        source: &PdfSource,
        page_index: usize,
        tool: String,
    ) -> DocViewError {
        if let Some(caps) = WRONG_RANGE.captures(&output.stderr) {
            let total = caps
                .get(1)
                .and_then(|m| m.as_str().parse().ok())
                .unwrap_or(0);
            return DocViewError::PageNotFound {
                page: page_index,
                total,
            };
        }
        match output.exit_code {
            // 1: error opening the PDF, 3: permission (encryption) error
            Some(1) | Some(3) => DocViewError::Decode {
                source_name: source.describe(),
                detail: output.stderr_excerpt(),
            },
            _ => output.failure(tool),
        }
    }
}

impl PageRenderer for PdftoppmRenderer {
    fn name(&self) -> &'static str {
        "pdftoppm"
    }

    fn render_page(
        &self,
        source: &PdfSource,
        page_index: usize,
    ) -> Result<DynamicImage, DocViewError> {
        source.check_magic()?;
        let (pdf_path, _spilled) = source.to_local_path()?;
        let out_dir = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempdir()
            .map_err(|e| DocViewError::io("create pdftoppm output directory", e))?;
        let prefix = out_dir.path().join("page");

        let command = self
            .command(page_index + 1)
            .substitute("inFile", &pdf_path)
            .substitute("outPrefix", &prefix);
        let tool = command.tool_name();
        let output = command.run(self.config.timeout_secs.map(Duration::from_secs))?;
        if !output.success() {
            return Err(self.classify_failure(&output, source, page_index, tool));
        }

        let png = prefix.with_extension("png");
        if !png.exists() {
            return Err(DocViewError::NoOutput { tool, path: png });
        }
        let image = image::open(&png).map_err(|e| DocViewError::Decode {
            source_name: source.describe(),
            detail: format!("unreadable {tool} output: {e}"),
        })?;
        let image = apply_pixel_format(image, self.config.pixel_format);

        info!(
            "Rendered page {} of {} with {} at {} dpi → {}x{} px",
            page_index + 1,
            source.describe(),
            tool,
            self.config.resolution,
            image.width(),
            image.height()
        );
        Ok(image)
    }
}
