//! PDF rasterisation: render one page of a PDF to a `DynamicImage`.
//!
//! Two backends implement [`PageRenderer`]:
//!
//! * [`PdfiumRenderer`]: in-process, through the pdfium library.
//! * [`crate::pipeline::poppler::PdftoppmRenderer`]: poppler's `pdftoppm`.
//!
//! [`renderer_from_config`] picks one from [`ImageConverterConfig::backend`].
//!
//! ## Handle lifetime
//!
//! pdfium documents and pages are RAII values borrowed from the bound
//! library; they are closed when they go out of scope, on every exit path,
//! including when loading failed halfway.

use crate::config::{ImageConverterConfig, PixelFormat, RendererBackend};
use crate::error::DocViewError;
use crate::pipeline::input::PdfSource;
use crate::pipeline::poppler::PdftoppmRenderer;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::PathBuf;
use tracing::{debug, info};

/// PostScript points per inch; pdfium's native unit.
const POINTS_PER_INCH: f32 = 72.0;

/// Renders a single page of a PDF.
pub trait PageRenderer: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &'static str;

    /// Render page `page_index` (0-based) of `source`.
    ///
    /// Returns [`DocViewError::PageNotFound`] when the index is past the
    /// last page and [`DocViewError::Decode`] for unreadable input.
    fn render_page(&self, source: &PdfSource, page_index: usize)
        -> Result<DynamicImage, DocViewError>;
}

/// Build the renderer selected by `config.backend`.
pub fn renderer_from_config(config: &ImageConverterConfig) -> Box<dyn PageRenderer> {
    match config.backend {
        RendererBackend::Pdfium => Box::new(PdfiumRenderer::new(config.clone())),
        RendererBackend::Pdftoppm => Box::new(PdftoppmRenderer::new(config.clone())),
    }
}

/// Convert a rendered page to the configured pixel layout.
pub(crate) fn apply_pixel_format(image: DynamicImage, format: PixelFormat) -> DynamicImage {
    match format {
        PixelFormat::Rgb24 => DynamicImage::ImageRgb8(image.to_rgb8()),
        PixelFormat::Rgba32 => DynamicImage::ImageRgba8(image.to_rgba8()),
        PixelFormat::Gray8 => DynamicImage::ImageLuma8(image.to_luma8()),
    }
}

/// [`PageRenderer`] backed by pdfium.
#[derive(Debug, Clone)]
pub struct PdfiumRenderer {
    config: ImageConverterConfig,
}

impl PdfiumRenderer {
    pub fn new(config: ImageConverterConfig) -> Self {
        Self { config }
    }

    /// Bind to pdfium: configured path, then `PDFIUM_LIB_PATH`, then the
    /// system library.
    fn bind(&self) -> Result<Pdfium, DocViewError> {
        let explicit = self
            .config
            .pdfium_library_path
            .clone()
            .or_else(|| std::env::var_os("PDFIUM_LIB_PATH").map(PathBuf::from));

        let bindings = match explicit {
            Some(path) => {
                let lib = if path.is_dir() {
                    Pdfium::pdfium_platform_library_name_at_path(&path)
                } else {
                    path
                };
                debug!("Binding pdfium from {}", lib.display());
                Pdfium::bind_to_library(&lib)
                    .map_err(|e| DocViewError::PdfiumBindingFailed(format!("{}: {e}", lib.display())))?
            }
            None => Pdfium::bind_to_system_library()
                .map_err(|e| DocViewError::PdfiumBindingFailed(e.to_string()))?,
        };
        Ok(Pdfium::new(bindings))
    }
}

impl PageRenderer for PdfiumRenderer {
    fn name(&self) -> &'static str {
        "pdfium"
    }

    fn render_page(
        &self,
        source: &PdfSource,
        page_index: usize,
    ) -> Result<DynamicImage, DocViewError> {
        source.check_magic()?;
        let pdfium = self.bind()?;
        let decode = |e: PdfiumError| DocViewError::Decode {
            source_name: source.describe(),
            detail: format!("{e:?}"),
        };

        let document = match source {
            PdfSource::Path(path) => pdfium.load_pdf_from_file(path, None),
            PdfSource::Bytes(bytes) => pdfium.load_pdf_from_byte_slice(bytes, None),
        }
        .map_err(decode)?;

        let pages = document.pages();
        let total = pages.len() as usize;
        if page_index >= total {
            return Err(DocViewError::PageNotFound {
                page: page_index,
                total,
            });
        }
        let index = u16::try_from(page_index).map_err(|_| DocViewError::PageNotFound {
            page: page_index,
            total,
        })?;
        let page = pages.get(index).map_err(decode)?;

        let render_config = PdfRenderConfig::new()
            .scale_page_by_factor(self.config.resolution as f32 / POINTS_PER_INCH)
            .use_print_quality(true);
        let bitmap = page.render_with_config(&render_config).map_err(decode)?;
        let image = apply_pixel_format(bitmap.as_image(), self.config.pixel_format);

        info!(
            "Rendered page {} of {} at {} dpi → {}x{} px",
            page_index + 1,
            source.describe(),
            self.config.resolution,
            image.width(),
            image.height()
        );
        Ok(image)
    }
}
