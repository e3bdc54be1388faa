//! Configuration types for document conversion.
//!
//! All pipeline behaviour is controlled through [`DocViewConfig`], built via
//! its [`DocViewConfigBuilder`] or deserialised from JSON. The configuration
//! is read-only once a [`crate::service::DocumentViewService`] has been
//! constructed; nothing in the pipeline mutates it.

use crate::error::DocViewError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Mime groups eligible for conversion when nothing else is configured.
pub const DEFAULT_SUPPORTED_FORMATS: &[&str] =
    &["pdf", "word", "excel", "powerpoint", "openoffice", "rtf"];

/// Configuration for the document view service.
///
/// # Example
/// ```rust
/// use docview::{DocViewConfig, ThumbnailFormat};
///
/// let config = DocViewConfig::builder()
///     .supported_document_formats(["pdf", "word"])
///     .thumbnail_format(ThumbnailFormat::Jpeg)
///     .resolution(120)
///     .build()
///     .unwrap();
/// assert_eq!(config.image.resolution, 120);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DocViewConfig {
    /// Master switch. When false every operation is an informational no-op.
    pub enabled: bool,

    /// Mime-group names whose members are eligible for conversion.
    ///
    /// An empty list behaves like a disabled service.
    pub supported_document_formats: Vec<String>,

    /// Encoding used for stored thumbnails. Default: PNG.
    pub thumbnail_format: ThumbnailFormat,

    /// External PDF → vector converter settings.
    pub vector: VectorConverterConfig,

    /// PDF → raster image settings.
    pub image: ImageConverterConfig,

    /// Document → PDF converter settings.
    pub office: OfficeConverterConfig,
}

impl Default for DocViewConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            supported_document_formats: DEFAULT_SUPPORTED_FORMATS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            thumbnail_format: ThumbnailFormat::default(),
            vector: VectorConverterConfig::default(),
            image: ImageConverterConfig::default(),
            office: OfficeConverterConfig::default(),
        }
    }
}

impl DocViewConfig {
    /// Create a new builder for `DocViewConfig`.
    pub fn builder() -> DocViewConfigBuilder {
        DocViewConfigBuilder {
            config: Self::default(),
        }
    }

    /// Continue building from this configuration, e.g. to apply CLI
    /// overrides on top of a loaded file.
    pub fn into_builder(self) -> DocViewConfigBuilder {
        DocViewConfigBuilder { config: self }
    }

    /// Parse a JSON configuration document. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, DocViewError> {
        let config: DocViewConfig = serde_json::from_str(json)
            .map_err(|e| DocViewError::InvalidConfig(format!("config JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// True when the master switch is on and at least one format is supported.
    pub fn is_active(&self) -> bool {
        self.enabled && !self.supported_document_formats.is_empty()
    }

    fn validate(&self) -> Result<(), DocViewError> {
        if !(MIN_RESOLUTION..=MAX_RESOLUTION).contains(&self.image.resolution) {
            return Err(DocViewError::InvalidConfig(format!(
                "resolution must be {MIN_RESOLUTION}–{MAX_RESOLUTION} dpi, got {}",
                self.image.resolution
            )));
        }
        if self.vector.executable_path.trim().is_empty() {
            return Err(DocViewError::InvalidConfig(
                "vector converter executable path is empty".into(),
            ));
        }
        if self.vector.output_extension.trim().is_empty() {
            return Err(DocViewError::InvalidConfig(
                "vector output extension is empty".into(),
            ));
        }
        for secs in [
            self.vector.timeout_secs,
            self.image.timeout_secs,
            self.office.timeout_secs,
        ]
        .into_iter()
        .flatten()
        {
            if secs == 0 {
                return Err(DocViewError::InvalidConfig(
                    "timeouts must be at least 1 second".into(),
                ));
            }
        }
        Ok(())
    }
}

const MIN_RESOLUTION: u32 = 36;
const MAX_RESOLUTION: u32 = 600;

/// Settings for the external PDF → vector-animation converter (`pdf2swf`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorConverterConfig {
    /// When false, conversions return nothing without error.
    pub enabled: bool,

    /// Executable to run. Default: `pdf2swf` (looked up on `PATH`).
    pub executable_path: String,

    /// Extra tool flags appended verbatim after `-o <out>`.
    ///
    /// Split on whitespace; single or double quotes group a token.
    /// Example for pdf2swf: `-f -T 9 -t -s storeallcharacters`.
    pub parameters: String,

    /// Kill the tool after this many seconds. `None` waits forever.
    pub timeout_secs: Option<u64>,

    /// Extension given to produced artifacts. Default: `swf`.
    pub output_extension: String,

    /// Mime type stored on produced artifacts.
    pub output_mime_type: String,
}

impl Default for VectorConverterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            executable_path: "pdf2swf".to_string(),
            parameters: "-f -T 9 -t -s storeallcharacters".to_string(),
            timeout_secs: None,
            output_extension: "swf".to_string(),
            output_mime_type: "application/x-shockwave-flash".to_string(),
        }
    }
}

/// Settings for PDF page rasterisation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConverterConfig {
    /// Which rendering backend to use. Default: pdfium.
    pub backend: RendererBackend,

    /// Rendering resolution in dots per inch. Range: 36–600. Default: 96.
    ///
    /// Thumbnails are tiny, so the render only needs enough pixels for the
    /// scaler to downsample cleanly; 96 dpi gives ~816 px on a letter page.
    pub resolution: u32,

    /// Pixel layout of the rendered image. Default: 24-bit RGB.
    pub pixel_format: PixelFormat,

    /// Explicit pdfium shared library. Falls back to `PDFIUM_LIB_PATH`,
    /// then the system library.
    pub pdfium_library_path: Option<PathBuf>,

    /// `pdftoppm` executable for the poppler backend.
    pub pdftoppm_path: String,

    /// Timeout for the `pdftoppm` process.
    pub timeout_secs: Option<u64>,
}

impl Default for ImageConverterConfig {
    fn default() -> Self {
        Self {
            backend: RendererBackend::default(),
            resolution: 96,
            pixel_format: PixelFormat::default(),
            pdfium_library_path: None,
            pdftoppm_path: "pdftoppm".to_string(),
            timeout_secs: None,
        }
    }
}

/// Settings for the document → PDF converter (LibreOffice).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OfficeConverterConfig {
    /// Off by default: a LibreOffice install is a deliberate opt-in.
    pub enabled: bool,

    /// Executable to run. Default: `soffice`.
    pub executable_path: String,

    pub timeout_secs: Option<u64>,
}

impl Default for OfficeConverterConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            executable_path: "soffice".to_string(),
            timeout_secs: Some(120),
        }
    }
}

/// Builder for [`DocViewConfig`].
#[derive(Debug)]
pub struct DocViewConfigBuilder {
    config: DocViewConfig,
}

impl DocViewConfigBuilder {
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.config.enabled = enabled;
        self
    }

    pub fn supported_document_formats<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.supported_document_formats = groups.into_iter().map(Into::into).collect();
        self
    }

    pub fn thumbnail_format(mut self, format: ThumbnailFormat) -> Self {
        self.config.thumbnail_format = format;
        self
    }

    pub fn vector_enabled(mut self, enabled: bool) -> Self {
        self.config.vector.enabled = enabled;
        self
    }

    pub fn vector_executable(mut self, path: impl Into<String>) -> Self {
        self.config.vector.executable_path = path.into();
        self
    }

    pub fn vector_parameters(mut self, params: impl Into<String>) -> Self {
        self.config.vector.parameters = params.into();
        self
    }

    pub fn vector_timeout_secs(mut self, secs: u64) -> Self {
        self.config.vector.timeout_secs = Some(secs.max(1));
        self
    }

    pub fn vector_output(mut self, extension: impl Into<String>, mime: impl Into<String>) -> Self {
        self.config.vector.output_extension = extension.into();
        self.config.vector.output_mime_type = mime.into();
        self
    }

    pub fn renderer_backend(mut self, backend: RendererBackend) -> Self {
        self.config.image.backend = backend;
        self
    }

    pub fn resolution(mut self, dpi: u32) -> Self {
        self.config.image.resolution = dpi.clamp(MIN_RESOLUTION, MAX_RESOLUTION);
        self
    }

    pub fn pixel_format(mut self, format: PixelFormat) -> Self {
        self.config.image.pixel_format = format;
        self
    }

    pub fn pdfium_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.image.pdfium_library_path = Some(path.into());
        self
    }

    pub fn pdftoppm_path(mut self, path: impl Into<String>) -> Self {
        self.config.image.pdftoppm_path = path.into();
        self
    }

    pub fn image_timeout_secs(mut self, secs: u64) -> Self {
        self.config.image.timeout_secs = Some(secs.max(1));
        self
    }

    pub fn office_enabled(mut self, enabled: bool) -> Self {
        self.config.office.enabled = enabled;
        self
    }

    pub fn office_executable(mut self, path: impl Into<String>) -> Self {
        self.config.office.executable_path = path.into();
        self
    }

    pub fn office_timeout_secs(mut self, secs: u64) -> Self {
        self.config.office.timeout_secs = Some(secs.max(1));
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<DocViewConfig, DocViewError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Encoding of stored thumbnails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThumbnailFormat {
    #[default]
    Png,
    Jpeg,
}

impl ThumbnailFormat {
    /// Mime type written next to the thumbnail bytes.
    pub fn mime_type(self) -> &'static str {
        match self {
            ThumbnailFormat::Png => "image/png",
            ThumbnailFormat::Jpeg => "image/jpeg",
        }
    }

    pub(crate) fn image_format(self) -> image::ImageFormat {
        match self {
            ThumbnailFormat::Png => image::ImageFormat::Png,
            ThumbnailFormat::Jpeg => image::ImageFormat::Jpeg,
        }
    }
}

impl FromStr for ThumbnailFormat {
    type Err = DocViewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(ThumbnailFormat::Png),
            "jpeg" | "jpg" => Ok(ThumbnailFormat::Jpeg),
            other => Err(DocViewError::InvalidConfig(format!(
                "thumbnail format must be png or jpeg, got '{other}'"
            ))),
        }
    }
}

impl fmt::Display for ThumbnailFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ThumbnailFormat::Png => "png",
            ThumbnailFormat::Jpeg => "jpeg",
        })
    }
}

/// Pixel layout of rendered page images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    /// 8 bits per channel RGB, no alpha. (default)
    #[default]
    Rgb24,
    /// 8 bits per channel RGBA.
    Rgba32,
    /// 8-bit greyscale.
    Gray8,
}

impl FromStr for PixelFormat {
    type Err = DocViewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rgb24" | "rgb" => Ok(PixelFormat::Rgb24),
            "rgba32" | "rgba" => Ok(PixelFormat::Rgba32),
            "gray8" | "gray" | "grey" => Ok(PixelFormat::Gray8),
            other => Err(DocViewError::InvalidConfig(format!(
                "unknown pixel format '{other}'"
            ))),
        }
    }
}

/// Interchangeable PDF → image backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RendererBackend {
    /// In-process rendering through the pdfium library. (default)
    #[default]
    Pdfium,
    /// poppler's `pdftoppm` command-line renderer.
    Pdftoppm,
}

impl FromStr for RendererBackend {
    type Err = DocViewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pdfium" => Ok(RendererBackend::Pdfium),
            "pdftoppm" | "poppler" => Ok(RendererBackend::Pdftoppm),
            other => Err(DocViewError::InvalidConfig(format!(
                "unknown renderer backend '{other}'"
            ))),
        }
    }
}
