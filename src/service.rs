//! The document view service: guards, PDF preparation, and persistence of
//! vector views and thumbnails.
//!
//! ## Flow
//!
//! ```text
//! guard ─▶ download ─▶ {pdf? pass through : office → PDF} ─▶ vector  ─▶ sibling file / swfView child
//!                                                         └▶ page 0 ─▶ scale ─▶ encode ─▶ thumbnail child
//! ```
//!
//! Every operation returns `Result<Outcome, DocViewError>`. A disabled
//! service, an unsupported format, or a missing converter is a
//! [`Outcome::Skipped`], not an error. Errors from the repository, the
//! converters, or the renderer propagate; swallowing them is the job of
//! [`crate::trigger::DocumentRuleService`].
//!
//! All temp files (downloaded source, intermediate PDF, converter output)
//! belong to a [`ConversionJob`] or are held as [`TempPath`] values, so they
//! are deleted when the operation returns, whichever way it returns.

use crate::config::DocViewConfig;
use crate::error::DocViewError;
use crate::mime::{MimeRegistry, PDF_MIME_TYPE};
use crate::pipeline::encode::encode_thumbnail;
use crate::pipeline::input::{PdfSource, PreparedPdf};
use crate::pipeline::job::{ConversionJob, OverwritePolicy};
use crate::pipeline::office::{DisabledDocumentConverter, DocumentConverter, LibreOfficeConverter};
use crate::pipeline::render::{renderer_from_config, PageRenderer};
use crate::pipeline::scale;
use crate::pipeline::vector::{CommandLineVectorConverter, VectorConverter};
use crate::repository::{
    ContentRepository, NodePath, PropertyValue, MIXIN_IMAGE, MIXIN_VECTOR_VIEW, PROP_DATA,
    PROP_HEIGHT, PROP_LAST_MODIFIED, PROP_MIME_TYPE, PROP_WIDTH, TYPE_THUMBNAIL, TYPE_VIEW,
    VIEW_NODE_NAME,
};
use chrono::Utc;
use image::DynamicImage;
use std::fmt;
use std::fs::File;
use std::path::Path;
use tempfile::TempPath;
use tracing::{debug, info, warn};

/// Why an operation did nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The service is switched off or no document formats are configured.
    ServiceDisabled,
    /// The node has no file content.
    NotAFile,
    /// The node's mime type is not in any supported group.
    UnsupportedFormat { mime: Option<String> },
    /// The source is not a PDF and no document converter is available.
    PdfUnavailable,
    VectorConverterDisabled,
    /// The PDF has no first page to render.
    NoPageImage,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::ServiceDisabled => f.write_str("service disabled"),
            SkipReason::NotAFile => f.write_str("not a file node"),
            SkipReason::UnsupportedFormat { mime: Some(m) } => write!(f, "unsupported format {m}"),
            SkipReason::UnsupportedFormat { mime: None } => f.write_str("unknown format"),
            SkipReason::PdfUnavailable => f.write_str("no PDF available"),
            SkipReason::VectorConverterDisabled => f.write_str("vector converter disabled"),
            SkipReason::NoPageImage => f.write_str("no page image"),
        }
    }
}

/// Result of a service operation that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// An artifact was written at `node`.
    Completed { node: NodePath, elapsed_ms: u64 },
    Skipped(SkipReason),
}

impl Outcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Outcome::Completed { .. })
    }

    /// The written artifact, if any.
    pub fn node(&self) -> Option<&NodePath> {
        match self {
            Outcome::Completed { node, .. } => Some(node),
            Outcome::Skipped(_) => None,
        }
    }
}

enum Guard {
    Proceed(String),
    Skip(SkipReason),
}

/// Local-file conversion: PDF preparation and vector conversion, with no
/// repository behind it.
pub struct FileConverter {
    mime: MimeRegistry,
    vector: Box<dyn VectorConverter>,
    office: Box<dyn DocumentConverter>,
}

impl FileConverter {
    /// The command-line vector converter, plus LibreOffice when enabled.
    pub fn from_config(config: &DocViewConfig) -> Self {
        let office: Box<dyn DocumentConverter> = if config.office.enabled {
            Box::new(LibreOfficeConverter::new(config.office.clone()))
        } else {
            Box::new(DisabledDocumentConverter)
        };
        Self {
            mime: MimeRegistry::with_defaults(),
            vector: Box::new(CommandLineVectorConverter::new(config.vector.clone())),
            office,
        }
    }

    pub fn with_mime_registry(mut self, registry: MimeRegistry) -> Self {
        self.mime = registry;
        self
    }

    pub fn with_vector_converter(mut self, converter: impl VectorConverter + 'static) -> Self {
        self.vector = Box::new(converter);
        self
    }

    pub fn with_document_converter(mut self, converter: impl DocumentConverter + 'static) -> Self {
        self.office = Box::new(converter);
        self
    }

    pub fn mime_registry(&self) -> &MimeRegistry {
        &self.mime
    }

    fn is_pdf(&self, mime_type: &str) -> bool {
        mime_type == PDF_MIME_TYPE || self.mime.is_pdf(Some(mime_type))
    }

    /// Make `source` available as a PDF.
    ///
    /// PDFs are passed through untouched. Anything else goes through the
    /// document converter; when that is disabled the result is `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Converter failures, and [`DocViewError::Internal`] when called from
    /// inside an async runtime.
    pub fn convert_to_pdf(
        &self,
        source: &Path,
        mime_type: &str,
    ) -> Result<Option<PreparedPdf>, DocViewError> {
        if self.is_pdf(mime_type) {
            debug!("{} is already a PDF", source.display());
            return Ok(Some(PreparedPdf::Original(source.to_path_buf())));
        }
        if !self.office.is_enabled() {
            warn!(
                "Document converter is disabled, cannot convert {} ({}) to PDF",
                source.display(),
                mime_type
            );
            return Ok(None);
        }
        let pdf = self.office.convert(source, mime_type, PDF_MIME_TYPE)?;
        Ok(Some(PreparedPdf::Converted(pdf)))
    }

    /// Convert a local file into the vector format.
    ///
    /// The intermediate PDF, if one was needed, is deleted before returning.
    /// `Ok(None)` when the vector converter is disabled or no PDF could be
    /// produced.
    ///
    /// # Errors
    ///
    /// As for [`FileConverter::convert_to_pdf`], plus vector converter
    /// failures.
    pub fn convert_file(
        &self,
        source: &Path,
        mime_type: &str,
    ) -> Result<Option<TempPath>, DocViewError> {
        if !self.vector.is_enabled() {
            info!("Vector converter is disabled, skipping {}", source.display());
            return Ok(None);
        }
        match self.convert_to_pdf(source, mime_type)? {
            Some(pdf) => self.vector.convert(pdf.path()),
            None => Ok(None),
        }
    }
}

/// Converts repository documents into vector views and thumbnails.
///
/// The external tools run on a private runtime, so every operation must be
/// called from synchronous code; from inside an async runtime they return
/// [`DocViewError::Internal`]. Use `tokio::task::spawn_blocking` there.
pub struct DocumentViewService<R: ContentRepository> {
    repository: R,
    config: DocViewConfig,
    renderer: Box<dyn PageRenderer>,
    files: FileConverter,
}

impl<R: ContentRepository> DocumentViewService<R> {
    /// Wire the default collaborators for `config`: the configured renderer
    /// backend, the command-line vector converter, and LibreOffice when
    /// enabled.
    pub fn new(config: DocViewConfig, repository: R) -> Self {
        Self {
            renderer: renderer_from_config(&config.image),
            files: FileConverter::from_config(&config),
            repository,
            config,
        }
    }

    pub fn with_mime_registry(mut self, registry: MimeRegistry) -> Self {
        self.files = self.files.with_mime_registry(registry);
        self
    }

    pub fn with_renderer(mut self, renderer: impl PageRenderer + 'static) -> Self {
        self.renderer = Box::new(renderer);
        self
    }

    pub fn with_vector_converter(mut self, converter: impl VectorConverter + 'static) -> Self {
        self.files = self.files.with_vector_converter(converter);
        self
    }

    pub fn with_document_converter(mut self, converter: impl DocumentConverter + 'static) -> Self {
        self.files = self.files.with_document_converter(converter);
        self
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn config(&self) -> &DocViewConfig {
        &self.config
    }

    pub fn mime_registry(&self) -> &MimeRegistry {
        self.files.mime_registry()
    }

    pub fn renderer(&self) -> &dyn PageRenderer {
        self.renderer.as_ref()
    }

    /// Is `mime_type` in one of the configured document format groups?
    pub fn is_supported(&self, mime_type: Option<&str>) -> bool {
        self.files
            .mime
            .belongs_to_group(mime_type, &self.config.supported_document_formats)
    }

    /// The file-level half of the service.
    pub fn files(&self) -> &FileConverter {
        &self.files
    }

    // ── File-level operations ─────────────────────────────────────────────

    /// See [`FileConverter::convert_to_pdf`].
    pub fn convert_to_pdf(
        &self,
        source: &Path,
        mime_type: &str,
    ) -> Result<Option<PreparedPdf>, DocViewError> {
        self.files.convert_to_pdf(source, mime_type)
    }

    /// See [`FileConverter::convert_file`].
    pub fn convert_file(
        &self,
        source: &Path,
        mime_type: &str,
    ) -> Result<Option<TempPath>, DocViewError> {
        self.files.convert_file(source, mime_type)
    }

    // ── Repository operations ─────────────────────────────────────────────

    /// Convert `document` into a vector file stored next to it.
    ///
    /// `report.docx` becomes `report.swf` in the same folder. With
    /// `overwrite_if_exists == false` an existing `report.swf` is kept and the
    /// new artifact gets a free name such as `report-1.swf`.
    pub fn convert(
        &self,
        document: &NodePath,
        overwrite_if_exists: bool,
    ) -> Result<Outcome, DocViewError> {
        let mime = match self.guard(document, "conversion")? {
            Guard::Proceed(mime) => mime,
            Guard::Skip(reason) => return Ok(Outcome::Skipped(reason)),
        };
        if !self.files.vector.is_enabled() {
            info!("Vector converter is disabled, skipping conversion of {}", document);
            return Ok(Outcome::Skipped(SkipReason::VectorConverterDisabled));
        }

        let job = ConversionJob::new(document.clone(), mime, overwrite_if_exists.into())?;
        let Some(pdf) = self.prepare_pdf(&job)? else {
            return Ok(Outcome::Skipped(SkipReason::PdfUnavailable));
        };
        let Some(output) = self.files.vector.convert(pdf.path())? else {
            return Ok(Outcome::Skipped(SkipReason::VectorConverterDisabled));
        };

        let parent = self.repository.parent(document)?.ok_or_else(|| {
            DocViewError::Internal(format!("{document} has no parent folder"))
        })?;
        let desired = artifact_name(document.name(), self.files.vector.output_extension());
        let name = match job.overwrite {
            OverwritePolicy::Overwrite => desired,
            OverwritePolicy::KeepExisting => {
                self.repository.find_available_name(&parent, &desired)?
            }
        };

        let mut file = File::open(&output)
            .map_err(|e| DocViewError::io(format!("open {}", output.display()), e))?;
        let artifact = self.repository.upload_file(
            &parent,
            &name,
            &mut file,
            self.files.vector.output_mime_type(),
        )?;
        self.repository.save()?;

        let elapsed_ms = job.elapsed_ms();
        info!("Converted {} into {}", document, artifact);
        debug!("Conversion of {} took {} ms", document, elapsed_ms);
        Ok(Outcome::Completed {
            node: artifact,
            elapsed_ms,
        })
    }

    /// Render page one of `document` into a `size`×`size` thumbnail stored
    /// as child `name`, replacing any earlier thumbnail of that name.
    pub fn create_thumbnail(
        &self,
        document: &NodePath,
        name: &str,
        size: u32,
    ) -> Result<Outcome, DocViewError> {
        if size == 0 {
            return Err(DocViewError::InvalidConfig(
                "thumbnail size must be at least 1 px".into(),
            ));
        }
        let mime = match self.guard(document, "thumbnail")? {
            Guard::Proceed(mime) => mime,
            Guard::Skip(reason) => return Ok(Outcome::Skipped(reason)),
        };

        let job = ConversionJob::new(document.clone(), mime, OverwritePolicy::Overwrite)?;
        let (source, _prepared) = if self.files.is_pdf(&job.mime_type) {
            (PdfSource::Bytes(self.repository.read_content(document)?), None)
        } else {
            match self.prepare_pdf(&job)? {
                Some(pdf) => (PdfSource::Path(pdf.path().to_path_buf()), Some(pdf)),
                None => return Ok(Outcome::Skipped(SkipReason::PdfUnavailable)),
            }
        };

        let page = match self.renderer.render_page(&source, 0) {
            Ok(page) => page,
            Err(DocViewError::PageNotFound { total, .. }) => {
                warn!(
                    "{} has no first page to render ({} pages), no thumbnail created",
                    document, total
                );
                return Ok(Outcome::Skipped(SkipReason::NoPageImage));
            }
            Err(e) => return Err(e),
        };

        let thumbnail = scale::resize(page, size);
        let node = self.store_thumbnail(document, name, &thumbnail)?;

        let elapsed_ms = job.elapsed_ms();
        info!(
            "Created {}x{} thumbnail {}",
            thumbnail.width(),
            thumbnail.height(),
            node
        );
        debug!("Thumbnail of {} took {} ms", document, elapsed_ms);
        Ok(Outcome::Completed { node, elapsed_ms })
    }

    /// Convert `document` into a vector view stored as its `swfView` child.
    pub fn create_view(&self, document: &NodePath) -> Result<Outcome, DocViewError> {
        let mime = match self.guard(document, "view")? {
            Guard::Proceed(mime) => mime,
            Guard::Skip(reason) => return Ok(Outcome::Skipped(reason)),
        };
        if !self.files.vector.is_enabled() {
            info!("Vector converter is disabled, skipping view of {}", document);
            return Ok(Outcome::Skipped(SkipReason::VectorConverterDisabled));
        }

        let job = ConversionJob::new(document.clone(), mime, OverwritePolicy::Overwrite)?;
        let Some(pdf) = self.prepare_pdf(&job)? else {
            return Ok(Outcome::Skipped(SkipReason::PdfUnavailable));
        };
        let Some(output) = self.files.vector.convert(pdf.path())? else {
            return Ok(Outcome::Skipped(SkipReason::VectorConverterDisabled));
        };

        let repo = &self.repository;
        repo.checkout_for_write(document)?;
        if !repo.has_mixin(document, MIXIN_VECTOR_VIEW)? {
            repo.add_mixin(document, MIXIN_VECTOR_VIEW)?;
        }
        let view = match repo.child(document, VIEW_NODE_NAME)? {
            Some(view) => view,
            None => repo.add_child(document, VIEW_NODE_NAME, TYPE_VIEW)?,
        };
        if repo.has_property(&view, PROP_DATA)? {
            repo.remove_property(&view, PROP_DATA)?;
        }
        let mut file = File::open(&output)
            .map_err(|e| DocViewError::io(format!("open {}", output.display()), e))?;
        repo.set_binary_property(&view, PROP_DATA, &mut file)?;
        repo.set_property(
            &view,
            PROP_MIME_TYPE,
            PropertyValue::from(self.files.vector.output_mime_type()),
        )?;
        repo.set_property(&view, PROP_LAST_MODIFIED, PropertyValue::Date(Utc::now()))?;
        repo.save()?;

        let elapsed_ms = job.elapsed_ms();
        info!("Created view {}", view);
        debug!("View of {} took {} ms", document, elapsed_ms);
        Ok(Outcome::Completed {
            node: view,
            elapsed_ms,
        })
    }

    // ── Internals ─────────────────────────────────────────────────────────

    fn guard(&self, document: &NodePath, operation: &str) -> Result<Guard, DocViewError> {
        if !self.config.is_active() {
            info!(
                "Document view service is disabled, skipping {} of {}",
                operation, document
            );
            return Ok(Guard::Skip(SkipReason::ServiceDisabled));
        }
        if !self.repository.is_file_node(document)? {
            warn!("{} is not a file, skipping {}", document, operation);
            return Ok(Guard::Skip(SkipReason::NotAFile));
        }
        match self.repository.content_type(document)? {
            Some(mime) if self.is_supported(Some(mime.as_str())) => Ok(Guard::Proceed(mime)),
            mime => {
                warn!(
                    "{} has unsupported format {}, skipping {}",
                    document,
                    mime.as_deref().unwrap_or("<unknown>"),
                    operation
                );
                Ok(Guard::Skip(SkipReason::UnsupportedFormat { mime }))
            }
        }
    }

    /// Download the job's document into its scratch directory and make it a
    /// PDF.
    fn prepare_pdf(&self, job: &ConversionJob) -> Result<Option<PreparedPdf>, DocViewError> {
        // Keep the original file name; office converters go by extension.
        let local = job.scratch_file(job.document.name());
        self.repository.download_content(&job.document, &local)?;
        self.convert_to_pdf(&local, &job.mime_type)
    }

    fn store_thumbnail(
        &self,
        document: &NodePath,
        name: &str,
        thumbnail: &DynamicImage,
    ) -> Result<NodePath, DocViewError> {
        let format = self.config.thumbnail_format;
        let bytes = encode_thumbnail(thumbnail, format)?;
        let now = Utc::now();
        let repo = &self.repository;

        repo.checkout_for_write(document)?;
        let node = match repo.child(document, name)? {
            Some(node) => node,
            None => {
                let node = repo.add_child(document, name, TYPE_THUMBNAIL)?;
                repo.add_mixin(&node, MIXIN_IMAGE)?;
                node
            }
        };
        if repo.has_property(&node, PROP_DATA)? {
            repo.remove_property(&node, PROP_DATA)?;
        }
        repo.set_binary_property(&node, PROP_DATA, &mut bytes.as_slice())?;
        repo.set_property(&node, PROP_WIDTH, PropertyValue::Long(thumbnail.width().into()))?;
        repo.set_property(&node, PROP_HEIGHT, PropertyValue::Long(thumbnail.height().into()))?;
        repo.set_property(&node, PROP_MIME_TYPE, PropertyValue::from(format.mime_type()))?;
        repo.set_property(&node, PROP_LAST_MODIFIED, PropertyValue::Date(now))?;
        repo.set_property(document, PROP_LAST_MODIFIED, PropertyValue::Date(now))?;
        repo.save()?;
        Ok(node)
    }
}

/// `report.docx` → `report.swf`; `README` → `README.swf`.
pub fn artifact_name(source_name: &str, extension: &str) -> String {
    let stem = match source_name.rfind('.') {
        Some(idx) if idx > 0 => &source_name[..idx],
        _ => source_name,
    };
    format!("{stem}.{extension}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::FsRepository;
    use image::{Rgb, RgbImage};
    use tempfile::TempDir;

    struct BlankRenderer;

    impl PageRenderer for BlankRenderer {
        fn name(&self) -> &'static str {
            "blank"
        }

        fn render_page(
            &self,
            _source: &PdfSource,
            _page_index: usize,
        ) -> Result<DynamicImage, DocViewError> {
            Ok(DynamicImage::ImageRgb8(RgbImage::from_pixel(
                816,
                1056,
                Rgb([255, 255, 255]),
            )))
        }
    }

    struct NoPagesRenderer;

    impl PageRenderer for NoPagesRenderer {
        fn name(&self) -> &'static str {
            "empty"
        }

        fn render_page(
            &self,
            _source: &PdfSource,
            page_index: usize,
        ) -> Result<DynamicImage, DocViewError> {
            Err(DocViewError::PageNotFound {
                page: page_index,
                total: 0,
            })
        }
    }

    fn service(files: &[(&str, &[u8])], config: DocViewConfig) -> (TempDir, DocumentViewService<FsRepository>) {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("docs")).unwrap();
        for (name, content) in files {
            std::fs::write(dir.path().join("docs").join(name), content).unwrap();
        }
        let repo = FsRepository::open(dir.path()).unwrap();
        let svc = DocumentViewService::new(config, repo).with_renderer(BlankRenderer);
        (dir, svc)
    }

    #[test]
    fn artifact_names() {
        assert_eq!(artifact_name("report.docx", "swf"), "report.swf");
        assert_eq!(artifact_name("archive.tar.gz", "swf"), "archive.tar.swf");
        assert_eq!(artifact_name("README", "swf"), "README.swf");
        assert_eq!(artifact_name(".hidden", "swf"), ".hidden.swf");
    }

    #[test]
    fn disabled_service_skips_everything() {
        let config = DocViewConfig::builder().enabled(false).build().unwrap();
        let (_dir, svc) = service(&[("a.pdf", b"%PDF-1.4")], config);
        let doc = NodePath::new("/docs/a.pdf");
        assert_eq!(
            svc.create_thumbnail(&doc, "thumbnail", 150).unwrap(),
            Outcome::Skipped(SkipReason::ServiceDisabled)
        );
        assert_eq!(
            svc.convert(&doc, true).unwrap(),
            Outcome::Skipped(SkipReason::ServiceDisabled)
        );
        assert_eq!(
            svc.create_view(&doc).unwrap(),
            Outcome::Skipped(SkipReason::ServiceDisabled)
        );
    }

    #[test]
    fn empty_format_list_behaves_like_disabled() {
        let config = DocViewConfig::builder()
            .supported_document_formats(Vec::<String>::new())
            .build()
            .unwrap();
        let (_dir, svc) = service(&[("a.pdf", b"%PDF-1.4")], config);
        assert_eq!(
            svc.create_thumbnail(&NodePath::new("/docs/a.pdf"), "thumbnail", 150)
                .unwrap(),
            Outcome::Skipped(SkipReason::ServiceDisabled)
        );
    }

    #[test]
    fn unsupported_format_is_skipped() {
        let (_dir, svc) = service(&[("photo.png", b"\x89PNG")], DocViewConfig::default());
        let outcome = svc
            .create_thumbnail(&NodePath::new("/docs/photo.png"), "thumbnail", 150)
            .unwrap();
        assert_eq!(
            outcome,
            Outcome::Skipped(SkipReason::UnsupportedFormat {
                mime: Some("image/png".into())
            })
        );
    }

    #[test]
    fn folder_is_not_a_file() {
        let (_dir, svc) = service(&[], DocViewConfig::default());
        assert_eq!(
            svc.convert(&NodePath::new("/docs"), true).unwrap(),
            Outcome::Skipped(SkipReason::NotAFile)
        );
    }

    #[test]
    fn pdf_passes_through_convert_to_pdf() {
        let (dir, svc) = service(&[("a.pdf", b"%PDF-1.4")], DocViewConfig::default());
        let path = dir.path().join("docs/a.pdf");
        let prepared = svc.convert_to_pdf(&path, PDF_MIME_TYPE).unwrap().unwrap();
        assert!(!prepared.is_converted());
        assert_eq!(prepared.path(), path.as_path());
    }

    #[test]
    fn disabled_office_converter_yields_no_pdf() {
        let (dir, svc) = service(&[("a.docx", b"PK")], DocViewConfig::default());
        let prepared = svc
            .convert_to_pdf(&dir.path().join("docs/a.docx"), "application/msword")
            .unwrap();
        assert!(prepared.is_none());
    }

    #[test]
    fn thumbnail_from_pdf_bytes() {
        let (_dir, svc) = service(&[("a.pdf", b"%PDF-1.4")], DocViewConfig::default());
        let doc = NodePath::new("/docs/a.pdf");
        let outcome = svc.create_thumbnail(&doc, "thumbnail", 150).unwrap();
        let node = outcome.node().unwrap().clone();
        assert_eq!(node.as_str(), "/docs/a.pdf/thumbnail");

        let repo = svc.repository();
        assert_eq!(
            repo.get_property(&node, PROP_HEIGHT).unwrap(),
            Some(PropertyValue::Long(150))
        );
        assert_eq!(
            repo.get_property(&node, PROP_WIDTH).unwrap(),
            Some(PropertyValue::Long(115))
        );
        assert!(repo.has_mixin(&node, MIXIN_IMAGE).unwrap());
        assert!(repo.get_property(&doc, PROP_LAST_MODIFIED).unwrap().is_some());
    }

    #[test]
    fn zero_thumbnail_size_is_rejected() {
        let (_dir, svc) = service(&[("a.pdf", b"%PDF-1.4")], DocViewConfig::default());
        let err = svc
            .create_thumbnail(&NodePath::new("/docs/a.pdf"), "thumbnail", 0)
            .unwrap_err();
        assert!(matches!(err, DocViewError::InvalidConfig(_)));
    }

    #[test]
    fn missing_first_page_is_no_image() {
        let (_dir, svc) = service(&[("a.pdf", b"%PDF-1.4")], DocViewConfig::default());
        let svc = svc.with_renderer(NoPagesRenderer);
        let doc = NodePath::new("/docs/a.pdf");
        assert_eq!(
            svc.create_thumbnail(&doc, "thumbnail", 150).unwrap(),
            Outcome::Skipped(SkipReason::NoPageImage)
        );
        assert_eq!(svc.repository().child(&doc, "thumbnail").unwrap(), None);
    }

    #[test]
    fn disabled_vector_converter_skips_convert_and_view() {
        let config = DocViewConfig::builder().vector_enabled(false).build().unwrap();
        let (_dir, svc) = service(&[("a.pdf", b"%PDF-1.4")], config);
        let doc = NodePath::new("/docs/a.pdf");
        assert_eq!(
            svc.convert(&doc, true).unwrap(),
            Outcome::Skipped(SkipReason::VectorConverterDisabled)
        );
        assert_eq!(
            svc.create_view(&doc).unwrap(),
            Outcome::Skipped(SkipReason::VectorConverterDisabled)
        );
        assert!(svc
            .convert_file(Path::new("/tmp/a.pdf"), PDF_MIME_TYPE)
            .unwrap()
            .is_none());
    }

    #[test]
    fn file_converter_needs_no_repository() {
        let dir = TempDir::new().unwrap();
        let pdf = dir.path().join("a.pdf");
        std::fs::write(&pdf, b"%PDF-1.4").unwrap();
        let files = FileConverter::from_config(&DocViewConfig::default());

        let prepared = files.convert_to_pdf(&pdf, PDF_MIME_TYPE).unwrap().unwrap();
        assert!(!prepared.is_converted());
        assert_eq!(prepared.path(), pdf.as_path());
        assert!(files
            .convert_to_pdf(&dir.path().join("a.docx"), "application/msword")
            .unwrap()
            .is_none());
    }

    #[test]
    fn file_converter_with_disabled_vector_converter() {
        let config = DocViewConfig::builder().vector_enabled(false).build().unwrap();
        let files = FileConverter::from_config(&config);
        assert!(files
            .convert_file(Path::new("/tmp/a.pdf"), PDF_MIME_TYPE)
            .unwrap()
            .is_none());
    }

    #[test]
    fn skip_reason_display() {
        assert_eq!(
            SkipReason::UnsupportedFormat {
                mime: Some("image/png".into())
            }
            .to_string(),
            "unsupported format image/png"
        );
        assert_eq!(SkipReason::NoPageImage.to_string(), "no page image");
    }
}
