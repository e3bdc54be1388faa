//! # docview
//!
//! Turn office documents and PDFs stored in a content repository into
//! web-viewable vector files and first-page thumbnails.
//!
//! ## What this crate does (and does not)
//!
//! It sequences existing converters and owns the temp-file lifecycle around
//! them. Rendering, PDF generation and vector conversion are done by
//! external tools or libraries (pdfium, poppler, LibreOffice, pdf2swf); the
//! repository is reached through the [`ContentRepository`] trait.
//!
//! ## Pipeline Overview
//!
//! ```text
//! document node
//!  │
//!  ├─ 1. Guard     service enabled? mime type in a supported group?
//!  ├─ 2. Download  node content into a per-job scratch directory
//!  ├─ 3. PDF       pass PDFs through, convert others via LibreOffice
//!  ├─ 4a. Vector   pdf2swf → sibling file or `swfView` child
//!  └─ 4b. Raster   page 0 → fit into box → PNG/JPEG → thumbnail child
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docview::{DocViewConfig, DocumentViewService, FsRepository, NodePath};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let repo = FsRepository::open("/srv/documents")?;
//!     let service = DocumentViewService::new(DocViewConfig::default(), repo);
//!
//!     let doc = NodePath::new("/reports/q1.pdf");
//!     let outcome = service.create_thumbnail(&doc, "thumbnail", 150)?;
//!     eprintln!("{outcome:?}");
//!     Ok(())
//! }
//! ```
//!
//! Wrap the service in a [`DocumentRuleService`] when conversions are
//! triggered by repository events: its entry points log failures instead of
//! returning them.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `docview` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! docview = { version = "0.1", default-features = false }
//! ```
//!
//! ## Choosing a Renderer
//!
//! | Backend | Needs | Notes |
//! |---------|-------|-------|
//! | `pdfium` (default) | libpdfium shared library | in-process, set `PDFIUM_LIB_PATH` if not on the system path |
//! | `pdftoppm` | poppler-utils | one process per page |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod mime;
pub mod pipeline;
pub mod progress;
pub mod repository;
pub mod service;
pub mod trigger;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    DocViewConfig, DocViewConfigBuilder, ImageConverterConfig, OfficeConverterConfig, PixelFormat,
    RendererBackend, ThumbnailFormat, VectorConverterConfig,
};
pub use error::{DocViewError, RepositoryError};
pub use mime::{GroupNames, MimeRegistry};
pub use pipeline::input::{PdfSource, PreparedPdf};
pub use pipeline::office::{DisabledDocumentConverter, DocumentConverter, LibreOfficeConverter};
pub use pipeline::poppler::PdftoppmRenderer;
pub use pipeline::render::{renderer_from_config, PageRenderer, PdfiumRenderer};
pub use pipeline::scale::resize;
pub use pipeline::vector::{CommandLineVectorConverter, VectorConverter};
pub use progress::{DispatchProgressCallback, NoopProgressCallback};
pub use repository::{ContentRepository, FsRepository, NodePath, PropertyValue};
pub use service::{DocumentViewService, FileConverter, Outcome, SkipReason};
pub use trigger::{DispatchSummary, DocumentAddedEvent, DocumentRule, DocumentRuleService};
