//! Error types for the docview library.
//!
//! Two distinct error types reflect two distinct owners:
//!
//! * [`DocViewError`]: raised by the conversion pipeline itself: a PDF that
//!   cannot be decoded, an external tool that exited non-zero, a page index
//!   past the end of the document.
//!
//! * [`RepositoryError`]: raised by a [`crate::repository::ContentRepository`]
//!   implementation. The pipeline never inspects these, it only wraps them
//!   into [`DocViewError::Repository`] so they surface with the node path.
//!
//! "Service disabled" and "unsupported format" are deliberately *not* errors:
//! they come back as [`crate::service::Outcome::Skipped`] inside `Ok`.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the docview pipeline.
#[derive(Debug, Error)]
pub enum DocViewError {
    // ── Rendering errors ──────────────────────────────────────────────────
    /// Requested page is past the end of the document.
    ///
    /// Recoverable: callers treat it as "no image available".
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageNotFound { page: usize, total: usize },

    /// The PDF library could not parse or render the source.
    #[error("Cannot decode PDF {source_name}: {detail}")]
    Decode { source_name: String, detail: String },

    // ── External tool errors ──────────────────────────────────────────────
    /// The tool ran to completion but reported failure.
    ///
    /// `exit_code` is `None` when the process was terminated by a signal.
    #[error("{tool} failed with exit code {exit_code:?}: {stderr}")]
    ExternalToolFailure {
        tool: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    /// The tool exited with 0 but left no usable output behind.
    #[error("{tool} produced no output at '{path}'")]
    NoOutput { tool: String, path: PathBuf },

    /// The executable could not be spawned at all.
    #[error("Cannot start '{tool}': {source}\nCheck the configured executable path.")]
    ToolNotFound {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    /// The tool was killed after exceeding its configured timeout.
    #[error("{tool} timed out after {secs}s and was killed")]
    ToolTimeout { tool: String, secs: u64 },

    /// A document converter was asked for a target format it cannot produce.
    #[error("Cannot convert '{from}' into '{to}'")]
    UnsupportedConversion { from: String, to: String },

    // ── Collaborator errors ───────────────────────────────────────────────
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    // ── I/O and encoding errors ───────────────────────────────────────────
    /// Thumbnail encoding failed.
    #[error("Image encoding failed: {0}")]
    ImageEncode(#[from] image::ImageError),

    /// Temp-file or scratch-directory I/O failed.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder or registry validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium, configure `pdfium_library_path`,\n\
or switch the image backend to `pdftoppm`.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DocViewError {
    /// Wrap an I/O error with a short description of what was being done.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        DocViewError::Io {
            context: context.into(),
            source,
        }
    }
}

/// Errors raised by content repository implementations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// No node exists at the given path.
    #[error("Node not found: '{0}'")]
    NotFound(String),

    /// The path is syntactically invalid (e.g. escapes the repository root).
    #[error("Invalid node path '{0}'")]
    InvalidPath(String),

    /// The operation needs a file node but the node is something else.
    #[error("Node '{0}' is not a file node")]
    NotAFile(String),

    /// Reading or writing node content failed.
    #[error("I/O error on node '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Node metadata could not be read back.
    #[error("Corrupt metadata for node '{path}': {source}")]
    Metadata {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}
