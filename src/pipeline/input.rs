//! Input resolution: the two shapes a PDF can arrive in, and the two shapes
//! a "ready" PDF can take once the pipeline is done preparing it.
//!
//! ## Temp-file ownership
//!
//! A converted PDF is held as a [`TempPath`] inside
//! [`PreparedPdf::Converted`] and deleted when that value drops. Originals
//! are never deleted.

use crate::error::DocViewError;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::{NamedTempFile, TempPath};
use tracing::debug;

/// Prefix for every scratch file the pipeline creates.
pub const TEMP_PREFIX: &str = "doc-viewer";

/// How far into a source the `%PDF` header is looked for.
pub const HEADER_WINDOW: usize = 1024;

/// A PDF given either as a file or as bytes already in memory.
#[derive(Debug, Clone)]
pub enum PdfSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

impl PdfSource {
    /// Short label for log lines and error messages.
    pub fn describe(&self) -> String {
        match self {
            PdfSource::Path(p) => p.display().to_string(),
            PdfSource::Bytes(b) => format!("<{} bytes in memory>", b.len()),
        }
    }

    /// Verify that a `%PDF` header appears within the first
    /// [`HEADER_WINDOW`] bytes before handing the source to a backend.
    ///
    /// Leading junk such as a byte-order mark or a mail preamble is
    /// tolerated, as pdfium and poppler both accept it.
    pub fn check_magic(&self) -> Result<(), DocViewError> {
        let head = match self {
            PdfSource::Bytes(b) => b[..b.len().min(HEADER_WINDOW)].to_vec(),
            PdfSource::Path(p) => {
                let f = std::fs::File::open(p)
                    .map_err(|e| DocViewError::io(format!("open {}", p.display()), e))?;
                let mut buf = Vec::with_capacity(HEADER_WINDOW);
                f.take(HEADER_WINDOW as u64)
                    .read_to_end(&mut buf)
                    .map_err(|e| DocViewError::io(format!("read {}", p.display()), e))?;
                buf
            }
        };
        if !head.windows(4).any(|w| w == b"%PDF") {
            let shown = &head[..head.len().min(4)];
            return Err(DocViewError::Decode {
                source_name: self.describe(),
                detail: format!("not a PDF (first bytes: {shown:?})"),
            });
        }
        Ok(())
    }

    /// Materialise the source as a file path.
    ///
    /// Byte sources are spilled to a temp file which is returned alongside
    /// the path; keep it alive until the path is no longer needed.
    pub fn to_local_path(&self) -> Result<(PathBuf, Option<TempPath>), DocViewError> {
        match self {
            PdfSource::Path(p) => Ok((p.clone(), None)),
            PdfSource::Bytes(bytes) => {
                let mut tmp = tempfile::Builder::new()
                    .prefix(TEMP_PREFIX)
                    .suffix(".pdf")
                    .tempfile()
                    .map_err(|e| DocViewError::io("create temp PDF", e))?;
                tmp.write_all(bytes)
                    .map_err(|e| DocViewError::io("write temp PDF", e))?;
                let path = tmp.into_temp_path();
                debug!("Spilled {} PDF bytes to {}", bytes.len(), path.display());
                Ok((path.to_path_buf(), Some(path)))
            }
        }
    }
}

impl From<PathBuf> for PdfSource {
    fn from(p: PathBuf) -> Self {
        PdfSource::Path(p)
    }
}

impl From<&Path> for PdfSource {
    fn from(p: &Path) -> Self {
        PdfSource::Path(p.to_path_buf())
    }
}

impl From<Vec<u8>> for PdfSource {
    fn from(b: Vec<u8>) -> Self {
        PdfSource::Bytes(b)
    }
}

/// A PDF ready for the next stage.
#[derive(Debug)]
pub enum PreparedPdf {
    /// The source already was a PDF; it is passed through untouched.
    Original(PathBuf),
    /// The source was converted; the temp file is deleted on drop.
    Converted(TempPath),
}

impl PreparedPdf {
    /// Path to the PDF regardless of how it was obtained.
    pub fn path(&self) -> &Path {
        match self {
            PreparedPdf::Original(p) => p.as_path(),
            PreparedPdf::Converted(t) => &**t,
        }
    }

    pub fn is_converted(&self) -> bool {
        matches!(self, PreparedPdf::Converted(_))
    }
}

/// Create an empty, uniquely named scratch file that is removed on drop.
pub fn create_temp_file(suffix: &str) -> Result<TempPath, DocViewError> {
    let file: NamedTempFile = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .suffix(suffix)
        .tempfile()
        .map_err(|e| DocViewError::io("create temp file", e))?;
    Ok(file.into_temp_path())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magic_accepts_pdf_bytes() {
        let src = PdfSource::Bytes(b"%PDF-1.4\n...".to_vec());
        assert!(src.check_magic().is_ok());
    }

    #[test]
    fn magic_rejects_other_bytes() {
        let err = PdfSource::Bytes(b"PK\x03\x04".to_vec())
            .check_magic()
            .unwrap_err();
        assert!(matches!(err, DocViewError::Decode { .. }));
    }

    #[test]
    fn magic_rejects_short_input() {
        assert!(PdfSource::Bytes(b"%P".to_vec()).check_magic().is_err());
    }

    #[test]
    fn magic_tolerates_leading_bytes() {
        let bom = PdfSource::Bytes(b"\xEF\xBB\xBF%PDF-1.4\n%%EOF\n".to_vec());
        assert!(bom.check_magic().is_ok());

        let mut preamble = b"Content-Type: application/pdf\r\n\r\n".to_vec();
        preamble.extend_from_slice(b"%PDF-1.7\n");
        assert!(PdfSource::Bytes(preamble).check_magic().is_ok());
    }

    #[test]
    fn magic_outside_header_window_is_rejected() {
        let mut bytes = vec![b' '; HEADER_WINDOW];
        bytes.extend_from_slice(b"%PDF-1.4");
        let err = PdfSource::Bytes(bytes).check_magic().unwrap_err();
        assert!(matches!(err, DocViewError::Decode { .. }));
    }

    #[test]
    fn magic_after_preamble_in_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"\xEF\xBB\xBF%PDF-1.5\n").unwrap();
        assert!(PdfSource::Path(f.path().to_path_buf()).check_magic().is_ok());
    }

    #[test]
    fn magic_reads_from_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"%PDF-1.7").unwrap();
        assert!(PdfSource::Path(f.path().to_path_buf()).check_magic().is_ok());
    }

    #[test]
    fn bytes_are_spilled_and_cleaned_up() {
        let src = PdfSource::Bytes(b"%PDF-1.4".to_vec());
        let (path, guard) = src.to_local_path().unwrap();
        assert!(path.exists());
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.4");
        drop(guard);
        assert!(!path.exists());
    }

    #[test]
    fn path_source_is_not_copied() {
        let src = PdfSource::Path(PathBuf::from("/tmp/x.pdf"));
        let (path, guard) = src.to_local_path().unwrap();
        assert_eq!(path, PathBuf::from("/tmp/x.pdf"));
        assert!(guard.is_none());
    }

    #[test]
    fn converted_pdf_is_deleted_on_drop() {
        let tmp = create_temp_file(".pdf").unwrap();
        let path = tmp.to_path_buf();
        let prepared = PreparedPdf::Converted(tmp);
        assert!(prepared.is_converted());
        assert!(prepared.path().exists());
        drop(prepared);
        assert!(!path.exists());
    }

    #[test]
    fn original_pdf_survives_drop() {
        let f = tempfile::NamedTempFile::new().unwrap();
        let prepared = PreparedPdf::Original(f.path().to_path_buf());
        drop(prepared);
        assert!(f.path().exists());
    }
}
