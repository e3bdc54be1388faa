//! Office document → PDF conversion.
//!
//! [`LibreOfficeConverter`] runs LibreOffice headless:
//!
//! ```text
//! soffice -env:UserInstallation=file://<scratch>/profile --headless \
//!         --convert-to pdf --outdir <scratch>/out <source>
//! ```
//!
//! Each run gets its own profile directory so concurrent conversions do not
//! fight over LibreOffice's user-profile lock.

use crate::config::OfficeConverterConfig;
use crate::error::DocViewError;
use crate::mime::PDF_MIME_TYPE;
use crate::pipeline::input::{create_temp_file, TEMP_PREFIX};
use crate::pipeline::process::CommandLine;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempPath;
use tracing::{debug, info};

/// Converts a document file into another format, usually PDF.
pub trait DocumentConverter: Send + Sync {
    fn is_enabled(&self) -> bool;

    /// Convert `source` (of type `source_mime`) into a temp file of type
    /// `target_mime`. The caller owns the returned file.
    fn convert(
        &self,
        source: &Path,
        source_mime: &str,
        target_mime: &str,
    ) -> Result<TempPath, DocViewError>;
}

/// Stand-in used when no document converter is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledDocumentConverter;

impl DocumentConverter for DisabledDocumentConverter {
    fn is_enabled(&self) -> bool {
        false
    }

    fn convert(
        &self,
        _source: &Path,
        source_mime: &str,
        target_mime: &str,
    ) -> Result<TempPath, DocViewError> {
        Err(DocViewError::UnsupportedConversion {
            from: source_mime.to_string(),
            to: target_mime.to_string(),
        })
    }
}

/// [`DocumentConverter`] backed by a LibreOffice installation.
#[derive(Debug, Clone)]
pub struct LibreOfficeConverter {
    config: OfficeConverterConfig,
}

impl LibreOfficeConverter {
    pub fn new(config: OfficeConverterConfig) -> Self {
        Self { config }
    }

    fn command(&self, source: &Path, profile: &Path, out_dir: &Path) -> CommandLine {
        CommandLine::new(&self.config.executable_path)
            .arg("-env:UserInstallation=file://${profile}")
            .arg("--headless")
            .arg("--convert-to")
            .arg("pdf")
            .arg("--outdir")
            .arg("${outDir}")
            .arg("${inFile}")
            .substitute("profile", profile)
            .substitute("outDir", out_dir)
            .substitute("inFile", source)
    }
}

impl DocumentConverter for LibreOfficeConverter {
    fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    fn convert(
        &self,
        source: &Path,
        source_mime: &str,
        target_mime: &str,
    ) -> Result<TempPath, DocViewError> {
        if target_mime != PDF_MIME_TYPE {
            return Err(DocViewError::UnsupportedConversion {
                from: source_mime.to_string(),
                to: target_mime.to_string(),
            });
        }

        let scratch = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempdir()
            .map_err(|e| DocViewError::io("create office scratch directory", e))?;
        let out_dir = scratch.path().join("out");
        std::fs::create_dir_all(&out_dir)
            .map_err(|e| DocViewError::io("create office output directory", e))?;

        let command = self.command(source, &scratch.path().join("profile"), &out_dir);
        let tool = command.tool_name();
        let output = command.run(self.config.timeout_secs.map(Duration::from_secs))?;
        if !output.success() {
            return Err(output.failure(tool));
        }

        let produced = find_pdf(&out_dir, source).ok_or_else(|| DocViewError::NoOutput {
            tool: tool.clone(),
            path: out_dir.clone(),
        })?;

        let target = create_temp_file(".pdf")?;
        if std::fs::rename(&produced, &target).is_err() {
            std::fs::copy(&produced, &target)
                .map_err(|e| DocViewError::io("copy converted PDF", e))?;
        }
        debug!("{} wrote {}", tool, produced.display());
        info!(
            "Converted {} ({}) to PDF in {} ms",
            source.display(),
            source_mime,
            output.duration.as_millis()
        );
        Ok(target)
    }
}

/// LibreOffice names its output after the source stem; fall back to any PDF
/// in the output directory.
fn find_pdf(out_dir: &Path, source: &Path) -> Option<PathBuf> {
    let non_empty = |p: &Path| std::fs::metadata(p).map(|m| m.len() > 0).unwrap_or(false);

    if let Some(stem) = source.file_stem() {
        let expected = out_dir.join(stem).with_extension("pdf");
        if non_empty(&expected) {
            return Some(expected);
        }
    }
    std::fs::read_dir(out_dir)
        .ok()?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .find(|p| p.extension().is_some_and(|e| e.eq_ignore_ascii_case("pdf")) && non_empty(p))
}
