//! PDF → vector-animation conversion through an external tool.
//!
//! The default configuration drives `pdf2swf`:
//!
//! ```text
//! pdf2swf <in.pdf> -o <out.swf> -f -T 9 -t -s storeallcharacters
//! ```
//!
//! The input and output paths are bound as whole arguments, never spliced
//! into a shell string.

use crate::config::VectorConverterConfig;
use crate::error::DocViewError;
use crate::pipeline::input::create_temp_file;
use crate::pipeline::process::CommandLine;
use std::path::Path;
use std::time::Duration;
use tempfile::TempPath;
use tracing::{debug, info};

/// Converts a PDF file into a vector-format file.
pub trait VectorConverter: Send + Sync {
    fn is_enabled(&self) -> bool;

    /// File extension of produced artifacts, without the dot.
    fn output_extension(&self) -> &str;

    fn output_mime_type(&self) -> &str;

    /// Convert into a fresh temp file.
    ///
    /// `Ok(None)` when the converter is disabled.
    fn convert(&self, pdf: &Path) -> Result<Option<TempPath>, DocViewError> {
        if !self.is_enabled() {
            info!("Vector converter is disabled, skipping {}", pdf.display());
            return Ok(None);
        }
        let out = create_temp_file(&format!(".{}", self.output_extension()))?;
        self.convert_into(pdf, &out)?;
        Ok(Some(out))
    }

    /// Convert into `out`, replacing it.
    ///
    /// `Ok(false)` when the converter is disabled.
    fn convert_into(&self, pdf: &Path, out: &Path) -> Result<bool, DocViewError>;
}

/// [`VectorConverter`] that runs a configured command line.
#[derive(Debug, Clone)]
pub struct CommandLineVectorConverter {
    config: VectorConverterConfig,
}

impl CommandLineVectorConverter {
    pub fn new(config: VectorConverterConfig) -> Self {
        Self { config }
    }

    fn command(&self, pdf: &Path, out: &Path) -> CommandLine {
        CommandLine::new(&self.config.executable_path)
            .arg("${inFile}")
            .arg("-o")
            .arg("${outFile}")
            .args_str(&self.config.parameters)
            .substitute("inFile", pdf)
            .substitute("outFile", out)
    }
}

impl VectorConverter for CommandLineVectorConverter {
    fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    fn output_extension(&self) -> &str {
        &self.config.output_extension
    }

    fn output_mime_type(&self) -> &str {
        &self.config.output_mime_type
    }

    fn convert_into(&self, pdf: &Path, out: &Path) -> Result<bool, DocViewError> {
        if !self.is_enabled() {
            info!("Vector converter is disabled, skipping {}", pdf.display());
            return Ok(false);
        }

        let command = self.command(pdf, out);
        let tool = command.tool_name();
        let output = command.run(self.config.timeout_secs.map(Duration::from_secs))?;

        if !output.success() {
            return Err(output.failure(tool));
        }
        if !output.stdout.trim().is_empty() {
            debug!("{} output: {}", tool, output.stdout.trim());
        }

        let produced = std::fs::metadata(out).map(|m| m.len()).unwrap_or(0);
        if produced == 0 {
            return Err(DocViewError::NoOutput {
                tool,
                path: out.to_path_buf(),
            });
        }

        info!(
            "Converted {} into {} ({} bytes) in {} ms",
            pdf.display(),
            out.display(),
            produced,
            output.duration.as_millis()
        );
        Ok(true)
    }
}
