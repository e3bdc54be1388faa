//! Per-invocation conversion state.
//!
//! A [`ConversionJob`] exists for the duration of one top-level service call.
//! It owns a private scratch directory; every temp file the job creates
//! (downloaded source, intermediate PDF, converter output) lives there or is
//! held as a [`tempfile::TempPath`] by the job's caller, so nothing outlives
//! the job. Removal is best-effort: `TempDir` ignores delete failures on drop.

use crate::error::DocViewError;
use crate::pipeline::input::TEMP_PREFIX;
use crate::repository::NodePath;
use std::path::PathBuf;
use std::time::Instant;
use tempfile::TempDir;

/// What to do when the target artifact name is already taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverwritePolicy {
    /// Replace the existing artifact.
    Overwrite,
    /// Pick the next free name instead.
    KeepExisting,
}

impl From<bool> for OverwritePolicy {
    fn from(overwrite_if_exists: bool) -> Self {
        if overwrite_if_exists {
            OverwritePolicy::Overwrite
        } else {
            OverwritePolicy::KeepExisting
        }
    }
}

/// Ephemeral state for one conversion.
#[derive(Debug)]
pub struct ConversionJob {
    pub document: NodePath,
    pub mime_type: String,
    pub overwrite: OverwritePolicy,
    scratch: TempDir,
    started: Instant,
}

impl ConversionJob {
    pub fn new(
        document: NodePath,
        mime_type: impl Into<String>,
        overwrite: OverwritePolicy,
    ) -> Result<Self, DocViewError> {
        let scratch = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempdir()
            .map_err(|e| DocViewError::io("create job scratch directory", e))?;
        Ok(Self {
            document,
            mime_type: mime_type.into(),
            overwrite,
            scratch,
            started: Instant::now(),
        })
    }

    /// A path inside the job's scratch directory. The file is not created.
    pub fn scratch_file(&self, name: &str) -> PathBuf {
        self.scratch.path().join(name)
    }

    /// Wall-clock time since the job was created.
    pub fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }
}
