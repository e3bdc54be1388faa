//! Pipeline stages for document conversion.
//!
//! Each submodule implements one step or one external collaborator. The
//! orchestration lives in [`crate::service`]; nothing here touches the
//! content repository.
//!
//! ## Data Flow
//!
//! ```text
//!                      ┌─▶ vector ─────────────────────▶ .swf artifact
//! input ──▶ office ────┤
//! (path/bytes) (→ PDF) └─▶ render ──▶ scale ──▶ encode ─▶ thumbnail
//!                          (page 0)   (box)     (png/jpeg)
//! ```
//!
//! 1. [`input`]: where a PDF lives (file or memory) and who deletes it
//! 2. [`job`]: per-call scratch directory and timing
//! 3. [`office`]: document → PDF, skipped when the source already is a PDF
//! 4. [`vector`]: PDF → vector format through an external tool
//! 5. [`render`] / [`poppler`]: interchangeable PDF → image backends
//! 6. [`scale`]: fit into the thumbnail box, never upscaling
//! 7. [`encode`]: PNG or JPEG bytes for storage
//!
//! [`process`] is the shared boundary to external executables.

pub mod encode;
pub mod input;
pub mod job;
pub mod office;
pub mod poppler;
pub mod process;
pub mod render;
pub mod scale;
pub mod vector;
