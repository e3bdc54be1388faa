//! Progress-callback trait for rule dispatch over many documents.
//!
//! Pass a `&dyn DispatchProgressCallback` to
//! [`crate::trigger::DocumentRuleService::dispatch`] to receive an event per
//! document and per rule. The CLI forwards these to an `indicatif` progress
//! bar; library users can forward them anywhere.
//!
//! # Example
//!
//! ```rust
//! use docview::DispatchProgressCallback;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! struct Counter(AtomicUsize);
//!
//! impl DispatchProgressCallback for Counter {
//!     fn on_document_complete(&self, _index: usize, _total: usize, _document: &str) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!     }
//! }
//!
//! let counter = Counter(AtomicUsize::new(0));
//! counter.on_document_complete(1, 3, "/docs/a.pdf");
//! assert_eq!(counter.0.load(Ordering::SeqCst), 1);
//! ```

/// Called by the rule dispatcher as it works through document events.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. `index` is 1-based.
pub trait DispatchProgressCallback: Send + Sync {
    /// Called once before the first document.
    fn on_dispatch_start(&self, total_documents: usize) {
        let _ = total_documents;
    }

    /// Called before the rules for a document run.
    fn on_document_start(&self, index: usize, total: usize, document: &str) {
        let _ = (index, total, document);
    }

    /// Called after a rule finished, with `true` if it produced an artifact.
    fn on_rule_complete(&self, document: &str, rule: &str, completed: bool) {
        let _ = (document, rule, completed);
    }

    /// Called when a rule failed. The failure has already been logged.
    fn on_rule_error(&self, document: &str, rule: &str, error: &str) {
        let _ = (document, rule, error);
    }

    /// Called after every rule for a document has run.
    fn on_document_complete(&self, index: usize, total: usize, document: &str) {
        let _ = (index, total, document);
    }

    /// Called once after all documents.
    fn on_dispatch_complete(&self, total_documents: usize, failed_rules: usize) {
        let _ = (total_documents, failed_rules);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl DispatchProgressCallback for NoopProgressCallback {}
