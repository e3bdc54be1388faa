//! Rule-trigger adapter: runs service operations when a document is added
//! and keeps their failures away from the caller.
//!
//! A content store fires a [`DocumentAddedEvent`] for each new document. The
//! configured [`DocumentRule`]s are applied through [`DocumentRuleService`],
//! whose entry points never return an error: a failed conversion is logged
//! at `error` and leaves the artifact absent, so one broken document cannot
//! block the save that triggered it.

use crate::error::DocViewError;
use crate::progress::DispatchProgressCallback;
use crate::repository::{ContentRepository, NodePath, PROP_THUMBNAIL_SIZE};
use crate::service::{DocumentViewService, Outcome};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, error};

pub const DEFAULT_THUMBNAIL_NAME: &str = "thumbnail";
pub const DEFAULT_THUMBNAIL_SIZE: u32 = 150;

/// A document node was created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentAddedEvent {
    pub node: NodePath,
}

impl DocumentAddedEvent {
    pub fn new(node: impl Into<NodePath>) -> Self {
        Self { node: node.into() }
    }
}

/// An action to run for each added document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum DocumentRule {
    /// Write a vector file next to the document.
    Convert { overwrite_if_exists: bool },
    /// Write a thumbnail child. The parent folder's
    /// `j:documentRuleThumbnailSize` overrides `size` when positive.
    CreateThumbnail { name: String, size: u32 },
    /// Write the `swfView` child.
    CreateView,
}

impl DocumentRule {
    /// Thumbnail rule with the default name and size.
    pub fn thumbnail() -> Self {
        DocumentRule::CreateThumbnail {
            name: DEFAULT_THUMBNAIL_NAME.to_string(),
            size: DEFAULT_THUMBNAIL_SIZE,
        }
    }

    /// Short label for logs and progress output.
    pub fn label(&self) -> &'static str {
        match self {
            DocumentRule::Convert { .. } => "convert",
            DocumentRule::CreateThumbnail { .. } => "thumbnail",
            DocumentRule::CreateView => "view",
        }
    }
}

/// Counts from one [`DocumentRuleService::dispatch`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub documents: usize,
    /// Rule runs that wrote an artifact.
    pub completed: usize,
    /// Rule runs that were no-ops (disabled, unsupported format, …).
    pub skipped: usize,
    /// Rule runs that failed; each failure was logged.
    pub failed: usize,
}

impl fmt::Display for DispatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} documents: {} completed, {} skipped, {} failed",
            self.documents, self.completed, self.skipped, self.failed
        )
    }
}

/// Error-swallowing front of a [`DocumentViewService`].
pub struct DocumentRuleService<R: ContentRepository> {
    service: DocumentViewService<R>,
}

impl<R: ContentRepository> DocumentRuleService<R> {
    pub fn new(service: DocumentViewService<R>) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &DocumentViewService<R> {
        &self.service
    }

    /// Convert the added document into a sibling vector file.
    ///
    /// `None` when the conversion failed; the error has been logged.
    pub fn convert(&self, event: &DocumentAddedEvent, overwrite_if_exists: bool) -> Option<Outcome> {
        self.run(event, &DocumentRule::Convert { overwrite_if_exists })
    }

    /// Create a thumbnail of the added document. See [`DocumentRule::CreateThumbnail`].
    pub fn create_thumbnail(
        &self,
        event: &DocumentAddedEvent,
        name: &str,
        size: u32,
    ) -> Option<Outcome> {
        self.run(
            event,
            &DocumentRule::CreateThumbnail {
                name: name.to_string(),
                size,
            },
        )
    }

    /// Create the vector view child of the added document.
    pub fn create_view(&self, event: &DocumentAddedEvent) -> Option<Outcome> {
        self.run(event, &DocumentRule::CreateView)
    }

    /// Thumbnail size for `document`: the parent folder's
    /// `j:documentRuleThumbnailSize` when it is a positive integer, else
    /// `default`.
    pub fn thumbnail_size(&self, document: &NodePath, default: u32) -> u32 {
        let repo = self.service.repository();
        let lookup = || -> Result<Option<u32>, DocViewError> {
            let Some(folder) = repo.parent(document)? else {
                return Ok(None);
            };
            let value = repo.get_property(&folder, PROP_THUMBNAIL_SIZE)?;
            Ok(value
                .and_then(|v| v.as_long())
                .filter(|v| *v > 0)
                .map(|v| u32::try_from(v).unwrap_or(u32::MAX)))
        };
        match lookup() {
            Ok(Some(size)) => {
                debug!("Folder of {} sets thumbnail size {}", document, size);
                size
            }
            Ok(None) => default,
            Err(e) => {
                debug!("Cannot read thumbnail size for {}: {}", document, e);
                default
            }
        }
    }

    /// Run `rule` for `event` without swallowing errors.
    pub fn apply(
        &self,
        event: &DocumentAddedEvent,
        rule: &DocumentRule,
    ) -> Result<Outcome, DocViewError> {
        let document = &event.node;
        match rule {
            DocumentRule::Convert {
                overwrite_if_exists,
            } => self.service.convert(document, *overwrite_if_exists),
            DocumentRule::CreateThumbnail { name, size } => {
                let size = self.thumbnail_size(document, *size);
                self.service.create_thumbnail(document, name, size)
            }
            DocumentRule::CreateView => self.service.create_view(document),
        }
    }

    fn run(&self, event: &DocumentAddedEvent, rule: &DocumentRule) -> Option<Outcome> {
        match self.apply(event, rule) {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                error!("Failed to {} {}: {}", rule.label(), event.node, e);
                None
            }
        }
    }

    /// Apply every rule to every event, in order.
    pub fn dispatch(
        &self,
        events: &[DocumentAddedEvent],
        rules: &[DocumentRule],
        progress: Option<&dyn DispatchProgressCallback>,
    ) -> DispatchSummary {
        let total = events.len();
        let mut summary = DispatchSummary {
            documents: total,
            ..Default::default()
        };
        if let Some(cb) = progress {
            cb.on_dispatch_start(total);
        }

        for (idx, event) in events.iter().enumerate() {
            let document = event.node.as_str();
            if let Some(cb) = progress {
                cb.on_document_start(idx + 1, total, document);
            }
            for rule in rules {
                match self.apply(event, rule) {
                    Ok(outcome) => {
                        if outcome.is_completed() {
                            summary.completed += 1;
                        } else {
                            summary.skipped += 1;
                        }
                        if let Some(cb) = progress {
                            cb.on_rule_complete(document, rule.label(), outcome.is_completed());
                        }
                    }
                    Err(e) => {
                        error!("Failed to {} {}: {}", rule.label(), event.node, e);
                        summary.failed += 1;
                        if let Some(cb) = progress {
                            cb.on_rule_error(document, rule.label(), &e.to_string());
                        }
                    }
                }
            }
            if let Some(cb) = progress {
                cb.on_document_complete(idx + 1, total, document);
            }
        }

        if let Some(cb) = progress {
            cb.on_dispatch_complete(total, summary.failed);
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DocViewConfig;
    use crate::pipeline::input::PdfSource;
    use crate::pipeline::render::PageRenderer;
    use crate::repository::{FsRepository, PropertyValue, PROP_WIDTH};
    use crate::service::SkipReason;
    use image::{DynamicImage, Rgb, RgbImage};
    use tempfile::TempDir;

    struct SquareRenderer;

    impl PageRenderer for SquareRenderer {
        fn name(&self) -> &'static str {
            "square"
        }

        fn render_page(
            &self,
            source: &PdfSource,
            _page_index: usize,
        ) -> Result<DynamicImage, DocViewError> {
            source.check_magic()?;
            Ok(DynamicImage::ImageRgb8(RgbImage::from_pixel(
                600,
                600,
                Rgb([0, 0, 0]),
            )))
        }
    }

    fn rules_service(files: &[(&str, &[u8])]) -> (TempDir, DocumentRuleService<FsRepository>) {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("docs")).unwrap();
        for (name, content) in files {
            std::fs::write(dir.path().join("docs").join(name), content).unwrap();
        }
        let repo = FsRepository::open(dir.path()).unwrap();
        let service = DocumentViewService::new(DocViewConfig::default(), repo)
            .with_renderer(SquareRenderer);
        (dir, DocumentRuleService::new(service))
    }

    #[test]
    fn errors_are_swallowed() {
        let (_dir, rules) = rules_service(&[("broken.pdf", b"not a pdf")]);
        let event = DocumentAddedEvent::new("/docs/broken.pdf");
        assert_eq!(rules.create_thumbnail(&event, "thumbnail", 150), None);
        assert!(rules
            .service()
            .repository()
            .child(&event.node, "thumbnail")
            .unwrap()
            .is_none());
    }

    #[test]
    fn missing_and_invalid_documents_do_not_raise() {
        let (_dir, rules) = rules_service(&[]);
        let event = DocumentAddedEvent::new("/docs/gone.pdf");
        assert_eq!(
            rules.create_thumbnail(&event, "thumbnail", 150),
            Some(Outcome::Skipped(SkipReason::NotAFile))
        );
        assert_eq!(rules.create_view(&DocumentAddedEvent::new("/../x")), None);
    }

    #[test]
    fn folder_property_overrides_thumbnail_size() {
        let (_dir, rules) = rules_service(&[("a.pdf", b"%PDF-1.4")]);
        let folder = NodePath::new("/docs");
        let repo = rules.service().repository();
        let doc = NodePath::new("/docs/a.pdf");
        assert_eq!(rules.thumbnail_size(&doc, 150), 150);

        repo.set_property(&folder, PROP_THUMBNAIL_SIZE, PropertyValue::Long(64))
            .unwrap();
        assert_eq!(rules.thumbnail_size(&doc, 150), 64);

        let outcome = rules
            .create_thumbnail(&DocumentAddedEvent::new("/docs/a.pdf"), "thumbnail", 150)
            .unwrap();
        let node = outcome.node().unwrap();
        assert_eq!(
            repo.get_property(node, PROP_WIDTH).unwrap(),
            Some(PropertyValue::Long(64))
        );
    }

    #[test]
    fn non_positive_folder_size_is_ignored() {
        let (_dir, rules) = rules_service(&[("a.pdf", b"%PDF-1.4")]);
        let repo = rules.service().repository();
        repo.set_property(&NodePath::new("/docs"), PROP_THUMBNAIL_SIZE, PropertyValue::Long(0))
            .unwrap();
        assert_eq!(rules.thumbnail_size(&NodePath::new("/docs/a.pdf"), 150), 150);
    }

    #[test]
    fn dispatch_counts_outcomes() {
        let (_dir, rules) =
            rules_service(&[("a.pdf", b"%PDF-1.4"), ("b.pdf", b"junk"), ("c.png", b"\x89PNG")]);
        let events = [
            DocumentAddedEvent::new("/docs/a.pdf"),
            DocumentAddedEvent::new("/docs/b.pdf"),
            DocumentAddedEvent::new("/docs/c.png"),
        ];
        let summary = rules.dispatch(&events, &[DocumentRule::thumbnail()], None);
        assert_eq!(
            summary,
            DispatchSummary {
                documents: 3,
                completed: 1,
                skipped: 1,
                failed: 1,
            }
        );
        assert!(summary.to_string().contains("1 failed"));
    }

    #[test]
    fn apply_reports_skip_reasons() {
        let (_dir, rules) = rules_service(&[("c.png", b"\x89PNG")]);
        let outcome = rules
            .apply(&DocumentAddedEvent::new("/docs/c.png"), &DocumentRule::CreateView)
            .unwrap();
        assert!(matches!(
            outcome,
            Outcome::Skipped(SkipReason::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn rule_serde_shape() {
        let json = serde_json::to_string(&DocumentRule::thumbnail()).unwrap();
        assert_eq!(json, r#"{"rule":"create_thumbnail","name":"thumbnail","size":150}"#);
        let rule: DocumentRule = serde_json::from_str(r#"{"rule":"create_view"}"#).unwrap();
        assert_eq!(rule, DocumentRule::CreateView);
    }
}
