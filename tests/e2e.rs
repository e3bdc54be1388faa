//! End-to-end tests for docview.
//!
//! Every test runs against an `FsRepository` in a temp directory. External
//! tools are replaced by small shell scripts (unix only) and the page
//! renderer by an in-memory fake, except for the pdfium tests, which need a
//! real libpdfium and are gated behind `E2E_ENABLED`.
//!
//! Run with:
//!   cargo test --test e2e -- --nocapture
//!
//! Including the pdfium tests:
//!   E2E_ENABLED=1 PDFIUM_LIB_PATH=/opt/pdfium/lib cargo test --test e2e -- --nocapture

use docview::repository::{
    MIXIN_IMAGE, MIXIN_VECTOR_VIEW, PROP_DATA, PROP_HEIGHT, PROP_MIME_TYPE, PROP_THUMBNAIL_SIZE,
    PROP_WIDTH, VIEW_NODE_NAME,
};
use docview::{
    resize, ContentRepository, DocViewConfig, DocViewError, DocumentAddedEvent, DocumentConverter,
    DocumentRule, DocumentRuleService, DocumentViewService, FsRepository, MimeRegistry, NodePath,
    Outcome, PageRenderer, PdfSource, PdfiumRenderer, PropertyValue, SkipReason,
};
use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::{TempDir, TempPath};

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Skip this test unless E2E_ENABLED is set.
macro_rules! e2e_skip_unless_ready {
    () => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP: set E2E_ENABLED=1 (and PDFIUM_LIB_PATH if needed) to run");
            return;
        }
    }};
}

/// Renders every page as a blank US-letter sheet at 96 dpi.
struct LetterRenderer {
    calls: Arc<AtomicUsize>,
}

impl PageRenderer for LetterRenderer {
    fn name(&self) -> &'static str {
        "letter"
    }

    fn render_page(&self, _source: &PdfSource, _page: usize) -> Result<DynamicImage, DocViewError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(DynamicImage::ImageRgb8(RgbImage::from_pixel(
            816,
            1056,
            Rgb([250, 250, 250]),
        )))
    }
}

/// Writes a fixed PDF for any input and remembers where it put it.
#[derive(Default, Clone)]
struct RecordingConverter {
    calls: Arc<AtomicUsize>,
    produced: Arc<Mutex<Vec<PathBuf>>>,
}

impl DocumentConverter for RecordingConverter {
    fn is_enabled(&self) -> bool {
        true
    }

    fn convert(
        &self,
        _source: &Path,
        _source_mime: &str,
        _target_mime: &str,
    ) -> Result<TempPath, DocViewError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let out = docview::pipeline::input::create_temp_file(".pdf")?;
        std::fs::write(&out, minimal_pdf(1)).map_err(|e| DocViewError::io("write pdf", e))?;
        self.produced.lock().unwrap().push(out.to_path_buf());
        Ok(out)
    }
}

/// Route library logs through the test harness; `RUST_LOG=debug` shows them.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A temp repository with a `/docs` folder holding `files`.
fn repo_with(files: &[(&str, &[u8])]) -> (TempDir, FsRepository) {
    init_tracing();
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join("docs")).unwrap();
    for (name, content) in files {
        std::fs::write(dir.path().join("docs").join(name), content).unwrap();
    }
    let repo = FsRepository::open(dir.path()).unwrap();
    (dir, repo)
}

fn vector_artifacts(repo: &FsRepository) -> Vec<String> {
    repo.children(&NodePath::new("/docs"))
        .unwrap()
        .into_iter()
        .filter(|n| n.ends_with(".swf"))
        .collect()
}

/// A valid PDF with `pages` empty US-letter pages.
fn minimal_pdf(pages: usize) -> Vec<u8> {
    let mut objects = vec![
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            (0..pages)
                .map(|i| format!("{} 0 R", i + 3))
                .collect::<Vec<_>>()
                .join(" "),
            pages
        ),
    ];
    for _ in 0..pages {
        objects.push("<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] >>".to_string());
    }

    let mut out = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
    }
    let xref = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes());
    for off in offsets {
        out.extend_from_slice(format!("{off:010} 00000 n \n").as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref
        )
        .as_bytes(),
    );
    out
}

// ── Classification and scaling (no tools) ────────────────────────────────────

#[test]
fn test_mime_group_membership() {
    let registry = MimeRegistry::with_defaults();
    assert!(registry.belongs_to_group(Some("application/pdf"), "pdf"));
    assert!(registry.belongs_to_group(Some("application/msword"), "pdf,word"));
    assert!(registry.belongs_to_group(
        Some("application/vnd.oasis.opendocument.text"),
        "openoffice"
    ));
    assert!(!registry.belongs_to_group(Some("image/png"), "pdf,word,openoffice"));
    assert!(!registry.belongs_to_group(None, "pdf"));
    assert!(!registry.belongs_to_group(Some("application/pdf"), "no-such-group"));
}

#[test]
fn test_resize_never_upscales() {
    let small = DynamicImage::ImageRgb8(RgbImage::new(100, 50));
    assert_eq!(resize(small, 150).dimensions(), (100, 50));

    let wide = DynamicImage::ImageRgb8(RgbImage::new(1200, 300));
    assert_eq!(resize(wide, 150).dimensions(), (150, 37));
}

// ── Thumbnails with a fake renderer ──────────────────────────────────────────

#[test]
fn test_thumbnail_is_replaced_not_duplicated() {
    let (_dir, repo) = repo_with(&[("a.pdf", &minimal_pdf(1))]);
    let calls = Arc::new(AtomicUsize::new(0));
    let svc = DocumentViewService::new(DocViewConfig::default(), repo).with_renderer(LetterRenderer {
        calls: calls.clone(),
    });
    let doc = NodePath::new("/docs/a.pdf");

    let first = svc.create_thumbnail(&doc, "thumbnail", 150).unwrap();
    let second = svc.create_thumbnail(&doc, "thumbnail", 75).unwrap();
    assert_eq!(first.node(), second.node());
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    let repo = svc.repository();
    let children = repo.children(&doc).unwrap();
    assert_eq!(children.iter().filter(|c| *c == "thumbnail").count(), 1);

    let thumb = doc.join("thumbnail");
    assert_eq!(repo.get_property(&thumb, PROP_HEIGHT).unwrap(), Some(PropertyValue::Long(75)));
    assert_eq!(
        repo.get_property(&thumb, PROP_MIME_TYPE).unwrap(),
        Some(PropertyValue::from("image/png"))
    );
    assert!(repo.has_mixin(&thumb, MIXIN_IMAGE).unwrap());

    let png = repo.read_binary_property(&thumb, PROP_DATA).unwrap().unwrap();
    let decoded = image::load_from_memory(&png).unwrap();
    assert_eq!(decoded.dimensions(), (57, 75));
}

#[test]
fn test_office_document_thumbnail_cleans_up_intermediate_pdf() {
    let (_dir, repo) = repo_with(&[("memo.docx", b"PK\x03\x04")]);
    let converter = RecordingConverter::default();
    let svc = DocumentViewService::new(DocViewConfig::default(), repo)
        .with_renderer(LetterRenderer {
            calls: Arc::new(AtomicUsize::new(0)),
        })
        .with_document_converter(converter.clone());

    let outcome = svc
        .create_thumbnail(&NodePath::new("/docs/memo.docx"), "thumbnail", 150)
        .unwrap();
    assert!(outcome.is_completed());
    assert_eq!(converter.calls.load(Ordering::SeqCst), 1);

    let produced = converter.produced.lock().unwrap();
    assert_eq!(produced.len(), 1);
    assert!(!produced[0].exists(), "intermediate PDF left behind");
}

#[test]
fn test_pdf_bypasses_document_converter() {
    let (_dir, repo) = repo_with(&[("a.pdf", &minimal_pdf(1))]);
    let converter = RecordingConverter::default();
    let svc = DocumentViewService::new(DocViewConfig::default(), repo)
        .with_renderer(LetterRenderer {
            calls: Arc::new(AtomicUsize::new(0)),
        })
        .with_document_converter(converter.clone());

    let outcome = svc
        .create_thumbnail(&NodePath::new("/docs/a.pdf"), "thumbnail", 150)
        .unwrap();
    assert!(outcome.is_completed());
    assert_eq!(converter.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_folder_thumbnail_size_wins_over_rule_default() {
    let (_dir, repo) = repo_with(&[("a.pdf", &minimal_pdf(1))]);
    repo.set_property(&NodePath::new("/docs"), PROP_THUMBNAIL_SIZE, PropertyValue::Long(60))
        .unwrap();
    let svc = DocumentViewService::new(DocViewConfig::default(), repo).with_renderer(LetterRenderer {
        calls: Arc::new(AtomicUsize::new(0)),
    });
    let rules = DocumentRuleService::new(svc);

    let outcome = rules
        .create_thumbnail(&DocumentAddedEvent::new("/docs/a.pdf"), "thumbnail", 150)
        .unwrap();
    let node = outcome.node().unwrap().clone();
    let repo = rules.service().repository();
    assert_eq!(repo.get_property(&node, PROP_HEIGHT).unwrap(), Some(PropertyValue::Long(60)));
}

#[test]
fn test_unsupported_document_is_skipped() {
    let (_dir, repo) = repo_with(&[("photo.png", b"\x89PNG")]);
    let svc = DocumentViewService::new(DocViewConfig::default(), repo);
    let outcome = svc
        .create_thumbnail(&NodePath::new("/docs/photo.png"), "thumbnail", 150)
        .unwrap();
    assert!(matches!(
        outcome,
        Outcome::Skipped(SkipReason::UnsupportedFormat { .. })
    ));
}

// ── Vector conversion with a stub pdf2swf ────────────────────────────────────

#[cfg(unix)]
mod vector {
    use super::*;
    use serial_test::serial;
    use std::os::unix::fs::PermissionsExt;

    /// A pdf2swf stand-in: `$1` is the input, `$3` the output.
    fn stub_pdf2swf(dir: &Path, body: &str) -> String {
        let path = dir.join("pdf2swf");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.display().to_string()
    }

    fn service_with_stub(
        files: &[(&str, &[u8])],
        body: &str,
    ) -> (TempDir, TempDir, DocumentViewService<FsRepository>) {
        let (dir, repo) = repo_with(files);
        let tools = TempDir::new().unwrap();
        let config = DocViewConfig::builder()
            .vector_executable(stub_pdf2swf(tools.path(), body))
            .vector_timeout_secs(10)
            .build()
            .unwrap();
        (dir, tools, DocumentViewService::new(config, repo))
    }

    #[test]
    #[serial]
    fn test_convert_twice_with_overwrite_keeps_one_artifact() {
        let (_dir, _tools, svc) =
            service_with_stub(&[("a.pdf", &minimal_pdf(2))], r#"printf 'FWS1' > "$3""#);
        let doc = NodePath::new("/docs/a.pdf");

        let first = svc.convert(&doc, true).unwrap();
        let second = svc.convert(&doc, true).unwrap();
        assert_eq!(first.node().unwrap().as_str(), "/docs/a.swf");
        assert_eq!(first.node(), second.node());
        assert_eq!(vector_artifacts(svc.repository()), vec!["a.swf".to_string()]);
    }

    #[test]
    #[serial]
    fn test_convert_without_overwrite_picks_free_name() {
        let (_dir, _tools, svc) =
            service_with_stub(&[("a.pdf", &minimal_pdf(1))], r#"printf 'FWS1' > "$3""#);
        let doc = NodePath::new("/docs/a.pdf");

        let first = svc.convert(&doc, false).unwrap();
        let second = svc.convert(&doc, false).unwrap();
        assert_ne!(first.node(), second.node());
        assert_eq!(second.node().unwrap().as_str(), "/docs/a-1.swf");
        assert_eq!(vector_artifacts(svc.repository()).len(), 2);
    }

    #[test]
    #[serial]
    fn test_pdf_reaches_vector_converter_unchanged() {
        let source = minimal_pdf(2);
        let (_dir, _tools, svc) =
            service_with_stub(&[("a.pdf", &source)], r#"cp "$1" "$3""#);
        let converter = RecordingConverter::default();
        let svc = svc.with_document_converter(converter.clone());
        let doc = NodePath::new("/docs/a.pdf");

        let outcome = svc.convert(&doc, true).unwrap();
        let artifact = outcome.node().unwrap().clone();
        assert_eq!(artifact.as_str(), "/docs/a.swf");
        assert_eq!(svc.repository().read_content(&artifact).unwrap(), source);
        assert_eq!(converter.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    #[serial]
    fn test_disabled_document_converter_writes_nothing() {
        let (_dir, _tools, svc) =
            service_with_stub(&[("memo.docx", b"PK\x03\x04")], r#"printf 'FWS' > "$3""#);

        let outcome = svc.convert(&NodePath::new("/docs/memo.docx"), true).unwrap();
        assert!(matches!(outcome, Outcome::Skipped(SkipReason::PdfUnavailable)));
        assert!(vector_artifacts(svc.repository()).is_empty());

        let view = svc.create_view(&NodePath::new("/docs/memo.docx")).unwrap();
        assert!(!view.is_completed());
        assert!(!svc
            .repository()
            .has_mixin(&NodePath::new("/docs/memo.docx"), MIXIN_VECTOR_VIEW)
            .unwrap());
    }

    #[test]
    #[serial]
    fn test_create_view_adds_mixin_and_child() {
        let (_dir, _tools, svc) =
            service_with_stub(&[("a.pdf", &minimal_pdf(1))], r#"printf 'FWS-view' > "$3""#);
        let doc = NodePath::new("/docs/a.pdf");

        let outcome = svc.create_view(&doc).unwrap();
        let view = outcome.node().unwrap().clone();
        assert_eq!(view, doc.join(VIEW_NODE_NAME));

        let repo = svc.repository();
        assert!(repo.has_mixin(&doc, MIXIN_VECTOR_VIEW).unwrap());
        assert_eq!(
            repo.read_binary_property(&view, PROP_DATA).unwrap().as_deref(),
            Some(&b"FWS-view"[..])
        );
        assert_eq!(
            repo.get_property(&view, PROP_MIME_TYPE).unwrap(),
            Some(PropertyValue::from("application/x-shockwave-flash"))
        );

        // A second run replaces the data in place.
        svc.create_view(&doc).unwrap();
        let children = repo.children(&doc).unwrap();
        assert_eq!(children.iter().filter(|c| *c == VIEW_NODE_NAME).count(), 1);
    }

    #[test]
    #[serial]
    fn test_trigger_swallows_tool_failure() {
        let (_dir, _tools, svc) = service_with_stub(
            &[("a.pdf", &minimal_pdf(1))],
            "echo 'cannot parse' >&2; exit 1",
        );
        let rules = DocumentRuleService::new(svc);
        let event = DocumentAddedEvent::new("/docs/a.pdf");

        assert!(rules.create_view(&event).is_none());
        assert!(rules.convert(&event, true).is_none());

        let summary = rules.dispatch(
            &[event],
            &[DocumentRule::CreateView, DocumentRule::Convert { overwrite_if_exists: true }],
            None,
        );
        assert_eq!(summary.documents, 1);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.completed, 0);
        assert!(vector_artifacts(rules.service().repository()).is_empty());
    }
}

// ── Real pdfium rendering (E2E_ENABLED) ──────────────────────────────────────

#[test]
#[serial_test::serial]
fn test_pdfium_page_past_end_is_page_not_found() {
    e2e_skip_unless_ready!();
    let renderer = PdfiumRenderer::new(Default::default());
    let err = renderer
        .render_page(&PdfSource::Bytes(minimal_pdf(3)), 5)
        .unwrap_err();
    match err {
        DocViewError::PageNotFound { page, total } => {
            assert_eq!(page, 5);
            assert_eq!(total, 3);
        }
        other => panic!("expected PageNotFound, got {other:?}"),
    }
}

#[test]
#[serial_test::serial]
fn test_pdfium_first_page_thumbnail() {
    e2e_skip_unless_ready!();
    let (_dir, repo) = repo_with(&[("one.pdf", &minimal_pdf(1))]);
    let svc = DocumentViewService::new(DocViewConfig::default(), repo);
    let doc = NodePath::new("/docs/one.pdf");

    let outcome = svc.create_thumbnail(&doc, "thumbnail", 150).unwrap();
    let node = outcome.node().unwrap().clone();
    let repo = svc.repository();

    let width = repo.get_property(&node, PROP_WIDTH).unwrap().and_then(|v| v.as_long());
    let height = repo.get_property(&node, PROP_HEIGHT).unwrap().and_then(|v| v.as_long());
    assert_eq!(height, Some(150), "letter page is portrait");
    assert!(matches!(width, Some(114..=116)), "width {width:?}");
    assert_eq!(
        repo.get_property(&node, PROP_MIME_TYPE).unwrap(),
        Some(PropertyValue::from("image/png"))
    );
    println!("thumbnail {width:?}x{height:?}");
}
