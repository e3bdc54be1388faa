//! CLI binary for docview.
//!
//! A thin shim over the library crate: maps flags onto `DocViewConfig`,
//! opens a filesystem-backed repository and runs one operation per node.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use docview::{
    mime::mime_from_path, renderer_from_config, DispatchProgressCallback, DocViewConfig,
    DocumentAddedEvent, DocumentRule, DocumentRuleService, DocumentViewService, FileConverter,
    FsRepository, MimeRegistry, NodePath, Outcome, PdfSource, RendererBackend, ThumbnailFormat,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Live progress bar for `on-added`, one tick per document.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} documents  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        bar.set_style(style);
        bar.set_prefix("Processing");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }
}

impl DispatchProgressCallback for CliProgressCallback {
    fn on_dispatch_start(&self, total_documents: usize) {
        self.bar.set_length(total_documents as u64);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Running rules on {total_documents} documents…"))
        ));
    }

    fn on_document_start(&self, _index: usize, _total: usize, document: &str) {
        self.bar.set_message(document.to_string());
    }

    fn on_rule_complete(&self, document: &str, rule: &str, completed: bool) {
        let mark = if completed { green("✓") } else { dim("–") };
        self.bar
            .println(format!("  {} {:<10} {}", mark, rule, dim(document)));
    }

    fn on_rule_error(&self, document: &str, rule: &str, error: &str) {
        let msg = if error.chars().count() > 80 {
            let cut: String = error.chars().take(79).collect();
            format!("{cut}\u{2026}")
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} {:<10} {}  {}",
            red("✗"),
            rule,
            document,
            red(&msg)
        ));
    }

    fn on_document_complete(&self, _index: usize, _total: usize, _document: &str) {
        self.bar.inc(1);
    }

    fn on_dispatch_complete(&self, total_documents: usize, failed_rules: usize) {
        self.bar.finish_and_clear();
        if failed_rules == 0 {
            eprintln!(
                "{} {} documents processed",
                green("✔"),
                bold(&total_documents.to_string())
            );
        } else {
            eprintln!(
                "{} {} documents processed  ({} rules failed)",
                cyan("⚠"),
                bold(&total_documents.to_string()),
                red(&failed_rules.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Thumbnail for a PDF stored under ./docs/reports/q1.pdf
  docview --root ./docs thumbnail /reports/q1.pdf

  # Vector view child, with a custom pdf2swf
  docview --root ./docs --pdf2swf /opt/swftools/bin/pdf2swf view /reports/q1.pdf

  # Office documents need LibreOffice
  docview --root ./docs --soffice soffice convert /letters/offer.docx

  # Everything a "document added" listener would do
  docview --root ./docs on-added /reports/q1.pdf /letters/offer.docx

  # Render one page to a PNG, no repository involved
  docview render paper.pdf --page 3 -o page3.png

  # Is this type handled?
  docview classify application/msword --groups pdf,word

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH   Path to libpdfium (file or directory)
  RUST_LOG          Overrides the log filter set by -v / -q
"#;

/// Convert documents into vector views and thumbnails.
#[derive(Parser, Debug)]
#[command(
    name = "docview",
    version,
    about = "Convert documents into vector views and thumbnails",
    long_about = "Convert office documents and PDFs stored in a directory tree into \
web-viewable vector files (via pdf2swf) and first-page thumbnails (via pdfium or pdftoppm). \
Artifacts are written next to the document, with node metadata kept under .docview/.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Repository root directory.
    #[arg(long, global = true, env = "DOCVIEW_ROOT", default_value = ".")]
    root: PathBuf,

    /// JSON configuration file; flags below override its values.
    #[arg(long, global = true, env = "DOCVIEW_CONFIG")]
    config: Option<PathBuf>,

    /// JSON file mapping mime group names to type patterns.
    #[arg(long, global = true, env = "DOCVIEW_MIME_GROUPS")]
    mime_groups: Option<PathBuf>,

    /// Supported mime groups, comma separated (e.g. pdf,word,openoffice).
    #[arg(long, global = true, env = "DOCVIEW_FORMATS", value_delimiter = ',')]
    formats: Option<Vec<String>>,

    /// pdf2swf executable.
    #[arg(long, global = true, env = "DOCVIEW_PDF2SWF")]
    pdf2swf: Option<String>,

    /// Extra pdf2swf parameters, appended after the output file.
    #[arg(long, global = true, env = "DOCVIEW_PDF2SWF_PARAMS", allow_hyphen_values = true)]
    pdf2swf_params: Option<String>,

    /// Kill external tools running longer than this many seconds.
    #[arg(long, global = true, env = "DOCVIEW_TOOL_TIMEOUT")]
    tool_timeout: Option<u64>,

    /// LibreOffice executable; enables conversion of non-PDF documents.
    #[arg(long, global = true, env = "DOCVIEW_SOFFICE")]
    soffice: Option<String>,

    /// Page renderer.
    #[arg(long, global = true, env = "DOCVIEW_BACKEND", value_enum)]
    backend: Option<BackendArg>,

    /// Rendering DPI (36–600).
    #[arg(long, global = true, env = "DOCVIEW_DPI",
          value_parser = clap::value_parser!(u32).range(36..=600))]
    dpi: Option<u32>,

    /// Thumbnail image format.
    #[arg(long, global = true, env = "DOCVIEW_THUMBNAIL_FORMAT", value_enum)]
    thumbnail_format: Option<FormatArg>,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "DOCVIEW_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "DOCVIEW_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert documents into sibling vector files.
    Convert {
        /// Document node paths, relative to the root.
        #[arg(required = true)]
        nodes: Vec<String>,

        /// Replace an existing artifact instead of picking a free name.
        #[arg(long)]
        overwrite: bool,
    },

    /// Store a first-page thumbnail as a child of each document.
    Thumbnail {
        #[arg(required = true)]
        nodes: Vec<String>,

        /// Name of the thumbnail child node.
        #[arg(long, default_value = "thumbnail")]
        name: String,

        /// Bounding-box size in pixels.
        #[arg(long, default_value_t = 150,
              value_parser = clap::value_parser!(u32).range(1..))]
        size: u32,
    },

    /// Store a vector view as a child of each document.
    View {
        #[arg(required = true)]
        nodes: Vec<String>,
    },

    /// Run the "document added" rules on each document.
    OnAdded {
        #[arg(required = true)]
        nodes: Vec<String>,

        /// Skip the vector view rule.
        #[arg(long)]
        no_view: bool,

        /// Skip the thumbnail rule.
        #[arg(long)]
        no_thumbnail: bool,

        /// Also convert into a sibling vector file.
        #[arg(long)]
        convert: bool,

        /// With --convert: replace existing artifacts.
        #[arg(long)]
        overwrite: bool,

        /// Disable progress bar.
        #[arg(long, env = "DOCVIEW_NO_PROGRESS")]
        no_progress: bool,
    },

    /// Convert a local file to the vector format, outside any repository.
    ConvertFile {
        input: PathBuf,

        /// Where to write the vector file.
        #[arg(short, long)]
        output: PathBuf,

        /// Mime type of the input; guessed from the extension when absent.
        #[arg(long)]
        mime: Option<String>,
    },

    /// Render one page of a local PDF to an image file.
    Render {
        pdf: PathBuf,

        /// Page number, 1-based.
        #[arg(long, default_value_t = 1,
              value_parser = clap::value_parser!(u32).range(1..))]
        page: u32,

        /// Output image; the format follows the extension.
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Check whether a mime type belongs to a set of groups.
    Classify {
        mime: String,

        /// Comma-separated group names.
        #[arg(long, default_value = "pdf,word,openoffice,powerpoint,excel")]
        groups: String,
    },
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum BackendArg {
    Pdfium,
    Pdftoppm,
}

impl From<BackendArg> for RendererBackend {
    fn from(v: BackendArg) -> Self {
        match v {
            BackendArg::Pdfium => RendererBackend::Pdfium,
            BackendArg::Pdftoppm => RendererBackend::Pdftoppm,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Png,
    Jpeg,
}

impl From<FormatArg> for ThumbnailFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Png => ThumbnailFormat::Png,
            FormatArg::Jpeg => ThumbnailFormat::Jpeg,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = matches!(
        cli.command,
        Command::OnAdded {
            no_progress: false,
            ..
        }
    ) && !cli.quiet;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli)?;
    let registry = load_registry(&cli)?;

    // Commands that need no repository.
    match &cli.command {
        Command::Classify { mime, groups } => {
            let registry = registry.unwrap_or_else(MimeRegistry::with_defaults);
            let belongs = registry.belongs_to_group(Some(mime.as_str()), groups.as_str());
            println!("{mime}: {}", if belongs { "yes" } else { "no" });
            return Ok(());
        }
        Command::Render { pdf, page, output } => {
            let image = renderer_from_config(&config.image)
                .render_page(&PdfSource::Path(pdf.clone()), *page as usize - 1)
                .with_context(|| format!("Failed to render page {page} of {}", pdf.display()))?;
            image
                .save(output)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            if !cli.quiet {
                eprintln!(
                    "{}  {}x{} px  →  {}",
                    green("✔"),
                    image.width(),
                    image.height(),
                    bold(&output.display().to_string())
                );
            }
            return Ok(());
        }
        Command::ConvertFile {
            input,
            output,
            mime,
        } => {
            let mut files = FileConverter::from_config(&config);
            if let Some(registry) = registry {
                files = files.with_mime_registry(registry);
            }
            let mime = mime
                .clone()
                .unwrap_or_else(|| mime_from_path(input).to_string());
            let Some(artifact) = files
                .convert_file(input, &mime)
                .with_context(|| format!("Failed to convert {}", input.display()))?
            else {
                bail!(
                    "Nothing produced for {} ({mime}); check that the converters are enabled",
                    input.display()
                );
            };
            std::fs::copy(&*artifact, output)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            if !cli.quiet {
                eprintln!("{}  →  {}", green("✔"), bold(&output.display().to_string()));
            }
            return Ok(());
        }
        _ => {}
    }

    let repo = FsRepository::open(&cli.root)
        .with_context(|| format!("Failed to open repository at {}", cli.root.display()))?;
    let mut service = DocumentViewService::new(config, repo);
    if let Some(registry) = registry {
        service = service.with_mime_registry(registry);
    }

    let failures = match cli.command {
        Command::Convert { nodes, overwrite } => run_each(&nodes, cli.quiet, |node| {
            service.convert(node, overwrite)
        }),
        Command::Thumbnail { nodes, name, size } => run_each(&nodes, cli.quiet, |node| {
            service.create_thumbnail(node, &name, size)
        }),
        Command::View { nodes } => run_each(&nodes, cli.quiet, |node| service.create_view(node)),
        Command::OnAdded {
            nodes,
            no_view,
            no_thumbnail,
            convert,
            overwrite,
            ..
        } => {
            let mut rules = Vec::new();
            if convert {
                rules.push(DocumentRule::Convert {
                    overwrite_if_exists: overwrite,
                });
            }
            if !no_view {
                rules.push(DocumentRule::CreateView);
            }
            if !no_thumbnail {
                rules.push(DocumentRule::thumbnail());
            }
            let events: Vec<DocumentAddedEvent> =
                nodes.iter().map(|n| DocumentAddedEvent::new(n.as_str())).collect();

            let rule_service = DocumentRuleService::new(service);
            let summary = if show_progress {
                let cb = CliProgressCallback::new();
                let cb: &dyn DispatchProgressCallback = cb.as_ref();
                rule_service.dispatch(&events, &rules, Some(cb))
            } else {
                rule_service.dispatch(&events, &rules, None)
            };
            if !cli.quiet && !show_progress {
                eprintln!("{summary}");
            }
            summary.failed
        }
        Command::ConvertFile { .. } | Command::Render { .. } | Command::Classify { .. } => 0,
    };

    if failures > 0 {
        bail!("{failures} operation(s) failed");
    }
    Ok(())
}

/// Run `op` on every node, printing one line per result.
fn run_each<F>(nodes: &[String], quiet: bool, op: F) -> usize
where
    F: Fn(&NodePath) -> Result<Outcome, docview::DocViewError>,
{
    let mut failures = 0;
    for raw in nodes {
        let node = NodePath::new(raw);
        match op(&node) {
            Ok(Outcome::Completed { node: out, elapsed_ms }) => {
                if !quiet {
                    eprintln!(
                        "  {} {}  →  {}  {}",
                        green("✓"),
                        node,
                        bold(out.as_str()),
                        dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
                    );
                }
            }
            Ok(Outcome::Skipped(reason)) => {
                if !quiet {
                    eprintln!("  {} {}  {}", dim("–"), node, dim(&reason.to_string()));
                }
            }
            Err(e) => {
                failures += 1;
                eprintln!("  {} {}  {}", red("✗"), node, red(&e.to_string()));
            }
        }
    }
    failures
}

/// Map CLI args onto `DocViewConfig`.
fn build_config(cli: &Cli) -> Result<DocViewConfig> {
    let base = match &cli.config {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            DocViewConfig::from_json(&json)
                .with_context(|| format!("Invalid config file {}", path.display()))?
        }
        None => DocViewConfig::default(),
    };

    let mut builder = base.into_builder();
    if let Some(ref formats) = cli.formats {
        builder = builder.supported_document_formats(formats.iter().map(|f| f.trim().to_string()));
    }
    if let Some(ref exe) = cli.pdf2swf {
        builder = builder.vector_executable(exe.clone());
    }
    if let Some(ref params) = cli.pdf2swf_params {
        builder = builder.vector_parameters(params.clone());
    }
    if let Some(ref exe) = cli.soffice {
        builder = builder.office_enabled(true).office_executable(exe.clone());
    }
    if let Some(secs) = cli.tool_timeout {
        builder = builder
            .vector_timeout_secs(secs)
            .image_timeout_secs(secs)
            .office_timeout_secs(secs);
    }
    if let Some(backend) = cli.backend {
        builder = builder.renderer_backend(backend.into());
    }
    if let Some(dpi) = cli.dpi {
        builder = builder.resolution(dpi);
    }
    if let Some(format) = cli.thumbnail_format {
        builder = builder.thumbnail_format(format.into());
    }

    builder.build().context("Invalid configuration")
}

fn load_registry(cli: &Cli) -> Result<Option<MimeRegistry>> {
    let Some(ref path) = cli.mime_groups else {
        return Ok(None);
    };
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read mime groups from {}", path.display()))?;
    let registry = MimeRegistry::from_json(&json)
        .with_context(|| format!("Invalid mime groups file {}", path.display()))?;
    Ok(Some(registry))
}
