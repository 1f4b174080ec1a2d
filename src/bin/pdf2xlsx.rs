//! CLI binary for pdf2xlsx.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ExtractionConfig` and prints a summary.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf2xlsx::{
    extract_table, inspect, ExtractionConfig, ExtractionProgressCallback, ProgressCallback, Stage,
};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
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

/// Terminal progress callback: a spinner while each stage runs, switching to
/// a counted bar once cell recognition reports its total.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(Self::spinner_style());
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS)
    }

    fn cell_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>4}/{len} cells  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS)
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_stage_start(&self, stage: Stage) {
        self.bar.set_style(Self::spinner_style());
        self.bar.set_prefix(stage.label());
        self.bar.set_message("");
    }

    fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
        self.bar.println(format!(
            "  {} {:<24}  {}",
            green("✓"),
            stage.label(),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
        if stage == Stage::RenderPreview {
            self.bar.finish_and_clear();
        }
    }

    fn on_cell_recognized(&self, index: usize, total: usize, text: &str) {
        if self.bar.length() != Some(total as u64) {
            self.bar.set_style(Self::cell_style());
            self.bar.set_length(total as u64);
            self.bar.reset_eta();
        }
        self.bar.set_position(index as u64 + 1);
        let shown: String = text.chars().take(40).collect();
        self.bar.set_message(shown);
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Extract ./Alibag.pdf into the current directory
  pdf2xlsx

  # Another document, outputs into out/
  pdf2xlsx report.pdf --output-dir out

  # Marathi + English OCR with a custom tessdata directory
  pdf2xlsx report.pdf --lang mar+eng --tessdata /opt/tessdata

  # Inspect PDF metadata (no OCR needed)
  pdf2xlsx --inspect-only report.pdf

  # Machine-readable result
  pdf2xlsx --json report.pdf > result.json

OUTPUT FILES (written to --output-dir):
  last_page_image.png           rasterised last page
  debug_table_structure.png     detected regions drawn in green
  output_table_structure.xlsx   the rebuilt table
  truth_table.png               7×20 preview of the recognized texts

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH         Path to an existing libpdfium
  TESSDATA_PREFIX         Tesseract language data directory
  RUST_LOG                Log filter (overrides -v / -q)
"#;

/// Rebuild the table on the last page of a PDF as an .xlsx workbook.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2xlsx",
    version,
    about = "Rebuild the table on the last page of a PDF as an .xlsx workbook",
    long_about = "Rasterise the last page of a PDF, detect its ruled table grid, OCR every \
cell and write the result to an .xlsx workbook with merged cells, plus a debug overlay and a \
preview image.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path.
    #[arg(default_value = "./Alibag.pdf")]
    input: String,

    /// Directory for the four output files.
    #[arg(short, long, env = "PDF2XLSX_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Rendering DPI (72–400).
    #[arg(long, env = "PDF2XLSX_DPI", default_value_t = 72,
          value_parser = clap::value_parser!(u32).range(72..=400))]
    dpi: u32,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDF2XLSX_PASSWORD")]
    password: Option<String>,

    /// Tesseract language(s), e.g. eng or mar+eng.
    #[arg(long, env = "PDF2XLSX_LANG", default_value = "eng")]
    lang: String,

    /// Directory containing Tesseract .traineddata files.
    #[arg(long, env = "PDF2XLSX_TESSDATA")]
    tessdata: Option<PathBuf>,

    /// TrueType font for the preview image.
    #[arg(long, env = "PDF2XLSX_FONT")]
    font: Option<PathBuf>,

    /// Path to libpdfium (or the directory containing it).
    #[arg(long, env = "PDF2XLSX_PDFIUM_LIB")]
    pdfium_lib: Option<PathBuf>,

    /// Print the full result (cells, layout, stats) as JSON on stdout.
    #[arg(long, env = "PDF2XLSX_JSON")]
    json: bool,

    /// Print PDF metadata only, no extraction.
    #[arg(long)]
    inspect_only: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDF2XLSX_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2XLSX_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2XLSX_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level library logs unless -v is given.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.inspect_only;
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

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ExtractionProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let meta = inspect(&cli.input, &config)
            .await
            .context("Failed to inspect PDF")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&meta).context("Failed to serialize metadata")?
            );
        } else {
            println!("File:         {}", cli.input);
            if let Some(ref t) = meta.title {
                println!("Title:        {}", t);
            }
            if let Some(ref a) = meta.author {
                println!("Author:       {}", a);
            }
            println!("Pages:        {}", meta.page_count);
            println!("PDF Version:  {}", meta.pdf_version);
            if let Some(ref p) = meta.producer {
                println!("Producer:     {}", p);
            }
        }
        return Ok(());
    }

    // ── Run extraction ───────────────────────────────────────────────────
    let output = extract_table(&cli.input, &config)
        .await
        .context("Extraction failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
        return Ok(());
    }

    if !cli.quiet {
        let stats = &output.stats;
        eprintln!(
            "{}  {} cells  {} merged  page {}/{}  {}ms",
            green("✔"),
            bold(&stats.cell_count.to_string()),
            stats.merged_ranges,
            stats.page_index + 1,
            stats.page_count,
            stats.total_duration_ms,
        );
        for path in [
            &output.files.workbook,
            &output.files.preview,
            &output.files.debug_overlay,
            &output.files.page_image,
        ] {
            eprintln!("   {} {}", cyan("→"), path.display());
        }
    }

    Ok(())
}

/// Map CLI args to `ExtractionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ExtractionConfig> {
    let mut builder = ExtractionConfig::builder()
        .dpi(cli.dpi)
        .ocr_language(cli.lang.clone())
        .output_dir(cli.output_dir.clone());

    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd.clone());
    }
    if let Some(ref dir) = cli.tessdata {
        builder = builder.tessdata_dir(dir.clone());
    }
    if let Some(ref font) = cli.font {
        builder = builder.preview_font(font.clone());
    }
    if let Some(ref lib) = cli.pdfium_lib {
        builder = builder.pdfium_lib_path(lib.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_behaviour() {
        let cli = Cli::try_parse_from(["pdf2xlsx"]).unwrap();
        assert_eq!(cli.input, "./Alibag.pdf");
        assert_eq!(cli.output_dir, PathBuf::from("."));
        assert_eq!(cli.dpi, 72);
        assert_eq!(cli.lang, "eng");

        let config = build_config(&cli, None).unwrap();
        assert_eq!(config.dpi, 72);
        assert_eq!(config.ocr_language, "eng");
        assert!(config.password.is_none());
    }

    #[test]
    fn dpi_out_of_range_is_rejected() {
        assert!(Cli::try_parse_from(["pdf2xlsx", "--dpi", "20"]).is_err());
    }

    #[test]
    fn flags_reach_config() {
        let cli = Cli::try_parse_from([
            "pdf2xlsx",
            "doc.pdf",
            "--output-dir",
            "out",
            "--lang",
            "mar+eng",
            "--password",
            "s3cret",
            "--font",
            "/tmp/f.ttf",
        ])
        .unwrap();
        let config = build_config(&cli, None).unwrap();
        assert_eq!(config.workbook_path(), PathBuf::from("out/output_table_structure.xlsx"));
        assert_eq!(config.ocr_language, "mar+eng");
        assert_eq!(config.password.as_deref(), Some("s3cret"));
        assert_eq!(config.preview_font, Some(PathBuf::from("/tmp/f.ttf")));
    }
}
