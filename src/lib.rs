//! # pdf2xlsx
//!
//! Rebuild the ruled table on the last page of a PDF as an `.xlsx` workbook.
//!
//! The page is rasterised and its ruling lines are isolated with
//! morphological openings. The regions enclosed by those lines become cell
//! candidates, and each candidate is cropped and passed through OCR. The
//! recognized texts are then bucketed onto a coarse row/column grid, and
//! horizontally adjacent fragments that share a bucket are merged into one
//! spanning cell.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input    validate local path + %PDF magic
//!  ├─ 2. Render   rasterise the last page via pdfium (spawn_blocking)
//!  ├─ 3. Grid     threshold → line openings → contours → debug overlay
//!  ├─ 4. OCR      crop each candidate region, recognize its text
//!  ├─ 5. Sheet    bucket (y/20, x/50), merge, bordered .xlsx
//!  └─ 6. Preview  7×20 text grid rendered to PNG
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2xlsx::{extract_table, ExtractionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ExtractionConfig::builder().output_dir("out").build()?;
//!     let output = extract_table("Alibag.pdf", &config).await?;
//!     println!("{} cells, {} merged ranges", output.stats.cell_count, output.stats.merged_ranges);
//!     println!("workbook: {}", output.files.workbook.display());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature     | Default | Description |
//! |-------------|---------|-------------|
//! | `cli`       | on      | CLI-only deps (clap, anyhow, tracing-subscriber, indicatif) |
//! | `tesseract` | off     | [`TesseractRecognizer`] via leptess; needs libtesseract + libleptonica |
//!
//! The `pdf2xlsx` binary needs both features. Library users without
//! Tesseract can plug in their own [`CellRecognizer`].

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ExtractionConfig, ExtractionConfigBuilder, Kernel};
pub use error::Pdf2XlsxError;
pub use extract::{extract_from_image, extract_table, extract_table_sync, inspect};
pub use output::{Cell, DocumentMetadata, ExtractionOutput, ExtractionStats, OutputFiles};
pub use pipeline::grid::BoundingBox;
pub use pipeline::ocr::CellRecognizer;
#[cfg(feature = "tesseract")]
pub use pipeline::ocr::TesseractRecognizer;
pub use pipeline::sheet::{MergedRange, SheetLayout};
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback, Stage};
