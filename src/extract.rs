//! Top-level entry points: run the whole pipeline on one PDF.
//!
//! Stages run strictly one after another. The blocking ones (pdfium, image
//! processing, OCR, workbook serialisation) are moved onto tokio's blocking
//! pool, but there is never more than one stage in flight.

use crate::config::ExtractionConfig;
use crate::error::Pdf2XlsxError;
use crate::output::{Cell, DocumentMetadata, ExtractionOutput, ExtractionStats, OutputFiles};
use crate::pipeline::grid::{self, GridDetection};
use crate::pipeline::sheet::{self, SheetLayout};
use crate::pipeline::{input, ocr, preview, render};
use crate::progress::Stage;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Extract the table on the last page of a PDF into a workbook.
///
/// Writes four files into [`ExtractionConfig::output_dir`]: the rasterised
/// page, the contour debug overlay, the workbook and the preview image.
///
/// # Errors
/// Every failure is fatal; files written by earlier stages are left in place.
pub async fn extract_table(
    input_str: impl AsRef<str>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, Pdf2XlsxError> {
    let total_start = Instant::now();
    let input_str = input_str.as_ref();
    info!("Starting extraction: {}", input_str);

    // ── Step 1: Resolve input ────────────────────────────────────────────
    let pdf_path = input::resolve_input(input_str)?;
    // Fail before rendering when no OCR engine is available.
    ocr::resolve_recognizer(config)?;
    ensure_output_dir(config).await?;

    // ── Step 2: Rasterise the last page ──────────────────────────────────
    let (page, render_ms) = timed(config, Stage::Rasterize, async {
        render::rasterize_last_page(&pdf_path, config).await
    })
    .await?;

    // ── Steps 3-6: Page image → workbook + preview ───────────────────────
    let mut output = extract_from_image(&page.path, config).await?;
    output.stats.page_count = page.page_count;
    output.stats.page_index = page.page_index;
    output.stats.render_duration_ms = render_ms;
    output.stats.total_duration_ms = total_start.elapsed().as_millis() as u64;

    info!(
        "Extraction complete: {} cells, {} merges, {}ms total",
        output.stats.cell_count, output.stats.merged_ranges, output.stats.total_duration_ms
    );
    Ok(output)
}

/// Run the stages after rasterisation on an existing page image.
///
/// The image is read from `image_path`; the overlay, workbook and preview
/// are written into [`ExtractionConfig::output_dir`]. Page fields of the
/// returned stats stay zero.
pub async fn extract_from_image(
    image_path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, Pdf2XlsxError> {
    let start = Instant::now();
    let page_path = image_path.as_ref().to_path_buf();
    let recognizer = ocr::resolve_recognizer(config)?;
    ensure_output_dir(config).await?;

    let mut stats = ExtractionStats::default();

    // ── Detect the grid ──────────────────────────────────────────────────
    let (detection, ms) = timed(config, Stage::DetectGrid, {
        let path = page_path.clone();
        let cfg = config.clone();
        blocking(move || grid::detect_grid(&path, &cfg))
    })
    .await?;
    stats.detect_duration_ms = ms;
    stats.image_width = detection.image_width;
    stats.image_height = detection.image_height;
    stats.contour_count = detection.regions.len();
    let GridDetection {
        regions,
        overlay_path,
        ..
    } = detection;

    // ── Recognize cell text ──────────────────────────────────────────────
    let (cells, ms) = timed(config, Stage::RecognizeText, {
        let path = page_path.clone();
        let cfg = config.clone();
        let rec = Arc::clone(&recognizer);
        blocking(move || ocr::extract_cells(&path, &regions, rec.as_ref(), &cfg))
    })
    .await?;
    stats.ocr_duration_ms = ms;
    stats.cell_count = cells.len();
    debug!("Recognized {} cells", cells.len());

    // ── Build the workbook ───────────────────────────────────────────────
    let (layout, ms): (SheetLayout, u64) = timed(config, Stage::BuildSheet, {
        let cells: Vec<Cell> = cells.clone();
        let cfg = config.clone();
        blocking(move || sheet::build_sheet(&cells, &cfg))
    })
    .await?;
    stats.sheet_duration_ms = ms;
    stats.merged_ranges = layout.merges.len();

    // ── Render the preview ───────────────────────────────────────────────
    let (preview_grid, ms) = timed(config, Stage::RenderPreview, {
        let cells: Vec<Cell> = cells.clone();
        let cfg = config.clone();
        blocking(move || preview::write_preview(&cells, &cfg))
    })
    .await?;
    stats.preview_duration_ms = ms;
    stats.total_duration_ms = start.elapsed().as_millis() as u64;

    Ok(ExtractionOutput {
        cells,
        layout,
        preview: preview_grid,
        files: OutputFiles {
            page_image: page_path,
            debug_overlay: overlay_path,
            workbook: config.workbook_path(),
            preview: config.preview_path(),
        },
        stats,
    })
}

/// Synchronous wrapper around [`extract_table`].
///
/// Creates a temporary tokio runtime internally.
pub fn extract_table_sync(
    input_str: impl AsRef<str>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, Pdf2XlsxError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Pdf2XlsxError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(extract_table(input_str, config))
}

/// Read PDF metadata without running the pipeline.
///
/// Needs pdfium but no OCR engine.
pub async fn inspect(
    input_str: impl AsRef<str>,
    config: &ExtractionConfig,
) -> Result<DocumentMetadata, Pdf2XlsxError> {
    let pdf_path = input::resolve_input(input_str.as_ref())?;
    render::extract_metadata(
        &pdf_path,
        config.password.as_deref(),
        config.pdfium_lib_path.as_deref(),
    )
    .await
}

// ── Internal helpers ─────────────────────────────────────────────────────

async fn ensure_output_dir(config: &ExtractionConfig) -> Result<(), Pdf2XlsxError> {
    let dir: PathBuf = config.output_dir.clone();
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|source| Pdf2XlsxError::OutputDirFailed { path: dir, source })
}

/// Run a blocking stage on tokio's blocking pool.
async fn blocking<T, F>(f: F) -> Result<T, Pdf2XlsxError>
where
    F: FnOnce() -> Result<T, Pdf2XlsxError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Pdf2XlsxError::Internal(format!("Stage task panicked: {}", e)))?
}

/// Await `fut`, reporting stage start/completion to the progress callback.
async fn timed<T>(
    config: &ExtractionConfig,
    stage: Stage,
    fut: impl std::future::Future<Output = Result<T, Pdf2XlsxError>>,
) -> Result<(T, u64), Pdf2XlsxError> {
    if let Some(ref cb) = config.progress_callback {
        cb.on_stage_start(stage);
    }
    let start = Instant::now();
    let value = fut.await?;
    let elapsed_ms = start.elapsed().as_millis() as u64;
    debug!("{} took {}ms", stage.label(), elapsed_ms);
    if let Some(ref cb) = config.progress_callback {
        cb.on_stage_complete(stage, elapsed_ms);
    }
    Ok((value, elapsed_ms))
}
