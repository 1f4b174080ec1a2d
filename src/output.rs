//! Result types returned by the extraction pipeline.

use crate::pipeline::sheet::SheetLayout;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One recognized table cell.
///
/// `(x, y)` is the top-left pixel of the detected bounding box on the
/// rasterised page; `text` is the trimmed OCR output and may be empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub x: u32,
    pub y: u32,
    pub text: String,
}

impl Cell {
    pub fn new(x: u32, y: u32, text: impl Into<String>) -> Self {
        Self {
            x,
            y,
            text: text.into(),
        }
    }
}

/// Paths of every file written by a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputFiles {
    pub page_image: PathBuf,
    pub debug_overlay: PathBuf,
    pub workbook: PathBuf,
    pub preview: PathBuf,
}

/// Counts and timings for a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionStats {
    /// Pages in the source document.
    pub page_count: usize,
    /// 0-based index of the rasterised page (always `page_count - 1`).
    pub page_index: usize,
    pub image_width: u32,
    pub image_height: u32,
    /// Contours traced in the blended line mask, before the area filter.
    pub contour_count: usize,
    /// Cells recorded after the area filter.
    pub cell_count: usize,
    /// Horizontal merges applied to the workbook.
    pub merged_ranges: usize,

    pub render_duration_ms: u64,
    pub detect_duration_ms: u64,
    pub ocr_duration_ms: u64,
    pub sheet_duration_ms: u64,
    pub preview_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Everything a run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionOutput {
    /// Cells in extractor order (not sorted).
    pub cells: Vec<Cell>,
    /// Final workbook contents.
    pub layout: SheetLayout,
    /// The `preview_rows × preview_cols` preview grid.
    pub preview: Vec<Vec<String>>,
    pub files: OutputFiles,
    pub stats: ExtractionStats,
}

/// Document-level metadata, available without running the pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub page_count: usize,
    pub pdf_version: String,
}
