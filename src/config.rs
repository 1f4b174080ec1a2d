//! Configuration for a table-extraction run.
//!
//! Every constant the heuristic depends on (threshold, kernel shapes, bucket
//! divisors, merge threshold, preview dimensions) lives in
//! [`ExtractionConfig`] with fixed defaults. The CLI only exposes the
//! environment-facing knobs (paths, DPI, OCR language); the heuristic
//! constants are reachable through the builder for library callers and tests.

use crate::error::Pdf2XlsxError;
use crate::pipeline::ocr::CellRecognizer;
use crate::progress::ProgressCallback;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// File name of the rasterised last page.
pub const PAGE_IMAGE_FILE: &str = "last_page_image.png";
/// File name of the contour debug overlay.
pub const DEBUG_OVERLAY_FILE: &str = "debug_table_structure.png";
/// File name of the output workbook.
pub const WORKBOOK_FILE: &str = "output_table_structure.xlsx";
/// File name of the 7×20 preview table image.
pub const PREVIEW_FILE: &str = "truth_table.png";

/// A rectangular structuring element, `width × height` pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Kernel {
    pub width: u32,
    pub height: u32,
}

impl Kernel {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Configuration for one extraction run.
///
/// Built via [`ExtractionConfig::builder()`] or [`ExtractionConfig::default()`].
///
/// # Example
/// ```rust
/// use pdf2xlsx::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .output_dir("out")
///     .ocr_language("eng+deu")
///     .build()
///     .unwrap();
/// assert_eq!(config.row_divisor, 20);
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    // ── Rasterizer ───────────────────────────────────────────────────────
    /// Rendering DPI for the last page. Range: 72–400. Default: 72.
    ///
    /// 72 DPI maps one PDF point to one pixel. The bucket divisors below are
    /// expressed in pixels, so changing the DPI rescales every cell position.
    pub dpi: u32,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Explicit path to libpdfium. Falls back to `PDFIUM_LIB_PATH`, then the
    /// working directory, then the system library.
    pub pdfium_lib_path: Option<PathBuf>,

    // ── Grid detector ────────────────────────────────────────────────────
    /// Grayscale values at or below this become foreground. Default: 150.
    pub threshold: u8,

    /// Kernel isolating vertical lines. Default: 1×15.
    pub v_kernel: Kernel,

    /// Kernel isolating horizontal lines. Default: 15×1.
    pub h_kernel: Kernel,

    /// Erosions (then dilations) per opening. Default: 2.
    pub morph_iterations: u32,

    /// Contours must have an area strictly greater than this. Default: 100.
    pub min_contour_area: f64,

    // ── OCR ──────────────────────────────────────────────────────────────
    /// Tesseract language codes, e.g. "eng" or "eng+fra". Default: "eng".
    pub ocr_language: String,

    /// Tesseract page segmentation mode. Default: 6 (single uniform block).
    pub ocr_psm: u32,

    /// Directory holding `*.traineddata`. `None` uses Tesseract's default.
    pub tessdata_dir: Option<PathBuf>,

    /// Pre-constructed recognizer. Takes precedence over the built-in
    /// Tesseract recognizer.
    pub recognizer: Option<Arc<dyn CellRecognizer>>,

    // ── Sheet builder ────────────────────────────────────────────────────
    /// Pixel height of one spreadsheet row bucket. Default: 20.
    pub row_divisor: u32,

    /// Pixel width of one spreadsheet column bucket. Default: 50.
    pub col_divisor: u32,

    /// A merge group merges only if its x-spread is strictly below this. Default: 50.
    pub merge_x_threshold: u32,

    // ── Preview ──────────────────────────────────────────────────────────
    /// Preview table rows. Default: 7.
    pub preview_rows: usize,

    /// Preview table columns. Default: 20.
    pub preview_cols: usize,

    /// TrueType/OpenType font for preview text. `None` probes well-known
    /// system fonts.
    pub preview_font: Option<PathBuf>,

    // ── Output ───────────────────────────────────────────────────────────
    /// Directory receiving the four output files. Default: ".".
    pub output_dir: PathBuf,

    /// Optional progress callback.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            dpi: 72,
            password: None,
            pdfium_lib_path: None,
            threshold: 150,
            v_kernel: Kernel::new(1, 15),
            h_kernel: Kernel::new(15, 1),
            morph_iterations: 2,
            min_contour_area: 100.0,
            ocr_language: "eng".to_string(),
            ocr_psm: 6,
            tessdata_dir: None,
            recognizer: None,
            row_divisor: 20,
            col_divisor: 50,
            merge_x_threshold: 50,
            preview_rows: 7,
            preview_cols: 20,
            preview_font: None,
            output_dir: PathBuf::from("."),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("dpi", &self.dpi)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("pdfium_lib_path", &self.pdfium_lib_path)
            .field("threshold", &self.threshold)
            .field("v_kernel", &self.v_kernel)
            .field("h_kernel", &self.h_kernel)
            .field("morph_iterations", &self.morph_iterations)
            .field("min_contour_area", &self.min_contour_area)
            .field("ocr_language", &self.ocr_language)
            .field("ocr_psm", &self.ocr_psm)
            .field("tessdata_dir", &self.tessdata_dir)
            .field("recognizer", &self.recognizer.as_ref().map(|_| "<dyn CellRecognizer>"))
            .field("row_divisor", &self.row_divisor)
            .field("col_divisor", &self.col_divisor)
            .field("merge_x_threshold", &self.merge_x_threshold)
            .field("preview_rows", &self.preview_rows)
            .field("preview_cols", &self.preview_cols)
            .field("preview_font", &self.preview_font)
            .field("output_dir", &self.output_dir)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ExtractionProgressCallback>"),
            )
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }

    pub fn page_image_path(&self) -> PathBuf {
        self.output_dir.join(PAGE_IMAGE_FILE)
    }

    pub fn debug_overlay_path(&self) -> PathBuf {
        self.output_dir.join(DEBUG_OVERLAY_FILE)
    }

    pub fn workbook_path(&self) -> PathBuf {
        self.output_dir.join(WORKBOOK_FILE)
    }

    pub fn preview_path(&self) -> PathBuf {
        self.output_dir.join(PREVIEW_FILE)
    }

    /// Render scale relative to 72 DPI.
    pub fn render_scale(&self) -> f32 {
        self.dpi as f32 / 72.0
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 400);
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    pub fn threshold(mut self, t: u8) -> Self {
        self.config.threshold = t;
        self
    }

    pub fn v_kernel(mut self, width: u32, height: u32) -> Self {
        self.config.v_kernel = Kernel::new(width, height);
        self
    }

    pub fn h_kernel(mut self, width: u32, height: u32) -> Self {
        self.config.h_kernel = Kernel::new(width, height);
        self
    }

    pub fn morph_iterations(mut self, n: u32) -> Self {
        self.config.morph_iterations = n;
        self
    }

    pub fn min_contour_area(mut self, area: f64) -> Self {
        self.config.min_contour_area = area;
        self
    }

    pub fn ocr_language(mut self, lang: impl Into<String>) -> Self {
        self.config.ocr_language = lang.into();
        self
    }

    pub fn ocr_psm(mut self, psm: u32) -> Self {
        self.config.ocr_psm = psm;
        self
    }

    pub fn tessdata_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.tessdata_dir = Some(dir.into());
        self
    }

    pub fn recognizer(mut self, recognizer: Arc<dyn CellRecognizer>) -> Self {
        self.config.recognizer = Some(recognizer);
        self
    }

    pub fn row_divisor(mut self, px: u32) -> Self {
        self.config.row_divisor = px;
        self
    }

    pub fn col_divisor(mut self, px: u32) -> Self {
        self.config.col_divisor = px;
        self
    }

    pub fn merge_x_threshold(mut self, px: u32) -> Self {
        self.config.merge_x_threshold = px;
        self
    }

    pub fn preview_size(mut self, rows: usize, cols: usize) -> Self {
        self.config.preview_rows = rows;
        self.config.preview_cols = cols;
        self
    }

    pub fn preview_font(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.preview_font = Some(path.into());
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, Pdf2XlsxError> {
        let c = &self.config;
        if c.dpi < 72 || c.dpi > 400 {
            return Err(Pdf2XlsxError::InvalidConfig(format!(
                "DPI must be 72–400, got {}",
                c.dpi
            )));
        }
        for (name, k) in [("v_kernel", c.v_kernel), ("h_kernel", c.h_kernel)] {
            if k.width == 0 || k.height == 0 {
                return Err(Pdf2XlsxError::InvalidConfig(format!(
                    "{name} must be at least 1×1, got {}×{}",
                    k.width, k.height
                )));
            }
        }
        if c.row_divisor == 0 || c.col_divisor == 0 {
            return Err(Pdf2XlsxError::InvalidConfig(
                "Bucket divisors must be ≥ 1".into(),
            ));
        }
        if c.preview_rows == 0 || c.preview_cols == 0 {
            return Err(Pdf2XlsxError::InvalidConfig(
                "Preview grid must be at least 1×1".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_fixed_constants() {
        let c = ExtractionConfig::default();
        assert_eq!(c.threshold, 150);
        assert_eq!(c.v_kernel, Kernel::new(1, 15));
        assert_eq!(c.h_kernel, Kernel::new(15, 1));
        assert_eq!(c.morph_iterations, 2);
        assert_eq!(c.min_contour_area, 100.0);
        assert_eq!((c.row_divisor, c.col_divisor), (20, 50));
        assert_eq!(c.merge_x_threshold, 50);
        assert_eq!((c.preview_rows, c.preview_cols), (7, 20));
        assert_eq!(c.ocr_psm, 6);
    }

    #[test]
    fn output_paths_use_fixed_names() {
        let c = ExtractionConfig::builder().output_dir("/tmp/run").build().unwrap();
        assert_eq!(c.page_image_path(), PathBuf::from("/tmp/run/last_page_image.png"));
        assert_eq!(
            c.debug_overlay_path(),
            PathBuf::from("/tmp/run/debug_table_structure.png")
        );
        assert_eq!(
            c.workbook_path(),
            PathBuf::from("/tmp/run/output_table_structure.xlsx")
        );
        assert_eq!(c.preview_path(), PathBuf::from("/tmp/run/truth_table.png"));
    }

    #[test]
    fn dpi_is_clamped() {
        let c = ExtractionConfig::builder().dpi(1000).build().unwrap();
        assert_eq!(c.dpi, 400);
        let c = ExtractionConfig::builder().dpi(10).build().unwrap();
        assert_eq!(c.dpi, 72);
        assert_eq!(c.render_scale(), 1.0);
    }

    #[test]
    fn zero_divisor_is_rejected() {
        let err = ExtractionConfig::builder().col_divisor(0).build().unwrap_err();
        assert!(matches!(err, Pdf2XlsxError::InvalidConfig(_)));
    }

    #[test]
    fn empty_kernel_is_rejected() {
        let err = ExtractionConfig::builder().v_kernel(0, 15).build().unwrap_err();
        assert!(err.to_string().contains("v_kernel"));
    }

    #[test]
    fn empty_preview_is_rejected() {
        assert!(ExtractionConfig::builder().preview_size(0, 20).build().is_err());
    }

    #[test]
    fn debug_redacts_password() {
        let c = ExtractionConfig::builder().password("hunter2").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("hunter2"));
        assert!(dbg.contains("<redacted>"));
    }
}
