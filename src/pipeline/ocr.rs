//! Cell text extraction: crop each candidate region and run OCR on it.
//!
//! The OCR engine sits behind [`CellRecognizer`]. The production
//! implementation, [`TesseractRecognizer`], is compiled with the `tesseract`
//! feature; callers (and tests) can inject any other implementation through
//! [`crate::config::ExtractionConfigBuilder::recognizer`].

use crate::config::ExtractionConfig;
use crate::error::Pdf2XlsxError;
use crate::output::Cell;
use crate::pipeline::grid::{passes_area_filter, BoundingBox, Region};
use image::DynamicImage;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Recognizes the text inside one cropped cell image.
///
/// Implementations must be `Send + Sync`: the pipeline runs recognition on
/// tokio's blocking pool.
pub trait CellRecognizer: Send + Sync {
    /// Return the raw recognized text. The caller trims it.
    ///
    /// `bounds` is where `cell` was cropped from on the page.
    fn recognize(&self, cell: &DynamicImage, bounds: BoundingBox) -> Result<String, Pdf2XlsxError>;
}

/// Pick the recognizer for a run: the injected one, else Tesseract when
/// compiled in.
pub fn resolve_recognizer(
    config: &ExtractionConfig,
) -> Result<Arc<dyn CellRecognizer>, Pdf2XlsxError> {
    if let Some(ref recognizer) = config.recognizer {
        return Ok(Arc::clone(recognizer));
    }

    #[cfg(feature = "tesseract")]
    {
        let tess = TesseractRecognizer::new(
            &config.ocr_language,
            config.ocr_psm,
            config.tessdata_dir.as_deref(),
        )?;
        Ok(Arc::new(tess))
    }

    #[cfg(not(feature = "tesseract"))]
    {
        Err(Pdf2XlsxError::RecognizerNotConfigured {
            hint: "This build has no Tesseract support. Rebuild with `--features tesseract`, \
                   or inject a recognizer via ExtractionConfig::builder().recognizer(..)."
                .to_string(),
        })
    }
}

/// Load the page image and recognize every candidate region.
pub fn extract_cells(
    image_path: &Path,
    regions: &[Region],
    recognizer: &dyn CellRecognizer,
    config: &ExtractionConfig,
) -> Result<Vec<Cell>, Pdf2XlsxError> {
    let image = image::open(image_path).map_err(|source| Pdf2XlsxError::ImageLoad {
        path: image_path.to_path_buf(),
        source,
    })?;
    recognize_regions(&image, regions, recognizer, config)
}

/// Recognize every region whose area passes the filter, in region order.
///
/// Cells are recorded even when the recognized text is empty.
pub fn recognize_regions(
    image: &DynamicImage,
    regions: &[Region],
    recognizer: &dyn CellRecognizer,
    config: &ExtractionConfig,
) -> Result<Vec<Cell>, Pdf2XlsxError> {
    let candidates: Vec<&Region> = regions
        .iter()
        .filter(|r| passes_area_filter(r.area, config.min_contour_area))
        .collect();
    let total = candidates.len();
    debug!("Recognizing {} of {} regions", total, regions.len());

    let mut cells = Vec::with_capacity(total);
    for (index, region) in candidates.into_iter().enumerate() {
        let b = region.bounds;
        let crop = image.crop_imm(b.x, b.y, b.width, b.height);
        let text = recognizer.recognize(&crop, b)?.trim().to_string();

        info!("Cell at ({}, {}): {}", b.x, b.y, text);
        if let Some(ref cb) = config.progress_callback {
            cb.on_cell_recognized(index, total, &text);
        }
        cells.push(Cell::new(b.x, b.y, text));
    }

    Ok(cells)
}

/// Tesseract-backed recognizer.
///
/// A fresh engine is initialised per cell; Tesseract handles are neither
/// `Send` nor `Sync`.
#[cfg(feature = "tesseract")]
#[derive(Debug, Clone)]
pub struct TesseractRecognizer {
    language: String,
    psm: u32,
    tessdata: Option<String>,
}

#[cfg(feature = "tesseract")]
impl TesseractRecognizer {
    /// Verify Tesseract initialises with `language` and build a recognizer.
    pub fn new(language: &str, psm: u32, tessdata: Option<&Path>) -> Result<Self, Pdf2XlsxError> {
        let recognizer = Self {
            language: language.to_string(),
            psm,
            tessdata: tessdata.map(|p| p.to_string_lossy().to_string()),
        };
        recognizer.engine()?;
        Ok(recognizer)
    }

    fn engine(&self) -> Result<leptess::LepTess, Pdf2XlsxError> {
        let mut lt = leptess::LepTess::new(self.tessdata.as_deref(), &self.language).map_err(
            |e| Pdf2XlsxError::RecognizerNotConfigured {
                hint: format!(
                    "Failed to initialise Tesseract with language '{}': {}.\n\
                     Make sure the language data is installed (e.g. `apt install tesseract-ocr-eng`) \
                     or point --tessdata at a directory with {}.traineddata.",
                    self.language, e, self.language
                ),
            },
        )?;
        lt.set_variable(leptess::Variable::TesseditPagesegMode, &self.psm.to_string())
            .map_err(|e| Pdf2XlsxError::RecognizerNotConfigured {
                hint: format!("Failed to set page segmentation mode {}: {}", self.psm, e),
            })?;
        Ok(lt)
    }
}

#[cfg(feature = "tesseract")]
impl CellRecognizer for TesseractRecognizer {
    fn recognize(&self, cell: &DynamicImage, bounds: BoundingBox) -> Result<String, Pdf2XlsxError> {
        let failed = |detail: String| Pdf2XlsxError::OcrFailed {
            x: bounds.x,
            y: bounds.y,
            detail,
        };

        let mut lt = self.engine()?;

        // leptess decodes encoded image data, not raw pixels.
        let mut png = std::io::Cursor::new(Vec::new());
        cell.write_to(&mut png, image::ImageFormat::Png)
            .map_err(|e| failed(format!("PNG encode: {e}")))?;
        lt.set_image_from_mem(png.get_ref())
            .map_err(|e| failed(format!("set image: {e}")))?;

        lt.get_utf8_text().map_err(|e| failed(e.to_string()))
    }
}
