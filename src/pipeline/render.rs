//! Page rasterisation: render the last page of a PDF via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which keeps thread-local
//! state and is not safe to drive from async contexts. The async entry points
//! here move the work onto tokio's blocking pool.
//!
//! ## Resolution
//!
//! The page is rendered at `dpi / 72` scale. At the default 72 DPI one PDF
//! point becomes one pixel, which is the scale the sheet builder's bucket
//! divisors are tuned for.

use crate::config::ExtractionConfig;
use crate::error::Pdf2XlsxError;
use crate::output::DocumentMetadata;
use image::{DynamicImage, ImageFormat};
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// The rasterised last page.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// Pages in the source document.
    pub page_count: usize,
    /// 0-based index of the rendered page (`page_count - 1`).
    pub page_index: usize,
    pub image: DynamicImage,
    /// Where the PNG was written.
    pub path: PathBuf,
}

/// Rasterise the last page of `pdf_path` and save it to
/// [`ExtractionConfig::page_image_path`].
pub async fn rasterize_last_page(
    pdf_path: &Path,
    config: &ExtractionConfig,
) -> Result<RenderedPage, Pdf2XlsxError> {
    let path = pdf_path.to_path_buf();
    let out = config.page_image_path();
    let scale = config.render_scale();
    let password = config.password.clone();
    let lib = config.pdfium_lib_path.clone();

    tokio::task::spawn_blocking(move || {
        rasterize_last_page_blocking(&path, &out, scale, password.as_deref(), lib.as_deref())
    })
    .await
    .map_err(|e| Pdf2XlsxError::Internal(format!("Render task panicked: {}", e)))?
}

/// Blocking implementation of last-page rendering.
fn rasterize_last_page_blocking(
    pdf_path: &Path,
    out_path: &Path,
    scale: f32,
    password: Option<&str>,
    lib_path: Option<&Path>,
) -> Result<RenderedPage, Pdf2XlsxError> {
    let pdfium = bind_pdfium(lib_path)?;

    let document = pdfium
        .load_pdf_from_file(pdf_path, password)
        .map_err(|e| classify_load_error(pdf_path, password, e))?;

    let pages = document.pages();
    let page_count = pages.len() as usize;
    info!("PDF loaded: {} pages", page_count);

    let page_index = page_count
        .checked_sub(1)
        .ok_or_else(|| Pdf2XlsxError::EmptyDocument {
            path: pdf_path.to_path_buf(),
        })?;

    let page = pages
        .get(page_index as u16)
        .map_err(|e| Pdf2XlsxError::RasterisationFailed {
            page: page_index + 1,
            detail: format!("{:?}", e),
        })?;

    let render_config = PdfRenderConfig::new().scale_page_by_factor(scale);
    let bitmap = page.render_with_config(&render_config).map_err(|e| {
        Pdf2XlsxError::RasterisationFailed {
            page: page_index + 1,
            detail: format!("{:?}", e),
        }
    })?;

    let image = bitmap.as_image();
    debug!(
        "Rendered page {} → {}x{} px",
        page_index + 1,
        image.width(),
        image.height()
    );

    image
        .save_with_format(out_path, ImageFormat::Png)
        .map_err(|source| Pdf2XlsxError::ImageWrite {
            path: out_path.to_path_buf(),
            source,
        })?;
    info!("Saved last page to {}", out_path.display());

    Ok(RenderedPage {
        page_count,
        page_index,
        image,
        path: out_path.to_path_buf(),
    })
}

/// Extract document metadata from a PDF without rendering pages.
pub async fn extract_metadata(
    pdf_path: &Path,
    password: Option<&str>,
    lib_path: Option<&Path>,
) -> Result<DocumentMetadata, Pdf2XlsxError> {
    let path = pdf_path.to_path_buf();
    let pwd = password.map(|s| s.to_string());
    let lib = lib_path.map(Path::to_path_buf);

    tokio::task::spawn_blocking(move || {
        extract_metadata_blocking(&path, pwd.as_deref(), lib.as_deref())
    })
    .await
    .map_err(|e| Pdf2XlsxError::Internal(format!("Metadata task panicked: {}", e)))?
}

/// Blocking implementation of metadata extraction.
fn extract_metadata_blocking(
    pdf_path: &Path,
    password: Option<&str>,
    lib_path: Option<&Path>,
) -> Result<DocumentMetadata, Pdf2XlsxError> {
    let pdfium = bind_pdfium(lib_path)?;

    let document = pdfium
        .load_pdf_from_file(pdf_path, password)
        .map_err(|e| classify_load_error(pdf_path, password, e))?;

    let metadata = document.metadata();

    let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
        metadata.get(tag).and_then(|t| {
            let v = t.value().to_string();
            if v.is_empty() {
                None
            } else {
                Some(v)
            }
        })
    };

    Ok(DocumentMetadata {
        title: get_meta(PdfDocumentMetadataTagType::Title),
        author: get_meta(PdfDocumentMetadataTagType::Author),
        subject: get_meta(PdfDocumentMetadataTagType::Subject),
        creator: get_meta(PdfDocumentMetadataTagType::Creator),
        producer: get_meta(PdfDocumentMetadataTagType::Producer),
        page_count: document.pages().len() as usize,
        pdf_version: format!("{:?}", document.version()),
    })
}

/// Bind to a pdfium library.
///
/// Resolution order: explicit path, `PDFIUM_LIB_PATH`, the platform library
/// in the working directory, the system library.
fn bind_pdfium(lib_path: Option<&Path>) -> Result<Pdfium, Pdf2XlsxError> {
    let explicit = lib_path.map(Path::to_path_buf).or_else(|| {
        std::env::var("PDFIUM_LIB_PATH")
            .ok()
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
    });

    let bindings = match explicit {
        Some(path) => Pdfium::bind_to_library(path.to_string_lossy().to_string())
            .map_err(|e| Pdf2XlsxError::PdfiumBindingFailed(format!("{}: {:?}", path.display(), e)))?,
        None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library())
            .map_err(|e| Pdf2XlsxError::PdfiumBindingFailed(format!("{:?}", e)))?,
    };

    Ok(Pdfium::new(bindings))
}

/// Map a pdfium load failure to the most specific error we can name.
fn classify_load_error(pdf_path: &Path, password: Option<&str>, e: PdfiumError) -> Pdf2XlsxError {
    let err_str = format!("{:?}", e);
    if err_str.contains("Password") || err_str.contains("password") {
        if password.is_some() {
            Pdf2XlsxError::WrongPassword {
                path: pdf_path.to_path_buf(),
            }
        } else {
            Pdf2XlsxError::PasswordRequired {
                path: pdf_path.to_path_buf(),
            }
        }
    } else {
        Pdf2XlsxError::CorruptPdf {
            path: pdf_path.to_path_buf(),
            detail: err_str,
        }
    }
}
