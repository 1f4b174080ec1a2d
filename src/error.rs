//! Error types for the pdf2xlsx library.
//!
//! Every stage of the pipeline returns [`Pdf2XlsxError`]. There is no
//! non-fatal variant: a missing file, an unreadable page, an absent OCR
//! engine or a failed workbook write all abort the run, and whatever
//! output files were already written stay on disk as they are.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdf2xlsx library.
#[derive(Debug, Error)]
pub enum Pdf2XlsxError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}\nTry repairing with: qpdf --decrypt input.pdf output.pdf")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// The document opened fine but has no page to rasterise.
    #[error("PDF '{path}' has no pages")]
    EmptyDocument { path: PathBuf },

    /// pdfium-render returned an error for the selected page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
You can:\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium (or pass --pdfium-lib).\n\
  • Place libpdfium next to the working directory.\n\
  • Install pdfium system-wide. Prebuilt binaries:\n\
    https://github.com/bblanchon/pdfium-binaries/releases\n"
    )]
    PdfiumBindingFailed(String),

    // ── Image errors ──────────────────────────────────────────────────────
    /// A raster image could not be opened or decoded.
    #[error("Failed to load image '{path}': {source}")]
    ImageLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// A raster image (page, overlay or preview) could not be written.
    #[error("Failed to write image '{path}': {source}")]
    ImageWrite {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// The preview font could not be read or parsed.
    #[error("Failed to load preview font '{path}': {detail}")]
    FontLoad { path: PathBuf, detail: String },

    // ── OCR errors ────────────────────────────────────────────────────────
    /// No cell recognizer was injected and none is compiled in.
    #[error("No OCR engine is configured.\n{hint}")]
    RecognizerNotConfigured { hint: String },

    /// The OCR engine failed on a cell.
    #[error("OCR failed for cell at ({x}, {y}): {detail}")]
    OcrFailed { x: u32, y: u32, detail: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create or write the output workbook.
    #[error("Failed to write workbook '{path}': {detail}")]
    WorkbookWrite { path: PathBuf, detail: String },

    /// Could not create the output directory.
    #[error("Failed to create output directory '{path}': {source}")]
    OutputDirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_a_pdf_display_shows_magic() {
        let e = Pdf2XlsxError::NotAPdf {
            path: PathBuf::from("table.png"),
            magic: *b"\x89PNG",
        };
        let msg = e.to_string();
        assert!(msg.contains("table.png"), "got: {msg}");
        assert!(msg.contains("137"), "got: {msg}");
    }

    #[test]
    fn ocr_failed_display_names_cell() {
        let e = Pdf2XlsxError::OcrFailed {
            x: 40,
            y: 120,
            detail: "engine crashed".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("(40, 120)"));
        assert!(msg.contains("engine crashed"));
    }

    #[test]
    fn empty_document_display() {
        let e = Pdf2XlsxError::EmptyDocument {
            path: PathBuf::from("blank.pdf"),
        };
        assert!(e.to_string().contains("no pages"));
    }

    #[test]
    fn image_write_keeps_source() {
        use std::error::Error as _;
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let e = Pdf2XlsxError::ImageWrite {
            path: PathBuf::from("/ro/truth_table.png"),
            source: image::ImageError::IoError(io),
        };
        assert!(e.source().is_some());
        assert!(e.to_string().contains("truth_table.png"));
    }
}
