//! Input resolution: validate the user-supplied path before pdfium sees it.
//!
//! pdfium reports a missing or non-PDF file as a generic load failure. We
//! check existence, read permission and the `%PDF` magic bytes up front so
//! callers get a meaningful error instead.

use crate::error::Pdf2XlsxError;
use std::io::Read;
use std::path::PathBuf;
use tracing::debug;

/// Resolve a local file path, validating existence and PDF magic bytes.
///
/// Files shorter than four bytes are passed through; pdfium reports them as
/// corrupt when the rasterizer opens them.
pub fn resolve_input(path_str: &str) -> Result<PathBuf, Pdf2XlsxError> {
    let path = PathBuf::from(path_str);

    if !path.exists() {
        return Err(Pdf2XlsxError::FileNotFound { path });
    }

    match std::fs::File::open(&path) {
        Ok(mut f) => {
            let mut magic = [0u8; 4];
            if f.read_exact(&mut magic).is_ok() && &magic != b"%PDF" {
                return Err(Pdf2XlsxError::NotAPdf { path, magic });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(Pdf2XlsxError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(Pdf2XlsxError::FileNotFound { path });
        }
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_is_reported() {
        let err = resolve_input("/definitely/not/here/Alibag.pdf").unwrap_err();
        assert!(matches!(err, Pdf2XlsxError::FileNotFound { .. }));
    }

    #[test]
    fn non_pdf_is_rejected_with_magic() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"PK\x03\x04 not a pdf").unwrap();
        let err = resolve_input(f.path().to_str().unwrap()).unwrap_err();
        match err {
            Pdf2XlsxError::NotAPdf { magic, .. } => assert_eq!(&magic, b"PK\x03\x04"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn pdf_header_is_accepted() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"%PDF-1.7\n%\xe2\xe3\xcf\xd3\n").unwrap();
        let path = resolve_input(f.path().to_str().unwrap()).unwrap();
        assert_eq!(path, f.path());
    }

    #[test]
    fn tiny_file_is_passed_through() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"%P").unwrap();
        assert!(resolve_input(f.path().to_str().unwrap()).is_ok());
    }
}
