//! Text extraction for saved attachments.
//!
//! PDF attachments go through the text layer; plaintext formats are read
//! directly. Scanned PDFs with no text layer come back empty, which the
//! invoice parser treats as unparsed.

use std::path::Path;

use crate::error::ExtractError;

/// Cap on bytes read from a plaintext attachment.
const MAX_EXTRACT_BYTES: usize = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SupportedFormat {
    Pdf,
    Text,
}

impl SupportedFormat {
    pub fn detect(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "pdf" => Some(SupportedFormat::Pdf),
            "txt" | "csv" | "md" => Some(SupportedFormat::Text),
            _ => None,
        }
    }
}

/// Extract text from an attachment on disk.
pub fn extract_text(path: &Path) -> Result<String, ExtractError> {
    if !path.exists() {
        return Err(ExtractError::NotFound(path.to_path_buf()));
    }

    let format = SupportedFormat::detect(path).ok_or_else(|| {
        ExtractError::Unsupported(
            path.extension()
                .and_then(|e| e.to_str())
                .unwrap_or("(none)")
                .to_string(),
        )
    })?;

    match format {
        SupportedFormat::Pdf => {
            pdf_extract::extract_text(path).map_err(|e| ExtractError::Pdf(e.to_string()))
        }
        SupportedFormat::Text => {
            let bytes = std::fs::read(path)?;
            let truncated = if bytes.len() > MAX_EXTRACT_BYTES {
                &bytes[..MAX_EXTRACT_BYTES]
            } else {
                &bytes[..]
            };
            Ok(String::from_utf8_lossy(truncated).into_owned())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_format_detection() {
        assert_eq!(
            SupportedFormat::detect(&PathBuf::from("factura_001.PDF")),
            Some(SupportedFormat::Pdf)
        );
        assert_eq!(
            SupportedFormat::detect(&PathBuf::from("orders.csv")),
            Some(SupportedFormat::Text)
        );
        assert_eq!(SupportedFormat::detect(&PathBuf::from("logo.png")), None);
        assert_eq!(SupportedFormat::detect(&PathBuf::from("noext")), None);
    }

    #[test]
    fn test_plaintext_extraction() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("note.txt");
        std::fs::write(&path, "Invoice INV-17 total 120.50 EUR").expect("write");

        let text = extract_text(&path).expect("extract");
        assert!(text.contains("INV-17"));
    }

    #[test]
    fn test_missing_file_errors() {
        let result = extract_text(&PathBuf::from("/nonexistent/file.pdf"));
        assert!(matches!(result, Err(ExtractError::NotFound(_))));
    }
}
