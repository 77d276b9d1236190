//! Input intake: validate an uploaded file before any PDF parsing happens.
//!
//! Uploads carry a declared MIME type; anything other than
//! `application/pdf` is rejected with a user-visible error and never reaches
//! pdfium. When reading from disk (the CLI), the MIME type is sniffed from
//! the `%PDF` magic bytes instead of trusting the file extension.

use crate::error::SummarizeError;
use std::path::Path;
use tracing::debug;

/// The only accepted MIME type.
pub const PDF_MIME: &str = "application/pdf";

/// An uploaded file, as received from the user.
#[derive(Clone)]
pub struct Upload {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for Upload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Upload")
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

impl Upload {
    pub fn new(
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a local file, sniffing its MIME type from the first bytes.
    pub async fn from_path(path: &Path) -> Result<Self, SummarizeError> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| SummarizeError::DocumentLoad {
                file_name: file_name.clone(),
                detail: e.to_string(),
            })?;

        let mime_type = sniff_mime(&bytes).to_string();
        debug!("Read {} ({} bytes, {})", path.display(), bytes.len(), mime_type);

        Ok(Self {
            file_name,
            mime_type,
            bytes,
        })
    }

    /// Reject anything not declared as a PDF.
    pub fn validate(&self) -> Result<(), SummarizeError> {
        let declared = self
            .mime_type
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();

        if declared != PDF_MIME {
            return Err(SummarizeError::InvalidFileType {
                file_name: self.file_name.clone(),
                mime_type: self.mime_type.clone(),
            });
        }
        Ok(())
    }
}

/// `application/pdf` when the bytes start with `%PDF`, else
/// `application/octet-stream`.
pub fn sniff_mime(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(b"%PDF") {
        PDF_MIME
    } else {
        "application/octet-stream"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_pdf_mime() {
        let u = Upload::new("a.pdf", "application/pdf", b"%PDF-1.7".to_vec());
        assert!(u.validate().is_ok());
    }

    #[test]
    fn accepts_mime_with_parameters() {
        let u = Upload::new("a.pdf", "Application/PDF; charset=binary", Vec::new());
        assert!(u.validate().is_ok());
    }

    #[test]
    fn rejects_other_mime() {
        let u = Upload::new("photo.png", "image/png", Vec::new());
        match u.validate() {
            Err(SummarizeError::InvalidFileType { file_name, mime_type }) => {
                assert_eq!(file_name, "photo.png");
                assert_eq!(mime_type, "image/png");
            }
            other => panic!("expected InvalidFileType, got {other:?}"),
        }
    }

    #[test]
    fn sniffs_magic_bytes() {
        assert_eq!(sniff_mime(b"%PDF-1.4\n"), PDF_MIME);
        assert_eq!(sniff_mime(b"PK\x03\x04"), "application/octet-stream");
        assert_eq!(sniff_mime(b""), "application/octet-stream");
    }

    #[tokio::test]
    async fn from_path_sniffs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.pdf");
        tokio::fs::write(&path, b"hello").await.unwrap();

        let upload = Upload::from_path(&path).await.unwrap();
        assert_eq!(upload.file_name, "notes.pdf");
        assert!(upload.validate().is_err(), "extension alone must not pass");
    }

    #[tokio::test]
    async fn from_path_missing_file() {
        let result = Upload::from_path(Path::new("/definitely/not/here.pdf")).await;
        assert!(matches!(result, Err(SummarizeError::DocumentLoad { .. })));
    }
}
