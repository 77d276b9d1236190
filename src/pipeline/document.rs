//! PDF access: page count, text layer and page rasterisation via pdfium.
//!
//! The rest of the pipeline talks to the [`PageSource`] trait, never to
//! pdfium directly, so tests and alternative backends can supply pages
//! without a native library.
//!
//! ## Why spawn_blocking?
//!
//! pdfium is a C++ library with thread-local state; it is not safe to call
//! from async contexts. Every pdfium operation runs on tokio's blocking pool
//! and re-opens the document from the in-memory bytes, so no pdfium handle
//! ever crosses an `.await`.

use crate::error::{PageError, SummarizeError};
use crate::pipeline::input::Upload;
use async_trait::async_trait;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// A readable, renderable page collection.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Number of pages in the document.
    fn page_count(&self) -> usize;

    /// Embedded text of a 1-indexed page: text segments in document order
    /// joined by single spaces. Empty for image-only pages.
    async fn text_layer(&self, page_num: usize) -> Result<String, PageError>;

    /// Rasterise a 1-indexed page at `scale` × its natural size.
    async fn render_page(&self, page_num: usize, scale: f32) -> Result<DynamicImage, PageError>;
}

/// An opened document. Cheap to clone; never mutated.
#[derive(Clone)]
pub struct Document {
    file_name: String,
    page_count: usize,
    source: Arc<dyn PageSource>,
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("file_name", &self.file_name)
            .field("page_count", &self.page_count)
            .finish()
    }
}

impl Document {
    /// Wrap an existing page source.
    pub fn new(file_name: impl Into<String>, source: Arc<dyn PageSource>) -> Self {
        Self {
            file_name: file_name.into(),
            page_count: source.page_count(),
            source,
        }
    }

    /// Validate an upload and open it with pdfium.
    ///
    /// # Errors
    /// - [`SummarizeError::InvalidFileType`]: not declared `application/pdf`
    /// - [`SummarizeError::DocumentLoad`]: corrupt, encrypted, or unreadable
    /// - [`SummarizeError::PdfiumBindingFailed`]: no pdfium library found
    pub async fn open(upload: Upload, password: Option<&str>) -> Result<Self, SummarizeError> {
        upload.validate()?;
        let Upload {
            file_name, bytes, ..
        } = upload;
        let source =
            PdfiumSource::open(file_name.clone(), bytes, password.map(str::to_string)).await?;
        Ok(Self::new(file_name, Arc::new(source)))
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    pub fn source(&self) -> &Arc<dyn PageSource> {
        &self.source
    }
}

// ── pdfium backend ───────────────────────────────────────────────────────

/// Bind to pdfium: `PDFIUM_LIB_PATH` (a library file or the directory
/// holding it) when set, else the system library.
pub fn bind_pdfium() -> Result<Pdfium, SummarizeError> {
    let bindings = match std::env::var("PDFIUM_LIB_PATH") {
        Ok(p) if !p.trim().is_empty() => {
            let path = PathBuf::from(p.trim());
            let lib = if path.is_dir() {
                Pdfium::pdfium_platform_library_name_at_path(&path)
            } else {
                path
            };
            debug!("Binding pdfium from {}", lib.display());
            Pdfium::bind_to_library(lib)
        }
        _ => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| SummarizeError::PdfiumBindingFailed(format!("{:?}", e)))?;

    Ok(Pdfium::new(bindings))
}

/// [`PageSource`] backed by pdfium and the document bytes held in memory.
pub struct PdfiumSource {
    bytes: Arc<Vec<u8>>,
    password: Option<String>,
    page_count: usize,
}

impl PdfiumSource {
    /// Parse the bytes once to validate them and count pages.
    pub async fn open(
        file_name: String,
        bytes: Vec<u8>,
        password: Option<String>,
    ) -> Result<Self, SummarizeError> {
        let bytes = Arc::new(bytes);
        let count_bytes = Arc::clone(&bytes);
        let count_password = password.clone();
        let count_name = file_name.clone();

        let page_count = tokio::task::spawn_blocking(move || {
            count_pages_blocking(&count_name, &count_bytes, count_password.as_deref())
        })
        .await
        .map_err(|e| SummarizeError::Internal(format!("Load task panicked: {}", e)))??;

        info!("PDF loaded: '{}' has {} pages", file_name, page_count);

        Ok(Self {
            bytes,
            password,
            page_count,
        })
    }

    /// Run `op` against one page on the blocking pool.
    async fn with_page<T, F>(&self, page_num: usize, op: F) -> Result<T, String>
    where
        F: FnOnce(&PdfPage<'_>) -> Result<T, String> + Send + 'static,
        T: Send + 'static,
    {
        let bytes = Arc::clone(&self.bytes);
        let password = self.password.clone();

        tokio::task::spawn_blocking(move || {
            let pdfium = bind_pdfium().map_err(|e| e.to_string())?;
            let document = pdfium
                .load_pdf_from_byte_slice(&bytes, password.as_deref())
                .map_err(|e| format!("{:?}", e))?;
            let page = document
                .pages()
                .get((page_num - 1) as u16)
                .map_err(|e| format!("{:?}", e))?;
            op(&page)
        })
        .await
        .map_err(|e| format!("pdfium task panicked: {}", e))?
    }

    fn check_range(&self, page_num: usize) -> Result<(), PageError> {
        if page_num == 0 || page_num > self.page_count {
            return Err(PageError::OutOfRange {
                page: page_num,
                total: self.page_count,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PageSource for PdfiumSource {
    fn page_count(&self) -> usize {
        self.page_count
    }

    async fn text_layer(&self, page_num: usize) -> Result<String, PageError> {
        self.check_range(page_num)?;
        self.with_page(page_num, |page| {
            let text = page.text().map_err(|e| format!("{:?}", e))?;
            let segments: Vec<String> = text
                .segments()
                .iter()
                .map(|segment| segment.text())
                .collect();
            Ok(segments.join(" "))
        })
        .await
        .map_err(|detail| PageError::TextLayerFailed {
            page: page_num,
            detail,
        })
    }

    async fn render_page(&self, page_num: usize, scale: f32) -> Result<DynamicImage, PageError> {
        self.check_range(page_num)?;
        let image = self
            .with_page(page_num, move |page| {
                let render_config = PdfRenderConfig::new().scale_page_by_factor(scale);
                let bitmap = page
                    .render_with_config(&render_config)
                    .map_err(|e| format!("{:?}", e))?;
                Ok(bitmap.as_image())
            })
            .await
            .map_err(|detail| PageError::RenderFailed {
                page: page_num,
                detail,
            })?;

        debug!(
            "Rendered page {} at {:.1}x → {}x{} px",
            page_num,
            scale,
            image.width(),
            image.height()
        );
        Ok(image)
    }
}

fn count_pages_blocking(
    file_name: &str,
    bytes: &[u8],
    password: Option<&str>,
) -> Result<usize, SummarizeError> {
    let pdfium = bind_pdfium()?;

    let document = pdfium
        .load_pdf_from_byte_slice(bytes, password)
        .map_err(|e| {
            let err_str = format!("{:?}", e);
            let detail = if err_str.contains("Password") || err_str.contains("password") {
                if password.is_some() {
                    "wrong password".to_string()
                } else {
                    "document is encrypted and requires a password".to_string()
                }
            } else {
                err_str
            };
            SummarizeError::DocumentLoad {
                file_name: file_name.to_string(),
                detail,
            }
        })?;

    Ok(document.pages().len() as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedSource(usize);

    #[async_trait]
    impl PageSource for FixedSource {
        fn page_count(&self) -> usize {
            self.0
        }

        async fn text_layer(&self, page_num: usize) -> Result<String, PageError> {
            Ok(format!("text of page {page_num}"))
        }

        async fn render_page(&self, page_num: usize, _scale: f32) -> Result<DynamicImage, PageError> {
            Err(PageError::RenderFailed {
                page: page_num,
                detail: "not renderable".into(),
            })
        }
    }

    #[test]
    fn document_reads_page_count_from_source() {
        let doc = Document::new("fixed.pdf", Arc::new(FixedSource(7)));
        assert_eq!(doc.page_count(), 7);
        assert_eq!(doc.file_name(), "fixed.pdf");
        assert!(format!("{doc:?}").contains("page_count: 7"));
    }

    #[tokio::test]
    async fn open_rejects_non_pdf_before_pdfium() {
        // Validation happens before any binding attempt, so this needs no library.
        let upload = Upload::new("notes.txt", "text/plain", b"hello".to_vec());
        let result = Document::open(upload, None).await;
        assert!(matches!(result, Err(SummarizeError::InvalidFileType { .. })));
    }
}
