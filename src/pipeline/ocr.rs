//! OCR adapters: rendered page image → recognised text.
//!
//! Only pages whose text layer is empty ever reach this module. Two engines
//! are provided:
//!
//! * [`TesseractOcr`]: runs the `tesseract` CLI on a temporary PNG. Free,
//!   local, needs `tesseract-ocr` installed.
//! * [`VisionOcr`]: asks a vision language model to transcribe the page.
//!   Handles handwriting and poor scans better; costs tokens.

use crate::error::{PageError, SummarizeError};
use crate::pipeline::encode::{encode_image_data, encode_png};
use crate::prompts::OCR_SYSTEM_PROMPT;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use image::DynamicImage;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

/// Recognise text on a rendered page.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Return the text found on `image`, the raster of 1-indexed `page_num`.
    async fn recognize(&self, page_num: usize, image: &DynamicImage) -> Result<String, PageError>;
}

// ── Tesseract ────────────────────────────────────────────────────────────

/// OCR through the `tesseract` command-line tool.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    binary: PathBuf,
    language: String,
}

impl Default for TesseractOcr {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("tesseract"),
            language: "eng".to_string(),
        }
    }
}

impl TesseractOcr {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tesseract language code(s), e.g. `"eng"` or `"ind+eng"`.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Whether the configured binary can be executed.
    pub async fn is_available(&self) -> bool {
        let found = tokio::process::Command::new(&self.binary)
            .arg("--version")
            .output()
            .await
            .is_ok();
        if !found {
            debug!(
                "{} not found - install tesseract-ocr for OCR support",
                self.binary.display()
            );
        }
        found
    }
}

#[async_trait]
impl OcrEngine for TesseractOcr {
    async fn recognize(&self, page_num: usize, image: &DynamicImage) -> Result<String, PageError> {
        let ocr_err = |detail: String| PageError::OcrFailed {
            page: page_num,
            detail,
        };

        let png = encode_png(image).map_err(|e| ocr_err(format!("PNG encoding failed: {e}")))?;

        let tmp = tempfile::Builder::new()
            .prefix("pdfsum-page-")
            .suffix(".png")
            .tempfile()
            .map_err(|e| ocr_err(format!("tempfile: {e}")))?;
        tokio::fs::write(tmp.path(), &png)
            .await
            .map_err(|e| ocr_err(format!("tempfile write: {e}")))?;

        let output = tokio::process::Command::new(&self.binary)
            .arg(tmp.path())
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .arg("--psm")
            .arg("1") // Automatic page segmentation with OSD
            .output()
            .await
            .map_err(|e| ocr_err(format!("failed to run {}: {e}", self.binary.display())))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!("Tesseract failed on page {}: {}", page_num, stderr.trim());
            return Err(ocr_err(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        debug!("Page {}: tesseract recognised {} chars", page_num, text.len());
        Ok(text)
    }
}

// ── Vision model ─────────────────────────────────────────────────────────

/// OCR by asking a vision language model to transcribe the page image.
pub struct VisionOcr {
    provider: Arc<dyn LLMProvider>,
    max_tokens: usize,
}

impl VisionOcr {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self {
            provider,
            max_tokens: 4096,
        }
    }

    /// Create the provider by name (`openai`, `anthropic`, `gemini`, …); the
    /// provider reads its API key from the usual environment variable.
    pub fn from_provider_name(name: &str, model: &str) -> Result<Self, SummarizeError> {
        let provider = ProviderFactory::create_llm_provider(name, model).map_err(|e| {
            SummarizeError::InvalidConfig(format!("vision OCR provider '{name}': {e}"))
        })?;
        Ok(Self::new(provider))
    }
}

#[async_trait]
impl OcrEngine for VisionOcr {
    async fn recognize(&self, page_num: usize, image: &DynamicImage) -> Result<String, PageError> {
        let data = encode_image_data(image).map_err(|e| PageError::OcrFailed {
            page: page_num,
            detail: format!("image encoding failed: {e}"),
        })?;

        let messages = vec![
            ChatMessage::system(OCR_SYSTEM_PROMPT),
            ChatMessage::user_with_images("", vec![data]),
        ];
        // Transcription wants determinism, not creativity.
        let options = CompletionOptions {
            temperature: Some(0.0),
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        };

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| PageError::OcrFailed {
                page: page_num,
                detail: e.to_string(),
            })?;

        debug!(
            "Page {}: vision OCR used {} input / {} output tokens",
            page_num, response.prompt_tokens, response.completion_tokens
        );
        Ok(response.content.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[tokio::test]
    async fn missing_tesseract_binary_is_page_error() {
        let ocr = TesseractOcr::new().with_binary("/nonexistent/tesseract-for-tests");
        assert!(!ocr.is_available().await);

        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255])));
        match ocr.recognize(2, &img).await {
            Err(PageError::OcrFailed { page, detail }) => {
                assert_eq!(page, 2);
                assert!(detail.contains("failed to run"), "got: {detail}");
            }
            other => panic!("expected OcrFailed, got {other:?}"),
        }
    }

    #[test]
    fn tesseract_builder() {
        let ocr = TesseractOcr::new().with_language("ind+eng");
        assert_eq!(ocr.language, "ind+eng");
        assert_eq!(ocr.binary, PathBuf::from("tesseract"));
    }
}
