//! Page text acquisition: text layer first, OCR when the layer is empty.

use crate::error::PageError;
use crate::pipeline::document::PageSource;
use crate::pipeline::ocr::OcrEngine;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Upscale factor applied before OCR.
pub const DEFAULT_RENDER_SCALE: f32 = 2.0;

/// Where a page's text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextSource {
    TextLayer,
    Ocr,
}

/// Text obtained for one page of one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedPageText {
    pub page_num: usize,
    pub text: String,
    pub source: TextSource,
}

/// Get the text of a 1-indexed page.
///
/// The embedded text layer is used when it contains anything besides
/// whitespace. Otherwise the page is rendered at `scale` and handed to `ocr`.
pub async fn extract_page_text(
    source: &dyn PageSource,
    ocr: &dyn OcrEngine,
    page_num: usize,
    scale: f32,
) -> Result<ExtractedPageText, PageError> {
    let layer = source.text_layer(page_num).await?;
    let layer = layer.trim();

    if !layer.is_empty() {
        debug!("Page {}: {} chars from text layer", page_num, layer.len());
        return Ok(ExtractedPageText {
            page_num,
            text: layer.to_string(),
            source: TextSource::TextLayer,
        });
    }

    info!("Page {}: empty text layer, falling back to OCR", page_num);
    let image = source.render_page(page_num, scale).await?;
    let text = ocr.recognize(page_num, &image).await?;

    Ok(ExtractedPageText {
        page_num,
        text: text.trim().to_string(),
        source: TextSource::Ocr,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use image::{DynamicImage, GenericImageView, Rgba, RgbaImage};
    use std::sync::Mutex;

    struct TwoPages;

    #[async_trait]
    impl PageSource for TwoPages {
        fn page_count(&self) -> usize {
            2
        }

        async fn text_layer(&self, page_num: usize) -> Result<String, PageError> {
            Ok(if page_num == 1 { "  Hello  ".into() } else { " \n ".into() })
        }

        async fn render_page(&self, _page_num: usize, scale: f32) -> Result<DynamicImage, PageError> {
            let side = (10.0 * scale) as u32;
            Ok(DynamicImage::ImageRgba8(RgbaImage::from_pixel(
                side,
                side,
                Rgba([255, 255, 255, 255]),
            )))
        }
    }

    #[derive(Default)]
    struct RecordingOcr {
        seen: Mutex<Vec<(usize, u32)>>,
    }

    #[async_trait]
    impl OcrEngine for RecordingOcr {
        async fn recognize(&self, page_num: usize, image: &DynamicImage) -> Result<String, PageError> {
            self.seen.lock().unwrap().push((page_num, image.dimensions().0));
            Ok(" scanned words \n".into())
        }
    }

    #[tokio::test]
    async fn uses_text_layer_when_present() {
        let ocr = RecordingOcr::default();
        let page = extract_page_text(&TwoPages, &ocr, 1, 2.0).await.unwrap();
        assert_eq!(page.text, "Hello");
        assert_eq!(page.source, TextSource::TextLayer);
        assert!(ocr.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn falls_back_to_ocr_on_blank_layer() {
        let ocr = RecordingOcr::default();
        let page = extract_page_text(&TwoPages, &ocr, 2, DEFAULT_RENDER_SCALE)
            .await
            .unwrap();
        assert_eq!(page.text, "scanned words");
        assert_eq!(page.source, TextSource::Ocr);
        // Rendered at 2x: 10 px base → 20 px
        assert_eq!(*ocr.seen.lock().unwrap(), vec![(2, 20)]);
    }
}
