//! In-memory stand-ins for pdfium, OCR and the provider.

#![allow(dead_code)]

use async_trait::async_trait;
use image::{DynamicImage, GenericImageView, Rgba, RgbaImage};
use pdfsum::{
    Document, OcrEngine, PageError, PageSource, ProviderConfig, ProviderError, SummaryClient,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Pages with fixed text layers. Pages listed in `unrenderable` fail to
/// render; every other page renders as a 10×10 white square per unit scale.
#[derive(Default)]
pub struct FakePdf {
    pub texts: Vec<String>,
    pub unrenderable: HashSet<usize>,
}

impl FakePdf {
    pub fn new(texts: &[&str]) -> Self {
        Self {
            texts: texts.iter().map(|t| t.to_string()).collect(),
            unrenderable: HashSet::new(),
        }
    }

    pub fn unrenderable(mut self, page: usize) -> Self {
        self.unrenderable.insert(page);
        self
    }

    pub fn into_document(self, name: &str) -> Document {
        Document::new(name, Arc::new(self))
    }
}

#[async_trait]
impl PageSource for FakePdf {
    fn page_count(&self) -> usize {
        self.texts.len()
    }

    async fn text_layer(&self, page_num: usize) -> Result<String, PageError> {
        self.texts
            .get(page_num.wrapping_sub(1))
            .cloned()
            .ok_or(PageError::OutOfRange {
                page: page_num,
                total: self.texts.len(),
            })
    }

    async fn render_page(&self, page_num: usize, scale: f32) -> Result<DynamicImage, PageError> {
        if self.unrenderable.contains(&page_num) {
            return Err(PageError::RenderFailed {
                page: page_num,
                detail: "corrupt page stream".into(),
            });
        }
        let side = (10.0 * scale) as u32;
        Ok(DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            side,
            side,
            Rgba([255, 255, 255, 255]),
        )))
    }
}

/// OCR that returns canned text per page and records image widths.
#[derive(Default)]
pub struct FakeOcr {
    pub texts: HashMap<usize, String>,
    pub seen: Mutex<Vec<(usize, u32)>>,
}

impl FakeOcr {
    pub fn with(page: usize, text: &str) -> Self {
        let mut ocr = Self::default();
        ocr.texts.insert(page, text.to_string());
        ocr
    }

    pub fn calls(&self) -> Vec<(usize, u32)> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl OcrEngine for FakeOcr {
    async fn recognize(&self, page_num: usize, image: &DynamicImage) -> Result<String, PageError> {
        self.seen
            .lock()
            .unwrap()
            .push((page_num, image.dimensions().0));
        self.texts
            .get(&page_num)
            .cloned()
            .ok_or_else(|| PageError::OcrFailed {
                page: page_num,
                detail: "no text recognised".into(),
            })
    }
}

type Responder = dyn Fn(&str) -> Result<String, ProviderError> + Send + Sync;

/// Records every prompt and answers through `respond`.
pub struct FakeClient {
    pub prompts: Mutex<Vec<String>>,
    respond: Box<Responder>,
    delay: Option<Duration>,
}

impl FakeClient {
    pub fn replying(answer: &str) -> Arc<Self> {
        let answer = answer.to_string();
        Self::with(move |_| Ok(answer.clone()))
    }

    pub fn with(
        respond: impl Fn(&str) -> Result<String, ProviderError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            prompts: Mutex::new(Vec::new()),
            respond: Box::new(respond),
            delay: None,
        })
    }

    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            prompts: Mutex::new(Vec::new()),
            respond: Box::new(|_| Ok("late".to_string())),
            delay: Some(delay),
        })
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl SummaryClient for FakeClient {
    async fn summarize(
        &self,
        prompt: &str,
        _provider: &ProviderConfig,
    ) -> Result<String, ProviderError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.respond)(prompt)
    }
}

pub fn gemini(key: &str) -> ProviderConfig {
    ProviderConfig::new(pdfsum::Provider::Gemini, key)
}

/// Route library logs to the test output; `RUST_LOG=pdfsum=debug` to see them.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pdfsum=warn")),
        )
        .with_test_writer()
        .try_init();
}
