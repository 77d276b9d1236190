//! Summarization runs: turn a [`SummaryRequest`] into a [`Summary`].
//!
//! ## Joint vs. per-page
//!
//! Joint mode reads every selected page concurrently, concatenates them as
//! `Page N: …` blocks and makes a single provider call, so the model sees
//! cross-page context. Per-page mode processes pages strictly one after
//! another, one call each, and assembles titled sections; a page that
//! cannot be read or summarized is annotated while the rest still succeed.
//!
//! ## Partial success
//!
//! Page-level failures (render, OCR, text layer) are collected in
//! [`Summary::failures`] and never abort the run unless every selected page
//! fails. Rate limiting and authentication failures abort a per-page run,
//! since they would recur on every remaining page.

use crate::config::{CombineStrategy, SummaryConfig};
use crate::error::{PageError, ProviderError, SummarizeError};
use crate::pipeline::client::{HttpSummaryClient, SummaryClient};
use crate::pipeline::document::Document;
use crate::pipeline::extract::{extract_page_text, ExtractedPageText, TextSource};
use crate::pipeline::input::Upload;
use crate::pipeline::ocr::{OcrEngine, TesseractOcr};
use crate::pipeline::postprocess::{format_sections, format_summary};
use crate::prompts::{cross_page_preamble, page_block, summary_prompt};
use crate::session::{DocumentId, Session, SummaryRequest};
use crate::settings::ProviderConfig;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// The result of one summarization run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub document_id: DocumentId,
    pub strategy: CombineStrategy,
    /// Final text: one block (joint) or titled sections (per-page).
    pub text: String,
    /// Per-page sections; empty in joint mode.
    pub sections: Vec<SummarySection>,
    /// Pages whose text reached the provider, ascending.
    pub pages: Vec<usize>,
    /// Pages whose text came from OCR.
    pub ocr_pages: Vec<usize>,
    /// Non-fatal page failures.
    pub failures: Vec<PageError>,
    pub duration_ms: u64,
}

impl Summary {
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// One titled block of a per-page summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummarySection {
    pub page_num: usize,
    pub title: String,
    pub body: String,
    /// The body is a failure annotation rather than a summary.
    pub failed: bool,
}

/// Runs requests against one client and OCR engine.
pub struct Summarizer {
    client: Arc<dyn SummaryClient>,
    ocr: Arc<dyn OcrEngine>,
    config: SummaryConfig,
}

impl Summarizer {
    pub fn new(client: Arc<dyn SummaryClient>, ocr: Arc<dyn OcrEngine>, config: SummaryConfig) -> Self {
        Self { client, ocr, config }
    }

    /// Native HTTP client plus Tesseract, with the configured timeout.
    pub fn with_defaults(config: SummaryConfig) -> Result<Self, SummarizeError> {
        let timeout = config.request_timeout_secs.map(Duration::from_secs);
        let client = HttpSummaryClient::new(timeout)?;
        Ok(Self::new(
            Arc::new(client),
            Arc::new(TesseractOcr::default()),
            config,
        ))
    }

    pub fn config(&self) -> &SummaryConfig {
        &self.config
    }

    /// Summarize the pages of `request` with `provider`.
    ///
    /// # Errors
    /// - [`SummarizeError::MissingApiKey`] before any page is read when the
    ///   client needs a key and none is configured
    /// - [`SummarizeError::NoPagesSelected`] for an empty request
    /// - [`SummarizeError::Provider`] when the provider call fails (joint), or
    ///   is rate limited / unauthorized (per-page)
    /// - [`SummarizeError::AllPagesFailed`] when no page produced a summary
    pub async fn run(
        &self,
        request: &SummaryRequest,
        provider: &ProviderConfig,
    ) -> Result<Summary, SummarizeError> {
        if self.client.requires_api_key() && !provider.has_api_key() {
            return Err(SummarizeError::MissingApiKey {
                provider: provider.provider,
            });
        }
        if request.pages.is_empty() {
            return Err(SummarizeError::NoPagesSelected);
        }

        let start = Instant::now();
        let total = request.pages.len();
        info!(
            "Summarizing {} page(s) of '{}' ({} mode, {})",
            total,
            request.document.file_name(),
            self.config.strategy,
            provider.provider
        );
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_request_start(total);
        }

        let result = match self.config.strategy {
            CombineStrategy::Joint => self.run_joint(request, provider).await,
            CombineStrategy::PerPage => self.run_per_page(request, provider).await,
        };

        let result = result.map(|mut summary| {
            summary.duration_ms = start.elapsed().as_millis() as u64;
            summary
        });

        if let Some(ref cb) = self.config.progress_callback {
            let succeeded = result.as_ref().map(|s| s.pages.len()).unwrap_or(0);
            cb.on_request_complete(total, succeeded);
        }

        match &result {
            Ok(s) => info!(
                "Summary ready: {}/{} pages, {}ms",
                s.pages.len(),
                total,
                s.duration_ms
            ),
            Err(e) => warn!("Summarization failed: {}", e),
        }
        result
    }

    /// Run `request` on a background task.
    ///
    /// The caller keeps `request.document_id` and hands the joined result to
    /// [`Session::complete`], which discards it if another document was loaded
    /// in the meantime.
    pub fn spawn(
        self: &Arc<Self>,
        request: SummaryRequest,
        provider: ProviderConfig,
    ) -> JoinHandle<Result<Summary, SummarizeError>> {
        let summarizer = Arc::clone(self);
        tokio::spawn(async move { summarizer.run(&request, &provider).await })
    }

    async fn run_joint(
        &self,
        request: &SummaryRequest,
        provider: &ProviderConfig,
    ) -> Result<Summary, SummarizeError> {
        let total = request.pages.len();
        let scale = self.config.render_scale;

        let mut results: Vec<Result<ExtractedPageText, PageError>> =
            stream::iter(request.pages.iter().map(|page| page.page_num).collect::<Vec<_>>().into_iter().map(|page_num| {
                let source = Arc::clone(request.document.source());
                let ocr = Arc::clone(&self.ocr);
                let cb = self.config.progress_callback.clone();
                async move {
                    let result =
                        extract_page_text(source.as_ref(), ocr.as_ref(), page_num, scale).await;
                    if let Some(cb) = cb {
                        match &result {
                            Ok(p) => cb.on_page_extracted(
                                page_num,
                                total,
                                p.text.len(),
                                p.source == TextSource::Ocr,
                            ),
                            Err(e) => cb.on_page_error(page_num, total, &e.to_string()),
                        }
                    }
                    result
                }
            }))
            .buffer_unordered(self.config.concurrency)
            .collect()
            .await;

        results.sort_by_key(|r| match r {
            Ok(p) => p.page_num,
            Err(e) => e.page(),
        });

        let mut extracted = Vec::with_capacity(results.len());
        let mut failures = Vec::new();
        for result in results {
            match result {
                Ok(page) => extracted.push(page),
                Err(e) => {
                    warn!("{}", e);
                    failures.push(e);
                }
            }
        }

        if extracted.is_empty() {
            return Err(all_failed(total, &failures));
        }

        let body = extracted
            .iter()
            .map(|p| page_block(p.page_num, &p.text))
            .collect::<Vec<_>>()
            .join("\n\n");
        let mut prompt = summary_prompt(&body, self.config.instructions());
        if self.config.cross_page_context && extracted.len() > 1 {
            prompt.insert_str(0, &cross_page_preamble(extracted.len()));
        }

        let pages: Vec<usize> = extracted.iter().map(|p| p.page_num).collect();
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_summary_call(&pages);
        }
        let raw = self.call(&prompt, provider).await?;

        Ok(Summary {
            document_id: request.document_id,
            strategy: CombineStrategy::Joint,
            text: format_summary(&raw),
            sections: Vec::new(),
            pages,
            ocr_pages: ocr_pages(&extracted),
            failures,
            duration_ms: 0,
        })
    }

    async fn run_per_page(
        &self,
        request: &SummaryRequest,
        provider: &ProviderConfig,
    ) -> Result<Summary, SummarizeError> {
        let total = request.pages.len();
        let source = request.document.source();
        let cb = self.config.progress_callback.as_ref();

        let mut sections = Vec::with_capacity(total);
        let mut failures = Vec::new();
        let mut pages = Vec::new();
        let mut extracted_pages = Vec::new();

        for page in &request.pages {
            let page_num = page.page_num;
            let title = page
                .title
                .clone()
                .unwrap_or_else(|| format!("Page {page_num}"));

            let outcome = match extract_page_text(
                source.as_ref(),
                self.ocr.as_ref(),
                page_num,
                self.config.render_scale,
            )
            .await
            {
                Ok(extracted) => {
                    if let Some(cb) = cb {
                        cb.on_page_extracted(
                            page_num,
                            total,
                            extracted.text.len(),
                            extracted.source == TextSource::Ocr,
                        );
                    }
                    let prompt = summary_prompt(&extracted.text, self.config.instructions());
                    extracted_pages.push(extracted);
                    if let Some(cb) = cb {
                        cb.on_summary_call(&[page_num]);
                    }
                    match self.call(&prompt, provider).await {
                        Ok(raw) => Ok(format_summary(&raw)),
                        Err(e @ ProviderError::RateLimited { .. })
                        | Err(e @ ProviderError::Unauthorized { .. }) => return Err(e.into()),
                        Err(e) => Err(PageError::SummaryFailed {
                            page: page_num,
                            detail: e.to_string(),
                        }),
                    }
                }
                Err(e) => Err(e),
            };

            match outcome {
                Ok(body) => {
                    debug!("Page {}: {} summary chars", page_num, body.len());
                    pages.push(page_num);
                    sections.push(SummarySection {
                        page_num,
                        title,
                        body,
                        failed: false,
                    });
                }
                Err(e) => {
                    warn!("{}", e);
                    if let Some(cb) = cb {
                        cb.on_page_error(page_num, total, &e.to_string());
                    }
                    sections.push(SummarySection {
                        page_num,
                        title,
                        body: format!("*Summary unavailable: {e}*"),
                        failed: true,
                    });
                    failures.push(e);
                }
            }
        }

        if pages.is_empty() {
            return Err(all_failed(total, &failures));
        }

        let text = format_sections(
            &sections
                .iter()
                .map(|s| (s.title.as_str(), s.body.as_str()))
                .collect::<Vec<_>>(),
        );

        Ok(Summary {
            document_id: request.document_id,
            strategy: CombineStrategy::PerPage,
            text,
            sections,
            pages,
            ocr_pages: ocr_pages(&extracted_pages),
            failures,
            duration_ms: 0,
        })
    }

    /// One provider call, bounded by `request_timeout_secs` when set.
    async fn call(&self, prompt: &str, provider: &ProviderConfig) -> Result<String, ProviderError> {
        match self.config.request_timeout_secs {
            Some(secs) => tokio::time::timeout(
                Duration::from_secs(secs),
                self.client.summarize(prompt, provider),
            )
            .await
            .unwrap_or_else(|_| {
                Err(ProviderError::Network {
                    provider: provider.provider.to_string(),
                    detail: format!("request timed out after {secs}s"),
                })
            }),
            None => self.client.summarize(prompt, provider).await,
        }
    }
}

fn ocr_pages(extracted: &[ExtractedPageText]) -> Vec<usize> {
    extracted
        .iter()
        .filter(|p| p.source == TextSource::Ocr)
        .map(|p| p.page_num)
        .collect()
}

fn all_failed(total: usize, failures: &[PageError]) -> SummarizeError {
    SummarizeError::AllPagesFailed {
        total,
        first_error: failures
            .first()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "Unknown error".to_string()),
    }
}

/// Open a PDF from disk and summarize `pages` in one go.
///
/// Drives a throwaway [`Session`] so the same selection rules apply as in
/// interactive use. Titles are not set, so `require_titles` must be off.
///
/// # Example
/// ```rust,no_run
/// use pdfsum::{summarize_file, Provider, ProviderConfig, SummaryConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let provider = ProviderConfig::new(Provider::Gemini, std::env::var("GEMINI_API_KEY")?);
/// let summary = summarize_file("report.pdf", &[1, 3], &provider, SummaryConfig::default()).await?;
/// println!("{}", summary.text);
/// # Ok(())
/// # }
/// ```
pub async fn summarize_file(
    path: impl AsRef<Path>,
    pages: &[usize],
    provider: &ProviderConfig,
    config: SummaryConfig,
) -> Result<Summary, SummarizeError> {
    let upload = Upload::from_path(path.as_ref()).await?;
    let document = Document::open(upload, config.password.as_deref()).await?;

    let mut session = Session::new();
    session.load(document);

    let mut wanted = pages.to_vec();
    wanted.sort_unstable();
    wanted.dedup();
    for page in wanted {
        session.toggle(page)?;
    }

    let request = session.begin_request(&config)?;
    let summarizer = Summarizer::with_defaults(config)?;
    summarizer.run(&request, provider).await
}

/// Write the summary text atomically (temp file + rename).
pub async fn write_summary(path: impl AsRef<Path>, summary: &Summary) -> Result<(), SummarizeError> {
    let path = path.as_ref();
    let write_err = |source| SummarizeError::OutputWrite {
        path: path.display().to_string(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = path.with_extension("md.tmp");
    let mut text = summary.text.clone();
    text.push('\n');
    tokio::fs::write(&tmp_path, text).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;
    Ok(())
}
