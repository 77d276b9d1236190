//! # pdfsum
//!
//! Summarize selected pages of a PDF with a language-model API.
//!
//! A user loads a PDF, picks the pages that matter (optionally giving each a
//! title), and asks for a summary. Pages with an embedded text layer are read
//! directly; scanned pages are rendered and passed through OCR. The text is
//! sent to Gemini or an OpenAI-compatible chat endpoint and the answer is
//! cleaned of common model quirks before it is returned.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF upload
//!  │
//!  ├─ 1. Input     reject anything that is not application/pdf
//!  ├─ 2. Session   page selections, titles, request guard, stale-result check
//!  ├─ 3. Extract   text layer, or render (pdfium) + OCR (tesseract / vision model)
//!  ├─ 4. Prompt    joint ("Page N: …" blocks) or one prompt per page
//!  ├─ 5. Provider  Gemini generateContent / OpenAI chat completions
//!  └─ 6. Format    strip fences, invisible chars, "Paragraf N:" labels
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdfsum::{Document, Session, Settings, Summarizer, SummaryConfig, Upload};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut settings = Settings::load(&Settings::default_path())?;
//!     settings.apply_env()?;
//!
//!     let upload = Upload::from_path("report.pdf".as_ref()).await?;
//!     let mut session = Session::new();
//!     session.load(Document::open(upload, None).await?);
//!     session.toggle(1)?;
//!     session.toggle(3)?;
//!
//!     let config = SummaryConfig::default();
//!     let request = session.begin_request(&config)?;
//!     let summarizer = Summarizer::with_defaults(config)?;
//!     let result = summarizer.run(&request, &settings.provider_config()).await;
//!     session.complete(request.document_id, result);
//!
//!     if let Some(summary) = session.summary() {
//!         println!("{}", summary.text);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdfsum` binary (clap + indicatif + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdfsum = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod session;
pub mod settings;
pub mod summarize;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{CombineStrategy, SummaryConfig, SummaryConfigBuilder};
pub use error::{PageError, ProviderError, SummarizeError};
pub use pipeline::client::{HttpSummaryClient, LlmProviderClient, SummaryClient};
pub use pipeline::document::{Document, PageSource, PdfiumSource};
pub use pipeline::extract::{extract_page_text, ExtractedPageText, TextSource};
pub use pipeline::input::Upload;
pub use pipeline::ocr::{OcrEngine, TesseractOcr, VisionOcr};
pub use pipeline::postprocess::{format_sections, format_summary};
pub use progress::{NoopProgressCallback, ProgressCallback, SummaryProgressCallback};
pub use session::{
    Completion, DocumentId, PageSelection, Phase, RequestedPage, Session, SummaryRequest,
};
pub use settings::{Provider, ProviderConfig, ProviderSettings, Settings};
pub use summarize::{summarize_file, write_summary, Summarizer, Summary, SummarySection};
