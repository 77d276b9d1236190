//! Error types for the pdfsum library.
//!
//! Three error types reflect three distinct failure modes:
//!
//! * [`SummarizeError`] is **fatal for one request**: the request cannot
//!   proceed at all (wrong file type, nothing selected, no API key, provider
//!   refused the call). Returned as `Err(SummarizeError)` from the session
//!   and the summarizer. Never fatal to the process.
//!
//! * [`ProviderError`]: a tagged failure reported by the summarization
//!   provider. Wrapped by [`SummarizeError::Provider`] and matched
//!   exhaustively by [`SummarizeError::user_message`].
//!
//! * [`PageError`] is **non-fatal**: one page could not be read or summarized
//!   but the other pages are fine. Stored in
//!   [`crate::summarize::Summary::failures`] so callers see partial success
//!   instead of losing the whole request to one scanned page.

use crate::settings::Provider;
use thiserror::Error;

/// All fatal errors returned by the pdfsum library.
#[derive(Debug, Error)]
pub enum SummarizeError {
    // ── Input validation ──────────────────────────────────────────────────
    /// The uploaded file is not declared as `application/pdf`.
    #[error("'{file_name}' is not a PDF (got {mime_type})")]
    InvalidFileType { file_name: String, mime_type: String },

    /// Summarization was triggered with no page selected.
    #[error("No pages selected. Select at least one page to summarize.")]
    NoPagesSelected,

    /// Title tracking is enabled and some selected pages have no title.
    #[error("Selected pages without a title: {pages:?}")]
    MissingTitles { pages: Vec<usize> },

    /// A page number outside `1..=total` was referenced.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// An operation needs a loaded document but none is loaded.
    #[error("No document loaded")]
    NoDocument,

    /// A summarization request is already running for this document.
    #[error("A summarization request is already in progress")]
    RequestInFlight,

    // ── Document load ─────────────────────────────────────────────────────
    /// The bytes could not be parsed as a PDF.
    #[error("Failed to load '{file_name}': {detail}")]
    DocumentLoad { file_name: String, detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or install pdfium system-wide."
    )]
    PdfiumBindingFailed(String),

    // ── Provider ──────────────────────────────────────────────────────────
    /// No API key is configured for the selected provider.
    #[error("No API key configured for {provider}")]
    MissingApiKey { provider: Provider },

    /// The provider refused or failed the call.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Every selected page failed; there is nothing to summarize.
    #[error("All {total} selected pages failed.\nFirst error: {first_error}")]
    AllPagesFailed { total: usize, first_error: String },

    // ── Settings ──────────────────────────────────────────────────────────
    /// The settings file exists but could not be read or parsed.
    #[error("Failed to read settings '{path}': {detail}")]
    SettingsRead { path: String, detail: String },

    /// The settings file could not be written.
    #[error("Failed to write settings '{path}': {source}")]
    SettingsWrite {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The summary could not be written to its output file.
    #[error("Failed to write output '{path}': {source}")]
    OutputWrite {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SummarizeError {
    /// Short message suitable for a transient notification.
    ///
    /// Provider failures are matched variant by variant so that a rate limit
    /// never degrades into the generic "request failed" text.
    pub fn user_message(&self) -> String {
        match self {
            SummarizeError::Provider(err) => match err {
                ProviderError::RateLimited {
                    provider,
                    retry_after_secs,
                } => match retry_after_secs {
                    Some(secs) => format!(
                        "{provider} quota exceeded. Try again in {secs}s or switch to another API key."
                    ),
                    None => format!(
                        "{provider} quota exceeded. Try again later or switch to another API key."
                    ),
                },
                ProviderError::Unauthorized { provider, .. } => {
                    format!("{provider} rejected the API key. Check the key in settings.")
                }
                ProviderError::Network { provider, detail } => {
                    format!("Could not reach {provider}: {detail}")
                }
                ProviderError::Malformed { provider, detail } => {
                    format!("{provider} returned a response that could not be read: {detail}")
                }
                ProviderError::Unknown { message, .. } => {
                    format!("Summarization failed: {message}")
                }
            },
            SummarizeError::MissingApiKey { provider } => {
                format!("No API key set for {provider}. Add one in settings first.")
            }
            other => other.to_string(),
        }
    }
}

/// A failure reported by (or while talking to) a summarization provider.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    /// HTTP 429: quota or rate limit exceeded.
    #[error("Rate limit exceeded for provider '{provider}'")]
    RateLimited {
        provider: String,
        retry_after_secs: Option<u64>,
    },

    /// HTTP 401/403: the key was refused.
    #[error("Authentication error from provider '{provider}' (HTTP {status}): {detail}")]
    Unauthorized {
        provider: String,
        status: u16,
        detail: String,
    },

    /// Transport-level failure (DNS, TLS, connection reset, timeout).
    #[error("Network error talking to '{provider}': {detail}")]
    Network { provider: String, detail: String },

    /// 2xx response whose body did not contain a summary.
    #[error("Malformed response from '{provider}': {detail}")]
    Malformed { provider: String, detail: String },

    /// Any other failure, with the most specific message available.
    #[error("Provider '{provider}' failed: {message}")]
    Unknown {
        provider: String,
        status: Option<u16>,
        message: String,
    },
}

/// A non-fatal error for a single page.
#[derive(Debug, Clone, Error, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// Page number outside the document.
    #[error("Page {page}: out of range (document has {total} pages)")]
    OutOfRange { page: usize, total: usize },

    /// The embedded text layer could not be read.
    #[error("Page {page}: text extraction failed: {detail}")]
    TextLayerFailed { page: usize, detail: String },

    /// Page rasterisation failed.
    #[error("Page {page}: rendering failed: {detail}")]
    RenderFailed { page: usize, detail: String },

    /// The OCR engine failed on the rendered page.
    #[error("Page {page}: OCR failed: {detail}")]
    OcrFailed { page: usize, detail: String },

    /// Per-page summarization call failed.
    #[error("Page {page}: summarization failed: {detail}")]
    SummaryFailed { page: usize, detail: String },
}

impl PageError {
    /// 1-indexed page number the error refers to.
    pub fn page(&self) -> usize {
        match self {
            PageError::OutOfRange { page, .. }
            | PageError::TextLayerFailed { page, .. }
            | PageError::RenderFailed { page, .. }
            | PageError::OcrFailed { page, .. }
            | PageError::SummaryFailed { page, .. } => *page,
        }
    }
}
