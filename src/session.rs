//! Session state: the loaded document, its page selections and the phase of
//! the current summarization request.
//!
//! ```text
//!   Idle ──load──▶ DocumentLoaded ──begin_request──▶ Summarizing
//!                        ▲                               │ complete
//!                        │                     ┌─────────┴─────────┐
//!                        │                     ▼                   ▼
//!                        └──── edit/retry ── Failed           Summarized
//! ```
//!
//! `load` is accepted in every phase and always lands in `DocumentLoaded`.
//!
//! The session never awaits. [`Session::begin_request`] hands out an owned
//! [`SummaryRequest`] that the [`crate::summarize::Summarizer`] works on
//! without borrowing the session; the result comes back through
//! [`Session::complete`], tagged with the [`DocumentId`] it was started for.
//! A result for a document that is no longer loaded is discarded.

use crate::config::SummaryConfig;
use crate::error::SummarizeError;
use crate::pipeline::document::Document;
use crate::summarize::Summary;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

/// Identity of one loaded document within a session. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentId(u64);

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "doc-{}", self.0)
    }
}

/// Selection state of one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSelection {
    /// 1-indexed.
    pub page_num: usize,
    pub selected: bool,
    pub title: Option<String>,
}

impl PageSelection {
    fn new(page_num: usize) -> Self {
        Self {
            page_num,
            selected: false,
            title: None,
        }
    }

    /// Title with surrounding whitespace removed; `None` when blank.
    pub fn title(&self) -> Option<&str> {
        self.title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

/// Where the session is in its lifecycle.
#[derive(Debug, Clone)]
pub enum Phase {
    Idle,
    DocumentLoaded,
    Summarizing,
    Summarized(Summary),
    /// Holds the user-facing error message.
    Failed(String),
}

/// Outcome of [`Session::complete`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Applied,
    /// The result belonged to a document that is no longer current, or no
    /// request was in flight. State was left untouched.
    Stale,
}

/// A selected page as captured when the request started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestedPage {
    pub page_num: usize,
    pub title: Option<String>,
}

/// Everything a summarization run needs, detached from the session.
#[derive(Debug, Clone)]
pub struct SummaryRequest {
    pub document_id: DocumentId,
    pub document: Document,
    /// Selected pages in ascending order.
    pub pages: Vec<RequestedPage>,
}

impl SummaryRequest {
    pub fn page_numbers(&self) -> Vec<usize> {
        self.pages.iter().map(|p| p.page_num).collect()
    }
}

struct Loaded {
    id: DocumentId,
    document: Document,
    selections: Vec<PageSelection>,
}

/// Interactive summarization session over one document at a time.
pub struct Session {
    next_id: u64,
    loaded: Option<Loaded>,
    phase: Phase,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            loaded: None,
            phase: Phase::Idle,
        }
    }

    /// Replace the current document. Valid in every phase; a request still
    /// running for the previous document becomes stale.
    pub fn load(&mut self, document: Document) -> DocumentId {
        let id = DocumentId(self.next_id);
        self.next_id += 1;

        let selections = (1..=document.page_count()).map(PageSelection::new).collect();
        info!(
            "Loaded '{}' as {} ({} pages)",
            document.file_name(),
            id,
            document.page_count()
        );

        self.loaded = Some(Loaded {
            id,
            document,
            selections,
        });
        self.phase = Phase::DocumentLoaded;
        id
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn document(&self) -> Option<&Document> {
        self.loaded.as_ref().map(|l| &l.document)
    }

    pub fn document_id(&self) -> Option<DocumentId> {
        self.loaded.as_ref().map(|l| l.id)
    }

    /// One entry per page, ascending. Empty when no document is loaded.
    pub fn selections(&self) -> &[PageSelection] {
        self.loaded
            .as_ref()
            .map(|l| l.selections.as_slice())
            .unwrap_or(&[])
    }

    pub fn selected_pages(&self) -> Vec<usize> {
        self.selections()
            .iter()
            .filter(|s| s.selected)
            .map(|s| s.page_num)
            .collect()
    }

    /// The last applied summary, if the session is in `Summarized`.
    pub fn summary(&self) -> Option<&Summary> {
        match &self.phase {
            Phase::Summarized(summary) => Some(summary),
            _ => None,
        }
    }

    /// The last error message, if the session is in `Failed`.
    pub fn last_error(&self) -> Option<&str> {
        match &self.phase {
            Phase::Failed(message) => Some(message),
            _ => None,
        }
    }

    /// Flip the selection of one page and return its new state.
    pub fn toggle(&mut self, page_num: usize) -> Result<bool, SummarizeError> {
        let page = self.page_mut(page_num)?;
        page.selected = !page.selected;
        debug!("Page {} selected = {}", page_num, page.selected);
        Ok(page.selected)
    }

    /// Set (or, with a blank string, clear) the title of one page.
    pub fn set_title(&mut self, page_num: usize, title: impl Into<String>) -> Result<(), SummarizeError> {
        let title = title.into();
        let page = self.page_mut(page_num)?;
        page.title = if title.trim().is_empty() {
            None
        } else {
            Some(title)
        };
        Ok(())
    }

    pub fn select_all(&mut self) -> Result<(), SummarizeError> {
        self.set_all(true)
    }

    pub fn clear_selection(&mut self) -> Result<(), SummarizeError> {
        self.set_all(false)
    }

    /// Check the selection against `config` and move to `Summarizing`.
    ///
    /// On any error the phase and selections are left exactly as they were.
    pub fn begin_request(&mut self, config: &SummaryConfig) -> Result<SummaryRequest, SummarizeError> {
        let loaded = match (&self.phase, &self.loaded) {
            (Phase::Summarizing, _) => return Err(SummarizeError::RequestInFlight),
            (_, None) => return Err(SummarizeError::NoDocument),
            (_, Some(loaded)) => loaded,
        };

        let pages: Vec<RequestedPage> = loaded
            .selections
            .iter()
            .filter(|s| s.selected)
            .map(|s| RequestedPage {
                page_num: s.page_num,
                title: s.title().map(str::to_string),
            })
            .collect();

        if pages.is_empty() {
            return Err(SummarizeError::NoPagesSelected);
        }

        if config.require_titles {
            let untitled: Vec<usize> = pages
                .iter()
                .filter(|p| p.title.is_none())
                .map(|p| p.page_num)
                .collect();
            if !untitled.is_empty() {
                return Err(SummarizeError::MissingTitles { pages: untitled });
            }
        }

        let request = SummaryRequest {
            document_id: loaded.id,
            document: loaded.document.clone(),
            pages,
        };
        info!(
            "Starting request for {}: pages {:?}",
            request.document_id,
            request.page_numbers()
        );
        self.phase = Phase::Summarizing;
        Ok(request)
    }

    /// Apply the result of a request started by [`Session::begin_request`].
    pub fn complete(
        &mut self,
        document_id: DocumentId,
        result: Result<Summary, SummarizeError>,
    ) -> Completion {
        let current = self.document_id() == Some(document_id);
        if !current || !matches!(self.phase, Phase::Summarizing) {
            debug!("Discarding stale result for {}", document_id);
            return Completion::Stale;
        }

        self.phase = match result {
            Ok(summary) => Phase::Summarized(summary),
            Err(e) => Phase::Failed(e.user_message()),
        };
        Completion::Applied
    }

    fn page_mut(&mut self, page_num: usize) -> Result<&mut PageSelection, SummarizeError> {
        let loaded = self.loaded.as_mut().ok_or(SummarizeError::NoDocument)?;
        let total = loaded.selections.len();
        if page_num == 0 || page_num > total {
            return Err(SummarizeError::PageOutOfRange {
                page: page_num,
                total,
            });
        }
        Ok(&mut loaded.selections[page_num - 1])
    }

    fn set_all(&mut self, selected: bool) -> Result<(), SummarizeError> {
        let loaded = self.loaded.as_mut().ok_or(SummarizeError::NoDocument)?;
        for page in &mut loaded.selections {
            page.selected = selected;
        }
        Ok(())
    }
}
