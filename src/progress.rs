//! Progress-callback trait for per-page summarization events.
//!
//! Inject an [`Arc<dyn SummaryProgressCallback>`] via
//! [`crate::config::SummaryConfigBuilder::progress_callback`] to receive
//! events as the summarizer reads and summarizes each page. The trait is
//! `Send + Sync` because joint mode extracts pages concurrently.
//!
//! # Example
//!
//! ```rust
//! use pdfsum::{SummaryConfig, SummaryProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     ocr_pages: AtomicUsize,
//! }
//!
//! impl SummaryProgressCallback for CountingCallback {
//!     fn on_page_extracted(&self, _page: usize, _total: usize, _chars: usize, used_ocr: bool) {
//!         if used_ocr {
//!             self.ocr_pages.fetch_add(1, Ordering::SeqCst);
//!         }
//!     }
//! }
//!
//! let config = SummaryConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { ocr_pages: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the summarizer as it processes a request.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. In joint mode `on_page_extracted` and
/// `on_page_error` may be called concurrently.
pub trait SummaryProgressCallback: Send + Sync {
    /// Called once before any page is read.
    fn on_request_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called when a page's text is available.
    ///
    /// # Arguments
    /// * `page_num`   : 1-indexed page number
    /// * `total_pages`: number of selected pages
    /// * `chars`      : length of the extracted text
    /// * `used_ocr`   : the text layer was empty and OCR supplied the text
    fn on_page_extracted(&self, page_num: usize, total_pages: usize, chars: usize, used_ocr: bool) {
        let _ = (page_num, total_pages, chars, used_ocr);
    }

    /// Called just before a provider call. `pages` lists the pages it covers.
    fn on_summary_call(&self, pages: &[usize]) {
        let _ = pages;
    }

    /// Called when a page fails to be read or summarized.
    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        let _ = (page_num, total_pages, error);
    }

    /// Called once after the request finished, successfully or not.
    fn on_request_complete(&self, total_pages: usize, success_count: usize) {
        let _ = (total_pages, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl SummaryProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::SummaryConfig`].
pub type ProgressCallback = Arc<dyn SummaryProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct TrackingCallback {
        extracted: AtomicUsize,
        ocr: AtomicUsize,
        calls: Mutex<Vec<Vec<usize>>>,
        errors: AtomicUsize,
    }

    impl SummaryProgressCallback for TrackingCallback {
        fn on_page_extracted(&self, _page: usize, _total: usize, _chars: usize, used_ocr: bool) {
            self.extracted.fetch_add(1, Ordering::SeqCst);
            if used_ocr {
                self.ocr.fetch_add(1, Ordering::SeqCst);
            }
        }

        fn on_summary_call(&self, pages: &[usize]) {
            self.calls.lock().unwrap().push(pages.to_vec());
        }

        fn on_page_error(&self, _page: usize, _total: usize, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_request_start(2);
        cb.on_page_extracted(1, 2, 10, false);
        cb.on_summary_call(&[1, 2]);
        cb.on_page_error(2, 2, "render failed");
        cb.on_request_complete(2, 1);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        tracker.on_page_extracted(1, 3, 120, false);
        tracker.on_page_extracted(2, 3, 80, true);
        tracker.on_page_error(3, 3, "OCR failed");
        tracker.on_summary_call(&[1, 2]);

        assert_eq!(tracker.extracted.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.ocr.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
        assert_eq!(*tracker.calls.lock().unwrap(), vec![vec![1, 2]]);
    }
}
