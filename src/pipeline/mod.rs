//! Pipeline stages for summarizing selected PDF pages.
//!
//! Each submodule implements exactly one step and is testable on its own.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ document ──▶ extract ──▶ client ──▶ postprocess
//! (upload)  (pdfium)     (text/OCR)  (LLM API)  (cleanup)
//!                           │
//!                           └──▶ ocr ◀── encode
//! ```
//!
//! 1. [`input`]: validate the upload is a PDF
//! 2. [`document`]: open it and expose pages through [`document::PageSource`];
//!    pdfium runs in `spawn_blocking`
//! 3. [`extract`]: text layer first, rendered page through [`ocr`] when empty
//! 4. [`encode`]: PNG / base64 for the OCR engines
//! 5. [`client`]: one provider call per prompt; the only stage with network I/O
//! 6. [`postprocess`]: deterministic cleanup of the model's answer

pub mod client;
pub mod document;
pub mod encode;
pub mod extract;
pub mod input;
pub mod ocr;
pub mod postprocess;
