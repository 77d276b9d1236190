//! Configuration types for a summarization run.
//!
//! All request behaviour is controlled through [`SummaryConfig`], built via
//! its [`SummaryConfigBuilder`]. Provider credentials are deliberately not
//! part of it: they live in [`crate::settings::Settings`] and reach the
//! summarizer as a [`crate::settings::ProviderConfig`] at call time.

use crate::error::SummarizeError;
use crate::pipeline::extract::DEFAULT_RENDER_SCALE;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Configuration for summarizing selected pages.
///
/// # Example
/// ```rust
/// use pdfsum::{CombineStrategy, SummaryConfig};
///
/// let config = SummaryConfig::builder()
///     .strategy(CombineStrategy::PerPage)
///     .instructions("Answer in Indonesian")
///     .require_titles(true)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct SummaryConfig {
    /// How multiple pages are combined. Default: [`CombineStrategy::Joint`].
    pub strategy: CombineStrategy,

    /// Free-text instructions appended to every prompt.
    pub instructions: Option<String>,

    /// Every selected page must carry a non-empty title. Default: false.
    pub require_titles: bool,

    /// Joint prompts covering more than one page mention the page count and
    /// ask for a summary that stays coherent across pages. Default: false.
    pub cross_page_context: bool,

    /// Upscale factor used when rasterising a page for OCR. Range 0.5–6.0.
    /// Default: 2.0.
    pub render_scale: f32,

    /// Number of pages extracted at once in joint mode. Default: 4.
    pub concurrency: usize,

    /// Timeout for one provider call in seconds. Default: None (no timeout).
    pub request_timeout_secs: Option<u64>,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Optional progress callback for per-page events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            strategy: CombineStrategy::default(),
            instructions: None,
            require_titles: false,
            cross_page_context: false,
            render_scale: DEFAULT_RENDER_SCALE,
            concurrency: 4,
            request_timeout_secs: None,
            password: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for SummaryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SummaryConfig")
            .field("strategy", &self.strategy)
            .field("instructions", &self.instructions)
            .field("require_titles", &self.require_titles)
            .field("cross_page_context", &self.cross_page_context)
            .field("render_scale", &self.render_scale)
            .field("concurrency", &self.concurrency)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl SummaryConfig {
    pub fn builder() -> SummaryConfigBuilder {
        SummaryConfigBuilder {
            config: Self::default(),
        }
    }

    /// Instructions with surrounding whitespace removed; `None` when blank.
    pub fn instructions(&self) -> Option<&str> {
        self.instructions
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Builder for [`SummaryConfig`].
pub struct SummaryConfigBuilder {
    config: SummaryConfig,
}

impl SummaryConfigBuilder {
    pub fn strategy(mut self, strategy: CombineStrategy) -> Self {
        self.config.strategy = strategy;
        self
    }

    pub fn instructions(mut self, text: impl Into<String>) -> Self {
        self.config.instructions = Some(text.into());
        self
    }

    pub fn require_titles(mut self, v: bool) -> Self {
        self.config.require_titles = v;
        self
    }

    pub fn cross_page_context(mut self, v: bool) -> Self {
        self.config.cross_page_context = v;
        self
    }

    pub fn render_scale(mut self, scale: f32) -> Self {
        self.config.render_scale = scale;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = Some(secs);
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<SummaryConfig, SummarizeError> {
        let c = &self.config;
        if !(0.5..=6.0).contains(&c.render_scale) {
            return Err(SummarizeError::InvalidConfig(format!(
                "render scale must be 0.5–6.0, got {}",
                c.render_scale
            )));
        }
        if c.request_timeout_secs == Some(0) {
            return Err(SummarizeError::InvalidConfig(
                "request timeout must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}

/// How the text of several selected pages reaches the provider.
///
/// | Strategy | Calls | Trade-off |
/// |----------|-------|-----------|
/// | `Joint`   | 1 | cross-page context kept; one large prompt |
/// | `PerPage` | one per page | failures isolated per page; no cross-page coherence |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CombineStrategy {
    /// All pages concatenated into one prompt. (default)
    #[default]
    Joint,
    /// Each page summarized independently, assembled as titled sections.
    PerPage,
}

impl fmt::Display for CombineStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CombineStrategy::Joint => f.write_str("joint"),
            CombineStrategy::PerPage => f.write_str("per-page"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = SummaryConfig::default();
        assert_eq!(c.strategy, CombineStrategy::Joint);
        assert_eq!(c.render_scale, DEFAULT_RENDER_SCALE);
        assert!(c.request_timeout_secs.is_none());
        assert!(!c.require_titles);
    }

    #[test]
    fn blank_instructions_are_none() {
        let c = SummaryConfig::builder().instructions("   ").build().unwrap();
        assert_eq!(c.instructions(), None);
        let c = SummaryConfig::builder()
            .instructions(" bullet points ")
            .build()
            .unwrap();
        assert_eq!(c.instructions(), Some("bullet points"));
    }

    #[test]
    fn rejects_bad_scale() {
        assert!(SummaryConfig::builder().render_scale(0.1).build().is_err());
        assert!(SummaryConfig::builder().render_scale(3.0).build().is_ok());
    }

    #[test]
    fn rejects_zero_timeout() {
        assert!(SummaryConfig::builder()
            .request_timeout_secs(0)
            .build()
            .is_err());
    }

    #[test]
    fn concurrency_floor() {
        let c = SummaryConfig::builder().concurrency(0).build().unwrap();
        assert_eq!(c.concurrency, 1);
    }
}
