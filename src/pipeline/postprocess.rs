//! Post-processing: deterministic cleanup of model-generated summaries.
//!
//! Models asked to summarize paragraph by paragraph often label each one
//! (`**Paragraf 1:** …`), wrap the answer in code fences, or leak
//! zero-width characters. These passes remove that noise without touching
//! content. Each pass is a pure `&str → String` function.
//!
//! ## Rule Order
//!
//! Invisible characters go first so they cannot hide a fence line. Fences
//! are stripped before labels so a fenced first line is still seen, and line
//! splitting runs last so every earlier rule works on raw text.

use once_cell::sync::Lazy;
use regex::Regex;

/// Separator between titled per-page sections.
pub const SECTION_SEPARATOR: &str = "\n\n---\n\n";

/// Clean raw provider output.
///
/// Rules (applied in order):
/// 1. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 2. Strip outer markdown fences, repeatedly when they are nested
/// 3. Remove `Paragraf <n>:` labels, emphasised or not, anywhere in the text
/// 4. Split on line breaks, trim each segment, drop empty segments, and
///    rejoin with one blank line between segments
///
/// Idempotent on text without labels: `format_summary(format_summary(x)) ==
/// format_summary(x)`.
pub fn format_summary(raw: &str) -> String {
    let s = remove_invisible_chars(raw);
    let s = strip_markdown_fences(&s);
    let s = remove_paragraph_labels(&s);
    rejoin_paragraphs(&s)
}

/// Assemble per-page sections as `## <title>` blocks separated by a
/// horizontal rule. Bodies are expected to be formatted already.
pub fn format_sections<T, B>(sections: &[(T, B)]) -> String
where
    T: AsRef<str>,
    B: AsRef<str>,
{
    sections
        .iter()
        .map(|(title, body)| format!("## {}\n\n{}", title.as_ref().trim(), body.as_ref()))
        .collect::<Vec<_>>()
        .join(SECTION_SEPARATOR)
}

// ── Rule 1: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 2: Strip outer markdown fences ──────────────────────────────────────

// Fence lines may carry horizontal whitespace and the body may be empty, so
// that whatever rule 4 trims into a bare fence is already matched here.
static RE_OUTER_FENCES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^```(?:markdown|md|text)?[^\S\n]*\n(?:(.*)\n)?[^\S\n]*```\s*$").unwrap()
});

fn strip_markdown_fences(input: &str) -> String {
    let mut text = input.replace("\r\n", "\n").replace('\r', "\n");
    while let Some(caps) = RE_OUTER_FENCES.captures(text.trim()) {
        text = caps.get(1).map_or("", |m| m.as_str()).to_string();
    }
    text
}

// ── Rule 3: Remove "Paragraf <n>:" labels ────────────────────────────────────

// Matches `Paragraf 1:`, `**Paragraf 1:**`, `*Paragraf 12*:`, `__Paragraf 3:__`.
static RE_PARAGRAPH_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[*_]{0,2}Paragraf\s*\d+\s*[*_]{0,2}:[*_]{0,2}").unwrap());

fn remove_paragraph_labels(input: &str) -> String {
    RE_PARAGRAPH_LABEL.replace_all(input, "").to_string()
}

// ── Rule 4: Re-join paragraphs ───────────────────────────────────────────────

fn rejoin_paragraphs(input: &str) -> String {
    input
        .split(['\n', '\r'])
        .map(str::trim)
        .filter(|seg| !seg.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

// ── Tests ────────────────────────────────────────────────────────────────────
