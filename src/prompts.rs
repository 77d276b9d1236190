//! Prompt text sent to the summarization provider and the vision OCR model.
//!
//! Every prompt lives here so the wording can change in one place and unit
//! tests can pin the exact strings providers receive.

/// Fixed system instruction for chat-style providers.
pub const SUMMARY_SYSTEM_PROMPT: &str = "You are a helpful assistant that writes clear, faithful summaries of document text. Summarize only what the text says; do not add facts.";

/// System prompt used when a vision model stands in for OCR.
pub const OCR_SYSTEM_PROMPT: &str = r#"You are an OCR engine. Transcribe all readable text on this page image.

Rules:
- Preserve the reading order a human would use
- Output plain text only, one paragraph per line
- Do NOT describe images, layout, or colours
- Do NOT add commentary or explanations
- If the page has no readable text, output nothing"#;

/// Build the summarization prompt.
///
/// With no instructions this is exactly
/// `"Please summarize the following text. \n\nText to summarize: <text>"`.
pub fn summary_prompt(text: &str, instructions: Option<&str>) -> String {
    let extra = instructions
        .map(|i| format!("Additional instructions: {i}"))
        .unwrap_or_default();
    format!("Please summarize the following text. {extra}\n\nText to summarize: {text}")
}

/// Prefix for joint prompts that span several pages.
pub fn cross_page_preamble(page_count: usize) -> String {
    format!(
        "The following text spans {page_count} pages; keep the summary coherent across pages. "
    )
}

/// Render one page block inside a joint prompt.
pub fn page_block(page_num: usize, text: &str) -> String {
    format!("Page {page_num}: {text}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_without_instructions() {
        assert_eq!(
            summary_prompt("Page 1: Hello", None),
            "Please summarize the following text. \n\nText to summarize: Page 1: Hello"
        );
    }

    #[test]
    fn prompt_with_instructions() {
        assert_eq!(
            summary_prompt("abc", Some("Use bullet points")),
            "Please summarize the following text. Additional instructions: Use bullet points\n\nText to summarize: abc"
        );
    }

    #[test]
    fn preamble_mentions_page_count() {
        assert!(cross_page_preamble(3).contains("3 pages"));
    }
}
