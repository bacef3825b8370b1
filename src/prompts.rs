//! Prompts for the LLM text-repair stage.
//!
//! Centralising every prompt here serves two purposes:
//!
//! 1. **Single source of truth** — tweaking the cleanup behaviour (e.g. how
//!    aggressively fragments are merged) requires editing exactly one place.
//!
//! 2. **Testability** — unit tests can inspect the chunk framing directly
//!    without spinning up a real LLM.

/// System prompt sent with every repair request.
pub const REPAIR_SYSTEM_PROMPT: &str =
    "You are a helpful assistant that cleans and corrects OCR text.";

/// Fixed instruction prefixed to each chunk's repair request.
pub const REPAIR_INSTRUCTION: &str = "\
The following text was extracted from a video using OCR and contains a lot of noise and gibberish. \
Please clean it up. Your task is to:
1. Remove any nonsensical words, random characters, and formatting errors.
2. Correct obvious OCR mistakes.
3. Join text fragments into coherent sentences and paragraphs.
4. Preserve the original meaning and intent.
Return only the cleaned, corrected text and nothing else.";

/// Build the user message for one chunk: instruction plus the chunk's literal
/// text, quoted so the model does not mistake trailing instructions for input.
pub fn repair_user_prompt(chunk: &str) -> String {
    format!("{REPAIR_INSTRUCTION}\n\nHere is the raw text:\n\n\"{chunk}\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_prompt_quotes_chunk_after_instruction() {
        let p = repair_user_prompt("smple OCR txt");
        assert!(p.starts_with(REPAIR_INSTRUCTION));
        assert!(p.ends_with("\"smple OCR txt\""));
    }
}
