//! Text chunking for the repair stage.
//!
//! LLM context windows are bounded, so the raw OCR text is split into pieces
//! of at most `max_len` characters before being sent for cleanup. Splits land
//! on whitespace so no word is ever cut in half; a run with no whitespace at
//! all (URLs, base64 noise, CJK text) is force-split exactly at `max_len`,
//! which bounds the loop even for pathological input.
//!
//! The split is lossless modulo separators: concatenating the chunks and
//! re-inserting the discarded whitespace reconstructs the input exactly, and
//! the chunk count is deterministic for a given `(text, max_len)` pair.

/// Byte offsets `(start, end)` of the character at char index `n`, when the
/// string has more than `n` characters.
fn char_span(s: &str, n: usize) -> Option<(usize, usize)> {
    s.char_indices()
        .nth(n)
        .map(|(start, c)| (start, start + c.len_utf8()))
}

/// Split `text` into chunks of at most `max_len` characters without breaking
/// words.
///
/// While the remainder is longer than `max_len` characters, the split point is
/// the last whitespace character at or before char index `max_len`; the chunk
/// is everything before it, and the whitespace run at the boundary is dropped
/// from the remainder. When the window contains no whitespace the split is
/// forced at exactly `max_len` characters and nothing is dropped.
///
/// The final remainder is always emitted, even when it is empty (input ending
/// in whitespace just past a boundary), so callers can rely on a non-empty
/// return and positional 1:1 correspondence with downstream results.
///
/// # Panics
///
/// Panics if `max_len` is zero.
pub fn split_chunks(text: &str, max_len: usize) -> Vec<String> {
    assert!(max_len > 0, "chunk size must be at least 1");

    let mut chunks = Vec::new();
    let mut rest = text;

    // `char_span` is Some while the remainder exceeds `max_len` characters.
    while let Some((force_at, window_end)) = char_span(rest, max_len) {
        // Last whitespace within the first max_len + 1 characters, if any.
        let cut = match rest[..window_end].rfind(char::is_whitespace) {
            Some(ws) => ws,
            None => force_at,
        };
        chunks.push(rest[..cut].to_string());
        rest = rest[cut..].trim_start();
    }

    chunks.push(rest.to_string());
    chunks
}
