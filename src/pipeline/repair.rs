//! Repair: clean the raw OCR transcript with an LLM, chunk by chunk.
//!
//! Chunks are repaired concurrently (bounded by the configured concurrency)
//! and reassembled in order afterwards. A chunk whose request fails keeps
//! its original text; a single flaky call can therefore never lose words,
//! only leave them uncorrected. There are no retries: the fallback is the
//! recovery.

use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, StreamExt};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::chunk::split_chunks;
use crate::config::JobConfig;
use crate::error::ChunkError;
use crate::llm::LlmProvider;
use crate::output::ChunkOutcome;
use crate::progress::ProgressCallback;
use crate::prompts::{repair_user_prompt, REPAIR_SYSTEM_PROMPT};

/// Outcome of the repair stage.
#[derive(Debug, Clone)]
pub struct Repaired {
    /// Chunk texts rejoined with blank lines, or the raw text verbatim when
    /// the stage was skipped.
    pub text: String,
    /// Per-chunk outcomes in chunk order; empty when skipped.
    pub chunks: Vec<ChunkOutcome>,
    /// True when no repair was attempted (no provider, or nothing to do).
    pub skipped: bool,
}

/// Repair `raw` with `provider`, or pass it through untouched when there is
/// no provider or no text.
///
/// This stage is infallible: every chunk resolves to either its repaired
/// text or its original text, so the caller always gets a full transcript.
pub async fn repair_text(
    raw: &str,
    provider: Option<Arc<dyn LlmProvider>>,
    config: &JobConfig,
) -> Repaired {
    let Some(provider) = provider else {
        info!("no text repair provider configured; keeping raw text");
        return Repaired {
            text: raw.to_string(),
            chunks: Vec::new(),
            skipped: true,
        };
    };
    if raw.is_empty() {
        debug!("no text to repair");
        return Repaired {
            text: raw.to_string(),
            chunks: Vec::new(),
            skipped: true,
        };
    }

    let chunks = split_chunks(raw, config.chunk_size);
    let total = chunks.len();
    let progress = config.progress_callback.clone();
    info!(
        provider = provider.name(),
        chunks = total,
        concurrency = config.concurrency,
        "repairing text"
    );
    if let Some(cb) = &progress {
        cb.on_repair_start(total);
    }

    let mut outcomes: Vec<ChunkOutcome> = stream::iter(chunks.into_iter().enumerate().map(
        |(index, chunk)| {
            let provider = provider.clone();
            let progress = progress.clone();
            let timeout_secs = config.llm_timeout_secs;
            async move { repair_chunk(index, total, chunk, provider, progress, timeout_secs).await }
        },
    ))
    .buffer_unordered(config.concurrency)
    .collect()
    .await;

    outcomes.sort_by_key(|outcome| outcome.index);

    let text = outcomes
        .iter()
        .map(|outcome| outcome.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");
    let repaired = outcomes.iter().filter(|o| !o.fallback).count();
    if let Some(cb) = &progress {
        cb.on_repair_complete(total, repaired);
    }
    info!(repaired, fallback = total - repaired, "repair finished");

    Repaired {
        text,
        chunks: outcomes,
        skipped: false,
    }
}

async fn repair_chunk(
    index: usize,
    total: usize,
    chunk: String,
    provider: Arc<dyn LlmProvider>,
    progress: Option<ProgressCallback>,
    timeout_secs: u64,
) -> ChunkOutcome {
    if let Some(cb) = &progress {
        cb.on_chunk_start(index, total);
    }
    let started = Instant::now();
    let user = repair_user_prompt(&chunk);

    let (text, fallback, error) = match provider.chat_complete(REPAIR_SYSTEM_PROMPT, &user).await {
        Ok(reply) => (sanitize_reply(&reply), false, None),
        Err(e) => {
            warn!(chunk = index, error = %e, "repair failed; keeping original text");
            let error = if e.is_timeout() {
                ChunkError::Timeout {
                    chunk: index,
                    secs: timeout_secs,
                }
            } else {
                ChunkError::LlmFailed {
                    chunk: index,
                    detail: e.to_string(),
                }
            };
            (chunk, true, Some(error))
        }
    };

    let outcome = ChunkOutcome {
        index,
        text,
        fallback,
        error,
        duration_ms: started.elapsed().as_millis() as u64,
    };
    if let Some(cb) = &progress {
        cb.on_chunk_complete(index, total, outcome.fallback);
    }
    outcome
}

static CODE_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)\A```[a-zA-Z0-9_-]*[ \t]*\n?(.*?)\n?```\z").expect("valid fence regex")
});

/// Strip the wrappers chat models like to add around plain text: an outer
/// markdown code fence and an outer pair of double quotes.
fn sanitize_reply(reply: &str) -> String {
    let trimmed = reply.trim();
    let unfenced = match CODE_FENCE.captures(trimmed) {
        Some(caps) => caps.get(1).map_or(trimmed, |m| m.as_str()),
        None => trimmed,
    };
    strip_outer_quotes(unfenced.trim()).to_string()
}

fn strip_outer_quotes(text: &str) -> &str {
    match text
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
    {
        Some(inner) if !inner.is_empty() => inner,
        _ => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::llm::LlmError;
    use crate::progress::JobProgressCallback;

    fn config(chunk_size: usize, concurrency: usize) -> JobConfig {
        JobConfig::builder()
            .chunk_size(chunk_size)
            .concurrency(concurrency)
            .build()
            .unwrap()
    }

    struct FailingProvider;

    #[async_trait]
    impl LlmProvider for FailingProvider {
        fn name(&self) -> &str {
            "failing"
        }
        async fn chat_complete(&self, _system: &str, _user: &str) -> Result<String, LlmError> {
            Err(LlmError::Api {
                provider: "failing".to_string(),
                status: 500,
                body: "boom".to_string(),
            })
        }
    }

    /// Uppercases the quoted chunk at the end of the prompt. The first call
    /// is delayed so completion order differs from chunk order.
    struct ShufflingProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LlmProvider for ShufflingProvider {
        fn name(&self) -> &str {
            "shuffling"
        }
        async fn chat_complete(&self, _system: &str, user: &str) -> Result<String, LlmError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            let chunk = user.rsplit('"').nth(1).unwrap_or("");
            Ok(chunk.to_uppercase())
        }
    }

    /// Fails for chunks containing the marker, uppercases the rest.
    struct FlakyProvider {
        marker: &'static str,
    }

    #[async_trait]
    impl LlmProvider for FlakyProvider {
        fn name(&self) -> &str {
            "flaky"
        }
        async fn chat_complete(&self, _system: &str, user: &str) -> Result<String, LlmError> {
            let chunk = user.rsplit('"').nth(1).unwrap_or("");
            if chunk.contains(self.marker) {
                return Err(LlmError::Malformed {
                    provider: "flaky".to_string(),
                    detail: "no choices in response".to_string(),
                });
            }
            Ok(chunk.to_uppercase())
        }
    }

    struct PanickingProvider;

    #[async_trait]
    impl LlmProvider for PanickingProvider {
        fn name(&self) -> &str {
            "panicking"
        }
        async fn chat_complete(&self, _system: &str, _user: &str) -> Result<String, LlmError> {
            panic!("provider must not be contacted");
        }
    }

    #[derive(Default)]
    struct RecordingProgress {
        started: Mutex<Vec<usize>>,
        completed: Mutex<Vec<(usize, bool)>>,
        summary: Mutex<Option<(usize, usize)>>,
    }

    impl JobProgressCallback for RecordingProgress {
        fn on_chunk_start(&self, chunk: usize, _total: usize) {
            self.started.lock().unwrap().push(chunk);
        }
        fn on_chunk_complete(&self, chunk: usize, _total: usize, fallback: bool) {
            self.completed.lock().unwrap().push((chunk, fallback));
        }
        fn on_repair_complete(&self, total: usize, repaired: usize) {
            *self.summary.lock().unwrap() = Some((total, repaired));
        }
    }

    #[tokio::test]
    async fn no_provider_keeps_raw_text() {
        let out = repair_text("hello wrold", None, &config(2500, 4)).await;
        assert!(out.skipped);
        assert_eq!(out.text, "hello wrold");
        assert!(out.chunks.is_empty());
    }

    #[tokio::test]
    async fn empty_text_never_contacts_provider() {
        let out = repair_text("", Some(Arc::new(PanickingProvider)), &config(2500, 4)).await;
        assert!(out.skipped);
        assert_eq!(out.text, "");
    }

    #[tokio::test]
    async fn failed_chunks_fall_back_to_original() {
        let out = repair_text("a b c d", Some(Arc::new(FailingProvider)), &config(3, 2)).await;
        assert!(!out.skipped);
        // Both chunks kept their original text, rejoined with a blank line.
        assert_eq!(out.text, "a b\n\nc d");
        assert_eq!(out.chunks.len(), 2);
        for outcome in &out.chunks {
            assert!(outcome.fallback);
            assert!(matches!(
                outcome.error,
                Some(ChunkError::LlmFailed { .. })
            ));
        }
    }

    #[tokio::test]
    async fn single_failed_chunk_is_verbatim_raw_text() {
        let raw = "hello wrold this is smple OCR txt";
        let out = repair_text(raw, Some(Arc::new(FailingProvider)), &config(2500, 4)).await;
        assert_eq!(out.chunks.len(), 1);
        assert_eq!(out.text, raw);
    }

    #[tokio::test]
    async fn chunk_order_survives_concurrency() {
        let provider = Arc::new(ShufflingProvider {
            calls: AtomicUsize::new(0),
        });
        let out = repair_text("aa bb cc dd", Some(provider), &config(5, 4)).await;
        assert_eq!(out.text, "AA BB\n\nCC DD");
        let indices: Vec<usize> = out.chunks.iter().map(|c| c.index).collect();
        assert_eq!(indices, vec![0, 1]);
    }

    #[tokio::test]
    async fn mixed_outcome_keeps_successes_and_reports_failures() {
        let progress = Arc::new(RecordingProgress::default());
        let mut config = config(2, 1);
        config.progress_callback = Some(progress.clone());

        let provider = Arc::new(FlakyProvider { marker: "bb" });
        let out = repair_text("aa bb", Some(provider), &config).await;

        assert_eq!(out.text, "AA\n\nbb");
        assert!(!out.chunks[0].fallback);
        assert!(out.chunks[1].fallback);
        assert!(out.chunks[0].error.is_none());
        assert!(out.chunks[1].error.is_some());

        let mut started = progress.started.lock().unwrap().clone();
        started.sort_unstable();
        assert_eq!(started, vec![0, 1]);
        assert_eq!(*progress.summary.lock().unwrap(), Some((2, 1)));
    }

    #[test]
    fn sanitize_strips_fences_and_quotes() {
        assert_eq!(sanitize_reply("plain text"), "plain text");
        assert_eq!(sanitize_reply("  padded  "), "padded");
        assert_eq!(sanitize_reply("```\nfenced text\n```"), "fenced text");
        assert_eq!(sanitize_reply("```text\nfenced text\n```"), "fenced text");
        assert_eq!(sanitize_reply("\"quoted text\""), "quoted text");
        assert_eq!(sanitize_reply("```\n\"both\"\n```"), "both");
        // A lone leading or trailing quote is content, not a wrapper.
        assert_eq!(sanitize_reply("\"unbalanced"), "\"unbalanced");
        assert_eq!(sanitize_reply("it said \"hi\" twice"), "it said \"hi\" twice");
        assert_eq!(sanitize_reply(""), "");
    }
}
