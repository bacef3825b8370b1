//! LLM providers for the text-repair stage.
//!
//! The repair stage needs exactly one capability: send a system prompt and a
//! user prompt, get a plain-text reply. [`LlmProvider`] captures that single
//! call shape; the concrete backends (OpenAI, Gemini, and any local
//! OpenAI-compatible server such as Ollama) live in the submodules and are
//! selected once at startup by [`resolve_provider`].
//!
//! Repair is an enhancement, not a correctness requirement: when no backend
//! is usable (no provider named, no API key in the environment), resolution
//! returns `None` and the pipeline passes the raw OCR text through unchanged.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::JobConfig;

mod gemini;
mod openai;

pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;

/// Default model per backend, used when the caller does not name one.
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4.1-mini";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_LOCAL_MODEL: &str = "phi3:mini";

/// Default base URL for the `local` backend (Ollama's OpenAI-compatible API).
pub const DEFAULT_LOCAL_BASE_URL: &str = "http://localhost:11434/v1";

/// Keys equal to this placeholder are treated as unset, so a copied-over
/// sample `.env` does not produce confusing authentication errors.
const PLACEHOLDER_KEY: &str = "your-api-key-here";

/// A chat-completion backend.
///
/// Implementations must be `Send + Sync`: the repair stage issues chunk
/// requests concurrently from one shared provider.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Short backend name for logs ("openai", "gemini", "local").
    fn name(&self) -> &str;

    /// One chat completion: system prompt plus user prompt in, reply text
    /// out. No retries here; the caller decides what a failure means.
    async fn chat_complete(&self, system: &str, user: &str) -> Result<String, LlmError>;
}

/// Errors from a single provider call.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Transport-level failure (connect, TLS, timeout).
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("{provider} returned HTTP {status}: {body}")]
    Api {
        provider: String,
        status: u16,
        body: String,
    },

    /// The API answered 200 but the body had no usable reply text.
    #[error("malformed {provider} response: {detail}")]
    Malformed { provider: String, detail: String },
}

impl LlmError {
    /// True when the failure was a client-side timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, LlmError::Http(e) if e.is_timeout())
    }
}

/// The configured backend family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenAi,
    Gemini,
    Local,
}

/// Parse failure for [`ProviderKind`].
#[derive(Debug, Error)]
#[error("unknown LLM provider '{0}' (expected openai, gemini, or local)")]
pub struct UnknownProvider(String);

impl FromStr for ProviderKind {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "gemini" => Ok(ProviderKind::Gemini),
            "local" | "ollama" => Ok(ProviderKind::Local),
            other => Err(UnknownProvider(other.to_string())),
        }
    }
}

/// Read an API key from the environment, treating empty and placeholder
/// values as unset.
fn env_key(var: &str) -> Option<String> {
    match std::env::var(var) {
        Ok(v) => {
            let v = v.trim();
            if v.is_empty() || v == PLACEHOLDER_KEY {
                None
            } else {
                Some(v.to_string())
            }
        }
        Err(_) => None,
    }
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`) — the caller constructed and
///    configured the provider entirely; we use it as-is. Useful in tests or
///    when the caller needs custom middleware (caching, rate-limiting).
///
/// 2. **Named provider** (`config.provider_name`) — the caller named a
///    backend (`"openai"`, `"gemini"`, `"local"`); the corresponding API key
///    is read from the environment (`OPENAI_API_KEY`, `GEMINI_API_KEY`; the
///    local backend needs none).
///
/// 3. **Environment** (`VID2TEXT_PROVIDER`) — same as 2, chosen at the
///    execution-environment level (shell profile, Makefile, CI).
///
/// 4. **Key sniffing** — an `OPENAI_API_KEY` or `GEMINI_API_KEY` in the
///    environment selects that backend, OpenAI first. The `local` backend is
///    never auto-selected: it implies a server on localhost, which has to be
///    asked for explicitly.
///
/// Returns `None` — with a warning — when nothing usable is found or the
/// named backend is missing its key; the repair stage then falls back to
/// identity.
pub fn resolve_provider(config: &JobConfig) -> Option<Arc<dyn LlmProvider>> {
    // 1) User-provided provider takes priority
    if let Some(ref provider) = config.provider {
        return Some(Arc::clone(provider));
    }

    // 2) Provider named in config
    if let Some(ref name) = config.provider_name {
        return build_named(name, config);
    }

    // 3) Provider named in the environment
    if let Some(name) = std::env::var("VID2TEXT_PROVIDER")
        .ok()
        .filter(|v| !v.trim().is_empty())
    {
        return build_named(&name, config);
    }

    // 4) Key sniffing, OpenAI first
    if env_key("OPENAI_API_KEY").is_some() {
        debug!("auto-detected openai provider from OPENAI_API_KEY");
        return build_kind(ProviderKind::OpenAi, config);
    }
    if env_key("GEMINI_API_KEY").is_some() {
        debug!("auto-detected gemini provider from GEMINI_API_KEY");
        return build_kind(ProviderKind::Gemini, config);
    }

    warn!("no LLM provider configured or detected; text repair will be skipped");
    None
}

fn build_named(name: &str, config: &JobConfig) -> Option<Arc<dyn LlmProvider>> {
    match name.parse::<ProviderKind>() {
        Ok(kind) => build_kind(kind, config),
        Err(e) => {
            warn!("{e}; text repair will be skipped");
            None
        }
    }
}

fn build_kind(kind: ProviderKind, config: &JobConfig) -> Option<Arc<dyn LlmProvider>> {
    let timeout = Duration::from_secs(config.llm_timeout_secs);
    let built: Result<Arc<dyn LlmProvider>, LlmError> = match kind {
        ProviderKind::OpenAi => {
            let Some(key) = env_key("OPENAI_API_KEY") else {
                warn!("OPENAI_API_KEY is not set (or is a placeholder); text repair will be skipped");
                return None;
            };
            let model = config.model.as_deref().unwrap_or(DEFAULT_OPENAI_MODEL);
            OpenAiProvider::new(key, model, config.temperature, timeout)
                .map(|p| Arc::new(p) as Arc<dyn LlmProvider>)
        }
        ProviderKind::Gemini => {
            let Some(key) = env_key("GEMINI_API_KEY") else {
                warn!("GEMINI_API_KEY is not set (or is a placeholder); text repair will be skipped");
                return None;
            };
            let model = config.model.as_deref().unwrap_or(DEFAULT_GEMINI_MODEL);
            GeminiProvider::new(key, model, config.temperature, timeout)
                .map(|p| Arc::new(p) as Arc<dyn LlmProvider>)
        }
        ProviderKind::Local => {
            // Ollama and friends want a key field present but ignore it.
            let model = config.model.as_deref().unwrap_or(DEFAULT_LOCAL_MODEL);
            OpenAiProvider::with_base_url(
                "local",
                &config.local_base_url,
                "ollama",
                model,
                config.temperature,
                timeout,
            )
            .map(|p| Arc::new(p) as Arc<dyn LlmProvider>)
        }
    };

    match built {
        Ok(provider) => {
            debug!(provider = provider.name(), "LLM provider ready");
            Some(provider)
        }
        Err(e) => {
            warn!("failed to initialise LLM provider: {e}; text repair will be skipped");
            None
        }
    }
}
