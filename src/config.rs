//! Configuration types for a video-to-text job.
//!
//! All job behaviour is controlled through [`JobConfig`], built via its
//! [`JobConfigBuilder`]. Keeping every knob in one struct makes it trivial to
//! share configs across threads, log them, and diff two runs to understand
//! why their outputs differ.
//!
//! # Design choice: builder over constructor
//! A dozen-field constructor is unreadable and breaks on every new field.
//! The builder pattern lets callers set only what they care about and rely on
//! well-documented defaults for the rest.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::Vid2TextError;
use crate::llm::{LlmProvider, DEFAULT_LOCAL_BASE_URL};
use crate::progress::ProgressCallback;

/// Configuration for one video-to-text job.
///
/// Built via [`JobConfig::builder()`] or using [`JobConfig::default()`].
///
/// # Example
/// ```rust
/// use vid2text::JobConfig;
///
/// let config = JobConfig::builder()
///     .chunk_size(1200)
///     .provider_name("local")
///     .output_dir("out")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct JobConfig {
    /// Maximum characters per repair chunk. Default: 2500.
    ///
    /// Chunks are sized for models with small context windows; a local
    /// phi3:mini handles 2500 characters comfortably. Larger chunks mean
    /// fewer requests but risk truncated replies.
    pub chunk_size: usize,

    /// Number of concurrent repair requests. Default: 4.
    ///
    /// Repair calls are network-bound. Cleaned chunks are reassembled by
    /// index, so concurrency never changes the output text. Lower this if
    /// the provider rate-limits; raise it for short chunks on a fast API.
    pub concurrency: usize,

    /// LLM model identifier, e.g. "gpt-4.1-mini", "phi3:mini".
    /// If None, uses the selected provider's default.
    pub model: Option<String>,

    /// LLM provider name ("openai", "gemini", "local").
    /// If None along with `provider`, the provider is auto-detected from the
    /// environment; see [`crate::llm::resolve_provider`].
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LlmProvider>>,

    /// Sampling temperature for repair completions. Default: 0.5.
    ///
    /// Repair needs some freedom to merge fragments into prose, but high
    /// values invite rewording that drifts from the original meaning.
    pub temperature: f32,

    /// Per-repair-call timeout in seconds. Default: 60.
    ///
    /// A timed-out chunk falls back to its original text like any other
    /// failure; it never blocks the job.
    pub llm_timeout_secs: u64,

    /// Base URL for the `local` provider's OpenAI-compatible API.
    /// Default: `http://localhost:11434/v1` (Ollama).
    pub local_base_url: String,

    /// Tesseract language code for OCR. Default: "eng".
    pub ocr_lang: String,

    /// Browser whose session cookies the downloader may reuse for
    /// login-walled videos (e.g. "firefox", "chrome"). Default: None.
    pub cookies_browser: Option<String>,

    /// Directory the rendered document is written to, created if absent.
    /// Default: "output".
    pub output_dir: PathBuf,

    /// Filename of the rendered document. Default: "extracted_text.pdf".
    pub output_filename: String,

    /// Progress callback receiving frame and chunk events. Default: None.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            chunk_size: 2500,
            concurrency: 4,
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.5,
            llm_timeout_secs: 60,
            local_base_url: DEFAULT_LOCAL_BASE_URL.to_string(),
            ocr_lang: "eng".to_string(),
            cookies_browser: None,
            output_dir: PathBuf::from("output"),
            output_filename: "extracted_text.pdf".to_string(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for JobConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobConfig")
            .field("chunk_size", &self.chunk_size)
            .field("concurrency", &self.concurrency)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|p| p.name()))
            .field("temperature", &self.temperature)
            .field("llm_timeout_secs", &self.llm_timeout_secs)
            .field("local_base_url", &self.local_base_url)
            .field("ocr_lang", &self.ocr_lang)
            .field("cookies_browser", &self.cookies_browser)
            .field("output_dir", &self.output_dir)
            .field("output_filename", &self.output_filename)
            .finish()
    }
}

impl JobConfig {
    /// Create a new builder for `JobConfig`.
    pub fn builder() -> JobConfigBuilder {
        JobConfigBuilder {
            config: Self::default(),
        }
    }

    /// Full path of the rendered document: `output_dir/output_filename`.
    pub fn document_path(&self) -> PathBuf {
        self.output_dir.join(&self.output_filename)
    }
}

/// Builder for [`JobConfig`].
#[derive(Debug)]
pub struct JobConfigBuilder {
    config: JobConfig,
}

impl JobConfigBuilder {
    pub fn chunk_size(mut self, n: usize) -> Self {
        self.config.chunk_size = n.max(1);
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn llm_timeout_secs(mut self, secs: u64) -> Self {
        self.config.llm_timeout_secs = secs.max(1);
        self
    }

    pub fn local_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.local_base_url = url.into();
        self
    }

    pub fn ocr_lang(mut self, lang: impl Into<String>) -> Self {
        self.config.ocr_lang = lang.into();
        self
    }

    pub fn cookies_browser(mut self, browser: impl Into<String>) -> Self {
        self.config.cookies_browser = Some(browser.into());
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn output_filename(mut self, name: impl Into<String>) -> Self {
        self.config.output_filename = name.into();
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<JobConfig, Vid2TextError> {
        let c = &self.config;
        if c.chunk_size == 0 {
            return Err(Vid2TextError::InvalidConfig(
                "chunk_size must be ≥ 1".into(),
            ));
        }
        if c.concurrency == 0 {
            return Err(Vid2TextError::InvalidConfig(
                "concurrency must be ≥ 1".into(),
            ));
        }
        if c.output_filename.trim().is_empty() {
            return Err(Vid2TextError::InvalidConfig(
                "output_filename must not be empty".into(),
            ));
        }
        if c.ocr_lang.trim().is_empty() {
            return Err(Vid2TextError::InvalidConfig(
                "ocr_lang must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}
