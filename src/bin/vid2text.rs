//! CLI binary for vid2text.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `JobConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;
use vid2text::llm::DEFAULT_LOCAL_BASE_URL;
use vid2text::pipeline::source::is_url;
use vid2text::{run, JobConfig, JobOutput, JobProgressCallback, ProgressCallback};

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a spinner while downloading and extracting,
/// then a real progress bar once the chunk count is known. Chunk completions
/// may arrive out of order (concurrent repair); each prints its own line.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Per-chunk wall-clock start times for elapsed reporting.
    start_times: Mutex<HashMap<usize, Instant>>,
    /// Chunks that kept their original text.
    fallbacks: AtomicUsize,
}

impl CliProgressCallback {
    /// Create a callback in spinner mode; `on_repair_start` switches it to a
    /// bar once the chunk total is known.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);

        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Resolving video…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            fallbacks: AtomicUsize::new(0),
        })
    }

    /// Switch to the full progress-bar style once the chunk total is known.
    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} chunks  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_length(total as u64);
        self.bar.set_position(0);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Repairing");
        self.bar.reset_eta();
    }

    /// Idempotent teardown; also covers runs where repair never started.
    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl JobProgressCallback for CliProgressCallback {
    fn on_download_start(&self, url: &str) {
        self.bar.set_prefix("Downloading");
        self.bar.set_message(url.to_string());
    }

    fn on_extraction_start(&self) {
        self.bar.set_prefix("Extracting");
        self.bar.set_message("sampling frames…");
    }

    fn on_frame_sampled(&self, ordinal: usize) {
        // Ordinals are zero-based; show a running count instead.
        self.bar.set_message(format!("{} frames read", ordinal + 1));
    }

    fn on_repair_start(&self, total_chunks: usize) {
        self.activate_bar(total_chunks);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Repairing {total_chunks} text chunks…"))
        ));
    }

    fn on_chunk_start(&self, chunk: usize, _total_chunks: usize) {
        self.start_times
            .lock()
            .unwrap()
            .insert(chunk, Instant::now());
        self.bar.set_message(format!("chunk {}", chunk + 1));
    }

    fn on_chunk_complete(&self, chunk: usize, total_chunks: usize, fallback: bool) {
        let elapsed_ms = self
            .start_times
            .lock()
            .unwrap()
            .remove(&chunk)
            .map(|t| t.elapsed().as_millis())
            .unwrap_or(0);

        let line = if fallback {
            self.fallbacks.fetch_add(1, Ordering::SeqCst);
            format!(
                "  {} Chunk {:>3}/{:<3}  {}  {}",
                red("✗"),
                chunk + 1,
                total_chunks,
                red("kept original text"),
                dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
            )
        } else {
            format!(
                "  {} Chunk {:>3}/{:<3}  {}",
                green("✓"),
                chunk + 1,
                total_chunks,
                dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
            )
        };
        self.bar.println(line);
        self.bar.inc(1);
    }

    fn on_repair_complete(&self, total_chunks: usize, repaired: usize) {
        let fallbacks = total_chunks.saturating_sub(repaired);
        self.bar.finish_and_clear();

        if fallbacks == 0 {
            eprintln!(
                "{} {} chunks repaired",
                green("✔"),
                bold(&repaired.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} chunks repaired  ({} kept original text)",
                if repaired == 0 { red("✘") } else { cyan("⚠") },
                bold(&repaired.to_string()),
                total_chunks,
                red(&fallbacks.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Local video to output/extracted_text.pdf
  vid2text lecture.mp4

  # Download first, then extract
  vid2text https://www.youtube.com/watch?v=dQw4w9WgXcQ

  # Gated video: reuse your browser's login cookies
  vid2text --cookies-from-browser firefox https://example.com/members/talk

  # Pick the document location
  vid2text lecture.mp4 -o notes --filename lecture.pdf

  # Use a specific provider and model
  vid2text --provider gemini --model gemini-2.0-flash lecture.mp4

  # Repair through a local Ollama server (no API key)
  vid2text --provider local --model phi3:mini lecture.mp4

  # Structured JSON result (text, chunks, stats) on stdout
  vid2text --json lecture.mp4 > result.json

  # No flags at all: prompts for the URL or path interactively
  vid2text

SUPPORTED PROVIDERS & MODELS:
  Provider   Default model      Needs             Notes
  ─────────  ─────────────────  ────────────────  ──────────────────────────
  openai     gpt-4.1-mini       OPENAI_API_KEY    default when key is set
  gemini     gemini-2.0-flash   GEMINI_API_KEY
  local      phi3:mini          an Ollama server  never auto-selected

  Without a provider the repair stage is skipped and the raw OCR text is
  rendered as-is.

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY        OpenAI API key
  GEMINI_API_KEY        Google Gemini API key
  VID2TEXT_PROVIDER     Override provider (openai, gemini, local)
  VID2TEXT_MODEL        Override model ID
  RUST_LOG              Tracing filter, overrides -v/-q

EXTERNAL TOOLS:
  ffmpeg / ffprobe   frame decoding          (required)
  tesseract          OCR                     (required)
  yt-dlp             URL downloads           (only for URLs)

  All three are ordinary distro packages; nothing is linked at build time.

SETUP:
  1. Install tools:   apt install ffmpeg tesseract-ocr yt-dlp
  2. Set API key:     export OPENAI_API_KEY=sk-...     (optional)
  3. Extract:         vid2text lecture.mp4
"#;

/// Extract on-screen text from a video into a cleaned PDF.
#[derive(Parser, Debug)]
#[command(
    name = "vid2text",
    version,
    about = "Extract on-screen text from videos into a cleaned PDF",
    long_about = "Extract the on-screen text of a video (local file or URL) into a searchable \
PDF. Frames are sampled at roughly one per second, OCR'd with tesseract, and the raw text is \
cleaned up chunk by chunk with an LLM (OpenAI, Gemini, or any OpenAI-compatible endpoint such \
as Ollama).",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local video file path or HTTP/HTTPS URL. Prompts when omitted.
    input: Option<String>,

    /// Directory the document is written into.
    #[arg(short, long, env = "VID2TEXT_OUTPUT_DIR", default_value = "output")]
    output_dir: PathBuf,

    /// Document filename inside the output directory.
    #[arg(long, env = "VID2TEXT_FILENAME", default_value = "extracted_text.pdf")]
    filename: String,

    /// LLM provider: openai, gemini, local.
    #[arg(
        long,
        env = "VID2TEXT_PROVIDER",
        long_help = "LLM provider for the repair stage. Auto-detected from API key env vars \
if not set; `local` (an OpenAI-compatible server such as Ollama) is only used when asked for."
    )]
    provider: Option<String>,

    /// LLM model ID (e.g. gpt-4.1-mini, gemini-2.0-flash, phi3:mini).
    #[arg(long, env = "VID2TEXT_MODEL")]
    model: Option<String>,

    /// Max characters per repair chunk.
    #[arg(long, env = "VID2TEXT_CHUNK_SIZE", default_value_t = 2500)]
    chunk_size: usize,

    /// Number of concurrent LLM calls.
    #[arg(short, long, env = "VID2TEXT_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// LLM sampling temperature (0.0–2.0).
    #[arg(long, env = "VID2TEXT_TEMPERATURE", default_value_t = 0.5)]
    temperature: f32,

    /// Tesseract language code (e.g. eng, deu, deu+eng).
    #[arg(long, env = "VID2TEXT_OCR_LANG", default_value = "eng")]
    ocr_lang: String,

    /// Browser whose cookies unlock gated videos (firefox, chrome, …).
    #[arg(long, env = "VID2TEXT_COOKIES_BROWSER")]
    cookies_from_browser: Option<String>,

    /// Base URL of the `local` provider's OpenAI-compatible API.
    #[arg(long, env = "VID2TEXT_LOCAL_URL", default_value = DEFAULT_LOCAL_BASE_URL)]
    local_url: String,

    /// Per-chunk LLM call timeout in seconds.
    #[arg(long, env = "VID2TEXT_LLM_TIMEOUT", default_value_t = 60)]
    llm_timeout: u64,

    /// Output the structured JSON result instead of a summary.
    #[arg(long, env = "VID2TEXT_JSON")]
    json: bool,

    /// Print the final text to stdout as well as rendering the document.
    #[arg(long)]
    print_text: bool,

    /// Disable the progress bar.
    #[arg(long, env = "VID2TEXT_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "VID2TEXT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "VID2TEXT_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar is the user-facing feedback channel; when it is
    // active, library INFO logs would only fight it for the terminal.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Gather input, asking interactively when flags left it out ────────
    let (input, prompted) = match cli.input.clone() {
        Some(input) => (input, false),
        None => (prompt_line("Enter a video URL or local file path: ")?, true),
    };
    let mut cookies = cli.cookies_from_browser.clone();
    if prompted && cookies.is_none() && is_url(&input) {
        if prompt_yes_no("Does this video require a login? (yes/no): ")? {
            let browser = prompt_line("Browser holding the cookies (firefox, chrome, …): ")?;
            cookies = Some(browser);
        }
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb = if show_progress {
        Some(CliProgressCallback::new_dynamic())
    } else {
        None
    };
    let config = build_config(&cli, cookies, progress_cb.clone().map(|cb| cb as ProgressCallback))?;

    // ── Run the job ──────────────────────────────────────────────────────
    let result = run(&input, &config).await;
    if let Some(cb) = &progress_cb {
        cb.finish();
    }
    let output = result.context("Extraction failed")?;

    // ── Print results ────────────────────────────────────────────────────
    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
        return Ok(());
    }

    if cli.print_text {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(output.text.as_bytes())
            .context("Failed to write to stdout")?;
        if !output.text.ends_with('\n') {
            handle.write_all(b"\n").ok();
        }
    }

    if !cli.quiet {
        print_summary(&output);
    }
    Ok(())
}

/// One-line wrap-up on stderr after the job finished.
fn print_summary(output: &JobOutput) {
    let stats = &output.stats;
    match &output.document_path {
        Some(path) => {
            eprintln!(
                "{}  {} frames → {} chunks → {}  {}",
                if stats.chunks_fallback == 0 {
                    green("✔")
                } else {
                    cyan("⚠")
                },
                stats.frames_sampled,
                stats.chunks_total,
                bold(&path.display().to_string()),
                dim(&format!("{:.1}s", stats.total_duration_ms as f64 / 1000.0)),
            );
            if stats.repair_skipped {
                eprintln!("   {}", dim("repair skipped (no provider configured)"));
            } else if stats.chunks_fallback > 0 {
                eprintln!(
                    "   {} chunks kept their original text",
                    red(&stats.chunks_fallback.to_string())
                );
            }
        }
        None => {
            eprintln!(
                "{}  no text extracted — nothing to render  {}",
                cyan("⚠"),
                dim(&format!("{:.1}s", stats.total_duration_ms as f64 / 1000.0)),
            );
        }
    }
    if let Some(notice) = &stats.decode_notice {
        eprintln!("   {}", red(notice));
    }
}

/// Map CLI args to `JobConfig`.
fn build_config(
    cli: &Cli,
    cookies: Option<String>,
    progress: Option<ProgressCallback>,
) -> Result<JobConfig> {
    let mut builder = JobConfig::builder()
        .chunk_size(cli.chunk_size)
        .concurrency(cli.concurrency)
        .temperature(cli.temperature)
        .llm_timeout_secs(cli.llm_timeout)
        .ocr_lang(cli.ocr_lang.clone())
        .local_base_url(cli.local_url.clone())
        .output_dir(cli.output_dir.clone())
        .output_filename(cli.filename.clone());

    if let Some(model) = &cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(provider) = &cli.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(browser) = cookies {
        builder = builder.cookies_browser(browser);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Prompt on stderr and read one trimmed line from stdin.
fn prompt_line(prompt: &str) -> Result<String> {
    eprint!("{prompt}");
    io::stderr().flush().ok();

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read from stdin")?;
    let line = line.trim().to_string();
    if line.is_empty() {
        anyhow::bail!("no input given");
    }
    Ok(line)
}

/// Like [`prompt_line`], but an empty answer means no.
fn prompt_yes_no(prompt: &str) -> Result<bool> {
    eprint!("{prompt}");
    io::stderr().flush().ok();

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read from stdin")?;
    Ok(matches!(line.trim().to_lowercase().as_str(), "y" | "yes"))
}
