//! CLI binary for studylm.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `GenerationConfig`, prints the study record and runs the requested
//! exports.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use studylm::export::notes::NotesDocument;
use studylm::export::speech::{write_audio, GoogleTranslateTts};
use studylm::{
    collect_input, youtube_search_url, ContentGenerator, DiagramType, GenerationConfig,
    GenerationOutput, GenerationProgressCallback, ProgressCallback,
};
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

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

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a spinner naming the model being tried, plus
/// one log line per failed candidate.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Start of the current candidate, for elapsed reporting.
    started: Mutex<Option<Instant>>,
    total: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);
        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.set_message("Reading input…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            started: Mutex::new(None),
            total: AtomicUsize::new(0),
        })
    }

    fn elapsed_secs(&self) -> f64 {
        self.started
            .lock()
            .map(|s| s.map(|t| t.elapsed().as_secs_f64()).unwrap_or(0.0))
            .unwrap_or(0.0)
    }
}

impl GenerationProgressCallback for CliProgressCallback {
    fn on_generation_start(&self, total_candidates: usize) {
        self.total.store(total_candidates, Ordering::SeqCst);
        self.bar.set_prefix("Generating");
    }

    fn on_candidate_start(&self, model: &str, index: usize) {
        if let Ok(mut started) = self.started.lock() {
            *started = Some(Instant::now());
        }
        self.bar.set_message(format!(
            "{model} {}",
            dim(&format!("({}/{})", index + 1, self.total.load(Ordering::SeqCst)))
        ));
    }

    fn on_candidate_failed(&self, model: &str, _index: usize, error: &str) {
        // Keep failure lines on one terminal row.
        let msg = if error.chars().count() > 100 {
            let cut: String = error.chars().take(99).collect();
            format!("{cut}\u{2026}")
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} {:<28}  {}  {}",
            red("✗"),
            model,
            red(&msg),
            dim(&format!("{:.1}s", self.elapsed_secs())),
        ));
    }

    fn on_generation_complete(&self, model: Option<&str>, attempts: usize) {
        self.bar.finish_and_clear();
        match model {
            Some(m) => eprintln!(
                "{} answered by {} {}",
                green("✔"),
                bold(m),
                dim(&format!("(attempt {attempts})"))
            ),
            None => eprintln!("{} all {attempts} models failed", red("✘")),
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Explain a topic
  studylm "Newton's laws of motion"

  # Ask for a flowchart as well
  studylm --diagram flowchart "How does photosynthesis work?"

  # Study from lecture notes (typed text is optional)
  studylm -f lecture.pdf -f handout.docx "Focus on the key definitions"

  # Pipe text in
  cat notes.txt | studylm -

  # Save notes and audio
  studylm "The French Revolution" --pdf notes.pdf --audio media/audio/explanation.mp3

  # Machine-readable output, custom fallback chain
  studylm --json --models llama-3.3-70b-versatile,llama-3.1-8b-instant "Entropy"

  # Another provider through edgequake-llm
  studylm --provider openai --models gpt-4.1-mini "Plate tectonics"

DIAGRAM TYPES:
  none        no diagram (default)
  flowchart   decision/sequence steps
  tree        hierarchy, parent before children
  process     ordered stages of a process

DEFAULT MODEL CHAIN (tried in order, first valid answer wins):
  llama-3.3-70b-specdec → llama-3.3-70b-versatile → llama-3.2-3b-preview → llama-3.2-1b-preview

ENVIRONMENT VARIABLES:
  GROQ_API_KEY            Groq API key (required for the default provider)
  STUDYLM_PROVIDER        Override provider (groq, openai, anthropic, gemini, ollama)
  STUDYLM_MODELS          Comma-separated fallback chain
  OPENAI_API_KEY, ANTHROPIC_API_KEY, GEMINI_API_KEY
                          Credentials for non-Groq providers
  PDFIUM_LIB_PATH         Path to an existing libpdfium — skips auto-download
  RUST_LOG                Tracing filter (overrides -v / -q)

SETUP:
  1. Set API key:     export GROQ_API_KEY=gsk_...
  2. Study:           studylm "Topic or question"

  PDFium (~30 MB) is downloaded on first use of a .pdf upload or --pdf
  export and cached afterwards.
"#;

/// Generate study material (explanation, resources, diagram steps) with an LLM.
#[derive(Parser, Debug)]
#[command(
    name = "studylm",
    version,
    about = "Generate study material from a topic, question or document using an LLM",
    long_about = "Turn a topic, question, notes or uploaded documents (.pdf, .docx, .txt) into a \
topic title, a 200-300 word explanation, recommended resources and optional diagram steps. \
Models are tried in order until one returns a usable answer.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Topic, question or notes. Use "-" to read from stdin.
    text: Option<String>,

    /// Document to study from (.pdf, .docx, .txt). Repeatable.
    #[arg(short, long = "file", value_name = "FILE")]
    files: Vec<PathBuf>,

    /// Diagram to request alongside the explanation.
    #[arg(
        long,
        env = "STUDYLM_DIAGRAM",
        value_parser = clap::value_parser!(DiagramType),
        default_value = "none"
    )]
    diagram: DiagramType,

    /// Comma-separated fallback chain, most preferred first.
    #[arg(long, env = "STUDYLM_MODELS", value_delimiter = ',')]
    models: Vec<String>,

    /// LLM provider: groq (default), openai, anthropic, gemini, ollama.
    #[arg(long, env = "STUDYLM_PROVIDER")]
    provider: Option<String>,

    /// Groq API key.
    #[arg(long, env = "GROQ_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// OpenAI-compatible base URL for the Groq client.
    #[arg(long, env = "STUDYLM_BASE_URL")]
    base_url: Option<String>,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "STUDYLM_TEMPERATURE", default_value_t = 0.6)]
    temperature: f32,

    /// Max LLM output tokens.
    #[arg(long, env = "STUDYLM_MAX_TOKENS", default_value_t = 2048)]
    max_tokens: usize,

    /// Per-request timeout in seconds.
    #[arg(long, env = "STUDYLM_TIMEOUT", default_value_t = 60)]
    timeout: u64,

    /// Treat answers without a "topic" key as failures.
    #[arg(long, env = "STUDYLM_REQUIRE_TOPIC")]
    require_topic: bool,

    /// Save the explanation as spoken MP3 audio.
    #[arg(long, value_name = "FILE")]
    audio: Option<PathBuf>,

    /// Save printable PDF notes.
    #[arg(long, value_name = "FILE")]
    pdf: Option<PathBuf>,

    /// Save Markdown notes.
    #[arg(short = 'o', long = "markdown", value_name = "FILE")]
    markdown: Option<PathBuf>,

    /// Print the full generation report as JSON.
    #[arg(long, env = "STUDYLM_JSON")]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "STUDYLM_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "STUDYLM_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and the result.
    #[arg(short, long, env = "STUDYLM_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner carries the feedback; library logs drop to errors while
    // it is shown.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && io::stderr().is_terminal();
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

    // ── Build config ─────────────────────────────────────────────────────
    // Construct the generator first: a missing credential is fatal before
    // any file is read or request made.
    let progress = if show_progress {
        Some(CliProgressCallback::new())
    } else {
        None
    };
    let config = build_config(
        &cli,
        progress
            .clone()
            .map(|cb| cb as Arc<dyn GenerationProgressCallback>),
    )?;
    let generator = ContentGenerator::new(config).context("Failed to start content generator")?;

    // ── PDF engine ───────────────────────────────────────────────────────
    if needs_pdfium(&cli) {
        ensure_pdf_engine(cli.quiet)?;
    }

    // ── Input ────────────────────────────────────────────────────────────
    let typed = read_typed_text(cli.text.as_deref())?;
    let input = match collect_input(&typed, &cli.files).await {
        Ok(input) => input,
        Err(e) => {
            clear_progress(progress.as_deref());
            return Err(e).context("Failed to read input");
        }
    };

    // ── Generate ─────────────────────────────────────────────────────────
    let diagram = cli.diagram;
    let output = match generator.generate_detailed(&input, diagram).await {
        Ok(output) => output,
        Err(e) => {
            clear_progress(progress.as_deref());
            return Err(e).context("Generation failed");
        }
    };

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else {
        print_content(&output);
    }

    // ── Exports ──────────────────────────────────────────────────────────
    let notes = NotesDocument::from_content(&output.content);
    if let Some(ref path) = cli.markdown {
        notes
            .write_markdown(path)
            .await
            .context("Failed to save Markdown notes")?;
        report_saved(&cli, "Notes", path);
    }
    if let Some(ref path) = cli.pdf {
        notes
            .write_pdf(path)
            .await
            .context("Failed to save PDF notes")?;
        report_saved(&cli, "PDF notes", path);
    }
    if let Some(ref path) = cli.audio {
        let tts = GoogleTranslateTts::new(cli.timeout)?;
        write_audio(&tts, &output.content.explanation, path)
            .await
            .context("Failed to save audio")?;
        report_saved(&cli, "Audio", path);
    }

    if !cli.quiet && !cli.json {
        eprintln!(
            "   {} tokens in  /  {} tokens out  —  {}ms total",
            dim(&output.input_tokens.to_string()),
            dim(&output.output_tokens.to_string()),
            output.duration_ms,
        );
    }

    Ok(())
}

fn clear_progress(progress: Option<&CliProgressCallback>) {
    if let Some(cb) = progress {
        cb.bar.finish_and_clear();
    }
}

/// Map CLI args to `GenerationConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<GenerationConfig> {
    let mut builder = GenerationConfig::builder()
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens)
        .request_timeout_secs(cli.timeout)
        .require_topic(cli.require_topic);

    if !cli.models.is_empty() {
        builder = builder.models(cli.models.iter().cloned());
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(ref key) = cli.api_key {
        builder = builder.api_key(key.clone());
    }
    if let Some(ref url) = cli.base_url {
        builder = builder.base_url(url.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// `-` reads stdin; no argument means "files only".
fn read_typed_text(text: Option<&str>) -> Result<String> {
    match text {
        Some("-") => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read text from stdin")?;
            Ok(buf)
        }
        Some(t) => Ok(t.to_string()),
        None => Ok(String::new()),
    }
}

fn needs_pdfium(cli: &Cli) -> bool {
    cli.pdf.is_some()
        || cli.files.iter().any(|f| {
            f.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
        })
}

/// Download pdfium on first use; later runs only check the cache.
fn ensure_pdf_engine(quiet: bool) -> Result<()> {
    if pdfium_auto::is_pdfium_cached() {
        return Ok(());
    }
    if quiet {
        tokio::task::block_in_place(|| pdfium_auto::ensure_pdfium_library(None))
            .context("Failed to download PDFium engine")?;
        return Ok(());
    }

    let dl_bar = ProgressBar::new(0);
    dl_bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {bytes}/{total_bytes}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS),
    );
    dl_bar.set_prefix("PDF engine");
    dl_bar.enable_steady_tick(Duration::from_millis(80));

    let bar = dl_bar.clone();
    tokio::task::block_in_place(|| {
        pdfium_auto::ensure_pdfium_library(Some(&|downloaded, total| {
            if let Some(t) = total {
                if bar.length().unwrap_or(0) != t {
                    bar.set_length(t);
                }
            }
            bar.set_position(downloaded);
        }))
    })
    .context("Failed to download PDFium engine")?;

    dl_bar.finish_with_message("ready ✓");
    Ok(())
}

fn print_content(output: &GenerationOutput) {
    let content = &output.content;
    println!("{}", bold(&content.topic));
    println!();
    println!("{}", content.explanation.trim_end());

    let steps = content.visible_steps();
    if !steps.is_empty() {
        println!();
        println!("{}", bold(&format!("{}:", content.diagram.kind)));
        for (i, step) in steps.iter().enumerate() {
            println!("  {:>2}. {}", i + 1, step);
        }
    }

    println!();
    println!("{}", bold("Resources:"));
    println!(
        "  {} {}",
        cyan("YouTube search:"),
        youtube_search_url(&content.topic)
    );
    for (slot, link) in [
        ("Website", &content.resources.website),
        ("Article", &content.resources.article),
    ] {
        if let Some(link) = link {
            println!(
                "  {} {}  {}",
                cyan(&format!("{slot}:")),
                link.display_title(),
                dim(&link.url)
            );
        }
    }
}

fn report_saved(cli: &Cli, what: &str, path: &Path) {
    if !cli.quiet {
        eprintln!("{} {} saved to {}", green("✔"), what, bold(&path.display().to_string()));
    }
}
