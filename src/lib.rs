//! # studylm
//!
//! Turn a question, a topic, lecture notes or an uploaded document into a
//! structured study record: a topic title, a 200–300 word explanation,
//! recommended resources and, on request, the steps of a diagram.
//!
//! ## Pipeline Overview
//!
//! ```text
//! typed text + .pdf/.docx/.txt
//!  │
//!  ├─ 1. Input     extract file text, reject blank input
//!  ├─ 2. Prompt    teaching instructions + JSON output contract
//!  ├─ 3. Models    ordered fallback chain, one request per model
//!  ├─ 4. Extract   strict JSON parse, else first '{' .. last '}'
//!  └─ 5. Export    terminal / JSON / Markdown / PDF notes / MP3
//! ```
//!
//! A model that errors or answers without an extractable JSON object is
//! skipped; the first one that yields an object wins. Callers only see an
//! error when every model in the chain failed.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use studylm::{ContentGenerator, DiagramType, GenerationConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Reads GROQ_API_KEY
//!     let config = GenerationConfig::builder().api_key_from_env().build()?;
//!     let generator = ContentGenerator::new(config)?;
//!     let output = generator
//!         .generate_detailed("Newton's laws of motion", DiagramType::Flowchart)
//!         .await?;
//!     println!("{}\n\n{}", output.content.topic, output.content.explanation);
//!     for step in output.content.visible_steps() {
//!         println!("  → {step}");
//!     }
//!     eprintln!("answered by {} after {} attempts", output.model, output.attempts.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `studylm` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! studylm = { version = "0.1", default-features = false }
//! ```
//!
//! ## Default Model Chain
//!
//! | Order | Model | Notes |
//! |-------|-------|-------|
//! | 1 | `llama-3.3-70b-specdec` | Speculative decoding, fastest 70B |
//! | 2 | `llama-3.3-70b-versatile` | Same weights, general serving |
//! | 3 | `llama-3.2-3b-preview` | Small fallback |
//! | 4 | `llama-3.2-1b-preview` | Last resort |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod content;
pub mod error;
pub mod export;
pub mod generate;
pub mod pipeline;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{GenerationConfig, GenerationConfigBuilder, API_KEY_ENV};
pub use content::{
    CandidateAttempt, Diagram, DiagramType, GenerationOutput, LearningContent, ResourceLink,
    Resources,
};
pub use error::{CandidateError, ClientError, StudyError};
pub use export::notes::NotesDocument;
pub use export::speech::{GoogleTranslateTts, SpeechSynthesizer};
pub use export::youtube_search_url;
pub use generate::ContentGenerator;
pub use pipeline::fallback::ModelChain;
pub use pipeline::input::{assemble_input, collect_input, SourceDocument};
pub use pipeline::llm::{ChatMessage, ChatReply, ChatRequest, GroqClient, ModelClient, ProviderClient};
pub use progress::{GenerationProgressCallback, NoopProgressCallback, ProgressCallback};
