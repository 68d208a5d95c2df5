//! The content generator: prompt → fallback chain → extracted record.
//!
//! [`ContentGenerator::generate`] walks the configured model chain in order.
//! Each candidate gets exactly one request; a transport error or an answer
//! with no extractable JSON object moves on to the next model. The first
//! candidate whose answer parses wins and nothing after it is contacted.
//! Only exhaustion of the whole chain is reported to the caller.

use crate::config::GenerationConfig;
use crate::content::{CandidateAttempt, DiagramType, GenerationOutput, LearningContent};
use crate::error::{CandidateError, StudyError};
use crate::pipeline::fallback::{try_in_order, Exhausted, FirstSuccess};
use crate::pipeline::llm::{ChatMessage, ChatRequest, GroqClient, ModelClient, ProviderClient};
use crate::pipeline::parse::extract_object;
use crate::prompts::build_prompt;
use edgequake_llm::ProviderFactory;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Turns study input into a [`LearningContent`] record.
///
/// Cheap to clone; the backend is shared behind an `Arc`.
///
/// # Example
/// ```rust,no_run
/// use studylm::{ContentGenerator, DiagramType, GenerationConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = GenerationConfig::builder().api_key_from_env().build()?;
/// let generator = ContentGenerator::new(config)?;
/// let content = generator.generate("Newton's laws", DiagramType::Flowchart).await?;
/// println!("{}\n\n{}", content.topic, content.explanation);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ContentGenerator {
    client: Arc<dyn ModelClient>,
    config: GenerationConfig,
}

impl fmt::Debug for ContentGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentGenerator")
            .field("client", &self.client.name())
            .field("config", &self.config)
            .finish()
    }
}

/// A candidate whose answer was accepted.
struct Accepted {
    content: LearningContent,
    prompt_tokens: usize,
    completion_tokens: usize,
    duration_ms: u64,
}

/// A candidate that failed, with how long it took to fail.
struct Rejected {
    error: CandidateError,
    duration_ms: u64,
}

impl ContentGenerator {
    /// Build a generator, resolving the backend from `config`.
    ///
    /// # Errors
    /// [`StudyError::MissingCredential`] when the selected backend has no
    /// API key, and [`StudyError::ProviderNotConfigured`] when a named
    /// provider cannot be created. No request is made in either case.
    pub fn new(config: GenerationConfig) -> Result<Self, StudyError> {
        let client = resolve_client(&config)?;
        info!(
            "Content generator ready: backend '{}', {} candidate models",
            client.name(),
            config.models.len()
        );
        Ok(Self { client, config })
    }

    /// Build a generator around an explicit backend, ignoring
    /// `config.client`, `provider_name` and `api_key`.
    pub fn with_client(client: Arc<dyn ModelClient>, config: GenerationConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// Generate a learning-content record for `input`.
    ///
    /// `input` is not checked for blankness; see
    /// [`crate::pipeline::input::assemble_input`].
    ///
    /// # Errors
    /// [`StudyError::AllCandidatesExhausted`] when every model failed.
    pub async fn generate(
        &self,
        input: &str,
        diagram: DiagramType,
    ) -> Result<LearningContent, StudyError> {
        self.generate_detailed(input, diagram)
            .await
            .map(|out| out.content)
    }

    /// Like [`generate`](Self::generate) but also reports which model
    /// answered, every failed attempt, token usage and timing.
    pub async fn generate_detailed(
        &self,
        input: &str,
        diagram: DiagramType,
    ) -> Result<GenerationOutput, StudyError> {
        let total_start = Instant::now();
        let total = self.config.models.len();
        let messages = vec![ChatMessage::user(build_prompt(input, diagram))];

        info!(
            "Generating learning content: {} input chars, diagram '{}', {} candidate models",
            input.len(),
            diagram,
            total
        );
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_generation_start(total);
        }

        let this = self;
        let messages = &messages;
        let outcome = try_in_order(
            self.config.models.iter().map(str::to_string),
            move |model, index| this.try_candidate(model, index, messages, diagram),
        )
        .await;

        match outcome {
            Ok(success) => Ok(self.finish(success, total_start)),
            Err(exhausted) => Err(self.exhausted(exhausted)),
        }
    }

    /// Blocking wrapper around [`generate`](Self::generate).
    ///
    /// Creates a temporary tokio runtime internally; do not call from
    /// inside an async context.
    pub fn generate_sync(
        &self,
        input: &str,
        diagram: DiagramType,
    ) -> Result<LearningContent, StudyError> {
        tokio::runtime::Runtime::new()
            .map_err(|e| StudyError::Internal(format!("Failed to create tokio runtime: {}", e)))?
            .block_on(self.generate(input, diagram))
    }

    /// One request against one candidate, then extraction.
    async fn try_candidate(
        &self,
        model: String,
        index: usize,
        messages: &[ChatMessage],
        diagram: DiagramType,
    ) -> Result<Accepted, Rejected> {
        let start = Instant::now();
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_candidate_start(&model, index);
        }
        debug!(
            "Model {}: attempt {}/{}",
            model,
            index + 1,
            self.config.models.len()
        );

        let request = ChatRequest {
            model: model.clone(),
            messages: messages.to_vec(),
            temperature: self.config.temperature,
            max_tokens: Some(self.config.max_tokens),
        };

        let outcome = match self.client.chat(&request).await {
            Err(e) => Err(CandidateError::ServiceCallFailed {
                model: model.clone(),
                detail: e.to_string(),
            }),
            Ok(reply) => match extract_object(&reply.content, self.config.require_topic) {
                Ok(obj) => Ok((LearningContent::from_model_object(&obj, diagram), reply)),
                Err(e) => {
                    debug!(
                        "Model {}: raw response ({} chars) rejected",
                        model,
                        reply.content.len()
                    );
                    Err(CandidateError::UnparseableResponse {
                        model: model.clone(),
                        detail: e.to_string(),
                    })
                }
            },
        };
        let duration_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok((content, reply)) => {
                info!("Model {}: accepted after {}ms", model, duration_ms);
                Ok(Accepted {
                    content,
                    prompt_tokens: reply.prompt_tokens,
                    completion_tokens: reply.completion_tokens,
                    duration_ms,
                })
            }
            Err(error) => {
                warn!("Model {}: attempt failed: {}", model, error);
                if let Some(ref cb) = self.config.progress_callback {
                    cb.on_candidate_failed(&model, index, &error.to_string());
                }
                Err(Rejected { error, duration_ms })
            }
        }
    }

    fn finish(
        &self,
        success: FirstSuccess<String, Accepted, Rejected>,
        total_start: Instant,
    ) -> GenerationOutput {
        let FirstSuccess {
            candidate,
            value,
            failures,
        } = success;

        let mut attempts: Vec<CandidateAttempt> = failures
            .into_iter()
            .map(|(model, rejected)| CandidateAttempt {
                model,
                error: Some(rejected.error),
                duration_ms: rejected.duration_ms,
            })
            .collect();
        attempts.push(CandidateAttempt {
            model: candidate.clone(),
            error: None,
            duration_ms: value.duration_ms,
        });

        if let Some(ref cb) = self.config.progress_callback {
            cb.on_generation_complete(Some(&candidate), attempts.len());
        }

        GenerationOutput {
            content: value.content,
            model: candidate,
            attempts,
            input_tokens: value.prompt_tokens,
            output_tokens: value.completion_tokens,
            duration_ms: total_start.elapsed().as_millis() as u64,
        }
    }

    fn exhausted(&self, exhausted: Exhausted<String, Rejected>) -> StudyError {
        let attempts = exhausted.failures.len();
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_generation_complete(None, attempts);
        }
        match exhausted.failures.into_iter().last() {
            Some((_, rejected)) => {
                warn!("All {} models failed", attempts);
                StudyError::AllCandidatesExhausted {
                    attempts,
                    last_error: rejected.error,
                }
            }
            None => StudyError::Internal("model chain was empty".into()),
        }
    }
}

/// Environment variable names such as `OPENAI_API_KEY` inside a provider
/// factory error message.
static KEY_VARIABLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Z][A-Z0-9_]*_API_KEY\b").unwrap());

/// Resolve the backend, from most-specific to least-specific.
///
/// 1. **Pre-built client** (`config.client`) — used as-is; tests inject
///    scripted clients this way.
/// 2. **Named non-Groq provider** (`config.provider_name`) — delegated to
///    `edgequake-llm`. The provider is created once here against the
///    primary model so an unknown name or missing key fails at startup.
/// 3. **Groq** — requires `config.api_key`; absence is fatal here, before
///    any request is attempted.
fn resolve_client(config: &GenerationConfig) -> Result<Arc<dyn ModelClient>, StudyError> {
    if let Some(ref client) = config.client {
        return Ok(Arc::clone(client));
    }

    if !config.uses_groq() {
        let name = config.provider_name.as_deref().unwrap_or_default();
        ProviderFactory::create_llm_provider(name, config.models.primary())
            .map_err(|e| provider_error(name, format!("{e}")))?;
        return Ok(Arc::new(ProviderClient::new(name)));
    }

    let key = config
        .api_key
        .as_deref()
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| StudyError::MissingCredential {
            provider: "Groq".into(),
            variable: crate::config::API_KEY_ENV.into(),
        })?;

    let mut client = GroqClient::new(key, config.request_timeout_secs)?;
    if let Some(ref url) = config.base_url {
        client = client.with_base_url(url.as_str());
    }
    Ok(Arc::new(client))
}

/// Classify a provider factory failure.
fn provider_error(provider: &str, detail: String) -> StudyError {
    match KEY_VARIABLE_RE.find(&detail) {
        Some(var) => StudyError::MissingCredential {
            provider: provider.to_string(),
            variable: var.as_str().to_string(),
        },
        None => StudyError::ProviderNotConfigured {
            provider: provider.to_string(),
            hint: detail,
        },
    }
}
