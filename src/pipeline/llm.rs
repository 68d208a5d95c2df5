//! Chat-completion clients: one request, one model, one reply.
//!
//! [`ModelClient`] is the seam between the fallback loop and the outside
//! world. Prompt wording lives in [`crate::prompts`] and JSON handling in
//! [`crate::pipeline::parse`]; a client only moves text.
//!
//! Two implementations ship:
//!
//! * [`GroqClient`] — OpenAI-compatible `/chat/completions` over HTTPS with an
//!   explicit bearer credential. The default service.
//! * [`ProviderClient`] — any provider `edgequake-llm`'s `ProviderFactory`
//!   knows (openai, anthropic, gemini, ollama, …), credentials read by the
//!   factory from its usual environment variables.

use crate::error::{ClientError, StudyError};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage as LlmMessage, CompletionOptions, ProviderFactory};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// Speaker of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// A role-tagged chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// A system message. Generation sends a single user turn; library
    /// callers driving a [`ModelClient`] directly may prepend one of these.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// One chat request against one model.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: Option<usize>,
}

/// The generated text and token accounting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatReply {
    pub content: String,
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
}

/// A chat-completion backend.
///
/// Implementations must be `Send + Sync` so a single client can be shared
/// behind an `Arc` by every generator built from the same config.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Short backend name for logs ("groq", "openai", …).
    fn name(&self) -> &str;

    /// Issue exactly one request; no retries.
    async fn chat(&self, request: &ChatRequest) -> Result<ChatReply, ClientError>;
}

// ── Groq ─────────────────────────────────────────────────────────────────

/// HTTP client for Groq's OpenAI-compatible chat-completions API.
#[derive(Clone)]
pub struct GroqClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    timeout_secs: u64,
}

impl GroqClient {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.groq.com/openai/v1";

    /// Create a client with the given credential and per-request timeout.
    pub fn new(api_key: impl Into<String>, timeout_secs: u64) -> Result<Self, StudyError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(StudyError::MissingCredential {
                provider: "Groq".into(),
                variable: "GROQ_API_KEY".into(),
            });
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| StudyError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self {
            http,
            api_key,
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            timeout_secs,
        })
    }

    /// Point the client at another OpenAI-compatible endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl fmt::Debug for GroqClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroqClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: usize,
    #[serde(default)]
    completion_tokens: usize,
}

#[async_trait]
impl ModelClient for GroqClient {
    fn name(&self) -> &str {
        "groq"
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatReply, ClientError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = CompletionBody {
            model: &request.model,
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ClientError::Timeout {
                        secs: self.timeout_secs,
                    }
                } else {
                    ClientError::Http(e.to_string())
                }
            })?;

        let status = response.status();
        let retry_after = retry_after_secs(response.headers());
        let text = response
            .text()
            .await
            .map_err(|e| ClientError::Http(e.to_string()))?;

        if !status.is_success() {
            return Err(status_error(status, text, retry_after));
        }

        let reply = parse_completion(&text)?;
        debug!(
            "{}: {} prompt tokens, {} completion tokens",
            request.model, reply.prompt_tokens, reply.completion_tokens
        );
        Ok(reply)
    }
}

/// Map a non-success status to the matching [`ClientError`].
fn status_error(status: StatusCode, body: String, retry_after: Option<u64>) -> ClientError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ClientError::Auth(body),
        StatusCode::TOO_MANY_REQUESTS => ClientError::RateLimited {
            retry_after_secs: retry_after,
        },
        _ => ClientError::Status {
            status: status.as_u16(),
            body,
        },
    }
}

fn retry_after_secs(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

/// Pull the first choice's text out of a chat-completion body.
fn parse_completion(body: &str) -> Result<ChatReply, ClientError> {
    let parsed: CompletionResponse = serde_json::from_str(body)
        .map_err(|e| ClientError::InvalidResponse(format!("{e}\nBody: {body}")))?;
    let content = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| ClientError::InvalidResponse("response has no message content".into()))?;
    let (prompt_tokens, completion_tokens) = parsed
        .usage
        .map_or((0, 0), |u| (u.prompt_tokens, u.completion_tokens));
    Ok(ChatReply {
        content,
        prompt_tokens,
        completion_tokens,
    })
}

// ── edgequake-llm providers ──────────────────────────────────────────────

/// Adapter over `edgequake_llm::ProviderFactory` for a named provider.
///
/// A provider instance is created per request because the factory binds the
/// model at construction time and each fallback candidate is a different
/// model.
#[derive(Debug, Clone)]
pub struct ProviderClient {
    provider_name: String,
}

impl ProviderClient {
    pub fn new(provider_name: impl Into<String>) -> Self {
        Self {
            provider_name: provider_name.into(),
        }
    }
}

#[async_trait]
impl ModelClient for ProviderClient {
    fn name(&self) -> &str {
        &self.provider_name
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatReply, ClientError> {
        let provider = ProviderFactory::create_llm_provider(&self.provider_name, &request.model)
            .map_err(|e| ClientError::Provider(format!("{e}")))?;

        let messages: Vec<LlmMessage> = request
            .messages
            .iter()
            .map(|m| match m.role {
                Role::System => LlmMessage::system(m.content.as_str()),
                Role::User => LlmMessage::user(m.content.as_str()),
            })
            .collect();

        let options = CompletionOptions {
            temperature: Some(request.temperature),
            max_tokens: request.max_tokens,
            ..Default::default()
        };

        let response = provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| ClientError::Provider(format!("{e}")))?;

        Ok(ChatReply {
            content: response.content,
            prompt_tokens: response.prompt_tokens as usize,
            completion_tokens: response.completion_tokens as usize,
        })
    }
}
