//! Configuration for learning-content generation.
//!
//! The model fallback chain, backend, credential and sampling settings live
//! in [`GenerationConfig`], built via [`GenerationConfigBuilder`]. The
//! credential is an explicit value; only [`GenerationConfigBuilder::api_key_from_env`]
//! reads the environment.

use crate::error::StudyError;
use crate::pipeline::fallback::ModelChain;
use crate::pipeline::llm::ModelClient;
use crate::progress::{GenerationProgressCallback, ProgressCallback};
use std::fmt;
use std::sync::Arc;

/// Environment variable holding the Groq credential.
pub const API_KEY_ENV: &str = "GROQ_API_KEY";

/// Provider name that selects the built-in Groq client.
pub const DEFAULT_PROVIDER: &str = "groq";

/// Configuration for a [`crate::generate::ContentGenerator`].
///
/// # Example
/// ```rust
/// use studylm::GenerationConfig;
///
/// let config = GenerationConfig::builder()
///     .api_key("gsk_example")
///     .models(["llama-3.3-70b-versatile", "llama-3.1-8b-instant"])
///     .temperature(0.6)
///     .build()
///     .unwrap();
/// assert_eq!(config.models.len(), 2);
/// ```
#[derive(Clone)]
pub struct GenerationConfig {
    /// Ordered candidate models, most capable first.
    pub models: ModelChain,

    /// Backend name. `None` or `"groq"` selects [`crate::pipeline::llm::GroqClient`];
    /// anything else goes through `edgequake-llm`'s provider factory.
    pub provider_name: Option<String>,

    /// Pre-constructed backend. Takes precedence over `provider_name`.
    pub client: Option<Arc<dyn ModelClient>>,

    /// Credential for the Groq backend.
    pub api_key: Option<String>,

    /// Override for the Groq base URL (any OpenAI-compatible endpoint).
    pub base_url: Option<String>,

    /// Sampling temperature. Default: 0.6.
    pub temperature: f32,

    /// Maximum tokens per completion. Default: 2048.
    pub max_tokens: usize,

    /// Per-request HTTP timeout in seconds. Default: 60.
    pub request_timeout_secs: u64,

    /// Reject extracted objects that have no `topic` key. Default: false.
    pub require_topic: bool,

    /// Observer for fallback-chain events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            models: ModelChain::default(),
            provider_name: None,
            client: None,
            api_key: None,
            base_url: None,
            temperature: 0.6,
            max_tokens: 2048,
            request_timeout_secs: 60,
            require_topic: false,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for GenerationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationConfig")
            .field("models", &self.models)
            .field("provider_name", &self.provider_name)
            .field("client", &self.client.as_ref().map(|c| c.name().to_string()))
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("require_topic", &self.require_topic)
            .finish()
    }
}

impl GenerationConfig {
    /// Create a new builder for `GenerationConfig`.
    pub fn builder() -> GenerationConfigBuilder {
        GenerationConfigBuilder {
            config: Self::default(),
            models: None,
        }
    }

    /// `true` when requests go to the built-in Groq client.
    pub fn uses_groq(&self) -> bool {
        self.client.is_none()
            && self
                .provider_name
                .as_deref()
                .map_or(true, |p| p.eq_ignore_ascii_case(DEFAULT_PROVIDER))
    }
}

/// Builder for [`GenerationConfig`].
pub struct GenerationConfigBuilder {
    config: GenerationConfig,
    models: Option<Vec<String>>,
}

impl GenerationConfigBuilder {
    /// Replace the fallback chain. Blank and duplicate names are dropped.
    pub fn models<I, S>(mut self, models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.models = Some(models.into_iter().map(Into::into).collect());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn client(mut self, client: Arc<dyn ModelClient>) -> Self {
        self.config.client = Some(client);
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    /// Read the credential from [`API_KEY_ENV`] if it is set and non-empty.
    pub fn api_key_from_env(mut self) -> Self {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                self.config.api_key = Some(key);
            }
        }
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = Some(url.into());
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    pub fn require_topic(mut self, v: bool) -> Self {
        self.config.require_topic = v;
        self
    }

    pub fn progress_callback(mut self, cb: Arc<dyn GenerationProgressCallback>) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    ///
    /// A missing credential is *not* an error here; it is reported when the
    /// generator is constructed, before any request is made.
    pub fn build(mut self) -> Result<GenerationConfig, StudyError> {
        if let Some(models) = self.models.take() {
            self.config.models = ModelChain::new(models)?;
        }
        let c = &self.config;
        if c.max_tokens == 0 {
            return Err(StudyError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        if c.request_timeout_secs == 0 {
            return Err(StudyError::InvalidConfig(
                "request timeout must be ≥ 1 second".into(),
            ));
        }
        if let Some(ref url) = c.base_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(StudyError::InvalidConfig(format!(
                    "base URL must be http(s), got '{url}'"
                )));
            }
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = GenerationConfig::default();
        assert!((c.temperature - 0.6).abs() < f32::EPSILON);
        assert_eq!(c.max_tokens, 2048);
        assert_eq!(c.models.primary(), "llama-3.3-70b-specdec");
        assert!(!c.require_topic);
        assert!(c.uses_groq());
    }

    #[test]
    fn temperature_is_clamped() {
        let c = GenerationConfig::builder().temperature(7.0).build().unwrap();
        assert!((c.temperature - 2.0).abs() < f32::EPSILON);
    }

    #[test]
    fn empty_model_list_is_invalid() {
        let err = GenerationConfig::builder()
            .models(Vec::<String>::new())
            .build()
            .unwrap_err();
        assert!(matches!(err, StudyError::InvalidConfig(_)));
    }

    #[test]
    fn zero_timeout_is_invalid() {
        assert!(GenerationConfig::builder()
            .request_timeout_secs(0)
            .build()
            .is_err());
    }

    #[test]
    fn bad_base_url_is_invalid() {
        assert!(GenerationConfig::builder()
            .base_url("ftp://example.org")
            .build()
            .is_err());
    }

    #[test]
    fn other_provider_is_not_groq() {
        let c = GenerationConfig::builder()
            .provider_name("openai")
            .build()
            .unwrap();
        assert!(!c.uses_groq());
        let c = GenerationConfig::builder()
            .provider_name("Groq")
            .build()
            .unwrap();
        assert!(c.uses_groq());
    }

    #[test]
    fn debug_redacts_api_key() {
        let c = GenerationConfig::builder()
            .api_key("gsk_topsecret")
            .build()
            .unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("gsk_topsecret"));
        assert!(dbg.contains("REDACTED"));
    }
}
