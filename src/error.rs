//! Error types for the studylm library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`StudyError`] — **Fatal**: the request cannot be completed at all
//!   (no usable input, credential missing, every model in the fallback chain
//!   failed). Returned as `Err(StudyError)` from the public entry points.
//!
//! * [`CandidateError`] — **Non-fatal**: one model in the fallback chain
//!   failed (network hiccup, quota, prose instead of JSON) but the next
//!   candidate may still succeed. Recorded in
//!   [`crate::content::CandidateAttempt`] and logged, never surfaced on its own.
//!
//! Only the last `CandidateError` escapes, as the diagnostic payload of
//! [`StudyError::AllCandidatesExhausted`].

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the studylm library.
#[derive(Debug, Error)]
pub enum StudyError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Typed text and uploaded files together produced only whitespace.
    #[error("Nothing to study: enter some text or pass at least one non-empty file.")]
    NoInput,

    /// An input file was not found at the given path.
    #[error("Input file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// The file extension is not one of the supported upload formats.
    #[error("Unsupported file '{path}': expected a .pdf, .docx or .txt file")]
    UnsupportedFile { path: PathBuf },

    /// The file was found but its text could not be read.
    #[error("Failed to extract text from '{path}': {detail}")]
    ExtractionFailed { path: PathBuf, detail: String },

    // ── Generation errors ─────────────────────────────────────────────────
    /// The credential for the configured service is absent.
    #[error("{provider} API key not found.\nSet {variable} in the environment or pass --api-key.")]
    MissingCredential { provider: String, variable: String },

    /// The configured provider could not be constructed.
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// Every model in the fallback chain failed.
    #[error("All {attempts} models failed. Last error: {last_error}")]
    AllCandidatesExhausted {
        attempts: usize,
        last_error: CandidateError,
    },

    // ── Export errors ─────────────────────────────────────────────────────
    /// Speech synthesis or notes rendering failed.
    #[error("{format} export failed: {detail}")]
    ExportFailed { format: &'static str, detail: String },

    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single model in the fallback chain.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum CandidateError {
    /// The request itself failed: transport, auth, rate limit or a
    /// service-side error.
    #[error("model '{model}': service call failed: {detail}")]
    ServiceCallFailed { model: String, detail: String },

    /// The model answered but no JSON object could be extracted.
    #[error("model '{model}': unparseable response: {detail}")]
    UnparseableResponse { model: String, detail: String },
}

impl CandidateError {
    /// The model identifier this failure belongs to.
    pub fn model(&self) -> &str {
        match self {
            CandidateError::ServiceCallFailed { model, .. }
            | CandidateError::UnparseableResponse { model, .. } => model,
        }
    }
}

/// Transport-level failure reported by a [`crate::pipeline::llm::ModelClient`].
///
/// Folded into [`CandidateError::ServiceCallFailed`] by the generator; kept
/// separate so client implementations can be tested on their own.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// Connection, TLS or body-read failure.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The request did not complete within the configured timeout.
    #[error("request timed out after {secs}s")]
    Timeout { secs: u64 },

    /// 401/403 from the service.
    #[error("authentication rejected: {0}")]
    Auth(String),

    /// 429 from the service.
    #[error("rate limit exceeded")]
    RateLimited { retry_after_secs: Option<u64> },

    /// Any other non-success status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The body was not the expected chat-completion shape.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Error surfaced by an `edgequake-llm` provider.
    #[error("provider error: {0}")]
    Provider(String),
}
