//! Ordered fallback: try each candidate in turn, stop at the first success.
//!
//! Nothing here knows about models or JSON. [`try_in_order`] is a plain
//! combinator over an ordered list of opaque identifiers, so the provider
//! binding and the extraction rules can change without touching the loop.
//! Attempts are strictly sequential; the next candidate is not contacted
//! until the previous one has failed.

use crate::error::StudyError;
use serde::{Deserialize, Serialize};
use std::future::Future;

/// Default chain, most capable first.
pub const DEFAULT_MODELS: [&str; 4] = [
    "llama-3.3-70b-specdec",
    "llama-3.3-70b-versatile",
    "llama-3.2-3b-preview",
    "llama-3.2-1b-preview",
];

/// An ordered, non-empty list of candidate model identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>")]
pub struct ModelChain(Vec<String>);

impl ModelChain {
    /// Build a chain, dropping blank and duplicate identifiers while keeping
    /// first-seen order.
    pub fn new<I, S>(models: I) -> Result<Self, StudyError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out: Vec<String> = Vec::new();
        for m in models {
            let m = m.into().trim().to_string();
            if !m.is_empty() && !out.contains(&m) {
                out.push(m);
            }
        }
        if out.is_empty() {
            return Err(StudyError::InvalidConfig(
                "the model fallback chain must name at least one model".into(),
            ));
        }
        Ok(Self(out))
    }

    /// Parse a comma-separated list such as `"a, b,c"`.
    pub fn parse_list(s: &str) -> Result<Self, StudyError> {
        Self::new(s.split(','))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Never true for a constructed or deserialized chain.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// The first (preferred) candidate.
    pub fn primary(&self) -> &str {
        &self.0[0]
    }
}

impl TryFrom<Vec<String>> for ModelChain {
    type Error = StudyError;

    fn try_from(models: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(models)
    }
}

impl Default for ModelChain {
    fn default() -> Self {
        Self(DEFAULT_MODELS.iter().map(|m| m.to_string()).collect())
    }
}

/// Successful outcome of [`try_in_order`].
#[derive(Debug)]
pub struct FirstSuccess<C, T, E> {
    /// The candidate that succeeded.
    pub candidate: C,
    pub value: T,
    /// Failures of the candidates tried before it, in order.
    pub failures: Vec<(C, E)>,
}

/// Every candidate failed.
#[derive(Debug)]
pub struct Exhausted<C, E> {
    /// One entry per candidate, in order. Empty only if the input was empty.
    pub failures: Vec<(C, E)>,
}

impl<C, E> Exhausted<C, E> {
    /// The error of the last candidate tried.
    pub fn last_error(&self) -> Option<&E> {
        self.failures.last().map(|(_, e)| e)
    }
}

/// Run `attempt` for each candidate in order and return the first `Ok`.
///
/// Errors are collected, never propagated early. The closure receives the
/// candidate by value and its zero-based position in the chain.
pub async fn try_in_order<C, T, E, I, F, Fut>(
    candidates: I,
    mut attempt: F,
) -> Result<FirstSuccess<C, T, E>, Exhausted<C, E>>
where
    I: IntoIterator<Item = C>,
    C: Clone,
    F: FnMut(C, usize) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut failures = Vec::new();
    for (idx, candidate) in candidates.into_iter().enumerate() {
        match attempt(candidate.clone(), idx).await {
            Ok(value) => {
                return Ok(FirstSuccess {
                    candidate,
                    value,
                    failures,
                })
            }
            Err(e) => failures.push((candidate, e)),
        }
    }
    Err(Exhausted { failures })
}
