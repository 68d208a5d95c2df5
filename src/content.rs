//! The structured learning-content record and generation report types.
//!
//! [`LearningContent`] is what callers render and export. It is built fresh
//! for every request from whatever JSON object the model produced, so every
//! accessor here is forgiving: a missing `topic` becomes `""`, a resource
//! slot without a url disappears, non-string diagram steps are stringified.
//! Shape validation is deliberately absent; the only hard requirement on the
//! model's output is that it parses as a JSON object.

use crate::error::CandidateError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Which kind of step-based visual explanation (if any) was requested.
///
/// The wire labels are the ones the prompt shows the model and the ones
/// echoed back in [`Diagram::kind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DiagramType {
    /// No diagram requested.
    #[default]
    #[serde(rename = "None")]
    None,
    #[serde(rename = "Flowchart")]
    Flowchart,
    #[serde(rename = "Tree Diagram")]
    TreeDiagram,
    #[serde(rename = "Process Diagram")]
    ProcessDiagram,
}

impl DiagramType {
    /// All variants, in the order a picker would list them.
    pub const ALL: [DiagramType; 4] = [
        DiagramType::None,
        DiagramType::Flowchart,
        DiagramType::TreeDiagram,
        DiagramType::ProcessDiagram,
    ];

    /// Label used in the prompt and in the output record.
    pub fn label(self) -> &'static str {
        match self {
            DiagramType::None => "None",
            DiagramType::Flowchart => "Flowchart",
            DiagramType::TreeDiagram => "Tree Diagram",
            DiagramType::ProcessDiagram => "Process Diagram",
        }
    }

    /// `true` unless the caller asked for no diagram.
    pub fn is_requested(self) -> bool {
        self != DiagramType::None
    }
}

impl fmt::Display for DiagramType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Returned when a string names no known diagram type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown diagram type '{0}': expected None, Flowchart, Tree Diagram or Process Diagram")]
pub struct ParseDiagramTypeError(pub String);

impl FromStr for DiagramType {
    type Err = ParseDiagramTypeError;

    /// Accepts the wire labels case-insensitively plus the short CLI forms
    /// `tree` and `process`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
            .collect();
        match key.as_str() {
            "none" | "" => Ok(DiagramType::None),
            "flowchart" => Ok(DiagramType::Flowchart),
            "tree" | "treediagram" => Ok(DiagramType::TreeDiagram),
            "process" | "processdiagram" => Ok(DiagramType::ProcessDiagram),
            _ => Err(ParseDiagramTypeError(s.to_string())),
        }
    }
}

/// One recommended resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLink {
    pub title: String,
    pub url: String,
}

impl ResourceLink {
    /// Build a link from a model-produced object; `None` unless `url` is a
    /// non-empty string.
    fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let url = obj.get("url").map(lenient_string).unwrap_or_default();
        let url = url.trim().to_string();
        if url.is_empty() {
            return None;
        }
        let title = obj.get("title").map(lenient_string).unwrap_or_default();
        Some(Self { title, url })
    }

    /// Title for display, falling back to the url when the model left it blank.
    pub fn display_title(&self) -> &str {
        if self.title.trim().is_empty() {
            &self.url
        } else {
            &self.title
        }
    }
}

/// The three fixed resource slots. Absent slots are omitted on output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resources {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub youtube: Option<ResourceLink>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<ResourceLink>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub article: Option<ResourceLink>,
}

impl Resources {
    fn from_value(value: Option<&Value>) -> Self {
        let Some(obj) = value.and_then(Value::as_object) else {
            return Self::default();
        };
        let slot = |key: &str| obj.get(key).and_then(ResourceLink::from_value);
        Self {
            youtube: slot("youtube"),
            website: slot("website"),
            article: slot("article"),
        }
    }

    /// `true` when no slot carries a link.
    pub fn is_empty(&self) -> bool {
        self.youtube.is_none() && self.website.is_none() && self.article.is_none()
    }

    /// Present slots as `(slot name, link)` pairs in fixed order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &ResourceLink)> {
        [
            ("youtube", self.youtube.as_ref()),
            ("website", self.website.as_ref()),
            ("article", self.article.as_ref()),
        ]
        .into_iter()
        .filter_map(|(name, link)| link.map(|l| (name, l)))
    }
}

/// Step-based diagram description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagram {
    /// Always the caller's hint, never the model's claim.
    #[serde(rename = "type", default)]
    pub kind: DiagramType,
    #[serde(default)]
    pub steps: Vec<String>,
}

/// The structured learning-content record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearningContent {
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub resources: Resources,
    #[serde(default)]
    pub diagram: Diagram,
}

impl LearningContent {
    /// Build the record from the JSON object a model produced.
    ///
    /// `diagram.type` is overwritten with `hint`; everything else is taken
    /// as-is with lenient coercion of missing or mistyped fields.
    pub fn from_model_object(obj: &Map<String, Value>, hint: DiagramType) -> Self {
        let steps = obj
            .get("diagram")
            .and_then(|d| d.get("steps"))
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .map(lenient_string)
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Self {
            topic: obj
                .get("topic")
                .map(lenient_string)
                .unwrap_or_default()
                .trim()
                .to_string(),
            explanation: obj.get("explanation").map(lenient_string).unwrap_or_default(),
            resources: Resources::from_value(obj.get("resources")),
            diagram: Diagram { kind: hint, steps },
        }
    }

    /// Word count of the explanation (the prompt targets 200–300).
    pub fn explanation_words(&self) -> usize {
        self.explanation.split_whitespace().count()
    }

    /// Diagram steps worth rendering: empty when no diagram was requested.
    pub fn visible_steps(&self) -> &[String] {
        if self.diagram.kind.is_requested() {
            &self.diagram.steps
        } else {
            &[]
        }
    }
}

/// `Null` → `""`, strings verbatim, anything else in its JSON text form.
fn lenient_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ── Generation report ────────────────────────────────────────────────────

/// What happened to one candidate model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateAttempt {
    /// Model identifier.
    pub model: String,
    /// `None` on success.
    pub error: Option<CandidateError>,
    /// Wall-clock time for the request and extraction.
    pub duration_ms: u64,
}

/// Full result of a generation request: the record plus how it was obtained.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationOutput {
    pub content: LearningContent,
    /// The model whose answer was accepted.
    pub model: String,
    /// Every attempt in chain order, the successful one last.
    pub attempts: Vec<CandidateAttempt>,
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub duration_ms: u64,
}
