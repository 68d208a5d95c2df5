//! Input assembly: typed text plus uploaded documents → one prompt input.
//!
//! The generator itself accepts any string; this module is where blank
//! input is rejected. Typed text comes first, trimmed; if any document
//! produced text, a blank line separates it from the concatenated document
//! text.

use crate::error::StudyError;
use crate::pipeline::extract::extract_text;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// The text extracted from one uploaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    pub path: PathBuf,
    pub text: String,
}

impl SourceDocument {
    pub fn new(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
        }
    }

    /// `true` when extraction produced nothing but whitespace
    /// (e.g. a scanned PDF without a text layer).
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Extract every file in order. The first failure aborts.
pub async fn load_documents<P: AsRef<Path>>(
    paths: &[P],
) -> Result<Vec<SourceDocument>, StudyError> {
    let mut documents = Vec::with_capacity(paths.len());
    for path in paths {
        let path = path.as_ref();
        let text = extract_text(path).await?;
        documents.push(SourceDocument::new(path, normalise_text(&text)));
    }
    Ok(documents)
}

/// Combine typed text and extracted documents.
///
/// # Errors
/// [`StudyError::NoInput`] when the combined result is whitespace only.
pub fn assemble_input(typed: &str, documents: &[SourceDocument]) -> Result<String, StudyError> {
    let file_text: String = documents.iter().map(|d| d.text.as_str()).collect();

    let mut input = typed.trim().to_string();
    if !file_text.is_empty() {
        input.push_str("\n\n");
        input.push_str(&file_text);
    }

    if input.trim().is_empty() {
        return Err(StudyError::NoInput);
    }

    debug!(
        "Assembled input: {} typed chars, {} documents, {} chars total",
        typed.trim().len(),
        documents.len(),
        input.len()
    );
    Ok(input)
}

/// Load `paths` and assemble them with `typed` in one step.
pub async fn collect_input<P: AsRef<Path>>(typed: &str, paths: &[P]) -> Result<String, StudyError> {
    let documents = load_documents(paths).await?;
    let blank = documents.iter().filter(|d| d.is_blank()).count();
    if blank > 0 {
        info!("{} of {} documents contained no text", blank, documents.len());
    }
    assemble_input(typed, &documents)
}

static RE_EXCESS_BLANK_LINES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n[ \t]*\n(?:[ \t]*\n)+").unwrap());

/// CRLF/CR → LF and runs of blank lines collapsed to one.
///
/// PDF text layers in particular are full of carriage returns and empty
/// lines from page furniture.
pub fn normalise_text(input: &str) -> String {
    let unified = input.replace("\r\n", "\n").replace('\r', "\n");
    RE_EXCESS_BLANK_LINES
        .replace_all(&unified, "\n\n")
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn typed_text_is_trimmed() {
        let input = assemble_input("  photosynthesis \n", &[]).unwrap();
        assert_eq!(input, "photosynthesis");
    }

    #[test]
    fn documents_follow_a_blank_line() {
        let docs = vec![
            SourceDocument::new("a.txt", "first\n"),
            SourceDocument::new("b.txt", "second\n"),
        ];
        let input = assemble_input("Summarise:", &docs).unwrap();
        assert_eq!(input, "Summarise:\n\nfirst\nsecond\n");
    }

    #[test]
    fn whitespace_only_is_no_input() {
        assert!(matches!(
            assemble_input(" \t\n", &[]),
            Err(StudyError::NoInput)
        ));
        let docs = vec![SourceDocument::new("scan.pdf", "\n\n")];
        assert!(matches!(
            assemble_input("", &docs),
            Err(StudyError::NoInput)
        ));
    }

    #[test]
    fn file_only_input_is_accepted() {
        let docs = vec![SourceDocument::new("notes.txt", "Mitosis\n")];
        let input = assemble_input("", &docs).unwrap();
        assert_eq!(input, "\n\nMitosis\n");
    }

    #[test]
    fn normalise_collapses_blank_runs() {
        assert_eq!(normalise_text("a\r\nb\r\n\r\n\r\n\r\nc"), "a\nb\n\nc");
        assert_eq!(normalise_text("a\n  \n\t\n\nb"), "a\n\nb");
        assert_eq!(normalise_text("a\n\nb"), "a\n\nb");
    }

    #[tokio::test]
    async fn collect_reads_text_files_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("one.txt");
        let second = dir.path().join("two.TXT");
        std::fs::File::create(&first)
            .unwrap()
            .write_all(b"alpha")
            .unwrap();
        std::fs::File::create(&second)
            .unwrap()
            .write_all(b"beta\r\n")
            .unwrap();

        let input = collect_input("Topic", &[&first, &second]).await.unwrap();
        assert_eq!(input, "Topic\n\nalpha\nbeta\n\n");
    }

    #[tokio::test]
    async fn unsupported_file_aborts_collection() {
        let dir = tempfile::tempdir().unwrap();
        let slides = dir.path().join("deck.pptx");
        std::fs::write(&slides, b"PK").unwrap();
        let err = collect_input("x", &[slides]).await.unwrap_err();
        assert!(matches!(err, StudyError::UnsupportedFile { .. }));
    }
}
