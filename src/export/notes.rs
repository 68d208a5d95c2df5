//! Printable study notes built from a [`LearningContent`] record.
//!
//! The notes are modelled once as a list of styled lines and rendered two
//! ways: Markdown (plain text, no dependencies) and an A4 PDF drawn with
//! pdfium's built-in Helvetica faces.

use super::{write_atomic, youtube_search_url};
use crate::content::LearningContent;
use crate::error::StudyError;
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::{debug, info};

/// Explanation lines are wrapped to this many characters.
pub const WRAP_WIDTH: usize = 90;

const RESOURCES_HEADING: &str = "Best Resources:";

/// A4 in PostScript points.
const PAGE_HEIGHT: f32 = 842.0;
const MARGIN_LEFT: f32 = 50.0;
const TOP_Y: f32 = PAGE_HEIGHT - 42.0;
const BOTTOM_Y: f32 = 50.0;

/// One line of the notes and how it is typeset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotesLine {
    Title(String),
    Heading(String),
    Body(String),
    Blank,
}

impl NotesLine {
    fn font_size(&self) -> f32 {
        match self {
            NotesLine::Title(_) => 16.0,
            NotesLine::Heading(_) => 12.0,
            NotesLine::Body(_) | NotesLine::Blank => 11.0,
        }
    }

    /// Vertical advance after this line.
    fn advance(&self) -> f32 {
        match self {
            NotesLine::Title(_) => 30.0,
            NotesLine::Heading(_) => 20.0,
            NotesLine::Body(_) | NotesLine::Blank => 15.0,
        }
    }

    fn text(&self) -> Option<&str> {
        match self {
            NotesLine::Title(t) | NotesLine::Heading(t) | NotesLine::Body(t) => Some(t),
            NotesLine::Blank => None,
        }
    }
}

/// A line placed on a page at baseline `y`.
#[derive(Debug, Clone, PartialEq)]
struct Placed<'a> {
    y: f32,
    line: &'a NotesLine,
}

/// Study notes ready to be written out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotesDocument {
    lines: Vec<NotesLine>,
}

impl NotesDocument {
    /// Title, wrapped explanation, then the resources section.
    ///
    /// Blank lines in the explanation disappear in wrapping; the resources
    /// section always carries the YouTube search link and lists the website
    /// and article slots that have a link.
    pub fn from_content(content: &LearningContent) -> Self {
        let mut lines = vec![NotesLine::Title(content.topic.clone()), NotesLine::Blank];

        for source_line in content.explanation.lines() {
            lines.extend(
                wrap_line(source_line, WRAP_WIDTH)
                    .into_iter()
                    .map(NotesLine::Body),
            );
        }

        lines.push(NotesLine::Blank);
        lines.push(NotesLine::Heading(RESOURCES_HEADING.into()));
        lines.push(NotesLine::Body(format!(
            "- YouTube search: {}",
            youtube_search_url(&content.topic)
        )));
        for link in [&content.resources.website, &content.resources.article]
            .into_iter()
            .flatten()
        {
            lines.push(NotesLine::Body(format!("- {}", link.display_title())));
        }

        Self { lines }
    }

    pub fn lines(&self) -> &[NotesLine] {
        &self.lines
    }

    /// Markdown rendering: `#` title, `##` headings, body lines verbatim.
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            match line {
                NotesLine::Title(t) => {
                    out.push_str("# ");
                    out.push_str(t);
                }
                NotesLine::Heading(t) => {
                    out.push_str("## ");
                    out.push_str(t);
                }
                NotesLine::Body(t) => out.push_str(t),
                NotesLine::Blank => {}
            }
            out.push('\n');
        }
        out
    }

    pub async fn write_markdown(&self, path: &Path) -> Result<(), StudyError> {
        write_atomic(path, self.to_markdown().as_bytes()).await?;
        info!("Notes written to {}", path.display());
        Ok(())
    }

    /// Render to PDF and write atomically.
    pub async fn write_pdf(&self, path: &Path) -> Result<(), StudyError> {
        let doc = self.clone();
        let bytes = tokio::task::spawn_blocking(move || doc.render_pdf())
            .await
            .map_err(|e| StudyError::Internal(format!("PDF render task panicked: {}", e)))??;
        write_atomic(path, &bytes).await?;
        info!("PDF notes written to {} ({} bytes)", path.display(), bytes.len());
        Ok(())
    }

    /// Split the lines into pages, top to bottom.
    fn paginate(&self) -> Vec<Vec<Placed<'_>>> {
        let mut pages = Vec::new();
        let mut page = Vec::new();
        let mut y = TOP_Y;
        for line in &self.lines {
            if y < BOTTOM_Y {
                pages.push(std::mem::take(&mut page));
                y = TOP_Y;
            }
            page.push(Placed { y, line });
            y -= line.advance();
        }
        if !page.is_empty() || pages.is_empty() {
            pages.push(page);
        }
        pages
    }

    fn render_pdf(&self) -> Result<Vec<u8>, StudyError> {
        let failed = |e: PdfiumError| StudyError::ExportFailed {
            format: "PDF",
            detail: format!("{:?}", e),
        };

        let pdfium = pdfium_auto::bind_pdfium_silent().map_err(|e| StudyError::ExportFailed {
            format: "PDF",
            detail: e.to_string(),
        })?;
        let mut document = pdfium.create_new_pdf().map_err(failed)?;
        let regular = document.fonts_mut().helvetica();
        let bold = document.fonts_mut().helvetica_bold();

        let pages = self.paginate();
        for placed_lines in &pages {
            let mut page = document
                .pages_mut()
                .create_page_at_end(PdfPagePaperSize::a4())
                .map_err(failed)?;
            for placed in placed_lines {
                let Some(text) = placed.line.text().filter(|t| !t.is_empty()) else {
                    continue;
                };
                let font = match placed.line {
                    NotesLine::Title(_) | NotesLine::Heading(_) => bold,
                    _ => regular,
                };
                page.objects_mut()
                    .create_text_object(
                        PdfPoints::new(MARGIN_LEFT),
                        PdfPoints::new(placed.y),
                        text,
                        font,
                        PdfPoints::new(placed.line.font_size()),
                    )
                    .map_err(failed)?;
            }
        }
        debug!("Rendered notes: {} lines on {} pages", self.lines.len(), pages.len());

        document.save_to_bytes().map_err(failed)
    }
}

/// Greedy word wrap. An empty or whitespace-only line yields no lines;
/// a single word longer than `width` is broken at `width` characters.
pub fn wrap_line(line: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut out = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for word in line.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > width {
            if current_len > 0 {
                out.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let rest = word.split_off(width);
            out.push(word.into_iter().collect());
            word = rest;
        }
        if word.is_empty() {
            continue;
        }
        let needed = if current_len == 0 { word.len() } else { current_len + 1 + word.len() };
        if needed > width {
            out.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current.extend(word.iter());
        current_len += word.len();
    }
    if current_len > 0 {
        out.push(current);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{Diagram, DiagramType, ResourceLink, Resources};

    fn content(explanation: &str) -> LearningContent {
        LearningContent {
            topic: "Newton's Laws of Motion".into(),
            explanation: explanation.into(),
            resources: Resources {
                youtube: Some(ResourceLink {
                    title: "Crash Course".into(),
                    url: "https://youtube.com/watch?v=x".into(),
                }),
                website: Some(ResourceLink {
                    title: "Khan Academy".into(),
                    url: "https://khanacademy.org".into(),
                }),
                article: None,
            },
            diagram: Diagram {
                kind: DiagramType::None,
                steps: vec![],
            },
        }
    }

    #[test]
    fn wrap_respects_width() {
        let text = "word ".repeat(40);
        let lines = wrap_line(&text, WRAP_WIDTH);
        assert!(lines.len() > 1);
        assert!(lines.iter().all(|l| l.chars().count() <= WRAP_WIDTH));
        assert_eq!(lines.join(" "), text.trim());
    }

    #[test]
    fn wrap_blank_line_yields_nothing() {
        assert!(wrap_line("", 90).is_empty());
        assert!(wrap_line("   ", 90).is_empty());
    }

    #[test]
    fn wrap_breaks_overlong_words() {
        let lines = wrap_line("ab abcdefgh c", 4);
        assert_eq!(lines, vec!["ab", "abcd", "efgh", "c"]);
    }

    #[test]
    fn notes_layout() {
        let doc = NotesDocument::from_content(&content("First paragraph.\n\nSecond paragraph."));
        assert_eq!(
            doc.lines(),
            &[
                NotesLine::Title("Newton's Laws of Motion".into()),
                NotesLine::Blank,
                NotesLine::Body("First paragraph.".into()),
                NotesLine::Body("Second paragraph.".into()),
                NotesLine::Blank,
                NotesLine::Heading("Best Resources:".into()),
                NotesLine::Body(
                    "- YouTube search: https://www.youtube.com/results?search_query=Newton%27s+Laws+of+Motion"
                        .into()
                ),
                NotesLine::Body("- Khan Academy".into()),
            ]
        );
    }

    #[test]
    fn markdown_rendering() {
        let md = NotesDocument::from_content(&content("Short.")).to_markdown();
        assert!(md.starts_with("# Newton's Laws of Motion\n\nShort.\n\n## Best Resources:\n"));
        assert!(md.ends_with("- Khan Academy\n"));
    }

    #[test]
    fn long_notes_paginate() {
        let explanation = vec!["line"; 120].join("\n");
        let doc = NotesDocument::from_content(&content(&explanation));
        let pages = doc.paginate();
        assert!(pages.len() >= 3, "got {} pages", pages.len());
        let placed: usize = pages.iter().map(Vec::len).sum();
        assert_eq!(placed, doc.lines().len());
        for page in &pages {
            assert!(page.iter().all(|p| p.y >= BOTTOM_Y - 30.0 && p.y <= TOP_Y));
        }
    }

    #[tokio::test]
    async fn markdown_file_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.md");
        let doc = NotesDocument::from_content(&content("Body."));
        doc.write_markdown(&path).await.unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, doc.to_markdown());
    }
}
