//! Plain-text extraction from uploaded documents.
//!
//! Three formats are accepted, chosen by file extension:
//!
//! | Extension | Source of text | Separator |
//! |-----------|----------------|-----------|
//! | `.pdf`    | pdfium page text layer | `\n` after each page |
//! | `.docx`   | `w:t` runs of `word/document.xml` | `\n` after each paragraph |
//! | `.txt`    | UTF-8 file contents | `\n` after the file |
//!
//! pdfium is a blocking C library, so PDF and DOCX work runs under
//! `spawn_blocking`. Scanned PDFs with no text layer simply yield empty pages.

use crate::error::StudyError;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Supported upload formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Docx,
    Text,
}

impl DocumentKind {
    /// Classify by (case-insensitive) extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(DocumentKind::Pdf),
            "docx" => Some(DocumentKind::Docx),
            "txt" | "text" | "md" => Some(DocumentKind::Text),
            _ => None,
        }
    }
}

/// Extract the text of a file on disk.
///
/// # Errors
/// `FileNotFound`, `UnsupportedFile` for unknown extensions, or
/// `ExtractionFailed` when the file cannot be decoded.
pub async fn extract_text(path: &Path) -> Result<String, StudyError> {
    if !path.exists() {
        return Err(StudyError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    let kind = DocumentKind::from_path(path).ok_or_else(|| StudyError::UnsupportedFile {
        path: path.to_path_buf(),
    })?;

    let bytes = tokio::fs::read(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            StudyError::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            StudyError::ExtractionFailed {
                path: path.to_path_buf(),
                detail: e.to_string(),
            }
        }
    })?;

    extract_bytes(kind, bytes, path.to_path_buf()).await
}

/// Extract the text of an in-memory upload.
///
/// `file_name` only selects the format and labels errors; nothing is read
/// from disk.
pub async fn extract_text_from_bytes(
    file_name: &str,
    bytes: Vec<u8>,
) -> Result<String, StudyError> {
    let label = PathBuf::from(file_name);
    let kind = DocumentKind::from_path(&label)
        .ok_or_else(|| StudyError::UnsupportedFile { path: label.clone() })?;
    extract_bytes(kind, bytes, label).await
}

async fn extract_bytes(
    kind: DocumentKind,
    bytes: Vec<u8>,
    label: PathBuf,
) -> Result<String, StudyError> {
    let size = bytes.len();
    let result = match kind {
        DocumentKind::Text => text_from_utf8(bytes),
        DocumentKind::Pdf => tokio::task::spawn_blocking(move || pdf_text(&bytes))
            .await
            .map_err(|e| StudyError::Internal(format!("PDF extraction task panicked: {}", e)))?,
        DocumentKind::Docx => tokio::task::spawn_blocking(move || docx_text(&bytes))
            .await
            .map_err(|e| StudyError::Internal(format!("DOCX extraction task panicked: {}", e)))?,
    };

    match result {
        Ok(text) => {
            info!(
                "Extracted {} chars from {} ({} bytes)",
                text.len(),
                label.display(),
                size
            );
            Ok(text)
        }
        Err(detail) => Err(StudyError::ExtractionFailed {
            path: label,
            detail,
        }),
    }
}

/// Plain text: strict UTF-8, optional BOM stripped, trailing newline added.
fn text_from_utf8(bytes: Vec<u8>) -> Result<String, String> {
    let mut text = String::from_utf8(bytes).map_err(|e| format!("not valid UTF-8: {e}"))?;
    if text.starts_with('\u{FEFF}') {
        text.remove(0);
    }
    text.push('\n');
    Ok(text)
}

/// Concatenate the text layer of every page.
fn pdf_text(bytes: &[u8]) -> Result<String, String> {
    if bytes.len() < 4 || &bytes[..4] != b"%PDF" {
        return Err("file is not a PDF (missing %PDF header)".into());
    }

    let pdfium = pdfium_auto::bind_pdfium_silent().map_err(|e| e.to_string())?;
    let document = pdfium.load_pdf_from_byte_slice(bytes, None).map_err(|e| {
        let detail = format!("{:?}", e);
        if detail.contains("Password") || detail.contains("password") {
            "PDF is encrypted and requires a password".to_string()
        } else {
            format!("PDF is corrupt: {detail}")
        }
    })?;

    let mut text = String::new();
    for (idx, page) in document.pages().iter().enumerate() {
        match page.text() {
            Ok(page_text) => text.push_str(&page_text.all()),
            Err(e) => warn!("Page {}: no text layer ({:?})", idx + 1, e),
        }
        text.push('\n');
    }
    debug!("PDF text layer: {} chars", text.len());
    Ok(text)
}

/// Paragraph text from a WordprocessingML package.
fn docx_text(bytes: &[u8]) -> Result<String, String> {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| format!("not a .docx package: {e}"))?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| format!("word/document.xml missing: {e}"))?
        .read_to_string(&mut xml)
        .map_err(|e| format!("word/document.xml unreadable: {e}"))?;
    paragraphs_from_document_xml(&xml)
}

/// Walk `document.xml`: text runs accumulate into the current paragraph,
/// `w:tab` becomes `\t`, `w:br`/`w:cr` become `\n`, and each closed `w:p`
/// emits its text plus a newline.
fn paragraphs_from_document_xml(xml: &str) -> Result<String, String> {
    let mut reader = Reader::from_str(xml);
    let mut out = String::new();
    let mut paragraph = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"t" => in_text = true,
                b"p" => paragraph.clear(),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"tab" => paragraph.push('\t'),
                b"br" | b"cr" => paragraph.push('\n'),
                b"p" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Text(t)) if in_text => {
                let unescaped = t.unescape().map_err(|e| format!("bad XML text: {e}"))?;
                paragraph.push_str(&unescaped);
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => {
                    out.push_str(&paragraph);
                    out.push('\n');
                    paragraph.clear();
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(format!(
                    "malformed document.xml at byte {}: {e}",
                    reader.buffer_position()
                ))
            }
            _ => {}
        }
    }
    Ok(out)
}
