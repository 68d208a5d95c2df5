//! Export collaborators: things done with a finished [`LearningContent`].
//!
//! None of these sit on the generation path. Each writes its file
//! atomically (temp file in the same directory, then rename) so a failed
//! export never leaves a half-written file behind.
//!
//! [`LearningContent`]: crate::content::LearningContent

pub mod notes;
pub mod speech;

use crate::error::StudyError;
use reqwest::Url;
use std::path::{Path, PathBuf};

const YOUTUBE_RESULTS: &str = "https://www.youtube.com/results";

/// A YouTube search link for `topic`.
///
/// Spaces become `+`; everything else outside the unreserved set is
/// percent-encoded.
///
/// ```rust
/// assert_eq!(
///     studylm::export::youtube_search_url("Newton's laws"),
///     "https://www.youtube.com/results?search_query=Newton%27s+laws"
/// );
/// ```
pub fn youtube_search_url(topic: &str) -> String {
    match Url::parse(YOUTUBE_RESULTS) {
        Ok(mut url) => {
            url.query_pairs_mut()
                .append_pair("search_query", topic.trim());
            url.into()
        }
        Err(_) => format!("{YOUTUBE_RESULTS}?search_query="),
    }
}

/// Write `bytes` to `path` via a sibling temp file and a rename.
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StudyError> {
    let write_err = |source: std::io::Error| StudyError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = tmp_sibling(path);
    tokio::fs::write(&tmp_path, bytes).await.map_err(write_err)?;
    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(write_err(e));
    }
    Ok(())
}

/// `notes.pdf` → `notes.pdf.tmp`, in the same directory.
fn tmp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "output".into());
    name.push(".tmp");
    path.with_file_name(name)
}
