//! Text-to-speech export of the explanation.
//!
//! [`GoogleTranslateTts`] uses the public Google Translate speech endpoint,
//! which accepts at most ~100 characters per request. The explanation is
//! split on word boundaries, each chunk is fetched in order, and the MP3
//! segments are concatenated (MPEG audio frames are self-delimiting, so
//! players treat the result as one stream).

use super::write_atomic;
use crate::error::StudyError;
use async_trait::async_trait;
use reqwest::Url;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Largest chunk the speech endpoint accepts.
pub const MAX_CHUNK_CHARS: usize = 100;

/// A speech backend producing MP3 bytes.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    fn name(&self) -> &str;

    /// Synthesize `text` into one MP3 byte stream.
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, StudyError>;
}

/// Google Translate's speech endpoint.
#[derive(Debug, Clone)]
pub struct GoogleTranslateTts {
    http: reqwest::Client,
    endpoint: String,
    lang: String,
}

impl GoogleTranslateTts {
    pub const DEFAULT_ENDPOINT: &'static str = "https://translate.google.com/translate_tts";

    pub fn new(timeout_secs: u64) -> Result<Self, StudyError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent("Mozilla/5.0 (compatible; studylm)")
            .build()
            .map_err(|e| StudyError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self {
            http,
            endpoint: Self::DEFAULT_ENDPOINT.into(),
            lang: "en".into(),
        })
    }

    /// Spoken language as an IETF tag (`en`, `fr`, `es`, …).
    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = lang.into();
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Request URL for chunk `idx` of `total`.
    fn chunk_url(&self, chunk: &str, idx: usize, total: usize) -> Result<Url, StudyError> {
        let mut url = Url::parse(&self.endpoint).map_err(|e| StudyError::ExportFailed {
            format: "audio",
            detail: format!("bad speech endpoint '{}': {e}", self.endpoint),
        })?;
        url.query_pairs_mut()
            .append_pair("ie", "UTF-8")
            .append_pair("q", chunk)
            .append_pair("tl", &self.lang)
            .append_pair("client", "tw-ob")
            .append_pair("total", &total.to_string())
            .append_pair("idx", &idx.to_string())
            .append_pair("textlen", &chunk.chars().count().to_string());
        Ok(url)
    }
}

#[async_trait]
impl SpeechSynthesizer for GoogleTranslateTts {
    fn name(&self) -> &str {
        "google-translate"
    }

    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, StudyError> {
        let chunks = chunk_text(text, MAX_CHUNK_CHARS);
        if chunks.is_empty() {
            return Err(StudyError::ExportFailed {
                format: "audio",
                detail: "nothing to speak: the explanation is empty".into(),
            });
        }

        let failed = |detail: String| StudyError::ExportFailed {
            format: "audio",
            detail,
        };

        let mut audio = Vec::new();
        for (idx, chunk) in chunks.iter().enumerate() {
            let url = self.chunk_url(chunk, idx, chunks.len())?;
            let response = self
                .http
                .get(url)
                .send()
                .await
                .map_err(|e| failed(format!("chunk {}/{}: {e}", idx + 1, chunks.len())))?;
            let status = response.status();
            if !status.is_success() {
                return Err(failed(format!(
                    "chunk {}/{}: speech service returned HTTP {}",
                    idx + 1,
                    chunks.len(),
                    status.as_u16()
                )));
            }
            let bytes = response
                .bytes()
                .await
                .map_err(|e| failed(format!("chunk {}/{}: {e}", idx + 1, chunks.len())))?;
            debug!("Speech chunk {}/{}: {} bytes", idx + 1, chunks.len(), bytes.len());
            audio.extend_from_slice(&bytes);
        }
        Ok(audio)
    }
}

/// Synthesize `text` with `synth` and write the MP3 to `path`.
pub async fn write_audio(
    synth: &dyn SpeechSynthesizer,
    text: &str,
    path: &Path,
) -> Result<(), StudyError> {
    let audio = synth.synthesize(text).await?;
    write_atomic(path, &audio).await?;
    info!(
        "Audio written to {} ({} bytes, via {})",
        path.display(),
        audio.len(),
        synth.name()
    );
    Ok(())
}

/// Split `text` into chunks of at most `max_chars` characters, breaking on
/// whitespace. A word longer than `max_chars` is split mid-word.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut len = 0usize;

    for word in text.split_whitespace() {
        let chars: Vec<char> = word.chars().collect();
        for piece in chars.chunks(max_chars) {
            let needed = if len == 0 { piece.len() } else { len + 1 + piece.len() };
            if needed > max_chars && len > 0 {
                chunks.push(std::mem::take(&mut current));
                len = 0;
            }
            if len > 0 {
                current.push(' ');
                len += 1;
            }
            current.extend(piece);
            len += piece.len();
        }
    }
    if len > 0 {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn chunks_never_exceed_limit() {
        let text = "Newton's first law states that an object remains at rest ".repeat(12);
        let chunks = chunk_text(&text, MAX_CHUNK_CHARS);
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.chars().count() <= MAX_CHUNK_CHARS));
        assert_eq!(chunks.join(" "), text.split_whitespace().collect::<Vec<_>>().join(" "));
    }

    #[test]
    fn long_word_is_split() {
        let word = "x".repeat(250);
        let chunks = chunk_text(&word, 100);
        assert_eq!(
            chunks.iter().map(String::len).collect::<Vec<_>>(),
            vec![100, 100, 50]
        );
    }

    #[test]
    fn empty_text_has_no_chunks() {
        assert!(chunk_text(" \n\t ", 100).is_empty());
    }

    #[test]
    fn chunk_url_query() {
        let tts = GoogleTranslateTts::new(10).unwrap().with_lang("fr");
        let url = tts.chunk_url("bonjour le monde", 1, 3).unwrap();
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert!(url.as_str().starts_with(GoogleTranslateTts::DEFAULT_ENDPOINT));
        assert!(pairs.contains(&("q".into(), "bonjour le monde".into())));
        assert!(pairs.contains(&("tl".into(), "fr".into())));
        assert!(pairs.contains(&("client".into(), "tw-ob".into())));
        assert!(pairs.contains(&("idx".into(), "1".into())));
        assert!(pairs.contains(&("total".into(), "3".into())));
        assert!(pairs.contains(&("textlen".into(), "16".into())));
    }

    #[test]
    fn bad_endpoint_is_export_error() {
        let tts = GoogleTranslateTts::new(10).unwrap().with_endpoint("not a url");
        assert!(matches!(
            tts.chunk_url("hi", 0, 1),
            Err(StudyError::ExportFailed { format: "audio", .. })
        ));
    }

    struct FakeTts {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl SpeechSynthesizer for FakeTts {
        fn name(&self) -> &str {
            "fake"
        }
        async fn synthesize(&self, text: &str) -> Result<Vec<u8>, StudyError> {
            self.seen.lock().unwrap().push(text.to_string());
            Ok(b"ID3fake-mp3".to_vec())
        }
    }

    #[tokio::test]
    async fn write_audio_persists_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("media/audio/explanation.mp3");
        let tts = FakeTts {
            seen: Mutex::new(Vec::new()),
        };
        write_audio(&tts, "Forces cause acceleration.", &path)
            .await
            .unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"ID3fake-mp3");
        assert_eq!(*tts.seen.lock().unwrap(), vec!["Forces cause acceleration."]);
    }
}
