//! Turning files and links into normalized text.

use crate::error::{IngestError, IngestResult};
use crate::parsers::{extract_page, extract_title, parse_file, ParsedDocument};
use filechat_config::{Config, LinksConfig};
use filechat_core::is_video_extension;
use filechat_process::{
    download_audio, extract_audio, fetch_subtitles, segments_to_text, transcribe_audio,
    ProcessError,
};
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Subtitle language requested for video links.
const SUBTITLE_LANGUAGE: &str = "en";

/// Text extracted from a source, ready to be chunked.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedSource {
    pub text: String,
    pub title: Option<String>,
}

impl LoadedSource {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            title: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

impl From<ParsedDocument> for LoadedSource {
    fn from(doc: ParsedDocument) -> Self {
        Self {
            text: doc.content,
            title: doc.title,
        }
    }
}

/// Produces normalized text for each kind of source.
#[allow(async_fn_in_trait)]
pub trait SourceLoader {
    /// Text, markdown, PDF, HTML or source code file.
    async fn load_document(&self, path: &Path) -> IngestResult<LoadedSource>;

    /// Audio or video file, transcribed.
    async fn load_media(&self, path: &Path) -> IngestResult<LoadedSource>;

    /// Web page.
    async fn load_link(&self, url: &str) -> IngestResult<LoadedSource>;

    /// Online video, from its subtitles or a transcription of its audio.
    async fn load_video_link(&self, url: &str) -> IngestResult<LoadedSource>;
}

/// What a submitted link points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    Page,
    Video,
}

const VIDEO_PREFIXES: [&str; 5] = [
    "youtube.com/watch?v=",
    "http://www.youtube.com/watch?v=",
    "https://www.youtube.com/watch?v=",
    "http://youtu.be/",
    "https://youtu.be/",
];

/// Classify a link by prefix.
pub fn classify_link(link: &str) -> LinkKind {
    if VIDEO_PREFIXES.iter().any(|p| link.starts_with(p)) {
        LinkKind::Video
    } else {
        LinkKind::Page
    }
}

/// Canonical `https://www.youtube.com/watch?v=<id>` form of a video link.
pub fn normalize_video_link(link: &str) -> String {
    for prefix in ["https://youtu.be/", "http://youtu.be/"] {
        if let Some(rest) = link.strip_prefix(prefix) {
            let id = rest.split(['?', '&', '#']).next().unwrap_or(rest);
            return format!("https://www.youtube.com/watch?v={}", id);
        }
    }
    if link.starts_with("youtube.com/") {
        return format!("https://www.{}", link);
    }
    link.to_string()
}

/// Check that a link can be fetched: an absolute http(s) URL with a host.
///
/// Video links are checked in their normalized form.
pub fn validate_link(link: &str) -> IngestResult<Url> {
    let candidate = match classify_link(link) {
        LinkKind::Video => normalize_video_link(link),
        LinkKind::Page => link.to_string(),
    };

    let url = Url::parse(&candidate)
        .map_err(|e| IngestError::Validation(format!("malformed link {}: {}", link, e)))?;

    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(IngestError::Validation(format!(
            "link must be an http(s) URL: {}",
            link
        )));
    }
    Ok(url)
}

/// Files under `dir` that can be uploaded, sorted. Hidden files and
/// directories are skipped.
pub fn collect_files(dir: &Path) -> Vec<PathBuf> {
    let is_hidden = |entry: &walkdir::DirEntry| {
        entry.depth() > 0
            && entry
                .file_name()
                .to_str()
                .map(|n| n.starts_with('.'))
                .unwrap_or(false)
    };

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| !is_hidden(e))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files
}

/// Settings for [`StandardLoader`].
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    pub whisper_model: String,
    pub links: LinksConfig,
    /// Where temporary audio, subtitle and download files go.
    pub scratch_dir: PathBuf,
}

impl LoaderConfig {
    pub fn from_config(config: &Config, scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            whisper_model: config.processing.whisper_model.clone(),
            links: config.links.clone(),
            scratch_dir: scratch_dir.into(),
        }
    }
}

/// Loader backed by the parsers, whisper, ffmpeg, yt-dlp and HTTP.
pub struct StandardLoader {
    config: LoaderConfig,
    http: Client,
}

impl StandardLoader {
    pub fn new(config: LoaderConfig) -> IngestResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.links.fetch_timeout_seconds))
            .user_agent(config.links.user_agent.clone())
            .build()
            .map_err(|e| IngestError::Backend(format!("HTTP client: {}", e)))?;

        std::fs::create_dir_all(&config.scratch_dir)?;
        Ok(Self { config, http })
    }

    fn scratch(&self) -> IngestResult<tempfile::TempDir> {
        Ok(tempfile::Builder::new()
            .prefix("filechat-")
            .tempdir_in(&self.config.scratch_dir)?)
    }

    /// GET a URL, returning its content type and at most `max_page_bytes` of body.
    ///
    /// The body is read chunk by chunk and reading stops at the limit. A PDF
    /// over the limit is refused, since a cut-off PDF cannot be parsed.
    async fn fetch(&self, url: &str) -> IngestResult<(String, Vec<u8>)> {
        let fetch_error = |message: String| IngestError::Fetch {
            url: url.to_string(),
            message,
        };

        let mut response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| fetch_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fetch_error(format!("HTTP {}", status)));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("text/html")
            .to_lowercase();

        let mut body = CappedBody::new(
            self.config.links.max_page_bytes,
            is_pdf(&content_type),
        );
        if let Some(length) = response.content_length() {
            body.check_length(length).map_err(fetch_error)?;
        }

        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| fetch_error(e.to_string()))?
        {
            if !body.push(&chunk).map_err(fetch_error)? {
                debug!("Stopped reading {} at {} bytes", url, body.len());
                break;
            }
        }

        Ok((content_type, body.into_inner()))
    }
}

fn is_pdf(content_type: &str) -> bool {
    content_type.starts_with("application/pdf")
}

/// A response body that stops growing at a byte limit.
#[derive(Debug)]
struct CappedBody {
    bytes: Vec<u8>,
    limit: usize,
    /// Exceeding the limit is an error rather than a cut.
    strict: bool,
}

impl CappedBody {
    fn new(limit: usize, strict: bool) -> Self {
        Self {
            bytes: Vec::new(),
            limit,
            strict,
        }
    }

    fn too_large(&self, size: u64) -> String {
        format!("document is {} bytes, larger than the {} byte limit", size, self.limit)
    }

    /// Check an announced content length before reading anything.
    fn check_length(&self, length: u64) -> Result<(), String> {
        if self.strict && length > self.limit as u64 {
            return Err(self.too_large(length));
        }
        Ok(())
    }

    /// Append a chunk. Returns whether more input is wanted.
    fn push(&mut self, chunk: &[u8]) -> Result<bool, String> {
        let room = self.limit - self.bytes.len();
        if chunk.len() <= room {
            self.bytes.extend_from_slice(chunk);
            // A strict body keeps reading so anything past the limit is noticed
            return Ok(self.strict || self.bytes.len() < self.limit);
        }

        if self.strict {
            return Err(self.too_large((self.bytes.len() + chunk.len()) as u64));
        }
        self.bytes.extend_from_slice(&chunk[..room]);
        Ok(false)
    }

    fn len(&self) -> usize {
        self.bytes.len()
    }

    fn into_inner(self) -> Vec<u8> {
        self.bytes
    }
}

impl SourceLoader for StandardLoader {
    async fn load_document(&self, path: &Path) -> IngestResult<LoadedSource> {
        let path = path.to_path_buf();
        let doc = tokio::task::spawn_blocking(move || parse_file(&path)).await??;
        Ok(doc.into())
    }

    async fn load_media(&self, path: &Path) -> IngestResult<LoadedSource> {
        if !path.exists() {
            return Err(IngestError::FileNotFound(path.to_path_buf()));
        }

        let path = path.to_path_buf();
        let scratch = self.scratch()?;
        let model = self.config.whisper_model.clone();

        let text = tokio::task::spawn_blocking(move || -> IngestResult<String> {
            let is_video = path
                .extension()
                .and_then(|e| e.to_str())
                .map(is_video_extension)
                .unwrap_or(false);

            let audio = if is_video {
                extract_audio(&path, scratch.path())?
            } else {
                path.clone()
            };

            let segments = transcribe_audio(&audio, &model, scratch.path())?;
            Ok(segments_to_text(&segments))
        })
        .await??;

        Ok(LoadedSource::new(text))
    }

    async fn load_link(&self, url: &str) -> IngestResult<LoadedSource> {
        info!("Fetching {}", url);
        let (content_type, body) = self.fetch(url).await?;

        if is_pdf(&content_type) {
            let scratch = self.scratch()?;
            let pdf_path = scratch.path().join("download.pdf");
            std::fs::write(&pdf_path, &body)?;

            let doc = tokio::task::spawn_blocking(move || {
                let doc = parse_file(&pdf_path);
                drop(scratch);
                doc
            })
            .await??;
            return Ok(LoadedSource::new(doc.content));
        }

        let text = String::from_utf8_lossy(&body);
        if content_type.starts_with("text/plain") {
            return Ok(LoadedSource::new(text.trim()));
        }

        Ok(extract_page(&text, self.config.links.strip_elements.as_slice())?.into())
    }

    async fn load_video_link(&self, url: &str) -> IngestResult<LoadedSource> {
        let url = normalize_video_link(url);

        // The page title is a nicety; subtitles are what matter
        let page_title = match self.fetch(&url).await {
            Ok((_, body)) => extract_title(&String::from_utf8_lossy(&body))?,
            Err(e) => {
                warn!("Could not fetch video page title: {}", e);
                None
            }
        };

        let scratch = self.scratch()?;
        let model = self.config.whisper_model.clone();
        let video_url = url.clone();

        let (title, text) = tokio::task::spawn_blocking(move || -> IngestResult<_> {
            match fetch_subtitles(&video_url, SUBTITLE_LANGUAGE, scratch.path()) {
                Ok(transcript) => Ok((transcript.title, segments_to_text(&transcript.segments))),
                Err(ProcessError::NoSubtitles(_)) => {
                    info!("No subtitles for {}, transcribing audio", video_url);
                    let audio = download_audio(&video_url, scratch.path())?;
                    let segments = transcribe_audio(&audio, &model, scratch.path())?;
                    Ok((None, segments_to_text(&segments)))
                }
                Err(e) => Err(e.into()),
            }
        })
        .await??;

        let source = LoadedSource::new(text);
        Ok(match title.or(page_title) {
            Some(title) => source.with_title(title),
            None => source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_capped_body_cuts_pages_at_limit() {
        let mut body = CappedBody::new(10, false);
        body.check_length(1_000_000).unwrap();

        assert!(body.push(b"<html>").unwrap());
        assert!(!body.push(b"<body>text</body>").unwrap());
        assert_eq!(body.into_inner(), b"<html><bod".to_vec());
    }

    #[test]
    fn test_capped_body_stops_exactly_at_limit() {
        let mut body = CappedBody::new(4, false);
        assert!(!body.push(b"abcd").unwrap());
        assert_eq!(body.len(), 4);
    }

    #[test]
    fn test_capped_body_refuses_oversized_pdf() {
        let body = CappedBody::new(10, true);
        assert!(body.check_length(10).is_ok());
        assert!(body.check_length(11).unwrap_err().contains("larger than the 10 byte limit"));

        // No announced length: refused once the stream passes the limit
        let mut body = CappedBody::new(10, true);
        assert!(body.push(b"%PDF-1.7").unwrap());
        assert!(body.push(b"\n%").unwrap());
        assert!(body.push(b"\n%more").is_err());
    }

    #[test]
    fn test_classify_link() {
        assert_eq!(classify_link("youtube.com/watch?v=abc"), LinkKind::Video);
        assert_eq!(classify_link("https://www.youtube.com/watch?v=abc"), LinkKind::Video);
        assert_eq!(classify_link("http://www.youtube.com/watch?v=abc"), LinkKind::Video);
        assert_eq!(classify_link("https://youtu.be/abc"), LinkKind::Video);
        assert_eq!(classify_link("http://youtu.be/abc"), LinkKind::Video);

        assert_eq!(classify_link("http://example.com/page"), LinkKind::Page);
        assert_eq!(classify_link("https://m.youtube.com/watch?v=abc"), LinkKind::Page);
        assert_eq!(classify_link("https://www.youtube.com/channel/xyz"), LinkKind::Page);
    }

    #[test]
    fn test_normalize_video_link() {
        assert_eq!(
            normalize_video_link("https://youtu.be/dQw4w9WgXcQ"),
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ"
        );
        assert_eq!(
            normalize_video_link("http://youtu.be/dQw4w9WgXcQ?t=42"),
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ"
        );
        assert_eq!(
            normalize_video_link("youtube.com/watch?v=abc"),
            "https://www.youtube.com/watch?v=abc"
        );
        let canonical = "https://www.youtube.com/watch?v=abc";
        assert_eq!(normalize_video_link(canonical), canonical);
    }

    #[test]
    fn test_validate_link() {
        assert!(validate_link("http://example.com/page").is_ok());
        assert!(validate_link("youtube.com/watch?v=abc").is_ok());

        for bad in ["not a url", "ftp://example.com/file", "example.com/page", "mailto:a@b.c"] {
            assert!(
                matches!(validate_link(bad), Err(IngestError::Validation(_))),
                "{} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_collect_files_skips_hidden() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("week1")).unwrap();
        std::fs::create_dir_all(dir.path().join(".git")).unwrap();
        std::fs::write(dir.path().join("week1").join("b.md"), "b").unwrap();
        std::fs::write(dir.path().join("a.txt"), "a").unwrap();
        std::fs::write(dir.path().join(".DS_Store"), "x").unwrap();
        std::fs::write(dir.path().join(".git").join("HEAD"), "x").unwrap();

        let files = collect_files(dir.path());
        assert_eq!(
            files,
            vec![dir.path().join("a.txt"), dir.path().join("week1").join("b.md")]
        );
    }

    fn loader(dir: &Path) -> StandardLoader {
        let config = LoaderConfig::from_config(&Config::default(), dir.join("scratch"));
        StandardLoader::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_load_document() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.md");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "# Enzymes\n\nEnzymes speed up reactions.").unwrap();

        let source = loader(dir.path()).load_document(&path).await.unwrap();
        assert_eq!(source.title.as_deref(), Some("Enzymes"));
        assert!(source.text.contains("speed up reactions"));
    }

    #[tokio::test]
    async fn test_load_missing_media() {
        let dir = tempdir().unwrap();
        let result = loader(dir.path())
            .load_media(&dir.path().join("lecture.mp3"))
            .await;
        assert!(matches!(result, Err(IngestError::FileNotFound(_))));
    }

    #[tokio::test]
    async fn test_load_link_unreachable() {
        let dir = tempdir().unwrap();
        let result = loader(dir.path()).load_link("http://127.0.0.1:9/page").await;
        assert!(matches!(result, Err(IngestError::Fetch { .. })));
    }
}
