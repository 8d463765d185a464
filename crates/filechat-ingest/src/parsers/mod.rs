//! Document parsers for uploaded files.

mod html;
mod markdown;
mod pdf;
mod text;

pub use html::{extract_page, extract_title, HtmlParser};
pub use markdown::MarkdownParser;
pub use pdf::PdfParser;
pub use text::TextParser;

use crate::error::{IngestError, IngestResult};
use std::path::Path;

/// Parsed document content.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDocument {
    /// The normalized text content.
    pub content: String,
    /// Document title (if extracted).
    pub title: Option<String>,
}

impl ParsedDocument {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            title: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Trait for document parsers.
pub trait DocumentParser: Send + Sync {
    /// Parse a file at the given path.
    fn parse(&self, path: &Path) -> IngestResult<ParsedDocument>;

    /// Get the supported file extensions.
    fn extensions(&self) -> &[&str];

    /// Check if this parser supports the given extension.
    fn supports(&self, extension: &str) -> bool {
        self.extensions()
            .iter()
            .any(|ext| ext.eq_ignore_ascii_case(extension))
    }
}

/// Parse a file based on its extension.
///
/// Files without a known extension are read as UTF-8 text; binary content
/// is reported as unsupported.
pub fn parse_file(path: &Path) -> IngestResult<ParsedDocument> {
    if !path.exists() {
        return Err(IngestError::FileNotFound(path.to_path_buf()));
    }

    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    let parsers: [&dyn DocumentParser; 3] = [&PdfParser, &MarkdownParser, &HtmlParser];
    if let Some(parser) = parsers.iter().find(|p| p.supports(extension)) {
        return parser.parse(path);
    }

    TextParser.parse(path)
}

/// Title taken from the file name when the document has none of its own.
pub(crate) fn file_title(path: &Path) -> Option<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_dispatch_by_extension() {
        let mut md = NamedTempFile::with_suffix(".md").unwrap();
        writeln!(md, "# Cells\n\nThe unit of life.").unwrap();
        let doc = parse_file(md.path()).unwrap();
        assert_eq!(doc.title.as_deref(), Some("Cells"));

        let mut html = NamedTempFile::with_suffix(".HTML").unwrap();
        writeln!(html, "<html><head><title>Page</title></head><body><p>Body text</p></body></html>").unwrap();
        let doc = parse_file(html.path()).unwrap();
        assert_eq!(doc.title.as_deref(), Some("Page"));
        assert!(doc.content.contains("Body text"));
    }

    #[test]
    fn test_unknown_extension_falls_back_to_text() {
        let mut file = NamedTempFile::with_suffix(".notes").unwrap();
        writeln!(file, "plain words").unwrap();
        assert_eq!(parse_file(file.path()).unwrap().content.trim(), "plain words");
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            parse_file(Path::new("/definitely/not/here.txt")),
            Err(IngestError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_video_page_title() {
        let page = "<html><head><title>\n  Cell Biology &amp; You - YouTube </title></head></html>";
        assert_eq!(
            extract_title(page).unwrap().as_deref(),
            Some("Cell Biology & You - YouTube")
        );
        assert_eq!(extract_title("<html><body>no title</body></html>").unwrap(), None);
    }
}
