//! PDF document parser.

use super::{file_title, DocumentParser, ParsedDocument};
use crate::error::{IngestError, IngestResult};
use std::path::Path;
use tracing::debug;

/// Parser for PDF files.
pub struct PdfParser;

impl DocumentParser for PdfParser {
    fn parse(&self, path: &Path) -> IngestResult<ParsedDocument> {
        if !path.exists() {
            return Err(IngestError::FileNotFound(path.to_path_buf()));
        }

        debug!("Parsing PDF: {:?}", path);

        let content = pdf_extract::extract_text(path).map_err(|e| IngestError::ParseError {
            path: path.to_path_buf(),
            message: format!("Failed to extract text from PDF: {}", e),
        })?;
        let content = clean_pdf_text(&content);

        debug!("Extracted {} characters from PDF", content.len());

        let doc = ParsedDocument::new(content);
        Ok(match file_title(path) {
            Some(title) => doc.with_title(title),
            None => doc,
        })
    }

    fn extensions(&self) -> &[&str] {
        &["pdf"]
    }
}

/// Trim lines, collapse runs of blank lines and turn page breaks into paragraph breaks.
fn clean_pdf_text(text: &str) -> String {
    let normalized = text.replace('\x0C', "\n\n");
    let mut lines: Vec<&str> = Vec::new();
    for line in normalized.lines().map(str::trim) {
        if line.is_empty() && lines.last().map_or(true, |l| l.is_empty()) {
            continue;
        }
        lines.push(line);
    }
    lines.join("\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_pdf_text() {
        let cleaned = clean_pdf_text("\n\n  Hello  \n\n\n\nWorld  \x0CNext page\n\nTest");
        assert_eq!(cleaned, "Hello\n\nWorld\n\nNext page\n\nTest");
    }

    #[test]
    fn test_pdf_parser_extensions() {
        assert!(PdfParser.supports("pdf"));
        assert!(PdfParser.supports("PDF"));
        assert!(!PdfParser.supports("txt"));
    }
}
