//! Plain text document parser.

use super::{file_title, DocumentParser, ParsedDocument};
use crate::error::{IngestError, IngestResult};
use std::path::Path;

/// Parser for plain text files, including source code.
pub struct TextParser;

impl DocumentParser for TextParser {
    fn parse(&self, path: &Path) -> IngestResult<ParsedDocument> {
        if !path.exists() {
            return Err(IngestError::FileNotFound(path.to_path_buf()));
        }

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                return Err(IngestError::UnsupportedFileType(format!(
                    "{} is not UTF-8 text",
                    path.display()
                )))
            }
            Err(e) => return Err(e.into()),
        };

        let mut doc = ParsedDocument::new(content);
        if let Some(title) = file_title(path) {
            doc = doc.with_title(title);
        }
        Ok(doc)
    }

    fn extensions(&self) -> &[&str] {
        &[
            "txt", "text", "log", "csv", "org", "rst", // Plain text
            "rs", "py", "js", "ts", "jsx", "tsx", "go", "c", "cpp", "h", "hpp", // Code
            "java", "rb", "sh", "json", "yaml", "yml", "toml", "css", "sql", "swift", "kt",
            "php", "lua",
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_text() {
        let mut file = NamedTempFile::with_suffix(".txt").unwrap();
        writeln!(file, "This is a plain text file.\nWith multiple lines.").unwrap();

        let doc = TextParser.parse(file.path()).unwrap();

        assert!(doc.content.contains("plain text file"));
        assert!(doc.title.unwrap().ends_with(".txt"));
    }

    #[test]
    fn test_binary_is_unsupported() {
        let mut file = NamedTempFile::with_suffix(".bin").unwrap();
        file.write_all(&[0xff, 0xfe, 0x00, 0x9f]).unwrap();

        assert!(matches!(
            TextParser.parse(file.path()),
            Err(IngestError::UnsupportedFileType(_))
        ));
    }

    #[test]
    fn test_supports_code() {
        assert!(TextParser.supports("rs"));
        assert!(TextParser.supports("PY"));
        assert!(!TextParser.supports("pdf"));
    }
}
