//! Markdown document parser.

use super::{file_title, DocumentParser, ParsedDocument};
use crate::error::{IngestError, IngestResult};
use pulldown_cmark::{Event, HeadingLevel, Parser, Tag};
use std::path::Path;

/// Parser for Markdown files. Markup is dropped, code blocks are kept fenced.
pub struct MarkdownParser;

impl MarkdownParser {
    /// Extract plain text and the first H1 from markdown.
    fn extract_text(markdown: &str) -> (String, Option<String>) {
        let mut text = String::new();
        let mut title: Option<String> = None;
        let mut heading: Option<(HeadingLevel, String)> = None;

        for event in Parser::new(markdown) {
            match event {
                Event::Start(Tag::Heading(level, _, _)) => {
                    heading = Some((level, String::new()));
                }
                Event::End(Tag::Heading(_, _, _)) => {
                    if let Some((level, content)) = heading.take() {
                        let content = content.trim();
                        if level == HeadingLevel::H1 && title.is_none() {
                            title = Some(content.to_string());
                        }
                        text.push_str(content);
                        text.push_str("\n\n");
                    }
                }
                Event::Start(Tag::CodeBlock(_)) => text.push_str("```\n"),
                Event::End(Tag::CodeBlock(_)) => text.push_str("```\n\n"),
                Event::End(Tag::Paragraph) => text.push_str("\n\n"),
                Event::End(Tag::List(_)) => text.push('\n'),
                Event::Start(Tag::Item) => text.push_str("- "),
                Event::End(Tag::Item) => text.push('\n'),
                Event::Text(t) | Event::Code(t) => match heading.as_mut() {
                    Some((_, content)) => content.push_str(&t),
                    None => text.push_str(&t),
                },
                Event::SoftBreak | Event::HardBreak => text.push('\n'),
                _ => {}
            }
        }

        (text.trim().to_string(), title)
    }
}

impl DocumentParser for MarkdownParser {
    fn parse(&self, path: &Path) -> IngestResult<ParsedDocument> {
        if !path.exists() {
            return Err(IngestError::FileNotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path)?;
        let (text, title) = Self::extract_text(&content);

        let doc = ParsedDocument::new(text);
        Ok(match title.or_else(|| file_title(path)) {
            Some(title) => doc.with_title(title),
            None => doc,
        })
    }

    fn extensions(&self) -> &[&str] {
        &["md", "markdown", "mdown", "mkd"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_markdown() {
        let mut file = NamedTempFile::with_suffix(".md").unwrap();
        writeln!(
            file,
            r#"# Photosynthesis

Plants turn **light** into sugar.

## Inputs

Needs `CO2` and [water](https://example.com/water).

```text
6CO2 + 6H2O
```

- Light reactions
- Calvin cycle
"#
        )
        .unwrap();

        let doc = MarkdownParser.parse(file.path()).unwrap();

        assert_eq!(doc.title, Some("Photosynthesis".to_string()));
        assert!(doc.content.contains("Plants turn light into sugar."));
        assert!(doc.content.contains("Inputs"));
        assert!(doc.content.contains("Needs CO2 and water."));
        assert!(doc.content.contains("6CO2 + 6H2O"));
        assert!(doc.content.contains("- Calvin cycle"));
        assert!(!doc.content.contains("**"));
    }

    #[test]
    fn test_no_title_uses_file_name() {
        let mut file = NamedTempFile::with_suffix(".md").unwrap();
        writeln!(file, "Just some text without a heading.").unwrap();

        let doc = MarkdownParser.parse(file.path()).unwrap();
        assert!(doc.title.unwrap().ends_with(".md"));
    }
}
