//! HTML parser, used for uploaded pages and fetched links.

use super::{file_title, DocumentParser, ParsedDocument};
use crate::error::{IngestError, IngestResult};
use regex::Regex;
use std::path::Path;

/// Line width handed to html2text.
const TEXT_WIDTH: usize = 100;

/// Elements removed from uploaded HTML files before conversion.
const DEFAULT_STRIP: [&str; 5] = ["script", "style", "nav", "header", "footer"];

/// Parser for HTML files.
pub struct HtmlParser;

impl DocumentParser for HtmlParser {
    fn parse(&self, path: &Path) -> IngestResult<ParsedDocument> {
        if !path.exists() {
            return Err(IngestError::FileNotFound(path.to_path_buf()));
        }

        let html = String::from_utf8_lossy(&std::fs::read(path)?).into_owned();
        let doc = extract_page(&html, &DEFAULT_STRIP)?;

        Ok(match doc.title {
            Some(_) => doc,
            None => match file_title(path) {
                Some(title) => doc.with_title(title),
                None => doc,
            },
        })
    }

    fn extensions(&self) -> &[&str] {
        &["html", "htm", "xhtml"]
    }
}

/// Turn an HTML page into text, dropping the `strip` elements and their content.
pub fn extract_page<S: AsRef<str>>(html: &str, strip: &[S]) -> IngestResult<ParsedDocument> {
    let title = extract_title(html)?;

    let mut cleaned = compile(r"(?s)<!--.*?-->")?.replace_all(html, "").into_owned();
    for tag in strip {
        let tag = regex::escape(tag.as_ref().trim());
        if tag.is_empty() {
            continue;
        }
        let element = compile(&format!(r"(?is)<{tag}\b[^>]*>.*?</{tag}\s*>"))?;
        cleaned = element.replace_all(&cleaned, "").into_owned();
    }

    let text = html2text::from_read(cleaned.as_bytes(), TEXT_WIDTH);
    let doc = ParsedDocument::new(text.trim());

    Ok(match title {
        Some(title) => doc.with_title(title),
        None => doc,
    })
}

/// Text of the first `<title>` element, whitespace collapsed.
pub fn extract_title(html: &str) -> IngestResult<Option<String>> {
    let re = compile(r"(?is)<title[^>]*>(.*?)</title\s*>")?;

    Ok(re
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| {
            decode_entities(m.as_str())
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|title| !title.is_empty()))
}

fn compile(pattern: &str) -> IngestResult<Regex> {
    Regex::new(pattern).map_err(|e| IngestError::Validation(format!("bad pattern: {}", e)))
}

fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}
