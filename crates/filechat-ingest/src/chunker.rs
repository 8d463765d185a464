//! Content chunking for retrieval.
//!
//! Text is split on paragraph boundaries first, then sentences, and only as
//! a last resort at a fixed character count. Pieces are then packed greedily
//! into chunks of at most `chunk_size` characters.

use filechat_config::ProcessingConfig;

/// Configuration for chunking, in characters.
#[derive(Debug, Clone)]
pub struct ChunkConfig {
    /// Maximum size of each chunk.
    pub chunk_size: usize,
    /// Characters carried over from the end of one chunk into the next.
    pub chunk_overlap: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1500,
            chunk_overlap: 0,
        }
    }
}

impl ChunkConfig {
    /// Create config from processing settings.
    pub fn from_processing_config(config: &ProcessingConfig) -> Self {
        // Token-based settings, roughly 4 chars per token
        Self {
            chunk_size: config.chunk_size * 4,
            chunk_overlap: config.chunk_overlap * 4,
        }
    }
}

/// Content chunker for splitting text.
#[derive(Debug, Clone)]
pub struct Chunker {
    config: ChunkConfig,
}

impl Chunker {
    pub fn new(config: ChunkConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ChunkConfig {
        &self.config
    }

    /// Split text into chunks.
    pub fn chunk_text(&self, text: &str) -> Vec<String> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return vec![];
        }

        let size = self.config.chunk_size.max(1);
        if char_len(trimmed) <= size {
            return vec![trimmed.to_string()];
        }

        let mut packer = Packer::new(size, self.config.chunk_overlap);

        for para in trimmed.split("\n\n") {
            let para = para.trim();
            if para.is_empty() {
                continue;
            }

            if char_len(para) <= size {
                packer.push(para, "\n\n");
                continue;
            }

            for sentence in split_sentences(para) {
                if char_len(sentence) <= size {
                    packer.push(sentence, " ");
                } else {
                    // No usable break (tables, minified text): cut at the limit
                    for piece in force_split_by_chars(sentence, size) {
                        packer.push(&piece, " ");
                    }
                }
            }
        }

        packer.finish()
    }
}

/// Greedy accumulator behind [`Chunker::chunk_text`].
struct Packer {
    size: usize,
    overlap: usize,
    current: String,
    chunks: Vec<String>,
}

impl Packer {
    fn new(size: usize, overlap: usize) -> Self {
        Self {
            size,
            overlap,
            current: String::new(),
            chunks: Vec::new(),
        }
    }

    fn push(&mut self, piece: &str, separator: &str) {
        let piece_len = char_len(piece);

        if !self.current.is_empty()
            && char_len(&self.current) + char_len(separator) + piece_len > self.size
        {
            let finished = std::mem::take(&mut self.current);
            let tail = overlap_tail(&finished, self.overlap);
            self.chunks.push(finished.trim().to_string());

            // The tail only survives if the next piece still fits after it
            if !tail.is_empty() && char_len(&tail) + 1 + piece_len <= self.size {
                self.current = tail;
            }
        }

        if !self.current.is_empty() {
            self.current.push_str(separator);
        }
        self.current.push_str(piece);
    }

    fn finish(mut self) -> Vec<String> {
        let last = self.current.trim();
        if !last.is_empty() {
            self.chunks.push(last.to_string());
        }
        self.chunks
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn overlap_tail(text: &str, overlap: usize) -> String {
    if overlap == 0 {
        return String::new();
    }
    let skip = char_len(text).saturating_sub(overlap);
    text.chars().skip(skip).collect::<String>().trim().to_string()
}

fn force_split_by_chars(text: &str, size: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars.chunks(size).map(|c| c.iter().collect()).collect()
}

/// Split text after `.`, `!` or `?` followed by whitespace or the end.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;

    for (i, c) in text.char_indices() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        let next = i + c.len_utf8();
        let at_break = text[next..]
            .chars()
            .next()
            .map_or(true, char::is_whitespace);
        if at_break {
            let sentence = text[start..next].trim();
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            start = next;
        }
    }

    let rest = text[start..].trim();
    if !rest.is_empty() {
        sentences.push(rest);
    }
    sentences
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunker(chunk_size: usize, chunk_overlap: usize) -> Chunker {
        Chunker::new(ChunkConfig {
            chunk_size,
            chunk_overlap,
        })
    }

    #[test]
    fn test_small_text_single_chunk() {
        let chunks = Chunker::new(ChunkConfig::default()).chunk_text("  A small piece of text.  ");
        assert_eq!(chunks, vec!["A small piece of text.".to_string()]);
    }

    #[test]
    fn test_empty_text() {
        let chunker = Chunker::new(ChunkConfig::default());
        assert!(chunker.chunk_text("").is_empty());
        assert!(chunker.chunk_text("   \n\n  ").is_empty());
    }

    #[test]
    fn test_chunks_respect_size() {
        let text = "This is sentence one. This is sentence two. This is sentence three. \
                    This is sentence four. This is sentence five. This is sentence six. \
                    This is sentence seven. This is sentence eight. This is sentence nine.";

        let chunks = chunker(100, 0).chunk_text(text);

        assert!(chunks.len() > 1, "expected several chunks, got {}", chunks.len());
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 100, "chunk too long: {:?}", chunk);
        }
        // Nothing lost without overlap
        assert_eq!(chunks.join(" "), text.split_whitespace().collect::<Vec<_>>().join(" "));
    }

    #[test]
    fn test_paragraphs_are_packed_together() {
        let text = "First paragraph here.\n\nSecond paragraph.\n\nThird paragraph that is a bit longer.";
        let chunks = chunker(45, 0).chunk_text(text);

        assert_eq!(chunks[0], "First paragraph here.\n\nSecond paragraph.");
        assert_eq!(chunks[1], "Third paragraph that is a bit longer.");
    }

    #[test]
    fn test_force_split_without_breaks() {
        let text = "x".repeat(250);
        let chunks = chunker(100, 0).chunk_text(&text);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2].len(), 50);
    }

    #[test]
    fn test_overlap_carries_tail() {
        let text = "Alpha beta gamma. Delta epsilon zeta. Eta theta iota.";
        let chunks = chunker(40, 6).chunk_text(text);

        assert!(chunks.len() >= 2);
        assert!(chunks[1].starts_with("zeta."), "got {:?}", chunks[1]);
    }

    #[test]
    fn test_utf8_text() {
        let text = "Hello ─── World! This has unicode: 日本語 and more ─ content here.";
        let chunks = chunker(20, 5).chunk_text(text);

        assert!(!chunks.is_empty());
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 20);
        }
    }

    #[test]
    fn test_split_sentences() {
        assert_eq!(
            split_sentences("One. Two! Three? v1.2 stays"),
            vec!["One.", "Two!", "Three?", "v1.2 stays"]
        );
    }

    #[test]
    fn test_from_processing_config() {
        let config = ChunkConfig::from_processing_config(&ProcessingConfig::default());
        assert_eq!(config.chunk_size, 1500);
        assert_eq!(config.chunk_overlap, 0);
    }
}
