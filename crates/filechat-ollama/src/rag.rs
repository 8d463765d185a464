//! Grounded question answering over retrieved chunks.

use crate::client::OllamaClient;
use crate::error::OllamaResult;
use crate::types::{GenerateOptions, GenerateRequest};
use filechat_config::Config;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Settings for answering a question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagConfig {
    /// Model to use for generation.
    pub model: String,
    /// Maximum number of context chunks to include.
    pub max_context_chunks: usize,
    /// Minimum similarity score for context.
    pub min_similarity: f32,
    /// Temperature for generation (0.0 to 2.0).
    pub temperature: f32,
    /// How many earlier turns go into the prompt.
    pub history_turns: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            model: "llama3.1:8b".to_string(),
            max_context_chunks: 4,
            min_similarity: 0.0,
            temperature: 0.4,
            history_turns: 5,
        }
    }
}

impl RagConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            model: config.ollama.model.clone(),
            max_context_chunks: config.chat.max_context_chunks,
            min_similarity: config.chat.min_similarity,
            temperature: config.chat.temperature,
            history_turns: config.chat.history_turns,
        }
    }
}

/// One earlier question and the answer it got.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub question: String,
    pub answer: String,
}

impl ChatTurn {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// A retrieved chunk handed to the model.
#[derive(Debug, Clone)]
pub struct ContextItem {
    pub content: String,
    pub similarity: f32,
    /// Display name of the file or link the chunk came from.
    pub source: String,
}

/// A chunk an answer was based on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceReference {
    pub source: String,
    /// Start of the chunk, shortened for display.
    pub excerpt: String,
    pub similarity: f32,
}

impl SourceReference {
    pub fn from_context(item: &ContextItem) -> Self {
        Self {
            source: item.source.clone(),
            excerpt: truncate_content(&item.content, 200),
            similarity: item.similarity,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagResponse {
    pub answer: String,
    pub sources: Vec<SourceReference>,
}

/// Build the prompt: retrieved data, recent history, then the question.
///
/// Only the last `history_turns` turns are included.
pub fn build_rag_prompt(
    question: &str,
    context: &[ContextItem],
    history: &[ChatTurn],
    history_turns: usize,
) -> String {
    let mut prompt = String::new();

    prompt.push_str("=====\nData:\n");
    if context.is_empty() {
        prompt.push_str("(no matching data)\n");
    }
    for (i, item) in context.iter().enumerate() {
        prompt.push_str(&format!("\n[{}] From: {}\n", i + 1, item.source));
        prompt.push_str(&item.content);
        prompt.push('\n');
    }
    prompt.push_str("=====\n\n");

    let skip = history.len().saturating_sub(history_turns);
    let recent = &history[skip..];
    if !recent.is_empty() {
        prompt.push_str("Conversation so far:\n");
        for turn in recent {
            prompt.push_str(&format!("Human: {}\nAssistant: {}\n", turn.question, turn.answer));
        }
        prompt.push('\n');
    }

    prompt.push_str(&format!("Question: {}\nHelpful Answer:", question));
    prompt
}

/// System prompt keeping answers grounded in the supplied data.
pub fn build_system_prompt() -> String {
    r#"You answer questions using the data you are given, which may come from documents, web pages, recordings or videos. Treat that data as your memory.

Guidelines:
- Answer only from the data and the conversation so far
- If the data does not contain the answer, say that you don't know
- Never make up an answer
- Be concise"#
        .to_string()
}

impl OllamaClient {
    /// Answer a question from retrieved context and the running conversation.
    ///
    /// An empty context is still sent, so the model can say it doesn't know.
    pub async fn rag_query(
        &self,
        question: &str,
        context: &[ContextItem],
        history: &[ChatTurn],
        config: &RagConfig,
    ) -> OllamaResult<RagResponse> {
        let prompt = build_rag_prompt(question, context, history, config.history_turns);
        debug!(
            "Answering with {} context chunks and {} history turns",
            context.len(),
            history.len().min(config.history_turns)
        );

        let request = GenerateRequest::new(&config.model, prompt)
            .with_system(build_system_prompt())
            .with_options(GenerateOptions::new().with_temperature(config.temperature));

        let response = self.generate(request).await?;

        Ok(RagResponse {
            answer: response.response.trim().to_string(),
            sources: context.iter().map(SourceReference::from_context).collect(),
        })
    }
}

/// Truncate content to a maximum number of characters, adding an ellipsis.
fn truncate_content(content: &str, max_len: usize) -> String {
    if content.chars().count() <= max_len {
        content.to_string()
    } else {
        let truncated: String = content.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> Vec<ContextItem> {
        vec![
            ContextItem {
                content: "Mitochondria produce ATP.".to_string(),
                similarity: 0.9,
                source: "http://example.com/page".to_string(),
            },
            ContextItem {
                content: "Chloroplasts capture light.".to_string(),
                similarity: 0.8,
                source: "plants.pdf".to_string(),
            },
        ]
    }

    #[test]
    fn test_build_rag_prompt() {
        let prompt = build_rag_prompt("What makes ATP?", &context(), &[], 5);

        assert!(prompt.contains("Question: What makes ATP?"));
        assert!(prompt.contains("[1] From: http://example.com/page"));
        assert!(prompt.contains("Chloroplasts capture light."));
        assert!(!prompt.contains("Conversation so far"));
        assert!(prompt.ends_with("Helpful Answer:"));
    }

    #[test]
    fn test_prompt_keeps_only_recent_history() {
        let history = vec![
            ChatTurn::new("first?", "one"),
            ChatTurn::new("second?", "two"),
            ChatTurn::new("third?", "three"),
        ];

        let prompt = build_rag_prompt("fourth?", &context(), &history, 2);
        assert!(!prompt.contains("first?"));
        assert!(prompt.contains("Human: second?\nAssistant: two"));
        assert!(prompt.contains("Human: third?\nAssistant: three"));

        let prompt = build_rag_prompt("fourth?", &context(), &history, 0);
        assert!(!prompt.contains("Human:"));
    }

    #[test]
    fn test_prompt_without_context() {
        let prompt = build_rag_prompt("Anything?", &[], &[], 5);
        assert!(prompt.contains("(no matching data)"));
        assert!(build_system_prompt().contains("don't know"));
    }

    #[test]
    fn test_truncate_content() {
        assert_eq!(truncate_content("Hello", 10), "Hello");

        let truncated = truncate_content("This is a very long string that should be truncated", 20);
        assert_eq!(truncated.chars().count(), 20);
        assert!(truncated.ends_with("..."));

        let unicode = truncate_content("ééééééééééé", 5);
        assert_eq!(unicode, "éé...");
    }

    #[test]
    fn test_rag_config_from_config() {
        let mut config = Config::default();
        config.chat.max_context_chunks = 7;
        config.ollama.model = "mistral".to_string();

        let rag = RagConfig::from_config(&config);
        assert_eq!(rag.max_context_chunks, 7);
        assert_eq!(rag.model, "mistral");
        assert!((rag.temperature - 0.4).abs() < f32::EPSILON);
    }
}
