//! Embedding and answer generation behind a narrow seam.

use crate::error::IngestResult;
use filechat_config::Config;
use filechat_ollama::{ChatTurn, ContextItem, OllamaClient, RagConfig};

/// Embeds text and answers questions from retrieved chunks.
#[allow(async_fn_in_trait)]
pub trait ModelBackend {
    /// Name recorded in every index this backend builds.
    fn embedding_model(&self) -> &str;

    async fn embed(&self, text: &str) -> IngestResult<Vec<f32>>;

    /// Answer `question` using only `context` and the earlier turns.
    async fn answer(
        &self,
        question: &str,
        context: &[ContextItem],
        history: &[ChatTurn],
    ) -> IngestResult<String>;
}

/// [`ModelBackend`] served by a local Ollama instance.
pub struct OllamaBackend {
    client: OllamaClient,
    embedding_model: String,
    rag: RagConfig,
}

impl OllamaBackend {
    pub fn new(client: OllamaClient, embedding_model: impl Into<String>, rag: RagConfig) -> Self {
        Self {
            client,
            embedding_model: embedding_model.into(),
            rag,
        }
    }

    pub fn from_config(config: &Config) -> IngestResult<Self> {
        let client = OllamaClient::from_config(&config.ollama)?;
        Ok(Self::new(
            client,
            config.ollama.embedding_model.clone(),
            RagConfig::from_config(config),
        ))
    }

    pub fn client(&self) -> &OllamaClient {
        &self.client
    }
}

impl ModelBackend for OllamaBackend {
    fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    async fn embed(&self, text: &str) -> IngestResult<Vec<f32>> {
        Ok(self.client.embed(&self.embedding_model, text).await?)
    }

    async fn answer(
        &self,
        question: &str,
        context: &[ContextItem],
        history: &[ChatTurn],
    ) -> IngestResult<String> {
        let response = self
            .client
            .rag_query(question, context, history, &self.rag)
            .await?;
        Ok(response.answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config() {
        let mut config = Config::default();
        config.ollama.embedding_model = "mxbai-embed-large".to_string();

        let backend = OllamaBackend::from_config(&config).unwrap();
        assert_eq!(backend.embedding_model(), "mxbai-embed-large");
        assert_eq!(backend.client().host(), "http://localhost:11434");
    }
}
