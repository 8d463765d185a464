//! Ollama HTTP client.

use crate::error::{OllamaError, OllamaResult};
use crate::types::*;
use filechat_config::OllamaConfig;
use reqwest::{Client, Response};
use std::time::Duration;
use tracing::debug;

/// Client for interacting with Ollama's API.
#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    host: String,
    timeout: Duration,
}

impl OllamaClient {
    /// Create a new client from configuration.
    pub fn from_config(config: &OllamaConfig) -> OllamaResult<Self> {
        Self::with_timeout(&config.host, Duration::from_secs(config.timeout_seconds))
    }

    /// Create a new client with the default timeout.
    pub fn new(host: impl Into<String>) -> OllamaResult<Self> {
        Self::with_timeout(&host.into(), Duration::from_secs(120))
    }

    fn with_timeout(host: &str, timeout: Duration) -> OllamaResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            host: host.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Check if Ollama server is available.
    pub async fn is_available(&self) -> bool {
        let url = format!("{}/api/tags", self.host);
        match self.client.get(&url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    /// List all available models.
    pub async fn list_models(&self) -> OllamaResult<Vec<ModelInfo>> {
        let url = format!("{}/api/tags", self.host);
        debug!("Listing models from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.send_error(e))?;
        let response = check_status(response, None).await?;

        let list: ListModelsResponse = response.json().await?;
        Ok(list.models)
    }

    /// Check if a specific model is available, with or without a tag.
    pub async fn has_model(&self, model: &str) -> OllamaResult<bool> {
        let models = self.list_models().await?;
        Ok(models
            .iter()
            .any(|m| m.name == model || m.name.starts_with(&format!("{}:", model))))
    }

    /// Generate an embedding for text.
    pub async fn embed(&self, model: &str, text: &str) -> OllamaResult<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.host);
        debug!("Embedding {} chars with {}", text.len(), model);

        let response = self
            .client
            .post(&url)
            .json(&EmbeddingRequest { model, prompt: text })
            .send()
            .await
            .map_err(|e| self.send_error(e))?;
        let response = check_status(response, Some(model)).await?;

        let embedding = response.json::<EmbeddingResponse>().await?.embedding;
        if embedding.is_empty() {
            return Err(OllamaError::EmptyEmbedding {
                model: model.to_string(),
            });
        }
        Ok(embedding)
    }

    /// Generate text.
    pub async fn generate(&self, request: GenerateRequest) -> OllamaResult<GenerateResponse> {
        let url = format!("{}/api/generate", self.host);
        debug!("Generating with model {}", request.model);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.send_error(e))?;
        let response = check_status(response, Some(&request.model)).await?;

        Ok(response.json().await?)
    }

    fn send_error(&self, e: reqwest::Error) -> OllamaError {
        if e.is_connect() {
            OllamaError::ServerNotRunning {
                host: self.host.clone(),
            }
        } else if e.is_timeout() {
            OllamaError::Timeout {
                seconds: self.timeout.as_secs(),
            }
        } else {
            OllamaError::Http(e)
        }
    }
}

/// Turn a non-success response into the matching error.
async fn check_status(response: Response, model: Option<&str>) -> OllamaResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorResponse>(&text)
        .map(|e| e.error)
        .unwrap_or(text);

    if let Some(model) = model {
        if status.as_u16() == 404 || message.contains("not found") {
            return Err(OllamaError::ModelNotFound {
                model: model.to_string(),
            });
        }
    }

    Err(OllamaError::ApiError {
        status: status.as_u16(),
        message,
    })
}
