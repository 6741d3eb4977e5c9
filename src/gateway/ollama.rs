//! Ollama API client implementing both model gateways

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use crate::config::AppConfig;
use crate::errors::FitragError;
use crate::errors::Result;
use crate::gateway::EmbeddingGateway;
use crate::gateway::GenerationGateway;
use crate::models::ServiceHealth;

/// Client for a local Ollama instance, serving embeddings and completions
pub struct OllamaClient {
    endpoint: String,
    embedding_model: String,
    llm_model: String,
    temperature: f32,
    max_tokens: usize,
    client: Client,
}

impl OllamaClient {
    /// Create a new client from the application config
    pub fn new(config: &AppConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs()))
            .pool_max_idle_per_host(16)
            .pool_idle_timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| FitragError::Http(e.to_string()))?;

        Ok(Self {
            endpoint: config.ollama_endpoint().trim_end_matches('/').to_string(),
            embedding_model: config.embedding_model().to_string(),
            llm_model: config.llm_model().to_string(),
            temperature: config.temperature(),
            max_tokens: config.max_tokens(),
            client,
        })
    }

    /// Get the configured embedding model name
    #[must_use]
    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    /// Get the configured generation model name
    #[must_use]
    pub fn llm_model(&self) -> &str {
        &self.llm_model
    }

    /// List the model tags known to the Ollama instance
    pub async fn list_models(&self) -> Result<Vec<String>> {
        #[derive(Deserialize)]
        struct TagsResponse {
            models: Vec<ModelTag>,
        }

        #[derive(Deserialize)]
        struct ModelTag {
            name: String,
        }

        let url = format!("{}/api/tags", self.endpoint);
        debug!("Listing Ollama models: {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| FitragError::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(FitragError::Http(format!(
                "Ollama API error ({status}): {error_text}"
            )));
        }

        let result: TagsResponse = response
            .json()
            .await
            .map_err(|e| FitragError::Http(format!("Failed to parse response: {e}")))?;

        Ok(result.models.into_iter().map(|m| m.name).collect())
    }

    async fn probe_model(&self, wanted: &str) -> ServiceHealth {
        match self.list_models().await {
            Ok(models) => {
                if model_ready(&models, wanted) {
                    ServiceHealth {
                        reachable: true,
                        ready: true,
                        detail: wanted.to_string(),
                    }
                } else {
                    ServiceHealth {
                        reachable: true,
                        ready: false,
                        detail: format!("model {wanted} not found; run: ollama pull {wanted}"),
                    }
                }
            }
            Err(e) => ServiceHealth {
                reachable: false,
                ready: false,
                detail: e.to_string(),
            },
        }
    }
}

/// Whether a wanted model is present among installed tags, ignoring the
/// `:latest`-style tag suffix on either side
fn model_ready(models: &[String], wanted: &str) -> bool {
    let base = wanted.split(':').next().unwrap_or(wanted);
    models
        .iter()
        .any(|m| m.as_str() == wanted || m.split(':').next() == Some(base))
}

#[async_trait]
impl EmbeddingGateway for OllamaClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        #[derive(Serialize)]
        struct EmbeddingRequest<'a> {
            model: &'a str,
            prompt: &'a str,
        }

        #[derive(Deserialize)]
        struct EmbeddingResponse {
            embedding: Vec<f32>,
        }

        let url = format!("{}/api/embeddings", self.endpoint);
        debug!("Calling Ollama embeddings API: {}", url);

        let request = EmbeddingRequest {
            model: &self.embedding_model,
            prompt: text,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| FitragError::Embedding(format!("Ollama unreachable: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(FitragError::Embedding(format!(
                "Ollama API error ({status}): {error_text}"
            )));
        }

        let result: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| FitragError::Embedding(format!("Failed to parse response: {e}")))?;

        if result.embedding.is_empty() {
            return Err(FitragError::Embedding(
                "Empty embedding in response".to_string(),
            ));
        }

        Ok(result.embedding)
    }

    async fn health(&self) -> ServiceHealth {
        self.probe_model(&self.embedding_model).await
    }
}

#[async_trait]
impl GenerationGateway for OllamaClient {
    async fn generate(&self, prompt: &str, system: Option<&str>) -> Result<String> {
        #[derive(Serialize)]
        struct GenerateRequest<'a> {
            model: &'a str,
            prompt: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            system: Option<&'a str>,
            stream: bool,
            options: GenerateOptions,
        }

        #[derive(Serialize)]
        struct GenerateOptions {
            temperature: f32,
            num_predict: usize,
        }

        #[derive(Deserialize)]
        struct GenerateResponse {
            response: String,
        }

        let url = format!("{}/api/generate", self.endpoint);
        debug!("Calling Ollama generate API: {}", url);

        let request = GenerateRequest {
            model: &self.llm_model,
            prompt,
            system,
            stream: false,
            options: GenerateOptions {
                temperature: self.temperature,
                num_predict: self.max_tokens,
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| FitragError::Generation(format!("Ollama unreachable: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(FitragError::Generation(format!(
                "Ollama API error ({status}): {error_text}"
            )));
        }

        let result: GenerateResponse = response
            .json()
            .await
            .map_err(|e| FitragError::Generation(format!("Failed to parse response: {e}")))?;

        Ok(result.response.trim().to_string())
    }

    async fn health(&self) -> ServiceHealth {
        self.probe_model(&self.llm_model).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_ready_matches_tag_variants() {
        let models = vec!["bge-m3:latest".to_string(), "deepseek-r1:7b".to_string()];
        assert!(model_ready(&models, "bge-m3"));
        assert!(model_ready(&models, "bge-m3:latest"));
        assert!(model_ready(&models, "deepseek-r1:7b"));
        assert!(model_ready(&models, "deepseek-r1"));
        assert!(!model_ready(&models, "qwen2.5"));
    }

    #[test]
    fn test_client_construction_strips_trailing_slash() {
        let mut config = AppConfig::default();
        config.ollama.endpoint = "http://localhost:11434/".to_string();
        let client = OllamaClient::new(&config).unwrap();
        assert_eq!(client.endpoint, "http://localhost:11434");
    }
}
