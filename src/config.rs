use std::path::Path;

use serde::Deserialize;
use serde::Serialize;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    pub endpoint: String,
    pub embedding_model: String,
    pub llm_model: String,
    pub request_timeout_secs: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434".to_string(),
            embedding_model: "bge-m3".to_string(),
            llm_model: "deepseek-r1:7b".to_string(),
            request_timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    pub collection_name: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            collection_name: "fitness_knowledge".to_string(),
            chunk_size: 500,
            chunk_overlap: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    pub top_k: usize,
    /// Minimum similarity a passage must reach to be injected into the
    /// prompt; 0.0 disables the floor
    pub min_score: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            min_score: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    pub temperature: f32,
    pub max_tokens: usize,
    /// Upper bound on history messages injected into a prompt
    pub max_history_messages: usize,
    /// Character budget for the injected history transcript
    pub history_char_budget: usize,
    /// How many retrieved passages are surfaced as citations
    pub citation_limit: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 2000,
            max_history_messages: 12,
            history_char_budget: 4000,
            citation_limit: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
    /// Persist conversations and the index snapshot under `data_dir`
    pub persist: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
            persist: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub backtrace: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            backtrace: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub knowledge: KnowledgeConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the default config file path
    pub fn load() -> crate::Result<Self> {
        // Try config.toml first, then fall back to the shipped example
        if Path::new("config.toml").exists() {
            Self::from_file("config.toml")
        } else if Path::new("config.example.toml").exists() {
            Self::from_file("config.example.toml")
        } else {
            let config = Self::default();
            config.validate()?;
            Ok(config)
        }
    }

    fn validate(&self) -> crate::Result<()> {
        if self.knowledge.chunk_size == 0 {
            return Err(crate::FitragError::Config(
                "knowledge.chunk_size must be positive".to_string(),
            ));
        }
        if self.knowledge.chunk_overlap >= self.knowledge.chunk_size {
            return Err(crate::FitragError::Config(format!(
                "knowledge.chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.knowledge.chunk_overlap, self.knowledge.chunk_size
            )));
        }
        if self.retrieval.top_k == 0 {
            return Err(crate::FitragError::Config(
                "retrieval.top_k must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Get the Ollama endpoint
    pub fn ollama_endpoint(&self) -> &str {
        &self.ollama.endpoint
    }

    /// Get the embedding model name
    pub fn embedding_model(&self) -> &str {
        &self.ollama.embedding_model
    }

    /// Get the generation model name
    pub fn llm_model(&self) -> &str {
        &self.ollama.llm_model
    }

    /// Get the HTTP request timeout in seconds
    pub fn request_timeout_secs(&self) -> u64 {
        self.ollama.request_timeout_secs
    }

    /// Get the vector index collection name
    pub fn collection_name(&self) -> &str {
        &self.knowledge.collection_name
    }

    /// Get the maximum chunk size in characters
    pub fn chunk_size(&self) -> usize {
        self.knowledge.chunk_size
    }

    /// Get the chunk overlap in characters
    pub fn chunk_overlap(&self) -> usize {
        self.knowledge.chunk_overlap
    }

    /// Get the default retrieval result count
    pub fn top_k(&self) -> usize {
        self.retrieval.top_k
    }

    /// Get the minimum-relevance floor for retrieval
    pub fn min_score(&self) -> f32 {
        self.retrieval.min_score
    }

    /// Get the generation temperature
    pub fn temperature(&self) -> f32 {
        self.chat.temperature
    }

    /// Get the generation token limit
    pub fn max_tokens(&self) -> usize {
        self.chat.max_tokens
    }

    /// Get the history message cap for prompt composition
    pub fn max_history_messages(&self) -> usize {
        self.chat.max_history_messages
    }

    /// Get the history character budget for prompt composition
    pub fn history_char_budget(&self) -> usize {
        self.chat.history_char_budget
    }

    /// Get the citation display limit
    pub fn citation_limit(&self) -> usize {
        self.chat.citation_limit
    }

    /// Get the data directory for on-disk state
    pub fn data_dir(&self) -> &str {
        &self.storage.data_dir
    }

    /// Check whether on-disk persistence is enabled
    pub fn persist_enabled(&self) -> bool {
        self.storage.persist
    }

    /// Get the log level
    pub fn log_level(&self) -> &str {
        &self.logging.level
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.ollama_endpoint(), "http://localhost:11434");
        assert_eq!(config.embedding_model(), "bge-m3");
        assert_eq!(config.llm_model(), "deepseek-r1:7b");
        assert_eq!(config.chunk_size(), 500);
        assert_eq!(config.chunk_overlap(), 50);
        assert_eq!(config.top_k(), 5);
        assert_eq!(config.citation_limit(), 3);
        assert!(config.persist_enabled());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [ollama]
            endpoint = "http://coach-box:11434"
            embedding_model = "bge-m3"
            llm_model = "qwen2.5:14b"
            request_timeout_secs = 60

            [retrieval]
            top_k = 8
            min_score = 0.35
            "#,
        )
        .unwrap();

        assert_eq!(config.ollama_endpoint(), "http://coach-box:11434");
        assert_eq!(config.llm_model(), "qwen2.5:14b");
        assert_eq!(config.top_k(), 8);
        assert!((config.min_score() - 0.35).abs() < f32::EPSILON);
        // untouched sections keep their defaults
        assert_eq!(config.chunk_size(), 500);
        assert_eq!(config.max_history_messages(), 12);
    }

    #[test]
    fn test_overlap_must_be_smaller_than_chunk_size() {
        let mut config = AppConfig::default();
        config.knowledge.chunk_overlap = config.knowledge.chunk_size;
        assert!(config.validate().is_err());
    }
}
