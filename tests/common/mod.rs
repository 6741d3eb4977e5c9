//! Shared test doubles for the integration suites
#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::Mutex;

use fitrag::errors::FitragError;
use fitrag::errors::Result;
use fitrag::gateway::EmbeddingGateway;
use fitrag::gateway::GenerationGateway;
use fitrag::models::ServiceHealth;

fn healthy() -> ServiceHealth {
    ServiceHealth {
        reachable: true,
        ready: true,
        detail: "fake".to_string(),
    }
}

fn unreachable() -> ServiceHealth {
    ServiceHealth {
        reachable: false,
        ready: false,
        detail: "fake backend down".to_string(),
    }
}

/// Deterministic letter-frequency embedding, good enough for similarity
/// ordering in tests
pub fn embed_text(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0f32; 26];
    for c in text.to_ascii_lowercase().chars() {
        if c.is_ascii_lowercase() {
            vector[(c as usize) - ('a' as usize)] += 1.0;
        }
    }
    vector
}

pub struct FakeEmbedding;

#[async_trait]
impl EmbeddingGateway for FakeEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(embed_text(text))
    }

    async fn health(&self) -> ServiceHealth {
        healthy()
    }
}

/// Embedding gateway that is always down
pub struct FailingEmbedding;

#[async_trait]
impl EmbeddingGateway for FailingEmbedding {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(FitragError::Embedding("embedding backend down".to_string()))
    }

    async fn health(&self) -> ServiceHealth {
        unreachable()
    }
}

/// Generation gateway returning a fixed reply and recording every prompt
pub struct FakeGeneration {
    pub reply: String,
    pub prompts: Mutex<Vec<String>>,
}

impl FakeGeneration {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationGateway for FakeGeneration {
    async fn generate(&self, prompt: &str, _system: Option<&str>) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.reply.clone())
    }

    async fn health(&self) -> ServiceHealth {
        healthy()
    }
}

/// Generation gateway that is always down
pub struct FailingGeneration;

#[async_trait]
impl GenerationGateway for FailingGeneration {
    async fn generate(&self, _prompt: &str, _system: Option<&str>) -> Result<String> {
        Err(FitragError::Generation("generation backend down".to_string()))
    }

    async fn health(&self) -> ServiceHealth {
        unreachable()
    }
}
