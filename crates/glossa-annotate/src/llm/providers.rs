//! Concrete description sources: the remote chat-completions call, a
//! fixed-file lookup, and a constant stub.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::{DescriptionSource, LlmError};

// ============================================================================
// Configuration
// ============================================================================

/// Settings for the remote generation endpoint.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl GenerationConfig {
    pub fn openai(api_key: &str, model: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            timeout_secs: 60,
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

// ============================================================================
// Remote Source
// ============================================================================

/// Chat-completions client. Any non-success response is an error, which
/// the engine treats as run-fatal.
pub struct OpenAiSource {
    client: Client,
    config: GenerationConfig,
}

impl OpenAiSource {
    pub fn new(config: GenerationConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::Network(e.to_string()))?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl DescriptionSource for OpenAiSource {
    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.config.base_url);

        let body = serde_json::json!({
            "model": self.config.model,
            "messages": [{"role": "user", "content": prompt}],
            "max_tokens": max_tokens,
        });

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(LlmError::Api(format!("status {status}: {text}")));
        }

        let data: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        let content = data["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| LlmError::InvalidResponse("missing message content".to_string()))?;

        debug!(model = %self.config.model, chars = content.len(), "generation response received");
        Ok(content.trim().to_string())
    }
}

// ============================================================================
// Offline Sources
// ============================================================================

/// Serves descriptions from a fixed prompt → text mapping. A prompt with no
/// entry fails like a remote error would.
pub struct LookupSource {
    entries: BTreeMap<String, String>,
}

impl LookupSource {
    pub fn new(entries: BTreeMap<String, String>) -> Self {
        Self { entries }
    }
}

#[async_trait]
impl DescriptionSource for LookupSource {
    async fn generate(&self, prompt: &str, _max_tokens: u32) -> Result<String, LlmError> {
        self.entries
            .get(prompt)
            .cloned()
            .ok_or_else(|| LlmError::Api("no canned description for prompt".to_string()))
    }
}

/// Answers every prompt with the same text. Useful for dry runs.
pub struct StaticSource {
    text: String,
}

impl StaticSource {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[async_trait]
impl DescriptionSource for StaticSource {
    async fn generate(&self, _prompt: &str, _max_tokens: u32) -> Result<String, LlmError> {
        Ok(self.text.clone())
    }
}
