use serde::Deserialize;
use std::time::Duration;

use crate::config::LlmConfig;

/// Chat dialect spoken by the completion endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Ollama's native `/api/chat`.
    Ollama,
    /// Any OpenAI-compatible `/chat/completions` (OpenAI, Together, vLLM...).
    OpenAi,
}

/// Parameters for a chat completion.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub temperature: f32,
    /// Generation halts before any of these strings.
    pub stop: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("request to model service failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("model service error ({status}): {body}")]
    Status { status: u16, body: String },
    #[error("malformed model service response: {0}")]
    Malformed(String),
    #[error("API key not found in environment variable {0}")]
    MissingApiKey(String),
}

/// The language model the router consults.
#[async_trait::async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, request: ChatRequest) -> Result<String, LlmError>;
}

/// Shared HTTP client for chat completion APIs.
pub struct LlmClient {
    pub provider: Provider,
    pub endpoint: String,
    pub model: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl LlmClient {
    pub fn new(
        provider: Provider,
        endpoint: String,
        model: String,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            provider,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model,
            api_key,
            client,
        })
    }

    /// Build a client from config, reading the API key from the environment.
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = match &config.api_key_env {
            Some(var) => match std::env::var(var) {
                Ok(key) => Some(key),
                Err(_) if config.provider == Provider::Ollama => None,
                Err(_) => return Err(LlmError::MissingApiKey(var.clone())),
            },
            None => None,
        };

        Self::new(
            config.provider,
            config.endpoint.clone(),
            config.model.clone(),
            api_key,
            Duration::from_secs(config.timeout_secs),
        )
    }

    fn url(&self) -> String {
        match self.provider {
            Provider::Ollama => format!("{}/api/chat", self.endpoint),
            Provider::OpenAi => format!("{}/chat/completions", self.endpoint),
        }
    }

    fn body(&self, request: &ChatRequest) -> serde_json::Value {
        let messages = serde_json::json!([
            { "role": "system", "content": request.system_prompt },
            { "role": "user", "content": request.user_prompt }
        ]);

        match self.provider {
            Provider::Ollama => serde_json::json!({
                "model": self.model,
                "messages": messages,
                "stream": false,
                "options": {
                    "temperature": request.temperature,
                    "stop": request.stop
                }
            }),
            Provider::OpenAi => serde_json::json!({
                "model": self.model,
                "messages": messages,
                "temperature": request.temperature,
                "stop": request.stop
            }),
        }
    }

    fn extract_content(provider: Provider, response: &serde_json::Value) -> Option<&str> {
        match provider {
            Provider::Ollama => response["message"]["content"].as_str(),
            Provider::OpenAi => response["choices"][0]["message"]["content"].as_str(),
        }
    }
}

#[async_trait::async_trait]
impl CompletionService for LlmClient {
    /// Send a chat request and return the response content.
    async fn complete(&self, request: ChatRequest) -> Result<String, LlmError> {
        let mut builder = self.client.post(self.url()).json(&self.body(&request));
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status { status, body });
        }

        let response_json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LlmError::Malformed(e.to_string()))?;

        let content = Self::extract_content(self.provider, &response_json)
            .ok_or_else(|| LlmError::Malformed("no content in completion".to_string()))?
            .to_string();

        log::debug!("LLM: received {} chars from {}", content.len(), self.model);
        Ok(content)
    }
}
