//! Ollama backend
//!
//! Talks to `/api/generate` with streaming disabled. Servers that stream
//! anyway return newline-delimited JSON, whose `response` fragments are
//! concatenated.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};

use crate::error::{BridgeError, Result};

use super::backend::{BackendError, ModelBackend, PhaseModelConfig};

/// Default Ollama server
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Configuration for the Ollama client
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_OLLAMA_URL.to_string(),
            timeout: Duration::from_secs(120),
        }
    }
}

impl OllamaConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Ollama API client
pub struct OllamaBackend {
    client: Client,
    config: OllamaConfig,
}

impl OllamaBackend {
    pub fn new(config: OllamaConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| BridgeError::Backend(format!("Failed to create HTTP client: {}", e)))?;
        log::info!("Initialized Ollama backend at {}", config.base_url);
        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Build the request body for `/api/generate`
    fn build_request(config: &PhaseModelConfig, prompt: &str) -> Value {
        let mut options = json!({ "temperature": config.temperature });
        if let Some(max_tokens) = config.max_tokens {
            options["num_predict"] = json!(max_tokens);
        }

        let mut body = json!({
            "model": config.model,
            "prompt": prompt,
            "stream": false,
            "options": options,
        });
        if !config.system_prompt.is_empty() {
            body["system"] = json!(config.system_prompt);
        }
        body
    }

    /// Extract generated text from a single object or an NDJSON stream
    fn parse_response(text: &str) -> std::result::Result<String, BackendError> {
        if let Ok(value) = serde_json::from_str::<Value>(text) {
            if let Some(error) = value.get("error").and_then(Value::as_str) {
                return Err(BackendError::InvalidResponse(error.to_string()));
            }
            return value
                .get("response")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| BackendError::InvalidResponse("missing 'response' field".to_string()));
        }

        let mut combined = String::new();
        let mut parsed_any = false;
        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            match serde_json::from_str::<Value>(line) {
                Ok(value) => {
                    parsed_any = true;
                    if let Some(fragment) = value.get("response").and_then(Value::as_str) {
                        combined.push_str(fragment);
                    }
                }
                Err(e) => log::warn!("Could not parse response line: {}", e),
            }
        }

        if parsed_any {
            Ok(combined)
        } else {
            Err(BackendError::InvalidResponse(format!(
                "not JSON: {}",
                text.chars().take(120).collect::<String>()
            )))
        }
    }

    fn classify(&self, err: reqwest::Error) -> BackendError {
        if err.is_timeout() {
            BackendError::Timeout(self.config.timeout)
        } else {
            BackendError::Unavailable(err.to_string())
        }
    }

    /// Names of the models installed on the server
    pub async fn list_models(&self) -> std::result::Result<Vec<String>, BackendError> {
        let response = self
            .client
            .get(self.url("api/tags"))
            .send()
            .await
            .map_err(|e| self.classify(e))?;
        let body: Value = response
            .json()
            .await
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))?;

        Ok(body
            .get("models")
            .and_then(Value::as_array)
            .map(|models| {
                models
                    .iter()
                    .filter_map(|m| m.get("name").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[async_trait]
impl ModelBackend for OllamaBackend {
    async fn generate(
        &self,
        config: &PhaseModelConfig,
        prompt: &str,
    ) -> std::result::Result<String, BackendError> {
        let body = Self::build_request(config, prompt);
        log::debug!(
            "Generating with {} for {} ({} prompt chars)",
            config.model,
            config.label,
            prompt.len()
        );

        let response = self
            .client
            .post(self.url("api/generate"))
            .json(&body)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(BackendError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let text = response.text().await.map_err(|e| self.classify(e))?;
        Self::parse_response(&text)
    }

    async fn health_check(&self) -> bool {
        match self.client.get(&self.config.base_url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                log::error!("Ollama health check failed: {}", e);
                false
            }
        }
    }
}

impl std::fmt::Debug for OllamaBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OllamaBackend")
            .field("base_url", &self.config.base_url)
            .field("timeout", &self.config.timeout)
            .finish()
    }
}
