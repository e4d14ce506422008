//! Model backend trait and per-phase configuration

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Default model identity
pub const DEFAULT_MODEL: &str = "llama3";

/// Default sampling temperature
pub const DEFAULT_TEMPERATURE: f32 = 0.2;

/// Text generation service used by every phase
///
/// Implementations are stateless between calls and safe to share between
/// concurrent queries.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Generate text for `prompt` under the phase's configuration
    async fn generate(&self, config: &PhaseModelConfig, prompt: &str) -> Result<String, BackendError>;

    /// Check whether the service answers
    async fn health_check(&self) -> bool {
        true
    }
}

/// Configuration for one phase's model call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseModelConfig {
    /// Phase this configuration belongs to, for logs and scripted backends
    pub label: String,
    pub model: String,
    pub system_prompt: String,
    pub temperature: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl Default for PhaseModelConfig {
    fn default() -> Self {
        Self {
            label: String::new(),
            model: DEFAULT_MODEL.to_string(),
            system_prompt: String::new(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: None,
        }
    }
}

impl PhaseModelConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Errors from a model backend call
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error("Backend timed out after {0:?}")]
    Timeout(Duration),

    #[error("Backend API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Invalid backend response: {0}")]
    InvalidResponse(String),
}

impl BackendError {
    pub fn is_retryable(&self) -> bool {
        match self {
            BackendError::Unavailable(_) => true,
            BackendError::Timeout(_) => true,
            BackendError::Api { status, .. } => *status >= 500 || *status == 429,
            BackendError::InvalidResponse(_) => false,
        }
    }
}

/// Rough token estimation (actual tokenization varies)
/// Models average ~4 characters per token on English text
pub fn estimate_tokens(text: &str) -> usize {
    text.len() / 4
}
