//! Scripted backend for tests and dry runs
//!
//! Replies are queued per phase label. When a label's queue is empty the
//! label default is used, then the global fallback.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use super::backend::{BackendError, ModelBackend, PhaseModelConfig};

/// One call observed by the scripted backend
#[derive(Debug, Clone, PartialEq)]
pub struct BackendCall {
    pub config: PhaseModelConfig,
    pub prompt: String,
}

#[derive(Debug, Default)]
pub struct ScriptedBackend {
    queues: Mutex<HashMap<String, VecDeque<Result<String, BackendError>>>>,
    defaults: HashMap<String, String>,
    fallback: String,
    latency: Option<Duration>,
    calls: Mutex<Vec<BackendCall>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one reply for `label`
    pub fn with_reply(self, label: impl Into<String>, text: impl Into<String>) -> Self {
        self.push(label.into(), Ok(text.into()));
        self
    }

    /// Queue one failure for `label`
    pub fn with_error(self, label: impl Into<String>, error: BackendError) -> Self {
        self.push(label.into(), Err(error));
        self
    }

    /// Reply used for `label` once its queue is drained
    pub fn with_default(mut self, label: impl Into<String>, text: impl Into<String>) -> Self {
        self.defaults.insert(label.into(), text.into());
        self
    }

    /// Reply used for any label without a queue entry or default
    pub fn with_fallback(mut self, text: impl Into<String>) -> Self {
        self.fallback = text.into();
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    fn push(&self, label: String, reply: Result<String, BackendError>) {
        lock(&self.queues).entry(label).or_default().push_back(reply);
    }

    /// Calls made so far, oldest first
    pub fn calls(&self) -> Vec<BackendCall> {
        lock(&self.calls).clone()
    }

    /// Labels of the calls made so far
    pub fn labels(&self) -> Vec<String> {
        lock(&self.calls).iter().map(|c| c.config.label.clone()).collect()
    }
}

#[async_trait]
impl ModelBackend for ScriptedBackend {
    async fn generate(&self, config: &PhaseModelConfig, prompt: &str) -> Result<String, BackendError> {
        lock(&self.calls).push(BackendCall {
            config: config.clone(),
            prompt: prompt.to_string(),
        });

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let queued = lock(&self.queues)
            .get_mut(&config.label)
            .and_then(VecDeque::pop_front);
        match queued {
            Some(reply) => reply,
            None => Ok(self
                .defaults
                .get(&config.label)
                .cloned()
                .unwrap_or_else(|| self.fallback.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(label: &str) -> PhaseModelConfig {
        PhaseModelConfig::default().with_label(label)
    }

    #[tokio::test]
    async fn test_queue_then_default_then_fallback() {
        let backend = ScriptedBackend::new()
            .with_reply("planning", "first plan")
            .with_default("planning", "default plan")
            .with_fallback("anything");

        assert_eq!(backend.generate(&config("planning"), "p").await.unwrap(), "first plan");
        assert_eq!(backend.generate(&config("planning"), "p").await.unwrap(), "default plan");
        assert_eq!(backend.generate(&config("analysis"), "p").await.unwrap(), "anything");
        assert_eq!(backend.labels(), vec!["planning", "planning", "analysis"]);
    }

    #[tokio::test]
    async fn test_queued_error() {
        let backend = ScriptedBackend::new()
            .with_error("review", BackendError::Unavailable("down".to_string()))
            .with_reply("review", "STOP");

        assert!(backend.generate(&config("review"), "p").await.is_err());
        assert_eq!(backend.generate(&config("review"), "p").await.unwrap(), "STOP");
    }

    #[tokio::test]
    async fn test_records_prompts() {
        let backend = ScriptedBackend::new();
        backend.generate(&config("planning"), "find main").await.unwrap();
        let calls = backend.calls();
        assert_eq!(calls[0].prompt, "find main");
        assert_eq!(calls[0].config.label, "planning");
    }
}
