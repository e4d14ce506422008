//! Memory collaborators that supply prompt context

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::phase::PhaseKind;

/// Supplies an optional memory block prepended to phase prompts
///
/// The block is opaque text; the prompt builder counts it against the same
/// budget as the transcript.
#[async_trait]
pub trait ContextProvider: Send + Sync {
    async fn context(&self, query: &str, phase: PhaseKind) -> Option<String>;

    /// Receive the Learning phase output of a finished query
    async fn remember(&self, _query: &str, _facts: &str) {}
}

/// Fixed text for every phase
#[derive(Debug, Clone)]
pub struct StaticContext {
    text: String,
}

impl StaticContext {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[async_trait]
impl ContextProvider for StaticContext {
    async fn context(&self, _query: &str, _phase: PhaseKind) -> Option<String> {
        if self.text.trim().is_empty() {
            None
        } else {
            Some(self.text.clone())
        }
    }
}

/// Facts learned by earlier queries of one session, newest kept
#[derive(Debug)]
pub struct SessionMemory {
    capacity: usize,
    entries: Mutex<VecDeque<String>>,
}

impl Default for SessionMemory {
    fn default() -> Self {
        Self::new(10)
    }
}

impl SessionMemory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: Mutex::new(VecDeque::new()),
        }
    }

    fn entries(&self) -> MutexGuard<'_, VecDeque<String>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    pub fn clear(&self) {
        self.entries().clear();
    }
}

#[async_trait]
impl ContextProvider for SessionMemory {
    async fn context(&self, _query: &str, phase: PhaseKind) -> Option<String> {
        // Learning writes memory; it does not need to read it back
        if phase == PhaseKind::Learning {
            return None;
        }
        let entries = self.entries();
        if entries.is_empty() {
            return None;
        }
        Some(entries.iter().cloned().collect::<Vec<_>>().join("\n\n"))
    }

    async fn remember(&self, query: &str, facts: &str) {
        let facts = facts.trim();
        if facts.is_empty() {
            return;
        }
        let mut entries = self.entries();
        entries.push_back(format!("Earlier request: {}\n{}", query.trim(), facts));
        while entries.len() > self.capacity {
            entries.pop_front();
        }
        log::debug!("Session memory holds {} entries", entries.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_context() {
        let provider = StaticContext::new("binary is a packed PE");
        assert_eq!(
            provider.context("q", PhaseKind::Planning).await.as_deref(),
            Some("binary is a packed PE")
        );
        assert!(StaticContext::new("  ").context("q", PhaseKind::Planning).await.is_none());
    }

    #[tokio::test]
    async fn test_session_memory_remembers() {
        let memory = SessionMemory::new(2);
        assert!(memory.context("q", PhaseKind::Planning).await.is_none());

        memory.remember("what is main?", "main parses argv").await;
        let block = memory.context("next", PhaseKind::Analysis).await.unwrap();
        assert!(block.contains("Earlier request: what is main?"));
        assert!(block.contains("main parses argv"));
        assert!(memory.context("next", PhaseKind::Learning).await.is_none());
    }

    #[tokio::test]
    async fn test_session_memory_capacity() {
        let memory = SessionMemory::new(2);
        memory.remember("a", "fact a").await;
        memory.remember("b", "fact b").await;
        memory.remember("c", "fact c").await;
        memory.remember("d", "   ").await;

        assert_eq!(memory.len(), 2);
        let block = memory.context("q", PhaseKind::Planning).await.unwrap();
        assert!(!block.contains("fact a"));
        assert!(block.contains("fact c"));

        memory.clear();
        assert!(memory.is_empty());
    }
}
