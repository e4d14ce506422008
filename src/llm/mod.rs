//! Model backend layer
//!
//! This module provides:
//! - `ModelBackend` trait: `generate(phase_config, prompt) -> text`
//! - `PhaseModelConfig`, passed explicitly into every phase
//! - `OllamaBackend` for a local Ollama server
//! - `ScriptedBackend` for tests and dry runs

mod backend;
mod ollama;
mod scripted;

pub use backend::{
    BackendError, DEFAULT_MODEL, DEFAULT_TEMPERATURE, ModelBackend, PhaseModelConfig, estimate_tokens,
};
pub use ollama::{DEFAULT_OLLAMA_URL, OllamaBackend, OllamaConfig};
pub use scripted::{BackendCall, ScriptedBackend};
