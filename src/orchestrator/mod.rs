//! Phase Orchestrator
//!
//! This module provides:
//! - `PhaseKind`, `PhaseRecord`, `Transcript` and `LoopState`
//! - `TerminationReason`, `TerminalStatus` and the caller-facing `QueryResult`
//! - `CompletionPredicate` with the keyword-based `ReviewVerdict` default
//! - `ContextProvider` memory collaborators
//! - `Orchestrator`, the state machine that ties model, extractor,
//!   normalizer and executor together

mod completion;
mod context;
mod engine;
mod phase;

pub use completion::{CompletionPredicate, ReviewVerdict};
pub use context::{ContextProvider, SessionMemory, StaticContext};
pub use engine::{Orchestrator, OrchestratorConfig};
pub use phase::{
    InvocationRecord, LoopState, PhaseKind, PhaseRecord, QueryResult, TerminalStatus, TerminationReason, Transcript,
};
