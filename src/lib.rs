//! ghidra-bridge - Drive Ghidra analysis with a local language model
//!
//! A phase loop (Planning, Execution, Analysis, optional Review, Verification
//! and Learning) asks a model what to do, pulls tool invocations out of its
//! free-text output, validates them against a tool catalogue and runs them
//! against a GhidraMCP deployment, feeding results back until the query is
//! answered.

pub mod error;
pub mod executor;
pub mod extract;
pub mod llm;
pub mod normalize;
pub mod orchestrator;
pub mod prompt;
pub mod registry;

pub use error::{BridgeError, Result};
pub use executor::{ExecutionOutcome, ExecutorConfig, OutcomeStatus, ToolExecutor};
pub use extract::{RawInvocation, extract_invocations};
pub use llm::{ModelBackend, PhaseModelConfig};
pub use normalize::{NormalizedCommand, Normalizer, Rejection};
pub use orchestrator::{Orchestrator, OrchestratorConfig, PhaseKind, QueryResult, TerminalStatus};
pub use registry::ToolRegistry;
