//! Tool Executor
//!
//! Sends normalized commands to a GhidraMCP deployment and classifies what
//! comes back. The `ToolApi` trait is the seam to the remote service:
//! `HttpToolApi` talks to a live instance, `MockToolApi` answers in-process.

mod api;
mod mock;
mod remote;
mod tool_executor;

pub use api::{ApiReply, Endpoint, EndpointRole, ToolApi, TransportFailure};
pub use mock::{MockCall, MockToolApi};
pub use remote::{DEFAULT_TOOL_TIMEOUT, HttpToolApi};
pub use tool_executor::{
    DEFAULT_PRIMARY_URL, DEFAULT_SECONDARY_URL, ExecutionOutcome, ExecutorConfig, OutcomeStatus, ToolExecutor,
    shape_payload,
};
