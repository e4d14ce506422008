//! Command execution with endpoint fallback and capability memo

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::normalize::NormalizedCommand;
use crate::registry::{ResultShape, ToolRegistry, ToolSpec};

use super::api::{ApiReply, Endpoint, EndpointRole, ToolApi, TransportFailure};
use super::remote::DEFAULT_TOOL_TIMEOUT;

/// Default primary GhidraMCP endpoint
pub const DEFAULT_PRIMARY_URL: &str = "http://localhost:8080";

/// Default secondary (extended API) GhidraMCP endpoint
pub const DEFAULT_SECONDARY_URL: &str = "http://localhost:8081";

/// Endpoint and timeout settings for a `ToolExecutor`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorConfig {
    pub primary_url: String,
    pub secondary_url: Option<String>,
    /// Upper bound for one remote call
    pub call_timeout: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            primary_url: DEFAULT_PRIMARY_URL.to_string(),
            secondary_url: Some(DEFAULT_SECONDARY_URL.to_string()),
            call_timeout: DEFAULT_TOOL_TIMEOUT,
        }
    }
}

impl ExecutorConfig {
    pub fn with_primary(mut self, url: impl Into<String>) -> Self {
        self.primary_url = url.into();
        self
    }

    pub fn with_secondary(mut self, url: Option<String>) -> Self {
        self.secondary_url = url;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }
}

/// Classification of one execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Success,
    /// The endpoint answered but the tool reported a failure
    ToolError,
    /// No endpoint could be reached
    TransportError,
    /// The deployment does not implement the command
    Unsupported,
}

/// Result of executing one `NormalizedCommand`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    /// Canonical command name
    pub command: String,
    pub status: OutcomeStatus,
    /// Shaped result, on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    /// Failure description, otherwise
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Endpoint that produced this outcome
    pub endpoint: EndpointRole,
}

impl ExecutionOutcome {
    fn success(command: &str, payload: Value, endpoint: EndpointRole) -> Self {
        Self {
            command: command.to_string(),
            status: OutcomeStatus::Success,
            payload: Some(payload),
            message: None,
            endpoint,
        }
    }

    fn failure(command: &str, status: OutcomeStatus, message: impl Into<String>, endpoint: EndpointRole) -> Self {
        Self {
            command: command.to_string(),
            status,
            payload: None,
            message: Some(message.into()),
            endpoint,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Success
    }

    /// Payload or failure message as plain text
    pub fn text(&self) -> String {
        match (&self.payload, &self.message) {
            (Some(Value::String(s)), _) => s.clone(),
            (Some(Value::Array(items)), _) => items
                .iter()
                .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
                .collect::<Vec<_>>()
                .join("\n"),
            (Some(other), _) => other.to_string(),
            (None, Some(message)) => message.clone(),
            (None, None) => String::new(),
        }
    }
}

/// Result of asking one endpoint
enum Attempt {
    Served(ExecutionOutcome),
    /// 404; `routing` when the endpoint has no such route at all
    NotFound { message: String, routing: bool },
    Unreachable(TransportFailure),
}

/// Why a command still needs the secondary endpoint
enum PrimaryMiss {
    Skipped,
    NotFound { message: String, routing: bool },
    Unreachable(TransportFailure),
}

/// Final outcome for a 404 nobody else could serve
fn not_found_outcome(command: &str, message: String, routing: bool, endpoint: EndpointRole) -> ExecutionOutcome {
    let status = if routing {
        OutcomeStatus::Unsupported
    } else {
        OutcomeStatus::ToolError
    };
    ExecutionOutcome::failure(command, status, message, endpoint)
}

/// Sends normalized commands to the remote tool API
///
/// The primary endpoint is tried first; a transport failure or any 404 moves
/// the call to the secondary endpoint when one is configured. A command the
/// primary reported as unsupported goes straight to the secondary until
/// `reset_capabilities` is called, or until the secondary stops answering.
pub struct ToolExecutor<A: ToolApi> {
    api: Arc<A>,
    registry: Arc<ToolRegistry>,
    primary: Endpoint,
    secondary: Option<Endpoint>,
    call_timeout: Duration,
    capabilities: Mutex<HashMap<String, EndpointRole>>,
}

impl<A: ToolApi> ToolExecutor<A> {
    pub fn new(api: Arc<A>, registry: Arc<ToolRegistry>, config: ExecutorConfig) -> Self {
        Self {
            api,
            registry,
            primary: Endpoint::primary(config.primary_url),
            secondary: config.secondary_url.map(Endpoint::secondary),
            call_timeout: config.call_timeout,
            capabilities: Mutex::new(HashMap::new()),
        }
    }

    pub fn api(&self) -> &Arc<A> {
        &self.api
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    pub fn primary(&self) -> &Endpoint {
        &self.primary
    }

    pub fn secondary(&self) -> Option<&Endpoint> {
        self.secondary.as_ref()
    }

    fn memo(&self) -> MutexGuard<'_, HashMap<String, EndpointRole>> {
        self.capabilities
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Endpoint remembered for a command, if any
    pub fn remembered(&self, command: &str) -> Option<EndpointRole> {
        self.memo().get(command).copied()
    }

    /// Forget everything learned about endpoint capabilities
    pub fn reset_capabilities(&self) {
        self.memo().clear();
    }

    /// Execute one command; failures come back as outcome values
    pub async fn execute(&self, command: &NormalizedCommand) -> ExecutionOutcome {
        let Some(tool) = self.registry.get(&command.name) else {
            return ExecutionOutcome::failure(
                &command.name,
                OutcomeStatus::Unsupported,
                format!("'{}' is not in the tool registry", command.name),
                EndpointRole::Primary,
            );
        };

        let skip_primary = self.secondary.is_some()
            && self.remembered(&command.name) == Some(EndpointRole::Secondary);

        let miss = if skip_primary {
            log::debug!("Sending '{}' straight to the secondary endpoint", command.name);
            PrimaryMiss::Skipped
        } else {
            match self.attempt(&self.primary, tool, command).await {
                Attempt::Served(outcome) => return outcome,
                Attempt::NotFound { message, routing } => {
                    if routing && self.secondary.is_some() {
                        log::info!("Primary endpoint lacks '{}'; remembering secondary", command.name);
                        self.memo().insert(command.name.clone(), EndpointRole::Secondary);
                    }
                    PrimaryMiss::NotFound { message, routing }
                }
                Attempt::Unreachable(failure) => PrimaryMiss::Unreachable(failure),
            }
        };

        let Some(secondary) = &self.secondary else {
            return match miss {
                PrimaryMiss::NotFound { message, routing } => {
                    not_found_outcome(&command.name, message, routing, EndpointRole::Primary)
                }
                PrimaryMiss::Unreachable(failure) => ExecutionOutcome::failure(
                    &command.name,
                    OutcomeStatus::TransportError,
                    failure.to_string(),
                    EndpointRole::Primary,
                ),
                PrimaryMiss::Skipped => ExecutionOutcome::failure(
                    &command.name,
                    OutcomeStatus::TransportError,
                    "no endpoint available",
                    EndpointRole::Primary,
                ),
            };
        };

        match &miss {
            PrimaryMiss::NotFound { message, .. } => log::warn!(
                "Retrying '{}' on {}: primary answered 404 ({})",
                command.name,
                secondary.base_url,
                message
            ),
            PrimaryMiss::Unreachable(failure) => log::warn!(
                "Retrying '{}' on {}: {}",
                command.name,
                secondary.base_url,
                failure
            ),
            PrimaryMiss::Skipped => {}
        }

        match self.attempt(secondary, tool, command).await {
            Attempt::Served(outcome) => outcome,
            Attempt::NotFound { message, routing } => match miss {
                // A domain-level 404 from either side outranks a missing route
                PrimaryMiss::NotFound {
                    message: first,
                    routing: false,
                } if routing => not_found_outcome(&command.name, first, false, EndpointRole::Primary),
                _ => not_found_outcome(&command.name, message, routing, EndpointRole::Secondary),
            },
            Attempt::Unreachable(failure) => match miss {
                // The primary answered, so its 404 stands
                PrimaryMiss::NotFound { message, routing } => not_found_outcome(
                    &command.name,
                    format!("{}; secondary endpoint: {}", message, failure),
                    routing,
                    EndpointRole::Primary,
                ),
                PrimaryMiss::Unreachable(first) => ExecutionOutcome::failure(
                    &command.name,
                    OutcomeStatus::TransportError,
                    format!("primary endpoint: {}; secondary endpoint: {}", first, failure),
                    EndpointRole::Secondary,
                ),
                PrimaryMiss::Skipped => self.retry_primary(tool, command, failure).await,
            },
        }
    }

    /// The remembered secondary is gone; give the primary one more chance
    async fn retry_primary(
        &self,
        tool: &ToolSpec,
        command: &NormalizedCommand,
        failure: TransportFailure,
    ) -> ExecutionOutcome {
        log::warn!(
            "Secondary endpoint unreachable for '{}' ({}); trying the primary again",
            command.name,
            failure
        );
        match self.attempt(&self.primary, tool, command).await {
            Attempt::Served(outcome) => {
                self.memo().remove(&command.name);
                outcome
            }
            Attempt::NotFound { message, routing } => {
                not_found_outcome(&command.name, message, routing, EndpointRole::Primary)
            }
            Attempt::Unreachable(first) => ExecutionOutcome::failure(
                &command.name,
                OutcomeStatus::TransportError,
                format!("primary endpoint: {}; secondary endpoint: {}", first, failure),
                EndpointRole::Primary,
            ),
        }
    }

    async fn attempt(&self, endpoint: &Endpoint, tool: &ToolSpec, command: &NormalizedCommand) -> Attempt {
        let call = self.api.invoke(endpoint, tool, &command.args);
        let reply = match tokio::time::timeout(self.call_timeout, call).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(failure)) => return Attempt::Unreachable(failure),
            Err(_) => return Attempt::Unreachable(TransportFailure::Timeout(self.call_timeout)),
        };

        match reply {
            ApiReply::Ok(body) => {
                let trimmed = body.trim();
                if trimmed.starts_with("Error") || trimmed.starts_with("Failed") {
                    Attempt::Served(ExecutionOutcome::failure(
                        &tool.name,
                        OutcomeStatus::ToolError,
                        trimmed,
                        endpoint.role,
                    ))
                } else {
                    Attempt::Served(ExecutionOutcome::success(
                        &tool.name,
                        shape_payload(tool.result, &body),
                        endpoint.role,
                    ))
                }
            }
            ApiReply::NotFound(body) if is_routing_miss(&body) => Attempt::NotFound {
                message: format!("'{}' is not implemented by the {} endpoint", tool.name, endpoint.role),
                routing: true,
            },
            ApiReply::NotFound(body) => Attempt::NotFound {
                message: body.trim().to_string(),
                routing: false,
            },
            ApiReply::Failed { status, body } => Attempt::Served(ExecutionOutcome::failure(
                &tool.name,
                OutcomeStatus::ToolError,
                format!("HTTP {}: {}", status, body.trim()),
                endpoint.role,
            )),
        }
    }
}

/// A 404 that means "no such route" rather than "no such entity"
fn is_routing_miss(body: &str) -> bool {
    let body = body.trim();
    body.is_empty() || body.contains("No context found") || body.contains("<h1>404")
}

/// Shape a successful body according to the tool's result shape
pub fn shape_payload(shape: ResultShape, body: &str) -> Value {
    match shape {
        ResultShape::Text => Value::String(body.trim_end().to_string()),
        ResultShape::Lines => Value::Array(
            body.lines()
                .map(str::trim_end)
                .filter(|l| !l.is_empty())
                .map(|l| Value::String(l.to_string()))
                .collect(),
        ),
        ResultShape::Json => {
            serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.trim_end().to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::MockToolApi;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn command(name: &str, args: &[(&str, &str)]) -> NormalizedCommand {
        NormalizedCommand {
            name: name.to_string(),
            args: args.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect::<BTreeMap<_, _>>(),
            source_span: 0..0,
        }
    }

    fn executor(api: MockToolApi, secondary: bool) -> ToolExecutor<MockToolApi> {
        let config = ExecutorConfig::default()
            .with_primary("http://primary")
            .with_secondary(secondary.then(|| "http://secondary".to_string()))
            .with_timeout(Duration::from_millis(200));
        ToolExecutor::new(Arc::new(api), Arc::new(ToolRegistry::builtin()), config)
    }

    #[tokio::test]
    async fn test_success_on_primary() {
        let exec = executor(MockToolApi::new(), true);
        let outcome = exec.execute(&command("get_current_function", &[])).await;
        assert_eq!(outcome.status, OutcomeStatus::Success);
        assert_eq!(outcome.endpoint, EndpointRole::Primary);
        assert_eq!(outcome.payload, Some(json!("Function: main at 00001000")));
        assert_eq!(exec.api().call_count(), 1);
    }

    #[tokio::test]
    async fn test_lines_payload() {
        let exec = executor(MockToolApi::new(), false);
        let outcome = exec.execute(&command("list_functions", &[])).await;
        let items = outcome.payload.unwrap();
        assert_eq!(items.as_array().unwrap().len(), 4);
        assert_eq!(items[0], json!("main (0x1000)"));
    }

    #[tokio::test]
    async fn test_unreachable_primary_falls_back() {
        let api = MockToolApi::new().with_unreachable(EndpointRole::Primary);
        let exec = executor(api, true);
        let outcome = exec.execute(&command("decompile_function", &[("name", "main")])).await;
        assert_eq!(outcome.status, OutcomeStatus::Success);
        assert_eq!(outcome.endpoint, EndpointRole::Secondary);
        // Transport failures are not memoised
        assert_eq!(exec.remembered("decompile_function"), None);
    }

    #[tokio::test]
    async fn test_unreachable_without_secondary() {
        let api = MockToolApi::new().with_unreachable(EndpointRole::Primary);
        let exec = executor(api, false);
        let outcome = exec.execute(&command("list_functions", &[])).await;
        assert_eq!(outcome.status, OutcomeStatus::TransportError);
        assert_eq!(outcome.endpoint, EndpointRole::Primary);
    }

    #[tokio::test]
    async fn test_both_unreachable() {
        let api = MockToolApi::new()
            .with_unreachable(EndpointRole::Primary)
            .with_unreachable(EndpointRole::Secondary);
        let exec = executor(api, true);
        let outcome = exec.execute(&command("list_functions", &[])).await;
        assert_eq!(outcome.status, OutcomeStatus::TransportError);
        assert!(outcome.message.unwrap().contains("secondary endpoint"));
    }

    #[tokio::test]
    async fn test_unsupported_is_remembered() {
        let api = MockToolApi::new().with_reply(
            EndpointRole::Primary,
            "rename_function_by_address",
            ApiReply::NotFound("No context found for request".to_string()),
        );
        let exec = executor(api, true);
        let cmd = command("rename_function_by_address", &[("address", "401000"), ("new_name", "main")]);

        let first = exec.execute(&cmd).await;
        assert_eq!(first.status, OutcomeStatus::Success);
        assert_eq!(first.endpoint, EndpointRole::Secondary);
        assert_eq!(exec.remembered("rename_function_by_address"), Some(EndpointRole::Secondary));

        let second = exec.execute(&cmd).await;
        assert_eq!(second.endpoint, EndpointRole::Secondary);
        let roles: Vec<EndpointRole> = exec.api().calls().iter().map(|c| c.endpoint).collect();
        assert_eq!(
            roles,
            vec![EndpointRole::Primary, EndpointRole::Secondary, EndpointRole::Secondary]
        );

        exec.reset_capabilities();
        assert_eq!(exec.remembered("rename_function_by_address"), None);
    }

    #[tokio::test]
    async fn test_unsupported_without_secondary() {
        let api = MockToolApi::new().with_reply(
            EndpointRole::Primary,
            "set_function_prototype",
            ApiReply::NotFound(String::new()),
        );
        let exec = executor(api, false);
        let outcome = exec
            .execute(&command("set_function_prototype", &[("address", "1"), ("prototype", "int f(void)")]))
            .await;
        assert_eq!(outcome.status, OutcomeStatus::Unsupported);
        assert_eq!(exec.remembered("set_function_prototype"), None);
    }

    #[tokio::test]
    async fn test_domain_404_tries_secondary() {
        let api = MockToolApi::new().with_reply(
            EndpointRole::Primary,
            "decompile_function",
            ApiReply::NotFound("Function not found: main".to_string()),
        );
        let exec = executor(api, true);
        let outcome = exec.execute(&command("decompile_function", &[("name", "main")])).await;
        assert_eq!(outcome.status, OutcomeStatus::Success);
        assert_eq!(outcome.endpoint, EndpointRole::Secondary);
        assert_eq!(exec.api().call_count(), 2);
        // Only a missing route says anything about capabilities
        assert_eq!(exec.remembered("decompile_function"), None);
    }

    #[tokio::test]
    async fn test_domain_404_on_both_is_tool_error() {
        let api = MockToolApi::new()
            .with_reply(
                EndpointRole::Primary,
                "decompile_function",
                ApiReply::NotFound("Function not found: nope".to_string()),
            )
            .with_reply(
                EndpointRole::Secondary,
                "decompile_function",
                ApiReply::NotFound("Function not found: nope".to_string()),
            );
        let exec = executor(api, true);
        let outcome = exec.execute(&command("decompile_function", &[("name", "nope")])).await;
        assert_eq!(outcome.status, OutcomeStatus::ToolError);
        assert_eq!(outcome.endpoint, EndpointRole::Secondary);
        assert_eq!(outcome.message.as_deref(), Some("Function not found: nope"));
        assert_eq!(exec.api().call_count(), 2);
    }

    #[tokio::test]
    async fn test_domain_404_outranks_missing_route() {
        let api = MockToolApi::new()
            .with_reply(
                EndpointRole::Primary,
                "decompile_function",
                ApiReply::NotFound("Function not found: nope".to_string()),
            )
            .with_reply(EndpointRole::Secondary, "decompile_function", ApiReply::NotFound(String::new()));
        let exec = executor(api, true);
        let outcome = exec.execute(&command("decompile_function", &[("name", "nope")])).await;
        assert_eq!(outcome.status, OutcomeStatus::ToolError);
        assert_eq!(outcome.endpoint, EndpointRole::Primary);
        assert_eq!(outcome.message.as_deref(), Some("Function not found: nope"));
    }

    #[tokio::test]
    async fn test_domain_404_without_secondary() {
        let api = MockToolApi::new().with_reply(
            EndpointRole::Primary,
            "decompile_function",
            ApiReply::NotFound("Function not found: nope".to_string()),
        );
        let exec = executor(api, false);
        let outcome = exec.execute(&command("decompile_function", &[("name", "nope")])).await;
        assert_eq!(outcome.status, OutcomeStatus::ToolError);
        assert_eq!(outcome.endpoint, EndpointRole::Primary);
        assert_eq!(exec.api().call_count(), 1);
    }

    #[tokio::test]
    async fn test_missing_route_with_secondary_down_stays_unsupported() {
        let api = MockToolApi::new()
            .with_reply(EndpointRole::Primary, "set_function_prototype", ApiReply::NotFound(String::new()))
            .with_unreachable(EndpointRole::Secondary);
        let exec = executor(api, true);
        let outcome = exec
            .execute(&command("set_function_prototype", &[("address", "1"), ("prototype", "int f(void)")]))
            .await;
        assert_eq!(outcome.status, OutcomeStatus::Unsupported);
        assert_eq!(outcome.endpoint, EndpointRole::Primary);
    }

    #[tokio::test]
    async fn test_stale_memo_falls_back_to_primary() {
        let api = MockToolApi::new().with_unreachable(EndpointRole::Secondary);
        let exec = executor(api, true);
        exec.memo()
            .insert("list_functions".to_string(), EndpointRole::Secondary);

        let outcome = exec.execute(&command("list_functions", &[])).await;
        assert_eq!(outcome.status, OutcomeStatus::Success);
        assert_eq!(outcome.endpoint, EndpointRole::Primary);
        assert_eq!(exec.remembered("list_functions"), None);

        let roles: Vec<EndpointRole> = exec.api().calls().iter().map(|c| c.endpoint).collect();
        assert_eq!(roles, vec![EndpointRole::Secondary, EndpointRole::Primary]);
    }

    #[tokio::test]
    async fn test_stale_memo_with_both_unreachable() {
        let api = MockToolApi::new()
            .with_unreachable(EndpointRole::Primary)
            .with_unreachable(EndpointRole::Secondary);
        let exec = executor(api, true);
        exec.memo()
            .insert("list_functions".to_string(), EndpointRole::Secondary);

        let outcome = exec.execute(&command("list_functions", &[])).await;
        assert_eq!(outcome.status, OutcomeStatus::TransportError);
        assert_eq!(exec.api().call_count(), 2);
    }

    #[tokio::test]
    async fn test_error_body_is_tool_error_without_retry() {
        let api = MockToolApi::new().with_reply(
            EndpointRole::Primary,
            "rename_data",
            ApiReply::Ok("Error: no data at address".to_string()),
        );
        let exec = executor(api, true);
        let outcome = exec
            .execute(&command("rename_data", &[("address", "5000"), ("new_name", "table")]))
            .await;
        assert_eq!(outcome.status, OutcomeStatus::ToolError);
        assert_eq!(exec.api().call_count(), 1);
    }

    #[tokio::test]
    async fn test_server_error_not_retried() {
        let api = MockToolApi::new().with_reply(
            EndpointRole::Primary,
            "list_segments",
            ApiReply::Failed {
                status: 500,
                body: "boom".to_string(),
            },
        );
        let exec = executor(api, true);
        let outcome = exec.execute(&command("list_segments", &[])).await;
        assert_eq!(outcome.status, OutcomeStatus::ToolError);
        assert_eq!(outcome.message.as_deref(), Some("HTTP 500: boom"));
        assert_eq!(exec.api().call_count(), 1);
    }

    #[tokio::test]
    async fn test_timeout_is_transport_error() {
        let api = MockToolApi::new().with_latency(Duration::from_secs(5));
        let exec = executor(api, false);
        let outcome = exec.execute(&command("list_functions", &[])).await;
        assert_eq!(outcome.status, OutcomeStatus::TransportError);
        assert!(outcome.message.unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_unknown_command_outcome() {
        let exec = executor(MockToolApi::new(), true);
        let outcome = exec.execute(&command("format_disk", &[])).await;
        assert_eq!(outcome.status, OutcomeStatus::Unsupported);
        assert_eq!(exec.api().call_count(), 0);
    }

    #[test]
    fn test_shape_payload() {
        assert_eq!(shape_payload(ResultShape::Text, "hello\n"), json!("hello"));
        assert_eq!(shape_payload(ResultShape::Lines, "a\n\nb\n"), json!(["a", "b"]));
        assert_eq!(shape_payload(ResultShape::Json, r#"{"x": 1}"#), json!({"x": 1}));
        assert_eq!(shape_payload(ResultShape::Json, "not json"), json!("not json"));
    }

    #[test]
    fn test_outcome_text() {
        let lines = ExecutionOutcome::success("list_functions", json!(["a", "b"]), EndpointRole::Primary);
        assert_eq!(lines.text(), "a\nb");

        let failed = ExecutionOutcome::failure(
            "decompile_function",
            OutcomeStatus::ToolError,
            "Function not found",
            EndpointRole::Primary,
        );
        assert_eq!(failed.text(), "Function not found");
        assert!(!failed.is_success());
    }
}
