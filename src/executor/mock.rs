//! In-process `ToolApi` for mock mode and tests
//!
//! Without scripting it answers like a small GhidraMCP instance with canned
//! data. Tests can script replies per (endpoint, tool), mark an endpoint as
//! unreachable, add latency, and inspect the calls made.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use crate::registry::ToolSpec;

use super::api::{ApiReply, Endpoint, EndpointRole, ToolApi, TransportFailure};

/// One call observed by the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCall {
    pub endpoint: EndpointRole,
    pub tool: String,
    pub args: BTreeMap<String, String>,
}

#[derive(Debug, Default)]
pub struct MockToolApi {
    replies: HashMap<(EndpointRole, String), ApiReply>,
    unreachable: HashSet<EndpointRole>,
    latency: Option<Duration>,
    calls: Mutex<Vec<MockCall>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockToolApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fixed reply for `tool` on `role`
    pub fn with_reply(mut self, role: EndpointRole, tool: impl Into<String>, reply: ApiReply) -> Self {
        self.replies.insert((role, tool.into()), reply);
        self
    }

    /// Every call to `role` fails to connect
    pub fn with_unreachable(mut self, role: EndpointRole) -> Self {
        self.unreachable.insert(role);
        self
    }

    /// Delay every answer
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Calls made so far, oldest first
    pub fn calls(&self) -> Vec<MockCall> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    fn canned(tool: &ToolSpec, args: &BTreeMap<String, String>) -> ApiReply {
        let arg = |name: &str| args.get(name).map(String::as_str).unwrap_or("unknown");
        let body = match tool.route.path.as_str() {
            "methods" => "main\ninitialize\nprocess_data\ncleanup".to_string(),
            "classes" => "MainClass\nDataProcessor\nLogger".to_string(),
            "segments" => {
                ".text: 0x1000-0x5000 (rx)\n.data: 0x6000-0x7000 (rw)\n.rdata: 0x8000-0x9000 (r)".to_string()
            }
            "imports" => "printf (msvcrt.dll)\nmalloc (msvcrt.dll)\nfree (msvcrt.dll)".to_string(),
            "exports" => "DllMain (0x2000)\nProcessData (0x2100)".to_string(),
            "list_functions" => {
                "main (0x1000)\ninitialize (0x1100)\nprocess_data (0x1200)\ncleanup (0x1300)".to_string()
            }
            "get_current_address" => "00001000".to_string(),
            "get_current_function" => "Function: main at 00001000".to_string(),
            "get_function_by_address" => {
                format!("function_{0} at {0}", arg("address"))
            }
            "disassemble_function" => {
                let a = arg("address");
                format!("{a}: push rbp\n{a}+0x1: mov rbp, rsp\n{a}+0x4: call printf\n{a}+0x9: pop rbp\n{a}+0xa: ret")
            }
            "decompile" | "decompile_function" => {
                let name = args
                    .get("name")
                    .cloned()
                    .unwrap_or_else(|| format!("FUN_{}", arg("address")));
                format!(
                    "// Decompiled function: {0}\nvoid {0}(void) {{\n    int local_var = 0;\n    printf(\"Hello from function\");\n    return;\n}}",
                    name
                )
            }
            "renameFunction" => format!("Renamed function from {} to {}", arg("old_name"), arg("new_name")),
            "renameData" => format!("Renamed data at {} to {}", arg("address"), arg("new_name")),
            "renameVariable" => format!(
                "Renamed variable from {} to {} in function {}",
                arg("old_name"),
                arg("new_name"),
                arg("function_name")
            ),
            "rename_function_by_address" => "Function renamed successfully".to_string(),
            "set_decompiler_comment" | "set_disassembly_comment" => "Comment set successfully".to_string(),
            "set_function_prototype" => "Function prototype set successfully".to_string(),
            "set_local_variable_type" => "Variable type set successfully".to_string(),
            path => format!("Mock response for {}", path),
        };
        ApiReply::Ok(body)
    }
}

#[async_trait]
impl ToolApi for MockToolApi {
    async fn invoke(
        &self,
        endpoint: &Endpoint,
        tool: &ToolSpec,
        args: &BTreeMap<String, String>,
    ) -> Result<ApiReply, TransportFailure> {
        lock(&self.calls).push(MockCall {
            endpoint: endpoint.role,
            tool: tool.name.clone(),
            args: args.clone(),
        });
        log::info!("MOCK: {} on {} endpoint", tool.name, endpoint.role);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.unreachable.contains(&endpoint.role) {
            return Err(TransportFailure::Unreachable(format!(
                "connection refused: {}",
                endpoint.base_url
            )));
        }

        Ok(self
            .replies
            .get(&(endpoint.role, tool.name.clone()))
            .cloned()
            .unwrap_or_else(|| Self::canned(tool, args)))
    }

    async fn health_check(&self, endpoint: &Endpoint) -> bool {
        !self.unreachable.contains(&endpoint.role)
    }
}
