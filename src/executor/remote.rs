//! GhidraMCP HTTP client

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use crate::error::{BridgeError, Result};
use crate::registry::{HttpMethod, ToolSpec};

use super::api::{ApiReply, Endpoint, ToolApi, TransportFailure};

/// Default request timeout for the tool API
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(30);

/// reqwest-backed `ToolApi`; the connection pool is shared by clones
#[derive(Debug, Clone)]
pub struct HttpToolApi {
    client: Client,
    timeout: Duration,
}

impl HttpToolApi {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BridgeError::Transport(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client, timeout })
    }

    /// Pairs of (wire name, value) in parameter declaration order
    fn wire_args<'a>(tool: &'a ToolSpec, args: &'a BTreeMap<String, String>) -> Vec<(&'a str, &'a str)> {
        tool.params
            .iter()
            .filter_map(|p| args.get(&p.name).map(|v| (p.wire(), v.as_str())))
            .collect()
    }

    fn classify(&self, err: reqwest::Error) -> TransportFailure {
        if err.is_timeout() {
            TransportFailure::Timeout(self.timeout)
        } else if err.is_connect() || err.is_request() {
            TransportFailure::Unreachable(err.to_string())
        } else {
            TransportFailure::Protocol(err.to_string())
        }
    }
}

#[async_trait]
impl ToolApi for HttpToolApi {
    async fn invoke(
        &self,
        endpoint: &Endpoint,
        tool: &ToolSpec,
        args: &BTreeMap<String, String>,
    ) -> std::result::Result<ApiReply, TransportFailure> {
        let url = endpoint.url(&tool.route.path);
        let wire = Self::wire_args(tool, args);
        log::debug!("{:?} {} {:?}", tool.route.method, url, wire);

        let request = match tool.route.method {
            HttpMethod::Get => self.client.get(&url).query(&wire),
            HttpMethod::Post if tool.route.raw_body => {
                let body = wire.first().map(|(_, v)| v.to_string()).unwrap_or_default();
                self.client.post(&url).body(body)
            }
            HttpMethod::Post => self.client.post(&url).form(&wire),
        };

        let response = request.send().await.map_err(|e| self.classify(e))?;
        let status = response.status();
        let body = response.text().await.map_err(|e| self.classify(e))?;

        Ok(match status {
            s if s.is_success() => ApiReply::Ok(body),
            StatusCode::NOT_FOUND => ApiReply::NotFound(body),
            s => ApiReply::Failed {
                status: s.as_u16(),
                body,
            },
        })
    }

    async fn health_check(&self, endpoint: &Endpoint) -> bool {
        let url = endpoint.url("methods");
        match self
            .client
            .get(&url)
            .query(&[("offset", "0"), ("limit", "1")])
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                log::warn!("Health check of {} failed: {}", url, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ToolRegistry;

    #[test]
    fn test_wire_args_use_wire_names_in_order() {
        let registry = ToolRegistry::builtin();
        let tool = registry.get("rename_function_by_address").unwrap();
        let mut args = BTreeMap::new();
        args.insert("new_name".to_string(), "main".to_string());
        args.insert("address".to_string(), "401000".to_string());

        let wire = HttpToolApi::wire_args(tool, &args);
        assert_eq!(wire, vec![("function_address", "401000"), ("new_name", "main")]);
    }

    #[test]
    fn test_wire_args_skip_absent_optionals() {
        let registry = ToolRegistry::builtin();
        let tool = registry.get("list_methods").unwrap();
        let mut args = BTreeMap::new();
        args.insert("limit".to_string(), "10".to_string());

        assert_eq!(HttpToolApi::wire_args(tool, &args), vec![("limit", "10")]);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_failure() {
        let api = HttpToolApi::new(Duration::from_secs(2)).unwrap();
        let registry = ToolRegistry::builtin();
        let tool = registry.get("list_functions").unwrap();
        // Port 9 (discard) is closed on test hosts
        let endpoint = Endpoint::primary("http://127.0.0.1:9");

        let result = api.invoke(&endpoint, tool, &BTreeMap::new()).await;
        assert!(matches!(
            result,
            Err(TransportFailure::Unreachable(_)) | Err(TransportFailure::Timeout(_))
        ));
        assert!(!api.health_check(&endpoint).await);
    }
}
