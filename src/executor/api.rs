//! Remote tool API seam

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::registry::ToolSpec;

/// Which configured endpoint served (or was meant to serve) a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointRole {
    Primary,
    Secondary,
}

impl fmt::Display for EndpointRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary => write!(f, "primary"),
            Self::Secondary => write!(f, "secondary"),
        }
    }
}

/// One remote tool API instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub role: EndpointRole,
    pub base_url: String,
}

impl Endpoint {
    pub fn primary(base_url: impl Into<String>) -> Self {
        Self {
            role: EndpointRole::Primary,
            base_url: base_url.into(),
        }
    }

    pub fn secondary(base_url: impl Into<String>) -> Self {
        Self {
            role: EndpointRole::Secondary,
            base_url: base_url.into(),
        }
    }

    /// Full URL for a route path
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// What a reachable endpoint answered
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiReply {
    /// 2xx with its body
    Ok(String),
    /// 404 with its body
    NotFound(String),
    /// Any other status
    Failed { status: u16, body: String },
}

/// The endpoint could not be reached or did not answer in time
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportFailure {
    #[error("Endpoint unreachable: {0}")]
    Unreachable(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Protocol error: {0}")]
    Protocol(String),
}

/// Client for the remote tool API
///
/// Implementations must be safe to share between concurrent queries.
#[async_trait]
pub trait ToolApi: Send + Sync {
    /// Invoke `tool` on `endpoint` with canonical arguments
    async fn invoke(
        &self,
        endpoint: &Endpoint,
        tool: &ToolSpec,
        args: &BTreeMap<String, String>,
    ) -> Result<ApiReply, TransportFailure>;

    /// Check whether an endpoint answers at all
    async fn health_check(&self, endpoint: &Endpoint) -> bool;
}
